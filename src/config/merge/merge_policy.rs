//! Merge rules: defaults first, every later source overrides earlier ones.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with the built-in defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("backend.kind", "http")?
        .set_default("backend.token_env", "STOWAGE_TOKEN")?
        .set_default("backend.timeout_secs", 30)?
        .set_default("navigation.max_ancestor_depth", 64)?
        .set_default("navigation.activity_limit", 20)
}
