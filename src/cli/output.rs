//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{ApiError, ErrorKind};

/// Map domain errors to a string for CLI output, with a hint where one helps.
pub fn map_error(e: &ApiError) -> String {
    let hint = match e {
        ApiError::Unauthorized(_) => Some("check the token in the configured token_env variable"),
        ApiError::CycleDetected { .. } => Some("the parent chain of this node is corrupted on the backend"),
        _ if e.kind() == ErrorKind::Network => Some("the backend may be unreachable; run the command again"),
        _ => None,
    };
    match hint {
        Some(hint) => format!("{}\nhint: {}", e, hint),
        None => e.to_string(),
    }
}
