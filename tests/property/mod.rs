//! Property-based tests for navigation invariants

mod navigation_paths;
