//! Deterministic JSON serialization for session files.
//!
//! Session files stay diffable and stable across saves:
//! - Keys sorted alphabetically (via `BTreeMap` in domain types)
//! - 2-space indentation
//! - Trailing newline

mod json;

pub use json::*;
