//! Session persistence adapters.

mod file_session_store;
mod memory_session_store;

pub use file_session_store::{FileSessionStore, SCHEMA_VERSION};
pub use memory_session_store::MemorySessionStore;
