//! Tollgate Infrastructure - Adapters and wiring
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer, plus configuration loading,
//! tracing setup and the default [`connect`] entry point.

pub mod adapters;
pub mod connect;
pub mod persistence;
pub mod serialization;
pub mod settings;
pub mod telemetry;

pub use adapters::{ReqwestTransport, ReqwestTransportFactory, SystemClock};
pub use connect::connect;
pub use persistence::{FileSessionStore, MemorySessionStore, SCHEMA_VERSION};
pub use serialization::{SerializationError, from_json_bytes, to_json_stable_bytes};
pub use settings::{ConfigError, ENV_PREFIX, load_config};
pub use telemetry::init_tracing;
