//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the connector and external systems.
//! Each port is a trait implemented by adapters in the infrastructure layer.

mod clock;
mod http_transport;
mod session_store;

pub use clock::Clock;
pub use http_transport::{HttpTransport, TransportError, TransportFactory};
pub use session_store::{SessionError, SessionStore};
