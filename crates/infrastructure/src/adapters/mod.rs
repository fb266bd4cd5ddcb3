//! Port adapters: HTTP transport and clock.

mod reqwest_client;
mod system_clock;

pub use reqwest_client::{ReqwestTransport, ReqwestTransportFactory};
pub use system_clock::SystemClock;
