//! Transport-neutral HTTP request type

mod method;
mod spec;

pub use method::HttpMethod;
pub use spec::{ApiRequest, Headers};
