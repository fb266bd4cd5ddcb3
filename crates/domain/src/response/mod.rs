//! Transport-neutral HTTP response type

mod spec;

pub use spec::ApiResponse;
