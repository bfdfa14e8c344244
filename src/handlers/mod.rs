//! HTTP request handlers for the reference auth endpoint.

pub mod http;

pub use self::http::*;
