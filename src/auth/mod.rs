//! Channel authorization: building auth requests and reading auth responses.

mod builder;
mod response;

pub use builder::{AuthRequestBuilder, EndpointAuthRequestBuilder};
pub use response::{send_auth_request, AuthResponse};
