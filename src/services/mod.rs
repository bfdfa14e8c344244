//! Business logic: channel subscription signing.

pub mod auth;

pub use auth::{ChannelSigner, SignError};
