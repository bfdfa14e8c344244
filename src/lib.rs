//! Pusher-protocol client harness built with Rust.
//!
//! Builds the signed-subscription auth requests a realtime client sends to an
//! application's auth endpoint, drives a client over a pluggable socket with a delegate
//! for lifecycle events, and ships a reference auth endpoint that signs private and
//! presence subscriptions.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod harness;
pub mod models;
pub mod services;

pub use auth::{AuthRequestBuilder, EndpointAuthRequestBuilder};
pub use client::{Client, ClientDelegate, ClientOptions};
pub use config::Config;
pub use error::{AppError, ClientError};
pub use handlers::http::AppState;
pub use harness::ViewController;
pub use services::ChannelSigner;

use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Build the auth endpoint router (channel auth, health). Used by main and by integration tests.
pub fn create_app(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/pusher/auth", post(handlers::channel_auth))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
