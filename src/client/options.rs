//! Client options and connection URL construction.

use std::fmt;
use std::sync::Arc;

use crate::auth::{AuthRequestBuilder, EndpointAuthRequestBuilder};
use crate::config::{default_port, Config};

/// Pusher wire protocol version.
pub const PROTOCOL: u8 = 7;
/// Reported in the connection URL.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CLIENT_NAME: &str = "notif-client-rust";

/// How private and presence subscriptions get their `auth` token.
#[derive(Clone, Default)]
pub enum AuthMethod {
    /// POST to this URL with the default form builder.
    Endpoint(String),
    /// Application-supplied request builder.
    Builder(Arc<dyn AuthRequestBuilder>),
    /// Sign locally with the app secret. Only for tests and tooling: it puts the secret
    /// on the client.
    Inline { secret: String },
    /// Private and presence subscriptions fail.
    #[default]
    NoMethod,
}

impl AuthMethod {
    /// The request builder this method uses, if it goes through an endpoint.
    pub(crate) fn request_builder(&self) -> Option<Arc<dyn AuthRequestBuilder>> {
        match self {
            AuthMethod::Endpoint(url) => Some(Arc::new(EndpointAuthRequestBuilder::new(Some(
                url.clone(),
            )))),
            AuthMethod::Builder(builder) => Some(builder.clone()),
            AuthMethod::Inline { .. } | AuthMethod::NoMethod => None,
        }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::Endpoint(url) => f.debug_tuple("Endpoint").field(url).finish(),
            AuthMethod::Builder(_) => f.write_str("Builder(..)"),
            AuthMethod::Inline { .. } => f.write_str("Inline { .. }"),
            AuthMethod::NoMethod => f.write_str("NoMethod"),
        }
    }
}

/// Options for a [`crate::client::Client`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub host: String,
    /// `None` picks 443 or 80 from `encrypted`.
    pub port: Option<u16>,
    pub encrypted: bool,
    pub auth_method: AuthMethod,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: "ws.pusherapp.com".to_string(),
            port: None,
            encrypted: true,
            auth_method: AuthMethod::NoMethod,
        }
    }
}

impl ClientOptions {
    /// Host, port and encryption from configuration; endpoint auth when one is configured.
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.host.clone(),
            port: Some(config.port),
            encrypted: config.encrypted,
            auth_method: config
                .auth_endpoint
                .clone()
                .map(AuthMethod::Endpoint)
                .unwrap_or_default(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = encrypted;
        self
    }

    pub fn auth_method(mut self, auth_method: AuthMethod) -> Self {
        self.auth_method = auth_method;
        self
    }

    pub fn resolved_port(&self) -> u16 {
        self.port.unwrap_or_else(|| default_port(self.encrypted))
    }
}

/// URL used for a connection attempt.
pub fn construct_url(key: &str, options: &ClientOptions) -> String {
    let scheme = if options.encrypted { "wss" } else { "ws" };
    format!(
        "{}://{}:{}/app/{}?client={}&version={}&protocol={}",
        scheme,
        options.host,
        options.resolved_port(),
        key,
        CLIENT_NAME,
        VERSION,
        PROTOCOL
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_for_encrypted_defaults() {
        let url = construct_url("testKey123", &ClientOptions::default());
        assert_eq!(
            url,
            format!(
                "wss://ws.pusherapp.com:443/app/testKey123?client={}&version={}&protocol=7",
                CLIENT_NAME, VERSION
            )
        );
    }

    #[test]
    fn url_for_unencrypted_custom_host() {
        let options = ClientOptions::default()
            .encrypted(false)
            .host("localhost");
        assert!(construct_url("k", &options).starts_with("ws://localhost:80/app/k?"));

        let options = options.port(6001);
        assert!(construct_url("k", &options).starts_with("ws://localhost:6001/app/k?"));
    }

    #[test]
    fn endpoint_method_yields_a_builder() {
        assert!(AuthMethod::Endpoint("https://x/auth".to_string())
            .request_builder()
            .is_some());
        assert!(AuthMethod::NoMethod.request_builder().is_none());
        assert!(AuthMethod::Inline {
            secret: "s".to_string()
        }
        .request_builder()
        .is_none());
    }

    #[test]
    fn builder_method_keeps_the_same_instance() {
        let builder: Arc<dyn AuthRequestBuilder> =
            Arc::new(EndpointAuthRequestBuilder::new(None));
        let method = AuthMethod::Builder(builder.clone());
        let resolved = method.request_builder().unwrap();
        assert_eq!(
            Arc::as_ptr(&resolved) as *const (),
            Arc::as_ptr(&builder) as *const ()
        );
    }
}
