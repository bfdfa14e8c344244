//! Application configuration loaded from environment.

use std::net::SocketAddr;

/// Application configuration loaded from `.env` and environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Application key identifier, sent in the connection URL and prefixed to auth signatures.
    pub app_key: String,
    /// Secret for signing private/presence channel auth (auth endpoint only).
    pub app_secret: String,
    /// Application auth endpoint the client posts `socket_id`/`channel_name` to.
    /// `None` is allowed; subscriptions to private channels then fail at auth time.
    pub auth_endpoint: Option<String>,
    /// Realtime host (e.g. `ws.pusherapp.com`).
    pub host: String,
    /// Realtime port; defaults to 443/80 depending on `encrypted`.
    pub port: u16,
    /// Use `wss://` instead of `ws://`.
    pub encrypted: bool,
    /// Auth endpoint bind address (e.g. `0.0.0.0:3000`).
    pub server_addr: SocketAddr,
    /// Log level: `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment. Call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let app_key = std::env::var("APP_KEY").unwrap_or_else(|_| "notif_key".to_string());
        let app_secret =
            std::env::var("APP_SECRET").unwrap_or_else(|_| "notif_secret".to_string());
        let auth_endpoint = std::env::var("AUTH_ENDPOINT")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let host =
            std::env::var("PUSHER_HOST").unwrap_or_else(|_| "ws.pusherapp.com".to_string());

        let encrypted = match std::env::var("PUSHER_ENCRYPTED") {
            Ok(v) => parse_bool(&v).ok_or(ConfigLoadError::InvalidEncrypted)?,
            Err(_) => true,
        };
        let port = match std::env::var("PUSHER_PORT") {
            Ok(v) => v.parse().map_err(|_| ConfigLoadError::InvalidPort)?,
            Err(_) => default_port(encrypted),
        };

        let server_addr = std::env::var("SERVER_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let server_addr: SocketAddr = server_addr
            .parse()
            .map_err(|_| ConfigLoadError::InvalidServerAddr)?;

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            app_key,
            app_secret,
            auth_endpoint,
            host,
            port,
            encrypted,
            server_addr,
            log_level,
        })
    }
}

pub(crate) fn default_port(encrypted: bool) -> u16 {
    if encrypted {
        443
    } else {
        80
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Invalid SERVER_ADDR")]
    InvalidServerAddr,
    #[error("Invalid PUSHER_PORT")]
    InvalidPort,
    #[error("Invalid PUSHER_ENCRYPTED")]
    InvalidEncrypted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool(" ON "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn default_port_follows_encryption() {
        assert_eq!(default_port(true), 443);
        assert_eq!(default_port(false), 80);
    }
}
