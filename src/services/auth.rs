//! Signing for private and presence channels (Pusher-compatible HMAC).

use crate::models::channel::ChannelType;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Why a subscription signature was refused.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignError {
    #[error("missing auth for private/presence channel")]
    MissingAuth,
    #[error("auth key does not match app key")]
    KeyMismatch,
    #[error("invalid auth signature")]
    BadSignature,
    #[error("presence channels require channel_data")]
    MissingChannelData,
    #[error("app secret cannot key HMAC")]
    InvalidSecret,
}

/// Signs and verifies subscription attempts.
/// Pusher-style: HMAC-SHA256(app_secret, socket_id:channel_name[:channel_data]).
#[derive(Clone)]
pub struct ChannelSigner {
    app_key: String,
    app_secret: String,
}

impl ChannelSigner {
    pub fn new(app_key: String, app_secret: String) -> Self {
        Self {
            app_key,
            app_secret,
        }
    }

    pub fn app_key(&self) -> &str {
        &self.app_key
    }

    /// Hex signature for the subscription attempt.
    pub fn sign_channel(
        &self,
        socket_id: &str,
        channel: &str,
        channel_data: Option<&str>,
    ) -> Result<String, SignError> {
        let sign_payload = match ChannelType::from_name(channel) {
            ChannelType::Presence => {
                let data = channel_data.ok_or(SignError::MissingChannelData)?;
                format!("{}:{}:{}", socket_id, channel, data)
            }
            _ => format!("{}:{}", socket_id, channel),
        };

        let mut mac = HmacSha256::new_from_slice(self.app_secret.as_bytes())
            .map_err(|_| SignError::InvalidSecret)?;
        mac.update(sign_payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// The `auth` field of an auth response: `<app_key>:<signature>`.
    pub fn auth_token(
        &self,
        socket_id: &str,
        channel: &str,
        channel_data: Option<&str>,
    ) -> Result<String, SignError> {
        let signature = self.sign_channel(socket_id, channel, channel_data)?;
        Ok(format!("{}:{}", self.app_key, signature))
    }

    /// Verify an `<app_key>:<signature>` token. Public channels always pass.
    pub fn verify_channel_auth(
        &self,
        channel: &str,
        socket_id: &str,
        auth: Option<&str>,
        channel_data: Option<&str>,
    ) -> Result<(), SignError> {
        if !ChannelType::from_name(channel).is_private() {
            return Ok(());
        }

        let auth = auth.ok_or(SignError::MissingAuth)?;
        let (key, signature) = auth.split_once(':').ok_or(SignError::BadSignature)?;
        if key != self.app_key {
            return Err(SignError::KeyMismatch);
        }

        let expected = self.sign_channel(socket_id, channel, channel_data)?;
        if signature != expected {
            debug!(channel = %channel, "auth signature mismatch");
            return Err(SignError::BadSignature);
        }

        Ok(())
    }
}
