//! Sending an auth request and reading the endpoint's answer.

use http::Request;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{ClientError, ClientResult};

/// Body returned by an auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// `<app_key>:<signature>`.
    pub auth: String,
    /// Echoed member info for presence channels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_data: Option<String>,
}

impl AuthResponse {
    pub fn parse(body: &str) -> ClientResult<Self> {
        let response: AuthResponse = serde_json::from_str(body)?;
        if response.auth.is_empty() {
            return Err(ClientError::Auth("auth endpoint returned empty auth".to_string()));
        }
        Ok(response)
    }
}

/// Send a built auth request and parse the JSON answer. Non-2xx is an auth failure.
#[instrument(skip(http, request), fields(uri = %request.uri()))]
pub async fn send_auth_request(
    http: &reqwest::Client,
    request: Request<String>,
) -> ClientResult<AuthResponse> {
    let request = reqwest::Request::try_from(request)?;
    let response = http.execute(request).await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        debug!(%status, "auth endpoint refused subscription");
        return Err(ClientError::Auth(format!(
            "auth endpoint returned {}: {}",
            status, body
        )));
    }
    AuthResponse::parse(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_private_response() {
        let res = AuthResponse::parse(r#"{"auth":"key:abc"}"#).unwrap();
        assert_eq!(res.auth, "key:abc");
        assert_eq!(res.channel_data, None);
    }

    #[test]
    fn parse_presence_response() {
        let res =
            AuthResponse::parse(r#"{"auth":"key:abc","channel_data":"{\"user_id\":\"u1\"}"}"#)
                .unwrap();
        assert_eq!(res.channel_data.as_deref(), Some(r#"{"user_id":"u1"}"#));
    }

    #[test]
    fn parse_rejects_missing_or_empty_auth() {
        assert!(matches!(
            AuthResponse::parse(r#"{"nope":1}"#),
            Err(ClientError::Serialization(_))
        ));
        assert!(matches!(
            AuthResponse::parse(r#"{"auth":""}"#),
            Err(ClientError::Auth(_))
        ));
    }
}
