//! Building the HTTP request that asks the application's auth endpoint to sign a
//! private/presence subscription.

use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use http::{Method, Request};
use serde::Serialize;
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::models::channel::{Channel, ChannelDescriptor};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Produces auth requests for subscription attempts.
///
/// Implementations are invoked from whichever task the client authorizes on, so they must
/// be `Send + Sync` and must not block.
pub trait AuthRequestBuilder: Send + Sync {
    /// Request for a subscription identified by name.
    fn request_for_channel_name(
        &self,
        socket_id: &str,
        channel_name: &str,
    ) -> ClientResult<Request<String>>;

    /// Request for a subscription identified by its channel object. The returned request is
    /// owned by the caller, who may add headers before sending it.
    fn request_for_channel(&self, socket_id: &str, channel: &Channel) -> ClientResult<Request<String>> {
        self.request_for_channel_name(socket_id, channel.name())
    }

    /// Dispatch on either form of channel descriptor.
    fn request_for(
        &self,
        socket_id: &str,
        channel: ChannelDescriptor<'_>,
    ) -> ClientResult<Request<String>> {
        match channel {
            ChannelDescriptor::Channel(c) => self.request_for_channel(socket_id, c),
            ChannelDescriptor::Name(name) => self.request_for_channel_name(socket_id, name),
        }
    }
}

#[derive(Serialize)]
struct AuthForm<'a> {
    socket_id: &'a str,
    channel_name: &'a str,
}

/// POSTs `socket_id` and `channel_name` as a form to a configured URL.
///
/// The endpoint is validated lazily so a missing or malformed one surfaces as a failed
/// subscription rather than a failed client construction.
#[derive(Debug, Clone)]
pub struct EndpointAuthRequestBuilder {
    endpoint: Option<String>,
    headers: HeaderMap,
}

impl EndpointAuthRequestBuilder {
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            endpoint,
            headers: HeaderMap::new(),
        }
    }

    /// Add an application header sent with every auth request (e.g. a session cookie).
    pub fn with_header(mut self, name: http::HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    fn endpoint_url(&self) -> ClientResult<Url> {
        let raw = self
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ClientError::Config("missing auth endpoint".to_string()))?;
        let url = Url::parse(raw).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", raw, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ClientError::InvalidUrl(format!(
                "{}: unsupported scheme {}",
                raw, other
            ))),
        }
    }
}

impl AuthRequestBuilder for EndpointAuthRequestBuilder {
    fn request_for_channel_name(
        &self,
        socket_id: &str,
        channel_name: &str,
    ) -> ClientResult<Request<String>> {
        if socket_id.is_empty() {
            return Err(ClientError::Validation("socket_id is empty".to_string()));
        }
        let url = self.endpoint_url()?;
        let body = serde_urlencoded::to_string(AuthForm {
            socket_id,
            channel_name,
        })?;

        let mut request = Request::builder()
            .method(Method::POST)
            .uri(url.as_str())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)?;
        request
            .headers_mut()
            .extend(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(request)
    }
}
