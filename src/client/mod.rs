//! Pusher-protocol client: channel bookkeeping, subscription authorization, and inbound
//! frame dispatch over a pluggable [`Socket`].

mod delegate;
mod options;
mod socket;

pub use delegate::{ClientDelegate, ConnectionState};
pub use options::{construct_url, AuthMethod, ClientOptions, CLIENT_NAME, PROTOCOL, VERSION};
pub use socket::{ChannelSocket, Socket, SocketCommand};

use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::auth::{send_auth_request, AuthRequestBuilder};
use crate::error::{ClientError, ClientResult};
use crate::models::channel::{Channel, ChannelType, EventCallback, MemberCallback};
use crate::models::event::{ClientMessage, ConnectionEstablished, PusherError, PusherEvent};
use crate::models::presence::{members_from_subscription, PresenceChannelMember};
use crate::services::ChannelSigner;

const CONNECTION_ESTABLISHED: &str = "pusher:connection_established";
const SUBSCRIPTION_SUCCEEDED: &str = "pusher_internal:subscription_succeeded";
const MEMBER_ADDED: &str = "pusher_internal:member_added";
const MEMBER_REMOVED: &str = "pusher_internal:member_removed";
const ERROR: &str = "pusher:error";
const PING: &str = "pusher:ping";
/// Internal events are consumed by the client and never reach bound callbacks.
const INTERNAL_PREFIX: &str = "pusher_internal:";

struct ClientInner {
    key: String,
    url: String,
    options: ClientOptions,
    auth_builder: Option<Arc<dyn AuthRequestBuilder>>,
    socket: Arc<dyn Socket>,
    http: reqwest::Client,
    state: watch::Sender<ConnectionState>,
    socket_id: Mutex<Option<String>>,
    delegate: Mutex<Option<Weak<dyn ClientDelegate>>>,
    channels: Mutex<HashMap<String, Channel>>,
    global_callbacks: Mutex<Vec<(String, EventCallback)>>,
}

/// Realtime client handle. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    pub fn new(key: impl Into<String>, options: ClientOptions, socket: Arc<dyn Socket>) -> Self {
        let key = key.into();
        let url = construct_url(&key, &options);
        let auth_builder = options.auth_method.request_builder();
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            inner: Arc::new(ClientInner {
                key,
                url,
                options,
                auth_builder,
                socket,
                http: reqwest::Client::new(),
                state,
                socket_id: Mutex::new(None),
                delegate: Mutex::new(None),
                channels: Mutex::new(HashMap::new()),
                global_callbacks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// The request builder used for private/presence subscriptions, if any.
    pub fn auth_builder(&self) -> Option<Arc<dyn AuthRequestBuilder>> {
        self.inner.auth_builder.clone()
    }

    /// Register the delegate. Only a weak reference is kept.
    pub fn set_delegate<D: ClientDelegate + 'static>(&self, delegate: &Arc<D>) {
        let weak = Arc::downgrade(delegate);
        let weak: Weak<dyn ClientDelegate> = weak;
        *self.inner.delegate.lock() = Some(weak);
    }

    pub fn delegate(&self) -> Option<Arc<dyn ClientDelegate>> {
        self.inner.delegate()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Server-assigned id of the current connection.
    pub fn socket_id(&self) -> Option<String> {
        self.inner.socket_id.lock().clone()
    }

    /// Ask the socket to open a connection. No-op while connecting or connected.
    pub fn connect(&self) {
        let started = self.inner.transition(ConnectionState::Connecting, |current| {
            !matches!(
                current,
                ConnectionState::Connecting | ConnectionState::Connected
            )
        });
        if started {
            self.inner.socket.connect(&self.inner.url);
        } else {
            debug!("connect ignored: already {}", self.connection_state());
        }
    }

    /// Ask the socket to close. The state becomes `Disconnected` once the transport
    /// reports the close through [`Client::handle_close`].
    pub fn disconnect(&self) {
        if self.inner.transition(ConnectionState::Disconnecting, |current| {
            current == ConnectionState::Connected
        }) {
            self.inner.socket.disconnect();
        }
    }

    /// Track a channel and subscribe to it if connected. Subscriptions made while
    /// disconnected are sent once the connection is established.
    pub async fn subscribe(&self, channel_name: &str) -> ChannelHandle {
        self.subscribe_with(Channel::new(channel_name)).await
    }

    /// Like [`Client::subscribe`], with callbacks for presence members joining and leaving.
    pub async fn subscribe_presence(
        &self,
        channel_name: &str,
        on_member_added: Option<MemberCallback>,
        on_member_removed: Option<MemberCallback>,
    ) -> ChannelHandle {
        let channel =
            Channel::new(channel_name).with_member_callbacks(on_member_added, on_member_removed);
        self.subscribe_with(channel).await
    }

    async fn subscribe_with(&self, channel: Channel) -> ChannelHandle {
        let name = channel.name().to_string();
        let is_new = {
            let mut channels = self.inner.channels.lock();
            if channels.contains_key(&name) {
                false
            } else {
                channels.insert(name.clone(), channel);
                true
            }
        };
        if is_new && self.connection_state() == ConnectionState::Connected {
            self.inner.subscribe_channel(&name).await;
        }
        self.handle(&name)
    }

    /// Stop tracking a channel, telling the server if connected.
    pub fn unsubscribe(&self, channel_name: &str) {
        let removed = self.inner.channels.lock().remove(channel_name).is_some();
        if removed && self.connection_state() == ConnectionState::Connected {
            self.inner.send(&ClientMessage::unsubscribe(channel_name));
        }
        debug!(channel = %channel_name, "unsubscribed");
    }

    pub fn channel(&self, channel_name: &str) -> Option<ChannelHandle> {
        self.inner
            .channels
            .lock()
            .contains_key(channel_name)
            .then(|| self.handle(channel_name))
    }

    fn handle(&self, channel_name: &str) -> ChannelHandle {
        ChannelHandle {
            name: channel_name.to_string(),
            inner: self.inner.clone(),
        }
    }

    /// Bind a callback to every event the client receives. Returns an id for [`Client::unbind`].
    pub fn bind<F>(&self, callback: F) -> String
    where
        F: Fn(&PusherEvent) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4().to_string();
        let callback: EventCallback = Arc::new(callback);
        self.inner
            .global_callbacks
            .lock()
            .push((id.clone(), callback));
        id
    }

    pub fn unbind(&self, callback_id: &str) {
        self.inner
            .global_callbacks
            .lock()
            .retain(|(id, _)| id != callback_id);
    }

    pub fn unbind_all(&self) {
        self.inner.global_callbacks.lock().clear();
    }

    /// Feed one inbound text frame from the transport.
    pub async fn handle_message(&self, text: &str) {
        let event = match PusherEvent::parse(text) {
            Ok(event) => event,
            Err(e) => {
                debug!(error = %e, "ignoring unparseable frame");
                self.inner
                    .with_delegate(|d| d.debug_log(&format!("unparseable frame: {}", e)));
                return;
            }
        };

        match event.event_name() {
            CONNECTION_ESTABLISHED => self.inner.connection_established(&event).await,
            SUBSCRIPTION_SUCCEEDED => self.inner.subscription_succeeded(&event),
            MEMBER_ADDED => self.inner.member_added(&event),
            MEMBER_REMOVED => self.inner.member_removed(&event),
            ERROR => {
                let error = PusherError::from_event(&event);
                warn!(code = ?error.code, message = %error.message, "server error");
                self.inner.with_delegate(|d| d.received_error(&error));
            }
            PING => self.inner.send(&ClientMessage::pong()),
            _ => {}
        }

        if !event.event_name().starts_with(INTERNAL_PREFIX) {
            self.inner.dispatch(&event);
        }
    }

    /// The transport reports the connection closed.
    pub fn handle_close(&self) {
        *self.inner.socket_id.lock() = None;
        for channel in self.inner.channels.lock().values_mut() {
            channel.set_subscribed(false);
            channel.set_members(Vec::new());
        }
        self.inner.set_state(ConnectionState::Disconnected);
    }
}

impl ClientInner {
    fn delegate(&self) -> Option<Arc<dyn ClientDelegate>> {
        self.delegate.lock().as_ref().and_then(Weak::upgrade)
    }

    fn with_delegate(&self, f: impl FnOnce(&dyn ClientDelegate)) {
        if let Some(delegate) = self.delegate() {
            f(delegate.as_ref());
        }
    }

    fn set_state(&self, new: ConnectionState) {
        let old = self.state.send_replace(new);
        if old != new {
            info!(%old, %new, "connection state changed");
            self.with_delegate(|d| d.changed_connection_state(old, new));
        }
    }

    /// Move to `new` only if `allowed` accepts the current state. Check and write happen
    /// under the watch lock, so concurrent callers cannot both make the same move.
    fn transition(
        &self,
        new: ConnectionState,
        allowed: impl FnOnce(ConnectionState) -> bool,
    ) -> bool {
        let mut old = None;
        self.state.send_if_modified(|state| {
            if *state == new || !allowed(*state) {
                return false;
            }
            old = Some(std::mem::replace(state, new));
            true
        });
        let Some(old) = old else {
            return false;
        };
        info!(%old, %new, "connection state changed");
        self.with_delegate(|d| d.changed_connection_state(old, new));
        true
    }

    fn send(&self, message: &ClientMessage) {
        match serde_json::to_string(message) {
            Ok(text) => self.socket.send(text),
            Err(e) => warn!(error = %e, "failed to encode frame"),
        }
    }

    async fn connection_established(&self, event: &PusherEvent) {
        let established = event
            .data_to_json()
            .and_then(|v| serde_json::from_value::<ConnectionEstablished>(v).ok());
        let Some(established) = established else {
            warn!("connection_established without socket_id");
            return;
        };
        info!(
            socket_id = %established.socket_id,
            activity_timeout = ?established.activity_timeout,
            "connected"
        );
        *self.socket_id.lock() = Some(established.socket_id);
        self.set_state(ConnectionState::Connected);

        let pending: Vec<String> = self
            .channels
            .lock()
            .values()
            .filter(|c| !c.is_subscribed())
            .map(|c| c.name().to_string())
            .collect();
        for name in pending {
            self.subscribe_channel(&name).await;
        }
    }

    /// Authorize (when needed) and send the subscribe frame. Failures go to the delegate.
    #[instrument(skip(self))]
    async fn subscribe_channel(&self, channel_name: &str) {
        let Some(socket_id) = self.socket_id.lock().clone() else {
            debug!("not connected; subscription deferred");
            return;
        };
        let Some(channel) = self.channels.lock().get(channel_name).cloned() else {
            return;
        };

        match self.authorize(&socket_id, &channel).await {
            Ok(message) => self.send(&message),
            Err(e) => {
                warn!(error = %e, "subscription authorization failed");
                self.with_delegate(|d| d.failed_to_subscribe(channel_name, &e));
            }
        }
    }

    async fn authorize(&self, socket_id: &str, channel: &Channel) -> ClientResult<ClientMessage> {
        let name = channel.name();
        if !channel.channel_type().is_private() {
            return Ok(ClientMessage::subscribe(name, None, None));
        }

        if let AuthMethod::Inline { secret } = &self.options.auth_method {
            let channel_data = (channel.channel_type() == ChannelType::Presence)
                .then(|| json!({ "user_id": socket_id }).to_string());
            let signer = ChannelSigner::new(self.key.clone(), secret.clone());
            let auth = signer
                .auth_token(socket_id, name, channel_data.as_deref())
                .map_err(|e| ClientError::Auth(e.to_string()))?;
            return Ok(ClientMessage::subscribe(name, Some(auth), channel_data));
        }

        let builder = self.auth_builder.clone().ok_or_else(|| {
            ClientError::Config(format!("no auth method configured for {}", name))
        })?;
        let request = builder.request_for_channel(socket_id, channel)?;
        let response = send_auth_request(&self.http, request).await?;
        Ok(ClientMessage::subscribe(
            name,
            Some(response.auth),
            response.channel_data,
        ))
    }

    fn subscription_succeeded(&self, event: &PusherEvent) {
        let Some(name) = event.channel_name() else {
            return;
        };
        {
            let mut channels = self.channels.lock();
            let Some(channel) = channels.get_mut(name) else {
                return;
            };
            channel.set_subscribed(true);
            if channel.channel_type() == ChannelType::Presence {
                let members = event
                    .data_to_json()
                    .map(|data| members_from_subscription(&data))
                    .unwrap_or_default();
                channel.set_members(members);
            }
        }
        info!(channel = %name, "subscribed");
        self.with_delegate(|d| d.subscribed_to_channel(name));
        self.dispatch_to_channel(name, "pusher:subscription_succeeded", event);
    }

    fn member_added(&self, event: &PusherEvent) {
        let (Some(name), Some(member)) = (event.channel_name(), member_from_event(event)) else {
            return;
        };
        let callback = {
            let mut channels = self.channels.lock();
            let Some(channel) = channels.get_mut(name) else {
                return;
            };
            if !channel.add_member(member.clone()) {
                return;
            }
            channel.member_added_callback()
        };
        debug!(channel = %name, user_id = %member.user_id, "member added");
        if let Some(cb) = callback {
            cb(&member);
        }
    }

    fn member_removed(&self, event: &PusherEvent) {
        let (Some(name), Some(member)) = (event.channel_name(), member_from_event(event)) else {
            return;
        };
        let removed = {
            let mut channels = self.channels.lock();
            let Some(channel) = channels.get_mut(name) else {
                return;
            };
            channel
                .remove_member(&member.user_id)
                .map(|m| (m, channel.member_removed_callback()))
        };
        if let Some((member, callback)) = removed {
            debug!(channel = %name, user_id = %member.user_id, "member removed");
            if let Some(cb) = callback {
                cb(&member);
            }
        }
    }

    /// Run channel callbacks, then global callbacks. No lock is held while callbacks run.
    fn dispatch(&self, event: &PusherEvent) {
        if let Some(name) = event.channel_name() {
            self.dispatch_to_channel(name, event.event_name(), event);
        }
        let globals: Vec<EventCallback> = self
            .global_callbacks
            .lock()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for cb in globals {
            cb(event);
        }
    }

    fn dispatch_to_channel(&self, channel_name: &str, event_name: &str, event: &PusherEvent) {
        let callbacks = self
            .channels
            .lock()
            .get(channel_name)
            .map(|c| c.callbacks_for(event_name))
            .unwrap_or_default();
        for cb in callbacks {
            cb(event);
        }
    }
}

fn member_from_event(event: &PusherEvent) -> Option<PresenceChannelMember> {
    serde_json::from_value(event.data_to_json()?).ok()
}

/// A tracked channel, addressed by name through its client.
#[derive(Clone)]
pub struct ChannelHandle {
    name: String,
    inner: Arc<ClientInner>,
}

impl ChannelHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the channel; `None` once it has been unsubscribed.
    pub fn snapshot(&self) -> Option<Channel> {
        self.inner.channels.lock().get(&self.name).cloned()
    }

    pub fn is_subscribed(&self) -> bool {
        self.snapshot().map(|c| c.is_subscribed()).unwrap_or(false)
    }

    pub fn members(&self) -> Vec<PresenceChannelMember> {
        self.snapshot()
            .map(|c| c.members().to_vec())
            .unwrap_or_default()
    }

    /// Bind a callback to an event on this channel. `None` if the channel is no longer tracked.
    pub fn bind<F>(&self, event_name: &str, callback: F) -> Option<String>
    where
        F: Fn(&PusherEvent) + Send + Sync + 'static,
    {
        self.inner
            .channels
            .lock()
            .get_mut(&self.name)
            .map(|c| c.bind(event_name, Arc::new(callback)))
    }

    pub fn unbind(&self, event_name: &str, callback_id: &str) -> bool {
        self.inner
            .channels
            .lock()
            .get_mut(&self.name)
            .map(|c| c.unbind(event_name, callback_id))
            .unwrap_or(false)
    }

    pub fn unbind_all(&self) {
        if let Some(c) = self.inner.channels.lock().get_mut(&self.name) {
            c.unbind_all();
        }
    }
}
