//! Consumption harness: a controller that builds and launches a client, acting as its
//! delegate.
//!
//! Delegate callbacks can arrive on any task. They are queued as [`UiEvent`]s and only
//! applied to the controller's view state by [`ViewController::drain_ui_events`], which the
//! owner calls from its own (UI) context.

use http::HeaderValue;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::auth::{AuthRequestBuilder, EndpointAuthRequestBuilder};
use crate::client::{AuthMethod, Client, ClientDelegate, ClientOptions, ConnectionState, Socket};
use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::models::event::PusherError;

/// Header identifying harness traffic at the auth endpoint.
const HARNESS_HEADER: &str = "x-notif-harness";

/// A delegate callback, queued for the UI context.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    ConnectionState {
        old: ConnectionState,
        new: ConnectionState,
    },
    Subscribed(String),
    SubscriptionFailed {
        channel: String,
        reason: String,
    },
    ServerError(PusherError),
    Log(String),
}

/// What the controller shows.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub connection: ConnectionState,
    pub subscribed: Vec<String>,
    pub failures: Vec<(String, String)>,
    pub log: Vec<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            subscribed: Vec::new(),
            failures: Vec::new(),
            log: Vec::new(),
        }
    }
}

pub struct ViewController {
    config: Config,
    socket: Arc<dyn Socket>,
    auth_builder: Arc<dyn AuthRequestBuilder>,
    ui_tx: mpsc::UnboundedSender<UiEvent>,
    ui_rx: Mutex<mpsc::UnboundedReceiver<UiEvent>>,
    view: Mutex<ViewState>,
}

impl ViewController {
    pub fn new(config: Config, socket: Arc<dyn Socket>) -> Arc<Self> {
        let builder = EndpointAuthRequestBuilder::new(config.auth_endpoint.clone())
            .with_header(
                http::HeaderName::from_static(HARNESS_HEADER),
                HeaderValue::from_static("1"),
            );
        Self::with_auth_builder(config, socket, Arc::new(builder))
    }

    pub fn with_auth_builder(
        config: Config,
        socket: Arc<dyn Socket>,
        auth_builder: Arc<dyn AuthRequestBuilder>,
    ) -> Arc<Self> {
        let (ui_tx, ui_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            config,
            socket,
            auth_builder,
            ui_tx,
            ui_rx: Mutex::new(ui_rx),
            view: Mutex::new(ViewState::default()),
        })
    }

    /// The builder installed on every client this controller launches.
    pub fn auth_builder(&self) -> Arc<dyn AuthRequestBuilder> {
        self.auth_builder.clone()
    }

    /// Build a client from configuration with this controller's auth builder and itself as
    /// delegate, then start connecting.
    pub fn make_and_launch_client(self: &Arc<Self>) -> ClientResult<Client> {
        if self.config.app_key.is_empty() {
            return Err(ClientError::Config("APP_KEY is empty".to_string()));
        }
        let options = ClientOptions::from_config(&self.config)
            .auth_method(AuthMethod::Builder(self.auth_builder.clone()));
        let client = Client::new(self.config.app_key.clone(), options, self.socket.clone());
        client.set_delegate(self);
        info!(url = %client.url(), "launching client");
        client.connect();
        Ok(client)
    }

    /// Apply queued delegate callbacks to the view state. Returns how many were applied.
    pub fn drain_ui_events(&self) -> usize {
        let mut rx = self.ui_rx.lock();
        let mut view = self.view.lock();
        let mut applied = 0;
        while let Ok(event) = rx.try_recv() {
            apply(&mut view, event);
            applied += 1;
        }
        applied
    }

    pub fn view_state(&self) -> ViewState {
        self.view.lock().clone()
    }

    fn post(&self, event: UiEvent) {
        if self.ui_tx.send(event).is_err() {
            debug!("ui queue closed");
        }
    }
}

fn apply(view: &mut ViewState, event: UiEvent) {
    match event {
        UiEvent::ConnectionState { old, new } => {
            view.connection = new;
            view.log.push(format!("connection: {} -> {}", old, new));
        }
        UiEvent::Subscribed(channel) => {
            view.log.push(format!("subscribed to {}", channel));
            if !view.subscribed.contains(&channel) {
                view.subscribed.push(channel);
            }
        }
        UiEvent::SubscriptionFailed { channel, reason } => {
            view.log.push(format!("subscription to {} failed: {}", channel, reason));
            view.failures.push((channel, reason));
        }
        UiEvent::ServerError(error) => {
            view.log
                .push(format!("server error {:?}: {}", error.code, error.message));
        }
        UiEvent::Log(message) => view.log.push(message),
    }
}

impl ClientDelegate for ViewController {
    fn changed_connection_state(&self, old: ConnectionState, new: ConnectionState) {
        self.post(UiEvent::ConnectionState { old, new });
    }

    fn subscribed_to_channel(&self, name: &str) {
        self.post(UiEvent::Subscribed(name.to_string()));
    }

    fn failed_to_subscribe(&self, name: &str, error: &ClientError) {
        self.post(UiEvent::SubscriptionFailed {
            channel: name.to_string(),
            reason: error.to_string(),
        });
    }

    fn received_error(&self, error: &PusherError) {
        self.post(UiEvent::ServerError(error.clone()));
    }

    fn debug_log(&self, message: &str) {
        self.post(UiEvent::Log(message.to_string()));
    }
}
