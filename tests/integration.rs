//! Integration tests: auth endpoint routes, and the client authorizing subscriptions
//! against a live endpoint.
//!
//! Run with `cargo test`. The end-to-end tests bind an ephemeral port on 127.0.0.1.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use notif_client::client::{AuthMethod, ChannelSocket, SocketCommand};
use notif_client::{
    create_app, AppState, AuthRequestBuilder, ChannelSigner, Client, ClientOptions, Config,
    EndpointAuthRequestBuilder, ViewController,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::util::ServiceExt;

const APP_KEY: &str = "test-key";
const APP_SECRET: &str = "test-secret";
const ESTABLISHED: &str =
    r#"{"event":"pusher:connection_established","data":"{\"socket_id\":\"123.456\"}"}"#;

fn signer() -> ChannelSigner {
    ChannelSigner::new(APP_KEY.to_string(), APP_SECRET.to_string())
}

fn test_state() -> AppState {
    AppState { signer: signer() }
}

/// Serve the auth endpoint on an ephemeral port; returns its `/pusher/auth` URL.
async fn spawn_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_app(test_state())).await.unwrap();
    });
    format!("http://{}/pusher/auth", addr)
}

fn form_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/pusher/auth")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(res: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn subscribe_frames(rx: &mut mpsc::UnboundedReceiver<SocketCommand>) -> Vec<serde_json::Value> {
    let mut frames = Vec::new();
    while let Ok(cmd) = rx.try_recv() {
        if let SocketCommand::Send(text) = cmd {
            let frame: serde_json::Value = serde_json::from_str(&text).unwrap();
            if frame["event"] == "pusher:subscribe" {
                frames.push(frame);
            }
        }
    }
    frames
}

#[tokio::test]
async fn health_returns_ok() {
    let app = create_app(test_state());
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = json_body(res).await;
    assert_eq!(json.get("status").and_then(|v| v.as_str()), Some("ok"));
}

#[tokio::test]
async fn builder_request_is_accepted_by_endpoint() {
    let builder = EndpointAuthRequestBuilder::new(Some("http://localhost/pusher/auth".to_string()));
    let built = builder
        .request_for_channel_name("123.456", "private-chat")
        .unwrap();
    assert_eq!(built.body(), "socket_id=123.456&channel_name=private-chat");

    let app = create_app(test_state());
    let res = app.oneshot(form_request(built.body())).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let json = json_body(res).await;
    let auth = json["auth"].as_str().unwrap();
    assert!(signer()
        .verify_channel_auth("private-chat", "123.456", Some(auth), None)
        .is_ok());
    assert!(json.get("channel_data").is_none());
}

#[tokio::test]
async fn endpoint_rejects_public_and_incomplete_requests() {
    let app = create_app(test_state());

    let res = app
        .clone()
        .oneshot(form_request("socket_id=1.1&channel_name=my-channel"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(form_request("socket_id=&channel_name=private-chat"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .oneshot(form_request("socket_id=1.1&channel_name=presence-room"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn endpoint_signs_presence_with_channel_data() {
    let app = create_app(test_state());
    let body = serde_urlencoded::to_string([
        ("socket_id", "1.1"),
        ("channel_name", "presence-room"),
        ("channel_data", r#"{"user_id":"u1"}"#),
    ])
    .unwrap();
    let res = app.oneshot(form_request(&body)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let json = json_body(res).await;
    assert_eq!(json["channel_data"], r#"{"user_id":"u1"}"#);
    assert!(signer()
        .verify_channel_auth(
            "presence-room",
            "1.1",
            json["auth"].as_str(),
            Some(r#"{"user_id":"u1"}"#)
        )
        .is_ok());
}

#[tokio::test]
async fn client_authorizes_private_channel_through_endpoint() {
    let endpoint = spawn_endpoint().await;
    let builder: Arc<dyn AuthRequestBuilder> =
        Arc::new(EndpointAuthRequestBuilder::new(Some(endpoint)));
    let (socket, mut rx) = ChannelSocket::new();
    let client = Client::new(
        APP_KEY,
        ClientOptions::default().auth_method(AuthMethod::Builder(builder)),
        Arc::new(socket),
    );

    client.handle_message(ESTABLISHED).await;
    client.subscribe("private-chat").await;

    let frames = subscribe_frames(&mut rx);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["data"]["channel"], "private-chat");
    let auth = frames[0]["data"]["auth"].as_str().unwrap();
    assert!(signer()
        .verify_channel_auth("private-chat", "123.456", Some(auth), None)
        .is_ok());
}

#[tokio::test]
async fn harness_subscribes_and_reports_through_ui_queue() {
    let endpoint = spawn_endpoint().await;
    let config = Config {
        app_key: APP_KEY.to_string(),
        app_secret: APP_SECRET.to_string(),
        auth_endpoint: Some(endpoint),
        host: "localhost".to_string(),
        port: 6001,
        encrypted: false,
        server_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "debug".to_string(),
    };
    let (socket, mut rx) = ChannelSocket::new();
    let vc = ViewController::new(config, Arc::new(socket));
    let client = vc.make_and_launch_client().unwrap();

    client.handle_message(ESTABLISHED).await;
    client.subscribe("private-chat").await;
    client.subscribe("presence-room").await;

    let frames = subscribe_frames(&mut rx);
    assert_eq!(frames.len(), 1, "presence needs channel_data the builder does not send");
    client
        .handle_message(r#"{"event":"pusher_internal:subscription_succeeded","channel":"private-chat"}"#)
        .await;

    vc.drain_ui_events();
    let view = vc.view_state();
    assert_eq!(view.subscribed, vec!["private-chat".to_string()]);
    assert_eq!(view.failures.len(), 1);
    assert_eq!(view.failures[0].0, "presence-room");
    assert!(view.failures[0].1.contains("400"));
}
