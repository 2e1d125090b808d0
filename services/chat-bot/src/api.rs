//! HTTP and WebSocket surface.
//!
//! - `GET /ws`: overlay subscription; receives every published [`chatcollect_types::OverlayEvent`].
//! - `GET /healthz`
//! - `GET /status`: current event status snapshot.
//! - `POST /chat`: the chat client submits `{user, message}` and gets `{reply}` back.
//! - `GET /leaderboard?show=true|false`: pushes a leaderboard snapshot to overlays.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chatcollect_types::{EventStatus, LeaderboardRow};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    actor::{Mailbox, MailboxClosed},
    broadcaster::Broadcaster,
};

#[derive(Clone)]
pub struct AppState {
    pub mailbox: Mailbox,
    pub broadcaster: Broadcaster,
    /// Queue depth per overlay subscriber.
    pub overlay_queue: usize,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_show")]
    pub show: bool,
}

fn default_show() -> bool {
    true
}

impl IntoResponse for MailboxClosed {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::SERVICE_UNAVAILABLE, self.to_string()).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(healthz))
        .route("/status", get(status))
        .route("/chat", post(chat))
        .route("/leaderboard", get(leaderboard))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn status(State(state): State<AppState>) -> Result<Json<EventStatus>, MailboxClosed> {
    Ok(Json(state.mailbox.status().await?))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, MailboxClosed> {
    let reply = state.mailbox.chat(&request.user, &request.message).await?;
    Ok(Json(ChatResponse { reply }))
}

async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardRow>>, MailboxClosed> {
    Ok(Json(state.mailbox.leaderboard(query.show).await?))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sender, receiver) = socket.split();
    let (id, events) = state.broadcaster.subscribe(state.overlay_queue);
    forward(sender, receiver, events).await;
    state.broadcaster.unsubscribe(id);
    debug!(id, "overlay disconnected");
}

/// Relay queued payloads to the socket until either side ends. Overlays only listen, so
/// inbound frames are drained. When the broadcaster drops the queue the socket is closed so the
/// overlay reconnects.
async fn forward<Tx, Rx, E>(mut sink: Tx, mut stream: Rx, mut events: mpsc::Receiver<String>)
where
    Tx: Sink<Message> + Unpin,
    Rx: Stream<Item = Result<Message, E>> + Unpin,
    E: std::fmt::Debug,
{
    loop {
        tokio::select! {
            payload = events.recv() => match payload {
                Some(payload) => {
                    if sink.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                None => {
                    debug!("overlay queue closed; closing socket");
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            message = stream.next() => match message {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(?err, "overlay socket error");
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use chatcollect_execution::{mocks::ScriptedRng, GameEngine, PlayerLedger};
    use chatcollect_types::{GameConfig, OverlayEvent};
    use futures_util::stream;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app() -> (TempDir, Router, mpsc::Receiver<String>) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = PlayerLedger::open(dir.path().join("players.txt"));
        let engine = GameEngine::new(GameConfig::default(), ledger, ScriptedRng::new());
        let broadcaster = Broadcaster::new();
        let (outbox, outbox_rx) = mpsc::channel(16);
        let mailbox = Actor::new(engine, broadcaster.clone(), outbox).spawn(16);
        let state = AppState {
            mailbox,
            broadcaster,
            overlay_queue: 16,
        };
        (dir, router(state), outbox_rx)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let (_dir, app, _outbox) = app();
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let (_dir, app, _outbox) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"user": "alice", "message": "!loot"}"#))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        let reply = value["reply"].as_str().unwrap();
        assert!(reply.starts_with("🍞 @alice looted"));

        let request = Request::builder()
            .uri("/leaderboard?show=false")
            .body(Body::empty())
            .unwrap();
        let value = body_json(app.oneshot(request).await.unwrap()).await;
        assert_eq!(value[0]["username"], "alice");
        assert_eq!(value[0]["score"], 1);
    }

    #[tokio::test]
    async fn test_status_snapshot() {
        let (_dir, app, _outbox) = app();
        let response = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let value = body_json(response).await;
        assert_eq!(value["contest_state"], "inactive");
        assert_eq!(value["loot_drive_progress"], "Inactive");
        assert_eq!(value["bounty_hunter_craving"], "None");
    }

    #[tokio::test]
    async fn test_ignored_chat_has_null_reply() {
        let (_dir, app, _outbox) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"user": "alice", "message": "good stream"}"#))
            .unwrap();
        let value = body_json(app.oneshot(request).await.unwrap()).await;
        assert!(value["reply"].is_null());
    }

    #[tokio::test]
    async fn test_unstorable_user_gets_no_reply() {
        let (_dir, app, _outbox) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"user": "evil\nvictim | 100000 | 0", "message": "!loot"}"#))
            .unwrap();
        let value = body_json(app.clone().oneshot(request).await.unwrap()).await;
        assert!(value["reply"].is_null());

        let request = Request::builder()
            .uri("/leaderboard?show=false")
            .body(Body::empty())
            .unwrap();
        let value = body_json(app.oneshot(request).await.unwrap()).await;
        assert_eq!(value.as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn test_dropped_subscriber_closes_socket() {
        let broadcaster = Broadcaster::new();
        let (_id, events) = broadcaster.subscribe(1);
        let event = OverlayEvent::LeaderboardUpdate {
            show: true,
            data: Vec::new(),
        };
        assert_eq!(broadcaster.publish(&event), 1);
        // Queue full: the subscriber is dropped.
        assert_eq!(broadcaster.publish(&event), 0);

        let mut sent: Vec<Message> = Vec::new();
        let inbound = stream::pending::<Result<Message, axum::Error>>();
        tokio::time::timeout(Duration::from_secs(1), forward(&mut sent, inbound, events))
            .await
            .expect("socket left open after subscriber was dropped");

        assert_eq!(sent.len(), 2);
        assert!(matches!(&sent[0], Message::Text(payload) if payload.contains("leaderboard_update")));
        assert!(matches!(sent[1], Message::Close(None)));
    }

    #[tokio::test]
    async fn test_client_close_ends_forwarding() {
        let broadcaster = Broadcaster::new();
        let (_id, events) = broadcaster.subscribe(4);
        let mut sent: Vec<Message> = Vec::new();
        let inbound = stream::iter(vec![Ok::<_, axum::Error>(Message::Close(None))]);
        tokio::time::timeout(Duration::from_secs(1), forward(&mut sent, inbound, events))
            .await
            .unwrap();
        assert!(sent.is_empty());
    }
}
