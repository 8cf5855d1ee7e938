use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use parley_agent::Runtime;
use parley_channel::{Channel, ChannelError};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

pub fn router(runtime: Arc<Runtime>) -> Router {
    Router::new().route("/ws/chat", get(upgrade)).with_state(runtime)
}

async fn upgrade(
    ws: WebSocketUpgrade,
    State(runtime): State<Arc<Runtime>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle(socket, runtime))
}

async fn handle(socket: WebSocket, runtime: Arc<Runtime>) {
    let conversation_id = Uuid::new_v4();
    info!(
        event_name = "system.ws.connected",
        conversation_id = %conversation_id,
        "websocket conversation opened"
    );

    let channel = WebSocketChannel::new(socket);
    runtime.run_conversation(&channel).await;

    info!(
        event_name = "system.ws.closed",
        conversation_id = %conversation_id,
        "websocket conversation closed"
    );
}

/// Adapts one websocket to the engine's channel trait. The engine is strictly
/// turn-based, so sends and receives never overlap and one lock suffices.
struct WebSocketChannel {
    socket: Mutex<WebSocket>,
}

impl WebSocketChannel {
    fn new(socket: WebSocket) -> Self {
        Self { socket: Mutex::new(socket) }
    }
}

#[async_trait]
impl Channel for WebSocketChannel {
    async fn send_text(&self, text: &str) -> Result<(), ChannelError> {
        self.socket
            .lock()
            .await
            .send(Message::Text(text.to_string().into()))
            .await
            .map_err(|error| ChannelError::Transport(error.to_string()))
    }

    async fn recv_text(&self) -> Result<String, ChannelError> {
        let mut socket = self.socket.lock().await;
        loop {
            match socket.recv().await {
                None | Some(Ok(Message::Close(_))) => return Err(ChannelError::Disconnected),
                Some(Ok(Message::Text(text))) => return Ok(text.to_string()),
                // Control frames and binary payloads are not conversation turns.
                Some(Ok(_)) => continue,
                Some(Err(error)) => return Err(ChannelError::Transport(error.to_string())),
            }
        }
    }
}
