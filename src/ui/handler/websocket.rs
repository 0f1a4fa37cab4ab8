//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::{domain::SessionId, ui::state::AppState};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    // セッション識別子はサーバー側で採番する（クライアントは申告しない）
    let session_id = SessionId::generate();

    // Create a channel for this session to receive messages
    let (tx, rx) = mpsc::unbounded_channel();
    state.message_pusher.register_session(session_id, tx).await;
    state.dispatcher.on_connect(session_id).await;

    tracing::info!("Session '{}' connected", session_id);
    ws.on_upgrade(move |socket| handle_socket(socket, state, session_id, rx))
}

/// Spawns a task that receives messages from the rx channel and pushes them to the WebSocket sender.
///
/// This function handles the outbound message flow: events addressed to this
/// session (fan-out, presence, error acks) arrive on the rx channel and are
/// written to the socket.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    session_id: SessionId,
    rx: mpsc::UnboundedReceiver<String>,
) {
    let (sender, mut receiver) = socket.split();

    let state_clone = state.clone();

    // Spawn a task to receive messages from this session
    //
    // メッセージは到着順に 1 件ずつ await して処理する（同一セッション内の
    // 順序保証はこの逐次処理に依る）。
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error on session '{}': {}", session_id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    state_clone.dispatcher.handle_message(session_id, &text).await;
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping from '{}'", session_id);
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(_) => {
                    tracing::info!("Session '{}' requested close", session_id);
                    break;
                }
                _ => {}
            }
        }
    });

    // Spawn a task to receive messages from other sessions and send to this session
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // 切断処理: 送信チャネルを先に外してから Registry を破棄する
    // （user-offline の配信先から自分を確実に除くため）
    state.message_pusher.unregister_session(&session_id).await;
    state.dispatcher.on_disconnect(session_id).await;
    tracing::info!("Session '{}' disconnected", session_id);
}
