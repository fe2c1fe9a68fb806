// ============================
// authchat-backend-lib/src/ws_router.rs
// ============================
//! HTTP router and `/chathub` WebSocket connection handling.
use std::sync::Arc;

use authchat_common::{ClientToServer, ServerToClient};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::authorization::current_session;
use crate::error::AppError;
use crate::handlers::{account, home};
use crate::hub::ChatHub;
use crate::metrics::{WS_ACTIVE, WS_CONNECTION, WS_DISCONNECTION};
use crate::AppState;

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors_allow_any = state.settings.server.cors_allow_any;

    let router = Router::new()
        .route("/", get(home::index))
        .route("/Home/Index", get(home::index))
        .route("/Home/Chat", get(home::chat))
        .route("/Home/Admin", get(home::admin))
        .route("/Identity/Account/Register", post(account::register))
        .route("/Identity/Account/Login", post(account::login))
        .route("/Identity/Account/Logout", post(account::logout))
        .route("/chathub", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors_allow_any {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Handler for hub WebSocket connections
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let session = current_session(&state, &headers).await;
    if state.settings.chat.require_authentication && session.is_none() {
        tracing::info!("rejecting anonymous hub connection");
        return Err(AppError::Unauthorized(
            "sign in to join the chat".to_string(),
        ));
    }

    let user = session.map(|s| s.email);
    Ok(ws
        .on_upgrade(move |socket| handle_connection(socket, state, user))
        .into_response())
}

/// Connection counters for one upgraded socket, released on drop
struct ConnectionMetrics;

impl ConnectionMetrics {
    fn open() -> Self {
        counter!(WS_CONNECTION).increment(1);
        gauge!(WS_ACTIVE).increment(1.0);
        ConnectionMetrics
    }
}

impl Drop for ConnectionMetrics {
    fn drop(&mut self) {
        counter!(WS_DISCONNECTION).increment(1);
        gauge!(WS_ACTIVE).decrement(1.0);
    }
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>, user: Option<String>) {
    let _metrics = ConnectionMetrics::open();
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Frames for this client: broadcasts from the registry and direct replies
    let (client_tx, mut client_rx) =
        mpsc::channel::<ServerToClient>(state.settings.chat.client_buffer);
    let connection_id = state.connections.register(client_tx.clone());
    tracing::info!(%connection_id, user = user.as_deref().unwrap_or("anonymous"), "hub client connected");

    // Forward frames from the channel to the WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(frame) = client_rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize hub frame");
                    continue;
                },
            };
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let hub = state.chat_hub();
    while let Some(Ok(message)) = ws_rx.next().await {
        let reply = match message {
            Message::Text(text) => handle_frame(&hub, text.as_str()).await,
            Message::Close(_) => break,
            _ => None, // Binary and control frames are ignored
        };

        if let Some(reply) = reply {
            if client_tx.send(reply).await.is_err() {
                tracing::debug!(%connection_id, "client channel closed");
                break;
            }
        }
    }

    // Cleanup: unregister client when connection drops
    state.connections.unregister(&connection_id);
    tracing::info!(%connection_id, "hub client disconnected");

    send_task.abort();
}

/// Process one text frame, returning the reply for the caller, if any
async fn handle_frame(hub: &ChatHub, text: &str) -> Option<ServerToClient> {
    match serde_json::from_str::<ClientToServer>(text) {
        Ok(ClientToServer::Invocation {
            invocation_id,
            target,
            arguments,
        }) => match hub.invoke(&target, arguments).await {
            Ok(()) => invocation_id.map(|id| ServerToClient::Completion {
                invocation_id: Some(id),
                error: None,
            }),
            Err(e) => {
                tracing::debug!(error = %e, "hub invocation refused");
                Some(ServerToClient::Completion {
                    invocation_id,
                    error: Some(e.to_string()),
                })
            },
        },
        Ok(ClientToServer::Ping) => Some(ServerToClient::Pong),
        Err(e) => Some(ServerToClient::MalformedMessage {
            err_msg: e.to_string(),
        }),
    }
}
