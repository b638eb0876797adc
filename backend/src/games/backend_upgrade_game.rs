use axum::{
    extract::{State, ws::{Message, WebSocket, WebSocketUpgrade}},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json,
    Router,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::{mpsc, OwnedSemaphorePermit};
use tracing::{debug, error, info, warn};
use upgrade_shared::shared_upgrade_game::{
    InventorySnapshot, PreviewRequest, PreviewResponse, ServerMessage, SpinError, SpinReply,
};
use upgrade_shared::validation::{validate_spin_request, SpinRequest};
use uuid::Uuid;
use crate::AppState;
use crate::error::Error;
use crate::games::spin_guard::SpinGuard;
use crate::services::inventory_authority::InventoryHandle;
use crate::services::session_broadcaster::SessionId;

const MAX_MESSAGE_BYTES: usize = 64 * 1024;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/preview", post(preview))
        .route("/ws", get(ws_handler))
}

async fn get_state(State(state): State<AppState>) -> Result<Json<InventorySnapshot>, Error> {
    Ok(Json(state.inventory.snapshot().await?))
}

/// A missing or unreadable body previews an empty selection.
async fn preview(
    State(state): State<AppState>,
    body: Option<Json<PreviewRequest>>,
) -> Result<Json<PreviewResponse>, Error> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let chance = state.inventory.preview(request).await?;
    Ok(Json(PreviewResponse { chance }))
}

#[derive(Debug)]
enum ClientMessage {
    /// `None` when the frame is a spin but its id lists are not string arrays.
    Spin(Option<SpinRequest>),
}

impl ClientMessage {
    fn parse(text: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(text).ok()?;
        match value.get("type").and_then(|kind| kind.as_str()) {
            Some("spin") => Some(ClientMessage::Spin(serde_json::from_value(value).ok())),
            _ => None,
        }
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // The slot is taken before upgrading and released when the socket task ends.
    let slot = match state.connections.clone().try_acquire_owned() {
        Ok(slot) => slot,
        Err(_) => {
            warn!("Maximum concurrent connections reached, refusing upgrade");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    };

    ws.max_message_size(MAX_MESSAGE_BYTES)
        .max_frame_size(MAX_MESSAGE_BYTES)
        .on_upgrade(move |socket| handle_socket(socket, state.inventory, slot))
}

async fn handle_socket(socket: WebSocket, inventory: InventoryHandle, _slot: OwnedSemaphorePermit) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let session_id = Uuid::new_v4();

    if let Err(e) = inventory.connect(session_id, tx.clone()).await {
        error!("Failed to register session {}: {}", session_id, e);
        return;
    }
    match inventory.session_count().await {
        Ok(count) => info!("🔌 New WebSocket connection {} ({} live)", session_id, count),
        Err(e) => warn!("Session {} connected but the count is unavailable: {}", session_id, e),
    }

    // Forward queued frames to the socket
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = sender.send(Message::Text(frame)).await {
                warn!("WebSocket send error: {:?} - Connection will be closed", e);
                break;
            }
        }
        if let Err(e) = sender.close().await {
            debug!("WebSocket for session {} already closed: {:?}", session_id, e);
        }
    });

    let guard = SpinGuard::default();
    while let Some(message) = receiver.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                // Oversized messages end up here too.
                warn!("WebSocket read error from session {}: {}", session_id, e);
                break;
            }
        };

        match ClientMessage::parse(&text) {
            Some(ClientMessage::Spin(request)) => {
                start_spin(&inventory, session_id, &guard, &tx, request);
            }
            None => warn!("Invalid message format from session {}", session_id),
        }
    }

    if guard.is_spinning() {
        debug!("Session {} closed with a spin still settling", session_id);
    }
    inventory.disconnect(session_id).await;
    info!("WebSocket closed and session {} removed", session_id);
}

/// Takes the connection's guard and settles in the background, so the socket
/// keeps reading while the authority works. A second spin arriving meanwhile
/// is turned away here without reaching the authority.
fn start_spin(
    inventory: &InventoryHandle,
    session_id: SessionId,
    guard: &SpinGuard,
    outbound: &mpsc::UnboundedSender<String>,
    request: Option<SpinRequest>,
) {
    let permit = match guard.try_acquire() {
        Ok(permit) => permit,
        Err(e) => {
            warn!("Session {} tried to spin while a spin is in progress", session_id);
            send_rejection(outbound, &e);
            return;
        }
    };

    let inventory = inventory.clone();
    let outbound = outbound.clone();
    tokio::spawn(async move {
        let _permit = permit;
        let settlement = tokio::spawn(run_spin(inventory, session_id, request, outbound.clone()));
        if let Err(e) = settlement.await {
            error!("Spin task for session {} failed: {}", session_id, e);
            send_rejection(&outbound, &SpinError::Internal);
        }
    });
}

async fn run_spin(
    inventory: InventoryHandle,
    session_id: SessionId,
    request: Option<SpinRequest>,
    outbound: mpsc::UnboundedSender<String>,
) {
    let claim = match request
        .ok_or(SpinError::InvalidRequest)
        .and_then(|request| validate_spin_request(&request))
    {
        Ok(claim) => claim,
        Err(e) => {
            debug!("Session {} sent an invalid spin: {}", session_id, e);
            send_rejection(&outbound, &e);
            return;
        }
    };

    // The authority delivers settled and stale outcomes to the session itself.
    match inventory.spin(session_id, claim).await {
        Ok(Ok(result)) => debug!("Session {} spin settled (win: {})", session_id, result.win),
        Ok(Err(e)) => debug!("Session {} spin rejected: {}", session_id, e),
        Err(e) => {
            error!("Spin for session {} was not settled: {}", session_id, e);
            send_rejection(&outbound, &SpinError::Internal);
        }
    }
}

fn send_rejection(outbound: &mpsc::UnboundedSender<String>, error: &SpinError) {
    match serde_json::to_string(&ServerMessage::SpinResult(SpinReply::rejected(error))) {
        Ok(frame) => {
            let _ = outbound.send(frame);
        }
        Err(e) => error!("Failed to serialize spin rejection: {}", e),
    }
}
