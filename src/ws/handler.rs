//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::hub::Frame;
use crate::ws::protocol::ClientMsg;
use crate::ws::session::Session;

/// WebSocket upgrade handler. Connections are anonymous; the player id is minted here.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    info!(connection_id = %connection_id, "New WebSocket connection");

    let rate_limiter = ConnectionRateLimiter::new(state.config.input_rate_limit);
    let (session, outbound) = Session::open(state, connection_id);
    let (ws_sink, ws_stream) = socket.split();

    // Writer task: hub queue -> WebSocket
    let writer_handle = tokio::spawn(write_frames(connection_id, ws_sink, outbound));

    run_session(session, ws_stream, rate_limiter).await;

    writer_handle.abort();
    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Reader loop: WebSocket -> session. Returns once the client is gone.
async fn run_session(
    mut session: Session,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    rate_limiter: ConnectionRateLimiter,
) {
    let connection_id = session.id();

    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(connection_id = %connection_id, "Rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(client_msg) => session.handle(client_msg).await,
                    Err(e) => {
                        warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Same cleanup as leaveRoom, then drop the outbound queue
    debug!(connection_id = %connection_id, room = ?session.room(), "Closing session");
    session.close();
}

async fn write_frames(
    connection_id: Uuid,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Frame>,
) {
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = ws_sink.send(Message::Text(frame.to_string())).await {
            debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
            break;
        }
    }
}
