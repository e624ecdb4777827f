//! WebSocket transport for the hub protocol
//!
//! Each socket is split: a writer task drains the connection's outbound
//! queue into the sink while the handler loop feeds inbound frames to the
//! hub in arrival order. Authentication happens in-band, so the upgrade
//! itself is unconditional.

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::http::AppState;

/// How long the writer may keep flushing queued frames after the reader ends
const WRITER_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

pub async fn websocket_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.max_message_size(state.max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();

    let (connection_id, mut outbound) = match state.hub.connect() {
        Ok(registered) => registered,
        Err(err) => {
            warn!(error = %err, "Refusing WebSocket connection");
            let _ = sink
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "Server at capacity".into(),
                })))
                .await;
            return;
        }
    };
    info!(connection_id = %connection_id, "WebSocket connection established");

    let writer_id = connection_id.clone();
    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(err) = sink.send(Message::Text(frame.to_string().into())).await {
                debug!(connection_id = %writer_id, error = %err, "WebSocket send failed");
                return;
            }
        }
        let _ = sink.close().await;
    });

    let mut shutdown = state.shutdown.clone();
    loop {
        let frame = tokio::select! {
            frame = stream.next() => frame,
            () = shutdown_requested(shutdown.as_mut()) => {
                debug!(connection_id = %connection_id, "Closing WebSocket for shutdown");
                break;
            }
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                state.hub.handle_text(&connection_id, text.as_str()).await;
            }
            Some(Ok(Message::Binary(_))) => state.hub.handle_binary(&connection_id),
            // axum answers pings itself
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(Message::Close(_))) | None => break,
            Some(Err(err)) => {
                debug!(connection_id = %connection_id, error = %err, "WebSocket receive failed");
                break;
            }
        }
    }

    // Dropping the connection's queue lets the writer flush and finish
    state.hub.disconnect(&connection_id).await;
    if tokio::time::timeout(WRITER_FLUSH_TIMEOUT, &mut writer)
        .await
        .is_err()
    {
        writer.abort();
    }

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Resolves once the shutdown flag is raised; never without a receiver
async fn shutdown_requested(shutdown: Option<&mut watch::Receiver<bool>>) {
    if let Some(shutdown) = shutdown {
        if shutdown.wait_for(|stop| *stop).await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await;
}
