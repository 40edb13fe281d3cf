use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use metrics::gauge;
use tokio::sync::broadcast::error::RecvError;

use crate::errors::AppError;
use crate::realtime::{ChangeEvent, ChangeKind, Table};
use crate::AppState;

/// GET /realtime/:table: one WebSocket is one change channel for one table.
pub async fn handler(
    ws: WebSocketUpgrade,
    Path(table): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let Ok(table) = table.parse::<Table>() else {
        return AppError::UnknownTable(table).into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, table))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, table: Table) {
    // Subscribe before anything else so no change after the upgrade is missed.
    let mut rx = state.changes.subscribe();
    gauge!("realtime_subscribers").increment(1.0);
    tracing::info!(table = %table, "Realtime channel opened");

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(event) if event.table == table => {
                        match serde_json::to_string(&event) {
                            Ok(json) => {
                                if socket.send(Message::Text(json)).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to serialize change event");
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(n)) => {
                        // Skipped events may include this table; make the client re-read.
                        tracing::warn!(table = %table, skipped = n, "Realtime channel lagged");
                        let resync = ChangeEvent { table, event: ChangeKind::Update };
                        match serde_json::to_string(&resync) {
                            Ok(json) => {
                                if socket.send(Message::Text(json)).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => tracing::error!(error = %e, "Failed to serialize change event"),
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            client_msg = socket.recv() => {
                match client_msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    gauge!("realtime_subscribers").decrement(1.0);
    tracing::info!(table = %table, "Realtime channel closed");
}
