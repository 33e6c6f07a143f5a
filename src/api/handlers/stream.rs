//! WebSocket streaming endpoint.
//!
//! Protocol: each client text message starts a pipeline run; the server
//! streams one `{"type": ..., "data": ...}` message per completed stage.
//! While a run is suspended on a `clarification_request`, the next client
//! text message is the answer. After `final_report` (or `error`) the
//! connection is ready for another request. Disconnecting aborts the
//! in-flight run and releases its resources silently.

use crate::{
    AppState,
    pipeline::RunOptions,
    types::PipelineEvent,
};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    tracing::info!("websocket client connected");

    'session: while let Some(message) = receiver.next().await {
        let request = match message {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Close(_)) | Err(_) => break,
            _ => continue,
        };
        if request.trim().is_empty() {
            continue;
        }

        let run_id = Uuid::new_v4();
        let (event_tx, mut event_rx) = mpsc::channel(32);
        let runner = Arc::clone(&state.runner);

        let run_task = tokio::spawn(async move {
            let result = runner
                .run(
                    run_id,
                    request,
                    RunOptions { interactive: true },
                    event_tx.clone(),
                )
                .await;

            if let Err(err) = result {
                tracing::warn!(%run_id, "run failed: {err}");
                let _ = event_tx.send(PipelineEvent::Error(err.to_string())).await;
            }
        });

        // Forward run events to the client while listening for the
        // clarification answer on the same socket.
        loop {
            tokio::select! {
                event = event_rx.recv() => match event {
                    Some(event) => {
                        let payload = match serde_json::to_string(&event) {
                            Ok(payload) => payload,
                            Err(err) => {
                                tracing::warn!(%run_id, "failed to serialize event: {err}");
                                continue;
                            }
                        };
                        if sender.send(Message::Text(payload.into())).await.is_err() {
                            run_task.abort();
                            break 'session;
                        }
                    }
                    // Run finished; wait for the next request.
                    None => break,
                },
                incoming = receiver.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(err) = state.runner.registry().resume(run_id, text.to_string()) {
                            tracing::warn!(%run_id, "ignoring mid-run message: {err}");
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                        run_task.abort();
                        break 'session;
                    }
                    _ => {}
                }
            }
        }
    }

    tracing::info!("websocket client disconnected");
}
