use crate::http::AppState;
use crate::responder;
use crate::snapshot::Snapshot;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Inbound chat envelope. The `stats` payload has the same shape as the
/// `/stats` body, so a client can hand back the bundle it last polled.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Inbound {
    SendMessage {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        stats: Option<Snapshot>,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Outbound {
    BotResponse { message: String },
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

/// Serves one chat connection. Messages are processed sequentially, so
/// replies go out in the order their queries arrived, each after the
/// configured think-delay. A reply to a client that disconnected in the
/// meantime is simply dropped with the connection.
async fn handle_connection(mut socket: WebSocket, state: AppState) {
    info!("chat client connected");

    while let Some(frame) = socket.recv().await {
        let message = match frame {
            Ok(message) => message,
            Err(err) => {
                debug!(error = %err, "chat receive failed");
                break;
            }
        };

        match message {
            Message::Text(text) => {
                state.metrics.inc_chat_message();
                let (query, stats) = parse_inbound(&text);
                let reply = responder::respond(&query, stats.as_ref());

                tokio::time::sleep(state.reply_delay).await;

                let outbound = Outbound::BotResponse { message: reply };
                let Ok(encoded) = serde_json::to_string(&outbound) else {
                    continue;
                };
                if socket.send(Message::Text(encoded)).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            // Pings are answered by axum automatically; binary frames are
            // not part of the protocol.
            _ => {}
        }
    }

    info!("chat client disconnected");
}

/// Extracts the query text and optional snapshot payload from a raw frame.
/// Malformed payloads degrade to an empty query with no snapshot, which the
/// response engine turns into its fixed fallback message.
fn parse_inbound(text: &str) -> (String, Option<Snapshot>) {
    match serde_json::from_str::<Inbound>(text) {
        Ok(Inbound::SendMessage { message, stats }) => (message.unwrap_or_default(), stats),
        Err(err) => {
            warn!(error = %err, "malformed chat payload");
            (String::new(), None)
        }
    }
}
