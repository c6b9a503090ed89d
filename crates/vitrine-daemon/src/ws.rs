//! WebSocket handler for catalog change notifications

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use vitrine_core::Product;

use crate::state::{AppState, CatalogEvent};

/// WebSocket message types
#[derive(Serialize)]
#[serde(tag = "type", content = "data")]
enum WsMessage {
    #[serde(rename = "product_created")]
    ProductCreated(Product),
    #[serde(rename = "product_updated")]
    ProductUpdated(Product),
    #[serde(rename = "product_removed")]
    ProductRemoved { id: String },
    #[serde(rename = "pong")]
    Pong,
}

impl From<CatalogEvent> for WsMessage {
    fn from(event: CatalogEvent) -> Self {
        match event {
            CatalogEvent::Created(product) => WsMessage::ProductCreated(product),
            CatalogEvent::Updated(product) => WsMessage::ProductUpdated(product),
            CatalogEvent::Removed(id) => WsMessage::ProductRemoved { id: id.0 },
        }
    }
}

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut catalog_events = state.subscribe();

    info!("WebSocket client connected");

    loop {
        tokio::select! {
            // Forward catalog events to client
            event = catalog_events.recv() => {
                match event {
                    Ok(event) => {
                        if let Ok(json) = serde_json::to_string(&WsMessage::from(event)) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        // Clients refetch on the next event anyway
                        debug!(skipped = n, "Catalog event channel lagged");
                    }
                    Err(e) => {
                        debug!(error = %e, "Catalog event channel error");
                        break;
                    }
                }
            }

            // Handle incoming messages from client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        if text.as_str() == "ping" {
                            if let Ok(pong) = serde_json::to_string(&WsMessage::Pong) {
                                if sender.send(Message::Text(pong.into())).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::ProductId;

    #[test]
    fn test_message_wire_shape() {
        let msg = WsMessage::from(CatalogEvent::Removed(ProductId::from("abc")));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "product_removed");
        assert_eq!(json["data"]["id"], "abc");

        let pong = serde_json::to_value(&WsMessage::Pong).unwrap();
        assert_eq!(pong["type"], "pong");
    }
}
