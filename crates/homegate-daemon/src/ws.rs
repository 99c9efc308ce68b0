//! WebSocket handler for real-time registry updates

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use homegate_registry::{DeviceRecord, RegistryEvent};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// WebSocket message types
#[derive(Serialize)]
#[serde(tag = "type", content = "data")]
enum WsMessage {
    #[serde(rename = "device_added")]
    DeviceAdded(DeviceRecord),
    #[serde(rename = "device_updated")]
    DeviceUpdated(DeviceRecord),
    #[serde(rename = "device_unpaired")]
    DeviceUnpaired { id: String },
    #[serde(rename = "device_removed")]
    DeviceRemoved { id: String },
    #[serde(rename = "discovery_started")]
    DiscoveryStarted,
    #[serde(rename = "discovery_completed")]
    DiscoveryCompleted { found: usize },
    #[serde(rename = "pong")]
    Pong,
}

impl From<RegistryEvent> for WsMessage {
    fn from(event: RegistryEvent) -> Self {
        match event {
            RegistryEvent::DeviceAdded(device) => Self::DeviceAdded(device),
            RegistryEvent::DeviceUpdated(device) => Self::DeviceUpdated(device),
            RegistryEvent::DeviceUnpaired(id) => Self::DeviceUnpaired { id },
            RegistryEvent::DeviceRemoved(id) => Self::DeviceRemoved { id },
            RegistryEvent::DiscoveryStarted => Self::DiscoveryStarted,
            RegistryEvent::DiscoveryCompleted { found } => Self::DiscoveryCompleted { found },
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
    let mut events = state.registry.subscribe();

    info!("WebSocket client connected");

    // Send current device list on connect
    for device in state.registry.list().await {
        let msg = WsMessage::DeviceAdded(device);
        if let Ok(json) = serde_json::to_string(&msg) {
            if sender.send(Message::Text(json.into())).await.is_err() {
                return;
            }
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let msg = WsMessage::from(event);
                        if let Ok(json) = serde_json::to_string(&msg) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "Registry event channel lagged");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Registry event channel closed");
                        break;
                    }
                }
            }

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
