//! Live ledger events over WebSocket.
//!
//! Committed events are fanned out through a bounded broadcast channel. A
//! subscriber that falls behind loses the oldest events and is told how many it
//! missed; it can catch up through `GET /api/events`.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use flight_surety_ledger::EventRecord;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Broadcaster handed to handlers and background tasks.
#[derive(Clone, Debug)]
pub struct WsState {
    sender: broadcast::Sender<EventRecord>,
}

impl WsState {
    pub fn new(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Send an event to all subscribers. Never blocks.
    pub fn broadcast_event(&self, record: EventRecord) {
        let sequence = record.sequence;
        match self.sender.send(record) {
            Ok(receivers) => debug!(sequence, receivers, "ledger event broadcast"),
            Err(_) => debug!(sequence, "ledger event dropped (no subscribers)"),
        }
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(ws_state): State<WsState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, ws_state))
}

async fn handle_socket(socket: WebSocket, ws_state: WsState) {
    let (mut sink, mut stream) = socket.split();
    let mut events = ws_state.subscribe();
    debug!(subscribers = ws_state.receiver_count(), "websocket client connected");

    loop {
        tokio::select! {
            received = events.recv() => {
                let payload = match received {
                    Ok(record) => serde_json::to_string(&record),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "websocket client lagged behind the event stream");
                        serde_json::to_string(&json!({ "event": "Lagged", "missed": missed }))
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let text = match payload {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "failed to encode ledger event");
                        continue;
                    }
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "websocket receive error");
                        break;
                    }
                }
            }
        }
    }

    debug!("websocket client disconnected");
}

#[cfg(test)]
mod test {
    use super::*;
    use flight_surety_ledger::LedgerEvent;

    #[test]
    fn test_broadcaster_basic() {
        let ws_state = WsState::new(8);
        let mut receiver = ws_state.subscribe();

        ws_state.broadcast_event(EventRecord {
            sequence: 1,
            event: LedgerEvent::OperationalStatusChanged { operational: false },
        });

        let record = receiver.try_recv().unwrap();
        assert_eq!(record.sequence, 1);
        assert_eq!(record.event.name(), "OperationalStatusChanged");
    }

    #[test]
    fn test_broadcast_without_subscribers_is_harmless() {
        let ws_state = WsState::new(8);
        ws_state.broadcast_event(EventRecord {
            sequence: 1,
            event: LedgerEvent::OperationalStatusChanged { operational: true },
        });
        assert_eq!(ws_state.receiver_count(), 0);
    }
}
