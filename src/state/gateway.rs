//! Broadcast groups: the live WebSocket connections attached to each room.

use std::collections::HashMap;

use axum::extract::ws::Message;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Server-side identifier of a WebSocket connection.
pub type ConnectionId = Uuid;

#[derive(Clone, Debug)]
/// Handle used to push messages to a connected client.
pub struct Connection {
    /// Identifier allocated when the socket was accepted.
    pub id: ConnectionId,
    /// Writer channel drained by the socket's writer task.
    pub tx: mpsc::UnboundedSender<Message>,
}

impl Connection {
    /// Wrap a writer channel with a fresh connection id.
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tx,
        }
    }
}

#[derive(Clone, Debug)]
struct Member {
    participant_id: String,
    tx: mpsc::UnboundedSender<Message>,
}

/// Outcome of detaching a connection from its group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    /// Participant the connection was bound to.
    pub participant_id: String,
    /// Whether the participant still has another live connection in the group.
    pub still_connected: bool,
}

/// Fan-out of room events to every connection attached to the room.
#[derive(Default)]
pub struct BroadcastGateway {
    groups: DashMap<String, HashMap<ConnectionId, Member>>,
}

impl BroadcastGateway {
    /// Create an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a connection, bound to a participant, to a room's group.
    pub fn join_group(&self, room_id: &str, connection: &Connection, participant_id: &str) {
        self.groups.entry(room_id.to_string()).or_default().insert(
            connection.id,
            Member {
                participant_id: participant_id.to_string(),
                tx: connection.tx.clone(),
            },
        );
    }

    /// Detach a connection from a room's group, dropping the group once empty.
    pub fn leave_group(&self, room_id: &str, connection_id: ConnectionId) -> Option<Departure> {
        let departure = {
            let mut group = self.groups.get_mut(room_id)?;
            let member = group.remove(&connection_id)?;
            let still_connected = group
                .values()
                .any(|other| other.participant_id == member.participant_id);
            Departure {
                participant_id: member.participant_id,
                still_connected,
            }
        };
        self.groups.remove_if(room_id, |_, group| group.is_empty());
        Some(departure)
    }

    /// Forget a room's group entirely.
    pub fn drop_group(&self, room_id: &str) {
        self.groups.remove(room_id);
    }

    /// Number of live connections attached to a room.
    pub fn connection_count(&self, room_id: &str) -> usize {
        self.groups.get(room_id).map_or(0, |group| group.len())
    }

    /// Send an event to every connection of the room; returns the number of deliveries.
    ///
    /// Broadcasting to a room without connections is a no-op.
    pub fn broadcast<T>(&self, room_id: &str, event: &T) -> usize
    where
        T: ?Sized + Serialize + std::fmt::Debug,
    {
        let Some(payload) = encode(event) else {
            return 0;
        };
        let Some(group) = self.groups.get(room_id) else {
            return 0;
        };

        // Closed writers are detached by their socket task on disconnect.
        let mut delivered = 0;
        for (connection_id, member) in group.iter() {
            if member.tx.send(Message::Text(payload.clone().into())).is_ok() {
                delivered += 1;
            } else {
                debug!(room_id, %connection_id, "skipping closed connection");
            }
        }
        delivered
    }

    /// Send a private event to a single connection.
    pub fn unicast<T>(&self, connection: &Connection, event: &T) -> bool
    where
        T: ?Sized + Serialize + std::fmt::Debug,
    {
        send_message_to_websocket(&connection.tx, event)
    }
}

/// Serialize a payload and push it onto the provided WebSocket writer.
///
/// Returns `false` when serialization failed or the writer is closed.
pub fn send_message_to_websocket<T>(tx: &mpsc::UnboundedSender<Message>, value: &T) -> bool
where
    T: ?Sized + Serialize + std::fmt::Debug,
{
    let Some(payload) = encode(value) else {
        return false;
    };
    tx.send(Message::Text(payload.into())).is_ok()
}

fn encode<T>(value: &T) -> Option<String>
where
    T: ?Sized + Serialize + std::fmt::Debug,
{
    match serde_json::to_string(value) {
        Ok(payload) => Some(payload),
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}`");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> (Connection, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Connection::new(tx), rx)
    }

    fn texts(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(Message::Text(text)) = rx.try_recv() {
            out.push(text.to_string());
        }
        out
    }

    #[test]
    fn broadcast_reaches_every_connection_of_the_room_only() {
        let gateway = BroadcastGateway::new();
        let (a, mut a_rx) = connection();
        let (b, mut b_rx) = connection();
        let (other, mut other_rx) = connection();
        gateway.join_group("ROOM01", &a, "alice");
        gateway.join_group("ROOM01", &b, "alice");
        gateway.join_group("ROOM02", &other, "bob");

        assert_eq!(gateway.broadcast("ROOM01", &serde_json::json!({"n": 1})), 2);
        assert_eq!(texts(&mut a_rx), vec![r#"{"n":1}"#.to_string()]);
        assert_eq!(texts(&mut b_rx).len(), 1);
        assert!(texts(&mut other_rx).is_empty());
    }

    #[test]
    fn broadcast_to_unknown_room_is_a_noop() {
        let gateway = BroadcastGateway::new();
        assert_eq!(gateway.broadcast("NOPE00", &"hello"), 0);
    }

    #[test]
    fn leaving_reports_remaining_connections_of_the_participant() {
        let gateway = BroadcastGateway::new();
        let (first, _first_rx) = connection();
        let (second, _second_rx) = connection();
        gateway.join_group("ROOM01", &first, "alice");
        gateway.join_group("ROOM01", &second, "alice");

        let departure = gateway.leave_group("ROOM01", first.id).unwrap();
        assert!(departure.still_connected);
        let departure = gateway.leave_group("ROOM01", second.id).unwrap();
        assert_eq!(departure.participant_id, "alice");
        assert!(!departure.still_connected);
        assert_eq!(gateway.connection_count("ROOM01"), 0);
        assert!(gateway.leave_group("ROOM01", second.id).is_none());
    }

    #[test]
    fn closed_connections_are_skipped_until_detached() {
        let gateway = BroadcastGateway::new();
        let (open, _open_rx) = connection();
        let (closed, closed_rx) = connection();
        gateway.join_group("ROOM01", &open, "alice");
        gateway.join_group("ROOM01", &closed, "bob");
        drop(closed_rx);

        assert_eq!(gateway.broadcast("ROOM01", &"ping"), 1);
        assert_eq!(gateway.connection_count("ROOM01"), 2);
        let departure = gateway.leave_group("ROOM01", closed.id).unwrap();
        assert_eq!(departure.participant_id, "bob");
    }
}
