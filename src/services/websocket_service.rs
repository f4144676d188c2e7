use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    dto::ws::ClientMessage,
    error::ServiceError,
    services::{quiz_service, room_events, room_service},
    state::{SharedState, gateway::Connection},
};

/// Handle the full lifecycle for an individual participant WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connection = Connection::new(outbound_tx.clone());
    let mut session = SocketSession::new(connection);
    info!(connection_id = %session.connection.id, "client connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(connection_id = %session.connection.id, payload = %text, "received client message");
                match ClientMessage::from_json_str(&text) {
                    Ok(message) => session.dispatch(&state, message),
                    Err(err) => {
                        warn!(connection_id = %session.connection.id, error = %err, "failed to parse or validate client message");
                    }
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(connection_id = %session.connection.id, "client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(connection_id = %session.connection.id, error = %err, "websocket error");
                break;
            }
        }
    }

    session.disconnect(&state);
    info!(connection_id = %session.connection.id, "client disconnected");

    drop(session);
    finalize(writer_task, outbound_tx).await;
}

/// Per-connection bookkeeping: the rooms this socket is attached to, each with
/// the participant it is seated as.
pub struct SocketSession {
    connection: Connection,
    rooms: HashMap<String, String>,
}

impl SocketSession {
    /// Track a freshly accepted connection.
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            rooms: HashMap::new(),
        }
    }

    /// Connection handle of this session.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Route an inbound message to the matching service.
    ///
    /// Create, join and start failures are reported with `roomError`; mid-game
    /// problems are logged only.
    pub fn dispatch(&mut self, state: &SharedState, message: ClientMessage) {
        let name = message.name();
        let outcome: Result<(), ServiceError> = match message {
            ClientMessage::CreateRoom(payload) => {
                room_service::create_room(state, &self.connection, payload).map(|room| {
                    self.rooms.insert(room.id, room.host_id);
                })
            }
            ClientMessage::JoinRoom(payload) => match self.rooms.get(&payload.room_code) {
                // One connection speaks for a single participant per room.
                Some(bound) if *bound != payload.participant_id => Err(ServiceError::InvalidState(
                    format!("connection already joined this room as {bound}"),
                )),
                _ => {
                    let participant_id = payload.participant_id.clone();
                    room_service::join_room(state, &self.connection, payload).map(|room| {
                        self.rooms.insert(room.id, participant_id);
                    })
                }
            },
            ClientMessage::StartQuiz(payload) => {
                room_service::start_room(state, &payload.room_id, Some(&payload.participant_id))
                    .map(|_| ())
            }
            ClientMessage::SubmitAnswer(payload) => {
                quiz_service::submit_answer(state, &self.connection, &payload);
                return;
            }
            ClientMessage::RequestQuizQuestions(payload) => {
                if let Err(err) =
                    quiz_service::request_questions(state, &self.connection, &payload.room_id)
                {
                    debug!(connection_id = %self.connection.id, error = %err, "resync request ignored");
                }
                return;
            }
        };

        if let Err(err) = outcome {
            warn!(connection_id = %self.connection.id, event = name, error = %err, "request rejected");
            room_events::send_room_error(state, &self.connection, err.to_string());
        }
    }

    /// Detach from every room; participants without another live connection leave their room.
    pub fn disconnect(&mut self, state: &SharedState) {
        for (room_id, _) in self.rooms.drain() {
            let Some(departure) = state.gateway().leave_group(&room_id, self.connection.id) else {
                continue;
            };
            if departure.still_connected {
                debug!(%room_id, participant_id = %departure.participant_id, "participant still connected elsewhere");
                continue;
            }
            room_service::leave_room(state, &room_id, &departure.participant_id);
        }
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
