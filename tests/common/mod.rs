#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::extract::ws::Message;
use futures::future::BoxFuture;
use quizroom_back::{
    config::AppConfig,
    dao::{
        persistence::{
            PersistenceBridge,
            models::{AnswerEntity, FinalResultsEntity, QuestionEntity, RoomRecord},
        },
        questions::{QuestionRequest, QuestionSource, QuestionSourceError},
        storage::{StorageError, StorageResult},
    },
    dto::ws::ClientMessage,
    services::websocket_service::SocketSession,
    state::{AppState, SharedState, gateway::Connection, quiz::Question, room::RoomStatus},
};
use serde_json::{Value, json};
use tokio::sync::mpsc;

/// Question source returning a fixed question list whatever the topic.
pub struct FixedSource {
    pub correct_options: Vec<usize>,
}

impl QuestionSource for FixedSource {
    fn generate(
        &self,
        request: QuestionRequest,
    ) -> BoxFuture<'static, Result<Vec<Question>, QuestionSourceError>> {
        let questions = self
            .correct_options
            .iter()
            .take(request.count)
            .enumerate()
            .map(|(i, correct)| Question {
                id: format!("fixed-q{}", i + 1),
                text: format!("Question {}", i + 1),
                options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                correct_option: *correct,
                time_limit_secs: request.time_limit_secs,
            })
            .collect();
        Box::pin(async move { Ok(questions) })
    }
}

/// Question source that always fails.
pub struct FailingSource;

impl QuestionSource for FailingSource {
    fn generate(
        &self,
        _request: QuestionRequest,
    ) -> BoxFuture<'static, Result<Vec<Question>, QuestionSourceError>> {
        Box::pin(async { Err(QuestionSourceError::Unreachable("connection refused".into())) })
    }
}

/// Calls observed by [`RecordingBridge`].
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCall {
    RoomCreated(String),
    ParticipantJoined(String, String),
    Status(String, RoomStatus),
    Questions(String, usize),
    Answer(String, AnswerEntity),
    FinalResults(String, usize),
    Forget(String),
}

/// Persistence bridge recording every call; optionally failing all of them.
#[derive(Default)]
pub struct RecordingBridge {
    pub calls: Mutex<Vec<BridgeCall>>,
    pub fail: bool,
}

impl RecordingBridge {
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<BridgeCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: BridgeCall) -> BoxFuture<'static, StorageResult<()>> {
        self.calls.lock().unwrap().push(call);
        let fail = self.fail;
        Box::pin(async move {
            if fail {
                Err(StorageError::Rejected {
                    path: "test".into(),
                    status: 503,
                })
            } else {
                Ok(())
            }
        })
    }
}

impl PersistenceBridge for RecordingBridge {
    fn record_room_created(&self, room: RoomRecord) -> BoxFuture<'static, StorageResult<()>> {
        self.record(BridgeCall::RoomCreated(room.room_id))
    }

    fn record_participant_joined(
        &self,
        room_id: String,
        participant_id: String,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.record(BridgeCall::ParticipantJoined(room_id, participant_id))
    }

    fn update_room_status(
        &self,
        room_id: String,
        status: RoomStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.record(BridgeCall::Status(room_id, status))
    }

    fn store_questions(
        &self,
        room_id: String,
        questions: Vec<QuestionEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.record(BridgeCall::Questions(room_id, questions.len()))
    }

    fn store_answer(
        &self,
        room_id: String,
        answer: AnswerEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.record(BridgeCall::Answer(room_id, answer))
    }

    fn store_final_results(
        &self,
        room_id: String,
        results: FinalResultsEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.record(BridgeCall::FinalResults(room_id, results.participants.len()))
    }

    fn forget_room(&self, room_id: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(BridgeCall::Forget(room_id.to_string()));
    }
}

pub fn state_with(source: impl QuestionSource + 'static, bridge: Arc<RecordingBridge>) -> SharedState {
    AppState::new(AppConfig::default(), Arc::new(source), bridge)
}

/// A fake WebSocket client: a socket session plus the receiving end of its writer.
pub struct TestClient {
    pub session: SocketSession,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl TestClient {
    pub fn connect() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            session: SocketSession::new(Connection::new(tx)),
            rx,
        }
    }

    /// Send a `{"event", "data"}` frame through the regular dispatch path.
    pub fn send(&mut self, state: &SharedState, event: &str, data: Value) {
        let text = json!({ "event": event, "data": data }).to_string();
        let message = ClientMessage::from_json_str(&text).expect("valid client message");
        self.session.dispatch(state, message);
    }

    pub fn disconnect(&mut self, state: &SharedState) {
        self.session.disconnect(state);
    }

    /// Every event received since the last drain.
    pub fn drain(&mut self) -> Vec<Value> {
        let mut events = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            if let Message::Text(text) = message {
                events.push(serde_json::from_str(text.as_str()).expect("json event"));
            }
        }
        events
    }

    /// Names of every event received since the last drain.
    pub fn drain_names(&mut self) -> Vec<String> {
        self.drain()
            .iter()
            .map(|event| event["event"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

/// First event named `name`.
pub fn find<'a>(events: &'a [Value], name: &str) -> Option<&'a Value> {
    events.iter().find(|event| event["event"] == name)
}

/// Data of every event named `name`.
pub fn all<'a>(events: &'a [Value], name: &str) -> Vec<&'a Value> {
    events
        .iter()
        .filter(|event| event["event"] == name)
        .map(|event| &event["data"])
        .collect()
}

pub fn create_payload(capacity: usize, question_count: usize, participant_id: &str) -> Value {
    json!({
        "topic": "General knowledge",
        "difficulty": "EASY",
        "questionCount": question_count,
        "capacity": capacity,
        "roomTimeLimit": 5,
        "participantId": participant_id,
        "displayName": participant_id.to_uppercase(),
    })
}

pub fn join_payload(room_id: &str, participant_id: &str) -> Value {
    json!({
        "roomCode": room_id,
        "participantId": participant_id,
        "displayName": participant_id.to_uppercase(),
    })
}

pub fn answer_payload(room_id: &str, index: usize, option: i64, participant_id: &str) -> Value {
    json!({
        "roomId": room_id,
        "questionIndex": index,
        "selectedOption": option,
        "participantId": participant_id,
    })
}

/// Create a room from `host` and return its code.
pub fn create_room(state: &SharedState, host: &mut TestClient, capacity: usize, questions: usize, id: &str) -> String {
    host.send(state, "createRoom", create_payload(capacity, questions, id));
    let events = host.drain();
    find(&events, "roomId")
        .and_then(|event| event["data"].as_str())
        .expect("roomId ack")
        .to_string()
}

/// Let spawned tasks run without moving the clock.
pub async fn run_pending() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
