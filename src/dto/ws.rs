//! Real-time messages exchanged over `/ws`, framed as `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{
        quiz::{
            AnswerFeedbackEvent, NextQuestionEvent, QuestionResultsEvent, QuizResultsEvent,
            QuizStartEvent, TimeUpdateEvent,
        },
        room::RoomSnapshot,
        validation::{validate_not_blank, validate_participant_id, validate_room_code},
    },
    state::room::Difficulty,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomPayload {
    #[validate(length(min = 1, max = 200), custom(function = validate_not_blank))]
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[validate(range(min = 1))]
    pub question_count: usize,
    #[validate(range(min = 1))]
    pub capacity: usize,
    /// Declared time limit of the whole room, kept as metadata.
    #[serde(default)]
    pub room_time_limit: u32,
    #[validate(custom(function = validate_participant_id))]
    pub participant_id: String,
    #[validate(length(min = 1, max = 64), custom(function = validate_not_blank))]
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomPayload {
    #[validate(custom(function = validate_room_code))]
    pub room_code: String,
    #[validate(custom(function = validate_participant_id))]
    pub participant_id: String,
    #[validate(length(min = 1, max = 64), custom(function = validate_not_blank))]
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerPayload {
    #[validate(custom(function = validate_room_code))]
    pub room_id: String,
    pub question_index: usize,
    /// Option index; `-1`, `null` or an out-of-range index count as no valid answer.
    #[serde(default)]
    pub selected_option: Option<i64>,
    #[validate(custom(function = validate_participant_id))]
    pub participant_id: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Late-join resync request.
pub struct RequestQuestionsPayload {
    #[validate(custom(function = validate_room_code))]
    pub room_id: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Manual start of a waiting room by its host.
pub struct StartQuizPayload {
    #[validate(custom(function = validate_room_code))]
    pub room_id: String,
    #[validate(custom(function = validate_participant_id))]
    pub participant_id: String,
}

/// Messages accepted from WebSocket clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    CreateRoom(CreateRoomPayload),
    JoinRoom(JoinRoomPayload),
    SubmitAnswer(SubmitAnswerPayload),
    RequestQuizQuestions(RequestQuestionsPayload),
    StartQuiz(StartQuizPayload),
}

/// Why an inbound frame was rejected.
#[derive(Debug, Error)]
pub enum ClientMessageError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("validation failed: {0}")]
    Invalid(#[from] ValidationErrors),
}

impl ClientMessage {
    /// Parse a text frame and validate its payload.
    pub fn from_json_str(text: &str) -> Result<Self, ClientMessageError> {
        let message: Self = serde_json::from_str(text)?;
        message.validate_payload()?;
        Ok(message)
    }

    fn validate_payload(&self) -> Result<(), ValidationErrors> {
        match self {
            Self::CreateRoom(payload) => payload.validate(),
            Self::JoinRoom(payload) => payload.validate(),
            Self::SubmitAnswer(payload) => payload.validate(),
            Self::RequestQuizQuestions(payload) => payload.validate(),
            Self::StartQuiz(payload) => payload.validate(),
        }
    }

    /// Wire name of the message, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom(_) => "createRoom",
            Self::JoinRoom(_) => "joinRoom",
            Self::SubmitAnswer(_) => "submitAnswer",
            Self::RequestQuizQuestions(_) => "requestQuizQuestions",
            Self::StartQuiz(_) => "startQuiz",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// Failure reported for a create, join or start request.
pub struct RoomErrorEvent {
    pub message: String,
}

/// Messages pushed to WebSocket clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Acknowledges a create or join with the room code.
    RoomId(String),
    RoomError(RoomErrorEvent),
    UpdatePlayers(RoomSnapshot),
    /// The room is full (or was started by its host); questions follow shortly.
    GameStart,
    QuizStart(QuizStartEvent),
    NextQuestion(NextQuestionEvent),
    TimeUpdate(TimeUpdateEvent),
    AnswerFeedback(AnswerFeedbackEvent),
    QuestionResults(QuestionResultsEvent),
    QuizResults(QuizResultsEvent),
}

impl ServerMessage {
    /// Build a `roomError` event.
    pub fn room_error(message: impl Into<String>) -> Self {
        Self::RoomError(RoomErrorEvent {
            message: message.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_create_room_with_lowercase_difficulty() {
        let text = r#"{"event":"createRoom","data":{"topic":"Space","difficulty":"easy","questionCount":2,"capacity":2,"roomTimeLimit":5,"participantId":"u1","displayName":"Ada"}}"#;
        let ClientMessage::CreateRoom(payload) = ClientMessage::from_json_str(text).unwrap() else {
            panic!("expected createRoom");
        };
        assert_eq!(payload.difficulty, Difficulty::Easy);
        assert_eq!(payload.capacity, 2);
    }

    #[test]
    fn rejects_zero_capacity() {
        let text = r#"{"event":"createRoom","data":{"topic":"Space","questionCount":2,"capacity":0,"participantId":"u1","displayName":"Ada"}}"#;
        assert!(matches!(
            ClientMessage::from_json_str(text),
            Err(ClientMessageError::Invalid(_))
        ));
    }

    #[test]
    fn submit_answer_accepts_negative_and_missing_selection() {
        let text = r#"{"event":"submitAnswer","data":{"roomId":"ABC123","questionIndex":0,"selectedOption":-1,"participantId":"u1"}}"#;
        let ClientMessage::SubmitAnswer(payload) = ClientMessage::from_json_str(text).unwrap() else {
            panic!("expected submitAnswer");
        };
        assert_eq!(payload.selected_option, Some(-1));

        let text = r#"{"event":"submitAnswer","data":{"roomId":"ABC123","questionIndex":0,"participantId":"u1"}}"#;
        let ClientMessage::SubmitAnswer(payload) = ClientMessage::from_json_str(text).unwrap() else {
            panic!("expected submitAnswer");
        };
        assert_eq!(payload.selected_option, None);
    }

    #[test]
    fn unknown_event_is_malformed() {
        assert!(matches!(
            ClientMessage::from_json_str(r#"{"event":"dance","data":{}}"#),
            Err(ClientMessageError::Malformed(_))
        ));
    }

    #[test]
    fn outbound_envelope() {
        assert_eq!(
            serde_json::to_value(ServerMessage::RoomId("ABC123".into())).unwrap(),
            json!({ "event": "roomId", "data": "ABC123" })
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::GameStart).unwrap(),
            json!({ "event": "gameStart" })
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::room_error("Room is full")).unwrap(),
            json!({ "event": "roomError", "data": { "message": "Room is full" } })
        );
    }
}
