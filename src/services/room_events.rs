//! Typed helpers pushing real-time events to a room's group or to a single connection.

use tracing::debug;

use crate::{
    dto::{
        quiz::{
            AnswerFeedbackEvent, NextQuestionEvent, QuestionResultsEvent, QuizResultsEvent,
            QuizStartEvent, TimeUpdateEvent,
        },
        room::RoomSnapshot,
        ws::ServerMessage,
    },
    state::{SharedState, gateway::Connection, room::Room},
};

/// Broadcast the current membership of a room.
pub fn broadcast_players(state: &SharedState, room: &Room) {
    let message = ServerMessage::UpdatePlayers(RoomSnapshot::from(room));
    send_room_event(state, &room.id, &message);
}

/// Announce that the quiz is about to start.
pub fn broadcast_game_start(state: &SharedState, room_id: &str) {
    send_room_event(state, room_id, &ServerMessage::GameStart);
}

/// Send the frozen question list to the whole room.
pub fn broadcast_quiz_start(state: &SharedState, room_id: &str, event: QuizStartEvent) {
    send_room_event(state, room_id, &ServerMessage::QuizStart(event));
}

/// Announce the question that just opened.
pub fn broadcast_next_question(state: &SharedState, room_id: &str, event: NextQuestionEvent) {
    send_room_event(state, room_id, &ServerMessage::NextQuestion(event));
}

/// Broadcast the remaining time of the active question.
pub fn broadcast_time_update(state: &SharedState, room_id: &str, event: TimeUpdateEvent) {
    send_room_event(state, room_id, &ServerMessage::TimeUpdate(event));
}

/// Broadcast the summary of a closed question.
pub fn broadcast_question_results(state: &SharedState, room_id: &str, event: QuestionResultsEvent) {
    send_room_event(state, room_id, &ServerMessage::QuestionResults(event));
}

/// Broadcast the final standings.
pub fn broadcast_quiz_results(state: &SharedState, room_id: &str, event: QuizResultsEvent) {
    send_room_event(state, room_id, &ServerMessage::QuizResults(event));
}

/// Acknowledge a create or join with the room code.
pub fn send_room_id(state: &SharedState, connection: &Connection, room_id: &str) {
    send_private_event(state, connection, &ServerMessage::RoomId(room_id.to_string()));
}

/// Report a failed create, join or start request to its sender.
pub fn send_room_error(state: &SharedState, connection: &Connection, message: impl Into<String>) {
    send_private_event(state, connection, &ServerMessage::room_error(message));
}

/// Send a room snapshot to a single connection.
pub fn send_players(state: &SharedState, connection: &Connection, room: &Room) {
    let message = ServerMessage::UpdatePlayers(RoomSnapshot::from(room));
    send_private_event(state, connection, &message);
}

/// Resynchronise a single connection with the running quiz.
pub fn send_quiz_start(state: &SharedState, connection: &Connection, event: QuizStartEvent) {
    send_private_event(state, connection, &ServerMessage::QuizStart(event));
}

/// Privately acknowledge an answer.
pub fn send_answer_feedback(
    state: &SharedState,
    connection: &Connection,
    event: AnswerFeedbackEvent,
) {
    send_private_event(state, connection, &ServerMessage::AnswerFeedback(event));
}

fn send_room_event(state: &SharedState, room_id: &str, message: &ServerMessage) {
    let delivered = state.gateway().broadcast(room_id, message);
    debug!(room_id, delivered, "room event sent");
}

fn send_private_event(state: &SharedState, connection: &Connection, message: &ServerMessage) {
    if !state.gateway().unicast(connection, message) {
        debug!(connection_id = %connection.id, "private event dropped (connection closed)");
    }
}
