//! Room membership operations: create, join, leave, snapshot and manual start.

use tracing::{debug, info};

use crate::{
    dao::persistence::models::RoomRecord,
    dto::{
        room::RoomSnapshot,
        ws::{CreateRoomPayload, JoinRoomPayload},
    },
    error::ServiceError,
    services::{persistence_service, quiz_service, room_events},
    state::{
        SharedState,
        gateway::Connection,
        registry::LeaveOutcome,
        room::{Participant, Room, RoomError, RoomSettings, RoomStatus},
    },
};

/// Create a room seating its creator, attach the connection and start at once
/// when the room is already full.
pub fn create_room(
    state: &SharedState,
    connection: &Connection,
    payload: CreateRoomPayload,
) -> Result<Room, ServiceError> {
    let config = state.config();
    if payload.capacity > config.max_capacity {
        return Err(ServiceError::InvalidInput(format!(
            "capacity must not exceed {}",
            config.max_capacity
        )));
    }
    if payload.question_count > config.max_question_count {
        return Err(ServiceError::InvalidInput(format!(
            "question count must not exceed {}",
            config.max_question_count
        )));
    }

    let settings = RoomSettings {
        topic: payload.topic.trim().to_string(),
        difficulty: payload.difficulty,
        question_count: payload.question_count,
        capacity: payload.capacity,
        room_time_limit: payload.room_time_limit,
    };
    let creator = Participant {
        id: payload.participant_id,
        display_name: payload.display_name.trim().to_string(),
    };
    let room = state.registry().create_room(settings, creator)?;

    state
        .gateway()
        .join_group(&room.id, connection, &room.host_id);
    room_events::send_room_id(state, connection, &room.id);
    room_events::broadcast_players(state, &room);
    info!(room_id = %room.id, host_id = %room.host_id, capacity = room.settings.capacity, "room created");

    persistence_service::record_room_created(state, RoomRecord::from(&room));
    start_if_full(state, &room);
    Ok(room)
}

/// Seat a participant in an existing room.
///
/// A participant already seated re-attaches the connection instead of failing.
/// Late joiners of a running quiz are resynchronised right away.
pub fn join_room(
    state: &SharedState,
    connection: &Connection,
    payload: JoinRoomPayload,
) -> Result<Room, ServiceError> {
    let room_id = payload.room_code;
    let participant = Participant {
        id: payload.participant_id,
        display_name: payload.display_name.trim().to_string(),
    };
    let participant_id = participant.id.clone();

    let room = match state.registry().join_room(&room_id, participant) {
        Ok(room) => {
            state
                .gateway()
                .join_group(&room_id, connection, &participant_id);
            room_events::broadcast_players(state, &room);
            room_events::send_room_id(state, connection, &room_id);
            info!(%room_id, %participant_id, seated = room.len(), "participant joined");
            persistence_service::record_participant_joined(state, &room_id, &participant_id);
            room
        }
        Err(RoomError::AlreadyJoined(_)) => {
            let room = state
                .registry()
                .snapshot(&room_id)
                .ok_or(RoomError::NotFound)?;
            state
                .gateway()
                .join_group(&room_id, connection, &participant_id);
            room_events::send_players(state, connection, &room);
            room_events::send_room_id(state, connection, &room_id);
            info!(%room_id, %participant_id, "participant re-attached");
            room
        }
        Err(err) => return Err(err.into()),
    };

    if room.status == RoomStatus::InGame {
        if let Err(err) = quiz_service::request_questions(state, connection, &room_id) {
            debug!(%room_id, error = %err, "late join resync skipped");
        }
    }
    start_if_full(state, &room);
    Ok(room)
}

/// Remove a participant; the room is deleted with its timers once empty.
pub fn leave_room(state: &SharedState, room_id: &str, participant_id: &str) {
    match state.registry().leave_room(room_id, participant_id) {
        LeaveOutcome::Left(room) => {
            info!(room_id, participant_id, remaining = room.len(), "participant left");
            room_events::broadcast_players(state, &room);
            quiz_service::recheck_fast_path(state, room_id);
        }
        LeaveOutcome::RoomDeleted => {
            state.gateway().drop_group(room_id);
            persistence_service::forget_room(state, room_id);
            info!(room_id, participant_id, "last participant left; room deleted");
        }
        LeaveOutcome::NotMember => {
            debug!(room_id, participant_id, "leave ignored for a non-member");
        }
    }
}

/// Current snapshot of a room.
pub fn room_snapshot(state: &SharedState, room_id: &str) -> Result<RoomSnapshot, ServiceError> {
    state
        .registry()
        .snapshot(room_id)
        .map(|room| RoomSnapshot::from(&room))
        .ok_or_else(|| RoomError::NotFound.into())
}

/// Start a waiting room before it is full. With `requester`, only the host may do so.
pub fn start_room(
    state: &SharedState,
    room_id: &str,
    requester: Option<&str>,
) -> Result<RoomSnapshot, ServiceError> {
    let room = state
        .registry()
        .snapshot(room_id)
        .ok_or(RoomError::NotFound)?;
    if let Some(requester) = requester {
        if requester != room.host_id {
            return Err(ServiceError::Forbidden(
                "only the host can start the quiz".into(),
            ));
        }
    }
    quiz_service::start_quiz(state, room_id)?;
    room_snapshot(state, room_id)
}

fn start_if_full(state: &SharedState, room: &Room) {
    if room.status == RoomStatus::Waiting && room.is_full() {
        if let Err(err) = quiz_service::start_quiz(state, &room.id) {
            debug!(room_id = %room.id, error = %err, "automatic start skipped");
        }
    }
}
