//! Fire-and-forget launching of persistence calls.
//!
//! Every call runs on its own task so quiz progression never waits on the
//! collaborator; failures are logged and dropped.

use std::time::SystemTime;

use futures::future::BoxFuture;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{
        persistence::models::{AnswerEntity, FinalResultsEntity, QuestionEntity, RoomRecord},
        storage::StorageResult,
    },
    dto::format_system_time,
    state::{SharedState, quiz::QuizResults, room::RoomStatus},
};

/// Persist a freshly created room.
pub fn record_room_created(state: &SharedState, record: RoomRecord) {
    let room_id = record.room_id.clone();
    launch(
        "record_room_created",
        room_id,
        state.persistence().record_room_created(record),
    );
}

/// Persist a new seat.
pub fn record_participant_joined(state: &SharedState, room_id: &str, participant_id: &str) {
    launch(
        "record_participant_joined",
        room_id.to_string(),
        state
            .persistence()
            .record_participant_joined(room_id.to_string(), participant_id.to_string()),
    );
}

/// Persist a status transition.
pub fn update_room_status(state: &SharedState, room_id: &str, status: RoomStatus) {
    launch(
        "update_room_status",
        room_id.to_string(),
        state
            .persistence()
            .update_room_status(room_id.to_string(), status),
    );
}

/// Persist the frozen question list.
pub fn store_questions(state: &SharedState, room_id: &str, questions: Vec<QuestionEntity>) {
    launch(
        "store_questions",
        room_id.to_string(),
        state
            .persistence()
            .store_questions(room_id.to_string(), questions),
    );
}

/// Persist one recorded answer.
pub fn store_answer(state: &SharedState, room_id: &str, answer: AnswerEntity) {
    launch(
        "store_answer",
        room_id.to_string(),
        state.persistence().store_answer(room_id.to_string(), answer),
    );
}

/// Persist the final standings, retrying a bounded number of times with a fixed backoff.
/// The room is forgotten by the bridge once the attempts end, stored or not.
pub fn store_final_results(state: &SharedState, room_id: &str, results: &QuizResults) {
    let entity = FinalResultsEntity::new(results, format_system_time(SystemTime::now()));
    let bridge = state.persistence();
    let config = state.config();
    let room_id = room_id.to_string();

    tokio::spawn(async move {
        let attempts = config.final_results_attempts.max(1);
        for attempt in 1..=attempts {
            match bridge
                .store_final_results(room_id.clone(), entity.clone())
                .await
            {
                Ok(()) => {
                    info!(%room_id, attempt, "final results stored");
                    break;
                }
                Err(err) if attempt < attempts => {
                    warn!(%room_id, attempt, error = %err, "storing final results failed; retrying");
                    sleep(config.final_results_backoff).await;
                }
                Err(err) => {
                    warn!(%room_id, attempt, error = %err, "giving up on storing final results");
                }
            }
        }
        bridge.forget_room(&room_id);
    });
}

/// Release what the bridge keeps for a deleted room.
pub fn forget_room(state: &SharedState, room_id: &str) {
    state.persistence().forget_room(room_id);
}

fn launch(operation: &'static str, room_id: String, call: BoxFuture<'static, StorageResult<()>>) {
    tokio::spawn(async move {
        if let Err(err) = call.await {
            warn!(operation, %room_id, error = %err, "persistence call failed");
        }
    });
}
