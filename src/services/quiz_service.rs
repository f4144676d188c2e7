//! Quiz cycle of a room: start, question windows, answers, settling and final results.
//!
//! Every transition runs synchronously inside the room's critical section
//! ([`RoomRegistry::with_entry_mut`](crate::state::registry::RoomRegistry::with_entry_mut)):
//! state is mutated, events are queued on the writers and timers are replaced
//! before the lock is released. Persistence is launched afterwards and never awaited.
//!
//! Timer callbacks re-check the room phase before acting, so a callback that
//! lost a race against a cancellation, a fast-path settle or a room deletion
//! is a no-op.

use std::time::Duration;

use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

use crate::{
    dao::{
        persistence::models::{AnswerEntity, QuestionEntity},
        questions::{QuestionRequest, placeholder::placeholder_questions},
    },
    dto::{
        quiz::{
            AnswerFeedbackEvent, NextQuestionEvent, QuestionResultsEvent, QuestionView,
            QuizResultsEvent, QuizStartEvent, TimeUpdateEvent,
        },
        ws::SubmitAnswerPayload,
    },
    error::ServiceError,
    services::{persistence_service, room_events},
    state::{
        SharedState,
        gateway::Connection,
        quiz::{AnswerOutcome, Question, QuizPhase, QuizResults, QuizSession},
        registry::RoomEntry,
        room::{RoomError, RoomStatus},
        timer::{ScheduledTask, TickControl},
    },
};

/// Promote a waiting room to ACTIVE and schedule the first question.
///
/// Questions are fetched while the start delay runs; the first question opens
/// once both are done.
pub fn start_quiz(state: &SharedState, room_id: &str) -> Result<(), ServiceError> {
    let config = state.config();
    state
        .registry()
        .with_entry_mut(room_id, |entry| {
            if entry.room.status != RoomStatus::Waiting {
                return Err(ServiceError::InvalidState(format!(
                    "room `{room_id}` already started"
                )));
            }
            entry.room.set_status(RoomStatus::Active)?;
            room_events::broadcast_game_start(state, room_id);

            let request = QuestionRequest {
                topic: entry.room.settings.topic.clone(),
                difficulty: entry.room.settings.difficulty,
                count: entry.room.settings.question_count,
                time_limit_secs: config.question_time_limit_secs,
            };
            let task = prepare_quiz(state.clone(), room_id.to_string(), request);
            entry
                .timers
                .set_start(ScheduledTask::after(Duration::ZERO, task));
            Ok(())
        })
        .ok_or_else(|| ServiceError::from(RoomError::NotFound))??;

    info!(room_id, "quiz starting");
    persistence_service::update_room_status(state, room_id, RoomStatus::Active);
    Ok(())
}

async fn prepare_quiz(state: SharedState, room_id: String, request: QuestionRequest) {
    let start_delay = state.config().start_delay;
    let (questions, ()) = tokio::join!(fetch_questions(&state, &room_id, request), sleep(start_delay));
    begin_quiz(&state, &room_id, questions);
}

/// Ask the question source, falling back to placeholders on any failure.
async fn fetch_questions(state: &SharedState, room_id: &str, request: QuestionRequest) -> Vec<Question> {
    let limit = state.config().question_fetch_timeout;
    let source = state.questions();
    match timeout(limit, source.generate(request.clone())).await {
        Ok(Ok(questions))
            if questions.len() == request.count && questions.iter().all(Question::is_well_formed) =>
        {
            info!(room_id, count = questions.len(), "questions generated");
            return questions;
        }
        Ok(Ok(questions)) => warn!(
            room_id,
            expected = request.count,
            received = questions.len(),
            "question source returned an unusable set; using placeholders"
        ),
        Ok(Err(err)) => warn!(room_id, error = %err, "question source failed; using placeholders"),
        Err(_) => warn!(room_id, ?limit, "question source timed out; using placeholders"),
    }
    placeholder_questions(&request)
}

/// Freeze the question list and open the first question.
fn begin_quiz(state: &SharedState, room_id: &str, questions: Vec<Question>) {
    let config = state.config();
    let stored = state
        .registry()
        .with_entry_mut(room_id, |entry| {
            if entry.room.status != RoomStatus::Active {
                debug!(room_id, status = ?entry.room.status, "stale quiz start ignored");
                return None;
            }
            let session = match QuizSession::new(questions, config.points_per_correct) {
                Ok(session) => session,
                Err(err) => {
                    warn!(room_id, error = %err, "cannot start quiz");
                    return None;
                }
            };
            if let Err(err) = entry.room.set_status(RoomStatus::InGame) {
                warn!(room_id, error = %err, "cannot start quiz");
                return None;
            }

            let stored: Vec<QuestionEntity> =
                session.questions().iter().map(QuestionEntity::from).collect();
            let now = Instant::now();
            room_events::broadcast_quiz_start(
                state,
                room_id,
                QuizStartEvent {
                    questions: session.questions().iter().map(QuestionView::from).collect(),
                    current_question_index: 0,
                    time_left: session.questions()[0].time_limit_secs,
                },
            );
            entry.session = Some(session);
            enter_question(state, room_id, entry, 0, now);
            Some(stored)
        })
        .flatten();

    if let Some(stored) = stored {
        info!(room_id, count = stored.len(), "quiz started");
        persistence_service::update_room_status(state, room_id, RoomStatus::InGame);
        persistence_service::store_questions(state, room_id, stored);
    }
}

/// Open question `index`: announce it and arm its deadline and countdown.
fn enter_question(state: &SharedState, room_id: &str, entry: &mut RoomEntry, index: usize, now: Instant) {
    let config = state.config();
    let Some(session) = entry.session.as_mut() else {
        return;
    };
    let limit = match session.begin_question(index, now) {
        Ok(question) => Duration::from_secs(u64::from(question.time_limit_secs)),
        Err(err) => {
            debug!(room_id, error = %err, "question not opened");
            return;
        }
    };

    room_events::broadcast_next_question(
        state,
        room_id,
        NextQuestionEvent {
            question_index: index,
            time_left: session.time_left(now),
            total_questions: session.questions().len(),
        },
    );

    let deadline = {
        let state = state.clone();
        let room_id = room_id.to_string();
        ScheduledTask::after(limit, async move { on_deadline(&state, &room_id, index) })
    };
    let tick = {
        let state = state.clone();
        let room_id = room_id.to_string();
        ScheduledTask::every(config.tick_interval, move || on_tick(&state, &room_id, index))
    };
    entry.timers.set_question(deadline, tick);
    debug!(room_id, index, "question opened");
}

fn on_tick(state: &SharedState, room_id: &str, index: usize) -> TickControl {
    state
        .registry()
        .with_entry_mut(room_id, |entry| {
            let Some(session) = entry.session.as_ref() else {
                return TickControl::Stop;
            };
            if session.current_index() != Some(index)
                || !matches!(session.phase(), QuizPhase::QuestionActive { .. })
            {
                return TickControl::Stop;
            }
            let time_left = session.time_left(Instant::now());
            room_events::broadcast_time_update(
                state,
                room_id,
                TimeUpdateEvent {
                    question_index: index,
                    time_left,
                },
            );
            if time_left == 0 {
                TickControl::Stop
            } else {
                TickControl::Continue
            }
        })
        .unwrap_or(TickControl::Stop)
}

fn on_deadline(state: &SharedState, room_id: &str, index: usize) {
    let settled = state
        .registry()
        .with_entry_mut(room_id, |entry| settle_question(state, room_id, entry, index));
    if settled != Some(true) {
        debug!(room_id, index, "stale question deadline ignored");
    }
}

/// Close the answer window of question `index`, publish its summary and arm the settle pause.
///
/// Returns `false` when the question was not open (stale timer, already settled).
fn settle_question(state: &SharedState, room_id: &str, entry: &mut RoomEntry, index: usize) -> bool {
    let config = state.config();
    let Some(session) = entry.session.as_mut() else {
        return false;
    };
    let summary = match session.settle(index, entry.room.participants()) {
        Ok(summary) => summary,
        Err(_) => return false,
    };

    room_events::broadcast_question_results(state, room_id, QuestionResultsEvent::from(&summary));

    let delay = config.settle_delay_for(summary.is_last);
    let task = {
        let state = state.clone();
        let room_id = room_id.to_string();
        async move { on_settle_elapsed(&state, &room_id, index) }
    };
    entry.timers.set_settle(ScheduledTask::after(delay, task));
    info!(room_id, index, is_last = summary.is_last, "question settled");
    true
}

fn on_settle_elapsed(state: &SharedState, room_id: &str, index: usize) {
    let results = state
        .registry()
        .with_entry_mut(room_id, |entry| {
            let session = entry.session.as_ref()?;
            if session.phase() != (QuizPhase::QuestionSettling { index }) {
                debug!(room_id, index, "stale settle timer ignored");
                return None;
            }
            if session.is_last(index) {
                end_quiz(state, room_id, entry)
            } else {
                enter_question(state, room_id, entry, index + 1, Instant::now());
                None
            }
        })
        .flatten();

    if let Some(results) = results {
        persistence_service::update_room_status(state, room_id, RoomStatus::Finished);
        persistence_service::store_final_results(state, room_id, &results);
    }
}

/// Compute and publish the final standings, then discard the session and its timers.
fn end_quiz(state: &SharedState, room_id: &str, entry: &mut RoomEntry) -> Option<QuizResults> {
    let mut session = entry.session.take()?;
    let results = match session.finish(entry.room.participants()) {
        Ok(results) => results,
        Err(err) => {
            warn!(room_id, error = %err, "cannot finish quiz");
            entry.session = Some(session);
            return None;
        }
    };
    if let Err(err) = entry.room.set_status(RoomStatus::Finished) {
        warn!(room_id, error = %err, "room already finished");
    }
    room_events::broadcast_quiz_results(state, room_id, QuizResultsEvent::from(&results));
    entry.timers.cancel_all();
    info!(room_id, winners = ?results.winner_ids(), "quiz finished");
    Some(results)
}

/// Record an answer for the open question and privately acknowledge it.
///
/// Answers from non-members, for a closed question or repeated for the same
/// question are ignored. When every present participant has answered, the
/// question settles without waiting for its deadline.
pub fn submit_answer(state: &SharedState, connection: &Connection, payload: &SubmitAnswerPayload) {
    let room_id = payload.room_id.as_str();
    let participant_id = payload.participant_id.as_str();
    let index = payload.question_index;

    let accepted = state
        .registry()
        .with_entry_mut(room_id, |entry| {
            if !entry.room.contains(participant_id) {
                debug!(room_id, participant_id, "answer from a non-member ignored");
                return None;
            }
            if entry.room.status.is_terminal() {
                debug!(room_id, participant_id, "answer for a finished room ignored");
                return None;
            }
            let session = entry.session.as_mut()?;
            let record = match session.record_answer(participant_id, index, payload.selected_option) {
                Ok(AnswerOutcome::Accepted(record)) => record,
                Ok(AnswerOutcome::DuplicateIgnored) => {
                    debug!(room_id, participant_id, index, "duplicate answer ignored");
                    return None;
                }
                Err(err) => {
                    debug!(room_id, participant_id, error = %err, "answer outside the open window ignored");
                    return None;
                }
            };

            let correct_option = session.questions()[index].correct_option;
            room_events::send_answer_feedback(
                state,
                connection,
                AnswerFeedbackEvent::new(&record, correct_option),
            );

            let everyone = session.everyone_answered(
                index,
                entry.room.participants().map(|participant| participant.id.as_str()),
            );
            if everyone {
                debug!(room_id, index, "every participant answered; settling early");
                settle_question(state, room_id, entry, index);
            }
            Some(record)
        })
        .flatten();

    if let Some(record) = accepted {
        persistence_service::store_answer(state, room_id, AnswerEntity::new(participant_id, &record));
    }
}

/// Settle the open question early when every remaining participant has already answered.
pub fn recheck_fast_path(state: &SharedState, room_id: &str) {
    state.registry().with_entry_mut(room_id, |entry| {
        let Some(session) = entry.session.as_ref() else {
            return;
        };
        let QuizPhase::QuestionActive { index, .. } = session.phase() else {
            return;
        };
        let everyone = session.everyone_answered(
            index,
            entry.room.participants().map(|participant| participant.id.as_str()),
        );
        if everyone {
            debug!(room_id, index, "remaining participants all answered; settling early");
            settle_question(state, room_id, entry, index);
        }
    });
}

/// Snapshot of the running quiz for a late joiner: frozen questions, current
/// index and the time actually left on the open question.
pub fn resync_event(state: &SharedState, room_id: &str) -> Result<QuizStartEvent, ServiceError> {
    state
        .registry()
        .with_entry_mut(room_id, |entry| {
            let session = entry
                .session
                .as_ref()
                .ok_or_else(|| ServiceError::InvalidState("quiz has not started".into()))?;
            let current_question_index = session
                .current_index()
                .ok_or_else(|| ServiceError::InvalidState("no question is open".into()))?;
            Ok(QuizStartEvent {
                questions: session.questions().iter().map(QuestionView::from).collect(),
                current_question_index,
                time_left: session.time_left(Instant::now()),
            })
        })
        .ok_or_else(|| ServiceError::from(RoomError::NotFound))?
}

/// Answer a `requestQuizQuestions` resync on the requesting connection.
pub fn request_questions(
    state: &SharedState,
    connection: &Connection,
    room_id: &str,
) -> Result<(), ServiceError> {
    let event = resync_event(state, room_id)?;
    room_events::send_quiz_start(state, connection, event);
    Ok(())
}
