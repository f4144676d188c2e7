//! Records exchanged with the persistence collaborator.

use serde::Serialize;

use crate::state::{
    quiz::{AnswerRecord, ParticipantResult, Question, QuizResults, Selection},
    room::{Room, RoomStatus},
};

/// Creation record of a room, replayed when the collaborator lost track of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub room_id: String,
    pub room_data: RoomData,
}

/// Settings part of [`RoomRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomData {
    pub topic: String,
    pub room_time_limit: u32,
    pub player_count: usize,
    pub question_count: usize,
    pub difficulty: String,
    pub user: String,
    pub username: String,
    pub status: RoomStatus,
}

impl From<&Room> for RoomRecord {
    fn from(room: &Room) -> Self {
        let host_name = room
            .participants()
            .find(|participant| participant.id == room.host_id)
            .map(|participant| participant.display_name.clone())
            .unwrap_or_default();
        Self {
            room_id: room.id.clone(),
            room_data: RoomData {
                topic: room.settings.topic.clone(),
                room_time_limit: room.settings.room_time_limit,
                player_count: room.settings.capacity,
                question_count: room.settings.question_count,
                difficulty: room.settings.difficulty.as_str().to_string(),
                user: room.host_id.clone(),
                username: host_name,
                status: room.status,
            },
        }
    }
}

/// Question as stored by the collaborator, correct option included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionEntity {
    pub id: String,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_option: usize,
    pub time_limit: u32,
}

impl From<&Question> for QuestionEntity {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id.clone(),
            question_text: question.text.clone(),
            options: question.options.clone(),
            correct_option: question.correct_option,
            time_limit: question.time_limit_secs,
        }
    }
}

/// One recorded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEntity {
    pub question_index: usize,
    pub participant_id: String,
    /// `None` when no valid option was selected.
    pub selected_option: Option<usize>,
    pub is_correct: bool,
    pub points: u32,
}

impl AnswerEntity {
    /// Build the stored form of an accepted answer.
    pub fn new(participant_id: &str, record: &AnswerRecord) -> Self {
        Self {
            question_index: record.question_index,
            participant_id: participant_id.to_string(),
            selected_option: match record.selection {
                Selection::Option(index) => Some(index),
                Selection::Unanswered => None,
            },
            is_correct: record.is_correct,
            points: record.points,
        }
    }
}

/// Final standing of one participant as stored for statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResultEntity {
    pub id: String,
    pub username: String,
    pub score: u32,
    pub answers: Vec<usize>,
    pub correct_answers: usize,
    pub rank: usize,
    pub is_winner: bool,
}

impl From<&ParticipantResult> for ParticipantResultEntity {
    fn from(result: &ParticipantResult) -> Self {
        Self {
            id: result.participant_id.clone(),
            username: result.display_name.clone(),
            score: result.score,
            answers: result.answers.clone(),
            correct_answers: result.correct_answers,
            rank: result.rank,
            is_winner: result.is_winner,
        }
    }
}

/// Final results of a quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalResultsEntity {
    /// RFC 3339 completion timestamp.
    pub completed_at: String,
    pub participants: Vec<ParticipantResultEntity>,
}

impl FinalResultsEntity {
    /// Build the stored form of computed results.
    pub fn new(results: &QuizResults, completed_at: String) -> Self {
        Self {
            completed_at,
            participants: results.participants.iter().map(Into::into).collect(),
        }
    }
}
