use serde::Serialize;
use utoipa::ToSchema;

use crate::state::quiz::{
    AnswerRecord, ParticipantAnswer, ParticipantResult, Question, QuestionSummary, QuizResults,
    Selection,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Question as shown to participants; the correct option is withheld.
pub struct QuestionView {
    pub id: String,
    pub question_text: String,
    pub options: Vec<String>,
    pub time_limit: u32,
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id.clone(),
            question_text: question.text.clone(),
            options: question.options.clone(),
            time_limit: question.time_limit_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Frozen question list and position, sent at start and on resync.
pub struct QuizStartEvent {
    pub questions: Vec<QuestionView>,
    pub current_question_index: usize,
    pub time_left: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NextQuestionEvent {
    pub question_index: usize,
    pub time_left: u32,
    pub total_questions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Countdown tick of the active question.
pub struct TimeUpdateEvent {
    pub question_index: usize,
    pub time_left: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Private acknowledgement of a submitted answer.
pub struct AnswerFeedbackEvent {
    pub question_index: usize,
    #[schema(value_type = Object)]
    pub selected_option: Selection,
    pub is_correct: bool,
    pub correct_option: usize,
    pub points_earned: u32,
}

impl AnswerFeedbackEvent {
    /// Feedback for `record`, revealing `correct_option` to its author only.
    pub fn new(record: &AnswerRecord, correct_option: usize) -> Self {
        Self {
            question_index: record.question_index,
            selected_option: record.selection,
            is_correct: record.is_correct,
            correct_option,
            points_earned: record.points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantAnswerView {
    pub participant_id: String,
    pub username: String,
    /// Selected option index, or `"unanswered"`.
    #[schema(value_type = Object)]
    pub selected_option: Selection,
    pub is_correct: bool,
    pub points_earned: u32,
    pub total_score: u32,
}

impl From<&ParticipantAnswer> for ParticipantAnswerView {
    fn from(answer: &ParticipantAnswer) -> Self {
        Self {
            participant_id: answer.participant_id.clone(),
            username: answer.display_name.clone(),
            selected_option: answer.selection,
            is_correct: answer.is_correct,
            points_earned: answer.points_earned,
            total_score: answer.total_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Room-wide summary of a closed question.
pub struct QuestionResultsEvent {
    pub question_index: usize,
    pub correct_option: usize,
    pub participant_answers: Vec<ParticipantAnswerView>,
    pub is_last_question: bool,
}

impl From<&QuestionSummary> for QuestionResultsEvent {
    fn from(summary: &QuestionSummary) -> Self {
        Self {
            question_index: summary.question_index,
            correct_option: summary.correct_option,
            participant_answers: summary
                .answers
                .iter()
                .map(ParticipantAnswerView::from)
                .collect(),
            is_last_question: summary.is_last,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResultView {
    pub id: String,
    pub username: String,
    pub score: u32,
    pub answers: Vec<usize>,
    pub correct_answers: usize,
    pub rank: usize,
    pub is_winner: bool,
}

impl From<&ParticipantResult> for ParticipantResultView {
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

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// Final standings of a quiz.
pub struct QuizResultsEvent {
    pub participants: Vec<ParticipantResultView>,
    pub winners: Vec<String>,
}

impl From<&QuizResults> for QuizResultsEvent {
    fn from(results: &QuizResults) -> Self {
        Self {
            participants: results
                .participants
                .iter()
                .map(ParticipantResultView::from)
                .collect(),
            winners: results.winner_ids(),
        }
    }
}
