//! Per-room quiz session: question sequencing, answer collection, scoring and ranking.
//!
//! The session is pure state. Timers and broadcasts are driven by
//! `services::quiz_service`, which calls into this type from the room's critical
//! section and reacts to the returned values.

use std::collections::HashMap;

use serde::{Serialize, Serializer};
use thiserror::Error;
use tokio::time::Instant;

use crate::state::room::Participant;

/// Multiple choice question frozen for the lifetime of a quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Identifier assigned by the question source.
    pub id: String,
    /// Question text.
    pub text: String,
    /// Answer options, at least four.
    pub options: Vec<String>,
    /// Index of the correct option in `options`.
    pub correct_option: usize,
    /// Time allowed to answer, in seconds.
    pub time_limit_secs: u32,
}

impl Question {
    /// Whether the question is playable: non-empty text, four or more options and a valid answer.
    pub fn is_well_formed(&self) -> bool {
        !self.text.trim().is_empty()
            && self.options.len() >= 4
            && self.options.iter().all(|option| !option.trim().is_empty())
            && self.correct_option < self.options.len()
            && self.time_limit_secs > 0
    }
}

/// Option picked by a participant for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// A valid option index.
    Option(usize),
    /// No valid option was selected.
    Unanswered,
}

impl Selection {
    /// Interpret a raw client selection against the number of options.
    pub fn from_raw(raw: Option<i64>, option_count: usize) -> Self {
        match raw.and_then(|value| usize::try_from(value).ok()) {
            Some(index) if index < option_count => Selection::Option(index),
            _ => Selection::Unanswered,
        }
    }

    /// Index to expose in final results, unanswered slots collapse to `0`.
    pub fn normalized(self) -> usize {
        match self {
            Selection::Option(index) => index,
            Selection::Unanswered => 0,
        }
    }
}

impl Serialize for Selection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Selection::Option(index) => serializer.serialize_u64(*index as u64),
            Selection::Unanswered => serializer.serialize_str("unanswered"),
        }
    }
}

/// Answer recorded for one participant and one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerRecord {
    /// Question the answer belongs to.
    pub question_index: usize,
    /// Interpreted selection.
    pub selection: Selection,
    /// Whether the selection matches the correct option.
    pub is_correct: bool,
    /// Points earned on this question.
    pub points: u32,
    /// Running score before this answer.
    pub score_before: u32,
    /// Running score after this answer.
    pub score_after: u32,
}

/// Result of submitting an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// First answer of this participant for this question.
    Accepted(AnswerRecord),
    /// The participant had already answered; nothing changed.
    DuplicateIgnored,
}

/// Phases of the quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    /// Questions are frozen but none was shown yet.
    NotStarted,
    /// Question `index` accepts answers since `started_at`.
    QuestionActive {
        /// Current question.
        index: usize,
        /// Instant the question was shown.
        started_at: Instant,
    },
    /// The answer window of question `index` closed; results are shown.
    QuestionSettling {
        /// Question whose results are displayed.
        index: usize,
    },
    /// Final results were computed.
    Ended,
}

/// Errors raised when an operation does not match the session phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    /// A quiz cannot run without questions.
    #[error("question set is empty")]
    EmptyQuestionSet,
    /// The question index does not exist.
    #[error("question {0} does not exist")]
    QuestionOutOfRange(usize),
    /// The operation targets a question that is not in the expected phase.
    #[error("question {index} is not in a phase accepting this operation ({phase:?})")]
    WrongPhase {
        /// Targeted question.
        index: usize,
        /// Phase the session was in.
        phase: QuizPhase,
    },
}

/// One row of a question summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantAnswer {
    /// Participant identifier.
    pub participant_id: String,
    /// Display name.
    pub display_name: String,
    /// Selection, `Unanswered` when the participant did not answer.
    pub selection: Selection,
    /// Whether the answer was correct.
    pub is_correct: bool,
    /// Points earned on this question.
    pub points_earned: u32,
    /// Running score after this question.
    pub total_score: u32,
}

/// Summary broadcast when a question's answer window closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSummary {
    /// Settled question.
    pub question_index: usize,
    /// Revealed correct option.
    pub correct_option: usize,
    /// One row per present participant.
    pub answers: Vec<ParticipantAnswer>,
    /// Whether it was the last question of the quiz.
    pub is_last: bool,
}

/// Final standing of one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantResult {
    /// Participant identifier.
    pub participant_id: String,
    /// Display name.
    pub display_name: String,
    /// Final score.
    pub score: u32,
    /// One normalised selection per question.
    pub answers: Vec<usize>,
    /// Number of correct answers.
    pub correct_answers: usize,
    /// 1 + number of participants with a strictly greater score.
    pub rank: usize,
    /// True for every participant ranked first.
    pub is_winner: bool,
}

/// Terminal results of a quiz, sorted by descending score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResults {
    /// Standings, best first.
    pub participants: Vec<ParticipantResult>,
}

impl QuizResults {
    /// Identifiers of every winner.
    pub fn winner_ids(&self) -> Vec<String> {
        self.participants
            .iter()
            .filter(|result| result.is_winner)
            .map(|result| result.participant_id.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
struct ScoreSheet {
    answers: HashMap<usize, AnswerRecord>,
    score: u32,
}

/// Quiz session owned by a room once its questions are frozen.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<Question>,
    phase: QuizPhase,
    sheets: HashMap<String, ScoreSheet>,
    points_per_correct: u32,
}

impl QuizSession {
    /// Freeze a question sequence for a new session.
    pub fn new(questions: Vec<Question>, points_per_correct: u32) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::EmptyQuestionSet);
        }
        Ok(Self {
            questions,
            phase: QuizPhase::NotStarted,
            sheets: HashMap::new(),
            points_per_correct,
        })
    }

    /// Frozen question sequence.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Current phase.
    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    /// Index of the question being played or settled.
    pub fn current_index(&self) -> Option<usize> {
        match self.phase {
            QuizPhase::QuestionActive { index, .. } | QuizPhase::QuestionSettling { index } => {
                Some(index)
            }
            QuizPhase::NotStarted | QuizPhase::Ended => None,
        }
    }

    /// Whether `index` is the final question.
    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.questions.len()
    }

    /// Running score of a participant.
    pub fn score(&self, participant_id: &str) -> u32 {
        self.sheets
            .get(participant_id)
            .map(|sheet| sheet.score)
            .unwrap_or(0)
    }

    /// Answer recorded for a participant and a question.
    pub fn answer(&self, participant_id: &str, index: usize) -> Option<&AnswerRecord> {
        self.sheets
            .get(participant_id)
            .and_then(|sheet| sheet.answers.get(&index))
    }

    /// Show question `index`; only the first question or the successor of a settled one may start.
    pub fn begin_question(&mut self, index: usize, now: Instant) -> Result<&Question, QuizError> {
        if index >= self.questions.len() {
            return Err(QuizError::QuestionOutOfRange(index));
        }
        let allowed = match self.phase {
            QuizPhase::NotStarted => index == 0,
            QuizPhase::QuestionSettling { index: settled } => index == settled + 1,
            QuizPhase::QuestionActive { .. } | QuizPhase::Ended => false,
        };
        if !allowed {
            return Err(QuizError::WrongPhase {
                index,
                phase: self.phase,
            });
        }

        self.phase = QuizPhase::QuestionActive {
            index,
            started_at: now,
        };
        Ok(&self.questions[index])
    }

    /// Whole seconds left on the active question, rounded up; `0` outside an answer window.
    pub fn time_left(&self, now: Instant) -> u32 {
        let QuizPhase::QuestionActive { index, started_at } = self.phase else {
            return 0;
        };
        let limit = u64::from(self.questions[index].time_limit_secs) * 1_000;
        let elapsed = now.saturating_duration_since(started_at).as_millis() as u64;
        let remaining = limit.saturating_sub(elapsed);
        remaining.div_ceil(1_000) as u32
    }

    /// Record a participant's answer for the active question, first answer wins.
    pub fn record_answer(
        &mut self,
        participant_id: &str,
        index: usize,
        raw_selection: Option<i64>,
    ) -> Result<AnswerOutcome, QuizError> {
        match self.phase {
            QuizPhase::QuestionActive { index: active, .. } if active == index => {}
            phase => return Err(QuizError::WrongPhase { index, phase }),
        }

        let question = &self.questions[index];
        let sheet = self.sheets.entry(participant_id.to_string()).or_default();
        if sheet.answers.contains_key(&index) {
            return Ok(AnswerOutcome::DuplicateIgnored);
        }

        let selection = Selection::from_raw(raw_selection, question.options.len());
        let is_correct = selection == Selection::Option(question.correct_option);
        let points = if is_correct { self.points_per_correct } else { 0 };
        let record = AnswerRecord {
            question_index: index,
            selection,
            is_correct,
            points,
            score_before: sheet.score,
            score_after: sheet.score + points,
        };
        sheet.score = record.score_after;
        sheet.answers.insert(index, record);

        Ok(AnswerOutcome::Accepted(record))
    }

    /// Whether every listed participant answered question `index`.
    ///
    /// An empty roster never counts as "everyone answered".
    pub fn everyone_answered<'a>(
        &self,
        index: usize,
        present: impl IntoIterator<Item = &'a str>,
    ) -> bool {
        let mut any = false;
        for participant_id in present {
            any = true;
            if self.answer(participant_id, index).is_none() {
                return false;
            }
        }
        any
    }

    /// Close the answer window of question `index` and summarise it for `present` participants.
    pub fn settle<'a>(
        &mut self,
        index: usize,
        present: impl IntoIterator<Item = &'a Participant>,
    ) -> Result<QuestionSummary, QuizError> {
        match self.phase {
            QuizPhase::QuestionActive { index: active, .. } if active == index => {}
            phase => return Err(QuizError::WrongPhase { index, phase }),
        }
        self.phase = QuizPhase::QuestionSettling { index };

        let answers = present
            .into_iter()
            .map(|participant| {
                let record = self.answer(&participant.id, index);
                ParticipantAnswer {
                    participant_id: participant.id.clone(),
                    display_name: participant.display_name.clone(),
                    selection: record.map_or(Selection::Unanswered, |r| r.selection),
                    is_correct: record.is_some_and(|r| r.is_correct),
                    points_earned: record.map_or(0, |r| r.points),
                    total_score: self.score(&participant.id),
                }
            })
            .collect();

        Ok(QuestionSummary {
            question_index: index,
            correct_option: self.questions[index].correct_option,
            answers,
            is_last: self.is_last(index),
        })
    }

    /// Compute the final standings once the last question has settled.
    pub fn finish<'a>(
        &mut self,
        present: impl IntoIterator<Item = &'a Participant>,
    ) -> Result<QuizResults, QuizError> {
        let last = self.questions.len() - 1;
        if self.phase != (QuizPhase::QuestionSettling { index: last }) {
            return Err(QuizError::WrongPhase {
                index: last,
                phase: self.phase,
            });
        }
        self.phase = QuizPhase::Ended;

        let mut participants: Vec<ParticipantResult> = present
            .into_iter()
            .map(|participant| {
                let answers = (0..self.questions.len())
                    .map(|index| {
                        self.answer(&participant.id, index)
                            .map_or(0, |record| record.selection.normalized())
                    })
                    .collect();
                let correct_answers = (0..self.questions.len())
                    .filter(|index| {
                        self.answer(&participant.id, *index)
                            .is_some_and(|record| record.is_correct)
                    })
                    .count();
                ParticipantResult {
                    participant_id: participant.id.clone(),
                    display_name: participant.display_name.clone(),
                    score: self.score(&participant.id),
                    answers,
                    correct_answers,
                    rank: 0,
                    is_winner: false,
                }
            })
            .collect();

        // Stable sort keeps join order among equal scores.
        participants.sort_by(|a, b| b.score.cmp(&a.score));
        let scores: Vec<u32> = participants.iter().map(|result| result.score).collect();
        for result in &mut participants {
            result.rank = 1 + scores.iter().filter(|score| **score > result.score).count();
            result.is_winner = result.rank == 1;
        }

        Ok(QuizResults { participants })
    }
}
