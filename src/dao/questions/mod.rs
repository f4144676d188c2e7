#[cfg(feature = "generated-questions")]
pub mod generated;
pub mod placeholder;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::state::{quiz::Question, room::Difficulty};

/// What a room asks the question source for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRequest {
    /// Free-form topic.
    pub topic: String,
    /// Requested difficulty.
    pub difficulty: Difficulty,
    /// Number of questions.
    pub count: usize,
    /// Time limit to assign to every question.
    pub time_limit_secs: u32,
}

/// Failures of a question source.
#[derive(Debug, Error)]
pub enum QuestionSourceError {
    /// The source is not configured.
    #[error("question source disabled")]
    Disabled,
    /// The source could not be reached.
    #[error("question source unreachable: {0}")]
    Unreachable(String),
    /// The source answered something that is not a usable question list.
    #[error("question source returned an unusable payload: {0}")]
    InvalidPayload(String),
    /// Every configured model failed.
    #[error("every question model failed")]
    Exhausted,
}

/// Supplier of ordered multiple choice questions.
pub trait QuestionSource: Send + Sync {
    fn generate(
        &self,
        request: QuestionRequest,
    ) -> BoxFuture<'static, Result<Vec<Question>, QuestionSourceError>>;
}

/// Source used when no generator is configured: always defers to placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSource;

impl QuestionSource for DisabledSource {
    fn generate(
        &self,
        _request: QuestionRequest,
    ) -> BoxFuture<'static, Result<Vec<Question>, QuestionSourceError>> {
        Box::pin(async { Err(QuestionSourceError::Disabled) })
    }
}
