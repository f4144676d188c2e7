//! Question source backed by a generative language model exposed over HTTP
//! (`{base}/models/{model}:generateContent?key=...`).

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    dao::questions::{QuestionRequest, QuestionSource, QuestionSourceError},
    state::quiz::Question,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODELS: &[&str] = &["gemini-1.5-pro", "gemini-1.0-pro", "gemini-pro"];

/// Credentials and endpoints of the generative model API.
#[derive(Debug, Clone)]
pub struct GeneratedSourceConfig {
    pub api_key: String,
    pub base_url: String,
    /// Models tried in order until one produces a usable list.
    pub models: Vec<String>,
}

impl GeneratedSourceConfig {
    /// Configuration with the default endpoint and model list.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Read `QUESTION_API_KEY`, `QUESTION_API_BASE_URL` and `QUESTION_API_MODELS`.
    /// Returns `None` when no key is configured.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("QUESTION_API_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty())?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("QUESTION_API_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(models) = std::env::var("QUESTION_API_MODELS") {
            let models: Vec<String> = models
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
            if !models.is_empty() {
                config.models = models;
            }
        }
        Some(config)
    }
}

#[derive(Clone)]
pub struct GeneratedQuestionSource {
    client: Client,
    base_url: Arc<str>,
    api_key: Arc<str>,
    models: Arc<[String]>,
}

impl GeneratedQuestionSource {
    pub fn new(config: GeneratedSourceConfig) -> Result<Self, QuestionSourceError> {
        let client = Client::builder()
            .build()
            .map_err(|err| QuestionSourceError::Unreachable(err.to_string()))?;
        Ok(Self {
            client,
            base_url: Arc::<str>::from(config.base_url.trim_end_matches('/')),
            api_key: Arc::<str>::from(config.api_key),
            models: config.models.into(),
        })
    }

    async fn ask_model(
        &self,
        model: &str,
        request: &QuestionRequest,
    ) -> Result<Vec<Question>, QuestionSourceError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt(request) }] }],
            "generationConfig": {
                "temperature": 0.7,
                "topP": 0.8,
                "topK": 40,
                "maxOutputTokens": 8192,
            },
        });

        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_ref())])
            .json(&body)
            .send()
            .await
            .map_err(|err| QuestionSourceError::Unreachable(err.to_string()))?;
        if !response.status().is_success() {
            return Err(QuestionSourceError::Unreachable(format!(
                "model {model} answered {}",
                response.status()
            )));
        }

        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|err| QuestionSourceError::InvalidPayload(err.to_string()))?;
        let text = payload
            .candidates
            .into_iter()
            .flat_map(|candidate| candidate.content.parts)
            .map(|part| part.text)
            .collect::<String>();

        let questions = parse_questions(&text, request.time_limit_secs)?;
        if questions.len() != request.count {
            return Err(QuestionSourceError::InvalidPayload(format!(
                "model {model} returned {} questions, expected {}",
                questions.len(),
                request.count
            )));
        }
        Ok(questions)
    }
}

impl QuestionSource for GeneratedQuestionSource {
    fn generate(
        &self,
        request: QuestionRequest,
    ) -> BoxFuture<'static, Result<Vec<Question>, QuestionSourceError>> {
        let source = self.clone();
        Box::pin(async move {
            for model in source.models.iter() {
                info!(%model, topic = %request.topic, count = request.count, "requesting questions");
                match source.ask_model(model, &request).await {
                    Ok(questions) => return Ok(questions),
                    Err(err) => warn!(%model, error = %err, "question model failed"),
                }
            }
            Err(QuestionSourceError::Exhausted)
        })
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedItem {
    question_text: String,
    options: Vec<String>,
    correct_option: usize,
}

fn prompt(request: &QuestionRequest) -> String {
    let difficulty = request.difficulty.as_str();
    format!(
        "Generate {count} multiple choice questions about {topic} with {difficulty} difficulty level.\n\
         Each question should have exactly 4 options with one correct answer.\n\
         Return ONLY a JSON array of objects shaped like\n\
         {{\"questionText\": \"...\", \"options\": [\"A\", \"B\", \"C\", \"D\"], \"correctOption\": 0}}\n\
         where correctOption is the 0-based index of the correct option.",
        count = request.count,
        topic = request.topic,
    )
}

/// Remove a surrounding Markdown code fence, with or without a `json` tag.
fn strip_code_fence(text: &str) -> &str {
    let Some((_, rest)) = text.split_once("```") else {
        return text.trim();
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.split("```").next().unwrap_or(rest).trim()
}

/// Parse a model answer into questions, rejecting the whole list on any malformed item.
fn parse_questions(text: &str, time_limit_secs: u32) -> Result<Vec<Question>, QuestionSourceError> {
    let items: Vec<GeneratedItem> = serde_json::from_str(strip_code_fence(text))
        .map_err(|err| QuestionSourceError::InvalidPayload(err.to_string()))?;

    let questions: Vec<Question> = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| Question {
            id: format!("gen-q{}", i + 1),
            text: item.question_text,
            options: item.options,
            correct_option: item.correct_option,
            time_limit_secs,
        })
        .collect();

    if let Some(bad) = questions.iter().find(|q| !q.is_well_formed()) {
        return Err(QuestionSourceError::InvalidPayload(format!(
            "question {} is malformed",
            bad.id
        )));
    }
    Ok(questions)
}
