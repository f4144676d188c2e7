//! Application-level configuration loading: quiz pacing, scoring and collaborator retry policy.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZROOM_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Time limit applied to every question, in seconds.
    pub question_time_limit_secs: u32,
    /// Interval between two countdown broadcasts.
    pub tick_interval: Duration,
    /// Pause between `gameStart` and the first question.
    pub start_delay: Duration,
    /// Pause between a question's results and the next question.
    pub settle_delay: Duration,
    /// Pause between the last question's results and the final results.
    pub final_settle_delay: Duration,
    /// Points awarded for a correct answer.
    pub points_per_correct: u32,
    /// Length of generated room codes.
    pub room_code_length: usize,
    /// Upper bound accepted for a room's capacity.
    pub max_capacity: usize,
    /// Upper bound accepted for a room's question count.
    pub max_question_count: usize,
    /// Upper bound on the time spent waiting for the question source.
    pub question_fetch_timeout: Duration,
    /// Number of attempts made to store final results.
    pub final_results_attempts: u32,
    /// Fixed pause between two final results attempts.
    pub final_results_backoff: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        time_limit = app_config.question_time_limit_secs,
                        "loaded quiz configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Settle pause to apply after question results, depending on whether it was the last one.
    pub fn settle_delay_for(&self, is_last: bool) -> Duration {
        if is_last {
            self.final_settle_delay
        } else {
            self.settle_delay
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    question_time_limit_secs: Option<u32>,
    tick_interval_ms: Option<u64>,
    start_delay_ms: Option<u64>,
    settle_delay_ms: Option<u64>,
    final_settle_delay_ms: Option<u64>,
    points_per_correct: Option<u32>,
    room_code_length: Option<usize>,
    max_capacity: Option<usize>,
    max_question_count: Option<usize>,
    question_fetch_timeout_ms: Option<u64>,
    final_results_attempts: Option<u32>,
    final_results_backoff_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let millis = |raw: Option<u64>, fallback: u64| Duration::from_millis(raw.unwrap_or(fallback));
        Self {
            question_time_limit_secs: value.question_time_limit_secs.unwrap_or(30).max(1),
            tick_interval: millis(value.tick_interval_ms.filter(|ms| *ms > 0), 500),
            start_delay: millis(value.start_delay_ms, 3_000),
            settle_delay: millis(value.settle_delay_ms, 3_000),
            final_settle_delay: millis(value.final_settle_delay_ms, 5_000),
            points_per_correct: value.points_per_correct.unwrap_or(10),
            room_code_length: value.room_code_length.unwrap_or(6).max(4),
            max_capacity: value.max_capacity.unwrap_or(50).max(1),
            max_question_count: value.max_question_count.unwrap_or(50).max(1),
            question_fetch_timeout: millis(value.question_fetch_timeout_ms, 20_000),
            final_results_attempts: value.final_results_attempts.unwrap_or(3).max(1),
            final_results_backoff: millis(value.final_results_backoff_ms, 1_000),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_quiz_pacing() {
        let config = AppConfig::default();
        assert_eq!(config.question_time_limit_secs, 30);
        assert_eq!(config.tick_interval, Duration::from_millis(500));
        assert_eq!(config.points_per_correct, 10);
        assert_eq!(config.room_code_length, 6);
        assert_eq!(config.final_results_attempts, 3);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let raw: RawConfig =
            serde_json::from_str(r#"{ "settle_delay_ms": 1000, "points_per_correct": 5 }"#)
                .unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.settle_delay, Duration::from_secs(1));
        assert_eq!(config.points_per_correct, 5);
        assert_eq!(config.final_settle_delay, Duration::from_secs(5));
    }

    #[test]
    fn settle_delay_is_longer_after_last_question() {
        let config = AppConfig::default();
        assert!(config.settle_delay_for(true) > config.settle_delay_for(false));
    }

    #[test]
    fn zero_tick_interval_is_rejected() {
        let raw: RawConfig = serde_json::from_str(r#"{ "tick_interval_ms": 0 }"#).unwrap();
        assert_eq!(AppConfig::from(raw).tick_interval, Duration::from_millis(500));
    }
}
