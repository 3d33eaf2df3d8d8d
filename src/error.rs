use thiserror::Error;

use crate::stage::Stage;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("toml serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("controller error: {0}")]
    Controller(String),

    #[error("artifact retrieval failed: {0}")]
    Retrieval(String),

    #[error("run failed: {0}")]
    Run(String),
}

pub type AppResult<T> = Result<T, AppError>;

/// A non-success outcome of one remote stage call.
///
/// `status` is `None` when the request never produced a response
/// (connection refused, timeout, body read failure).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: Stage,
    pub status: Option<u16>,
    pub message: String,
}

impl StageFailure {
    pub fn status(stage: Stage, status: u16, message: impl Into<String>) -> Self {
        Self {
            stage,
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transport(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            status: None,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "{} failed: Request failed {}: {}",
                self.stage, status, self.message
            ),
            None => write!(f, "{} failed: Request failed: {}", self.stage, self.message),
        }
    }
}

impl std::error::Error for StageFailure {}

/// Everything that can end a run early.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Stage(#[from] StageFailure),

    #[error("unexpected error: {0}")]
    Unexpected(String),

    #[error("run cancelled")]
    Cancelled,
}

impl RunError {
    /// The line written to the progress log when this error ends a run.
    ///
    /// Validation messages are shown as-is; everything else carries an error
    /// prefix so it cannot be mistaken for a stage-start line.
    pub fn terminal_message(&self, prefix: &str) -> String {
        match self {
            RunError::Validation(message) => message.clone(),
            other => format!("{prefix}{other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, RunError, StageFailure};
    use crate::stage::Stage;
    use serde::ser::Error as _;

    #[test]
    fn display_messages_cover_all_variants() {
        let cases = vec![
            (
                AppError::Io(std::io::Error::other("disk gone")),
                "io error: disk gone",
            ),
            (
                AppError::TomlParse(toml::from_str::<toml::Value>("not= [valid").unwrap_err()),
                "toml parse error: ",
            ),
            (
                AppError::TomlSerialize(toml::ser::Error::custom("serialize failed")),
                "toml serialize error: serialize failed",
            ),
            (
                AppError::Json(serde_json::from_str::<serde_json::Value>("{bad").unwrap_err()),
                "json parse error: ",
            ),
            (
                AppError::Config("bad config".to_owned()),
                "invalid configuration: bad config",
            ),
            (
                AppError::Controller("controller dead".to_owned()),
                "controller error: controller dead",
            ),
            (
                AppError::Retrieval("404".to_owned()),
                "artifact retrieval failed: 404",
            ),
            (
                AppError::Run("Error: boom".to_owned()),
                "run failed: Error: boom",
            ),
        ];

        for (error, expected_prefix) in cases {
            let display = format!("{error}");
            let debug = format!("{error:?}");
            assert!(
                display.starts_with(expected_prefix),
                "display message `{display}` did not start with `{expected_prefix}`"
            );
            assert!(!display.trim().is_empty());
            assert!(!debug.trim().is_empty());
        }
    }

    #[test]
    fn stage_failure_relays_status_and_body_verbatim() {
        let failure = StageFailure::status(Stage::SummarizeEnglish, 500, "Internal Server Error");
        assert_eq!(
            failure.to_string(),
            "summarize-english failed: Request failed 500: Internal Server Error"
        );

        let transport = StageFailure::transport(Stage::UploadVideo, "connection refused");
        assert_eq!(
            transport.to_string(),
            "upload-video failed: Request failed: connection refused"
        );
    }

    #[test]
    fn terminal_message_prefixes_everything_but_validation() {
        assert_eq!(
            RunError::Validation("Enter some text first.".to_owned()).terminal_message("Error: "),
            "Enter some text first."
        );
        assert_eq!(
            RunError::Unexpected("bad payload".to_owned()).terminal_message("Error: "),
            "Error: unexpected error: bad payload"
        );
        let stage = RunError::from(StageFailure::status(Stage::YoutubeSubtitles, 400, "Invalid"));
        assert_eq!(
            stage.terminal_message("YouTube Error: "),
            "YouTube Error: youtube-subtitles failed: Request failed 400: Invalid"
        );
    }
}
