use std::path::PathBuf;
use std::sync::OnceLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RunError;
use crate::stage::{Stage, StageRequest};

pub const EMPTY_TEXT_MESSAGE: &str = "Enter some text first.";
pub const EMPTY_URL_MESSAGE: &str = "Enter a YouTube URL.";

/// Zero-width space, non-joiner, joiner, LRM/RLM marks and the byte-order mark.
const INVISIBLE_PATTERN: &str = r"[\x{200B}-\x{200F}\x{FEFF}]";

static INVISIBLE: OnceLock<Option<Regex>> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    Video,
    Audio,
    Text,
    Youtube,
}

impl InputType {
    pub fn label(self) -> &'static str {
        match self {
            InputType::Video => "video",
            InputType::Audio => "audio",
            InputType::Text => "text",
            InputType::Youtube => "youtube",
        }
    }

    /// Prefix of the terminal log line when a run of this type fails.
    pub fn error_prefix(self) -> &'static str {
        match self {
            InputType::Youtube => "YouTube Error: ",
            _ => "Error: ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Fast,
    #[default]
    Full,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Fast => "fast",
            Mode::Full => "full",
        }
    }
}

/// What the caller hands to an entry pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMaterial {
    File(PathBuf),
    Bytes { file_name: String, bytes: Vec<u8> },
    PastedText(String),
    Url(String),
}

impl SourceMaterial {
    fn describe(&self) -> &'static str {
        match self {
            SourceMaterial::File(_) | SourceMaterial::Bytes { .. } => "a file",
            SourceMaterial::PastedText(_) => "pasted text",
            SourceMaterial::Url(_) => "a URL",
        }
    }

    /// Builds the request for the stage that consumes the caller's source
    /// directly (an upload or the subtitle fetch).
    pub async fn to_request(&self, stage: Stage) -> Result<StageRequest, RunError> {
        match self {
            SourceMaterial::File(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|error| {
                    RunError::Unexpected(format!("unable to read {}: {error}", path.display()))
                })?;
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "upload".to_owned());
                Ok(StageRequest::File { file_name, bytes })
            }
            SourceMaterial::Bytes { file_name, bytes } => Ok(StageRequest::File {
                file_name: file_name.clone(),
                bytes: bytes.clone(),
            }),
            SourceMaterial::PastedText(text) => Ok(StageRequest::pasted_text(text.clone())),
            SourceMaterial::Url(url) => StageRequest::for_reference(stage, url),
        }
    }
}

/// Removes invisible code points, then surrounding whitespace.
pub fn clean_text(raw: &str) -> String {
    let pattern = INVISIBLE.get_or_init(|| Regex::new(INVISIBLE_PATTERN).ok());
    match pattern {
        Some(regex) => regex.replace_all(raw, "").trim().to_owned(),
        None => raw.trim().to_owned(),
    }
}

/// Checks the preconditions that must hold before any stage is invoked and
/// returns the normalized source.
pub fn validate_source(
    input_type: InputType,
    source: SourceMaterial,
) -> Result<SourceMaterial, RunError> {
    match (input_type, source) {
        (
            InputType::Video | InputType::Audio | InputType::Text,
            file @ (SourceMaterial::File(_) | SourceMaterial::Bytes { .. }),
        ) => Ok(file),
        (InputType::Text, SourceMaterial::PastedText(raw)) => {
            let cleaned = clean_text(&raw);
            if cleaned.is_empty() {
                Err(RunError::Validation(EMPTY_TEXT_MESSAGE.to_owned()))
            } else {
                Ok(SourceMaterial::PastedText(cleaned))
            }
        }
        (InputType::Youtube, SourceMaterial::Url(raw)) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                Err(RunError::Validation(EMPTY_URL_MESSAGE.to_owned()))
            } else {
                Ok(SourceMaterial::Url(trimmed.to_owned()))
            }
        }
        (input_type, other) => Err(RunError::Validation(format!(
            "{} input cannot be started from {}.",
            input_type.label(),
            other.describe()
        ))),
    }
}
