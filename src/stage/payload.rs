use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::error::RunError;
use crate::stage::catalog::{RequestEncoding, Stage};

/// Body of one stage call, before it is bound to a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum StageRequest {
    /// Multipart upload with a single `file` part.
    File { file_name: String, bytes: Vec<u8> },
    /// Multipart form with plain text fields.
    Form(Vec<(&'static str, String)>),
    Json(serde_json::Value),
}

impl StageRequest {
    /// Request for a stage whose only input is a single reference string
    /// (an artifact produced earlier in the run, or a YouTube URL).
    pub fn for_reference(stage: Stage, reference: &str) -> Result<Self, RunError> {
        let reference = reference.to_owned();
        match stage {
            Stage::ExtractAudio => Ok(Self::Json(json!({ "video_file": reference }))),
            Stage::TranscribeNative
            | Stage::TranscribeEnglish
            | Stage::FastNative
            | Stage::FastEnglish => Ok(Self::Json(json!({ "audio_file": reference }))),
            Stage::SummarizeNative | Stage::SummarizeEnglish => {
                Ok(Self::Form(vec![("text_file", reference)]))
            }
            Stage::TtsNative | Stage::TtsEnglish => {
                Ok(Self::Json(json!({ "summary_file": reference })))
            }
            Stage::YoutubeSubtitles => Ok(Self::Json(json!({ "url": reference }))),
            Stage::UploadVideo | Stage::UploadAudio | Stage::UploadText | Stage::FileRetrieval => {
                Err(RunError::Unexpected(format!(
                    "{stage} does not take a reference payload"
                )))
            }
        }
    }

    pub fn pasted_text(text: String) -> Self {
        Self::Form(vec![("text", text)])
    }

    pub fn encoding(&self) -> RequestEncoding {
        match self {
            Self::File { .. } | Self::Form(_) => RequestEncoding::Multipart,
            Self::Json(_) => RequestEncoding::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedFile {
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TextArtifact {
    pub text_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtractedAudio {
    pub audio_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Transcript {
    pub transcription: String,
    #[serde(default)]
    pub text_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Summary {
    pub summary: String,
    pub summary_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SynthesizedAudio {
    pub audio_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpedUpAudio {
    pub fast_audio_file: String,
}

/// Raw body of a 2xx stage response, decoded by `invoke_stage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReply(pub Vec<u8>);

impl From<serde_json::Value> for StageReply {
    fn from(body: serde_json::Value) -> Self {
        Self(body.to_string().into_bytes())
    }
}

/// Typed success payload of a stage; the variant is fixed by the stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutput {
    Uploaded(UploadedFile),
    Text(TextArtifact),
    ExtractedAudio(ExtractedAudio),
    Transcript(Transcript),
    Summary(Summary),
    SynthesizedAudio(SynthesizedAudio),
    SpedUpAudio(SpedUpAudio),
}

impl StageOutput {
    /// A body that is not JSON at all is as malformed as one missing a field.
    pub fn from_reply(stage: Stage, reply: &StageReply) -> Result<Self, RunError> {
        let body = serde_json::from_slice(&reply.0).map_err(|error| malformed(stage, error))?;
        Self::decode(stage, body)
    }

    pub fn decode(stage: Stage, body: serde_json::Value) -> Result<Self, RunError> {
        match stage {
            Stage::UploadVideo | Stage::UploadAudio => decode(stage, body).map(Self::Uploaded),
            Stage::UploadText | Stage::YoutubeSubtitles => decode(stage, body).map(Self::Text),
            Stage::ExtractAudio => decode(stage, body).map(Self::ExtractedAudio),
            Stage::TranscribeNative | Stage::TranscribeEnglish => {
                decode(stage, body).map(Self::Transcript)
            }
            Stage::SummarizeNative | Stage::SummarizeEnglish => {
                decode(stage, body).map(Self::Summary)
            }
            Stage::TtsNative | Stage::TtsEnglish => decode(stage, body).map(Self::SynthesizedAudio),
            Stage::FastNative | Stage::FastEnglish => decode(stage, body).map(Self::SpedUpAudio),
            Stage::FileRetrieval => Err(RunError::Unexpected(
                "file retrieval has no JSON envelope".to_owned(),
            )),
        }
    }
}

fn decode<T: DeserializeOwned>(stage: Stage, body: serde_json::Value) -> Result<T, RunError> {
    serde_json::from_value(body).map_err(|error| malformed(stage, error))
}

fn malformed(stage: Stage, error: serde_json::Error) -> RunError {
    RunError::Unexpected(format!("{stage} returned a malformed response: {error}"))
}
