use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::pipeline::Mode;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub pipeline: PipelineConfig,
    pub output: OutputConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Header that carries `api_key` on every call.
    pub credential_header: String,
    /// Unset means calls may wait indefinitely.
    pub request_timeout_seconds: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_owned(),
            api_key: None,
            credential_header: "x-api-key".to_owned(),
            request_timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: Mode,
    pub parallel_branches: bool,
    pub overlap_policy: OverlapPolicy,
}

/// What happens when a run is started while another is still processing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Cancel the in-flight run and start the new one.
    #[default]
    Supersede,
    Reject,
}

impl OverlapPolicy {
    pub fn label(self) -> &'static str {
        match self {
            OverlapPolicy::Supersede => "supersede",
            OverlapPolicy::Reject => "reject",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub download_dir: Option<PathBuf>,
    pub download_audio: bool,
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub log_level: String,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
        }
    }
}
