use serde::Serialize;
use uuid::Uuid;

use crate::pipeline::{InputType, Mode, ProgressEntry, ResultBundle};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "reason", rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Processing,
    Succeeded,
    Failed(String),
}

/// Read-only copy of the live run, safe to hand to a renderer.
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub run_id: Option<Uuid>,
    pub input_type: Option<InputType>,
    pub mode: Mode,
    pub status: RunStatus,
    pub processing: bool,
    pub log: Vec<ProgressEntry>,
    pub result: Option<ResultBundle>,
}
