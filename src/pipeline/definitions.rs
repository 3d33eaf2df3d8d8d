//! Pipeline Definitions.
//!
//! Each run is a fixed list of steps: an input-specific entry prefix followed
//! by the mode-specific Text Pipeline. A step is either one stage or a
//! native/English pair whose members do not consume each other's output.

use std::collections::HashSet;

use crate::error::RunError;
use crate::pipeline::artifacts::Slot;
use crate::pipeline::input::{InputType, Mode};
use crate::stage::Stage;

/// Where a stage takes its single input from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageInput {
    /// The caller's file, pasted text or URL.
    Source,
    Artifact(Slot),
}

pub fn input_of(stage: Stage) -> StageInput {
    match stage {
        Stage::UploadVideo
        | Stage::UploadAudio
        | Stage::UploadText
        | Stage::YoutubeSubtitles
        | Stage::FileRetrieval => StageInput::Source,
        Stage::ExtractAudio => StageInput::Artifact(Slot::VideoFile),
        Stage::TranscribeNative | Stage::TranscribeEnglish => StageInput::Artifact(Slot::AudioFile),
        Stage::SummarizeNative | Stage::SummarizeEnglish => StageInput::Artifact(Slot::TextFile),
        Stage::TtsNative => StageInput::Artifact(Slot::SummaryFileNative),
        Stage::TtsEnglish => StageInput::Artifact(Slot::SummaryFileEnglish),
        Stage::FastNative => StageInput::Artifact(Slot::AudioNative),
        Stage::FastEnglish => StageInput::Artifact(Slot::AudioEnglish),
    }
}

pub fn produces(stage: Stage) -> &'static [Slot] {
    match stage {
        Stage::UploadVideo => &[Slot::VideoFile],
        Stage::UploadAudio | Stage::ExtractAudio => &[Slot::AudioFile],
        Stage::UploadText | Stage::YoutubeSubtitles => &[Slot::TextFile],
        Stage::TranscribeNative => &[Slot::TextFile, Slot::TranscriptionNative],
        Stage::TranscribeEnglish => &[Slot::TranscriptionEnglish],
        Stage::SummarizeNative => &[Slot::SummaryNative, Slot::SummaryFileNative],
        Stage::SummarizeEnglish => &[Slot::SummaryEnglish, Slot::SummaryFileEnglish],
        Stage::TtsNative => &[Slot::AudioNative],
        Stage::TtsEnglish => &[Slot::AudioEnglish],
        Stage::FastNative => &[Slot::FastAudioNative],
        Stage::FastEnglish => &[Slot::FastAudioEnglish],
        Stage::FileRetrieval => &[],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Single(Stage),
    /// Independent native/English stages; may run concurrently.
    Branches { native: Stage, english: Stage },
}

impl Step {
    pub fn stages(&self) -> Vec<Stage> {
        match *self {
            Step::Single(stage) => vec![stage],
            Step::Branches { native, english } => vec![native, english],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDefinition {
    pub input_type: InputType,
    pub mode: Mode,
    pub steps: Vec<Step>,
}

impl PipelineDefinition {
    pub fn for_run(input_type: InputType, mode: Mode) -> Self {
        let mut steps = entry_steps(input_type);
        steps.extend(text_pipeline(mode));
        Self {
            input_type,
            mode,
            steps,
        }
    }

    /// Stage attempts in order, as a sequential run performs them.
    pub fn stage_sequence(&self) -> Vec<Stage> {
        self.steps.iter().flat_map(Step::stages).collect()
    }

    /// Every consumed artifact must come from a strictly earlier step.
    pub fn check_bindings(&self) -> Result<(), RunError> {
        let mut available: HashSet<Slot> = HashSet::new();
        for step in &self.steps {
            let stages = step.stages();
            for stage in &stages {
                if let StageInput::Artifact(slot) = input_of(*stage) {
                    if !available.contains(&slot) {
                        return Err(RunError::Unexpected(format!(
                            "{stage} consumes {slot:?} before any earlier stage produces it"
                        )));
                    }
                }
            }
            for stage in stages {
                available.extend(produces(stage).iter().copied());
            }
        }
        Ok(())
    }
}

pub fn entry_steps(input_type: InputType) -> Vec<Step> {
    match input_type {
        InputType::Video => {
            let mut steps = vec![Step::Single(Stage::UploadVideo), Step::Single(Stage::ExtractAudio)];
            steps.extend(audio_continuation());
            steps
        }
        InputType::Audio => {
            let mut steps = vec![Step::Single(Stage::UploadAudio)];
            steps.extend(audio_continuation());
            steps
        }
        InputType::Text => vec![Step::Single(Stage::UploadText)],
        InputType::Youtube => vec![Step::Single(Stage::YoutubeSubtitles)],
    }
}

/// Shared by video and audio: both transcriptions of the same audio artifact.
fn audio_continuation() -> Vec<Step> {
    vec![Step::Branches {
        native: Stage::TranscribeNative,
        english: Stage::TranscribeEnglish,
    }]
}

pub fn text_pipeline(mode: Mode) -> Vec<Step> {
    let summaries = Step::Branches {
        native: Stage::SummarizeNative,
        english: Stage::SummarizeEnglish,
    };
    match mode {
        Mode::Fast => vec![summaries],
        Mode::Full => vec![
            summaries,
            Step::Branches {
                native: Stage::TtsNative,
                english: Stage::TtsEnglish,
            },
            Step::Branches {
                native: Stage::FastNative,
                english: Stage::FastEnglish,
            },
        ],
    }
}
