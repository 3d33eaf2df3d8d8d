//! Result Aggregator.

use serde::{Deserialize, Serialize};

use crate::error::RunError;
use crate::pipeline::artifacts::{ArtifactBag, Slot};
use crate::pipeline::input::Mode;

/// A native/English pair of the same kind of value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bilingual<T> {
    pub native: T,
    pub english: T,
}

impl<T> Bilingual<T> {
    pub fn new(native: T, english: T) -> Self {
        Self { native, english }
    }
}

/// Audio artifact references published only by full-mode runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Narration {
    pub audio_native: String,
    pub audio_english: String,
    pub fast_audio_native: String,
    pub fast_audio_english: String,
}

/// Final output of a successful run. Transcription fields are empty when
/// the input bypassed transcription (text and YouTube runs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultBundle {
    pub transcription_native: String,
    pub transcription_english: String,
    pub summary_native: String,
    pub summary_english: String,
    #[serde(flatten, default, skip_serializing_if = "Option::is_none")]
    pub narration: Option<Narration>,
}

impl ResultBundle {
    /// `(field name, artifact reference)` for every audio field present.
    pub fn audio_references(&self) -> Vec<(&'static str, &str)> {
        match &self.narration {
            Some(narration) => vec![
                ("audio_native", narration.audio_native.as_str()),
                ("audio_english", narration.audio_english.as_str()),
                ("fast_audio_native", narration.fast_audio_native.as_str()),
                ("fast_audio_english", narration.fast_audio_english.as_str()),
            ],
            None => Vec::new(),
        }
    }

    /// `(file stem, text)` for the four text fields, in display order.
    pub fn texts(&self) -> [(&'static str, &str); 4] {
        [
            ("transcription_native", self.transcription_native.as_str()),
            ("transcription_english", self.transcription_english.as_str()),
            ("summary_native", self.summary_native.as_str()),
            ("summary_english", self.summary_english.as_str()),
        ]
    }
}

/// Pure assembly: the field set depends only on `mode`. Audio pairs passed
/// to a fast-mode publish are dropped.
pub fn publish(
    mode: Mode,
    transcription: Bilingual<String>,
    summary: Bilingual<String>,
    audio: Option<Bilingual<String>>,
    fast_audio: Option<Bilingual<String>>,
) -> ResultBundle {
    let narration = match (mode, audio, fast_audio) {
        (Mode::Full, Some(audio), Some(fast)) => Some(Narration {
            audio_native: audio.native,
            audio_english: audio.english,
            fast_audio_native: fast.native,
            fast_audio_english: fast.english,
        }),
        _ => None,
    };

    ResultBundle {
        transcription_native: transcription.native,
        transcription_english: transcription.english,
        summary_native: summary.native,
        summary_english: summary.english,
        narration,
    }
}

/// Collects a finished run's terminal outputs from its artifact bag.
pub fn assemble(mode: Mode, bag: &ArtifactBag) -> Result<ResultBundle, RunError> {
    let transcription = Bilingual::new(
        bag.text_or_empty(Slot::TranscriptionNative),
        bag.text_or_empty(Slot::TranscriptionEnglish),
    );
    let summary = Bilingual::new(
        bag.require(Slot::SummaryNative)?.to_owned(),
        bag.require(Slot::SummaryEnglish)?.to_owned(),
    );

    let (audio, fast_audio) = match mode {
        Mode::Fast => (None, None),
        Mode::Full => (
            Some(Bilingual::new(
                bag.require(Slot::AudioNative)?.to_owned(),
                bag.require(Slot::AudioEnglish)?.to_owned(),
            )),
            Some(Bilingual::new(
                bag.require(Slot::FastAudioNative)?.to_owned(),
                bag.require(Slot::FastAudioEnglish)?.to_owned(),
            )),
        ),
    };

    Ok(publish(mode, transcription, summary, audio, fast_audio))
}
