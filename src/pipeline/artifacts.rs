use std::collections::HashMap;

use crate::error::RunError;
use crate::stage::payload::StageOutput;
use crate::stage::Stage;

/// Named places where one stage leaves a value for a later stage or for the
/// result bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    VideoFile,
    AudioFile,
    TextFile,
    TranscriptionNative,
    TranscriptionEnglish,
    SummaryNative,
    SummaryEnglish,
    SummaryFileNative,
    SummaryFileEnglish,
    AudioNative,
    AudioEnglish,
    FastAudioNative,
    FastAudioEnglish,
}

/// Values accumulated by one run. Artifact references are relayed, never
/// inspected.
#[derive(Debug, Clone, Default)]
pub struct ArtifactBag {
    values: HashMap<Slot, String>,
}

impl ArtifactBag {
    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.values.get(&slot).map(String::as_str)
    }

    /// A slot that a stage is about to consume. Missing means the stage was
    /// scheduled before its producer.
    pub fn require(&self, slot: Slot) -> Result<&str, RunError> {
        self.get(slot)
            .ok_or_else(|| RunError::Unexpected(format!("no {slot:?} produced earlier in the run")))
    }

    pub fn text_or_empty(&self, slot: Slot) -> String {
        self.get(slot).unwrap_or_default().to_owned()
    }

    fn put(&mut self, slot: Slot, value: String) {
        self.values.insert(slot, value);
    }

    /// Stores a stage's typed output under the slots that stage feeds.
    pub fn absorb(&mut self, stage: Stage, output: StageOutput) -> Result<(), RunError> {
        match (stage, output) {
            (Stage::UploadVideo, StageOutput::Uploaded(upload)) => {
                self.put(Slot::VideoFile, upload.filename)
            }
            (Stage::UploadAudio, StageOutput::Uploaded(upload)) => {
                self.put(Slot::AudioFile, upload.filename)
            }
            (Stage::UploadText | Stage::YoutubeSubtitles, StageOutput::Text(text)) => {
                self.put(Slot::TextFile, text.text_file)
            }
            (Stage::ExtractAudio, StageOutput::ExtractedAudio(audio)) => {
                self.put(Slot::AudioFile, audio.audio_file)
            }
            (Stage::TranscribeNative, StageOutput::Transcript(transcript)) => {
                let text_file = transcript.text_file.ok_or_else(|| {
                    RunError::Unexpected(
                        "transcribe-native returned no text_file to summarize".to_owned(),
                    )
                })?;
                self.put(Slot::TextFile, text_file);
                self.put(Slot::TranscriptionNative, transcript.transcription);
            }
            (Stage::TranscribeEnglish, StageOutput::Transcript(transcript)) => {
                self.put(Slot::TranscriptionEnglish, transcript.transcription)
            }
            (Stage::SummarizeNative, StageOutput::Summary(summary)) => {
                self.put(Slot::SummaryNative, summary.summary);
                self.put(Slot::SummaryFileNative, summary.summary_file);
            }
            (Stage::SummarizeEnglish, StageOutput::Summary(summary)) => {
                self.put(Slot::SummaryEnglish, summary.summary);
                self.put(Slot::SummaryFileEnglish, summary.summary_file);
            }
            (Stage::TtsNative, StageOutput::SynthesizedAudio(audio)) => {
                self.put(Slot::AudioNative, audio.audio_file)
            }
            (Stage::TtsEnglish, StageOutput::SynthesizedAudio(audio)) => {
                self.put(Slot::AudioEnglish, audio.audio_file)
            }
            (Stage::FastNative, StageOutput::SpedUpAudio(audio)) => {
                self.put(Slot::FastAudioNative, audio.fast_audio_file)
            }
            (Stage::FastEnglish, StageOutput::SpedUpAudio(audio)) => {
                self.put(Slot::FastAudioEnglish, audio.fast_audio_file)
            }
            (stage, output) => {
                return Err(RunError::Unexpected(format!(
                    "{stage} produced an unexpected payload: {output:?}"
                )))
            }
        }
        Ok(())
    }
}
