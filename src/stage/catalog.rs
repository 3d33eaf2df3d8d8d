use serde::Serialize;

/// How a stage's request body is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestEncoding {
    Multipart,
    Json,
    /// Plain GET with the artifact reference in the path.
    Path,
}

/// Every remote operation the orchestrator knows how to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    UploadVideo,
    UploadAudio,
    UploadText,
    ExtractAudio,
    TranscribeNative,
    TranscribeEnglish,
    SummarizeNative,
    SummarizeEnglish,
    TtsNative,
    TtsEnglish,
    FastNative,
    FastEnglish,
    YoutubeSubtitles,
    FileRetrieval,
}

impl Stage {
    pub const ALL: [Stage; 14] = [
        Stage::UploadVideo,
        Stage::UploadAudio,
        Stage::UploadText,
        Stage::ExtractAudio,
        Stage::TranscribeNative,
        Stage::TranscribeEnglish,
        Stage::SummarizeNative,
        Stage::SummarizeEnglish,
        Stage::TtsNative,
        Stage::TtsEnglish,
        Stage::FastNative,
        Stage::FastEnglish,
        Stage::YoutubeSubtitles,
        Stage::FileRetrieval,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::UploadVideo => "upload-video",
            Stage::UploadAudio => "upload-audio",
            Stage::UploadText => "upload-text",
            Stage::ExtractAudio => "extract-audio",
            Stage::TranscribeNative => "transcribe-native",
            Stage::TranscribeEnglish => "transcribe-english",
            Stage::SummarizeNative => "summarize-native",
            Stage::SummarizeEnglish => "summarize-english",
            Stage::TtsNative => "tts-native",
            Stage::TtsEnglish => "tts-english",
            Stage::FastNative => "fast-native",
            Stage::FastEnglish => "fast-english",
            Stage::YoutubeSubtitles => "youtube-subtitles",
            Stage::FileRetrieval => "file-retrieval",
        }
    }

    /// Path relative to the service base URL.
    pub fn endpoint(self) -> &'static str {
        match self {
            Stage::UploadVideo => "/upload-video",
            Stage::UploadAudio => "/upload-audio",
            Stage::UploadText => "/upload-text",
            Stage::ExtractAudio => "/extract-audio",
            Stage::TranscribeNative => "/transcribe-native",
            Stage::TranscribeEnglish => "/transcribe-english",
            Stage::SummarizeNative => "/summarize-native",
            Stage::SummarizeEnglish => "/summarize-english",
            Stage::TtsNative => "/tts-native",
            Stage::TtsEnglish => "/tts-english",
            Stage::FastNative => "/fast-native",
            Stage::FastEnglish => "/fast-english",
            Stage::YoutubeSubtitles => "/youtube-subtitles",
            Stage::FileRetrieval => "/files",
        }
    }

    pub fn encoding(self) -> RequestEncoding {
        match self {
            Stage::UploadVideo
            | Stage::UploadAudio
            | Stage::UploadText
            | Stage::SummarizeNative
            | Stage::SummarizeEnglish => RequestEncoding::Multipart,
            Stage::FileRetrieval => RequestEncoding::Path,
            _ => RequestEncoding::Json,
        }
    }

    /// Line recorded in the progress log when the stage is attempted.
    pub fn progress_message(self) -> &'static str {
        match self {
            Stage::UploadVideo => "Uploading video...",
            Stage::UploadAudio => "Uploading audio...",
            Stage::UploadText => "Uploading text...",
            Stage::ExtractAudio => "Extracting audio...",
            Stage::TranscribeNative => "Transcribing original...",
            Stage::TranscribeEnglish => "Transcribing English...",
            Stage::SummarizeNative => "Summarizing (native)...",
            Stage::SummarizeEnglish => "Summarizing (English)...",
            Stage::TtsNative => "Generating audio (native)...",
            Stage::TtsEnglish => "Generating audio (English)...",
            Stage::FastNative => "Creating fast audio (native)...",
            Stage::FastEnglish => "Creating fast audio (English)...",
            Stage::YoutubeSubtitles => "Fetching subtitles...",
            Stage::FileRetrieval => "Retrieving file...",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::{RequestEncoding, Stage};
    use std::collections::HashSet;

    #[test]
    fn names_and_endpoints_are_unique_and_aligned() {
        let names: HashSet<_> = Stage::ALL.iter().map(|stage| stage.name()).collect();
        let endpoints: HashSet<_> = Stage::ALL.iter().map(|stage| stage.endpoint()).collect();
        assert_eq!(names.len(), Stage::ALL.len());
        assert_eq!(endpoints.len(), Stage::ALL.len());

        for stage in Stage::ALL {
            if stage != Stage::FileRetrieval {
                assert_eq!(stage.endpoint(), format!("/{}", stage.name()));
            }
        }
    }

    #[test]
    fn serde_name_matches_wire_name() {
        for stage in Stage::ALL {
            let value = serde_json::to_value(stage).expect("serialize");
            assert_eq!(value.as_str(), Some(stage.name()));
        }
    }

    #[test]
    fn uploads_and_summaries_are_multipart() {
        assert_eq!(Stage::UploadVideo.encoding(), RequestEncoding::Multipart);
        assert_eq!(Stage::SummarizeEnglish.encoding(), RequestEncoding::Multipart);
        assert_eq!(Stage::TtsNative.encoding(), RequestEncoding::Json);
        assert_eq!(Stage::YoutubeSubtitles.encoding(), RequestEncoding::Json);
        assert_eq!(Stage::FileRetrieval.encoding(), RequestEncoding::Path);
    }
}
