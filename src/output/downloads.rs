use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::pipeline::ResultBundle;
use crate::stage::StageInvoker;

/// Local file name for an artifact reference: its last path component.
pub fn artifact_file_name(reference: &str, fallback: &str) -> String {
    reference
        .rsplit(['/', '\\'])
        .find(|part| !part.is_empty() && *part != "." && *part != "..")
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| fallback.to_owned())
}

/// Writes the non-empty text fields of a bundle as `<field>.txt`.
pub async fn save_texts(dir: &Path, bundle: &ResultBundle) -> AppResult<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir).await?;
    let mut written = Vec::new();
    for (stem, text) in bundle.texts() {
        if text.is_empty() {
            continue;
        }
        let path = dir.join(format!("{stem}.txt"));
        tokio::fs::write(&path, text).await?;
        written.push(path);
    }
    Ok(written)
}

/// Fetches every audio artifact of a full-mode bundle into `dir`.
pub async fn save_audio(
    invoker: &dyn StageInvoker,
    dir: &Path,
    bundle: &ResultBundle,
) -> AppResult<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (field, reference) in bundle.audio_references() {
        let target = dir.join(artifact_file_name(reference, &format!("{field}.mp3")));
        written.push(fetch_to(invoker, reference, &target).await?);
    }
    Ok(written)
}

pub async fn fetch_to(
    invoker: &dyn StageInvoker,
    reference: &str,
    target: &Path,
) -> AppResult<PathBuf> {
    let bytes = invoker
        .fetch_artifact(reference)
        .await
        .map_err(|failure| AppError::Retrieval(failure.to_string()))?;
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(target, &bytes).await?;
    tracing::debug!(reference, target = %target.display(), bytes = bytes.len(), "artifact saved");
    Ok(target.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::{artifact_file_name, save_audio, save_texts};
    use crate::error::{AppError, StageFailure};
    use crate::pipeline::{publish, Bilingual, Mode};
    use crate::stage::{Stage, StageInvoker, StageReply, StageRequest};
    use async_trait::async_trait;

    struct Artifacts {
        missing: Option<&'static str>,
    }

    #[async_trait]
    impl StageInvoker for Artifacts {
        async fn invoke(&self, stage: Stage, _request: StageRequest) -> Result<StageReply, StageFailure> {
            Err(StageFailure::transport(stage, "not used"))
        }

        async fn fetch_artifact(&self, reference: &str) -> Result<Vec<u8>, StageFailure> {
            if self.missing == Some(reference) {
                return Err(StageFailure::status(Stage::FileRetrieval, 404, "Not Found"));
            }
            Ok(reference.as_bytes().to_vec())
        }
    }

    fn pair(native: &str, english: &str) -> Bilingual<String> {
        Bilingual::new(native.to_owned(), english.to_owned())
    }

    #[test]
    fn file_names_come_from_the_last_segment() {
        assert_eq!(artifact_file_name("outputs/tts_native.mp3", "x"), "tts_native.mp3");
        assert_eq!(artifact_file_name("outputs\\win.mp3", "x"), "win.mp3");
        assert_eq!(artifact_file_name("plain.mp3", "x"), "plain.mp3");
        assert_eq!(artifact_file_name("outputs/..", "audio.mp3"), "outputs");
        assert_eq!(artifact_file_name("/", "audio.mp3"), "audio.mp3");
    }

    #[tokio::test]
    async fn texts_skip_empty_transcriptions() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let bundle = publish(Mode::Fast, pair("", ""), pair("corto", "short"), None, None);

        let written = save_texts(tmp.path(), &bundle).await.expect("save");
        assert_eq!(written.len(), 2);
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("summary_english.txt")).expect("read"),
            "short"
        );
        assert!(!tmp.path().join("transcription_native.txt").exists());
    }

    #[tokio::test]
    async fn audio_is_fetched_per_reference() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let bundle = publish(
            Mode::Full,
            pair("hola", "hello"),
            pair("corto", "short"),
            Some(pair("outputs/n.mp3", "outputs/e.mp3")),
            Some(pair("outputs/fast_n.mp3", "outputs/fast_e.mp3")),
        );

        let written = save_audio(&Artifacts { missing: None }, tmp.path(), &bundle)
            .await
            .expect("audio");
        assert_eq!(written.len(), 4);
        assert_eq!(
            std::fs::read(tmp.path().join("fast_e.mp3")).expect("read"),
            b"outputs/fast_e.mp3"
        );

        let error = save_audio(
            &Artifacts {
                missing: Some("outputs/e.mp3"),
            },
            tmp.path(),
            &bundle,
        )
        .await
        .expect_err("404");
        assert!(matches!(error, AppError::Retrieval(message) if message.contains("404")));
    }
}
