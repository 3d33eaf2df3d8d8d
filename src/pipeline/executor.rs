use tokio_util::sync::CancellationToken;

use crate::error::RunError;
use crate::pipeline::artifacts::ArtifactBag;
use crate::pipeline::definitions::{input_of, PipelineDefinition, StageInput, Step};
use crate::pipeline::input::SourceMaterial;
use crate::stage::{invoke_stage, Stage, StageInvoker, StageRequest};

/// Told about every stage start before the stage's request is sent.
///
/// Returning `Err` (normally [`RunError::Cancelled`]) stops the run before
/// the stage is attempted.
pub trait ProgressSink: Send + Sync {
    fn stage_started(&self, stage: Stage) -> Result<(), RunError>;
}

/// Walks a [`PipelineDefinition`] and threads each stage's output into the
/// stages that consume it. Stops at the first error.
pub struct Executor<'a> {
    invoker: &'a dyn StageInvoker,
    cancel: &'a CancellationToken,
    parallel_branches: bool,
}

impl<'a> Executor<'a> {
    pub fn new(invoker: &'a dyn StageInvoker, cancel: &'a CancellationToken) -> Self {
        Self {
            invoker,
            cancel,
            parallel_branches: false,
        }
    }

    /// Run native/English pairs concurrently and join before the next step.
    pub fn with_parallel_branches(mut self, enabled: bool) -> Self {
        self.parallel_branches = enabled;
        self
    }

    pub async fn execute(
        &self,
        definition: &PipelineDefinition,
        source: &SourceMaterial,
        progress: &dyn ProgressSink,
    ) -> Result<ArtifactBag, RunError> {
        definition.check_bindings()?;

        let mut bag = ArtifactBag::default();
        for step in &definition.steps {
            if self.cancel.is_cancelled() {
                return Err(RunError::Cancelled);
            }
            match *step {
                Step::Branches { native, english } if self.parallel_branches => {
                    self.run_branches(native, english, source, &mut bag, progress)
                        .await?
                }
                _ => {
                    for stage in step.stages() {
                        self.run_stage(stage, source, &mut bag, progress).await?;
                    }
                }
            }
        }
        Ok(bag)
    }

    async fn run_stage(
        &self,
        stage: Stage,
        source: &SourceMaterial,
        bag: &mut ArtifactBag,
        progress: &dyn ProgressSink,
    ) -> Result<(), RunError> {
        progress.stage_started(stage)?;
        let request = request_for(stage, source, bag).await?;
        let output = invoke_stage(self.invoker, stage, request, self.cancel).await?;
        bag.absorb(stage, output)
    }

    async fn run_branches(
        &self,
        native: Stage,
        english: Stage,
        source: &SourceMaterial,
        bag: &mut ArtifactBag,
        progress: &dyn ProgressSink,
    ) -> Result<(), RunError> {
        progress.stage_started(native)?;
        progress.stage_started(english)?;
        let native_request = request_for(native, source, bag).await?;
        let english_request = request_for(english, source, bag).await?;

        let (native_output, english_output) = tokio::join!(
            invoke_stage(self.invoker, native, native_request, self.cancel),
            invoke_stage(self.invoker, english, english_request, self.cancel),
        );

        // Report failures in declared order, native first.
        let native_output = native_output?;
        let english_output = english_output?;
        bag.absorb(native, native_output)?;
        bag.absorb(english, english_output)
    }
}

async fn request_for(
    stage: Stage,
    source: &SourceMaterial,
    bag: &ArtifactBag,
) -> Result<StageRequest, RunError> {
    match input_of(stage) {
        StageInput::Source => source.to_request(stage).await,
        StageInput::Artifact(slot) => StageRequest::for_reference(stage, bag.require(slot)?),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::{Executor, ProgressSink};
    use crate::error::{RunError, StageFailure};
    use crate::pipeline::artifacts::Slot;
    use crate::pipeline::definitions::PipelineDefinition;
    use crate::pipeline::input::{InputType, Mode, SourceMaterial};
    use crate::stage::{Stage, StageInvoker, StageReply, StageRequest};
    use async_trait::async_trait;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct EchoInvoker {
        calls: Mutex<Vec<(Stage, StageRequest)>>,
        fail_at: Option<Stage>,
    }

    #[async_trait]
    impl StageInvoker for EchoInvoker {
        async fn invoke(&self, stage: Stage, request: StageRequest) -> Result<StageReply, StageFailure> {
            self.calls
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push((stage, request));
            if self.fail_at == Some(stage) {
                return Err(StageFailure::status(stage, 500, "Internal Server Error"));
            }
            let name = stage.name();
            let body = match stage {
                Stage::UploadText => json!({ "text_file": "uploads/pasted.txt" }),
                Stage::SummarizeNative | Stage::SummarizeEnglish => {
                    json!({ "summary": format!("{name} text"), "summary_file": format!("{name}.txt") })
                }
                Stage::TtsNative | Stage::TtsEnglish => json!({ "audio_file": format!("{name}.mp3") }),
                Stage::FastNative | Stage::FastEnglish => {
                    json!({ "fast_audio_file": format!("{name}.mp3") })
                }
                _ => json!({}),
            };
            Ok(body.into())
        }

        async fn fetch_artifact(&self, _reference: &str) -> Result<Vec<u8>, StageFailure> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        started: Mutex<Vec<Stage>>,
    }

    impl ProgressSink for RecordingSink {
        fn stage_started(&self, stage: Stage) -> Result<(), RunError> {
            self.started
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(stage);
            Ok(())
        }
    }

    struct StaleSink;

    impl ProgressSink for StaleSink {
        fn stage_started(&self, _stage: Stage) -> Result<(), RunError> {
            Err(RunError::Cancelled)
        }
    }

    fn pasted() -> SourceMaterial {
        SourceMaterial::PastedText("hello world".to_owned())
    }

    #[tokio::test]
    async fn outputs_feed_the_stages_that_consume_them() {
        let invoker = EchoInvoker::default();
        let cancel = CancellationToken::new();
        let sink = RecordingSink::default();
        let definition = PipelineDefinition::for_run(InputType::Text, Mode::Full);

        let bag = Executor::new(&invoker, &cancel)
            .execute(&definition, &pasted(), &sink)
            .await
            .expect("run");

        assert_eq!(bag.get(Slot::FastAudioEnglish), Some("fast-english.mp3"));
        let calls = invoker.calls.lock().expect("calls");
        let tts_english = calls
            .iter()
            .find(|(stage, _)| *stage == Stage::TtsEnglish)
            .map(|(_, request)| request.clone());
        assert_eq!(
            tts_english,
            Some(StageRequest::Json(json!({ "summary_file": "summarize-english.txt" })))
        );
        let summarize = calls
            .iter()
            .find(|(stage, _)| *stage == Stage::SummarizeNative)
            .map(|(_, request)| request.clone());
        assert_eq!(
            summarize,
            Some(StageRequest::Form(vec![("text_file", "uploads/pasted.txt".to_owned())]))
        );
        assert_eq!(*sink.started.lock().expect("started"), definition.stage_sequence());
    }

    #[tokio::test]
    async fn parallel_branches_keep_declared_start_order_and_outputs() {
        let invoker = EchoInvoker::default();
        let cancel = CancellationToken::new();
        let sink = RecordingSink::default();
        let definition = PipelineDefinition::for_run(InputType::Text, Mode::Full);

        let bag = Executor::new(&invoker, &cancel)
            .with_parallel_branches(true)
            .execute(&definition, &pasted(), &sink)
            .await
            .expect("run");

        assert_eq!(*sink.started.lock().expect("started"), definition.stage_sequence());
        assert_eq!(bag.get(Slot::AudioNative), Some("tts-native.mp3"));
        assert_eq!(invoker.calls.lock().expect("calls").len(), 7);
    }

    #[tokio::test]
    async fn first_failure_stops_the_run() {
        let invoker = EchoInvoker {
            fail_at: Some(Stage::SummarizeNative),
            ..EchoInvoker::default()
        };
        let cancel = CancellationToken::new();
        let sink = RecordingSink::default();
        let definition = PipelineDefinition::for_run(InputType::Text, Mode::Full);

        let error = Executor::new(&invoker, &cancel)
            .execute(&definition, &pasted(), &sink)
            .await
            .expect_err("failure");

        assert!(matches!(error, RunError::Stage(failure) if failure.stage == Stage::SummarizeNative));
        assert_eq!(
            *sink.started.lock().expect("started"),
            vec![Stage::UploadText, Stage::SummarizeNative]
        );
    }

    #[tokio::test]
    async fn stale_sink_prevents_any_call() {
        let invoker = EchoInvoker::default();
        let cancel = CancellationToken::new();
        let definition = PipelineDefinition::for_run(InputType::Text, Mode::Fast);

        let error = Executor::new(&invoker, &cancel)
            .execute(&definition, &pasted(), &StaleSink)
            .await
            .expect_err("stale");

        assert_eq!(error, RunError::Cancelled);
        assert!(invoker.calls.lock().expect("calls").is_empty());
    }
}
