use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Receiver;

use crate::bootstrap::AppPaths;
use crate::config::{AppConfig, OutputFormat};
use crate::controller::events::RunEvent;
use crate::controller::{CoordinatorOptions, RunCoordinator, RunOutcome};
use crate::doctor::{run_doctor, DoctorReport};
use crate::error::{AppError, AppResult};
use crate::output::{artifact_file_name, fetch_to, save_audio, save_texts};
use crate::pipeline::{InputType, ResultBundle, SourceMaterial};
use crate::runtime::topology::RuntimeTopology;
use crate::stage::{BackendProbe, HttpStageInvoker};

/// One entry pipeline as requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRequest {
    pub input_type: InputType,
    pub source: SourceMaterial,
    pub download: bool,
}

fn build_runtime() -> AppResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("media-digest-worker")
        .build()
        .map_err(AppError::from)
}

/// Runs one entry pipeline to its end and prints the result bundle to stdout.
///
/// Progress lines go to stderr as they are recorded. Ctrl-C resets the run,
/// which cancels the in-flight stage call.
pub fn run_entry(config: &AppConfig, request: EntryRequest) -> AppResult<()> {
    let runtime = build_runtime()?;
    let invoker = Arc::new(HttpStageInvoker::new(&config.service)?);

    let RuntimeTopology {
        run_event_tx,
        run_event_rx,
    } = RuntimeTopology::new();
    let coordinator = RunCoordinator::new(
        invoker.clone(),
        CoordinatorOptions::from(&config.pipeline),
    )
    .with_events(run_event_tx);

    let printer = spawn_progress_printer(run_event_rx)?;

    let interrupt = coordinator.clone();
    ctrlc::set_handler(move || interrupt.reset())
        .map_err(|error| AppError::Controller(format!("failed to register ctrl-c handler: {error}")))?;

    let outcome = runtime.block_on(coordinator.start_entry_pipeline(
        request.input_type,
        config.pipeline.mode,
        request.source,
    ))?;
    printer
        .join()
        .map_err(|_| AppError::Controller("progress printer panicked".to_owned()))?;

    let bundle = match outcome {
        RunOutcome::Completed(bundle) => bundle,
        RunOutcome::Failed(message) => return Err(AppError::Run(message)),
        RunOutcome::Superseded => {
            return Err(AppError::Run("run was reset before it finished".to_owned()))
        }
    };

    println!("{}", render_result(&bundle, config.output.format)?);

    if request.download {
        let dir = download_dir(config)?;
        let mut saved = runtime.block_on(save_texts(&dir, &bundle))?;
        if config.output.download_audio {
            saved.extend(runtime.block_on(save_audio(invoker.as_ref(), &dir, &bundle))?);
        }
        for path in saved {
            eprintln!("saved {}", path.display());
        }
    }

    Ok(())
}

/// Prints progress until the run reaches a terminal event.
fn spawn_progress_printer(events: Receiver<RunEvent>) -> AppResult<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("media-digest-progress".to_owned())
        .spawn(move || {
            while let Ok(event) = events.recv() {
                match event {
                    RunEvent::Progress { entry, .. } => eprintln!("{entry}"),
                    RunEvent::Started { run_id, .. } => {
                        tracing::debug!(%run_id, "progress printer attached");
                    }
                    RunEvent::Completed { .. } | RunEvent::Failed { .. } | RunEvent::Reset => break,
                }
            }
        })
        .map_err(|error| AppError::Controller(format!("failed to spawn progress printer: {error}")))
}

pub fn render_result(bundle: &ResultBundle, format: OutputFormat) -> AppResult<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(bundle)?);
    }

    let mut out = String::new();
    let sections = [
        ("Transcription (native)", bundle.transcription_native.as_str()),
        ("Transcription (English)", bundle.transcription_english.as_str()),
        ("Summary (native)", bundle.summary_native.as_str()),
        ("Summary (English)", bundle.summary_english.as_str()),
    ];
    for (title, text) in sections {
        if text.is_empty() {
            continue;
        }
        out.push_str(&format!("== {title} ==\n{text}\n\n"));
    }
    for (field, reference) in bundle.audio_references() {
        out.push_str(&format!("{field}: {reference}\n"));
    }
    Ok(out.trim_end().to_owned())
}

fn download_dir(config: &AppConfig) -> AppResult<PathBuf> {
    config
        .output
        .download_dir
        .clone()
        .ok_or_else(|| AppError::Config("output.download_dir is not set".to_owned()))
}

/// Retrieves one artifact and returns where it was written.
pub fn fetch_artifact(
    config: &AppConfig,
    reference: &str,
    out: Option<PathBuf>,
) -> AppResult<PathBuf> {
    let runtime = build_runtime()?;
    let invoker = HttpStageInvoker::new(&config.service)?;
    let target = match out {
        Some(path) => path,
        None => download_dir(config)?.join(artifact_file_name(reference, "artifact.bin")),
    };
    runtime.block_on(fetch_to(&invoker, reference, &target))
}

pub fn doctor_report(config: &AppConfig) -> AppResult<DoctorReport> {
    let runtime = build_runtime()?;
    let invoker = match HttpStageInvoker::new(&config.service) {
        Ok(invoker) => Some(invoker),
        Err(error) => {
            tracing::warn!("backend probe skipped: {error}");
            None
        }
    };
    let probe = invoker.as_ref().map(|invoker| invoker as &dyn BackendProbe);
    Ok(runtime.block_on(run_doctor(config, probe)))
}

pub fn status_report(config: &AppConfig, paths: &AppPaths) -> AppResult<String> {
    let download_dir = config
        .output
        .download_dir
        .clone()
        .unwrap_or_else(|| paths.downloads_dir.clone());

    let mut output = String::new();
    output.push_str("media-digest status\n");
    output.push_str(&format!("  config: {}\n", paths.config_file.display()));
    output.push_str(&format!("  service: {}\n", config.service.base_url));
    output.push_str(&format!(
        "  credential: {}\n",
        if config.service.api_key.is_some() {
            format!("configured ({})", config.service.credential_header)
        } else {
            "not configured".to_owned()
        }
    ));
    output.push_str(&format!(
        "  request_timeout: {}\n",
        config
            .service
            .request_timeout_seconds
            .map(|seconds| format!("{seconds}s"))
            .unwrap_or_else(|| "none".to_owned())
    ));
    output.push_str(&format!("  mode: {}\n", config.pipeline.mode.label()));
    output.push_str(&format!(
        "  parallel_branches: {}\n",
        config.pipeline.parallel_branches
    ));
    output.push_str(&format!(
        "  overlap_policy: {}\n",
        config.pipeline.overlap_policy.label()
    ));
    output.push_str(&format!("  download_dir: {}\n", download_dir.display()));

    Ok(output)
}
