//! Run Coordinator.
//!
//! Owns the single live run. Every run is stamped with a fresh id and a
//! cancellation token; continuations of a run that was reset or replaced
//! find their id no longer current and leave the session untouched.

pub mod events;
pub mod state;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::Sender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::{OverlapPolicy, PipelineConfig};
use crate::controller::events::RunEvent;
use crate::controller::state::{RunSnapshot, RunStatus};
use crate::error::{AppError, AppResult, RunError};
use crate::pipeline::{
    assemble, validate_source, Executor, InputType, Mode, PipelineDefinition, ProgressEntry,
    ProgressLog, ProgressSink, ResultBundle, SourceMaterial,
};
use crate::stage::{Stage, StageInvoker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoordinatorOptions {
    pub parallel_branches: bool,
    pub overlap_policy: OverlapPolicy,
}

impl From<&PipelineConfig> for CoordinatorOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            parallel_branches: config.parallel_branches,
            overlap_policy: config.overlap_policy,
        }
    }
}

/// How a run ended, from the point of view of the caller that started it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(ResultBundle),
    /// The terminal log line.
    Failed(String),
    /// Reset or replaced by a newer run before it finished.
    Superseded,
}

#[derive(Debug)]
struct Session {
    run_id: Option<Uuid>,
    input_type: Option<InputType>,
    mode: Mode,
    status: RunStatus,
    log: ProgressLog,
    result: Option<ResultBundle>,
    cancel: CancellationToken,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            run_id: None,
            input_type: None,
            mode: Mode::default(),
            status: RunStatus::Idle,
            log: ProgressLog::default(),
            result: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl Session {
    fn is_current(&self, run_id: Uuid) -> bool {
        self.run_id == Some(run_id)
    }

    fn processing(&self) -> bool {
        self.status == RunStatus::Processing
    }
}

#[derive(Debug, Clone)]
struct ActiveRun {
    id: Uuid,
    input_type: InputType,
    mode: Mode,
    cancel: CancellationToken,
}

#[derive(Clone)]
pub struct RunCoordinator {
    invoker: Arc<dyn StageInvoker>,
    options: CoordinatorOptions,
    session: Arc<Mutex<Session>>,
    events: Option<Sender<RunEvent>>,
}

impl RunCoordinator {
    pub fn new(invoker: Arc<dyn StageInvoker>, options: CoordinatorOptions) -> Self {
        Self {
            invoker,
            options,
            session: Arc::new(Mutex::new(Session::default())),
            events: None,
        }
    }

    pub fn with_events(mut self, events: Sender<RunEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Starts a run and drives it to its end on the caller's task.
    ///
    /// Only a rejected overlap is an `Err`; every run-level failure is
    /// reported through the log and [`RunOutcome::Failed`].
    pub async fn start_entry_pipeline(
        &self,
        input_type: InputType,
        mode: Mode,
        source: SourceMaterial,
    ) -> AppResult<RunOutcome> {
        let source = match self.precheck(input_type, source) {
            Ok(source) => source,
            Err(outcome) => return Ok(outcome),
        };
        let run = self.begin(input_type, mode)?;
        Ok(self.drive(run, source).await)
    }

    /// Like [`Self::start_entry_pipeline`], but the run state is reset
    /// before this returns and the stages execute on a tokio task.
    pub fn spawn_entry_pipeline(
        &self,
        input_type: InputType,
        mode: Mode,
        source: SourceMaterial,
    ) -> JoinHandle<AppResult<RunOutcome>> {
        let source = match self.precheck(input_type, source) {
            Ok(source) => source,
            Err(outcome) => return tokio::spawn(async move { Ok(outcome) }),
        };
        match self.begin(input_type, mode) {
            Ok(run) => {
                let coordinator = self.clone();
                tokio::spawn(async move { Ok(coordinator.drive(run, source).await) })
            }
            Err(error) => tokio::spawn(async move { Err(error) }),
        }
    }

    pub fn get_log(&self) -> Vec<ProgressEntry> {
        self.session().log.entries().to_vec()
    }

    pub fn get_result(&self) -> Option<ResultBundle> {
        self.session().result.clone()
    }

    pub fn is_processing(&self) -> bool {
        self.session().processing()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let session = self.session();
        RunSnapshot {
            run_id: session.run_id,
            input_type: session.input_type,
            mode: session.mode,
            status: session.status.clone(),
            processing: session.processing(),
            log: session.log.entries().to_vec(),
            result: session.result.clone(),
        }
    }

    /// Clears the log and result and cancels any in-flight stage call.
    pub fn reset(&self) {
        let mut session = self.session();
        session.cancel.cancel();
        if let Some(run_id) = session.run_id {
            tracing::info!(%run_id, "run reset");
        }
        let mode = session.mode;
        *session = Session {
            mode,
            ..Session::default()
        };
        self.emit(RunEvent::Reset);
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: RunEvent) {
        if let Some(events) = &self.events {
            if events.send(event).is_err() {
                tracing::debug!("run event receiver dropped");
            }
        }
    }

    /// A YouTube link is checked before any state is touched: a bad link is
    /// noted in the current log and leaves the previous run and result alone.
    fn precheck(
        &self,
        input_type: InputType,
        source: SourceMaterial,
    ) -> Result<SourceMaterial, RunOutcome> {
        if input_type != InputType::Youtube {
            return Ok(source);
        }
        validate_source(input_type, source).map_err(|error| {
            let message = error.terminal_message(input_type.error_prefix());
            let entry = self.session().log.record(message.clone());
            tracing::warn!("{}", entry.message);
            // No run was started, so the events carry the nil id.
            self.emit(RunEvent::Progress {
                run_id: Uuid::nil(),
                entry,
            });
            self.emit(RunEvent::Failed {
                run_id: Uuid::nil(),
                message: message.clone(),
            });
            RunOutcome::Failed(message)
        })
    }

    fn begin(&self, input_type: InputType, mode: Mode) -> AppResult<ActiveRun> {
        let mut session = self.session();
        if session.processing() {
            match self.options.overlap_policy {
                OverlapPolicy::Reject => {
                    return Err(AppError::Controller(
                        "a run is already processing; reset it first".to_owned(),
                    ))
                }
                OverlapPolicy::Supersede => {
                    if let Some(previous) = session.run_id {
                        tracing::info!(run_id = %previous, "superseding in-flight run");
                    }
                }
            }
        }
        session.cancel.cancel();

        let run = ActiveRun {
            id: Uuid::new_v4(),
            input_type,
            mode,
            cancel: CancellationToken::new(),
        };
        *session = Session {
            run_id: Some(run.id),
            input_type: Some(input_type),
            mode,
            status: RunStatus::Processing,
            log: ProgressLog::default(),
            result: None,
            cancel: run.cancel.clone(),
        };
        tracing::info!(run_id = %run.id, input = input_type.label(), mode = mode.label(), "run started");
        self.emit(RunEvent::Started {
            run_id: run.id,
            input_type,
            mode,
        });
        Ok(run)
    }

    async fn drive(&self, run: ActiveRun, source: SourceMaterial) -> RunOutcome {
        let outcome = self.execute(&run, source).await;
        match outcome {
            Ok(bundle) => self.complete(&run, bundle),
            Err(error) => self.fail(&run, &error),
        }
    }

    async fn execute(
        &self,
        run: &ActiveRun,
        source: SourceMaterial,
    ) -> Result<ResultBundle, RunError> {
        let source = validate_source(run.input_type, source)?;
        let definition = PipelineDefinition::for_run(run.input_type, run.mode);
        let sink = RunProgress {
            coordinator: self,
            run_id: run.id,
        };

        let bag = Executor::new(self.invoker.as_ref(), &run.cancel)
            .with_parallel_branches(self.options.parallel_branches)
            .execute(&definition, &source, &sink)
            .await?;
        assemble(run.mode, &bag)
    }

    /// Appends to the live log unless `run_id` is stale.
    fn record(&self, run_id: Uuid, message: &str) -> Result<(), RunError> {
        let mut session = self.session();
        if !session.is_current(run_id) {
            return Err(RunError::Cancelled);
        }
        let entry = session.log.record(message);
        tracing::debug!(%run_id, "{}", entry.message);
        self.emit(RunEvent::Progress { run_id, entry });
        Ok(())
    }

    fn complete(&self, run: &ActiveRun, bundle: ResultBundle) -> RunOutcome {
        let mut session = self.session();
        if !session.is_current(run.id) {
            return RunOutcome::Superseded;
        }
        session.result = Some(bundle.clone());
        session.status = RunStatus::Succeeded;
        tracing::info!(run_id = %run.id, "run completed");
        self.emit(RunEvent::Completed {
            run_id: run.id,
            result: bundle.clone(),
        });
        RunOutcome::Completed(bundle)
    }

    fn fail(&self, run: &ActiveRun, error: &RunError) -> RunOutcome {
        let mut session = self.session();
        if !session.is_current(run.id) {
            tracing::debug!(run_id = %run.id, %error, "dropping outcome of stale run");
            return RunOutcome::Superseded;
        }
        let message = error.terminal_message(run.input_type.error_prefix());
        let entry = session.log.record(message.clone());
        session.status = RunStatus::Failed(message.clone());
        tracing::warn!(run_id = %run.id, "{}", entry.message);
        self.emit(RunEvent::Progress {
            run_id: run.id,
            entry,
        });
        self.emit(RunEvent::Failed {
            run_id: run.id,
            message: message.clone(),
        });
        RunOutcome::Failed(message)
    }
}

struct RunProgress<'a> {
    coordinator: &'a RunCoordinator,
    run_id: Uuid,
}

impl ProgressSink for RunProgress<'_> {
    fn stage_started(&self, stage: Stage) -> Result<(), RunError> {
        self.coordinator
            .record(self.run_id, stage.progress_message())
    }
}
