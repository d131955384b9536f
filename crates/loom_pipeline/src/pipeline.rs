//! The recompile pipeline actor and its handle.
//!
//! All pipeline state lives in a single tokio task. Buffer notifications,
//! bus events and handle requests arrive over channels and are handled one at
//! a time, so a state change is never interleaved with another input. The
//! only suspension points are the debounce deadline and the in-flight
//! compiler future, both polled from the same `select!` loop.

use std::any::Any;
use std::future::pending;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use loom_cache::{CompilerOutputCache, ResolvedOutput};
use loom_events::{EventBus, LoomEvent, WorldSummary};
use loom_output::CompilerOutput;
use loom_source::{is_source_path, BufferMap, Subscription};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::compiler::{CompileRequest, Compiler};
use crate::config::PipelineConfig;
use crate::error::{CompileError, PipelineError};
use crate::state::{PipelineState, Schedule, Trigger};

/// Result of [`RecompilePipeline::compile_now`].
#[derive(Debug, Clone)]
pub enum CompileOutcome {
    /// There were no buffers; the compiler was not called.
    Skipped,
    /// The compile succeeded and its output was resolved.
    Completed {
        /// Id of the compile.
        compile_id: u64,
        /// The resolved output.
        output: Arc<ResolvedOutput>,
    },
    /// The compiler call failed. The cache was not touched.
    Failed {
        /// Id of the compile.
        compile_id: u64,
        /// Description of the failure.
        error: String,
    },
}

impl CompileOutcome {
    /// Id of the compile, unless it was skipped.
    pub fn compile_id(&self) -> Option<u64> {
        match self {
            CompileOutcome::Skipped => None,
            CompileOutcome::Completed { compile_id, .. }
            | CompileOutcome::Failed { compile_id, .. } => Some(*compile_id),
        }
    }

    /// The resolved output of a successful compile.
    pub fn output(&self) -> Option<&Arc<ResolvedOutput>> {
        match self {
            CompileOutcome::Completed { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Snapshot of the pipeline's scheduling state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStatus {
    /// Current state.
    pub state: PipelineState,
    /// Whether a follow-up compile is owed.
    pub pending_recompile: bool,
    /// Id of the most recently started compile.
    pub last_compile_id: Option<u64>,
    /// Most recent recognized active file.
    pub active_file: Option<PathBuf>,
    /// Whether [`RecompilePipeline::stop`] has been called.
    pub stopped: bool,
}

enum Command {
    BufferChanged(PathBuf),
    CompileNow(oneshot::Sender<CompileOutcome>),
    Stop,
    Status(oneshot::Sender<PipelineStatus>),
    CacheSize(oneshot::Sender<usize>),
    ClearCache(oneshot::Sender<()>),
}

/// Handle to a running recompile pipeline.
///
/// Dropping the handle unsubscribes from the buffer map; the task then exits
/// once any in-flight compile has finished. Use [`shutdown`](Self::shutdown)
/// to wait for that.
pub struct RecompilePipeline {
    commands: mpsc::UnboundedSender<Command>,
    subscription: Mutex<Option<Subscription>>,
    resolved: watch::Receiver<Option<Arc<ResolvedOutput>>>,
    task: JoinHandle<()>,
}

impl RecompilePipeline {
    /// Spawns the pipeline on the current tokio runtime.
    ///
    /// Subscribes to `buffers` and to `bus` before returning, so no change
    /// made after `start` is missed.
    pub fn start(
        buffers: Arc<BufferMap>,
        compiler: Arc<dyn Compiler>,
        cache: CompilerOutputCache,
        bus: EventBus,
        config: PipelineConfig,
    ) -> Self {
        let (commands, inbox) = mpsc::unbounded_channel();
        let notify = commands.clone();
        let subscription = buffers.subscribe(move |path| {
            let _ = notify.send(Command::BufferChanged(path.to_path_buf()));
        });
        let (resolved_tx, resolved) = watch::channel(None);

        debug!(
            debounce_ms = config.debounce.as_millis() as u64,
            buffers = buffers.len(),
            "starting recompile pipeline"
        );

        let actor = Actor {
            inbox,
            inbox_open: true,
            bus_events: Some(bus.subscribe_editor()),
            buffers,
            compiler,
            cache,
            bus,
            config,
            schedule: Schedule::new(),
            deadline: None,
            in_flight: None,
            waiters: Vec::new(),
            queued: Vec::new(),
            last_compile_id: 0,
            active_file: None,
            resolved: resolved_tx,
            stopped: false,
        };

        Self {
            commands,
            subscription: Mutex::new(Some(subscription)),
            resolved,
            task: tokio::spawn(actor.run()),
        }
    }

    /// Cancels any pending debounce and compiles immediately, returning the
    /// outcome.
    ///
    /// If a compile is already in flight, this waits for it and then runs one
    /// more compile without debouncing; the outcome is that second compile's.
    pub async fn compile_now(&self) -> Result<CompileOutcome, PipelineError> {
        self.request(Command::CompileNow).await
    }

    /// Cancels a not-yet-fired debounce and stops listening for changes.
    ///
    /// A compile already in flight runs to completion and its result is still
    /// applied. Explicit [`compile_now`](Self::compile_now) calls keep working.
    pub fn stop(&self) {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        let _ = self.commands.send(Command::Stop);
    }

    /// Returns the current scheduling state.
    pub async fn status(&self) -> Result<PipelineStatus, PipelineError> {
        self.request(Command::Status).await
    }

    /// Number of distinct chunk names held by the cache.
    pub async fn cache_size(&self) -> Result<usize, PipelineError> {
        self.request(Command::CacheSize).await
    }

    /// Wipes the cache.
    pub async fn clear_cache(&self) -> Result<(), PipelineError> {
        self.request(Command::ClearCache).await
    }

    /// Watches the most recent successfully resolved output.
    pub fn resolved(&self) -> watch::Receiver<Option<Arc<ResolvedOutput>>> {
        self.resolved.clone()
    }

    /// Stops the pipeline and waits for its task to exit.
    pub async fn shutdown(self) {
        let Self {
            commands,
            subscription,
            task,
            ..
        } = self;
        drop(subscription);
        drop(commands);
        if let Err(err) = task.await {
            tracing::error!(error = %err, "recompile pipeline task failed");
        }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, PipelineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| PipelineError::Closed)?;
        response.await.map_err(|_| PipelineError::Closed)
    }
}

impl std::fmt::Debug for RecompilePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecompilePipeline")
            .field("finished", &self.task.is_finished())
            .finish_non_exhaustive()
    }
}

type CompileFuture = BoxFuture<'static, Result<CompilerOutput, CompileError>>;

struct InFlight {
    compile_id: u64,
    started: Instant,
    future: CompileFuture,
}

enum Wake {
    Command(Option<Command>),
    Deadline,
    Finished(Result<CompilerOutput, CompileError>),
    Bus(Result<LoomEvent, RecvError>),
}

struct Actor {
    inbox: mpsc::UnboundedReceiver<Command>,
    inbox_open: bool,
    bus_events: Option<broadcast::Receiver<LoomEvent>>,
    buffers: Arc<BufferMap>,
    compiler: Arc<dyn Compiler>,
    cache: CompilerOutputCache,
    bus: EventBus,
    config: PipelineConfig,
    schedule: Schedule,
    deadline: Option<Instant>,
    in_flight: Option<InFlight>,
    /// Callers waiting on the in-flight compile.
    waiters: Vec<oneshot::Sender<CompileOutcome>>,
    /// Callers waiting on the compile after the in-flight one.
    queued: Vec<oneshot::Sender<CompileOutcome>>,
    last_compile_id: u64,
    active_file: Option<PathBuf>,
    resolved: watch::Sender<Option<Arc<ResolvedOutput>>>,
    stopped: bool,
}

impl Actor {
    async fn run(mut self) {
        while self.inbox_open || self.in_flight.is_some() {
            let wake = tokio::select! {
                command = self.inbox.recv(), if self.inbox_open => Wake::Command(command),
                () = deadline_elapsed(self.deadline) => Wake::Deadline,
                result = in_flight_result(&mut self.in_flight) => Wake::Finished(result),
                event = next_bus_event(&mut self.bus_events) => Wake::Bus(event),
            };

            match wake {
                Wake::Command(Some(command)) => self.handle(command),
                Wake::Command(None) => {
                    self.inbox_open = false;
                    self.stop();
                }
                Wake::Deadline => {
                    self.deadline = None;
                    self.begin_compile();
                }
                Wake::Finished(result) => self.finish(result),
                Wake::Bus(Ok(event)) => self.on_bus_event(event),
                Wake::Bus(Err(RecvError::Lagged(skipped))) => {
                    warn!(skipped, "recompile pipeline dropped editor events");
                }
                Wake::Bus(Err(RecvError::Closed)) => self.bus_events = None,
            }
        }
        debug!("recompile pipeline exited");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::BufferChanged(path) => {
                if self.stopped {
                    return;
                }
                debug!(path = %path.display(), "buffer changed");
                self.trigger();
            }
            Command::CompileNow(reply) => self.compile_now(reply),
            Command::Stop => self.stop(),
            Command::Status(reply) => {
                let _ = reply.send(self.status());
            }
            Command::CacheSize(reply) => {
                let _ = reply.send(self.cache.size());
            }
            Command::ClearCache(reply) => {
                self.cache.clear();
                debug!("compiler output cache cleared");
                let _ = reply.send(());
            }
        }
    }

    fn on_bus_event(&mut self, event: LoomEvent) {
        let LoomEvent::ActiveFileChanged { path } = event else {
            return;
        };
        if !is_source_path(&path, &self.config.source_extensions) {
            debug!(path = %path.display(), "ignoring active file that is not a source file");
            return;
        }
        debug!(path = %path.display(), "active file changed");
        self.active_file = Some(path);
        self.trigger();
    }

    fn trigger(&mut self) {
        match self.schedule.trigger() {
            Trigger::Debounce => {
                self.deadline = Some(Instant::now() + self.config.debounce);
                debug!(
                    debounce_ms = self.config.debounce.as_millis() as u64,
                    "compile scheduled"
                );
            }
            Trigger::Deferred => debug!("compile in flight, follow-up pending"),
        }
    }

    fn compile_now(&mut self, reply: oneshot::Sender<CompileOutcome>) {
        if self.in_flight.is_some() {
            self.schedule.trigger();
            self.queued.push(reply);
            return;
        }
        self.deadline = None;
        if self.begin_compile() {
            self.waiters.push(reply);
        } else {
            let _ = reply.send(CompileOutcome::Skipped);
        }
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.deadline = None;
        self.schedule.cancel();
        self.bus_events = None;
        info!("recompile pipeline stopped");
    }

    /// Starts a compile of the current buffers. Returns `false` if there was
    /// nothing to compile.
    fn begin_compile(&mut self) -> bool {
        let buffers = self.buffers.get_all();
        if buffers.is_empty() {
            self.schedule.skip();
            debug!("no buffers, skipping compile");
            return false;
        }
        if !self.schedule.begin() {
            return false;
        }

        self.last_compile_id += 1;
        let compile_id = self.last_compile_id;
        let request = CompileRequest {
            buffers,
            entry_hint: self.active_file.clone().or_else(|| self.config.entry.clone()),
        };
        let input_file_count = request.input_file_count();
        debug!(compile_id, input_file_count, entry = ?request.entry_hint, "compile started");
        self.bus.publish(LoomEvent::started(compile_id, input_file_count));

        let compiler = &self.compiler;
        let future = match panic::catch_unwind(AssertUnwindSafe(|| compiler.compile(request))) {
            Ok(future) => AssertUnwindSafe(future)
                .catch_unwind()
                .map(|result| result.unwrap_or_else(|payload| Err(panicked(payload))))
                .boxed(),
            Err(payload) => future::ready(Err(panicked(payload))).boxed(),
        };
        self.in_flight = Some(InFlight {
            compile_id,
            started: Instant::now(),
            future,
        });
        true
    }

    fn finish(&mut self, result: Result<CompilerOutput, CompileError>) {
        let Some(flight) = self.in_flight.take() else {
            return;
        };
        let compile_id = flight.compile_id;
        let duration_ms = flight.started.elapsed().as_micros() as f64 / 1000.0;

        let outcome = match result {
            Ok(output) => {
                let resolved = Arc::new(self.cache.resolve(&output));
                info!(
                    compile_id,
                    duration_ms,
                    chunks = output.distinct_chunk_count(),
                    "compile completed"
                );
                self.bus.publish(LoomEvent::CompilerCompleted {
                    compile_id,
                    duration_ms,
                    chunk_hashes: output.chunk_hashes(),
                    world_counts: WorldSummary::from(resolved.world_counts()),
                });
                self.resolved.send_replace(Some(Arc::clone(&resolved)));
                CompileOutcome::Completed {
                    compile_id,
                    output: resolved,
                }
            }
            Err(err) => {
                let error = err.to_string();
                warn!(compile_id, duration_ms, error = %error, "compile failed");
                self.bus.publish(LoomEvent::CompilerError {
                    compile_id,
                    error: error.clone(),
                });
                CompileOutcome::Failed { compile_id, error }
            }
        };
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(outcome.clone());
        }

        let follow_up = self.schedule.finish();
        if !self.queued.is_empty() {
            let queued = std::mem::take(&mut self.queued);
            self.deadline = None;
            if self.begin_compile() {
                self.waiters = queued;
            } else {
                for waiter in queued {
                    let _ = waiter.send(CompileOutcome::Skipped);
                }
            }
        } else if follow_up {
            self.deadline = Some(Instant::now() + self.config.debounce);
            debug!(compile_id, "follow-up compile scheduled");
        }
    }

    fn status(&self) -> PipelineStatus {
        PipelineStatus {
            state: self.schedule.state(),
            pending_recompile: self.schedule.pending_recompile(),
            last_compile_id: (self.last_compile_id > 0).then_some(self.last_compile_id),
            active_file: self.active_file.clone(),
            stopped: self.stopped,
        }
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

async fn in_flight_result(
    in_flight: &mut Option<InFlight>,
) -> Result<CompilerOutput, CompileError> {
    match in_flight {
        Some(flight) => (&mut flight.future).await,
        None => pending().await,
    }
}

async fn next_bus_event(
    events: &mut Option<broadcast::Receiver<LoomEvent>>,
) -> Result<LoomEvent, RecvError> {
    match events {
        Some(events) => events.recv().await,
        None => pending().await,
    }
}

fn panicked(payload: Box<dyn Any + Send>) -> CompileError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    CompileError::Failed(format!("compiler panicked: {message}"))
}
