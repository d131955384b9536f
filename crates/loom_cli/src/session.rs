//! `loom session` — drives the recompile pipeline from an editor.
//!
//! The editor writes one JSON command per line to stdin:
//!
//! ```text
//! {"op": "set", "path": "src/harbor.loom", "content": "..."}
//! {"op": "remove", "path": "src/market.loom"}
//! {"op": "activeFile", "path": "src/harbor.loom"}
//! {"op": "compileNow"}
//! {"op": "stop"}
//! ```
//!
//! Every event published on the bus is written to stdout as one JSON line.
//! The session ends on `stop` or end of input, after any in-flight compile
//! has finished.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use loom_cache::CompilerOutputCache;
use loom_events::{EventBus, LoomEvent};
use loom_pipeline::{Compiler, PipelineConfig, RecompilePipeline};
use loom_source::BufferMap;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use crate::project::{
    build_compiler, load_buffers, load_project_config, pipeline_config, resolve_project_root,
    runtime,
};
use crate::{GlobalArgs, SessionArgs};

/// One line of session input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum SessionCommand {
    /// Replace a buffer's content.
    Set {
        /// Buffer path.
        path: PathBuf,
        /// New content.
        content: String,
    },
    /// Delete a buffer.
    Remove {
        /// Buffer path.
        path: PathBuf,
    },
    /// Announce the file the editor is focused on.
    ActiveFile {
        /// The focused file.
        path: PathBuf,
    },
    /// Compile immediately.
    CompileNow,
    /// Stop the pipeline and end the session.
    Stop,
}

/// Runs the `loom session` command.
pub fn run(args: &SessionArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project_dir = resolve_project_root(global)?;
    let config = load_project_config(global, &project_dir)?;
    let compiler = build_compiler(&project_dir, &config)?;

    let buffers = if args.no_load {
        Arc::new(BufferMap::new())
    } else {
        load_buffers(&project_dir, &config)?
    };

    let mut settings = pipeline_config(&config);
    if let Some(ms) = args.debounce_ms {
        settings = settings.with_debounce(Duration::from_millis(ms));
    }

    tracing::info!(
        project = %config.project.name,
        buffers = buffers.len(),
        debounce_ms = settings.debounce.as_millis() as u64,
        "session started"
    );

    let bus = EventBus::new(config.events.capacity);
    runtime()?.block_on(run_session(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        buffers,
        Arc::new(compiler),
        bus,
        settings,
    ))?;
    Ok(0)
}

/// Applies commands read from `input` until `stop` or end of input, writing
/// every bus event to `output` as a JSON line. Returns `output` once the
/// pipeline has shut down and every event has been written.
pub async fn run_session<R, W>(
    input: R,
    output: W,
    buffers: Arc<BufferMap>,
    compiler: Arc<dyn Compiler>,
    bus: EventBus,
    config: PipelineConfig,
) -> std::io::Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let printer = tokio::spawn(print_events(bus.subscribe(), output));
    let pipeline = RecompilePipeline::start(
        Arc::clone(&buffers),
        compiler,
        CompilerOutputCache::new(),
        bus.clone(),
        config,
    );

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let command = match serde_json::from_str::<SessionCommand>(line) {
            Ok(command) => command,
            Err(err) => {
                tracing::warn!(error = %err, "skipping invalid session command");
                continue;
            }
        };
        match command {
            SessionCommand::Set { path, content } => {
                buffers.set(path, content);
            }
            SessionCommand::Remove { path } => {
                buffers.remove(path);
            }
            SessionCommand::ActiveFile { path } => {
                bus.publish(LoomEvent::active_file_changed(path));
            }
            SessionCommand::CompileNow => match pipeline.compile_now().await {
                Ok(outcome) => {
                    tracing::debug!(compile_id = ?outcome.compile_id(), "compile requested");
                }
                Err(err) => tracing::error!(error = %err, "compile request failed"),
            },
            SessionCommand::Stop => {
                pipeline.stop();
                break;
            }
        }
    }

    pipeline.shutdown().await;
    drop(bus);
    printer.await.map_err(std::io::Error::other)?
}

/// Writes every event from `events` to `output` until the bus closes.
async fn print_events<W>(
    mut events: tokio::sync::broadcast::Receiver<LoomEvent>,
    mut output: W,
) -> std::io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    loop {
        match events.recv().await {
            Ok(event) => {
                let mut line = serde_json::to_vec(&event)?;
                line.push(b'\n');
                output.write_all(&line).await?;
                output.flush().await?;
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "session output lagged behind the event bus");
            }
            Err(RecvError::Closed) => break,
        }
    }
    Ok(output)
}
