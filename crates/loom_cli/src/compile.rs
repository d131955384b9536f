//! `loom compile` — one-shot compile of the current project.
//!
//! The full pipeline:
//!
//! 1. Find project root (walk up looking for `loom.toml`)
//! 2. Load config via `loom_config`
//! 3. Load source files from the source directory into a buffer map
//! 4. Run one compile through the recompile pipeline
//! 5. Render the events and diagnostics

use std::sync::Arc;

use loom_cache::CompilerOutputCache;
use loom_events::{EventBus, LoomEvent};
use loom_output::{Diagnostic, Severity};
use loom_pipeline::{CompileOutcome, Compiler, PipelineConfig, PipelineError, RecompilePipeline};
use loom_source::BufferMap;
use tokio::sync::broadcast::error::TryRecvError;

use crate::project::{
    build_compiler, load_buffers, load_project_config, pipeline_config, resolve_project_root,
    runtime,
};
use crate::{CompileArgs, GlobalArgs, ReportFormat};

/// Runs the `loom compile` command.
///
/// Returns exit code 0 on a clean compile, 1 if the compiler failed or
/// reported errors.
pub fn run(args: &CompileArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    // Step 1: Find project root
    let project_dir = resolve_project_root(global)?;

    // Step 2: Load config
    let config = load_project_config(global, &project_dir)?;
    let compiler = build_compiler(&project_dir, &config)?;

    if !global.quiet && args.format == ReportFormat::Text {
        match config.project.version {
            Some(ref version) => eprintln!("   Compiling {} v{version}", config.project.name),
            None => eprintln!("   Compiling {}", config.project.name),
        }
    }

    // Step 3: Load sources
    let buffers = load_buffers(&project_dir, &config)?;
    if buffers.is_empty() {
        if !global.quiet {
            eprintln!(
                "warning: no source files found in {}",
                config.source_dir(&project_dir).display()
            );
        }
        return Ok(0);
    }

    // Step 4: Compile
    let bus = EventBus::new(config.events.capacity);
    let settings = pipeline_config(&config);
    let (outcome, events) = runtime()?.block_on(compile_once(
        buffers,
        Arc::new(compiler),
        bus,
        settings,
    ))?;

    // Step 5: Render
    match args.format {
        ReportFormat::Text => {
            if !global.quiet {
                render_text(&outcome);
            }
        }
        ReportFormat::Json => {
            for event in &events {
                println!("{}", serde_json::to_string(event)?);
            }
        }
    }

    Ok(exit_code(&outcome))
}

/// Compiles `buffers` once and returns the outcome along with every event the
/// compile published, in order.
pub async fn compile_once(
    buffers: Arc<BufferMap>,
    compiler: Arc<dyn Compiler>,
    bus: EventBus,
    config: PipelineConfig,
) -> Result<(CompileOutcome, Vec<LoomEvent>), PipelineError> {
    let mut events = bus.subscribe();
    let pipeline = RecompilePipeline::start(
        buffers,
        compiler,
        CompilerOutputCache::new(),
        bus,
        config,
    );
    let outcome = pipeline.compile_now().await;
    pipeline.shutdown().await;
    let outcome = outcome?;

    let mut published = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => published.push(event),
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "compile events dropped");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    Ok((outcome, published))
}

fn render_text(outcome: &CompileOutcome) {
    match outcome {
        CompileOutcome::Skipped => eprintln!("   Nothing to compile"),
        CompileOutcome::Failed { error, .. } => eprintln!("error: {error}"),
        CompileOutcome::Completed { output, .. } => {
            for diagnostic in &output.diagnostics.items {
                eprintln!("{}", render_diagnostic(diagnostic));
            }
            let counts = output.world_counts();
            let errors = output.diagnostics.error_count();
            let warnings = output
                .diagnostics
                .items
                .iter()
                .filter(|d| d.severity == Severity::Warning)
                .count();
            eprintln!(
                "   World: {} entities, {} locations, {} exits",
                counts.entities, counts.locations, counts.exits
            );
            eprintln!("   Result: {errors} error(s), {warnings} warning(s)");
        }
    }
}

/// Formats one diagnostic as `file:line:col: severity[code]: message`.
pub fn render_diagnostic(diagnostic: &Diagnostic) -> String {
    let mut out = String::new();
    if let Some(ref file) = diagnostic.file {
        out.push_str(file);
        if let Some(line) = diagnostic.line {
            out.push_str(&format!(":{line}"));
            if let Some(column) = diagnostic.column {
                out.push_str(&format!(":{column}"));
            }
        }
        out.push_str(": ");
    }
    out.push_str(severity_label(diagnostic.severity));
    if let Some(ref code) = diagnostic.code {
        out.push_str(&format!("[{code}]"));
    }
    out.push_str(": ");
    out.push_str(&diagnostic.message);
    out
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "info",
        Severity::Hint => "hint",
    }
}

/// Exit code for a compile outcome.
pub fn exit_code(outcome: &CompileOutcome) -> i32 {
    match outcome {
        CompileOutcome::Skipped => 0,
        CompileOutcome::Failed { .. } => 1,
        CompileOutcome::Completed { output, .. } => i32::from(output.has_errors()),
    }
}
