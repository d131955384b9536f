//! Scheduling behavior of the recompile pipeline, run on paused tokio time.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use loom_cache::CompilerOutputCache;
use loom_events::{EventBus, LoomEvent, WorldSummary};
use loom_output::{ChunkName, CompileHeader, CompilerOutput, RawChunk, WorldCounts};
use loom_pipeline::{
    CompileError, CompileOutcome, CompileRequest, Compiler, PipelineConfig, PipelineState,
    RecompilePipeline,
};
use loom_source::BufferMap;
use serde_json::json;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::{sleep, timeout, Instant};

/// A compiler that records every request and answers after a fixed delay.
struct MockCompiler {
    delay: Duration,
    calls: Mutex<Vec<CompileRequest>>,
    scripted: Mutex<VecDeque<Result<CompilerOutput, String>>>,
}

impl MockCompiler {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            calls: Mutex::new(Vec::new()),
            scripted: Mutex::new(VecDeque::new()),
        })
    }

    fn script(&self, result: Result<CompilerOutput, String>) {
        self.scripted.lock().unwrap().push_back(result);
    }

    fn calls(&self) -> Vec<CompileRequest> {
        self.calls.lock().unwrap().clone()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Compiler for MockCompiler {
    fn compile(&self, request: CompileRequest) -> BoxFuture<'static, Result<CompilerOutput, CompileError>> {
        let count = request.input_file_count();
        self.calls.lock().unwrap().push(request);
        let result = self
            .scripted
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(sample_output(count)));
        let delay = self.delay;
        async move {
            sleep(delay).await;
            result.map_err(CompileError::Failed)
        }
        .boxed()
    }
}

fn sample_output(input_file_count: usize) -> CompilerOutput {
    CompilerOutput::new(CompileHeader {
        compile_id: "mock".to_string(),
        input_file_count,
        ..CompileHeader::default()
    })
    .with_chunk(
        RawChunk::from_value(
            ChunkName::CompiledWorld,
            &json!({"locations": {"harbor": {"exits": {"north": "market"}}}, "entities": {"gull": {}}}),
            "w1",
        )
        .unwrap(),
    )
    .with_chunk(RawChunk::from_value(ChunkName::Diagnostics, &json!({"items": []}), "d1").unwrap())
    .with_chunk(RawChunk::from_value(ChunkName::SymbolTable, &json!({"symbols": []}), "s1").unwrap())
}

struct Harness {
    buffers: Arc<BufferMap>,
    compiler: Arc<MockCompiler>,
    bus: EventBus,
    events: broadcast::Receiver<LoomEvent>,
    pipeline: RecompilePipeline,
}

fn harness(delay: Duration, config: PipelineConfig, files: &[(&str, &str)]) -> Harness {
    let buffers = Arc::new(BufferMap::new());
    for (path, content) in files {
        buffers.load(*path, *content);
    }
    let compiler = MockCompiler::new(delay);
    let bus = EventBus::new(64);
    let events = bus.subscribe();
    let pipeline = RecompilePipeline::start(
        Arc::clone(&buffers),
        compiler.clone(),
        CompilerOutputCache::new(),
        bus.clone(),
        config,
    );
    Harness {
        buffers,
        compiler,
        bus,
        events,
        pipeline,
    }
}

fn debounce(ms: u64) -> PipelineConfig {
    PipelineConfig::default().with_debounce(Duration::from_millis(ms))
}

const TWO_FILES: &[(&str, &str)] = &[
    ("src/harbor.loom", "location harbor"),
    ("src/market.loom", "location market"),
];

/// Waits for the next `compiler.*` event, skipping editor events.
async fn next_compiler_event(events: &mut broadcast::Receiver<LoomEvent>) -> LoomEvent {
    timeout(Duration::from_secs(60), async {
        loop {
            let event = events.recv().await.unwrap();
            if event.compile_id().is_some() {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for a compiler event")
}

/// Waits for the next `compiler.completed` or `compiler.error` event.
async fn next_terminal_event(events: &mut broadcast::Receiver<LoomEvent>) -> LoomEvent {
    loop {
        let event = next_compiler_event(events).await;
        if event.is_terminal() {
            return event;
        }
    }
}

fn assert_quiet(events: &mut broadcast::Receiver<LoomEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) if event.compile_id().is_none() => continue,
            Ok(event) => panic!("unexpected event: {event:?}"),
            Err(TryRecvError::Empty) => return,
            Err(err) => panic!("event stream broken: {err}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn changes_within_one_window_compile_once() {
    let mut h = harness(Duration::from_millis(10), debounce(100), TWO_FILES);

    let mut changes = Vec::new();
    for round in 0..5 {
        h.buffers.set("src/harbor.loom", format!("location harbor {round}"));
        changes.push(Instant::now());
        sleep(Duration::from_millis(30)).await;
    }
    let last_change = changes[changes.len() - 1];

    let started = next_compiler_event(&mut h.events).await;
    assert!(matches!(started, LoomEvent::CompilerStarted { compile_id: 1, .. }));
    assert!(Instant::now() >= last_change + Duration::from_millis(100));

    let completed = next_compiler_event(&mut h.events).await;
    assert!(matches!(completed, LoomEvent::CompilerCompleted { compile_id: 1, .. }));

    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.compiler.call_count(), 1);
    assert_eq!(
        h.compiler.calls()[0].buffers[&PathBuf::from("src/harbor.loom")],
        "location harbor 4"
    );
    assert_quiet(&mut h.events);
}

#[tokio::test(start_paused = true)]
async fn changes_during_compile_yield_exactly_one_follow_up() {
    let mut h = harness(Duration::from_millis(500), debounce(50), TWO_FILES);

    h.buffers.set("src/harbor.loom", "location harbor v1");
    let started = next_compiler_event(&mut h.events).await;
    assert_eq!(started.compile_id(), Some(1));

    h.buffers.set("src/harbor.loom", "location harbor v2");
    h.buffers.set("src/market.loom", "location market v2");
    h.buffers.set("src/harbor.loom", "location harbor v3");

    let status = h.pipeline.status().await.unwrap();
    assert_eq!(status.state, PipelineState::Compiling);
    assert!(status.pending_recompile);

    let first = next_terminal_event(&mut h.events).await;
    assert!(matches!(first, LoomEvent::CompilerCompleted { compile_id: 1, .. }));
    let second = next_terminal_event(&mut h.events).await;
    assert!(matches!(second, LoomEvent::CompilerCompleted { compile_id: 2, .. }));

    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.compiler.call_count(), 2);
    assert_eq!(
        h.compiler.calls()[1].buffers[&PathBuf::from("src/harbor.loom")],
        "location harbor v3"
    );
    assert_quiet(&mut h.events);
    assert_eq!(h.pipeline.status().await.unwrap().state, PipelineState::Idle);
}

#[tokio::test(start_paused = true)]
async fn events_for_one_compile_are_ordered() {
    let mut h = harness(Duration::from_millis(20), debounce(0), TWO_FILES);
    h.buffers.set("src/harbor.loom", "location harbor!");

    match next_compiler_event(&mut h.events).await {
        LoomEvent::CompilerStarted {
            compile_id,
            input_file_count,
            ..
        } => {
            assert_eq!(compile_id, 1);
            assert_eq!(input_file_count, 2);
        }
        other => panic!("expected compiler.started, got {other:?}"),
    }
    match next_compiler_event(&mut h.events).await {
        LoomEvent::CompilerCompleted {
            compile_id,
            duration_ms,
            chunk_hashes,
            world_counts,
        } => {
            assert_eq!(compile_id, 1);
            assert!((20.0..25.0).contains(&duration_ms));
            assert_eq!(chunk_hashes.len(), 3);
            assert_eq!(chunk_hashes[&ChunkName::CompiledWorld].as_str(), "w1");
            assert_eq!(world_counts.locations, 1);
            assert_eq!(world_counts.entities, 1);
            assert_eq!(world_counts.exits, 1);
        }
        other => panic!("expected compiler.completed, got {other:?}"),
    }
}

fn completed_counts(event: LoomEvent) -> WorldSummary {
    match event {
        LoomEvent::CompilerCompleted { world_counts, .. } => world_counts,
        other => panic!("expected compiler.completed, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn completed_counts_exits_nested_in_locations() {
    let mut h = harness(Duration::from_millis(5), debounce(0), TWO_FILES);
    let tavern = CompilerOutput::new(CompileHeader {
        compile_id: "tavern".to_string(),
        world_counts: WorldCounts {
            locations: 1,
            exits: 1,
            ..WorldCounts::default()
        },
        ..CompileHeader::default()
    })
    .with_chunk(
        RawChunk::from_value(
            ChunkName::CompiledWorld,
            &json!({"locations": {"tavern": {"exits": {"east": {"to": "market"}}}}}),
            "tavern-world",
        )
        .unwrap(),
    );
    h.compiler.script(Ok(tavern));
    h.compiler.script(Ok(CompilerOutput::new(CompileHeader::default())));

    h.pipeline.compile_now().await.unwrap();
    let counts = completed_counts(next_terminal_event(&mut h.events).await);
    assert_eq!(
        counts,
        WorldSummary {
            entities: 0,
            locations: 1,
            exits: 1
        }
    );

    // The next compile omits the world; the retained world keeps its counts.
    h.pipeline.compile_now().await.unwrap();
    let counts = completed_counts(next_terminal_event(&mut h.events).await);
    assert_eq!(counts.exits, 1);
}

#[tokio::test(start_paused = true)]
async fn compile_now_on_empty_buffers_skips() {
    let mut h = harness(Duration::ZERO, debounce(0), &[]);

    let outcome = h.pipeline.compile_now().await.unwrap();
    assert!(matches!(outcome, CompileOutcome::Skipped));
    assert_eq!(h.compiler.call_count(), 0);
    sleep(Duration::from_millis(10)).await;
    assert_quiet(&mut h.events);
    assert_eq!(h.pipeline.status().await.unwrap().last_compile_id, None);
}

#[tokio::test(start_paused = true)]
async fn debounced_compile_with_no_buffers_is_silent() {
    let mut h = harness(Duration::ZERO, debounce(10), &[("src/harbor.loom", "x")]);
    h.buffers.remove("src/harbor.loom");

    sleep(Duration::from_secs(1)).await;
    assert_eq!(h.compiler.call_count(), 0);
    assert_quiet(&mut h.events);
    assert_eq!(h.pipeline.status().await.unwrap().state, PipelineState::Idle);
}

#[tokio::test(start_paused = true)]
async fn compile_now_cancels_debounce() {
    let mut h = harness(Duration::from_millis(5), debounce(1_000), TWO_FILES);
    h.buffers.set("src/harbor.loom", "location harbor 2");

    let outcome = h.pipeline.compile_now().await.unwrap();
    assert_eq!(outcome.compile_id(), Some(1));
    let output = outcome.output().unwrap();
    assert_eq!(output.world.world.locations[0].id, "harbor");

    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.compiler.call_count(), 1);
    let _ = next_terminal_event(&mut h.events).await;
    assert_quiet(&mut h.events);
}

#[tokio::test(start_paused = true)]
async fn compile_now_during_compile_returns_follow_up() {
    let mut h = harness(Duration::from_millis(200), debounce(0), TWO_FILES);
    h.buffers.set("src/harbor.loom", "location harbor 2");
    let started = next_compiler_event(&mut h.events).await;
    assert_eq!(started.compile_id(), Some(1));

    h.buffers.set("src/market.loom", "location market 2");
    let outcome = h.pipeline.compile_now().await.unwrap();
    assert_eq!(outcome.compile_id(), Some(2));

    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.compiler.call_count(), 2);
    assert_eq!(
        h.compiler.calls()[1].buffers[&PathBuf::from("src/market.loom")],
        "location market 2"
    );
}

#[tokio::test(start_paused = true)]
async fn failure_reports_error_and_keeps_cache() {
    let mut h = harness(Duration::ZERO, debounce(0), TWO_FILES);
    h.compiler.script(Ok(sample_output(2)));
    h.compiler.script(Err("harbor.loom:1: unexpected end of input".to_string()));
    let resolved = h.pipeline.resolved();

    let first = h.pipeline.compile_now().await.unwrap();
    let first_output = Arc::clone(first.output().unwrap());
    assert_eq!(h.pipeline.cache_size().await.unwrap(), 3);

    let second = h.pipeline.compile_now().await.unwrap();
    match &second {
        CompileOutcome::Failed { compile_id, error } => {
            assert_eq!(*compile_id, 2);
            assert!(error.contains("unexpected end of input"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(h.pipeline.cache_size().await.unwrap(), 3);
    let latest = resolved.borrow().clone().unwrap();
    assert!(Arc::ptr_eq(&latest, &first_output));

    let _ = next_terminal_event(&mut h.events).await;
    match next_terminal_event(&mut h.events).await {
        LoomEvent::CompilerError { compile_id, error } => {
            assert_eq!(compile_id, 2);
            assert!(error.contains("unexpected end of input"));
        }
        other => panic!("expected compiler.error, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn end_to_end_cache_size_matches_chunks() {
    let mut h = harness(Duration::ZERO, debounce(0), TWO_FILES);
    h.buffers.set("src/market.loom", "location market\n  exit south harbor");

    let completed = next_terminal_event(&mut h.events).await;
    let LoomEvent::CompilerCompleted { chunk_hashes, .. } = completed else {
        panic!("expected compiler.completed, got {completed:?}");
    };

    sleep(Duration::from_millis(100)).await;
    assert_quiet(&mut h.events);
    assert_eq!(h.pipeline.cache_size().await.unwrap(), chunk_hashes.len());
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_pending_debounce() {
    let mut h = harness(Duration::ZERO, debounce(100), TWO_FILES);
    h.buffers.set("src/harbor.loom", "location harbor 2");
    sleep(Duration::from_millis(50)).await;

    h.pipeline.stop();
    assert_eq!(h.buffers.subscriber_count(), 0);
    sleep(Duration::from_secs(1)).await;
    h.buffers.set("src/harbor.loom", "location harbor 3");
    sleep(Duration::from_secs(1)).await;

    assert_eq!(h.compiler.call_count(), 0);
    assert_quiet(&mut h.events);
    let status = h.pipeline.status().await.unwrap();
    assert!(status.stopped);
    assert_eq!(status.state, PipelineState::Idle);
}

#[tokio::test(start_paused = true)]
async fn stop_lets_in_flight_compile_finish() {
    let mut h = harness(Duration::from_millis(300), debounce(0), TWO_FILES);
    h.buffers.set("src/harbor.loom", "location harbor 2");
    let _ = next_compiler_event(&mut h.events).await;

    h.buffers.set("src/harbor.loom", "location harbor 3");
    h.pipeline.stop();

    let completed = next_terminal_event(&mut h.events).await;
    assert!(matches!(completed, LoomEvent::CompilerCompleted { compile_id: 1, .. }));
    assert!(h.pipeline.resolved().borrow().is_some());

    sleep(Duration::from_secs(2)).await;
    assert_eq!(h.compiler.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn active_file_is_used_as_entry_hint() {
    let config = debounce(10).with_entry("src/main.loom");
    let mut h = harness(Duration::ZERO, config, TWO_FILES);

    h.bus.publish(LoomEvent::active_file_changed("notes/todo.txt"));
    sleep(Duration::from_secs(1)).await;
    assert_eq!(h.compiler.call_count(), 0);

    h.bus.publish(LoomEvent::active_file_changed("src/market.loom"));
    let _ = next_terminal_event(&mut h.events).await;
    assert_eq!(h.compiler.call_count(), 1);
    assert_eq!(
        h.compiler.calls()[0].entry_hint,
        Some(PathBuf::from("src/market.loom"))
    );
    assert_eq!(
        h.pipeline.status().await.unwrap().active_file,
        Some(PathBuf::from("src/market.loom"))
    );
}

#[tokio::test(start_paused = true)]
async fn active_file_survives_a_burst_of_compiler_events() {
    let buffers = Arc::new(BufferMap::new());
    for (path, content) in TWO_FILES {
        buffers.load(*path, *content);
    }
    let compiler = MockCompiler::new(Duration::ZERO);
    let bus = EventBus::new(2);
    let pipeline = RecompilePipeline::start(
        buffers,
        compiler.clone(),
        CompilerOutputCache::new(),
        bus.clone(),
        debounce(10),
    );

    bus.publish(LoomEvent::active_file_changed("src/market.loom"));
    for id in 100..110 {
        bus.publish(LoomEvent::started(id, 2));
    }
    sleep(Duration::from_secs(1)).await;

    assert_eq!(compiler.call_count(), 1);
    assert_eq!(
        compiler.calls()[0].entry_hint,
        Some(PathBuf::from("src/market.loom"))
    );
    assert_eq!(
        pipeline.status().await.unwrap().active_file,
        Some(PathBuf::from("src/market.loom"))
    );
}

#[tokio::test(start_paused = true)]
async fn configured_entry_is_fallback_hint() {
    let config = debounce(0).with_entry("src/main.loom");
    let h = harness(Duration::ZERO, config, TWO_FILES);

    h.pipeline.compile_now().await.unwrap();
    assert_eq!(
        h.compiler.calls()[0].entry_hint,
        Some(PathBuf::from("src/main.loom"))
    );
}

#[tokio::test(start_paused = true)]
async fn compile_ids_increase_monotonically() {
    let h = harness(Duration::ZERO, debounce(0), TWO_FILES);
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(h.pipeline.compile_now().await.unwrap().compile_id().unwrap());
    }
    assert_eq!(ids, [1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn unchanged_chunks_keep_their_allocation() {
    let h = harness(Duration::ZERO, debounce(0), TWO_FILES);
    let first = h.pipeline.compile_now().await.unwrap();
    let second = h.pipeline.compile_now().await.unwrap();
    let (a, b) = (first.output().unwrap(), second.output().unwrap());
    assert!(Arc::ptr_eq(&a.world, &b.world));
    assert!(Arc::ptr_eq(&a.diagnostics, &b.diagnostics));

    h.pipeline.clear_cache().await.unwrap();
    assert_eq!(h.pipeline.cache_size().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn panicking_compiler_is_reported_as_failure() {
    struct Panicky;

    impl Compiler for Panicky {
        fn compile(&self, request: CompileRequest) -> BoxFuture<'static, Result<CompilerOutput, CompileError>> {
            async move {
                assert!(request.buffers.is_empty(), "out of thread");
                Ok(CompilerOutput::default())
            }
            .boxed()
        }
    }

    let buffers = Arc::new(BufferMap::new());
    buffers.load("src/harbor.loom", "location harbor");
    let pipeline = RecompilePipeline::start(
        buffers,
        Arc::new(Panicky),
        CompilerOutputCache::new(),
        EventBus::new(8),
        debounce(0),
    );

    let outcome = pipeline.compile_now().await.unwrap();
    match outcome {
        CompileOutcome::Failed { error, .. } => assert!(error.contains("out of thread")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(pipeline.cache_size().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_waits_for_in_flight_compile() {
    let mut h = harness(Duration::from_millis(250), debounce(0), TWO_FILES);
    h.buffers.set("src/harbor.loom", "location harbor 2");
    let _ = next_compiler_event(&mut h.events).await;

    h.pipeline.shutdown().await;
    let completed = next_terminal_event(&mut h.events).await;
    assert!(matches!(completed, LoomEvent::CompilerCompleted { compile_id: 1, .. }));
    assert_eq!(h.buffers.subscriber_count(), 0);
}
