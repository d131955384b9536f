//! `loom resolve` — replays saved compiler outputs through one chunk cache.
//!
//! Each file is resolved in command-line order against the same
//! [`CompilerOutputCache`], so the report shows which chunks a live session
//! would have reused, decoded afresh, retained or defaulted.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use loom_cache::{CompilerOutputCache, Provenance, ResolvedOutput};
use loom_events::WorldSummary;
use loom_output::{ChunkName, CompilerOutput};
use serde::Serialize;

use crate::{GlobalArgs, ReportFormat, ResolveArgs};

/// One line of the JSON report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveReport<'a> {
    file: &'a Path,
    compile_id: &'a str,
    provenance: &'a BTreeMap<ChunkName, Provenance>,
    cache_size: usize,
    world_counts: WorldSummary,
}

/// Runs the `loom resolve` command.
pub fn run(args: &ResolveArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let outputs = read_outputs(&args.outputs)?;
    let mut cache = CompilerOutputCache::new();

    let mut errors = false;
    for (path, output) in &outputs {
        let resolved = cache.resolve(output);
        errors |= resolved.has_errors();
        match args.format {
            ReportFormat::Text => {
                if !global.quiet {
                    eprint!("{}", render_text(path, &resolved, cache.size()));
                }
            }
            ReportFormat::Json => {
                let report = ResolveReport {
                    file: path,
                    compile_id: &resolved.header.compile_id,
                    provenance: &resolved.provenance,
                    cache_size: cache.size(),
                    world_counts: WorldSummary::from(resolved.world_counts()),
                };
                println!("{}", serde_json::to_string(&report)?);
            }
        }
    }

    Ok(i32::from(errors))
}

/// Reads and parses every output file, failing on the first unreadable one.
fn read_outputs(
    paths: &[PathBuf],
) -> Result<Vec<(PathBuf, CompilerOutput)>, Box<dyn std::error::Error>> {
    paths
        .iter()
        .map(|path| -> Result<_, Box<dyn std::error::Error>> {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            let output = CompilerOutput::from_json(&text)
                .map_err(|e| format!("invalid compiler output in {}: {e}", path.display()))?;
            tracing::debug!(
                path = %path.display(),
                chunks = output.chunks.len(),
                "loaded compiler output"
            );
            Ok((path.clone(), output))
        })
        .collect()
}

/// Renders the text report for one resolved file.
fn render_text(path: &Path, resolved: &ResolvedOutput, cache_size: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "   Resolved {} (compile {})",
        path.display(),
        resolved.header.compile_id
    );
    for name in ChunkName::ALL {
        let _ = writeln!(
            out,
            "     {:<24} {}",
            name.as_str(),
            provenance_label(resolved.provenance(name))
        );
    }
    let _ = writeln!(out, "   Cache: {cache_size} chunk(s)");
    out
}

fn provenance_label(provenance: Provenance) -> &'static str {
    match provenance {
        Provenance::Reused => "reused",
        Provenance::Resolved => "resolved",
        Provenance::Retained => "retained",
        Provenance::Defaulted => "defaulted",
    }
}
