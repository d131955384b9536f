//! A [`Compiler`] that runs an external command.
//!
//! The request is written to the child's stdin as
//! `{"files": {"<path>": "<content>", ...}, "entry": "<path>"}` and the
//! child's stdout is parsed as a compiler output document.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use futures::future::BoxFuture;
use futures::FutureExt;
use loom_output::CompilerOutput;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::compiler::{CompileRequest, Compiler};
use crate::error::CompileError;

/// Runs `command args...` once per compile.
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    command: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    files: &'a BTreeMap<PathBuf, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry: Option<&'a Path>,
}

impl ProcessCompiler {
    /// Creates a compiler running `command` with no arguments.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Sets the command's arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Runs the command from `dir`.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// The configured command.
    pub fn command(&self) -> &str {
        &self.command
    }

    fn encode(request: &CompileRequest) -> Result<Vec<u8>, CompileError> {
        serde_json::to_vec(&WireRequest {
            files: &request.buffers,
            entry: request.entry_hint.as_deref(),
        })
        .map_err(CompileError::Encode)
    }
}

impl Compiler for ProcessCompiler {
    fn compile(&self, request: CompileRequest) -> BoxFuture<'static, Result<CompilerOutput, CompileError>> {
        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        let program = self.command.clone();

        async move {
            let payload = Self::encode(&request)?;
            let mut child = command.spawn().map_err(|source| CompileError::Spawn {
                command: program.clone(),
                source,
            })?;
            let stdin = child.stdin.take();

            let write = async move {
                if let Some(mut stdin) = stdin {
                    stdin.write_all(&payload).await?;
                    stdin.shutdown().await?;
                }
                Ok::<(), io::Error>(())
            };
            let (written, output) = tokio::join!(write, child.wait_with_output());
            let output = output?;

            if !output.status.success() {
                return Err(CompileError::ExitStatus {
                    status: output.status,
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
            // A compiler may exit before reading all of its input.
            match written {
                Err(err) if err.kind() != io::ErrorKind::BrokenPipe => return Err(err.into()),
                _ => {}
            }

            tracing::trace!(command = %program, bytes = output.stdout.len(), "compiler finished");
            CompilerOutput::from_slice(&output.stdout).map_err(CompileError::Decode)
        }
        .boxed()
    }
}
