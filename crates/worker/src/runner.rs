//! Invocation of the external renderer.
//!
//! The renderer receives the config document path as its last argument.
//! Its exit status is not consulted: a run succeeded if and only if the
//! captured output contains the success marker.

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Trailing bytes of stdout or stderr kept per stream (10 MiB). Streams are
/// always read to EOF so the renderer never writes into a closed pipe.
pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

const READ_CHUNK: usize = 64 * 1024;

/// Failures of the detached render phase. Never returned to a submitter;
/// they are logged and turned into the error marker.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("render command is empty")]
    EmptyCommand,

    #[error("failed to start renderer {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("renderer I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("renderer output lacks the success marker")]
    MarkerMissing,
}

/// Program plus leading arguments, e.g. `python /opt/gps2video/main.py`.
#[derive(Debug, Clone)]
pub struct RenderCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl RenderCommand {
    /// Split a whitespace-separated command line.
    pub fn parse(line: &str) -> Result<Self, RenderError> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(RenderError::EmptyCommand)?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

/// What a finished renderer run produced.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    /// Stdout followed by stderr, lossily decoded. Each stream contributes
    /// at most its last [`MAX_OUTPUT_BYTES`].
    pub combined: String,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

impl RenderOutput {
    pub fn reports_success(&self, marker: &str) -> bool {
        self.combined.contains(marker)
    }
}

/// Run the renderer on `config_path` to completion and capture its output.
///
/// There is no timeout: a hung renderer keeps its job running.
pub async fn run_renderer(
    command: &RenderCommand,
    config_path: &Path,
) -> Result<RenderOutput, RenderError> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .arg(config_path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let start = Instant::now();

    let mut child = cmd.spawn().map_err(|source| RenderError::Spawn {
        program: command.program.clone(),
        source,
    })?;

    // Drain both pipes concurrently so a chatty renderer cannot block on a
    // full pipe while we wait on the other one.
    let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
    let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

    let status = child.wait().await?;

    let mut bytes = stdout_task.await.unwrap_or_default();
    bytes.extend(stderr_task.await.unwrap_or_default());

    Ok(RenderOutput {
        combined: String::from_utf8_lossy(&bytes).into_owned(),
        exit_code: status.code(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Read a stream to EOF, keeping its last [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut tail = Vec::new();
    let Some(mut h) = handle else {
        return tail;
    };
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        match h.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                tail.extend_from_slice(&chunk[..n]);
                // Trim in batches so the copy is amortized over many reads.
                if tail.len() > 2 * MAX_OUTPUT_BYTES {
                    tail.drain(..tail.len() - MAX_OUTPUT_BYTES);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read renderer output");
                break;
            }
        }
    }
    if tail.len() > MAX_OUTPUT_BYTES {
        tail.drain(..tail.len() - MAX_OUTPUT_BYTES);
    }
    tail
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
