//! Option bundles populated once before any pipeline starts.
//!
//! Each bundle is a plain value record; pipelines only ever read them.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DEFAULT_REMOTE_DIR, DEFAULT_TIMEOUT_SECS};

/// How the memory snapshot is produced on the target and retrieved locally.
#[derive(Clone, Debug)]
pub struct AcquisitionOptions {
    /// Command executed on the target to produce the snapshot. The
    /// `{output}` placeholder expands to the remote snapshot path.
    pub dump_command: String,
    /// File name of the snapshot on the target.
    pub dump_name: String,
    /// Directory on the target the snapshot is written to.
    pub remote_dir: String,
    /// Local directory the snapshot is transferred into.
    pub local_dir: PathBuf,
    /// Upper bound for the remote acquisition step.
    pub timeout: Duration,
}

impl AcquisitionOptions {
    /// Full path of the snapshot on the target.
    pub fn remote_path(&self) -> String {
        format!("{}/{}", self.remote_dir.trim_end_matches('/'), self.dump_name)
    }

    /// Full local path the snapshot is transferred to.
    pub fn local_path(&self) -> PathBuf {
        self.local_dir.join(&self.dump_name)
    }

    /// The dump command with its placeholders expanded.
    pub fn render_command(&self) -> String {
        self.dump_command.replace("{output}", &self.remote_path())
    }
}

impl Default for AcquisitionOptions {
    fn default() -> Self {
        Self {
            dump_command: String::new(),
            dump_name: "memdump.dmp".to_string(),
            remote_dir: DEFAULT_REMOTE_DIR.to_string(),
            local_dir: std::env::temp_dir(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// How credential records are recovered from a local snapshot.
#[derive(Clone, Debug, Default)]
pub struct ExtractionOptions {
    /// Command run locally to parse the snapshot. The `{snapshot}`
    /// placeholder expands to the local snapshot path; stdout must be a
    /// JSON array of credential records.
    pub parse_command: String,
    /// Keep every parsed record, including records with no secret.
    pub raw: bool,
}

/// Output rendering for extracted credentials.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable, aligned output.
    Pretty,
    /// Structured JSON.
    Json,
    /// One colon-separated line per record.
    Grep,
}

/// Where and how results are delivered.
#[derive(Clone, Debug)]
pub struct ReportOptions {
    pub format: ReportFormat,
    /// Optional file the rendered report is also appended to.
    pub outfile: Option<PathBuf>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            format: ReportFormat::Pretty,
            outfile: None,
        }
    }
}
