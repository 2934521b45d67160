use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use crate::constants::{DEFAULT_PORT, DEFAULT_REMOTE_DIR, DEFAULT_TIMEOUT_SECS};
use crate::models::{CredentialMaterial, Target};
use crate::options::{AcquisitionOptions, ExtractionOptions, ReportFormat, ReportOptions};
use crate::pipeline::PipelineOptions;

/// Command-line arguments for the memory-triage tool.
///
/// Options fall into four groups: targets and credentials, snapshot
/// acquisition, snapshot parsing, and reporting. All option bundles are
/// resolved once, before any pipeline starts.
#[derive(Parser, Debug)]
#[clap(name = "memtriage", about = "Remote process-memory snapshot triage")]
pub struct Args {
    /// Target hosts. An entry naming an existing file is expanded to one
    /// host per line (blank lines and '#' comments skipped)
    #[clap(required = true)]
    pub targets: Vec<String>,

    /// Authentication domain
    #[clap(short, long, default_value = "")]
    pub domain: String,

    /// Username used to authenticate against every target
    #[clap(short, long)]
    pub username: String,

    /// Password used to authenticate
    #[clap(short, long, conflicts_with = "hash")]
    pub password: Option<String>,

    /// Pre-computed authentication hash used instead of a password
    #[clap(short = 'H', long, conflicts_with = "password")]
    pub hash: Option<String>,

    /// Transport port on the targets
    #[clap(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Command executed on the target to produce the snapshot
    /// ({output} expands to the remote snapshot path)
    #[clap(long)]
    pub dump_command: String,

    /// File name of the snapshot on the target (default: timestamped)
    #[clap(long)]
    pub dump_name: Option<String>,

    /// Remote directory the snapshot is written to
    #[clap(long, default_value = DEFAULT_REMOTE_DIR)]
    pub remote_dir: String,

    /// Local directory snapshots are transferred into (default: system temp)
    #[clap(long)]
    pub local_dir: Option<PathBuf>,

    /// Acquisition timeout in seconds
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Command run locally to parse the snapshot ({snapshot} expands to the
    /// local snapshot path; stdout must be a JSON array of records)
    #[clap(long)]
    pub parse_command: String,

    /// Keep every parsed record, including records with no secret
    #[clap(long)]
    pub raw: bool,

    /// Print results as JSON
    #[clap(long, conflicts_with = "grep")]
    pub json: bool,

    /// Print results in a grep-friendly format
    #[clap(long, conflicts_with = "json")]
    pub grep: bool,

    /// Also append results to this file
    #[clap(short, long)]
    pub outfile: Option<PathBuf>,

    /// Verbose logging
    #[clap(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[clap(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// The credential material shared by every target of this run.
    pub fn credential_material(&self) -> Result<CredentialMaterial> {
        match (&self.password, &self.hash) {
            (Some(password), None) => Ok(CredentialMaterial::Password(password.clone())),
            (None, Some(hash)) => Ok(CredentialMaterial::Hash(hash.clone())),
            (None, None) => bail!("either --password or --hash is required"),
            (Some(_), Some(_)) => bail!("--password and --hash are mutually exclusive"),
        }
    }

    /// Expand the positional target entries into the ordered target list.
    pub fn resolve_targets(&self) -> Result<Vec<Target>> {
        let material = self.credential_material()?;
        let mut targets = Vec::new();
        for entry in &self.targets {
            let path = Path::new(entry);
            if path.is_file() {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("failed to read target file {entry}"))?;
                for line in contents.lines() {
                    let host = line.trim();
                    if host.is_empty() || host.starts_with('#') {
                        continue;
                    }
                    targets.push(Target::new(host, &self.domain, &self.username, material.clone()));
                }
            } else {
                targets.push(Target::new(entry, &self.domain, &self.username, material.clone()));
            }
        }
        Ok(targets)
    }

    pub fn report_format(&self) -> ReportFormat {
        if self.json {
            ReportFormat::Json
        } else if self.grep {
            ReportFormat::Grep
        } else {
            ReportFormat::Pretty
        }
    }

    /// Build the three option bundles for the run.
    pub fn pipeline_options(&self) -> PipelineOptions {
        let dump_name = self.dump_name.clone().unwrap_or_else(|| {
            format!("memdump-{}.dmp", chrono::Utc::now().format("%Y%m%d-%H%M%S"))
        });
        PipelineOptions {
            acquisition: AcquisitionOptions {
                dump_command: self.dump_command.clone(),
                dump_name,
                remote_dir: self.remote_dir.clone(),
                local_dir: self.local_dir.clone().unwrap_or_else(std::env::temp_dir),
                timeout: Duration::from_secs(self.timeout),
            },
            extraction: ExtractionOptions {
                parse_command: self.parse_command.clone(),
                raw: self.raw,
            },
            report: ReportOptions {
                format: self.report_format(),
                outfile: self.outfile.clone(),
            },
        }
    }
}
