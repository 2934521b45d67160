//! Parse collaborator: recovers credential records from a local snapshot.

use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;

use anyhow::anyhow;
use log::debug;

use crate::models::CredentialSet;
use crate::options::ExtractionOptions;
use crate::outcome::{ErrorKind, Outcome};

/// Extracts structured credential records from a local memory snapshot.
pub trait Extractor: Send {
    /// Parse the snapshot. Returns `ParseFailure` on malformed or
    /// unreadable input. The snapshot file itself is never modified.
    fn extract(&mut self, snapshot: &Path, options: &ExtractionOptions) -> Outcome;

    /// Records recovered by the last successful `extract`.
    fn credentials(&self) -> Option<&CredentialSet>;

    /// Delete the local snapshot. Idempotent; succeeds when no file exists.
    fn cleanup(&mut self, snapshot: &Path) -> Outcome;
}

/// Extractor that delegates parsing to a configured local command emitting
/// credential records as a JSON array on stdout. Which parser understands
/// the snapshot format is entirely configuration.
#[derive(Default)]
pub struct CommandExtractor {
    credentials: Option<CredentialSet>,
}

impl CommandExtractor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Extractor for CommandExtractor {
    fn extract(&mut self, snapshot: &Path, options: &ExtractionOptions) -> Outcome {
        if options.parse_command.is_empty() {
            return Outcome::failure_with(
                ErrorKind::ParseFailure,
                anyhow!("no parse command configured"),
            );
        }
        if !snapshot.is_file() {
            return Outcome::failure_with(
                ErrorKind::ParseFailure,
                anyhow!("snapshot {} does not exist", snapshot.display()),
            );
        }

        let command = options
            .parse_command
            .replace("{snapshot}", &snapshot.display().to_string());
        debug!("running parse command: {command}");

        // arguments are split on whitespace; the snapshot path comes from
        // our own options, not from remote input
        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            return Outcome::failure_with(ErrorKind::ParseFailure, anyhow!("empty parse command"));
        };
        let output = match Command::new(program).args(parts).output() {
            Ok(output) => output,
            Err(e) => {
                return Outcome::failure_with(
                    ErrorKind::ParseFailure,
                    anyhow!(e).context(format!("failed to run parser {program}")),
                )
            }
        };
        if !output.status.success() {
            return Outcome::failure_with(
                ErrorKind::ParseFailure,
                anyhow!(
                    "parser exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            );
        }

        let records: CredentialSet = match serde_json::from_slice(&output.stdout) {
            Ok(records) => records,
            Err(e) => {
                return Outcome::failure_with(
                    ErrorKind::ParseFailure,
                    anyhow!(e).context("parser output is not a JSON array of credential records"),
                )
            }
        };
        let records = if options.raw {
            records
        } else {
            records.into_iter().filter(|c| c.has_secret()).collect()
        };

        debug!("parsed {} credential record(s)", records.len());
        self.credentials = Some(records);
        Outcome::success()
    }

    fn credentials(&self) -> Option<&CredentialSet> {
        self.credentials.as_ref()
    }

    fn cleanup(&mut self, snapshot: &Path) -> Outcome {
        match fs::remove_file(snapshot) {
            Ok(()) => Outcome::success(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Outcome::success(),
            Err(e) => Outcome::failure_with(ErrorKind::ParseFailure, e),
        }
    }
}
