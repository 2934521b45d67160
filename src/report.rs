//! Write collaborator: renders extracted credentials in the configured
//! format and delivers them.

use std::fs::OpenOptions;
use std::io::{self, Write};

use anyhow::{Context, Result};

use crate::models::CredentialSet;
use crate::options::{ReportFormat, ReportOptions};
use crate::outcome::{ErrorKind, Outcome};

/// Renders and delivers a credential set. Pure with respect to the records:
/// nothing is added, dropped or reordered.
#[cfg_attr(test, mockall::automock)]
pub trait Reporter: Send {
    fn write(&mut self, credentials: &CredentialSet, host: &str, options: &ReportOptions) -> Outcome;
}

/// Render a credential set in the given format.
///
/// A pure function of its inputs; every record appears exactly once, in
/// input order.
pub fn render(credentials: &CredentialSet, host: &str, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Pretty => {
            let mut out = String::new();
            if credentials.is_empty() {
                out.push_str(&format!("{host}: no credentials recovered"));
            } else {
                out.push_str(&format!("Credentials for {host}:"));
                for record in credentials {
                    let secret = record
                        .password
                        .as_deref()
                        .or(record.hash.as_deref())
                        .unwrap_or("(no secret)");
                    out.push_str(&format!(
                        "\n  {}\\{} {} [{}]",
                        record.domain, record.username, secret, record.ssp
                    ));
                }
            }
            Ok(out)
        }
        ReportFormat::Json => {
            let value = serde_json::json!({
                "host": host,
                "credentials": credentials,
            });
            serde_json::to_string_pretty(&value).context("failed to serialize credentials")
        }
        ReportFormat::Grep => {
            let lines: Vec<String> = credentials
                .iter()
                .map(|record| {
                    format!(
                        "{}:{}:{}:{}:{}:{}",
                        host,
                        record.ssp,
                        record.domain,
                        record.username,
                        record.password.as_deref().unwrap_or(""),
                        record.hash.as_deref().unwrap_or("")
                    )
                })
                .collect();
            Ok(lines.join("\n"))
        }
    }
}

/// Reporter that prints to standard output and optionally appends the same
/// rendering to a file.
#[derive(Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for ConsoleReporter {
    fn write(&mut self, credentials: &CredentialSet, host: &str, options: &ReportOptions) -> Outcome {
        let rendered = match render(credentials, host, options.format) {
            Ok(rendered) => rendered,
            Err(e) => return Outcome::failure_with(ErrorKind::WriteFailure, e),
        };

        // one write per report keeps concurrent pipelines from interleaving
        {
            let mut stdout = io::stdout().lock();
            if let Err(e) = stdout
                .write_all(rendered.as_bytes())
                .and_then(|()| stdout.write_all(b"\n"))
            {
                return Outcome::failure_with(ErrorKind::WriteFailure, e);
            }
        }

        if let Some(path) = &options.outfile {
            let result = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .and_then(|mut file| {
                    file.write_all(rendered.as_bytes())?;
                    file.write_all(b"\n")
                });
            if let Err(e) = result {
                return Outcome::failure_with(
                    ErrorKind::WriteFailure,
                    anyhow::anyhow!(e).context(format!("failed to append to {}", path.display())),
                );
            }
        }

        Outcome::success()
    }
}
