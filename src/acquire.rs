//! Dump collaborator: triggers snapshot creation on the target and
//! retrieves a local copy.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::anyhow;
use log::debug;

use crate::options::AcquisitionOptions;
use crate::outcome::{ErrorKind, Outcome};
use crate::session::Session;

/// Produces a process-memory snapshot on the target and transfers it
/// locally. Requires an open session with confirmed privilege.
pub trait Acquirer: Send {
    /// Trigger remote acquisition and transfer the artifact. On success a
    /// snapshot reference is recorded and exposed through [`snapshot`].
    /// Never leaves a partially transferred local file behind on failure.
    ///
    /// [`snapshot`]: Acquirer::snapshot
    fn acquire(&mut self, session: &mut dyn Session, options: &AcquisitionOptions) -> Outcome;

    /// Local path of the acquired snapshot, if any.
    fn snapshot(&self) -> Option<&Path>;

    /// Remove the remote artifact if one was ever created. Idempotent, and
    /// a no-op when `acquire` never ran or failed before creating it.
    fn cleanup(&mut self, session: &mut dyn Session) -> Outcome;
}

/// Acquirer that runs a configured command on the target and pulls the
/// resulting file back over the session. Which tool produces the snapshot
/// is entirely configuration.
#[derive(Default)]
pub struct CommandAcquirer {
    remote_artifact: Option<String>,
    snapshot: Option<PathBuf>,
}

impl CommandAcquirer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Acquirer for CommandAcquirer {
    fn acquire(&mut self, session: &mut dyn Session, options: &AcquisitionOptions) -> Outcome {
        if options.dump_command.is_empty() {
            return Outcome::failure_with(
                ErrorKind::DumpFailure,
                anyhow!("no dump command configured"),
            );
        }

        let command = options.render_command();
        let remote_path = options.remote_path();
        debug!("running dump command: {command}");

        session.set_timeout(Some(options.timeout));
        let started = Instant::now();
        let result = session.exec(&command);
        session.set_timeout(None);

        // the tool may have created the artifact even when it failed, so the
        // remote path is recorded before any early return
        self.remote_artifact = Some(remote_path.clone());

        match result {
            Ok(output) if output.exit_status == 0 => {}
            Ok(output) => {
                return Outcome::failure_with(
                    ErrorKind::DumpFailure,
                    anyhow!(
                        "dump command exited with status {}: {}",
                        output.exit_status,
                        output.stderr.trim()
                    ),
                );
            }
            Err(e) => {
                let kind = if started.elapsed() >= options.timeout {
                    ErrorKind::TimeoutFailure
                } else {
                    ErrorKind::DumpFailure
                };
                return Outcome::failure_with(kind, e);
            }
        }

        let local = options.local_path();
        if let Some(parent) = local.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                return Outcome::failure_with(ErrorKind::TransferFailure, e);
            }
        }
        match session.download(&remote_path, &local) {
            Ok(bytes) => {
                debug!("transferred {bytes} bytes to {}", local.display());
                self.snapshot = Some(local);
                Outcome::success()
            }
            Err(e) => {
                // never leave a partially transferred file behind
                let _ = fs::remove_file(&local);
                Outcome::failure_with(ErrorKind::TransferFailure, e)
            }
        }
    }

    fn snapshot(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    fn cleanup(&mut self, session: &mut dyn Session) -> Outcome {
        let Some(remote) = self.remote_artifact.take() else {
            return Outcome::success();
        };
        match session.remove_remote(&remote) {
            Ok(()) => Outcome::success(),
            Err(e) => Outcome::failure_with(ErrorKind::DumpFailure, e),
        }
    }
}
