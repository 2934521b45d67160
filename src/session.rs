//! Remote session collaborator: an authenticated connection to one target.
//!
//! `open`, `has_privilege` and `close` are the staged operations the
//! pipeline drives; the transfer helpers are the surface the acquirer uses
//! for remote commands and file retrieval. The shipped implementation rides
//! SSH; the trait keeps the transport pluggable.

use std::fs;
use std::io::{self, Read};
use std::net::TcpStream;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::debug;

use crate::constants::CONNECT_TIMEOUT_SECS;
use crate::models::{CredentialMaterial, Target};
use crate::outcome::{ErrorKind, Outcome};

// libssh2 sftp status for a missing remote file
const SFTP_NO_SUCH_FILE: i32 = 2;

/// Output of a remote command executed through a session.
#[derive(Clone, Debug)]
pub struct ExecOutput {
    pub exit_status: i32,
    pub stdout: String,
    pub stderr: String,
}

/// An authenticated remote connection to one target.
pub trait Session: Send {
    /// Authenticate to the target. Returns `AuthFailure` on bad
    /// credentials, `ConnectFailure` on transport errors. Holds an open
    /// connection handle on success.
    fn open(&mut self) -> Outcome;

    /// Whether the authenticated identity may acquire process memory.
    /// Does not mutate connection state.
    fn has_privilege(&mut self) -> Outcome;

    /// Close the connection. Idempotent: closing an already-closed or
    /// never-opened session succeeds without side effects.
    fn close(&mut self) -> Outcome;

    /// Run a command on the target and wait for it to finish.
    fn exec(&mut self, command: &str) -> Result<ExecOutput>;

    /// Copy a remote file to a local path, returning the bytes transferred.
    fn download(&mut self, remote: &str, local: &Path) -> Result<u64>;

    /// Delete a remote file. Deleting a file that does not exist succeeds.
    fn remove_remote(&mut self, remote: &str) -> Result<()>;

    /// Bound subsequent blocking operations; `None` removes the bound.
    fn set_timeout(&mut self, _timeout: Option<Duration>) {}
}

/// SSH-backed session.
pub struct SshSession {
    target: Target,
    port: u16,
    handle: Option<ssh2::Session>,
}

impl SshSession {
    pub fn new(target: Target, port: u16) -> Self {
        Self {
            target,
            port,
            handle: None,
        }
    }

    fn handle(&mut self) -> Result<&mut ssh2::Session> {
        self.handle
            .as_mut()
            .ok_or_else(|| anyhow!("session to {} is not open", self.target.host))
    }
}

impl Session for SshSession {
    fn open(&mut self) -> Outcome {
        let addr = format!("{}:{}", self.target.host, self.port);
        let tcp = match TcpStream::connect(&addr) {
            Ok(tcp) => tcp,
            Err(e) => {
                return Outcome::failure_with(
                    ErrorKind::ConnectFailure,
                    anyhow!(e).context(format!("failed to connect to {addr}")),
                )
            }
        };

        let mut session = match ssh2::Session::new() {
            Ok(session) => session,
            Err(e) => return Outcome::failure_with(ErrorKind::ConnectFailure, e),
        };
        session.set_tcp_stream(tcp);
        // bound the handshake and authentication; lifted again once open
        session.set_timeout((CONNECT_TIMEOUT_SECS * 1000) as u32);

        if let Err(e) = session.handshake() {
            return Outcome::failure_with(
                ErrorKind::ConnectFailure,
                anyhow!(e).context(format!("handshake with {addr} failed")),
            );
        }

        let auth = match &self.target.material {
            CredentialMaterial::Password(password) => {
                session.userauth_password(&self.target.username, password)
            }
            CredentialMaterial::Hash(_) => {
                return Outcome::failure_with(
                    ErrorKind::AuthFailure,
                    anyhow!("this transport authenticates with passwords only"),
                )
            }
        };
        if let Err(e) = auth {
            return Outcome::failure_with(
                ErrorKind::AuthFailure,
                anyhow!(e).context(format!(
                    "authentication as {} failed",
                    self.target.username
                )),
            );
        }
        if !session.authenticated() {
            return Outcome::failure_with(ErrorKind::AuthFailure, anyhow!("authentication rejected"));
        }

        session.set_timeout(0);
        debug!("session to {addr} established");
        self.handle = Some(session);
        Outcome::success()
    }

    fn has_privilege(&mut self) -> Outcome {
        let output = match self.exec("id -u") {
            Ok(output) => output,
            Err(e) => return Outcome::failure_with(ErrorKind::PrivilegeFailure, e),
        };
        let uid = output.stdout.trim();
        if output.exit_status == 0 && uid == "0" {
            Outcome::success()
        } else {
            Outcome::failure_with(
                ErrorKind::PrivilegeFailure,
                anyhow!("authenticated identity has uid {uid}, acquisition requires root"),
            )
        }
    }

    fn close(&mut self) -> Outcome {
        match self.handle.take() {
            Some(session) => match session.disconnect(None, "closing session", None) {
                Ok(()) => Outcome::success(),
                Err(e) => Outcome::failure_with(ErrorKind::ConnectFailure, e),
            },
            None => Outcome::success(),
        }
    }

    fn exec(&mut self, command: &str) -> Result<ExecOutput> {
        let session = self.handle()?;
        let mut channel = session
            .channel_session()
            .context("failed to open command channel")?;
        channel
            .exec(command)
            .with_context(|| format!("failed to start remote command: {command}"))?;

        let mut stdout = String::new();
        channel
            .read_to_string(&mut stdout)
            .context("failed to read remote command output")?;
        let mut stderr = String::new();
        channel
            .stderr()
            .read_to_string(&mut stderr)
            .context("failed to read remote command errors")?;

        channel.wait_close().context("failed to close channel")?;
        let exit_status = channel
            .exit_status()
            .context("failed to read remote exit status")?;

        Ok(ExecOutput {
            exit_status,
            stdout,
            stderr,
        })
    }

    fn download(&mut self, remote: &str, local: &Path) -> Result<u64> {
        let session = self.handle()?;
        let sftp = session.sftp().context("failed to open sftp subsystem")?;
        let mut remote_file = sftp
            .open(Path::new(remote))
            .with_context(|| format!("failed to open remote file {remote}"))?;
        let mut local_file = fs::File::create(local)
            .with_context(|| format!("failed to create {}", local.display()))?;
        let bytes = io::copy(&mut remote_file, &mut local_file)
            .with_context(|| format!("transfer of {remote} failed"))?;
        Ok(bytes)
    }

    fn remove_remote(&mut self, remote: &str) -> Result<()> {
        let session = self.handle()?;
        let sftp = session.sftp().context("failed to open sftp subsystem")?;
        match sftp.unlink(Path::new(remote)) {
            Ok(()) => Ok(()),
            // already gone counts as removed
            Err(e) if e.code() == ssh2::ErrorCode::SFTP(SFTP_NO_SUCH_FILE) => Ok(()),
            Err(e) => Err(anyhow!(e).context(format!("failed to remove remote file {remote}"))),
        }
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        if let Some(session) = &self.handle {
            let ms = timeout
                .map(|t| t.as_millis().min(u32::MAX as u128) as u32)
                .unwrap_or(0);
            session.set_timeout(ms);
        }
    }
}
