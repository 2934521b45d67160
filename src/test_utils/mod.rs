//! Test utilities: scripted collaborators and a shared call log.
//!
//! The scripted set records every collaborator call in order, tagged by
//! target host, so tests can assert exact stage and cleanup sequences.

#![cfg(test)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};

use crate::acquire::Acquirer;
use crate::extract::Extractor;
use crate::models::{Credential, CredentialMaterial, CredentialSet, Target};
use crate::options::{AcquisitionOptions, ExtractionOptions, ReportOptions};
use crate::outcome::{ErrorKind, Outcome};
use crate::pipeline::{CollaboratorFactory, InterruptFlag};
use crate::report::Reporter;
use crate::session::{ExecOutput, Session};

/// Shared, ordered record of collaborator calls across a run.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }
}

pub fn test_target(host: &str) -> Target {
    Target::new(
        host,
        "CORP",
        "tester",
        CredentialMaterial::Password("hunter2".to_string()),
    )
}

pub fn test_credentials() -> CredentialSet {
    vec![
        Credential {
            ssp: "wdigest".to_string(),
            domain: "CORP".to_string(),
            username: "alice".to_string(),
            password: Some("hunter2".to_string()),
            hash: None,
        },
        Credential {
            ssp: "msv".to_string(),
            domain: "CORP".to_string(),
            username: "bob".to_string(),
            password: None,
            hash: Some("31d6cfe0d16ae931".to_string()),
        },
    ]
}

/// What a scripted run should do at each stage. `None` means succeed.
#[derive(Clone, Default)]
pub struct ScriptedPlan {
    pub open: Option<ErrorKind>,
    pub privilege: Option<ErrorKind>,
    pub acquire: Option<ErrorKind>,
    pub extract: Option<ErrorKind>,
    pub write: Option<ErrorKind>,
    /// Panic inside the extract stage instead of returning an outcome.
    pub panic_in_extract: bool,
    /// Trip this flag while the acquire stage runs, simulating an operator
    /// interruption arriving mid-acquisition.
    pub trip_during_acquire: Option<InterruptFlag>,
    /// Exit status reported for remote commands.
    pub exec_exit_status: i32,
    /// Make remote commands fail with a transport error.
    pub exec_error: bool,
    /// Stall remote commands before they respond.
    pub exec_delay: Option<Duration>,
    /// Make downloads write a partial file and then fail.
    pub download_error: bool,
}

pub struct ScriptedSession {
    host: String,
    plan: ScriptedPlan,
    log: CallLog,
}

impl ScriptedSession {
    pub fn new(host: &str, plan: ScriptedPlan, log: CallLog) -> Self {
        Self {
            host: host.to_string(),
            plan,
            log,
        }
    }
}

impl Session for ScriptedSession {
    fn open(&mut self) -> Outcome {
        self.log.push(format!("{}:open", self.host));
        match self.plan.open {
            Some(kind) => Outcome::failure(kind),
            None => Outcome::success(),
        }
    }

    fn has_privilege(&mut self) -> Outcome {
        self.log.push(format!("{}:has_privilege", self.host));
        match self.plan.privilege {
            Some(kind) => Outcome::failure(kind),
            None => Outcome::success(),
        }
    }

    fn close(&mut self) -> Outcome {
        self.log.push(format!("{}:close", self.host));
        Outcome::success()
    }

    fn exec(&mut self, _command: &str) -> Result<ExecOutput> {
        self.log.push(format!("{}:exec", self.host));
        if let Some(delay) = self.plan.exec_delay {
            std::thread::sleep(delay);
        }
        if self.plan.exec_error {
            bail!("scripted transport error");
        }
        Ok(ExecOutput {
            exit_status: self.plan.exec_exit_status,
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    fn download(&mut self, _remote: &str, local: &Path) -> Result<u64> {
        self.log.push(format!("{}:download", self.host));
        fs::write(local, b"scripted snapshot")?;
        if self.plan.download_error {
            bail!("scripted transfer error");
        }
        Ok(17)
    }

    fn remove_remote(&mut self, _remote: &str) -> Result<()> {
        self.log.push(format!("{}:remove_remote", self.host));
        Ok(())
    }

    fn set_timeout(&mut self, _timeout: Option<Duration>) {}
}

pub struct ScriptedAcquirer {
    host: String,
    plan: ScriptedPlan,
    log: CallLog,
    snapshot: Option<PathBuf>,
}

impl Acquirer for ScriptedAcquirer {
    fn acquire(&mut self, _session: &mut dyn Session, _options: &AcquisitionOptions) -> Outcome {
        self.log.push(format!("{}:acquire", self.host));
        if let Some(flag) = &self.plan.trip_during_acquire {
            flag.trip();
        }
        match self.plan.acquire {
            Some(kind) => Outcome::failure(kind),
            None => {
                self.snapshot = Some(PathBuf::from(format!("/tmp/{}.scripted.dmp", self.host)));
                Outcome::success()
            }
        }
    }

    fn snapshot(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    fn cleanup(&mut self, _session: &mut dyn Session) -> Outcome {
        self.log.push(format!("{}:acquirer_cleanup", self.host));
        Outcome::success()
    }
}

pub struct ScriptedExtractor {
    host: String,
    plan: ScriptedPlan,
    log: CallLog,
    credentials: Option<CredentialSet>,
}

impl Extractor for ScriptedExtractor {
    fn extract(&mut self, _snapshot: &Path, _options: &ExtractionOptions) -> Outcome {
        self.log.push(format!("{}:extract", self.host));
        if self.plan.panic_in_extract {
            panic!("scripted fault");
        }
        match self.plan.extract {
            Some(kind) => Outcome::failure(kind),
            None => {
                self.credentials = Some(test_credentials());
                Outcome::success()
            }
        }
    }

    fn credentials(&self) -> Option<&CredentialSet> {
        self.credentials.as_ref()
    }

    fn cleanup(&mut self, _snapshot: &Path) -> Outcome {
        self.log.push(format!("{}:extractor_cleanup", self.host));
        Outcome::success()
    }
}

pub struct ScriptedReporter {
    host: String,
    plan: ScriptedPlan,
    log: CallLog,
}

impl Reporter for ScriptedReporter {
    fn write(
        &mut self,
        _credentials: &CredentialSet,
        _host: &str,
        _options: &ReportOptions,
    ) -> Outcome {
        self.log.push(format!("{}:write", self.host));
        match self.plan.write {
            Some(kind) => Outcome::failure(kind),
            None => Outcome::success(),
        }
    }
}

/// Factory handing out scripted collaborators, with per-host plan overrides.
pub struct ScriptedFactory {
    pub log: CallLog,
    default_plan: ScriptedPlan,
    plans: HashMap<String, ScriptedPlan>,
}

impl ScriptedFactory {
    pub fn new(plan: ScriptedPlan) -> Self {
        Self::with_plans(plan, HashMap::new())
    }

    pub fn with_plans(default_plan: ScriptedPlan, plans: HashMap<String, ScriptedPlan>) -> Self {
        Self {
            log: CallLog::new(),
            default_plan,
            plans,
        }
    }

    fn plan_for(&self, host: &str) -> ScriptedPlan {
        self.plans.get(host).unwrap_or(&self.default_plan).clone()
    }
}

impl CollaboratorFactory for ScriptedFactory {
    fn session(&self, target: &Target) -> Box<dyn Session> {
        Box::new(ScriptedSession::new(
            &target.host,
            self.plan_for(&target.host),
            self.log.clone(),
        ))
    }

    fn acquirer(&self, target: &Target) -> Box<dyn Acquirer> {
        Box::new(ScriptedAcquirer {
            host: target.host.clone(),
            plan: self.plan_for(&target.host),
            log: self.log.clone(),
            snapshot: None,
        })
    }

    fn extractor(&self, target: &Target) -> Box<dyn Extractor> {
        Box::new(ScriptedExtractor {
            host: target.host.clone(),
            plan: self.plan_for(&target.host),
            log: self.log.clone(),
            credentials: None,
        })
    }

    fn reporter(&self, target: &Target) -> Box<dyn Reporter> {
        Box::new(ScriptedReporter {
            host: target.host.clone(),
            plan: self.plan_for(&target.host),
            log: self.log.clone(),
        })
    }
}
