//! Per-target staged pipeline with a guaranteed cleanup protocol.
//!
//! Stages run in strict forward order (session, acquisition, extraction,
//! report) and the first failure short-circuits the rest. Whatever the exit
//! path (success, staged failure, operator interruption, or a fault caught
//! at the boundary), cleanup runs exactly once, in reverse acquisition
//! order, and a failing cleanup step never masks the pipeline's real result.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::anyhow;

use crate::acquire::{Acquirer, CommandAcquirer};
use crate::extract::{CommandExtractor, Extractor};
use crate::logger::TargetLogger;
use crate::models::Target;
use crate::options::{AcquisitionOptions, ExtractionOptions, ReportOptions};
use crate::outcome::{ErrorKind, Outcome};
use crate::report::{ConsoleReporter, Reporter};
use crate::session::{Session, SshSession};

/// Cooperative interruption flag shared by every pipeline in a run.
///
/// Pipelines observe it at stage boundaries: once tripped, forward progress
/// stops and cleanup runs before the pipeline yields.
#[derive(Clone, Debug, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trip(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_tripped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Builds the collaborators a pipeline drives for one target.
///
/// The pipeline requests each collaborator right before its stage, so the
/// cleanup protocol covers exactly what was constructed.
pub trait CollaboratorFactory: Send + Sync {
    fn session(&self, target: &Target) -> Box<dyn Session>;
    fn acquirer(&self, target: &Target) -> Box<dyn Acquirer>;
    fn extractor(&self, target: &Target) -> Box<dyn Extractor>;
    fn reporter(&self, target: &Target) -> Box<dyn Reporter>;
}

/// Factory wiring the shipped collaborators: SSH transport, command-driven
/// acquisition and parsing, console reporting.
pub struct DefaultFactory {
    port: u16,
}

impl DefaultFactory {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

impl CollaboratorFactory for DefaultFactory {
    fn session(&self, target: &Target) -> Box<dyn Session> {
        Box::new(SshSession::new(target.clone(), self.port))
    }

    fn acquirer(&self, _target: &Target) -> Box<dyn Acquirer> {
        Box::new(CommandAcquirer::new())
    }

    fn extractor(&self, _target: &Target) -> Box<dyn Extractor> {
        Box::new(CommandExtractor::new())
    }

    fn reporter(&self, _target: &Target) -> Box<dyn Reporter> {
        Box::new(ConsoleReporter::new())
    }
}

/// The three option bundles, shared read-only by every pipeline.
#[derive(Clone, Debug, Default)]
pub struct PipelineOptions {
    pub acquisition: AcquisitionOptions,
    pub extraction: ExtractionOptions,
    pub report: ReportOptions,
}

/// Drives one target through every stage with guaranteed cleanup.
pub struct Pipeline {
    target: Target,
    options: Arc<PipelineOptions>,
    factory: Arc<dyn CollaboratorFactory>,
    interrupt: InterruptFlag,
    log: TargetLogger,
    session: Option<Box<dyn Session>>,
    acquirer: Option<Box<dyn Acquirer>>,
    extractor: Option<Box<dyn Extractor>>,
    snapshot: Option<PathBuf>,
    cleaned: bool,
}

impl Pipeline {
    pub fn new(
        target: Target,
        options: Arc<PipelineOptions>,
        factory: Arc<dyn CollaboratorFactory>,
        interrupt: InterruptFlag,
        log: TargetLogger,
    ) -> Self {
        Self {
            target,
            options,
            factory,
            interrupt,
            log,
            session: None,
            acquirer: None,
            extractor: None,
            snapshot: None,
            cleaned: false,
        }
    }

    /// Run every stage, then the cleanup protocol.
    ///
    /// The returned outcome is that of the first failing stage, or success
    /// when all stages completed. A fault escaping a stage is captured and
    /// reported as `Undefined`; it never crosses the pipeline boundary, so
    /// one target's fault cannot take down another target's pipeline.
    pub fn run(&mut self) -> Outcome {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.advance())) {
            Ok(outcome) => outcome,
            Err(payload) => Outcome::failure_with(
                ErrorKind::Undefined,
                anyhow!("pipeline fault: {}", panic_message(&payload)),
            ),
        };
        self.clean();
        self.report_terminal(&outcome);
        outcome
    }

    fn advance(&mut self) -> Outcome {
        let stages: [fn(&mut Self) -> Outcome; 4] =
            [Self::connect, Self::dump, Self::parse, Self::write];
        for stage in stages {
            if self.interrupt.is_tripped() {
                return Outcome::failure(ErrorKind::UserInterruption);
            }
            let result = stage(self);
            if !result.is_success() {
                return result;
            }
        }
        Outcome::success()
    }

    /// Idle -> Connected.
    fn connect(&mut self) -> Outcome {
        let mut session = self.factory.session(&self.target);
        let result = session.open();
        // kept even when opening failed: close is idempotent and the
        // cleanup protocol settles it exactly once
        self.session = Some(session);
        if !result.is_success() {
            return result;
        }
        self.log.info("Authenticated");
        Outcome::success()
    }

    /// Connected -> Dumped.
    fn dump(&mut self) -> Outcome {
        let Some(session) = self.session.as_mut() else {
            return Outcome::failure_with(ErrorKind::Undefined, anyhow!("no session"));
        };
        let privileged = session.has_privilege();
        if !privileged.is_success() {
            // nothing remote was touched yet, release the session right away
            let closed = session.close();
            if !closed.is_success() {
                self.log.warn(&format!("Session close failed: {closed}"));
            }
            return privileged;
        }

        let mut acquirer = self.factory.acquirer(&self.target);
        let result = acquirer.acquire(session.as_mut(), &self.options.acquisition);
        self.snapshot = acquirer.snapshot().map(|p| p.to_path_buf());
        self.acquirer = Some(acquirer);
        if !result.is_success() {
            return result;
        }
        self.log.info("Memory snapshot acquired");
        Outcome::success()
    }

    /// Dumped -> Parsed.
    fn parse(&mut self) -> Outcome {
        let Some(snapshot) = self.snapshot.clone() else {
            return Outcome::failure_with(ErrorKind::Undefined, anyhow!("no snapshot reference"));
        };
        let mut extractor = self.factory.extractor(&self.target);
        let result = extractor.extract(&snapshot, &self.options.extraction);
        self.extractor = Some(extractor);
        if !result.is_success() {
            return result;
        }
        self.log.info("Memory snapshot parsed");
        Outcome::success()
    }

    /// Parsed -> Written.
    fn write(&mut self) -> Outcome {
        let credentials = match self.extractor.as_ref().and_then(|e| e.credentials()) {
            Some(credentials) => credentials.clone(),
            None => {
                return Outcome::failure_with(ErrorKind::Undefined, anyhow!("no credential set"))
            }
        };
        let mut reporter = self.factory.reporter(&self.target);
        reporter.write(&credentials, &self.target.host, &self.options.report)
    }

    /// Cleanup protocol: reverse acquisition order, each step attempted
    /// independently, failures demoted to warnings so they never mask the
    /// pipeline's real result or block the remaining steps.
    fn clean(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;

        if let Some(snapshot) = self.snapshot.take() {
            // the extractor owns snapshot deletion; when parsing never
            // started, a fresh instance performs the same idempotent removal
            let mut extractor = match self.extractor.take() {
                Some(extractor) => extractor,
                None => self.factory.extractor(&self.target),
            };
            let result = extractor.cleanup(&snapshot);
            if !result.is_success() {
                self.log.warn(&format!("Snapshot cleanup failed: {result}"));
            }
        }

        if let Some(mut acquirer) = self.acquirer.take() {
            match self.session.as_mut() {
                Some(session) => {
                    let result = acquirer.cleanup(session.as_mut());
                    if !result.is_success() {
                        self.log
                            .warn(&format!("Remote artifact cleanup failed: {result}"));
                    }
                }
                None => self.log.warn("Remote artifact cleanup skipped: no session"),
            }
        }

        if let Some(session) = self.session.as_mut() {
            let result = session.close();
            if !result.is_success() {
                self.log.warn(&format!("Session close failed: {result}"));
            }
        }

        self.log.info("Cleaning complete");
    }

    fn report_terminal(&self, outcome: &Outcome) {
        match outcome.code() {
            ErrorKind::Success => self.log.info("Target processed"),
            ErrorKind::UserInterruption => self.log.warn("Interrupted, stopping this target"),
            _ => self.log.error(&outcome.to_string()),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
