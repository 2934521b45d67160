//! Run coordinator: fans out one pipeline per target and joins them all.

use std::sync::Arc;
use std::thread;

use log::{info, warn};

use crate::constants::{EXIT_FAILURE, EXIT_INTERRUPTED, EXIT_SUCCESS, EXIT_UNDEFINED};
use crate::logger::{alignment_width, TargetLogger};
use crate::models::Target;
use crate::outcome::ErrorKind;
use crate::pipeline::{CollaboratorFactory, InterruptFlag, Pipeline, PipelineOptions};

/// Terminal state of one target's pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetResult {
    pub host: String,
    pub code: ErrorKind,
}

/// Results of a full run, one entry per target in input order.
///
/// There is no cross-target aggregation beyond the process exit status:
/// each pipeline reports its own terminal code.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub results: Vec<TargetResult>,
}

impl RunSummary {
    pub fn all_done(&self) -> bool {
        self.results.iter().all(|r| r.code == ErrorKind::Success)
    }

    /// Process exit status. Success, operator interruption and undefined
    /// faults stay mutually distinguishable; when codes are mixed,
    /// interruption takes precedence over an undefined fault, which takes
    /// precedence over stage failures.
    pub fn exit_code(&self) -> i32 {
        let any = |kind: ErrorKind| self.results.iter().any(|r| r.code == kind);
        if any(ErrorKind::UserInterruption) {
            EXIT_INTERRUPTED
        } else if any(ErrorKind::Undefined) {
            EXIT_UNDEFINED
        } else if self.all_done() {
            EXIT_SUCCESS
        } else {
            EXIT_FAILURE
        }
    }
}

/// Launches one independent pipeline per target and waits for all of them.
pub struct Coordinator {
    targets: Vec<Target>,
    options: Arc<PipelineOptions>,
    factory: Arc<dyn CollaboratorFactory>,
    interrupt: InterruptFlag,
}

impl Coordinator {
    pub fn new(
        targets: Vec<Target>,
        options: PipelineOptions,
        factory: Arc<dyn CollaboratorFactory>,
        interrupt: InterruptFlag,
    ) -> Self {
        Self {
            targets,
            options: Arc::new(options),
            factory,
            interrupt,
        }
    }

    /// Run every pipeline to a terminal state and collect the summary.
    ///
    /// One pipeline per target, each on its own thread with exclusive
    /// ownership of its session, snapshot and credentials; one target's
    /// failure never short-circuits another's pipeline. Blocks until every
    /// spawned pipeline has finished.
    pub fn run(self) -> RunSummary {
        // the alignment width needs the full target list, so it is computed
        // once here and shared read-only with every pipeline's logger
        let width = alignment_width(&self.targets);
        info!("Processing {} target(s)", self.targets.len());

        let mut handles = Vec::with_capacity(self.targets.len());
        for target in self.targets {
            let options = Arc::clone(&self.options);
            let factory = Arc::clone(&self.factory);
            let interrupt = self.interrupt.clone();
            let log = TargetLogger::new(&target.host, width);
            let host = target.host.clone();
            let handle = thread::spawn(move || {
                Pipeline::new(target, options, factory, interrupt, log)
                    .run()
                    .code()
            });
            handles.push((host, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (host, handle) in handles {
            let code = match handle.join() {
                Ok(code) => code,
                // the pipeline catches faults itself; a poisoned join is a
                // fault in the harness around it
                Err(_) => {
                    warn!("pipeline thread for {host} terminated abnormally");
                    ErrorKind::Undefined
                }
            };
            results.push(TargetResult { host, code });
        }
        RunSummary { results }
    }
}
