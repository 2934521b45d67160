//! # memtriage
//!
//! An orchestration engine for multi-stage remote memory triage: acquire a
//! process-memory snapshot on each target host, transfer it back, parse it
//! locally, and report what was recovered.
//!
//! ## Overview
//!
//! memtriage runs one independent pipeline per target host. Each pipeline
//! walks four stages in order (connect, dump, parse, write), stops at the
//! first failure, and always finishes with a cleanup pass that releases the
//! remote artifact, the local snapshot, and the transport session. The
//! mechanics of each stage are collaborators behind traits, so transports
//! and acquisition techniques are swappable without touching the
//! orchestration.
//!
//! ## Features
//!
//! - **Staged pipelines**: strict connect/dump/parse/write ordering with
//!   short-circuit on failure
//! - **Guaranteed cleanup**: remote artifacts, local snapshots and sessions
//!   are released exactly once, in reverse acquisition order, on every path
//! - **Parallel targets**: one thread per target, no shared mutable state
//! - **Interruption handling**: a Ctrl-C trips a shared flag; pipelines stop
//!   at the next stage boundary and still clean up
//! - **Uniform outcomes**: every stage reports the same result shape, and
//!   the process exit code distinguishes success, failure, faults and
//!   interruption
//! - **Pluggable reporting**: pretty, JSON, or grep-friendly output, with an
//!   optional append-to-file sink
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use memtriage::coordinator::Coordinator;
//! use memtriage::models::{CredentialMaterial, Target};
//! use memtriage::pipeline::{DefaultFactory, InterruptFlag, PipelineOptions};
//!
//! let targets = vec![Target::new(
//!     "srv01",
//!     "CORP",
//!     "admin",
//!     CredentialMaterial::Password("hunter2".to_string()),
//! )];
//!
//! let summary = Coordinator::new(
//!     targets,
//!     PipelineOptions::default(),
//!     Arc::new(DefaultFactory::new(22)),
//!     InterruptFlag::new(),
//! )
//! .run();
//!
//! std::process::exit(summary.exit_code());
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`models`]: Targets, credential material and extracted records
//! - [`outcome`]: The uniform stage result and its closed code set
//! - [`options`]: Per-stage option bundles, resolved once per run
//! - [`pipeline`]: The staged per-target pipeline and collaborator factory
//! - [`coordinator`]: Thread-per-target fan-out and run summary
//! - [`session`]: Transport trait and the SSH implementation
//! - [`acquire`]: Snapshot acquisition on the target and transfer back
//! - [`extract`]: Local snapshot parsing into credential records
//! - [`report`]: Rendering and delivery of results
//! - [`logger`]: Host-prefixed, column-aligned logging
//! - [`constants`]: Application-wide constants

pub mod acquire;
pub mod cli;
pub mod constants;
pub mod coordinator;
pub mod extract;
pub mod logger;
pub mod models;
pub mod options;
pub mod outcome;
pub mod pipeline;
pub mod report;
pub mod session;

#[cfg(test)]
pub mod test_utils;
