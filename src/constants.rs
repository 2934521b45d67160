//! Application-wide constants.

/// Default port for the shipped SSH transport.
pub const DEFAULT_PORT: u16 = 22;

/// Default time allowed for the remote acquisition step, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Time allowed for connecting and authenticating, in seconds.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default directory on the target where snapshots are written.
pub const DEFAULT_REMOTE_DIR: &str = "/tmp";

// Process exit statuses. Success, operator interruption and undefined
// faults must stay mutually distinguishable at the process boundary.

/// Every pipeline reached its terminal `Done` state.
pub const EXIT_SUCCESS: i32 = 0;

/// At least one pipeline failed at a stage.
pub const EXIT_FAILURE: i32 = 1;

/// At least one pipeline ended with an undefined fault.
pub const EXIT_UNDEFINED: i32 = 2;

/// At least one pipeline was interrupted by the operator.
pub const EXIT_INTERRUPTED: i32 = 130;
