use std::fmt;

use anyhow::Error;

/// Classification of a staged operation's result.
///
/// The set is closed: new kinds may be added over time, but an existing kind
/// never changes meaning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Success,
    ConnectFailure,
    AuthFailure,
    PrivilegeFailure,
    DumpFailure,
    TransferFailure,
    TimeoutFailure,
    ParseFailure,
    WriteFailure,
    UserInterruption,
    Undefined,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Success => "Success",
            ErrorKind::ConnectFailure => "ConnectFailure",
            ErrorKind::AuthFailure => "AuthFailure",
            ErrorKind::PrivilegeFailure => "PrivilegeFailure",
            ErrorKind::DumpFailure => "DumpFailure",
            ErrorKind::TransferFailure => "TransferFailure",
            ErrorKind::TimeoutFailure => "TimeoutFailure",
            ErrorKind::ParseFailure => "ParseFailure",
            ErrorKind::WriteFailure => "WriteFailure",
            ErrorKind::UserInterruption => "UserInterruption",
            ErrorKind::Undefined => "Undefined",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform result of every staged operation.
///
/// Success and failure travel through the same channel: no staged operation
/// returns a bare value on success and an error on failure. An `Outcome` is
/// immutable once constructed; `code == Success` iff the operation fully
/// completed, any other code means its side effects are partial or absent.
#[derive(Debug)]
pub struct Outcome {
    code: ErrorKind,
    cause: Option<Error>,
}

impl Outcome {
    pub fn success() -> Self {
        Self {
            code: ErrorKind::Success,
            cause: None,
        }
    }

    pub fn failure(code: ErrorKind) -> Self {
        Self { code, cause: None }
    }

    pub fn failure_with(code: ErrorKind, cause: impl Into<Error>) -> Self {
        Self {
            code,
            cause: Some(cause.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == ErrorKind::Success
    }

    pub fn code(&self) -> ErrorKind {
        self.code
    }

    pub fn cause(&self) -> Option<&Error> {
        self.cause.as_ref()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {:#}", self.code, cause),
            None => write!(f, "{}", self.code),
        }
    }
}
