use std::fmt;

use remux_core::{Payload, RunId};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    LoadCompleted(Result<(), EngineError>),
    /// Progress of a run as reported by the transcoder, a fraction in `[0, 1]`.
    Progress { run_id: RunId, fraction: f64 },
    ConversionCompleted {
        run_id: RunId,
        result: Result<Payload, EngineError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub kind: FailureKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn io(context: impl fmt::Display, err: std::io::Error) -> Self {
        Self::new(FailureKind::Io, format!("{context}: {err}"))
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for EngineError {}

impl From<crate::AssetError> for EngineError {
    fn from(err: crate::AssetError) -> Self {
        Self::new(FailureKind::Assets, err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Assets,
    Load,
    InvalidName,
    Io,
    Execution { exit_code: Option<i32> },
    MissingOutput,
    NotLoaded,
    Runtime,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Assets => write!(f, "asset staging failed"),
            FailureKind::Load => write!(f, "engine load failed"),
            FailureKind::InvalidName => write!(f, "invalid logical file name"),
            FailureKind::Io => write!(f, "io error"),
            FailureKind::Execution {
                exit_code: Some(code),
            } => write!(f, "transcoder exited with code {code}"),
            FailureKind::Execution { exit_code: None } => {
                write!(f, "transcoder terminated by signal")
            }
            FailureKind::MissingOutput => write!(f, "output missing"),
            FailureKind::NotLoaded => write!(f, "engine not loaded"),
            FailureKind::Runtime => write!(f, "runtime error"),
        }
    }
}
