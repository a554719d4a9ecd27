use std::fmt::{Display, Formatter};
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    Config,
    Oracle,
    Io,
    Format,
}

impl EvalErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvalErrorKind::Config => "config",
            EvalErrorKind::Oracle => "oracle",
            EvalErrorKind::Io => "io",
            EvalErrorKind::Format => "format",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub message: String,
}

impl EvalError {
    pub fn config(message: impl Into<String>) -> Self {
        Self {
            kind: EvalErrorKind::Config,
            message: message.into(),
        }
    }

    pub fn oracle(message: impl Into<String>) -> Self {
        Self {
            kind: EvalErrorKind::Oracle,
            message: message.into(),
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self {
            kind: EvalErrorKind::Format,
            message: message.into(),
        }
    }

    pub fn io(path: &Path, err: io::Error) -> Self {
        Self {
            kind: EvalErrorKind::Io,
            message: format!("{}: {err}", path.display()),
        }
    }
}

impl Display for EvalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for EvalError {}
