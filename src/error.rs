use crate::{hooks::HookError, state::StateError, tempdir::TempDirError};
use std::io;
use thiserror::Error;

/// The error kinds every operation of the crate can end with.
///
/// Control flow only ever depends on the variant, the messages are for display.
#[derive(Debug, Error)]
pub enum Error {
    /// Conflicting or missing selection flags, rejected before any I/O.
    #[error("{0}")]
    Configuration(String),
    /// An entity, hook or template directory is absent.
    #[error("{0}")]
    NotFound(String),
    /// Creating, removing or inspecting the filesystem failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    /// A hook returned a non-zero exit code. The captured output is kept for display.
    #[error("hook {hook} finished with exit code {code}")]
    HookFailure {
        hook: String,
        code: i32,
        output: String,
    },
    /// The user interrupted an interactive prompt.
    #[error("operation cancelled by user")]
    UserCancelled,
}

impl Error {
    /// Wrap an I/O error with a short description of what was attempted.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    /// The exit code the process should terminate with: the hook's own code
    /// for hook failures, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::HookFailure { code, .. } => *code,
            _ => 1,
        }
    }
}

impl From<HookError> for Error {
    fn from(value: HookError) -> Self {
        match value {
            HookError::NotFound(_, _) => Error::NotFound(value.to_string()),
            HookError::InvalidEntry(_) => Error::Configuration(value.to_string()),
            HookError::EntryUnreadable(_, source) | HookError::Spawn(_, source) => {
                Error::io("cannot run hook", source)
            }
        }
    }
}

impl From<StateError> for Error {
    fn from(value: StateError) -> Self {
        let context = value.to_string();
        match value {
            StateError::Inspect(_, source)
            | StateError::Create(_, source)
            | StateError::Remove(_, source) => Error::io(context, source),
        }
    }
}

impl From<TempDirError> for Error {
    fn from(value: TempDirError) -> Self {
        let context = value.to_string();
        match value {
            TempDirError::Create(_, source) | TempDirError::Remove(_, source) => {
                Error::io(context, source)
            }
        }
    }
}
