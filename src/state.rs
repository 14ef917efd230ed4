use crate::entity::Entity;
use std::{
    fs::{self, File},
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Custom error describing the failures of reading or changing the lifecycle state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to verify if {0} is disabled")]
    Inspect(PathBuf, #[source] io::Error),
    #[error("failed to create the disabled marker {0}")]
    Create(PathBuf, #[source] io::Error),
    #[error("failed to remove the disabled marker {0}")]
    Remove(PathBuf, #[source] io::Error),
}

/// The result of an enable or disable request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The state was changed.
    Changed,
    /// The entity was already in the requested state, nothing was done.
    AlreadyInState,
}

/// A durable boolean flag addressed by a key.
pub trait FlagStore {
    fn is_set(&self, key: &Path) -> Result<bool, StateError>;
    fn set(&self, key: &Path) -> Result<(), StateError>;
    fn clear(&self, key: &Path) -> Result<(), StateError>;
}

/// Flags stored as empty sentinel files: the file exists if and only if the flag is set.
#[derive(Clone, Copy, Debug, Default)]
pub struct SentinelStore;

impl FlagStore for SentinelStore {
    fn is_set(&self, key: &Path) -> Result<bool, StateError> {
        match fs::metadata(key) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StateError::Inspect(key.to_path_buf(), err)),
        }
    }

    fn set(&self, key: &Path) -> Result<(), StateError> {
        File::create(key).map_err(|err| StateError::Create(key.to_path_buf(), err))?;
        Ok(())
    }

    fn clear(&self, key: &Path) -> Result<(), StateError> {
        fs::remove_file(key).map_err(|err| StateError::Remove(key.to_path_buf(), err))
    }
}

/// The enabled/disabled state of repositories and targets.
///
/// Entities are enabled unless their disabled flag is set. Enabling an enabled
/// entity (or disabling a disabled one) is reported as
/// [Transition::AlreadyInState] so batch operations can tell the cases apart.
#[derive(Clone, Debug)]
pub struct Lifecycle<S: FlagStore = SentinelStore> {
    store: S,
}

impl Lifecycle {
    /// The lifecycle backed by sentinel files.
    pub fn new() -> Self {
        Lifecycle {
            store: SentinelStore,
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: FlagStore> Lifecycle<S> {
    pub fn with_store(store: S) -> Self {
        Lifecycle { store }
    }

    pub fn is_disabled(&self, entity: &dyn Entity) -> Result<bool, StateError> {
        self.store.is_set(entity.disabled_path())
    }

    pub fn enable(&self, entity: &dyn Entity) -> Result<Transition, StateError> {
        if !self.is_disabled(entity)? {
            return Ok(Transition::AlreadyInState);
        }
        self.store.clear(entity.disabled_path())?;
        Ok(Transition::Changed)
    }

    pub fn disable(&self, entity: &dyn Entity) -> Result<Transition, StateError> {
        if self.is_disabled(entity)? {
            return Ok(Transition::AlreadyInState);
        }
        self.store.set(entity.disabled_path())?;
        Ok(Transition::Changed)
    }
}
