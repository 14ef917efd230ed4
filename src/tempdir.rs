use crate::entity::Entity;
use log::{debug, error, warn};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Custom error describing the error cases of the temporary directories.
#[derive(Debug, Error)]
pub enum TempDirError {
    #[error("failed to create the temporary directory {}", .0.display())]
    Create(PathBuf, #[source] io::Error),
    #[error("failed to remove the temporary directory {}", .0.display())]
    Remove(PathBuf, #[source] io::Error),
}

/// Which phases of the temporary directory handling should run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TempDirOptions {
    pub create: bool,
    pub remove: bool,
}

impl Default for TempDirOptions {
    fn default() -> Self {
        TempDirOptions {
            create: true,
            remove: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Setup {
    Created,
    /// A leftover directory was found, it was emptied by recreating it.
    Recreated,
    Skipped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Teardown {
    Removed,
    /// There was nothing to remove.
    Missing,
    Skipped,
}

/// Create the temporary directory of the entity, replacing any leftover one.
pub fn setup(entity: &dyn Entity, options: TempDirOptions) -> Result<Setup, TempDirError> {
    let dir = entity.temp_dir();
    if !options.create {
        debug!("Not creating the temporary directory {}.", dir.display());
        return Ok(Setup::Skipped);
    }

    let mut result = Setup::Created;
    if dir.exists() {
        warn!(
            "The temporary directory {} already exists, recreating it.",
            dir.display()
        );
        remove(dir).map_err(|err| TempDirError::Remove(dir.to_path_buf(), err))?;
        result = Setup::Recreated;
    }

    fs::create_dir_all(dir).map_err(|err| TempDirError::Create(dir.to_path_buf(), err))?;
    debug!("Created the temporary directory {}.", dir.display());

    Ok(result)
}

/// Remove the temporary directory of the entity, if there is one.
pub fn teardown(entity: &dyn Entity, options: TempDirOptions) -> Result<Teardown, TempDirError> {
    teardown_path(entity.temp_dir(), options)
}

fn teardown_path(dir: &Path, options: TempDirOptions) -> Result<Teardown, TempDirError> {
    if !options.remove {
        debug!("Keeping the temporary directory {}.", dir.display());
        return Ok(Teardown::Skipped);
    }

    match remove(dir) {
        Ok(()) => {
            debug!("Removed the temporary directory {}.", dir.display());
            Ok(Teardown::Removed)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Teardown::Missing),
        Err(err) => Err(TempDirError::Remove(dir.to_path_buf(), err)),
    }
}

fn remove(dir: &Path) -> io::Result<()> {
    if dir.is_dir() {
        fs::remove_dir_all(dir)
    } else {
        fs::remove_file(dir)
    }
}

/// A temporary directory that is torn down when the guard goes away.
///
/// Call [TempDirGuard::release] to see the teardown result. If the guard is
/// dropped without releasing (early return, `?`), the directory is still torn
/// down and failures are logged.
#[derive(Debug)]
pub struct TempDirGuard {
    dir: PathBuf,
    options: TempDirOptions,
    released: bool,
}

impl TempDirGuard {
    pub fn acquire(entity: &dyn Entity, options: TempDirOptions) -> Result<(Self, Setup), TempDirError> {
        let setup = setup(entity, options)?;
        let guard = TempDirGuard {
            dir: entity.temp_dir().to_path_buf(),
            options,
            released: false,
        };

        Ok((guard, setup))
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn release(mut self) -> Result<Teardown, TempDirError> {
        self.released = true;
        teardown_path(&self.dir, self.options)
    }

    /// Release the directory even if the options ask to keep it.
    pub fn release_forced(mut self) -> Result<Teardown, TempDirError> {
        self.options.remove = true;
        self.release()
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = teardown_path(&self.dir, self.options) {
            error!("{err}.");
        }
    }
}
