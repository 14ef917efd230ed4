use crate::entity::{is_hidden, Entity};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Resolve the command a hook is invoked with.
pub mod entry;
/// Run a hook as a subprocess.
pub mod runner;

pub use entry::{resolve_entry, EntryCommand, ENTRY_SUFFIX};
pub use runner::{HookRun, HookRunner, HookStatus, RunOptions};

/// Custom error describing the error cases of finding and running hooks.
#[derive(Debug, Error)]
pub enum HookError {
    /// There is no script with this name in the hooks directory.
    #[error("no '{0}' hook found in {}", .1.display())]
    NotFound(String, PathBuf),
    /// The `.entry` override exists, but it cannot be read.
    #[error("failed to read the entry command {}", .0.display())]
    EntryUnreadable(PathBuf, #[source] io::Error),
    /// The `.entry` override is empty or is not a valid command line.
    #[error("the entry command in {} is not a valid command", .0.display())]
    InvalidEntry(PathBuf),
    /// The process could not be started.
    #[error("the hook {} cannot run", .0.display())]
    Spawn(PathBuf, #[source] io::Error),
}

/// Find the script of `hook` for the entity. Missing scripts are reported as
/// [HookError::NotFound], so the runner is never invoked on them.
///
/// Only plain file names inside the hooks directory are hooks: hidden names,
/// paths and `.entry` overrides are never found.
pub fn locate(entity: &dyn Entity, hook: &str) -> Result<PathBuf, HookError> {
    let script = entity.hook_path(hook);
    let plain = !hook.is_empty()
        && !is_hidden(hook)
        && !hook.contains(['/', '\\'])
        && !hook.ends_with(ENTRY_SUFFIX);
    if plain && script.is_file() {
        Ok(script)
    } else {
        Err(HookError::NotFound(
            hook.to_string(),
            entity.hooks_dir().to_path_buf(),
        ))
    }
}

/// A hook available in a hooks directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HookInfo {
    pub name: String,
    pub entry: EntryCommand,
}

/// List the hooks of a directory with the command each one would run with.
/// Hidden files and `.entry` overrides are not hooks themselves.
pub fn list_hooks(hooks_dir: &Path, default_shell: &str) -> Result<Vec<HookInfo>, HookError> {
    let entries = match fs::read_dir(hooks_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
        Err(err) => return Err(HookError::EntryUnreadable(hooks_dir.to_path_buf(), err)),
    };

    let mut names = vec![];
    for entry in entries {
        let entry = entry.map_err(|err| HookError::EntryUnreadable(hooks_dir.to_path_buf(), err))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_hidden(&name) && !name.ends_with(ENTRY_SUFFIX) && entry.path().is_file() {
            names.push(name);
        }
    }
    names.sort();

    names
        .into_iter()
        .map(|name| {
            let entry = resolve_entry(hooks_dir, &name, default_shell)?;
            Ok(HookInfo { name, entry })
        })
        .collect()
}
