use crate::{environment::Environment, Error, Result};
use std::{
    fmt::{self, Display},
    fs,
    path::{Path, PathBuf},
};

/// A repository directory under `<data>/repos`.
pub mod repository;
/// A target directory under `<repo>/targets`.
pub mod target;

pub use repository::Repository;
pub use target::Target;

const HOOKS_DIR: &str = "hooks";
const TEMP_DIR: &str = ".tmp";
const DISABLED_FILE: &str = "disabled";

/// The two kinds of filesystem-resident objects hooks can run against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Repository,
    Target,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Repository => write!(f, "repo"),
            EntityKind::Target => write!(f, "target"),
        }
    }
}

/// The common view of repositories and targets.
///
/// Descriptors are built fresh for every operation. Nothing here touches the
/// filesystem except [verify_exists].
pub trait Entity {
    fn kind(&self) -> EntityKind;
    fn name(&self) -> &str;
    fn path(&self) -> &Path;
    fn hooks_dir(&self) -> &Path;
    fn temp_dir(&self) -> &Path;
    fn disabled_path(&self) -> &Path;
    fn environment(&self) -> &Environment;

    /// A display label, `repo` or `repo/target`.
    fn label(&self) -> String;

    /// The path a hook with this name would have.
    fn hook_path(&self, hook: &str) -> PathBuf {
        self.hooks_dir().join(hook)
    }
}

/// Check that the entity directory exists.
pub fn verify_exists(entity: &dyn Entity) -> bool {
    entity.path().is_dir()
}

/// Fail with NotFound if the entity directory does not exist.
pub fn require_exists(entity: &dyn Entity) -> Result<()> {
    if verify_exists(entity) {
        Ok(())
    } else {
        Err(Error::NotFound(format!(
            "{} '{}' not found",
            entity.kind(),
            entity.label()
        )))
    }
}

/// List the names of visible subdirectories, sorted.
pub(crate) fn list_names(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir)
        .map_err(|err| Error::io(format!("failed to read {}", dir.display()), err))?;

    let mut names = vec![];
    for entry in entries {
        let entry = entry.map_err(|err| Error::io(format!("failed to read {}", dir.display()), err))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_hidden(&name) && entry.path().is_dir() {
            names.push(name);
        }
    }
    names.sort();

    Ok(names)
}

pub(crate) fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Check that a name is a directory-safe identifier: at least two characters,
/// not hidden, without path separators or commas.
pub fn validate_name(kind: EntityKind, name: &str) -> Result<()> {
    if name.len() < 2 || is_hidden(name) || name.contains(['/', '\\']) || name.contains(',') {
        return Err(Error::Configuration(format!(
            "'{name}' is not a valid {kind} name"
        )));
    }
    Ok(())
}
