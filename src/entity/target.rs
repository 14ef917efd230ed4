use super::{Entity, EntityKind, Repository, DISABLED_FILE, HOOKS_DIR, TEMP_DIR};
use crate::environment::{target_environment, Environment, TargetPaths};
use std::path::{Path, PathBuf};

/// A target inside a repository. It owns a full copy of its repository's
/// descriptor, so it can be passed around on its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    repository: Repository,
    name: String,
    path: PathBuf,
    hooks_dir: PathBuf,
    pool_dir: PathBuf,
    temp_dir: PathBuf,
    disabled_path: PathBuf,
    environment: Environment,
}

impl Target {
    /// Build the descriptor of the target `name` in `repository`. Pure, it does
    /// not check whether the target exists.
    pub fn new(repository: &Repository, name: &str) -> Self {
        let path = repository.targets_dir().join(name);
        let hooks_dir = path.join(HOOKS_DIR);
        let pool_dir = path.join("pool");
        let temp_dir = path.join(TEMP_DIR);
        let disabled_path = path.join(DISABLED_FILE);
        let environment = target_environment(
            repository.environment(),
            &TargetPaths {
                name,
                path: &path,
                hooks_dir: &hooks_dir,
                pool_dir: &pool_dir,
                temp_dir: &temp_dir,
            },
        );

        Target {
            repository: repository.clone(),
            name: name.to_string(),
            path,
            hooks_dir,
            pool_dir,
            temp_dir,
            disabled_path,
            environment,
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn pool_dir(&self) -> &Path {
        &self.pool_dir
    }
}

impl Entity for Target {
    fn kind(&self) -> EntityKind {
        EntityKind::Target
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn hooks_dir(&self) -> &Path {
        &self.hooks_dir
    }

    fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    fn disabled_path(&self) -> &Path {
        &self.disabled_path
    }

    fn environment(&self) -> &Environment {
        &self.environment
    }

    fn label(&self) -> String {
        format!("{}/{}", self.repository.name(), self.name)
    }
}
