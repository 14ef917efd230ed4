use super::{list_names, Entity, EntityKind, Target, DISABLED_FILE, HOOKS_DIR, TEMP_DIR};
use crate::{
    environment::{repository_environment, Environment, RepositoryPaths},
    program::Program,
    Result,
};
use std::path::{Path, PathBuf};

/// A repository: a named directory holding hooks and targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Repository {
    name: String,
    path: PathBuf,
    hooks_dir: PathBuf,
    targets_dir: PathBuf,
    temp_dir: PathBuf,
    disabled_path: PathBuf,
    environment: Environment,
}

impl Repository {
    /// Build the descriptor of the repository called `name`. Pure, it does not
    /// check whether the repository exists.
    pub fn new(name: &str, program: &Program) -> Self {
        let path = program.repos_dir.join(name);
        let hooks_dir = path.join(HOOKS_DIR);
        let targets_dir = path.join("targets");
        let temp_dir = path.join(TEMP_DIR);
        let disabled_path = path.join(DISABLED_FILE);
        let environment = repository_environment(
            program,
            &RepositoryPaths {
                name,
                path: &path,
                hooks_dir: &hooks_dir,
                targets_dir: &targets_dir,
                temp_dir: &temp_dir,
            },
        );

        Repository {
            name: name.to_string(),
            path,
            hooks_dir,
            targets_dir,
            temp_dir,
            disabled_path,
            environment,
        }
    }

    /// Every repository in the data directory, sorted by name.
    pub fn list(program: &Program) -> Result<Vec<Repository>> {
        Ok(list_names(&program.repos_dir)?
            .iter()
            .map(|name| Repository::new(name, program))
            .collect())
    }

    /// Every target of this repository, sorted by name.
    pub fn targets(&self) -> Result<Vec<Target>> {
        Ok(list_names(&self.targets_dir)?
            .iter()
            .map(|name| Target::new(self, name))
            .collect())
    }

    pub fn targets_dir(&self) -> &Path {
        &self.targets_dir
    }
}

impl Entity for Repository {
    fn kind(&self) -> EntityKind {
        EntityKind::Repository
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
        self.name.clone()
    }
}
