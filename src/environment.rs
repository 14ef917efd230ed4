//! Environment variables handed to hook processes.
//!
//! Every hook sees the program-wide keys and the keys of its repository;
//! target hooks additionally see the target keys. The values are plain strings
//! so hook scripts can use them directly, e.g. `cd "$TARGET_TEMP_DIR"`.

use crate::program::Program;
use std::{collections::BTreeMap, path::Path};

/// An immutable snapshot of hook environment variables.
pub type Environment = BTreeMap<String, String>;

fn path_value(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// The keys every hook receives regardless of its entity.
pub fn program_environment(program: &Program) -> Environment {
    Environment::from([
        ("PROGRAM_NAME".to_string(), program.name.clone()),
        ("DEFAULT_SHELL".to_string(), program.default_shell.clone()),
        ("PACPILOT_EXEC".to_string(), program.exec.clone()),
        ("DATA_DIR".to_string(), path_value(&program.data_dir)),
        ("REPOS_DIR".to_string(), path_value(&program.repos_dir)),
        ("TEMPLATES_DIR".to_string(), path_value(&program.templates_dir)),
        (
            "REPOS_TEMPLATES_DIR".to_string(),
            path_value(&program.repos_templates_dir),
        ),
        (
            "TARGETS_TEMPLATES_DIR".to_string(),
            path_value(&program.targets_templates_dir),
        ),
    ])
}

/// Paths describing a repository, as seen by its hooks.
pub struct RepositoryPaths<'a> {
    pub name: &'a str,
    pub path: &'a Path,
    pub hooks_dir: &'a Path,
    pub targets_dir: &'a Path,
    pub temp_dir: &'a Path,
}

/// Paths describing a target, as seen by its hooks.
pub struct TargetPaths<'a> {
    pub name: &'a str,
    pub path: &'a Path,
    pub hooks_dir: &'a Path,
    pub pool_dir: &'a Path,
    pub temp_dir: &'a Path,
}

/// The environment of a repository hook: program keys plus `REPO_*` keys.
pub fn repository_environment(program: &Program, repo: &RepositoryPaths) -> Environment {
    let mut env = program_environment(program);
    env.extend([
        ("REPO_NAME".to_string(), repo.name.to_string()),
        ("REPO_DIR".to_string(), path_value(repo.path)),
        ("REPO_HOOKS_DIR".to_string(), path_value(repo.hooks_dir)),
        ("REPO_TARGETS_DIR".to_string(), path_value(repo.targets_dir)),
        ("REPO_TEMP_DIR".to_string(), path_value(repo.temp_dir)),
    ]);
    env
}

/// The environment of a target hook. The owning repository's environment is
/// copied first and the `TARGET_*` keys are layered on top, so a target value
/// replaces a repository value under the same key.
pub fn target_environment(repository: &Environment, target: &TargetPaths) -> Environment {
    let mut env = repository.clone();
    env.extend([
        ("TARGET_NAME".to_string(), target.name.to_string()),
        ("TARGET_DIR".to_string(), path_value(target.path)),
        ("TARGET_HOOKS_DIR".to_string(), path_value(target.hooks_dir)),
        ("TARGET_POOL_DIR".to_string(), path_value(target.pool_dir)),
        ("TARGET_TEMP_DIR".to_string(), path_value(target.temp_dir)),
    ]);
    env
}
