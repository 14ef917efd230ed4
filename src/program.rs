use crate::{Error, Result};
use duct::cmd;
use log::{debug, warn};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// Environment variable used when no data directory is passed on the command line.
pub const DATA_DIR_VAR: &str = "PACPILOT_DATA_DIR";
/// Environment variable overriding the default hook interpreter.
pub const SHELL_VAR: &str = "PACPILOT_SHELL";

const PROGRAM_NAME: &str = "pacpilot";
const DEFAULT_SHELL_NAME: &str = "sh";

/// Program-wide configuration, shared by every entity built during one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    pub name: String,
    pub version: String,
    pub exec: String,
    pub default_shell: String,
    pub data_dir: PathBuf,
    pub repos_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub repos_templates_dir: PathBuf,
    pub targets_templates_dir: PathBuf,
}

impl Program {
    /// Derive the configuration from a data directory and a default shell.
    /// This does not touch the filesystem.
    pub fn new(data_dir: impl Into<PathBuf>, default_shell: impl Into<String>) -> Self {
        let data_dir = data_dir.into();
        let templates_dir = data_dir.join("templates");

        Program {
            name: PROGRAM_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            exec: env::args().next().unwrap_or_else(|| PROGRAM_NAME.to_string()),
            default_shell: default_shell.into(),
            repos_dir: data_dir.join("repos"),
            repos_templates_dir: templates_dir.join("repos"),
            targets_templates_dir: templates_dir.join("targets"),
            templates_dir,
            data_dir,
        }
    }

    /// Load the configuration, the command line flag takes precedence over the
    /// environment. A data directory is always required.
    pub fn load(data_dir: Option<String>) -> Result<Self> {
        Program::load_with(data_dir, |key| env::var(key).ok())
    }

    /// Load the configuration, reading environment variables through `lookup`.
    pub fn load_with(
        data_dir: Option<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let data_dir = data_dir
            .filter(|dir| !dir.is_empty())
            .or_else(|| lookup(DATA_DIR_VAR).filter(|dir| !dir.is_empty()))
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "a data directory should be specified using the '-D' flag or {DATA_DIR_VAR}"
                ))
            })?;

        let default_shell = match lookup(SHELL_VAR) {
            Some(shell) if !shell.is_empty() => shell,
            _ => resolve_shell(DEFAULT_SHELL_NAME)?,
        };
        debug!("Using {default_shell} as the default hook interpreter.");

        Ok(Program::new(data_dir, default_shell))
    }

    /// Create the data directory layout. Returns true if anything was missing.
    pub fn ensure_layout(&self) -> Result<bool> {
        let mut created = false;
        for (label, dir) in [
            ("data", &self.data_dir),
            ("repos", &self.repos_dir),
            ("templates", &self.templates_dir),
            ("repos templates", &self.repos_templates_dir),
            ("targets templates", &self.targets_templates_dir),
        ] {
            if !dir.exists() {
                warn!("The {label} directory was not found, creating {}.", dir.display());
                fs::create_dir_all(dir)
                    .map_err(|err| Error::io(format!("failed to create {label} directory"), err))?;
                created = true;
            }
        }

        Ok(created)
    }
}

/// Find the absolute path of a shell with `which`.
fn resolve_shell(name: &str) -> Result<String> {
    let path = cmd!("which", name)
        .stderr_to_stdout()
        .read()
        .map_err(|err| Error::io(format!("failed to find the default shell {name:?}"), err))?;

    let path = path.trim();
    if path.is_empty() || !Path::new(path).is_absolute() {
        return Err(Error::NotFound(format!("default shell {name:?} not found")));
    }

    Ok(path.to_string())
}
