use super::HookError;
use log::trace;
use std::{
    fmt::{self, Display},
    fs, io,
    path::Path,
};

/// The suffix of the file overriding a hook's entry command.
pub const ENTRY_SUFFIX: &str = ".entry";

/// The command a hook script is passed to, e.g. `/bin/sh` or `/usr/bin/env python3`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryCommand {
    pub program: String,
    pub args: Vec<String>,
    /// True if the command comes from a `.entry` file rather than the default shell.
    pub overridden: bool,
}

impl EntryCommand {
    fn default_shell(shell: &str) -> Self {
        EntryCommand {
            program: shell.to_string(),
            args: vec![],
            overridden: false,
        }
    }
}

impl Display for EntryCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Decide which command runs `hook`.
///
/// If `<hook>.entry` exists next to the hook, its trimmed contents are the
/// command (split like a shell would), otherwise the default shell is used.
/// The file is read on every call, so it can be edited between runs.
pub fn resolve_entry(
    hooks_dir: &Path,
    hook: &str,
    default_shell: &str,
) -> Result<EntryCommand, HookError> {
    let entry_path = hooks_dir.join(format!("{hook}{ENTRY_SUFFIX}"));

    let contents = match fs::read_to_string(&entry_path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Ok(EntryCommand::default_shell(default_shell))
        }
        Err(err) => return Err(HookError::EntryUnreadable(entry_path, err)),
    };

    let split = shlex::split(contents.trim()).ok_or(HookError::InvalidEntry(entry_path.clone()))?;
    let (program, args) = split
        .split_first()
        .ok_or(HookError::InvalidEntry(entry_path.clone()))?;

    trace!("Parsed {contents:?} in {} to {program} {args:?}.", entry_path.display());

    Ok(EntryCommand {
        program: program.clone(),
        args: args.to_vec(),
        overridden: true,
    })
}
