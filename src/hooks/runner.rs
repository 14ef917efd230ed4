use super::{resolve_entry, EntryCommand, HookError};
use crate::environment::Environment;
use duct::Expression;
use log::{debug, info};
use std::{
    ffi::OsString,
    io::{self, BufRead, BufReader},
    path::Path,
    process::Output,
};

/// Presentation switches of a hook run. They never change the outcome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Log the resolved command line before running it.
    pub echo_command: bool,
    /// Log every line of output as soon as it arrives.
    pub stream_output: bool,
}

/// How a finished hook exited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookStatus {
    Success,
    /// The non-zero exit code. Hooks killed by a signal are reported with 1.
    Failure(i32),
}

/// The result of a hook that could be started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HookRun {
    pub command: EntryCommand,
    /// The combined stdout and stderr of the hook.
    pub output: String,
    pub status: HookStatus,
}

impl HookRun {
    pub fn success(&self) -> bool {
        self.status == HookStatus::Success
    }

    pub fn exit_code(&self) -> i32 {
        match self.status {
            HookStatus::Success => 0,
            HookStatus::Failure(code) => code,
        }
    }
}

/// Runs hook scripts with their entry command.
///
/// The script is passed as the last argument to the entry command, so it does
/// not have to be executable. The entity environment is layered over the
/// environment of the current process.
#[derive(Clone, Debug)]
pub struct HookRunner {
    default_shell: String,
}

impl HookRunner {
    pub fn new(default_shell: impl Into<String>) -> Self {
        HookRunner {
            default_shell: default_shell.into(),
        }
    }

    /// Run a single hook to completion, blocking until it exits.
    pub fn run(
        &self,
        script: &Path,
        environment: &Environment,
        options: &RunOptions,
    ) -> Result<HookRun, HookError> {
        let hooks_dir = script.parent().unwrap_or(Path::new("."));
        let hook = script
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let command = resolve_entry(hooks_dir, &hook, &self.default_shell)?;

        if options.echo_command {
            info!("$ {command} {}", script.display());
        } else {
            debug!("Running {command} {}.", script.display());
        }

        let mut args: Vec<OsString> = command.args.iter().map(OsString::from).collect();
        args.push(script.as_os_str().to_owned());

        let mut expression = duct::cmd(&command.program, args);
        for (key, value) in environment {
            expression = expression.env(key, value);
        }
        let expression = expression.stderr_to_stdout().unchecked();

        let (output, finished) = if options.stream_output {
            run_streaming(expression)
        } else {
            run_captured(expression)
        }
        .map_err(|err| HookError::Spawn(script.to_path_buf(), err))?;

        let status = match finished.status.code() {
            Some(0) => HookStatus::Success,
            Some(code) => HookStatus::Failure(code),
            None => HookStatus::Failure(1),
        };
        debug!("Hook {} finished with {status:?}.", script.display());

        Ok(HookRun {
            command,
            output,
            status,
        })
    }
}

fn run_captured(expression: Expression) -> io::Result<(String, Output)> {
    let output = expression.stdout_capture().run()?;
    let text = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
    text.lines().for_each(|line| {
        debug!("{line}");
    });

    Ok((text, output))
}

fn run_streaming(expression: Expression) -> io::Result<(String, Output)> {
    let reader = expression.reader()?;
    let mut lines = BufReader::new(&reader);

    let mut collected = vec![];
    let mut line = vec![];
    loop {
        line.clear();
        if lines.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        let decoded = String::from_utf8_lossy(&line);
        let decoded = decoded.trim_end_matches(['\n', '\r']);
        info!("{decoded}");
        collected.push(decoded.to_string());
    }

    let output = reader
        .try_wait()?
        .cloned()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "the hook did not exit"))?;

    Ok((collected.join("\n").trim_end().to_string(), output))
}
