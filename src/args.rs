use gumdrop::Options;
use pacpilot::{
    hooks::RunOptions,
    orchestrator::HookPlan,
    selection::Selection,
    server::DEFAULT_PORT,
    tempdir::TempDirOptions,
};

/// Manage repositories of targets and run their hooks.
#[derive(Debug, Options)]
pub struct Args {
    /// The data directory, defaults to $PACPILOT_DATA_DIR.
    #[options(short = "D", meta = "DIR")]
    pub directory: Option<String>,

    /// Increase verbosity, can be set multiple times (-v debug, -vv tracing)
    #[options(count)]
    pub verbose: u8,

    /// Only print errors.
    #[options()]
    pub quiet: bool,

    /// Print this help.
    #[options()]
    pub help: bool,

    #[options(command)]
    pub command: Option<Command>,
}

#[derive(Debug, Options)]
pub enum Command {
    /// Create the data directory layout.
    Init(HelpOpts),
    /// Print the current version.
    Version(HelpOpts),
    /// Manage repos.
    Repos(ReposOpts),
    /// Manage targets.
    Targets(TargetsOpts),
}

#[derive(Debug, Options)]
pub struct HelpOpts {
    /// Print this help.
    #[options()]
    pub help: bool,
}

#[derive(Debug, Options)]
pub struct ReposOpts {
    /// Print this help.
    #[options()]
    pub help: bool,

    #[options(command)]
    pub command: Option<ReposCommand>,
}

#[derive(Debug, Options)]
pub enum ReposCommand {
    /// Create a repo.
    Create(CreateRepoOpts),
    /// Remove repos with their targets.
    Rm(RemoveReposOpts),
    /// List all repos.
    Ls(HelpOpts),
    /// Enable repos.
    Enable(SelectReposOpts),
    /// Disable repos.
    Disable(SelectReposOpts),
    /// Manage repo hooks.
    Hooks(RepoHooksOpts),
    /// Serve the enabled repos over HTTP.
    Serve(ServeOpts),
}

#[derive(Debug, Options)]
pub struct RepoHooksOpts {
    /// Print this help.
    #[options()]
    pub help: bool,

    #[options(command)]
    pub command: Option<RepoHooksCommand>,
}

#[derive(Debug, Options)]
pub enum RepoHooksCommand {
    /// List repo hooks.
    Ls(SelectReposOpts),
    /// Run repo hook(s).
    Run(RunRepoHooksOpts),
}

#[derive(Debug, Options)]
pub struct CreateRepoOpts {
    /// The name of the new repo, asked for if missing.
    #[options()]
    pub name: Option<String>,

    /// The template to copy from, asked for if missing.
    #[options()]
    pub template: Option<String>,

    /// Print this help.
    #[options()]
    pub help: bool,
}

#[derive(Debug, Options)]
pub struct SelectReposOpts {
    /// Repo name(s), can be set multiple times or separated by commas.
    #[options()]
    pub repo: Vec<String>,

    /// Include all repos.
    #[options()]
    pub all: bool,

    /// Pick the repos interactively.
    #[options()]
    pub interactive: bool,

    /// Print this help.
    #[options()]
    pub help: bool,
}

impl SelectReposOpts {
    pub fn selection(&self) -> Selection {
        Selection {
            names: self.repo.clone(),
            all: self.all,
            interactive: self.interactive,
        }
    }
}

#[derive(Debug, Options)]
pub struct RemoveReposOpts {
    /// Repo name(s), can be set multiple times or separated by commas.
    #[options()]
    pub repo: Vec<String>,

    /// Include all repos.
    #[options()]
    pub all: bool,

    /// Pick the repos interactively.
    #[options()]
    pub interactive: bool,

    /// Remove repos with targets without asking.
    #[options()]
    pub yes: bool,

    /// Print this help.
    #[options()]
    pub help: bool,
}

impl RemoveReposOpts {
    pub fn selection(&self) -> Selection {
        Selection {
            names: self.repo.clone(),
            all: self.all,
            interactive: self.interactive,
        }
    }
}

#[derive(Debug, Options)]
pub struct RunRepoHooksOpts {
    /// Repo name(s), can be set multiple times or separated by commas.
    #[options()]
    pub repo: Vec<String>,

    /// Include all repos.
    #[options()]
    pub all: bool,

    /// Pick the repos interactively.
    #[options()]
    pub interactive: bool,

    /// Hook name(s) to run in order, can be set multiple times.
    #[options(short = "k")]
    pub hook: Vec<String>,

    /// Do not create the temporary directory before running the hook(s).
    #[options(no_short)]
    pub nocreatetemp: bool,

    /// Do not remove the temporary directory after the hook(s) finished.
    #[options(no_short)]
    pub noremovetemp: bool,

    /// Do not print the output of the hook(s).
    #[options()]
    pub quiet: bool,

    /// Print this help.
    #[options()]
    pub help: bool,
}

impl RunRepoHooksOpts {
    pub fn selection(&self) -> Selection {
        Selection {
            names: self.repo.clone(),
            all: self.all,
            interactive: self.interactive,
        }
    }

    pub fn plan(&self) -> HookPlan {
        HookPlan {
            temp: temp_options(self.nocreatetemp, self.noremovetemp),
            run: run_options(self.quiet),
            ..HookPlan::new(split_list(&self.hook))
        }
    }
}

#[derive(Debug, Options)]
pub struct ServeOpts {
    /// The port to listen on.
    #[options(meta = "PORT")]
    pub port: Option<u16>,

    /// Print this help.
    #[options()]
    pub help: bool,
}

impl ServeOpts {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }
}

#[derive(Debug, Options)]
pub struct TargetsOpts {
    /// Print this help.
    #[options()]
    pub help: bool,

    #[options(command)]
    pub command: Option<TargetsCommand>,
}

#[derive(Debug, Options)]
pub enum TargetsCommand {
    /// Create a target.
    Create(CreateTargetOpts),
    /// Remove targets.
    Rm(SelectTargetsOpts),
    /// List the targets of repos.
    Ls(SelectReposOpts),
    /// Enable targets.
    Enable(SelectTargetsOpts),
    /// Disable targets.
    Disable(SelectTargetsOpts),
    /// Run the update hook of targets.
    Update(UpdateTargetsOpts),
    /// Manage target hooks.
    Hooks(TargetHooksOpts),
}

#[derive(Debug, Options)]
pub struct TargetHooksOpts {
    /// Print this help.
    #[options()]
    pub help: bool,

    #[options(command)]
    pub command: Option<TargetHooksCommand>,
}

#[derive(Debug, Options)]
pub enum TargetHooksCommand {
    /// List target hooks.
    Ls(SelectTargetsOpts),
    /// Run target hook(s).
    Run(RunTargetHooksOpts),
}

#[derive(Debug, Options)]
pub struct CreateTargetOpts {
    /// The repo of the new target, asked for if missing.
    #[options()]
    pub repo: Option<String>,

    /// The name of the new target, asked for if missing.
    #[options()]
    pub name: Option<String>,

    /// The template to copy from, asked for if missing.
    #[options()]
    pub template: Option<String>,

    /// Print this help.
    #[options()]
    pub help: bool,
}

#[derive(Debug, Options)]
pub struct SelectTargetsOpts {
    /// Repo name.
    #[options()]
    pub repo: Option<String>,

    /// Target name(s), can be set multiple times or separated by commas.
    #[options()]
    pub target: Vec<String>,

    /// Include all targets.
    #[options()]
    pub all: bool,

    /// Pick the repo and the targets interactively.
    #[options()]
    pub interactive: bool,

    /// Print this help.
    #[options()]
    pub help: bool,
}

impl SelectTargetsOpts {
    pub fn selection(&self) -> Selection {
        Selection {
            names: self.target.clone(),
            all: self.all,
            interactive: self.interactive,
        }
    }
}

#[derive(Debug, Options)]
pub struct UpdateTargetsOpts {
    /// Repo name.
    #[options()]
    pub repo: Option<String>,

    /// Target name(s), can be set multiple times or separated by commas.
    #[options()]
    pub target: Vec<String>,

    /// Include all targets.
    #[options()]
    pub all: bool,

    /// Pick the repo and the targets interactively.
    #[options()]
    pub interactive: bool,

    /// Repo hook(s) to run before the targets.
    #[options(no_short)]
    pub repopre: Vec<String>,

    /// Repo hook(s) to run after the targets.
    #[options(no_short)]
    pub repopost: Vec<String>,

    /// Print this help.
    #[options()]
    pub help: bool,
}

impl UpdateTargetsOpts {
    pub fn selection(&self) -> Selection {
        Selection {
            names: self.target.clone(),
            all: self.all,
            interactive: self.interactive,
        }
    }
}

#[derive(Debug, Options)]
pub struct RunTargetHooksOpts {
    /// Repo name.
    #[options()]
    pub repo: Option<String>,

    /// Target name(s), can be set multiple times or separated by commas.
    #[options()]
    pub target: Vec<String>,

    /// Include all targets.
    #[options()]
    pub all: bool,

    /// Pick the repo and the targets interactively.
    #[options()]
    pub interactive: bool,

    /// Hook name(s) to run in order, can be set multiple times.
    #[options(short = "k")]
    pub hook: Vec<String>,

    /// Repo hook(s) to run before the targets.
    #[options(no_short)]
    pub repopre: Vec<String>,

    /// Repo hook(s) to run after the targets.
    #[options(no_short)]
    pub repopost: Vec<String>,

    /// Do not create the temporary directories before running the hook(s).
    #[options(no_short)]
    pub nocreatetemp: bool,

    /// Do not remove the temporary directories after the hook(s) finished.
    #[options(no_short)]
    pub noremovetemp: bool,

    /// Do not print the output of the hook(s).
    #[options()]
    pub quiet: bool,

    /// Print this help.
    #[options()]
    pub help: bool,
}

impl RunTargetHooksOpts {
    pub fn selection(&self) -> Selection {
        Selection {
            names: self.target.clone(),
            all: self.all,
            interactive: self.interactive,
        }
    }

    pub fn plan(&self) -> HookPlan {
        HookPlan {
            pre_hooks: split_list(&self.repopre),
            post_hooks: split_list(&self.repopost),
            temp: temp_options(self.nocreatetemp, self.noremovetemp),
            run: run_options(self.quiet),
            ..HookPlan::new(split_list(&self.hook))
        }
    }
}

/// Split comma separated values, dropping blanks. Order and repetitions are kept.
pub fn split_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
        .collect()
}

fn temp_options(nocreatetemp: bool, noremovetemp: bool) -> TempDirOptions {
    TempDirOptions {
        create: !nocreatetemp,
        remove: !noremovetemp,
    }
}

fn run_options(quiet: bool) -> RunOptions {
    RunOptions {
        echo_command: true,
        stream_output: !quiet,
    }
}

pub fn parse_args() -> Args {
    Args::parse_args_default_or_exit()
}
