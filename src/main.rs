use args::{
    parse_args, split_list, Args, Command, RepoHooksCommand, ReposCommand, TargetHooksCommand,
    TargetsCommand,
};
use gumdrop::Options;
use log::{debug, error, info};
use logger::init_logger;
use pacpilot::{
    entity::{Entity, EntityKind},
    hooks::HookInfo,
    manage::{Listing, Manager},
    orchestrator::{BatchReport, Orchestrator},
    program::Program,
    report::LogReporter,
    selection::{select_repositories, select_repository, select_targets, Picker},
    server::Server,
    Error, Result,
};
use prompt::DialoguerPicker;
use std::process;

mod args;
mod logger;
mod prompt;

fn main() {
    let args = parse_args();
    if let Err(err) = init_logger(&args) {
        eprintln!("{err}");
        process::exit(1);
    }

    if let Err(err) = run(args) {
        if let Error::HookFailure { output, .. } = &err {
            debug!("Output of the failed hook:\n{output}");
        }
        error!("{err}.");
        process::exit(err.exit_code());
    }
}

fn run(args: Args) -> Result<()> {
    let Some(command) = args.command else {
        println!("{}", Args::usage());
        if let Some(commands) = Args::command_list() {
            println!("\nAvailable commands:\n{commands}");
        }
        return Ok(());
    };

    match command {
        Command::Version(_) => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Init(_) => {
            let program = Program::load(args.directory)?;
            if program.ensure_layout()? {
                info!("Initialized the data directory at {}.", program.data_dir.display());
            } else {
                info!(
                    "The data directory at {} is already initialized.",
                    program.data_dir.display()
                );
            }
            Ok(())
        }
        Command::Repos(opts) => {
            let program = open_program(args.directory)?;
            match opts.command {
                Some(command) => repos(program, command),
                None => missing_command("repos"),
            }
        }
        Command::Targets(opts) => {
            let program = open_program(args.directory)?;
            match opts.command {
                Some(command) => targets(&program, command),
                None => missing_command("targets"),
            }
        }
    }
}

fn open_program(directory: Option<String>) -> Result<Program> {
    let program = Program::load(directory)?;
    info!(
        "Running {} using data directory at: {}",
        program.name,
        program.data_dir.display()
    );
    program.ensure_layout()?;
    Ok(program)
}

fn missing_command(parent: &str) -> Result<()> {
    Err(Error::Configuration(format!(
        "a subcommand should be specified, see '{parent} --help'"
    )))
}

fn repos(program: Program, command: ReposCommand) -> Result<()> {
    let reporter = LogReporter;
    let picker = DialoguerPicker::new();

    match command {
        ReposCommand::Create(opts) => {
            let manager = Manager::new(&program, &reporter);
            let name = ask_unless_given(opts.name, &picker, "Repo name")?;
            let template = choose_template(
                opts.template,
                &manager,
                EntityKind::Repository,
                &picker,
                "Repo template",
            )?;
            manager.create_repository(&name, Some(&template))?;
        }
        ReposCommand::Rm(opts) => {
            let repos = select_repositories(&program, &opts.selection(), &picker)?;
            Manager::new(&program, &reporter).remove_repositories(&repos, opts.yes, &picker)?;
        }
        ReposCommand::Ls(_) => {
            print_listings(&Manager::new(&program, &reporter).list_repositories()?, "");
        }
        ReposCommand::Enable(opts) => {
            let repos = select_repositories(&program, &opts.selection(), &picker)?;
            let report = Orchestrator::new(&program, &reporter).enable(&as_entities(&repos))?;
            log_batch(&report);
        }
        ReposCommand::Disable(opts) => {
            let repos = select_repositories(&program, &opts.selection(), &picker)?;
            let report = Orchestrator::new(&program, &reporter).disable(&as_entities(&repos))?;
            log_batch(&report);
        }
        ReposCommand::Hooks(opts) => match opts.command {
            Some(RepoHooksCommand::Ls(opts)) => {
                let repos = select_repositories(&program, &opts.selection(), &picker)?;
                let manager = Manager::new(&program, &reporter);
                for repo in &repos {
                    print_hooks(repo, &manager.hooks(repo)?);
                }
            }
            Some(RepoHooksCommand::Run(opts)) => {
                let plan = opts.plan();
                if plan.hooks.is_empty() {
                    return Err(Error::Configuration(String::from(
                        "flag '--hook/-k' should be specified",
                    )));
                }
                let repos = select_repositories(&program, &opts.selection(), &picker)?;
                let report =
                    Orchestrator::new(&program, &reporter).run_repository_hooks(&repos, &plan)?;
                log_batch(&report);
            }
            None => return missing_command("repos hooks"),
        },
        ReposCommand::Serve(opts) => {
            Server::new(program).listen(opts.port())?;
        }
    }

    Ok(())
}

fn targets(program: &Program, command: TargetsCommand) -> Result<()> {
    let reporter = LogReporter;
    let picker = DialoguerPicker::new();

    match command {
        TargetsCommand::Create(opts) => {
            let manager = Manager::new(program, &reporter);
            let repo = select_repository(program, opts.repo.as_deref(), &picker)?;
            let name = ask_unless_given(opts.name, &picker, "Target name")?;
            let template = choose_template(
                opts.template,
                &manager,
                EntityKind::Target,
                &picker,
                "Target template",
            )?;
            manager.create_target(&repo, &name, Some(&template))?;
        }
        TargetsCommand::Rm(opts) => {
            let (_, targets) =
                select_targets(program, opts.repo.as_deref(), &opts.selection(), &picker)?;
            Manager::new(program, &reporter).remove_targets(&targets)?;
        }
        TargetsCommand::Ls(opts) => {
            let repos = select_repositories(program, &opts.selection(), &picker)?;
            let manager = Manager::new(program, &reporter);
            for repo in &repos {
                println!("{}:", repo.name());
                print_listings(&manager.list_targets(repo)?, "  ");
            }
        }
        TargetsCommand::Enable(opts) => {
            let (_, targets) =
                select_targets(program, opts.repo.as_deref(), &opts.selection(), &picker)?;
            let report = Orchestrator::new(program, &reporter).enable(&as_entities(&targets))?;
            log_batch(&report);
        }
        TargetsCommand::Disable(opts) => {
            let (_, targets) =
                select_targets(program, opts.repo.as_deref(), &opts.selection(), &picker)?;
            let report = Orchestrator::new(program, &reporter).disable(&as_entities(&targets))?;
            log_batch(&report);
        }
        TargetsCommand::Update(opts) => {
            let (repo, targets) =
                select_targets(program, opts.repo.as_deref(), &opts.selection(), &picker)?;
            let report = Orchestrator::new(program, &reporter).update_targets(
                &repo,
                &targets,
                split_list(&opts.repopre),
                split_list(&opts.repopost),
            )?;
            log_batch(&report);
        }
        TargetsCommand::Hooks(opts) => match opts.command {
            Some(TargetHooksCommand::Ls(opts)) => {
                let (_, targets) =
                    select_targets(program, opts.repo.as_deref(), &opts.selection(), &picker)?;
                let manager = Manager::new(program, &reporter);
                for target in &targets {
                    print_hooks(target, &manager.hooks(target)?);
                }
            }
            Some(TargetHooksCommand::Run(opts)) => {
                let plan = opts.plan();
                if plan.hooks.is_empty() {
                    return Err(Error::Configuration(String::from(
                        "flag '--hook/-k' should be specified",
                    )));
                }
                let (repo, targets) =
                    select_targets(program, opts.repo.as_deref(), &opts.selection(), &picker)?;
                let report = Orchestrator::new(program, &reporter)
                    .run_target_hooks(&repo, &targets, &plan)?;
                log_batch(&report);
            }
            None => return missing_command("targets hooks"),
        },
    }

    Ok(())
}

fn ask_unless_given(value: Option<String>, picker: &dyn Picker, prompt: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => picker.input(prompt),
    }
}

fn choose_template(
    template: Option<String>,
    manager: &Manager,
    kind: EntityKind,
    picker: &dyn Picker,
    prompt: &str,
) -> Result<String> {
    if let Some(template) = template {
        return Ok(template);
    }

    let templates = manager.templates(kind)?;
    let index = picker.pick_one(prompt, &templates)?;
    templates
        .into_iter()
        .nth(index)
        .ok_or_else(|| Error::NotFound(format!("no {kind} template was selected")))
}

fn as_entities<E: Entity>(entities: &[E]) -> Vec<&dyn Entity> {
    entities.iter().map(|entity| entity as &dyn Entity).collect()
}

fn print_listings(listings: &[Listing], indent: &str) {
    if listings.is_empty() {
        println!("{indent}(none)");
    }
    for listing in listings {
        println!("{indent}{listing}");
    }
}

fn print_hooks(entity: &dyn Entity, hooks: &[HookInfo]) {
    println!("{}:", entity.label());
    if hooks.is_empty() {
        println!("  (none)");
    }
    for hook in hooks {
        println!("  {} ({})", hook.name, hook.entry);
    }
}

fn log_batch(report: &BatchReport) {
    for (label, outcome) in &report.outcomes {
        debug!("{label}: {outcome:?}.");
    }
}

