//! Creating, removing and listing repositories and targets.

use crate::{
    entity::{
        list_names, require_exists, validate_name, verify_exists, Entity, EntityKind, Repository,
        Target,
    },
    hooks::{self, HookInfo, HookRunner, RunOptions},
    program::Program,
    report::{Depth, Event, Reporter},
    selection::Picker,
    state::Lifecycle,
    Error, Result,
};
use log::{debug, warn};
use std::{
    fmt::{self, Display},
    fs,
    path::Path,
};
use walkdir::WalkDir;

/// The pseudo-template creating an empty entity.
pub const SCRATCH_TEMPLATE: &str = "scratch";
pub const POST_CREATE_HOOK: &str = "post_create";
pub const PRE_RM_HOOK: &str = "pre_rm";
/// The hook printing the description shown by `ls`.
pub const LS_HOOK: &str = "ls";

/// One line of an `ls` output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Listing {
    pub name: String,
    pub description: Option<String>,
    pub disabled: bool,
}

impl Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(description) = &self.description {
            write!(f, " ({description})")?;
        }
        if self.disabled {
            write!(f, " [disabled]")?;
        }
        Ok(())
    }
}

/// Management operations on the entities of a data directory.
pub struct Manager<'a> {
    program: &'a Program,
    lifecycle: Lifecycle,
    runner: HookRunner,
    reporter: &'a dyn Reporter,
}

impl<'a> Manager<'a> {
    pub fn new(program: &'a Program, reporter: &'a dyn Reporter) -> Self {
        Manager {
            program,
            lifecycle: Lifecycle::new(),
            runner: HookRunner::new(&program.default_shell),
            reporter,
        }
    }

    fn report(&self, event: Event) {
        self.reporter.report(&event);
    }

    /// The templates available for new entities, starting with the scratch template.
    pub fn templates(&self, kind: EntityKind) -> Result<Vec<String>> {
        let mut templates = vec![SCRATCH_TEMPLATE.to_string()];
        templates.extend(list_names(self.templates_dir(kind))?);
        Ok(templates)
    }

    fn templates_dir(&self, kind: EntityKind) -> &Path {
        match kind {
            EntityKind::Repository => &self.program.repos_templates_dir,
            EntityKind::Target => &self.program.targets_templates_dir,
        }
    }

    /// Create a repository, optionally from a template, and run its `post_create` hook.
    pub fn create_repository(&self, name: &str, template: Option<&str>) -> Result<Repository> {
        validate_name(EntityKind::Repository, name)?;
        let repo = Repository::new(name, self.program);
        self.report(Event::title(
            format!("Creating repo {}", repo.label()),
            Depth::ROOT,
        ));

        self.create(&repo, &[repo.targets_dir()], template)?;
        Ok(repo)
    }

    /// Create a target with its pool directory, optionally from a template,
    /// and run its `post_create` hook.
    pub fn create_target(
        &self,
        repo: &Repository,
        name: &str,
        template: Option<&str>,
    ) -> Result<Target> {
        require_exists(repo)?;
        validate_name(EntityKind::Target, name)?;
        let target = Target::new(repo, name);
        self.report(Event::title(
            format!("Creating target {}", target.label()),
            Depth::ROOT,
        ));

        fs::create_dir_all(repo.targets_dir())
            .map_err(|err| Error::io("failed to create the targets directory", err))?;
        self.create(&target, &[target.pool_dir()], template)?;
        Ok(target)
    }

    fn create(&self, entity: &dyn Entity, subdirs: &[&Path], template: Option<&str>) -> Result<()> {
        let kind = entity.kind();
        let depth = Depth::ROOT.nested();
        if verify_exists(entity) {
            return Err(Error::Configuration(format!(
                "{kind} '{}' already exists",
                entity.label()
            )));
        }

        let template_dir = match template.filter(|template| *template != SCRATCH_TEMPLATE) {
            Some(template) => {
                let dir = self.templates_dir(kind).join(template);
                if !dir.is_dir() {
                    return Err(Error::NotFound(format!(
                        "{kind} template '{template}' not found"
                    )));
                }
                Some(dir)
            }
            None => None,
        };

        fs::create_dir(entity.path())
            .map_err(|err| Error::io(format!("failed to create {kind} directory"), err))?;

        let result = self.populate(entity, subdirs, template_dir.as_deref(), depth);
        if let Err(err) = result {
            self.report(Event::attention(
                format!("Removing {kind} directory"),
                depth,
            ));
            if let Err(remove_err) = fs::remove_dir_all(entity.path()) {
                warn!("Failed to remove {}: {remove_err}.", entity.path().display());
            }
            return Err(err);
        }

        self.report(Event::success("Finished", depth));
        Ok(())
    }

    fn populate(
        &self,
        entity: &dyn Entity,
        subdirs: &[&Path],
        template_dir: Option<&Path>,
        depth: Depth,
    ) -> Result<()> {
        for dir in subdirs {
            fs::create_dir_all(dir)
                .map_err(|err| Error::io(format!("failed to create {}", dir.display()), err))?;
        }

        if let Some(template_dir) = template_dir {
            self.report(Event::info("Copying template", depth));
            copy_template(template_dir, entity.path())?;
        }

        self.run_optional_hook(entity, POST_CREATE_HOOK, depth)?;
        Ok(())
    }

    /// Run a hook if the entity has one. Returns whether it was run.
    fn run_optional_hook(&self, entity: &dyn Entity, hook: &str, depth: Depth) -> Result<bool> {
        self.report(Event::title(format!("Running {hook} hook"), depth));

        let script = entity.hook_path(hook);
        if !script.is_file() {
            self.report(Event::attention("Hook not found", depth.nested()));
            return Ok(false);
        }

        let options = RunOptions {
            echo_command: true,
            stream_output: true,
        };
        let run = self.runner.run(&script, entity.environment(), &options)?;
        if run.success() {
            self.report(Event::success("Finished", depth.nested()));
            Ok(true)
        } else {
            let code = run.exit_code();
            self.report(Event::error(
                format!("Failed with exit code {code}"),
                depth.nested(),
            ));
            Err(Error::HookFailure {
                hook: format!("'{hook}' of {}", entity.label()),
                code,
                output: run.output,
            })
        }
    }

    /// Remove repositories with their targets, running every `pre_rm` hook first.
    ///
    /// Removing a repository that still has targets is confirmed with the
    /// picker, unless `assume_yes` is set.
    pub fn remove_repositories(
        &self,
        repos: &[Repository],
        assume_yes: bool,
        picker: &dyn Picker,
    ) -> Result<()> {
        for (index, repo) in repos.iter().enumerate() {
            require_exists(repo)?;
            self.report(Event::title(
                format!("({}/{}) Removing {}", index + 1, repos.len(), repo.label()),
                Depth::ROOT,
            ));
            let depth = Depth::ROOT.nested();

            let targets = repo.targets()?;
            if targets.is_empty() {
                self.report(Event::info("Repo has no targets", depth));
            } else {
                self.report(Event::attention(
                    format!("This will delete {} target(s) from this repo", targets.len()),
                    depth,
                ));
                if !assume_yes && !picker.confirm("Do you want to continue?")? {
                    return Err(Error::UserCancelled);
                }
                for target in &targets {
                    self.run_optional_hook(target, PRE_RM_HOOK, depth)?;
                }
            }

            self.run_optional_hook(repo, PRE_RM_HOOK, depth)?;
            remove_entity(repo)?;
            self.report(Event::success("Removed", depth));
        }

        Ok(())
    }

    /// Remove targets, running their `pre_rm` hook first.
    pub fn remove_targets(&self, targets: &[Target]) -> Result<()> {
        for (index, target) in targets.iter().enumerate() {
            require_exists(target)?;
            self.report(Event::title(
                format!("({}/{}) Removing {}", index + 1, targets.len(), target.label()),
                Depth::ROOT,
            ));
            let depth = Depth::ROOT.nested();

            self.run_optional_hook(target, PRE_RM_HOOK, depth)?;
            remove_entity(target)?;
            self.report(Event::success("Removed", depth));
        }

        Ok(())
    }

    pub fn list_repositories(&self) -> Result<Vec<Listing>> {
        Repository::list(self.program)?
            .iter()
            .map(|repo| self.listing(repo))
            .collect()
    }

    pub fn list_targets(&self, repo: &Repository) -> Result<Vec<Listing>> {
        require_exists(repo)?;
        repo.targets()?
            .iter()
            .map(|target| self.listing(target))
            .collect()
    }

    fn listing(&self, entity: &dyn Entity) -> Result<Listing> {
        Ok(Listing {
            name: entity.name().to_string(),
            description: self.describe(entity),
            disabled: self.lifecycle.is_disabled(entity)?,
        })
    }

    /// The output of the `ls` hook, if it exists and succeeds.
    fn describe(&self, entity: &dyn Entity) -> Option<String> {
        let script = hooks::locate(entity, LS_HOOK).ok()?;
        match self
            .runner
            .run(&script, entity.environment(), &RunOptions::default())
        {
            Ok(run) if run.success() && !run.output.is_empty() => Some(run.output),
            Ok(run) => {
                debug!("No description for {}: {:?}.", entity.label(), run.status);
                None
            }
            Err(err) => {
                warn!("Cannot describe {}: {err}.", entity.label());
                None
            }
        }
    }

    /// The hooks of an entity with their resolved entry commands.
    pub fn hooks(&self, entity: &dyn Entity) -> Result<Vec<HookInfo>> {
        require_exists(entity)?;
        Ok(hooks::list_hooks(
            entity.hooks_dir(),
            &self.program.default_shell,
        )?)
    }
}

fn remove_entity(entity: &dyn Entity) -> Result<()> {
    fs::remove_dir_all(entity.path()).map_err(|err| {
        Error::io(
            format!("failed to remove {} '{}'", entity.kind(), entity.label()),
            err,
        )
    })
}

/// Copy the contents of a template into a directory, keeping file permissions.
fn copy_template(template: &Path, destination: &Path) -> Result<()> {
    for entry in WalkDir::new(template).min_depth(1) {
        let entry = entry.map_err(|err| {
            let context = format!("failed to read template {}", template.display());
            match err.into_io_error() {
                Some(err) => Error::io(context, err),
                None => Error::Configuration(context),
            }
        })?;

        let relative = entry
            .path()
            .strip_prefix(template)
            .map_err(|_| {
                Error::Configuration(format!("invalid template path {}", entry.path().display()))
            })?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|err| Error::io(format!("failed to create {}", target.display()), err))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|err| {
                Error::io(format!("failed to copy {}", entry.path().display()), err)
            })?;
        }
    }

    Ok(())
}
