//! Sequencing of hook runs over a batch of entities.
//!
//! A target run walks through these stages for its repository:
//!
//! ```text
//! Idle -> SetupTemp -> RunningPreHooks -> RunningEntityHooks -> RunningPostHooks -> TeardownTemp -> Done
//! ```
//!
//! Any failure in a running stage moves to `Failed`. Every temporary directory
//! created on the way is removed before the error is returned.

use crate::{
    entity::{require_exists, Entity, Repository, Target},
    hooks::{self, HookRunner, RunOptions},
    program::Program,
    report::{Depth, Event, Reporter},
    state::{FlagStore, Lifecycle, SentinelStore, Transition},
    tempdir::{Teardown, TempDirError, TempDirGuard, TempDirOptions},
    Error, Result,
};
use log::trace;
use std::fmt::{self, Display};

/// The hook run by `targets update`.
pub const UPDATE_HOOK: &str = "update";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    SetupTemp,
    RunningPreHooks,
    RunningEntityHooks,
    RunningPostHooks,
    TeardownTemp,
    Done,
    Failed,
}

impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::SetupTemp => "setting up temporary directory",
            Stage::RunningPreHooks => "running pre-hooks",
            Stage::RunningEntityHooks => "running hooks",
            Stage::RunningPostHooks => "running post-hooks",
            Stage::TeardownTemp => "removing temporary directory",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// What to run on a batch and how.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HookPlan {
    /// Hooks run on every entity of the batch, in this order.
    pub hooks: Vec<String>,
    /// Repository hooks run once before the targets.
    pub pre_hooks: Vec<String>,
    /// Repository hooks run once after every target succeeded.
    pub post_hooks: Vec<String>,
    pub temp: TempDirOptions,
    pub run: RunOptions,
}

impl HookPlan {
    pub fn new(hooks: Vec<String>) -> Self {
        HookPlan {
            hooks,
            ..Default::default()
        }
    }
}

/// The non-fatal result recorded for one entity of a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The entity is disabled, nothing was run.
    Skipped,
    /// The entity was already in the requested state.
    Unchanged,
}

/// Per-entity outcomes of a batch that did not fail, in processing order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<(String, Outcome)>,
}

impl BatchReport {
    fn record(&mut self, entity: &dyn Entity, outcome: Outcome) {
        self.outcomes.push((entity.label(), outcome));
    }

    /// The outcome of the entity with this label, if it was processed.
    pub fn outcome(&self, label: &str) -> Option<Outcome> {
        self.outcomes
            .iter()
            .find(|(recorded, _)| recorded == label)
            .map(|(_, outcome)| *outcome)
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, recorded)| *recorded == outcome)
            .count()
    }
}

/// Drives hooks over repositories and targets.
pub struct Orchestrator<'a, S: FlagStore = SentinelStore> {
    lifecycle: Lifecycle<S>,
    runner: HookRunner,
    reporter: &'a dyn Reporter,
}

impl<'a> Orchestrator<'a> {
    pub fn new(program: &Program, reporter: &'a dyn Reporter) -> Self {
        Orchestrator::with_lifecycle(program, Lifecycle::new(), reporter)
    }
}

impl<'a, S: FlagStore> Orchestrator<'a, S> {
    pub fn with_lifecycle(
        program: &Program,
        lifecycle: Lifecycle<S>,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Orchestrator {
            lifecycle,
            runner: HookRunner::new(&program.default_shell),
            reporter,
        }
    }

    fn report(&self, event: Event) {
        self.reporter.report(&event);
    }

    fn enter(&self, entity: &dyn Entity, stage: Stage) {
        trace!("{}: {stage}.", entity.label());
    }

    /// Run `plan.hooks` on every repository, one after the other.
    ///
    /// Disabled repositories are skipped. A missing or failing hook stops the
    /// batch after the temporary directory of that repository is removed.
    pub fn run_repository_hooks(
        &self,
        repos: &[Repository],
        plan: &HookPlan,
    ) -> Result<BatchReport> {
        if plan.hooks.is_empty() {
            return Err(Error::Configuration(String::from(
                "at least one hook should be specified",
            )));
        }
        if !plan.pre_hooks.is_empty() || !plan.post_hooks.is_empty() {
            return Err(Error::Configuration(String::from(
                "repository hooks cannot have pre or post hooks",
            )));
        }
        for repo in repos {
            require_exists(repo)?;
        }

        let mut report = BatchReport::default();
        for (index, repo) in repos.iter().enumerate() {
            self.report(Event::title(
                format!(
                    "({}/{}) Running hook(s) on {}",
                    index + 1,
                    repos.len(),
                    repo.label()
                ),
                Depth::ROOT,
            ));

            if self.lifecycle.is_disabled(repo)? {
                self.report(Event::attention("Repo is disabled", Depth::ROOT.nested()));
                report.record(repo, Outcome::Skipped);
                continue;
            }

            self.run_scoped(repo, &plan.hooks, plan, Depth::ROOT.nested())?;
            report.record(repo, Outcome::Completed);
        }

        Ok(report)
    }

    /// Run `plan.hooks` on the targets of one repository.
    ///
    /// The repository's pre-hooks run first and its post-hooks last, all
    /// inside the repository's temporary directory. The first failure stops
    /// the batch: the remaining targets never start.
    pub fn run_target_hooks(
        &self,
        repo: &Repository,
        targets: &[Target],
        plan: &HookPlan,
    ) -> Result<BatchReport> {
        if plan.hooks.is_empty() {
            return Err(Error::Configuration(String::from(
                "at least one hook should be specified",
            )));
        }
        require_exists(repo)?;
        for target in targets {
            require_exists(target)?;
        }

        let mut report = BatchReport::default();
        if self.lifecycle.is_disabled(repo)? {
            self.report(Event::attention(
                format!("Repo {} is disabled", repo.label()),
                Depth::ROOT,
            ));
            report.record(repo, Outcome::Skipped);
            return Ok(report);
        }

        self.enter(repo, Stage::SetupTemp);
        let (repo_temp, _) = TempDirGuard::acquire(repo, plan.temp)?;

        let mut reached = Stage::SetupTemp;
        let result = self.run_target_stages(repo, targets, plan, &mut report, &mut reached);

        self.enter(repo, Stage::TeardownTemp);
        // Repository hook failures never leave the repository directory behind.
        let teardown = match (&result, reached) {
            (Err(_), Stage::RunningPreHooks | Stage::RunningPostHooks) => {
                repo_temp.release_forced()
            }
            _ => repo_temp.release(),
        };

        self.finish_repository(repo, result, teardown, report)
    }

    /// Settle a target run once the repository directory is released. A
    /// teardown failure is reported and never changes the result.
    fn finish_repository(
        &self,
        repo: &Repository,
        result: Result<()>,
        teardown: Result<Teardown, TempDirError>,
        mut report: BatchReport,
    ) -> Result<BatchReport> {
        if let Err(err) = teardown {
            self.report(Event::error(err.to_string(), Depth::ROOT));
        }

        match result {
            Ok(()) => {
                self.enter(repo, Stage::Done);
                report.record(repo, Outcome::Completed);
                Ok(report)
            }
            Err(err) => {
                self.enter(repo, Stage::Failed);
                Err(err)
            }
        }
    }

    /// Run the `update` hook on the targets, with optional repository hooks around it.
    pub fn update_targets(
        &self,
        repo: &Repository,
        targets: &[Target],
        pre_hooks: Vec<String>,
        post_hooks: Vec<String>,
    ) -> Result<BatchReport> {
        let plan = HookPlan {
            hooks: vec![UPDATE_HOOK.to_string()],
            pre_hooks,
            post_hooks,
            temp: TempDirOptions::default(),
            run: RunOptions {
                echo_command: true,
                stream_output: true,
            },
        };

        self.run_target_hooks(repo, targets, &plan)
    }

    fn run_target_stages(
        &self,
        repo: &Repository,
        targets: &[Target],
        plan: &HookPlan,
        report: &mut BatchReport,
        stage: &mut Stage,
    ) -> Result<()> {
        *stage = Stage::RunningPreHooks;
        self.enter(repo, *stage);
        for hook in &plan.pre_hooks {
            self.run_hook(repo, hook, plan.run, Depth::ROOT)?;
        }

        *stage = Stage::RunningEntityHooks;
        self.enter(repo, *stage);
        for (index, target) in targets.iter().enumerate() {
            self.report(Event::title(
                format!(
                    "({}/{}) Running hook(s) on {}",
                    index + 1,
                    targets.len(),
                    target.label()
                ),
                Depth::ROOT,
            ));

            if self.lifecycle.is_disabled(target)? {
                self.report(Event::attention("Target is disabled", Depth::ROOT.nested()));
                report.record(target, Outcome::Skipped);
                continue;
            }

            self.run_scoped(target, &plan.hooks, plan, Depth::ROOT.nested())?;
            report.record(target, Outcome::Completed);
        }

        *stage = Stage::RunningPostHooks;
        self.enter(repo, *stage);
        for hook in &plan.post_hooks {
            self.run_hook(repo, hook, plan.run, Depth::ROOT)?;
        }

        Ok(())
    }

    /// Run hooks inside the entity's own temporary directory.
    fn run_scoped(
        &self,
        entity: &dyn Entity,
        hooks: &[String],
        plan: &HookPlan,
        depth: Depth,
    ) -> Result<()> {
        self.enter(entity, Stage::SetupTemp);
        let (temp, _) = TempDirGuard::acquire(entity, plan.temp)?;

        let result = hooks
            .iter()
            .try_for_each(|hook| self.run_hook(entity, hook, plan.run, depth));

        self.enter(entity, Stage::TeardownTemp);
        match (result, temp.release()) {
            (Ok(()), Ok(_)) => Ok(()),
            (Ok(()), Err(err)) => Err(err.into()),
            (Err(err), Ok(_)) => Err(err),
            (Err(err), Err(teardown)) => {
                self.report(Event::error(teardown.to_string(), depth));
                Err(err)
            }
        }
    }

    fn run_hook(
        &self,
        entity: &dyn Entity,
        hook: &str,
        options: RunOptions,
        depth: Depth,
    ) -> Result<()> {
        self.report(Event::title(
            format!("Running {hook} hook on {}", entity.label()),
            depth,
        ));

        let script = match hooks::locate(entity, hook) {
            Ok(script) => script,
            Err(err) => {
                self.report(Event::error(format!("No '{hook}' hook found"), depth.nested()));
                return Err(err.into());
            }
        };

        let run = self.runner.run(&script, entity.environment(), &options)?;
        if run.success() {
            self.report(Event::success("Finished", depth.nested()));
            Ok(())
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

    /// Enable every entity, continuing past the ones already enabled.
    pub fn enable(&self, entities: &[&dyn Entity]) -> Result<BatchReport> {
        self.transition(entities, true)
    }

    /// Disable every entity, continuing past the ones already disabled.
    pub fn disable(&self, entities: &[&dyn Entity]) -> Result<BatchReport> {
        self.transition(entities, false)
    }

    fn transition(&self, entities: &[&dyn Entity], enable: bool) -> Result<BatchReport> {
        let (verb, state) = if enable {
            ("Enabling", "enabled")
        } else {
            ("Disabling", "disabled")
        };

        let mut report = BatchReport::default();
        for entity in entities {
            self.report(Event::title(
                format!("{verb} {} {}", entity.kind(), entity.label()),
                Depth::ROOT,
            ));
            require_exists(*entity)?;

            let transition = if enable {
                self.lifecycle.enable(*entity)?
            } else {
                self.lifecycle.disable(*entity)?
            };

            match transition {
                Transition::Changed => {
                    self.report(Event::success(
                        format!("The {} is now {state}", entity.kind()),
                        Depth::ROOT.nested(),
                    ));
                    report.record(*entity, Outcome::Completed);
                }
                Transition::AlreadyInState => {
                    self.report(Event::attention(
                        format!("The {} is already {state}", entity.kind()),
                        Depth::ROOT.nested(),
                    ));
                    report.record(*entity, Outcome::Unchanged);
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        report::{MockReporter, Severity},
        test_utils::TestData,
    };
    use std::{
        fs, io,
        path::Path,
        sync::{Arc, Mutex},
    };

    fn quiet_reporter() -> MockReporter {
        let mut reporter = MockReporter::new();
        reporter.expect_report().return_const(());
        reporter
    }

    fn recording_reporter() -> (MockReporter, Arc<Mutex<Vec<Event>>>) {
        let events = Arc::new(Mutex::new(vec![]));
        let recorded = Arc::clone(&events);
        let mut reporter = MockReporter::new();
        reporter
            .expect_report()
            .returning(move |event| recorded.lock().unwrap().push(event.clone()));
        (reporter, events)
    }

    fn hooks(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    /// A hook appending its name to the `calls` file of the data directory.
    fn recording_hook(name: &str, exit_code: i32) -> String {
        format!("echo \"{name}\" >> \"$DATA_DIR/calls\"\nexit {exit_code}")
    }

    fn read_calls(data: &TestData) -> Vec<String> {
        fs::read_to_string(data.root().join("calls"))
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }

    fn has_temp_dirs(root: &Path) -> bool {
        walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .any(|entry| entry.file_name() == ".tmp")
    }

    #[test]
    fn it_should_run_hooks_on_every_target() -> Result<()> {
        let data = TestData::new();
        let repo = data.create_repository("core");
        let a = data.create_target(&repo, "a");
        let b = data.create_target(&repo, "b");
        data.write_hook(&a, "update", &recording_hook("a", 0));
        data.write_hook(&b, "update", &recording_hook("b", 0));

        let reporter = quiet_reporter();
        let orchestrator = Orchestrator::new(data.program(), &reporter);
        let report = orchestrator.run_target_hooks(&repo, &[a, b], &HookPlan::new(hooks(&["update"])))?;

        assert_eq!(vec!["a", "b"], read_calls(&data));
        assert_eq!(Some(Outcome::Completed), report.outcome("core/a"));
        assert_eq!(Some(Outcome::Completed), report.outcome("core/b"));
        assert_eq!(Some(Outcome::Completed), report.outcome("core"));
        assert!(!has_temp_dirs(data.root()));

        Ok(())
    }

    #[test]
    fn it_should_run_pre_and_post_hooks_around_the_targets() -> Result<()> {
        let data = TestData::new();
        let repo = data.create_repository("core");
        let a = data.create_target(&repo, "a");
        data.write_hook(&repo, "lock", &recording_hook("lock", 0));
        data.write_hook(&repo, "publish", &recording_hook("publish", 0));
        data.write_hook(&a, "fetch", &recording_hook("fetch", 0));
        data.write_hook(&a, "build", &recording_hook("build", 0));

        let plan = HookPlan {
            pre_hooks: hooks(&["lock"]),
            post_hooks: hooks(&["publish"]),
            ..HookPlan::new(hooks(&["fetch", "build"]))
        };
        let reporter = quiet_reporter();
        Orchestrator::new(data.program(), &reporter).run_target_hooks(&repo, &[a], &plan)?;

        assert_eq!(vec!["lock", "fetch", "build", "publish"], read_calls(&data));

        Ok(())
    }

    #[test]
    fn it_should_stop_the_batch_on_the_first_failure() {
        let data = TestData::new();
        let repo = data.create_repository("core");
        let a = data.create_target(&repo, "a");
        let b = data.create_target(&repo, "b");
        data.write_hook(&repo, "publish", &recording_hook("publish", 0));
        data.write_hook(&a, "update", &recording_hook("a", 1));
        data.write_hook(&b, "update", &recording_hook("b", 0));

        let reporter = quiet_reporter();
        let orchestrator = Orchestrator::new(data.program(), &reporter);
        let plan = HookPlan {
            post_hooks: hooks(&["publish"]),
            ..HookPlan::new(hooks(&["update"]))
        };
        let error = orchestrator.run_target_hooks(&repo, &[a.clone(), b], &plan).err().unwrap();

        assert!(
            matches!(error, Error::HookFailure { code: 1, .. }),
            "{error:?} should be HookFailure"
        );
        assert_eq!(1, error.exit_code());
        assert_eq!(vec!["a"], read_calls(&data));
        assert!(!a.temp_dir().exists());
        assert!(!repo.temp_dir().exists());
        assert!(!has_temp_dirs(data.root()));
    }

    #[test]
    fn it_should_keep_the_exit_code_of_the_failing_hook() {
        let data = TestData::new();
        let repo = data.create_repository("core");
        let a = data.create_target(&repo, "a");
        data.write_hook(&a, "update", "echo broken\nexit 42");

        let reporter = quiet_reporter();
        let error = Orchestrator::new(data.program(), &reporter)
            .update_targets(&repo, &[a], vec![], vec![])
            .err()
            .unwrap();

        match error {
            Error::HookFailure { code, output, .. } => {
                assert_eq!(42, code);
                assert_eq!("broken", output);
            }
            _ => panic!("{error:?} should be HookFailure"),
        }
    }

    #[test]
    fn it_should_skip_disabled_targets() -> Result<()> {
        let data = TestData::new();
        let repo = data.create_repository("core");
        let a = data.create_target(&repo, "a");
        let b = data.create_target(&repo, "b");
        data.write_hook(&a, "update", &recording_hook("a", 0));
        data.write_hook(&b, "update", &recording_hook("b", 0));
        Lifecycle::new().disable(&a)?;

        let (reporter, events) = recording_reporter();
        let report = Orchestrator::new(data.program(), &reporter)
            .update_targets(&repo, &[a.clone(), b], vec![], vec![])?;

        assert_eq!(vec!["b"], read_calls(&data));
        assert_eq!(Some(Outcome::Skipped), report.outcome("core/a"));
        assert_eq!(Some(Outcome::Completed), report.outcome("core/b"));
        assert!(!a.temp_dir().exists());
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|event| event.message == "Target is disabled" && event.severity == Severity::Attention));

        Ok(())
    }

    #[test]
    fn it_should_skip_disabled_repositories() -> Result<()> {
        let data = TestData::new();
        let repo = data.create_repository("core");
        let a = data.create_target(&repo, "a");
        data.write_hook(&repo, "lock", &recording_hook("lock", 0));
        data.write_hook(&a, "update", &recording_hook("a", 0));
        Lifecycle::new().disable(&repo)?;

        let reporter = quiet_reporter();
        let report = Orchestrator::new(data.program(), &reporter)
            .update_targets(&repo, &[a], hooks(&["lock"]), vec![])?;

        assert!(read_calls(&data).is_empty());
        assert_eq!(Some(Outcome::Skipped), report.outcome("core"));
        assert!(!repo.temp_dir().exists());

        Ok(())
    }

    #[test]
    fn it_should_fail_on_missing_target_hooks() {
        let data = TestData::new();
        let repo = data.create_repository("core");
        let a = data.create_target(&repo, "a");
        let b = data.create_target(&repo, "b");
        let c = data.create_target(&repo, "c");
        data.write_hook(&a, "deploy", &recording_hook("a", 0));
        data.write_hook(&c, "deploy", &recording_hook("c", 0));

        let (reporter, events) = recording_reporter();
        let error = Orchestrator::new(data.program(), &reporter)
            .run_target_hooks(&repo, &[a, b, c], &HookPlan::new(hooks(&["deploy"])))
            .err()
            .unwrap();

        assert!(
            matches!(error, Error::NotFound(_)),
            "{error:?} should be NotFound"
        );
        assert_eq!(vec!["a"], read_calls(&data));
        assert!(!has_temp_dirs(data.root()));
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|event| event.message == "No 'deploy' hook found" && event.severity == Severity::Error));
    }

    #[test]
    fn it_should_fail_on_missing_pre_hooks() {
        let data = TestData::new();
        let repo = data.create_repository("core");
        let a = data.create_target(&repo, "a");
        data.write_hook(&a, "update", &recording_hook("a", 0));

        let reporter = quiet_reporter();
        let error = Orchestrator::new(data.program(), &reporter)
            .update_targets(&repo, &[a], hooks(&["lock"]), vec![])
            .err()
            .unwrap();

        assert!(
            matches!(error, Error::NotFound(_)),
            "{error:?} should be NotFound"
        );
        assert!(read_calls(&data).is_empty());
        assert!(!repo.temp_dir().exists());
    }

    #[test]
    fn it_should_fail_on_failing_post_hooks() {
        let data = TestData::new();
        let repo = data.create_repository("core");
        let a = data.create_target(&repo, "a");
        data.write_hook(&repo, "publish", &recording_hook("publish", 5));
        data.write_hook(&a, "update", &recording_hook("a", 0));

        let reporter = quiet_reporter();
        let error = Orchestrator::new(data.program(), &reporter)
            .update_targets(&repo, &[a], vec![], hooks(&["publish"]))
            .err()
            .unwrap();

        assert_eq!(5, error.exit_code());
        assert_eq!(vec!["a", "publish"], read_calls(&data));
        assert!(!has_temp_dirs(data.root()));
    }

    #[test]
    fn it_should_remove_kept_repository_directories_when_repository_hooks_fail() {
        let data = TestData::new();
        let repo = data.create_repository("core");
        let a = data.create_target(&repo, "a");
        data.write_hook(&repo, "lock", &recording_hook("lock", 3));
        data.write_hook(&repo, "publish", &recording_hook("publish", 4));
        data.write_hook(&a, "build", &recording_hook("a", 0));
        let keep = TempDirOptions {
            create: true,
            remove: false,
        };
        let reporter = quiet_reporter();
        let orchestrator = Orchestrator::new(data.program(), &reporter);

        let plan = HookPlan {
            pre_hooks: hooks(&["lock"]),
            temp: keep,
            ..HookPlan::new(hooks(&["build"]))
        };
        let error = orchestrator
            .run_target_hooks(&repo, &[a.clone()], &plan)
            .err()
            .unwrap();
        assert_eq!(3, error.exit_code());
        assert!(!repo.temp_dir().exists());

        let plan = HookPlan {
            post_hooks: hooks(&["publish"]),
            temp: keep,
            ..HookPlan::new(hooks(&["build"]))
        };
        let error = orchestrator
            .run_target_hooks(&repo, &[a.clone()], &plan)
            .err()
            .unwrap();
        assert_eq!(4, error.exit_code());
        assert!(!repo.temp_dir().exists());
        assert!(a.temp_dir().is_dir());
    }

    #[test]
    fn it_should_keep_repository_directories_when_targets_fail() {
        let data = TestData::new();
        let repo = data.create_repository("core");
        let a = data.create_target(&repo, "a");
        data.write_hook(&a, "build", &recording_hook("a", 2));

        let plan = HookPlan {
            temp: TempDirOptions {
                create: true,
                remove: false,
            },
            ..HookPlan::new(hooks(&["build"]))
        };
        let reporter = quiet_reporter();
        let error = Orchestrator::new(data.program(), &reporter)
            .run_target_hooks(&repo, &[a.clone()], &plan)
            .err()
            .unwrap();

        assert_eq!(2, error.exit_code());
        assert!(repo.temp_dir().is_dir());
        assert!(a.temp_dir().is_dir());
    }

    #[test]
    fn it_should_only_report_repository_teardown_failures() {
        let data = TestData::new();
        let repo = data.create_repository("core");
        let (reporter, events) = recording_reporter();
        let orchestrator = Orchestrator::new(data.program(), &reporter);
        let teardown_error = || -> Result<Teardown, TempDirError> {
            Err(TempDirError::Remove(
                repo.temp_dir().to_path_buf(),
                io::Error::new(io::ErrorKind::Other, "device or resource busy"),
            ))
        };

        let report = orchestrator
            .finish_repository(&repo, Ok(()), teardown_error(), BatchReport::default())
            .unwrap();
        assert_eq!(Some(Outcome::Completed), report.outcome("core"));

        let failure = Error::HookFailure {
            hook: String::from("'update' of core/a"),
            code: 7,
            output: String::new(),
        };
        let error = orchestrator
            .finish_repository(&repo, Err(failure), teardown_error(), BatchReport::default())
            .err()
            .unwrap();
        assert_eq!(7, error.exit_code());

        let events = events.lock().unwrap();
        let teardown_reports = events
            .iter()
            .filter(|event| event.severity == Severity::Error && event.message.contains(".tmp"))
            .count();
        assert_eq!(2, teardown_reports);
    }

    #[test]
    fn it_should_share_temporary_directories_with_hooks() -> Result<()> {
        let data = TestData::new();
        let repo = data.create_repository("core");
        let a = data.create_target(&repo, "a");
        data.write_hook(
            &a,
            "update",
            "test -d \"$REPO_TEMP_DIR\" && test -d \"$TARGET_TEMP_DIR\"",
        );

        let reporter = quiet_reporter();
        Orchestrator::new(data.program(), &reporter).update_targets(&repo, &[a], vec![], vec![])?;

        assert!(!has_temp_dirs(data.root()));

        Ok(())
    }

    #[test]
    fn it_should_respect_the_temporary_directory_options() -> Result<()> {
        let data = TestData::new();
        let repo = data.create_repository("core");
        let a = data.create_target(&repo, "a");
        data.write_hook(&a, "build", "test ! -e \"$TARGET_TEMP_DIR\"");

        let plan = HookPlan {
            temp: TempDirOptions {
                create: false,
                remove: true,
            },
            ..HookPlan::new(hooks(&["build"]))
        };
        let reporter = quiet_reporter();
        Orchestrator::new(data.program(), &reporter).run_target_hooks(&repo, &[a.clone()], &plan)?;

        let plan = HookPlan {
            temp: TempDirOptions {
                create: true,
                remove: false,
            },
            ..HookPlan::new(hooks(&["build"]))
        };
        data.write_hook(&a, "build", "touch \"$TARGET_TEMP_DIR/artifact\"");
        Orchestrator::new(data.program(), &reporter).run_target_hooks(&repo, &[a.clone()], &plan)?;
        assert!(a.temp_dir().join("artifact").exists());
        assert!(repo.temp_dir().is_dir());

        Ok(())
    }

    #[test]
    fn it_should_reject_empty_hook_lists() {
        let data = TestData::new();
        let repo = data.create_repository("core");
        data.write_hook(&repo, "lock", &recording_hook("lock", 0));

        let reporter = quiet_reporter();
        let plan = HookPlan {
            pre_hooks: hooks(&["lock"]),
            ..HookPlan::default()
        };
        let error = Orchestrator::new(data.program(), &reporter)
            .run_target_hooks(&repo, &[], &plan)
            .err()
            .unwrap();

        assert!(
            matches!(error, Error::Configuration(_)),
            "{error:?} should be Configuration"
        );
        assert!(read_calls(&data).is_empty());
        assert!(!repo.temp_dir().exists());
    }

    #[test]
    fn it_should_fail_on_missing_targets() {
        let data = TestData::new();
        let repo = data.create_repository("core");
        let missing = Target::new(&repo, "missing");

        let reporter = quiet_reporter();
        let error = Orchestrator::new(data.program(), &reporter)
            .run_target_hooks(&repo, &[missing], &HookPlan::new(hooks(&["update"])))
            .err()
            .unwrap();

        assert!(
            matches!(error, Error::NotFound(_)),
            "{error:?} should be NotFound"
        );
    }

    #[test]
    fn it_should_run_repository_hooks_in_order() -> Result<()> {
        let data = TestData::new();
        let core = data.create_repository("core");
        let extra = data.create_repository("extra");
        let testing = data.create_repository("testing");
        data.write_hook(&core, "sync", &recording_hook("core", 0));
        data.write_hook(&extra, "sync", &recording_hook("extra", 0));
        data.write_hook(&testing, "sync", &recording_hook("testing", 0));
        Lifecycle::new().disable(&extra)?;

        let reporter = quiet_reporter();
        let report = Orchestrator::new(data.program(), &reporter)
            .run_repository_hooks(&[core, extra, testing], &HookPlan::new(hooks(&["sync"])))?;

        assert_eq!(vec!["core", "testing"], read_calls(&data));
        assert_eq!(Some(Outcome::Skipped), report.outcome("extra"));
        assert_eq!(2, report.count(Outcome::Completed));
        assert!(!has_temp_dirs(data.root()));

        Ok(())
    }

    #[test]
    fn it_should_abort_repository_runs_on_failure() {
        let data = TestData::new();
        let core = data.create_repository("core");
        let extra = data.create_repository("extra");
        data.write_hook(&core, "sync", &recording_hook("core", 7));
        data.write_hook(&extra, "sync", &recording_hook("extra", 0));

        let reporter = quiet_reporter();
        let error = Orchestrator::new(data.program(), &reporter)
            .run_repository_hooks(&[core, extra], &HookPlan::new(hooks(&["sync"])))
            .err()
            .unwrap();

        assert_eq!(7, error.exit_code());
        assert_eq!(vec!["core"], read_calls(&data));
        assert!(!has_temp_dirs(data.root()));
    }

    #[test]
    fn it_should_enable_and_disable_batches() -> Result<()> {
        let data = TestData::new();
        let repo = data.create_repository("core");
        let a = data.create_target(&repo, "a");
        let b = data.create_target(&repo, "b");
        Lifecycle::new().disable(&a)?;

        let reporter = quiet_reporter();
        let orchestrator = Orchestrator::new(data.program(), &reporter);

        let report = orchestrator.disable(&[&a, &b])?;
        assert_eq!(Some(Outcome::Unchanged), report.outcome("core/a"));
        assert_eq!(Some(Outcome::Completed), report.outcome("core/b"));

        let report = orchestrator.enable(&[&repo, &a, &b])?;
        assert_eq!(Some(Outcome::Unchanged), report.outcome("core"));
        assert_eq!(2, report.count(Outcome::Completed));
        assert!(!a.disabled_path().exists());

        Ok(())
    }

    #[test]
    fn it_should_stop_transitions_on_missing_entities() {
        let data = TestData::new();
        let repo = data.create_repository("core");
        let missing = Repository::new("missing", data.program());

        let reporter = quiet_reporter();
        let error = Orchestrator::new(data.program(), &reporter)
            .disable(&[&repo, &missing])
            .err()
            .unwrap();

        assert!(
            matches!(error, Error::NotFound(_)),
            "{error:?} should be NotFound"
        );
        assert!(repo.disabled_path().exists());
    }
}
