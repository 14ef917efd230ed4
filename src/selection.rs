use crate::{
    entity::{validate_name, verify_exists, Entity, EntityKind, Repository, Target},
    program::Program,
    Error, Result,
};
use mockall::automock;

/// Interactive prompts used when the user asks to pick entities by hand.
///
/// Implementations return [Error::UserCancelled] when the prompt is interrupted.
#[automock]
pub trait Picker {
    /// Pick any number of items, returning their indices.
    fn pick_many(&self, prompt: &str, items: &[String]) -> Result<Vec<usize>>;
    /// Pick exactly one item, returning its index.
    fn pick_one(&self, prompt: &str, items: &[String]) -> Result<usize>;
    fn confirm(&self, prompt: &str) -> Result<bool>;
    fn input(&self, prompt: &str) -> Result<String>;
}

/// How the user selected the entities of a batch on the command line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    /// Explicit names, possibly comma separated.
    pub names: Vec<String>,
    pub all: bool,
    pub interactive: bool,
}

impl Selection {
    /// The explicit names with commas split, blanks and duplicates removed.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = vec![];
        for name in self.names.iter().flat_map(|names| names.split(',')) {
            let name = name.trim();
            if !name.is_empty() && !names.iter().any(|existing| existing == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    fn validate(&self, kind: &str, flag: &str) -> Result<()> {
        let named = !self.names().is_empty();
        if self.interactive && (named || self.all) {
            return Err(Error::Configuration(format!(
                "flag '--interactive/-i' cannot be used together with '--{flag}' or '--all/-a'"
            )));
        }
        if !self.interactive && named && self.all {
            return Err(Error::Configuration(format!(
                "conflicting flags: both '--{flag}' and '--all/-a' cannot be specified at the same time"
            )));
        }
        if !self.interactive && !named && !self.all {
            return Err(Error::Configuration(format!(
                "missing {kind}: '--interactive/-i', '--{flag}' or '--all/-a' should be specified"
            )));
        }
        Ok(())
    }
}

/// Fail with one NotFound listing every entity that does not exist.
fn require_all_exist<E: Entity>(entities: &[E]) -> Result<()> {
    let missing: Vec<String> = entities
        .iter()
        .filter(|entity| !verify_exists(*entity))
        .map(|entity| entity.label())
        .collect();

    let kind = match entities.first() {
        Some(entity) => entity.kind(),
        None => return Ok(()),
    };
    match missing.as_slice() {
        [] => Ok(()),
        [label] => Err(Error::NotFound(format!("{kind} '{label}' not found"))),
        labels => Err(Error::NotFound(format!(
            "{kind}s '{}' not found",
            labels.join("', '")
        ))),
    }
}

fn pick_from<T: Clone>(
    picker: &dyn Picker,
    prompt: &str,
    available: &[T],
    label: impl Fn(&T) -> String,
) -> Result<Vec<T>> {
    let labels: Vec<String> = available.iter().map(label).collect();
    let indices = picker.pick_many(prompt, &labels)?;

    Ok(indices
        .into_iter()
        .filter_map(|index| available.get(index).cloned())
        .collect())
}

/// Resolve the repositories of a batch.
pub fn select_repositories(
    program: &Program,
    selection: &Selection,
    picker: &dyn Picker,
) -> Result<Vec<Repository>> {
    selection.validate("repositories", "repo/-r")?;

    let repos = if selection.interactive {
        let available = Repository::list(program)?;
        if available.is_empty() {
            return Err(Error::NotFound(String::from("no repos found")));
        }
        pick_from(picker, "Select the repo(s)", &available, |repo| {
            repo.name().to_string()
        })?
    } else if selection.all {
        Repository::list(program)?
    } else {
        let repos: Vec<Repository> = selection
            .names()
            .iter()
            .map(|name| {
                validate_name(EntityKind::Repository, name)?;
                Ok(Repository::new(name, program))
            })
            .collect::<Result<_>>()?;
        require_all_exist(&repos)?;
        repos
    };

    if repos.is_empty() {
        return Err(Error::NotFound(String::from("no repos were selected")));
    }

    Ok(repos)
}

/// Resolve one repository by name, or by asking if no name is given.
pub fn select_repository(
    program: &Program,
    name: Option<&str>,
    picker: &dyn Picker,
) -> Result<Repository> {
    let repo = match name.filter(|name| !name.is_empty()) {
        Some(name) => {
            validate_name(EntityKind::Repository, name)?;
            Repository::new(name, program)
        }
        None => {
            let available = Repository::list(program)?;
            if available.is_empty() {
                return Err(Error::NotFound(String::from("no repos found")));
            }
            let names: Vec<String> = available
                .iter()
                .map(|repo| repo.name().to_string())
                .collect();
            let index = picker.pick_one("Select the repo", &names)?;
            available
                .into_iter()
                .nth(index)
                .ok_or_else(|| Error::NotFound(String::from("no repo was selected")))?
        }
    };

    require_all_exist(std::slice::from_ref(&repo))?;
    Ok(repo)
}

/// Resolve the repository and the targets of a batch.
///
/// Outside of interactive mode the repository has to be named.
pub fn select_targets(
    program: &Program,
    repo: Option<&str>,
    selection: &Selection,
    picker: &dyn Picker,
) -> Result<(Repository, Vec<Target>)> {
    let repo = repo.filter(|repo| !repo.is_empty());
    if selection.interactive && repo.is_some() {
        return Err(Error::Configuration(String::from(
            "flag '--interactive/-i' cannot be used together with '--repo/-r'",
        )));
    }
    if !selection.interactive && repo.is_none() {
        return Err(Error::Configuration(String::from(
            "flag '--repo/-r' or '--interactive/-i' should be specified",
        )));
    }
    selection.validate("targets", "target/-t")?;
    let names = selection.names();
    for name in &names {
        validate_name(EntityKind::Target, name)?;
    }

    let repo = select_repository(program, repo, picker)?;
    let targets = if selection.interactive {
        let available = repo.targets()?;
        if available.is_empty() {
            return Err(Error::NotFound(format!(
                "no targets found in repo '{}'",
                repo.name()
            )));
        }
        pick_from(picker, "Select the target(s)", &available, |target| {
            target.name().to_string()
        })?
    } else if selection.all {
        repo.targets()?
    } else {
        let targets: Vec<Target> = names.iter().map(|name| Target::new(&repo, name)).collect();
        require_all_exist(&targets)?;
        targets
    };

    if targets.is_empty() {
        return Err(Error::NotFound(String::from("no targets were selected")));
    }

    Ok((repo, targets))
}
