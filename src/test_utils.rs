use crate::{
    entity::{Entity, Repository, Target},
    program::Program,
};
use rand::distributions::{Alphanumeric, DistString};
use std::{fs, path::Path};

fn get_random_id() -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), 16)
}

/// A data directory under `test_directories/`, removed when dropped.
pub struct TestData {
    program: Program,
}

impl TestData {
    /// A fresh, empty directory without the data layout.
    pub fn empty() -> Self {
        let id = get_random_id();
        let root = format!("test_directories/{id}");
        fs::create_dir_all(&root).unwrap();
        let root = fs::canonicalize(root).unwrap();

        TestData {
            program: Program::new(root, "/bin/sh"),
        }
    }

    /// A fresh data directory with the repos and templates directories.
    pub fn new() -> Self {
        let data = TestData::empty();
        data.program.ensure_layout().unwrap();
        data
    }

    pub fn root(&self) -> &Path {
        &self.program.data_dir
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn create_repository(&self, name: &str) -> Repository {
        let repo = Repository::new(name, &self.program);
        fs::create_dir_all(repo.hooks_dir()).unwrap();
        fs::create_dir_all(repo.targets_dir()).unwrap();
        repo
    }

    pub fn create_target(&self, repo: &Repository, name: &str) -> Target {
        let target = Target::new(repo, name);
        fs::create_dir_all(target.hooks_dir()).unwrap();
        fs::create_dir_all(target.pool_dir()).unwrap();
        target
    }

    /// Write a shell script as the hook of the entity.
    pub fn write_hook(&self, entity: &dyn Entity, hook: &str, script: &str) {
        fs::create_dir_all(entity.hooks_dir()).unwrap();
        fs::write(entity.hook_path(hook), format!("{script}\n")).unwrap();
    }
}

impl Drop for TestData {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(self.root());
    }
}
