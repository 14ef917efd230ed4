//! Manage repositories of targets and drive their lifecycle with hook scripts.
//!
//! ## How it works
//!
//! `pacpilot` keeps a data directory of **repositories**, each holding
//! **targets**. Both of them carry **hooks**: opaque scripts that do the
//! actual work (building, publishing, cleaning up). The engine decides which
//! hooks run, in which order, with which environment, and what happens when
//! one of them fails.
//!
//! ```ignore
//! <data>/repos/<repo>/hooks/<hook>
//! <data>/repos/<repo>/targets/<target>/hooks/<hook>
//! ```
//!
//! A target run executes the repository's pre-hooks, then the requested hooks
//! on every target, then the repository's post-hooks. Each entity gets a fresh
//! `.tmp` directory for the duration of its hooks. The first failing hook
//! stops the batch and its exit code becomes the exit code of the process.
//!

/// Repositories and targets as seen on the filesystem.
pub mod entity;
/// The environment variables hooks are started with.
pub mod environment;
/// The error kinds every operation ends with.
pub mod error;
/// Finding hooks, resolving their entry command and running them.
pub mod hooks;
/// Creating, removing and listing entities.
pub mod manage;
/// Sequencing of hooks over batches of entities, with rollback.
pub mod orchestrator;
/// Program-wide configuration.
pub mod program;
/// Progress events and their rendering.
pub mod report;
/// Resolving the entities of a batch from names, `--all` or a picker.
pub mod selection;
/// A minimal HTTP front end to list entities and run target hooks.
pub mod server;
/// The enabled/disabled state of entities.
pub mod state;
/// The ephemeral working directory of entities.
pub mod tempdir;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::Error;

/// The result type of the crate, failing with [Error] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;
