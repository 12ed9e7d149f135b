pub mod changeset;
pub mod cli;
pub mod config;
pub mod context;
pub mod diff;
pub mod error;
pub mod git;
pub mod orchestrator;
pub mod shell;
pub mod workspace;

pub use cli::Args;
pub use context::RunContext;
pub use error::{ChangesetsError, Result};
pub use orchestrator::{Orchestrator, RunSummary};
