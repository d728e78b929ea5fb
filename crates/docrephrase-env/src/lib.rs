//! Environment bootstrapper for the document rephraser.
//!
//! Provisions a Python interpreter, creates an isolated virtual environment,
//! installs the pinned ML/NLP stack in dependency order and verifies every
//! critical module imports. See [`bootstrap::Bootstrapper`] for the driver.

pub mod log;

pub mod bootstrap;
pub mod corpus;
pub mod error;
pub mod interpreter;
pub mod packages;
pub mod report;
pub mod runner;
pub mod venv;
pub mod verify;

pub use bootstrap::{BootstrapOptions, BootstrapOutcome, BootstrapPlan, Bootstrapper, EnvDescriptor};
pub use error::{BootstrapError, BootstrapStep, StepFailure};
pub use runner::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
