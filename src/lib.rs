// Anvil - Minimal Server Provisioning
//
// Idempotent users, packages and services, plus named recipes of them,
// executed locally, over SSH, on many hosts at once, or as a dry run.

pub mod actions;
pub mod config;
pub mod context;
pub mod executor;
pub mod observer;
pub mod os;
pub mod output;
pub mod recipe;
pub mod runner;

pub use actions::Action;
pub use config::{ExecutorConfig, ExecutorMode, HostSpec};
pub use context::Context;
pub use executor::Executor;
pub use observer::{NoopObserver, Observer};
pub use os::{Distribution, OsFamily, OsInfo};
pub use output::{AnvilError, TerminalObserver};
pub use recipe::{Recipe, RecipeRegistry};
pub use runner::Runner;

/// Version of the anvil tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::actions::{Action, CreateUser, InstallPackage, ServiceOperation};
    pub use crate::context::Context;
    pub use crate::executor::{DryRunExecutor, Executor, LocalExecutor, ParallelExecutor};
    pub use crate::observer::{NoopObserver, Observer};
    pub use crate::os::{Distribution, OsFamily};
    pub use crate::output::AnvilError;
    pub use crate::recipe::{default_registry, Recipe, RecipeRegistry};
    pub use crate::runner::Runner;
}
