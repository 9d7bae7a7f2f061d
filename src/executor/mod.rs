// Executor module - where commands actually run

use async_trait::async_trait;

use crate::context::Context;
use crate::observer::Observer;
use crate::output::errors::CommandError;

pub mod dry_run;
pub mod fake;
pub mod local;
pub mod parallel;
pub mod ssh;

pub use dry_run::DryRunExecutor;
pub use fake::{FakeExecutor, FakeResponse};
pub use local::LocalExecutor;
pub use parallel::{ParallelExecutor, ParallelResult};
pub use ssh::{SshExecutor, SshOptions};

/// Runs a shell command somewhere and returns its combined stdout/stderr.
///
/// Implementations bracket every call with the observer's
/// `on_execution_start`/`on_execution_end` (see [`crate::observer::ExecutionGuard`])
/// and honour the context's cancellation and deadline. Executors take
/// `&mut self`: the fake and dry-run variants keep a command history, and
/// one executor serves one strictly ordered stream of commands.
#[async_trait]
pub trait Executor: Send {
    async fn execute(
        &mut self,
        ctx: &Context,
        command: &str,
        observer: &dyn Observer,
    ) -> Result<String, CommandError>;
}

#[async_trait]
impl<E: Executor + ?Sized> Executor for Box<E> {
    async fn execute(
        &mut self,
        ctx: &Context,
        command: &str,
        observer: &dyn Observer,
    ) -> Result<String, CommandError> {
        (**self).execute(ctx, command, observer).await
    }
}
