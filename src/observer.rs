// Progress notification hooks

use tracing::{debug, warn};

use crate::output::errors::{ActionError, CommandError};

/// Sink for progress notifications.
///
/// Action-level hooks bracket one `Action::handle`; execution-level hooks
/// bracket one command. Only the `*_start` hooks can veto the work they
/// announce. Errors from `*_end` and output hooks are logged and dropped.
pub trait Observer: Send + Sync {
    fn on_action_start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_action_end(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_execution_start(&self, _command: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_execution_output(&self, _chunk: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_execution_end(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

/// Forward an output chunk, logging (not propagating) observer errors
pub fn emit_output(observer: &dyn Observer, chunk: &str) {
    if let Err(e) = observer.on_execution_output(chunk) {
        debug!(error = %e, "observer failed to handle output");
    }
}

/// Open execution bracket. `on_execution_end` fires when this is dropped,
/// including on early return or when the owning future is cancelled.
#[must_use = "the execution bracket closes as soon as the guard is dropped"]
pub struct ExecutionGuard<'a> {
    observer: &'a dyn Observer,
}

impl<'a> ExecutionGuard<'a> {
    pub fn start(observer: &'a dyn Observer, command: &str) -> Result<Self, CommandError> {
        observer
            .on_execution_start(command)
            .map_err(|source| CommandError::ObserverRejected {
                command: command.to_string(),
                source,
            })?;
        Ok(ExecutionGuard { observer })
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.observer.on_execution_end() {
            warn!(error = %e, "observer failed to close execution");
        }
    }
}

/// Open action bracket, closed on drop
#[must_use = "the action bracket closes as soon as the guard is dropped"]
pub struct ActionGuard<'a> {
    observer: &'a dyn Observer,
}

impl<'a> ActionGuard<'a> {
    pub fn start(observer: &'a dyn Observer) -> Result<Self, ActionError> {
        observer
            .on_action_start()
            .map_err(ActionError::ObserverRejected)?;
        Ok(ActionGuard { observer })
    }
}

impl Drop for ActionGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.observer.on_action_end() {
            warn!(error = %e, "observer failed to close action");
        }
    }
}
