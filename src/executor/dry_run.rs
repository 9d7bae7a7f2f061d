// Dry-run executor: records commands, never runs them

use async_trait::async_trait;

use super::Executor;
use crate::context::Context;
use crate::observer::{emit_output, ExecutionGuard, Observer};
use crate::output::errors::CommandError;

/// Output returned for every recorded command
pub const DRY_RUN_OUTPUT: &str = "[DRY RUN] Command would be executed";

/// Records every command and returns a placeholder.
///
/// To let check-then-act actions walk their "create" branch, the first
/// user-existence check (`id -u ...`) it sees fails with a simulated
/// "not found"; every later command succeeds. This is a preview
/// affordance, not a model of the target.
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    commands: Vec<String>,
    simulated_missing_user: bool,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        DryRunExecutor::default()
    }

    /// Commands recorded so far, in issue order
    pub fn commands(&self) -> &[String] {
        &self.commands
    }
}

#[async_trait]
impl Executor for DryRunExecutor {
    async fn execute(
        &mut self,
        _ctx: &Context,
        command: &str,
        observer: &dyn Observer,
    ) -> Result<String, CommandError> {
        let _bracket = ExecutionGuard::start(observer, command)?;

        self.commands.push(command.to_string());
        emit_output(observer, &format!("{}\n", DRY_RUN_OUTPUT));

        if command.contains("id -u") && !self.simulated_missing_user {
            self.simulated_missing_user = true;
            return Err(CommandError::Failed {
                command: command.to_string(),
                message: "exit status 1 (simulated: user not found)".to_string(),
                output: String::new(),
            });
        }

        Ok(DRY_RUN_OUTPUT.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::testing::RecordingObserver;
    use crate::observer::NoopObserver;

    #[tokio::test]
    async fn test_records_commands() {
        let mut ex = DryRunExecutor::new();
        let ctx = Context::new();

        let output = ex
            .execute(&ctx, "apt-get install -y nginx", &NoopObserver)
            .await
            .unwrap();
        ex.execute(&ctx, "systemctl start nginx", &NoopObserver)
            .await
            .unwrap();

        assert_eq!(output, DRY_RUN_OUTPUT);
        assert_eq!(
            ex.commands(),
            ["apt-get install -y nginx", "systemctl start nginx"]
        );
    }

    #[tokio::test]
    async fn test_first_user_check_fails_once() {
        let mut ex = DryRunExecutor::new();
        let ctx = Context::new();

        assert!(ex.execute(&ctx, "id -u john", &NoopObserver).await.is_err());
        assert!(ex.execute(&ctx, "id -u john", &NoopObserver).await.is_ok());
        assert!(ex.execute(&ctx, "id -u jane", &NoopObserver).await.is_ok());
        assert_eq!(ex.commands().len(), 3);
    }

    #[tokio::test]
    async fn test_brackets_even_on_simulated_failure() {
        let observer = RecordingObserver::new();
        let mut ex = DryRunExecutor::new();
        let _ = ex.execute(&Context::new(), "id -u john", &observer).await;

        assert_eq!(
            observer.events(),
            vec![
                "start id -u john",
                "output [DRY RUN] Command would be executed\n",
                "end"
            ]
        );
    }
}
