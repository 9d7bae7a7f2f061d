// Remote execution on a single host through the system `ssh` client

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::local::run_process;
use super::Executor;
use crate::config::HostSpec;
use crate::context::Context;
use crate::observer::{ExecutionGuard, Observer};
use crate::output::errors::CommandError;

/// Options rendered into `ssh` arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshOptions {
    pub connect_timeout: Duration,
    pub private_key: Option<String>,
    /// Never prompt for passwords or host keys
    pub batch_mode: bool,
}

impl Default for SshOptions {
    fn default() -> Self {
        SshOptions {
            connect_timeout: Duration::from_secs(30),
            private_key: None,
            batch_mode: true,
        }
    }
}

impl SshOptions {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_private_key(mut self, path: impl Into<String>) -> Self {
        self.private_key = Some(path.into());
        self
    }

    pub fn with_batch_mode(mut self, batch_mode: bool) -> Self {
        self.batch_mode = batch_mode;
        self
    }
}

/// Runs commands on one (host, user) pair. Authentication is left to the
/// ssh client (agent, keys, config).
#[derive(Debug, Clone)]
pub struct SshExecutor {
    host: HostSpec,
    options: SshOptions,
}

impl SshExecutor {
    pub fn new(host: HostSpec) -> Self {
        SshExecutor {
            host,
            options: SshOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SshOptions) -> Self {
        self.options = options;
        self
    }

    pub fn host(&self) -> &HostSpec {
        &self.host
    }

    /// Arguments passed to `ssh` for `command`
    pub fn ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            format!("ConnectTimeout={}", self.options.connect_timeout.as_secs().max(1)),
        ];

        if self.options.batch_mode {
            args.push("-o".to_string());
            args.push("BatchMode=yes".to_string());
        }

        if let Some(ref key) = self.options.private_key {
            args.push("-i".to_string());
            args.push(key.clone());
        }

        if self.host.port != 22 {
            args.push("-p".to_string());
            args.push(self.host.port.to_string());
        }

        args.push(self.host.ssh_target());
        args.push("--".to_string());
        args.push(command.to_string());
        args
    }
}

#[async_trait]
impl Executor for SshExecutor {
    async fn execute(
        &mut self,
        ctx: &Context,
        command: &str,
        observer: &dyn Observer,
    ) -> Result<String, CommandError> {
        let _bracket = ExecutionGuard::start(observer, command)?;
        debug!(host = %self.host.host, command, "executing over ssh");

        let mut process = Command::new("ssh");
        process.args(self.ssh_args(command));
        run_process(ctx, process, command, observer).await
    }
}
