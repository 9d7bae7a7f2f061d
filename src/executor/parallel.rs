// Fan one command out to many hosts and gather the results

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::{Executor, SshExecutor, SshOptions};
use crate::config::HostSpec;
use crate::context::Context;
use crate::observer::{emit_output, ExecutionGuard, NoopObserver, Observer};
use crate::output::errors::{CommandError, CompositeHostError, HostFailure};

/// Builds the single-host executor used for one unit of a dispatch
pub type Connector = Arc<dyn Fn(&HostSpec) -> Box<dyn Executor> + Send + Sync>;

/// Outcome of one host within a dispatch
#[derive(Debug)]
pub struct ParallelResult {
    pub host: String,
    pub output: String,
    pub error: Option<CommandError>,
}

/// Runs each command on every host at once, one task per host.
///
/// Hosts are isolated from each other: a failing host never cancels or
/// blocks the rest. Per-host executors get no observer; the caller's
/// observer sees one bracket for the whole dispatch and one
/// `[host] output` chunk per host, in completion order.
pub struct ParallelExecutor {
    hosts: Vec<HostSpec>,
    connect: Connector,
}

impl ParallelExecutor {
    pub fn new(hosts: Vec<HostSpec>) -> Self {
        Self::with_ssh_options(hosts, SshOptions::default())
    }

    pub fn with_ssh_options(hosts: Vec<HostSpec>, options: SshOptions) -> Self {
        ParallelExecutor {
            hosts,
            connect: Arc::new(move |host: &HostSpec| -> Box<dyn Executor> {
                Box::new(SshExecutor::new(host.clone()).with_options(options.clone()))
            }),
        }
    }

    /// Use a custom per-host executor instead of ssh
    pub fn with_connector<F>(hosts: Vec<HostSpec>, connect: F) -> Self
    where
        F: Fn(&HostSpec) -> Box<dyn Executor> + Send + Sync + 'static,
    {
        ParallelExecutor {
            hosts,
            connect: Arc::new(connect),
        }
    }

    pub fn hosts(&self) -> &[HostSpec] {
        &self.hosts
    }
}

impl fmt::Debug for ParallelExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelExecutor")
            .field("hosts", &self.hosts)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Executor for ParallelExecutor {
    async fn execute(
        &mut self,
        ctx: &Context,
        command: &str,
        observer: &dyn Observer,
    ) -> Result<String, CommandError> {
        let _bracket = ExecutionGuard::start(observer, command)?;

        if self.hosts.is_empty() {
            return Ok(String::new());
        }
        debug!(hosts = self.hosts.len(), command, "dispatching to hosts");

        let (tx, mut rx) = mpsc::channel(self.hosts.len());
        // Dropping the set aborts every unit still running
        let mut units = JoinSet::new();

        for (index, host) in self.hosts.iter().enumerate() {
            let mut executor = (self.connect)(host);
            let ctx = ctx.child();
            let command = command.to_string();
            let name = host.host.clone();
            let tx = tx.clone();

            units.spawn(async move {
                let result = match executor.execute(&ctx, &command, &NoopObserver).await {
                    Ok(output) => ParallelResult {
                        host: name,
                        output,
                        error: None,
                    },
                    Err(error) => ParallelResult {
                        host: name,
                        output: error.output().to_string(),
                        error: Some(error),
                    },
                };
                let _ = tx.send((index, result)).await;
            });
        }
        drop(tx);

        let mut reported = vec![false; self.hosts.len()];
        let mut lines = Vec::with_capacity(self.hosts.len());
        let mut failures = Vec::new();

        // Closes once every unit has finished and dropped its sender
        while let Some((index, result)) = rx.recv().await {
            reported[index] = true;

            let line = format!("[{}] {}", result.host, result.output.trim_end_matches('\n'));
            emit_output(observer, &line);
            lines.push(line);

            if let Some(error) = result.error {
                warn!(host = %result.host, error = %error, "host failed");
                failures.push(HostFailure {
                    host: result.host,
                    error,
                });
            }
        }

        while let Some(joined) = units.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "execution unit did not complete");
            }
        }

        for (host, _) in self.hosts.iter().zip(&reported).filter(|(_, seen)| !**seen) {
            failures.push(HostFailure {
                host: host.host.clone(),
                error: CommandError::Failed {
                    command: command.to_string(),
                    message: "execution unit terminated without a result".to_string(),
                    output: String::new(),
                },
            });
        }

        let output = lines.join("\n");
        if failures.is_empty() {
            Ok(output)
        } else {
            Err(CompositeHostError { failures, output }.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::executor::{FakeExecutor, FakeResponse, LocalExecutor};
    use crate::observer::testing::RecordingObserver;

    fn hosts(names: &[&str]) -> Vec<HostSpec> {
        names.iter().map(|n| HostSpec::new(*n, "deploy")).collect()
    }

    /// Replies after a per-host delay
    struct DelayedExecutor {
        delay: Duration,
        output: String,
    }

    #[async_trait]
    impl Executor for DelayedExecutor {
        async fn execute(
            &mut self,
            ctx: &Context,
            command: &str,
            _observer: &dyn Observer,
        ) -> Result<String, CommandError> {
            ctx.run(tokio::time::sleep(self.delay))
                .await
                .map_err(|_| CommandError::Cancelled {
                    command: command.to_string(),
                    output: String::new(),
                })?;
            Ok(self.output.clone())
        }
    }

    fn delayed(host: &HostSpec) -> Box<dyn Executor> {
        let delay = match host.host.as_str() {
            "slow" => Duration::from_millis(150),
            _ => Duration::from_millis(0),
        };
        Box::new(DelayedExecutor {
            delay,
            output: format!("hello from {}", host.host),
        })
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_successes() {
        let mut ex = ParallelExecutor::with_connector(hosts(&["A", "B"]), |host: &HostSpec| {
            let response = if host.host == "A" {
                FakeResponse::ok("ok-A")
            } else {
                FakeResponse::failure("", "err-B")
            };
            Box::new(FakeExecutor::new().respond("uptime", response)) as Box<dyn Executor>
        });

        let err = ex
            .execute(&Context::new(), "uptime", &NoopObserver)
            .await
            .unwrap_err();

        let CommandError::Hosts(composite) = err else {
            panic!("expected a composite host error");
        };
        assert_eq!(composite.hosts().collect::<Vec<_>>(), vec!["B"]);
        assert!(composite.to_string().contains("[B]"));
        assert!(composite.to_string().contains("err-B"));
        assert!(composite.output.contains("[A] ok-A"));
        assert!(composite.output.contains("[B] "));
    }

    #[tokio::test]
    async fn test_all_hosts_succeed() {
        let mut ex = ParallelExecutor::with_connector(hosts(&["A", "B", "C"]), |host: &HostSpec| {
            Box::new(FakeExecutor::new().respond("hostname", FakeResponse::ok(host.host.clone())))
                as Box<dyn Executor>
        });

        let output = ex
            .execute(&Context::new(), "hostname", &NoopObserver)
            .await
            .unwrap();

        let mut lines: Vec<_> = output.lines().collect();
        lines.sort();
        assert_eq!(lines, vec!["[A] A", "[B] B", "[C] C"]);
    }

    #[tokio::test]
    async fn test_empty_host_list() {
        let observer = RecordingObserver::new();
        let mut ex = ParallelExecutor::new(Vec::new());

        let output = ex
            .execute(&Context::new(), "uptime", &observer)
            .await
            .unwrap();

        assert_eq!(output, "");
        assert_eq!(observer.events(), vec!["start uptime", "end"]);
    }

    #[tokio::test]
    async fn test_results_in_arrival_order() {
        let observer = RecordingObserver::new();
        let mut ex = ParallelExecutor::with_connector(hosts(&["slow", "fast"]), delayed);

        let output = ex.execute(&Context::new(), "greet", &observer).await.unwrap();

        assert_eq!(output, "[fast] hello from fast\n[slow] hello from slow");
        assert_eq!(
            observer.events(),
            vec![
                "start greet",
                "output [fast] hello from fast",
                "output [slow] hello from slow",
                "end"
            ]
        );
    }

    #[tokio::test]
    async fn test_hosts_run_concurrently() {
        let mut ex =
            ParallelExecutor::with_connector(hosts(&["slow", "slow", "slow", "slow"]), delayed);

        let started = Instant::now();
        ex.execute(&Context::new(), "greet", &NoopObserver)
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_cancellation_reaches_every_host() {
        let mut ex = ParallelExecutor::with_connector(hosts(&["A", "B"]), |_: &HostSpec| {
            Box::new(LocalExecutor::new()) as Box<dyn Executor>
        });
        let ctx = Context::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let err = ex.execute(&ctx, "sleep 10", &NoopObserver).await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(5));
        let CommandError::Hosts(composite) = err else {
            panic!("expected a composite host error");
        };
        assert_eq!(composite.failures.len(), 2);
        assert!(composite.failures.iter().all(|f| f.error.is_cancelled()));
    }
}
