// Local command execution through `sh -c`

use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::debug;

use super::Executor;
use crate::context::{Context, Interrupt};
use crate::observer::{emit_output, ExecutionGuard, Observer};
use crate::output::errors::CommandError;

/// Runs commands on the calling machine
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor {
    shell: Option<String>,
}

impl LocalExecutor {
    pub fn new() -> Self {
        LocalExecutor::default()
    }

    /// Use a different POSIX shell than `sh`
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = Some(shell.into());
        self
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    async fn execute(
        &mut self,
        ctx: &Context,
        command: &str,
        observer: &dyn Observer,
    ) -> Result<String, CommandError> {
        let _bracket = ExecutionGuard::start(observer, command)?;
        debug!(command, "executing locally");

        let mut process = Command::new(self.shell.as_deref().unwrap_or("sh"));
        process.arg("-c").arg(command);
        run_process(ctx, process, command, observer).await
    }
}

/// Spawn `process`, stream its stdout and stderr line by line to the observer
/// and collect both into one output string.
///
/// The child is killed if the context is cancelled, the deadline passes, or
/// the returned future is dropped. `command` is the caller-facing command
/// used in errors, which may differ from the program actually spawned.
pub(crate) async fn run_process(
    ctx: &Context,
    mut process: Command,
    command: &str,
    observer: &dyn Observer,
) -> Result<String, CommandError> {
    process
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = process.spawn().map_err(|source| CommandError::Spawn {
        command: command.to_string(),
        source,
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let mut output = String::new();

    let outcome = ctx
        .run(async {
            let mut stdout = Pipe::new(stdout);
            let mut stderr = Pipe::new(stderr);

            while stdout.is_open() || stderr.is_open() {
                let chunk = tokio::select! {
                    chunk = stdout.next_chunk(), if stdout.is_open() => chunk,
                    chunk = stderr.next_chunk(), if stderr.is_open() => chunk,
                };
                if let Some(chunk) = chunk {
                    emit_output(observer, &chunk);
                    output.push_str(&chunk);
                }
            }

            child.wait().await
        })
        .await;

    if outcome.is_err() {
        let _ = child.start_kill();
    }

    match outcome {
        Ok(Ok(status)) if status.success() => Ok(output),
        Ok(Ok(status)) => Err(CommandError::Exit {
            command: command.to_string(),
            code: status.code().unwrap_or(-1),
            signal: exit_signal(&status),
            output,
        }),
        Ok(Err(source)) => Err(CommandError::Spawn {
            command: command.to_string(),
            source,
        }),
        Err(Interrupt::Cancelled) => Err(CommandError::Cancelled {
            command: command.to_string(),
            output,
        }),
        Err(Interrupt::DeadlineExceeded(timeout)) => Err(CommandError::DeadlineExceeded {
            command: command.to_string(),
            timeout,
            output,
        }),
    }
}

/// One captured output stream of the child
struct Pipe<R> {
    reader: Option<BufReader<R>>,
    /// Bytes read but not yet handed out; kept across cancelled reads
    pending: Vec<u8>,
}

impl<R: AsyncRead + Unpin> Pipe<R> {
    fn new(reader: Option<R>) -> Self {
        Pipe {
            reader: reader.map(BufReader::new),
            pending: Vec::new(),
        }
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Next chunk up to and including a newline, or the unterminated tail
    /// at EOF. Bytes pass through unchanged except that invalid UTF-8 is
    /// replaced, so the pipe is drained to EOF whatever the child prints.
    async fn next_chunk(&mut self) -> Option<String> {
        let reader = self.reader.as_mut()?;
        match reader.read_until(b'\n', &mut self.pending).await {
            Ok(n) if n > 0 => {}
            Ok(_) => self.reader = None,
            Err(e) => {
                debug!(error = %e, "stopped reading command output");
                self.reader = None;
            }
        }

        if self.pending.is_empty() {
            return None;
        }
        let chunk = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&chunk).into_owned())
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::observer::testing::RecordingObserver;
    use crate::observer::NoopObserver;

    #[tokio::test]
    async fn test_local_exec() {
        let mut ex = LocalExecutor::new();
        let output = ex
            .execute(&Context::new(), "echo 'hello world'", &NoopObserver)
            .await
            .unwrap();

        assert_eq!(output, "hello world\n");
    }

    #[tokio::test]
    async fn test_local_exec_failure_keeps_output() {
        let mut ex = LocalExecutor::new();
        let err = ex
            .execute(&Context::new(), "echo oops >&2; exit 3", &NoopObserver)
            .await
            .unwrap_err();

        match err {
            CommandError::Exit { code, output, .. } => {
                assert_eq!(code, 3);
                assert_eq!(output, "oops\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_local_exec_streams_to_observer() {
        let observer = RecordingObserver::new();
        let mut ex = LocalExecutor::new();
        ex.execute(&Context::new(), "echo one; echo two", &observer)
            .await
            .unwrap();

        assert_eq!(
            observer.events(),
            vec![
                "start echo one; echo two",
                "output one\n",
                "output two\n",
                "end"
            ]
        );
    }

    #[tokio::test]
    async fn test_bracket_closes_on_failure() {
        let observer = RecordingObserver::new();
        let mut ex = LocalExecutor::new();
        let _ = ex.execute(&Context::new(), "exit 1", &observer).await;

        assert_eq!(observer.count("start"), 1);
        assert_eq!(observer.count("end"), 1);
    }

    #[tokio::test]
    async fn test_observer_veto_prevents_run() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let observer = RecordingObserver {
            fail_execution_start: true,
            ..Default::default()
        };

        let mut ex = LocalExecutor::new();
        let err = ex
            .execute(
                &Context::new(),
                &format!("touch {}", marker.display()),
                &observer,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::ObserverRejected { .. }));
        assert!(!marker.exists());
        assert_eq!(observer.count("end"), 0);
    }

    #[tokio::test]
    async fn test_cancellation_kills_process() {
        let ctx = Context::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let observer = RecordingObserver::new();
        let mut ex = LocalExecutor::new();
        let err = ex.execute(&ctx, "sleep 10", &observer).await.unwrap_err();

        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(observer.count("end"), 1);
    }

    #[tokio::test]
    async fn test_deadline() {
        let ctx = Context::new().with_timeout(Duration::from_millis(50));
        let mut ex = LocalExecutor::new();
        let err = ex
            .execute(&ctx, "echo early; sleep 10", &NoopObserver)
            .await
            .unwrap_err();

        match err {
            CommandError::DeadlineExceeded { output, .. } => assert_eq!(output, "early\n"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_utf8_keeps_reading() {
        let mut ex = LocalExecutor::new();
        let output = ex
            .execute(
                &Context::new(),
                "printf 'caf\\351\\n'; sleep 0.1; printf '\\377\\n'; echo after-bad-byte",
                &NoopObserver,
            )
            .await
            .unwrap();

        assert_eq!(output, "caf\u{FFFD}\n\u{FFFD}\nafter-bad-byte\n");
    }

    #[tokio::test]
    async fn test_output_passed_through_unchanged() {
        let mut ex = LocalExecutor::new();
        let ctx = Context::new();

        let output = ex.execute(&ctx, "printf abc", &NoopObserver).await.unwrap();
        assert_eq!(output, "abc");

        let output = ex
            .execute(&ctx, "printf 'one\\r\\ntwo'", &NoopObserver)
            .await
            .unwrap();
        assert_eq!(output, "one\r\ntwo");
    }

    #[tokio::test]
    async fn test_killed_by_signal() {
        let mut ex = LocalExecutor::new();
        let err = ex
            .execute(&Context::new(), "echo dying; kill -9 $$", &NoopObserver)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("killed by signal 9"));
        match err {
            CommandError::Exit { signal, output, .. } => {
                assert_eq!(signal, Some(9));
                assert_eq!(output, "dying\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
