// Error types for anvil

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure of a single command (or of a multi-host dispatch)
#[derive(Debug, Error)]
pub enum CommandError {
    /// The subordinate process could not be started
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully. `code` is -1 when it was
    /// killed by a signal.
    #[error("`{command}` {}", exit_status(.code, .signal))]
    Exit {
        command: String,
        code: i32,
        signal: Option<i32>,
        output: String,
    },

    /// Failure reported without a process, by the fake and dry-run executors
    #[error("`{command}` failed: {message}")]
    Failed {
        command: String,
        message: String,
        output: String,
    },

    #[error("`{command}` was cancelled")]
    Cancelled { command: String, output: String },

    #[error("`{command}` did not finish within {timeout:?}")]
    DeadlineExceeded {
        command: String,
        timeout: Duration,
        output: String,
    },

    /// The observer refused to let the command start
    #[error("observer rejected `{command}`: {source}")]
    ObserverRejected {
        command: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Hosts(#[from] CompositeHostError),
}

fn exit_status(code: &i32, signal: &Option<i32>) -> String {
    match signal {
        Some(signal) => format!("was killed by signal {}", signal),
        None => format!("exited with status {}", code),
    }
}

impl CommandError {
    /// Output collected before the failure
    pub fn output(&self) -> &str {
        match self {
            CommandError::Exit { output, .. }
            | CommandError::Failed { output, .. }
            | CommandError::Cancelled { output, .. }
            | CommandError::DeadlineExceeded { output, .. } => output,
            CommandError::Hosts(err) => &err.output,
            CommandError::Spawn { .. } | CommandError::ObserverRejected { .. } => "",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CommandError::Cancelled { .. })
    }
}

/// One failing host inside a parallel dispatch
#[derive(Debug)]
pub struct HostFailure {
    pub host: String,
    pub error: CommandError,
}

/// Aggregate of every host that failed during a parallel dispatch.
///
/// `output` holds the combined output of *all* hosts, successful ones included.
#[derive(Debug)]
pub struct CompositeHostError {
    pub failures: Vec<HostFailure>,
    pub output: String,
}

impl CompositeHostError {
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.host.as_str())
    }
}

impl fmt::Display for CompositeHostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "execution failed on {} host(s): ", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "[{}] {}", failure.host, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompositeHostError {}

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("failed to read OS release information from target: {0}")]
    Introspection(#[source] CommandError),

    #[error("unsupported OS '{id}' (ID_LIKE: {})", display_like(.id_like))]
    Unsupported { id: String, id_like: Vec<String> },
}

fn display_like(id_like: &[String]) -> String {
    if id_like.is_empty() {
        "none".to_string()
    } else {
        id_like.join(" ")
    }
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("recipe '{0}' not found")]
    RecipeNotFound(String),

    #[error("observer rejected action: {0}")]
    ObserverRejected(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid host '{spec}': {reason}")]
    InvalidHost { spec: String, reason: String },

    #[error("{mode} execution needs {expected}, got {actual} host(s)")]
    HostCount {
        mode: &'static str,
        expected: &'static str,
        actual: usize,
    },

    #[error("failed to read inventory {}: {source}", .path.display())]
    InventoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse inventory {}: {source}", .path.display())]
    InventoryParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unknown OS '{0}' (expected debian, ubuntu, fedora or redhat)")]
    UnknownDistribution(String),
}

/// Top-level error returned by the runner
#[derive(Debug, Error)]
pub enum AnvilError {
    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Suggest common fixes for errors
pub fn suggest_fix(error: &AnvilError) -> Option<String> {
    match error {
        AnvilError::Detection(DetectionError::Unsupported { .. }) => Some(
            "Only Debian and Fedora/RHEL families are supported; pass --os to override detection"
                .to_string(),
        ),
        AnvilError::Detection(DetectionError::Introspection(_)) => {
            Some("Check that /etc/os-release is readable on the target".to_string())
        }
        AnvilError::Action(ActionError::RecipeNotFound(_)) => {
            Some("Run `anvil recipe --list` to see available recipes".to_string())
        }
        AnvilError::Action(ActionError::Command(err)) => command_hint(err),
        _ => None,
    }
}

fn command_hint(err: &CommandError) -> Option<String> {
    let output = err.output().to_lowercase();
    match err {
        CommandError::Spawn { .. } => {
            Some("Check that 'sh' and 'ssh' are available on this machine".to_string())
        }
        CommandError::Hosts(_) => Some(
            "Hosts that succeeded keep their changes; re-run once the failing hosts are fixed"
                .to_string(),
        ),
        _ if output.contains("permission denied") => {
            Some("Try running with elevated privileges (sudo)".to_string())
        }
        _ if output.contains("connection refused") => {
            Some("Ensure SSH service is running on the target host".to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_error_lists_every_host() {
        let err = CompositeHostError {
            failures: vec![
                HostFailure {
                    host: "web-1".to_string(),
                    error: CommandError::Failed {
                        command: "uptime".to_string(),
                        message: "unreachable".to_string(),
                        output: String::new(),
                    },
                },
                HostFailure {
                    host: "web-2".to_string(),
                    error: CommandError::Exit {
                        command: "uptime".to_string(),
                        code: 255,
                        signal: None,
                        output: String::new(),
                    },
                },
            ],
            output: "[web-1] \n[web-2] ".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("2 host(s)"));
        assert!(msg.contains("[web-1] `uptime` failed: unreachable"));
        assert!(msg.contains("[web-2] `uptime` exited with status 255"));
        assert_eq!(err.hosts().collect::<Vec<_>>(), vec!["web-1", "web-2"]);
    }

    #[test]
    fn test_output_is_preserved_on_error() {
        let err = CommandError::Exit {
            command: "make".to_string(),
            code: 2,
            signal: None,
            output: "partial build log".to_string(),
        };
        assert_eq!(err.output(), "partial build log");
    }

    #[test]
    fn test_suggestions() {
        let err = AnvilError::Action(ActionError::RecipeNotFound("lamp".to_string()));
        assert!(suggest_fix(&err).unwrap().contains("--list"));

        let err = AnvilError::Detection(DetectionError::Unsupported {
            id: "arch".to_string(),
            id_like: vec![],
        });
        assert!(err.to_string().contains("arch"));
        assert!(suggest_fix(&err).unwrap().contains("--os"));

        let err = AnvilError::Action(ActionError::Command(CommandError::Exit {
            command: "adduser john".to_string(),
            code: 1,
            signal: None,
            output: "adduser: Permission denied.".to_string(),
        }));
        assert!(suggest_fix(&err).unwrap().contains("sudo"));
    }
}
