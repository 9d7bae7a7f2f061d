// Target and executor configuration

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::context::Context;
use crate::executor::{
    DryRunExecutor, Executor, LocalExecutor, ParallelExecutor, SshExecutor, SshOptions,
};
use crate::output::errors::ConfigError;

fn default_port() -> u16 {
    22
}

fn default_user() -> String {
    std::env::var("USER").unwrap_or_else(|_| "root".to_string())
}

/// One remote target: `user@host[:port]`. IPv6 addresses are written
/// bare (`user@fe80::1`) or bracketed when a port follows (`user@[::1]:2222`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct HostSpec {
    pub host: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl HostSpec {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        HostSpec {
            host: host.into(),
            user: user.into(),
            port: default_port(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// `user@host`, as passed to ssh
    pub fn ssh_target(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Parse a comma-separated list, ignoring empty entries
    pub fn parse_list(list: &str) -> Result<Vec<HostSpec>, ConfigError> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<HostSpec>)
            .collect()
    }
}

impl FromStr for HostSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ConfigError::InvalidHost {
            spec: s.to_string(),
            reason: reason.to_string(),
        };

        let (user, rest) = match s.split_once('@') {
            Some(("", _)) => return Err(invalid("empty user")),
            Some((user, rest)) => (user.to_string(), rest),
            None => (default_user(), s),
        };

        let parse_port =
            |port: &str| port.parse::<u16>().map_err(|_| invalid("port must be a number"));

        // `[addr]:port` for IPv6; otherwise a single colon separates the port
        // and more than one is a bare IPv6 address
        let (host, port) = if let Some(bracketed) = rest.strip_prefix('[') {
            let (host, tail) = bracketed
                .split_once(']')
                .ok_or_else(|| invalid("unclosed '['"))?;
            match tail {
                "" => (host, default_port()),
                _ => match tail.strip_prefix(':') {
                    Some(port) => (host, parse_port(port)?),
                    None => return Err(invalid("unexpected text after ']'")),
                },
            }
        } else {
            match rest.split_once(':') {
                Some((host, port)) if !port.contains(':') => (host, parse_port(port)?),
                _ => (rest, default_port()),
            }
        };

        if host.is_empty() {
            return Err(invalid("empty host"));
        }

        Ok(HostSpec {
            host: host.to_string(),
            user,
            port,
        })
    }
}

impl fmt::Display for HostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.port != default_port(), self.host.contains(':')) {
            (true, true) => write!(f, "{}@[{}]:{}", self.user, self.host, self.port),
            (true, false) => write!(f, "{}@{}:{}", self.user, self.host, self.port),
            (false, _) => write!(f, "{}@{}", self.user, self.host),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InventoryEntry {
    Short(String),
    Full(HostSpec),
}

#[derive(Deserialize)]
struct InventoryFile {
    hosts: Vec<InventoryEntry>,
}

/// Load hosts from a YAML inventory:
///
/// ```yaml
/// hosts:
///   - deploy@web-1
///   - host: web-2
///     user: admin
///     port: 2222
/// ```
pub fn load_inventory(path: &Path) -> Result<Vec<HostSpec>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::InventoryRead {
        path: path.to_path_buf(),
        source,
    })?;
    let file: InventoryFile =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::InventoryParse {
            path: path.to_path_buf(),
            source,
        })?;

    file.hosts
        .into_iter()
        .map(|entry| match entry {
            InventoryEntry::Short(spec) => spec.parse(),
            InventoryEntry::Full(host) => Ok(host),
        })
        .collect()
}

/// Which executor variant to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorMode {
    #[default]
    Local,
    Remote,
    Parallel,
    DryRun,
}

impl ExecutorMode {
    /// Dry run wins; otherwise no hosts means local, one host means remote
    /// unless parallel is forced, and several hosts mean parallel.
    pub fn infer(dry_run: bool, force_parallel: bool, host_count: usize) -> Self {
        match (dry_run, force_parallel, host_count) {
            (true, _, _) => ExecutorMode::DryRun,
            (false, true, _) => ExecutorMode::Parallel,
            (false, false, 0) => ExecutorMode::Local,
            (false, false, 1) => ExecutorMode::Remote,
            (false, false, _) => ExecutorMode::Parallel,
        }
    }
}

/// Executor configuration
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    pub mode: ExecutorMode,
    pub hosts: Vec<HostSpec>,
    pub ssh: SshOptions,
    /// Deadline for the whole operation
    pub timeout: Option<Duration>,
}

impl ExecutorConfig {
    pub fn new(mode: ExecutorMode) -> Self {
        ExecutorConfig {
            mode,
            ..Default::default()
        }
    }

    pub fn with_hosts(mut self, hosts: Vec<HostSpec>) -> Self {
        self.hosts = hosts;
        self
    }

    pub fn with_ssh(mut self, ssh: SshOptions) -> Self {
        self.ssh = ssh;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build a context carrying the configured deadline
    pub fn context(&self) -> Context {
        match self.timeout {
            Some(timeout) => Context::new().with_timeout(timeout),
            None => Context::new(),
        }
    }

    pub fn build(&self) -> Result<Box<dyn Executor>, ConfigError> {
        match self.mode {
            ExecutorMode::Local => Ok(Box::new(LocalExecutor::new())),
            ExecutorMode::DryRun => Ok(Box::new(DryRunExecutor::new())),
            ExecutorMode::Remote => match self.hosts.as_slice() {
                [host] => Ok(Box::new(
                    SshExecutor::new(host.clone()).with_options(self.ssh.clone()),
                )),
                hosts => Err(ConfigError::HostCount {
                    mode: "remote",
                    expected: "exactly one host",
                    actual: hosts.len(),
                }),
            },
            ExecutorMode::Parallel => Ok(Box::new(ParallelExecutor::with_ssh_options(
                self.hosts.clone(),
                self.ssh.clone(),
            ))),
        }
    }
}
