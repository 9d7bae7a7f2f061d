// OS detection from /etc/os-release

use tracing::debug;

use super::{Distribution, OsFamily};
use crate::context::Context;
use crate::executor::Executor;
use crate::observer::NoopObserver;
use crate::output::errors::DetectionError;

/// Introspection command run on the target
pub const OS_RELEASE_COMMAND: &str = "cat /etc/os-release";

/// What the target reported about itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsInfo {
    pub id: String,
    pub id_like: Vec<String>,
    pub version: String,
    pub pretty_name: String,
    /// `None` when neither `ID` nor `ID_LIKE` names a supported distribution
    pub detected: Option<Distribution>,
}

impl OsInfo {
    /// Parse `KEY=value` lines. Blank lines, comments and lines without `=`
    /// are skipped; surrounding quotes are stripped from values.
    ///
    /// A leading `[host] ` tag, as produced by the parallel executor, is
    /// dropped. When several hosts report, later lines overwrite earlier
    /// ones, so the last host to answer decides.
    pub fn parse(content: &str) -> Self {
        let mut info = OsInfo::default();

        for line in content.lines() {
            let line = strip_host_tag(line.trim()).trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');

            match key.trim() {
                "ID" => info.id = value.to_string(),
                "ID_LIKE" => info.id_like = value.split_whitespace().map(String::from).collect(),
                "VERSION_ID" => info.version = value.to_string(),
                "PRETTY_NAME" => info.pretty_name = value.to_string(),
                _ => {}
            }
        }

        info.detected = classify(&info.id, &info.id_like);
        info
    }

    pub fn family(&self) -> Option<OsFamily> {
        self.detected.map(|d| d.family())
    }
}

fn strip_host_tag(line: &str) -> &str {
    line.strip_prefix('[')
        .and_then(|rest| rest.split_once("] "))
        .map_or(line, |(_, rest)| rest)
}

fn classify(id: &str, id_like: &[String]) -> Option<Distribution> {
    match id {
        "ubuntu" => return Some(Distribution::Ubuntu),
        "debian" => return Some(Distribution::Debian),
        "fedora" => return Some(Distribution::Fedora),
        "rhel" | "redhat" => return Some(Distribution::RedHat),
        _ => {}
    }

    id_like.iter().find_map(|like| match like.as_str() {
        "debian" => Some(Distribution::Debian),
        "rhel" | "fedora" => Some(Distribution::RedHat),
        _ => None,
    })
}

/// Read and classify the target's OS through `executor`.
///
/// Fails if the introspection command fails or if the OS cannot be
/// classified; a family is never guessed.
pub async fn detect(ctx: &Context, executor: &mut dyn Executor) -> Result<OsInfo, DetectionError> {
    let output = executor
        .execute(ctx, OS_RELEASE_COMMAND, &NoopObserver)
        .await
        .map_err(DetectionError::Introspection)?;

    let info = OsInfo::parse(&output);
    debug!(id = %info.id, detected = ?info.detected, "detected target OS");

    if info.detected.is_none() {
        return Err(DetectionError::Unsupported {
            id: info.id,
            id_like: info.id_like,
        });
    }
    Ok(info)
}
