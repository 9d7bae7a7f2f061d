// Deterministic executor for tests

use std::collections::HashMap;

use async_trait::async_trait;

use super::Executor;
use crate::context::Context;
use crate::observer::{emit_output, ExecutionGuard, Observer};
use crate::output::errors::CommandError;

/// Canned response for one exact command string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeResponse {
    pub output: String,
    pub error: Option<String>,
}

impl FakeResponse {
    pub fn ok(output: impl Into<String>) -> Self {
        FakeResponse {
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(output: impl Into<String>, error: impl Into<String>) -> Self {
        FakeResponse {
            output: output.into(),
            error: Some(error.into()),
        }
    }
}

/// Answers commands from a lookup table and records every command it is
/// given. Unknown commands succeed with empty output.
#[derive(Debug, Clone, Default)]
pub struct FakeExecutor {
    history: Vec<String>,
    responses: HashMap<String, FakeResponse>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        FakeExecutor::default()
    }

    pub fn respond(mut self, command: impl Into<String>, response: FakeResponse) -> Self {
        self.responses.insert(command.into(), response);
        self
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn executed(&self, command: &str) -> bool {
        self.history.iter().any(|c| c == command)
    }

    /// Position of `command` in the history
    pub fn position(&self, command: &str) -> Option<usize> {
        self.history.iter().position(|c| c == command)
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    async fn execute(
        &mut self,
        _ctx: &Context,
        command: &str,
        observer: &dyn Observer,
    ) -> Result<String, CommandError> {
        let _bracket = ExecutionGuard::start(observer, command)?;

        self.history.push(command.to_string());

        let Some(response) = self.responses.get(command) else {
            emit_output(observer, "");
            return Ok(String::new());
        };

        emit_output(observer, &response.output);
        match response.error {
            Some(ref message) => Err(CommandError::Failed {
                command: command.to_string(),
                message: message.clone(),
                output: response.output.clone(),
            }),
            None => Ok(response.output.clone()),
        }
    }
}
