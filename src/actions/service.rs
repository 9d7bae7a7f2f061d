// Service management via systemd

use std::fmt;
use std::str::FromStr;

use crate::context::Context;
use crate::executor::Executor;
use crate::observer::Observer;
use crate::os::OsFamily;
use crate::output::errors::ActionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceOperation {
    Start,
    Stop,
    Enable,
    Restart,
}

impl ServiceOperation {
    fn command(&self, os: OsFamily, service: &str) -> String {
        match self {
            ServiceOperation::Start => os.start_service(service),
            ServiceOperation::Stop => os.stop_service(service),
            ServiceOperation::Enable => os.enable_service(service),
            ServiceOperation::Restart => os.restart_service(service),
        }
    }
}

impl fmt::Display for ServiceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceOperation::Start => "start",
            ServiceOperation::Stop => "stop",
            ServiceOperation::Enable => "enable",
            ServiceOperation::Restart => "restart",
        };
        f.write_str(name)
    }
}

impl FromStr for ServiceOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "start" => Ok(ServiceOperation::Start),
            "stop" => Ok(ServiceOperation::Stop),
            "enable" => Ok(ServiceOperation::Enable),
            "restart" => Ok(ServiceOperation::Restart),
            other => Err(format!(
                "unknown service operation '{}' (expected start, stop, enable or restart)",
                other
            )),
        }
    }
}

/// One operation on one service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAction {
    pub service: String,
    pub operation: ServiceOperation,
}

impl ServiceAction {
    pub fn new(service: impl Into<String>, operation: ServiceOperation) -> Self {
        ServiceAction {
            service: service.into(),
            operation,
        }
    }

    pub(super) async fn run(
        &self,
        ctx: &Context,
        executor: &mut dyn Executor,
        os: OsFamily,
        observer: &dyn Observer,
    ) -> Result<(), ActionError> {
        executor
            .execute(ctx, &self.operation.command(os, &self.service), observer)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Action;
    use crate::executor::FakeExecutor;
    use crate::observer::testing::RecordingObserver;

    #[tokio::test]
    async fn test_each_operation_issues_one_command() {
        let cases = [
            (Action::start_service("nginx"), "systemctl start nginx"),
            (Action::stop_service("nginx"), "systemctl stop nginx"),
            (Action::enable_service("nginx"), "systemctl enable nginx"),
            (Action::restart_service("nginx"), "systemctl restart nginx"),
        ];

        for (action, expected) in cases {
            let mut ex = FakeExecutor::new();
            action
                .handle(&Context::new(), &mut ex, OsFamily::Debian, &RecordingObserver::new())
                .await
                .unwrap();
            assert_eq!(ex.history(), [expected]);
        }
    }

    #[tokio::test]
    async fn test_service_brackets() {
        let observer = RecordingObserver::new();
        let mut ex = FakeExecutor::new();

        Action::start_service("httpd")
            .handle(&Context::new(), &mut ex, OsFamily::Fedora, &observer)
            .await
            .unwrap();

        assert_eq!(
            observer.events(),
            vec![
                "action_start",
                "start systemctl start httpd",
                "output ",
                "end",
                "action_end"
            ]
        );
    }

    #[test]
    fn test_parse_operation() {
        assert_eq!(
            "Restart".parse::<ServiceOperation>().unwrap(),
            ServiceOperation::Restart
        );
        assert!("reload".parse::<ServiceOperation>().is_err());
    }
}
