// Package management

use crate::context::Context;
use crate::executor::Executor;
use crate::observer::Observer;
use crate::os::OsFamily;
use crate::output::errors::ActionError;

/// Install a package, optionally refreshing package lists first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPackage {
    pub package: String,
    pub update_first: bool,
}

impl InstallPackage {
    pub fn new(package: impl Into<String>) -> Self {
        InstallPackage {
            package: package.into(),
            update_first: false,
        }
    }

    pub fn with_update(mut self) -> Self {
        self.update_first = true;
        self
    }

    pub(super) async fn run(
        &self,
        ctx: &Context,
        executor: &mut dyn Executor,
        os: OsFamily,
        observer: &dyn Observer,
    ) -> Result<(), ActionError> {
        if self.update_first {
            executor.execute(ctx, &os.update_packages(), observer).await?;
        }
        executor
            .execute(ctx, &os.install_package(&self.package), observer)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovePackage {
    pub package: String,
}

impl RemovePackage {
    pub fn new(package: impl Into<String>) -> Self {
        RemovePackage {
            package: package.into(),
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
            .execute(ctx, &os.remove_package(&self.package), observer)
            .await?;
        Ok(())
    }
}
