// Provisioning actions

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

mod package;
mod recipe;
mod service;
mod user;

pub use package::{InstallPackage, RemovePackage};
pub use recipe::ExecuteRecipe;
pub use service::{ServiceAction, ServiceOperation};
pub use user::CreateUser;

use crate::context::Context;
use crate::executor::Executor;
use crate::observer::{ActionGuard, Observer};
use crate::os::OsFamily;
use crate::output::errors::ActionError;
use crate::recipe::RecipeRegistry;

/// A unit of provisioning intent
#[derive(Debug, Clone)]
pub enum Action {
    CreateUser(CreateUser),
    InstallPackage(InstallPackage),
    RemovePackage(RemovePackage),
    UpdatePackages,
    Service(ServiceAction),
    ExecuteRecipe(ExecuteRecipe),
}

impl Action {
    pub fn create_user(username: impl Into<String>) -> Self {
        Action::CreateUser(CreateUser::new(username))
    }

    pub fn install_package(package: impl Into<String>) -> Self {
        Action::InstallPackage(InstallPackage::new(package))
    }

    pub fn remove_package(package: impl Into<String>) -> Self {
        Action::RemovePackage(RemovePackage::new(package))
    }

    pub fn update_packages() -> Self {
        Action::UpdatePackages
    }

    pub fn start_service(service: impl Into<String>) -> Self {
        Action::Service(ServiceAction::new(service, ServiceOperation::Start))
    }

    pub fn stop_service(service: impl Into<String>) -> Self {
        Action::Service(ServiceAction::new(service, ServiceOperation::Stop))
    }

    pub fn enable_service(service: impl Into<String>) -> Self {
        Action::Service(ServiceAction::new(service, ServiceOperation::Enable))
    }

    pub fn restart_service(service: impl Into<String>) -> Self {
        Action::Service(ServiceAction::new(service, ServiceOperation::Restart))
    }

    pub fn execute_recipe(name: impl Into<String>, registry: Arc<RecipeRegistry>) -> Self {
        Action::ExecuteRecipe(ExecuteRecipe::new(name, registry))
    }

    /// Run the action against one target.
    ///
    /// The whole run is bracketed by `on_action_start`/`on_action_end`;
    /// the end hook fires even when a command fails.
    pub fn handle<'a>(
        &'a self,
        ctx: &'a Context,
        executor: &'a mut dyn Executor,
        os: OsFamily,
        observer: &'a dyn Observer,
    ) -> BoxFuture<'a, Result<(), ActionError>> {
        Box::pin(async move {
            let _bracket = ActionGuard::start(observer)?;

            match self {
                Action::CreateUser(action) => action.run(ctx, executor, os, observer).await,
                Action::InstallPackage(action) => action.run(ctx, executor, os, observer).await,
                Action::RemovePackage(action) => action.run(ctx, executor, os, observer).await,
                Action::UpdatePackages => {
                    executor
                        .execute(ctx, &os.update_packages(), observer)
                        .await?;
                    Ok(())
                }
                Action::Service(action) => action.run(ctx, executor, os, observer).await,
                Action::ExecuteRecipe(action) => action.run(ctx, executor, os, observer).await,
            }
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::CreateUser(a) => match a.group {
                Some(ref group) => write!(f, "create user {} in group {}", a.username, group),
                None => write!(f, "create user {}", a.username),
            },
            Action::InstallPackage(a) if a.update_first => {
                write!(f, "update package lists and install {}", a.package)
            }
            Action::InstallPackage(a) => write!(f, "install package {}", a.package),
            Action::RemovePackage(a) => write!(f, "remove package {}", a.package),
            Action::UpdatePackages => write!(f, "update package lists"),
            Action::Service(a) => write!(f, "{} service {}", a.operation, a.service),
            Action::ExecuteRecipe(a) => write!(f, "run recipe {}", a.name),
        }
    }
}

impl From<CreateUser> for Action {
    fn from(action: CreateUser) -> Self {
        Action::CreateUser(action)
    }
}

impl From<InstallPackage> for Action {
    fn from(action: InstallPackage) -> Self {
        Action::InstallPackage(action)
    }
}

impl From<RemovePackage> for Action {
    fn from(action: RemovePackage) -> Self {
        Action::RemovePackage(action)
    }
}

impl From<ServiceAction> for Action {
    fn from(action: ServiceAction) -> Self {
        Action::Service(action)
    }
}

impl From<ExecuteRecipe> for Action {
    fn from(action: ExecuteRecipe) -> Self {
        Action::ExecuteRecipe(action)
    }
}
