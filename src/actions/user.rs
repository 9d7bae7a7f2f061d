// User account management

use tracing::debug;

use crate::context::Context;
use crate::executor::Executor;
use crate::observer::Observer;
use crate::os::OsFamily;
use crate::output::errors::{ActionError, CommandError};

/// Ensure a user exists, optionally adding it to a supplementary group.
///
/// The account is only created when the existence check reports the user
/// as missing. The group membership command always runs when a group is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUser {
    pub username: String,
    pub group: Option<String>,
}

impl CreateUser {
    pub fn new(username: impl Into<String>) -> Self {
        CreateUser {
            username: username.into(),
            group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub(super) async fn run(
        &self,
        ctx: &Context,
        executor: &mut dyn Executor,
        os: OsFamily,
        observer: &dyn Observer,
    ) -> Result<(), ActionError> {
        match executor
            .execute(ctx, &os.check_user(&self.username), observer)
            .await
        {
            Ok(_) => debug!(user = %self.username, "user already exists"),
            Err(e) if reports_missing(&e) => {
                debug!(user = %self.username, "creating user");
                executor
                    .execute(ctx, &os.create_user(&self.username), observer)
                    .await?;
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(ref group) = self.group {
            executor
                .execute(ctx, &os.group_user(&self.username, group), observer)
                .await?;
        }

        Ok(())
    }
}

/// Whether a failed existence check means "no such user", as opposed to the
/// check itself never getting an answer.
fn reports_missing(err: &CommandError) -> bool {
    match err {
        CommandError::Exit { .. } | CommandError::Failed { .. } | CommandError::Hosts(_) => true,
        CommandError::Spawn { .. }
        | CommandError::Cancelled { .. }
        | CommandError::DeadlineExceeded { .. }
        | CommandError::ObserverRejected { .. } => false,
    }
}
