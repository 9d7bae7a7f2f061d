// Drives one action against one target

use std::sync::Arc;

use tracing::info;

use crate::actions::Action;
use crate::context::Context;
use crate::executor::Executor;
use crate::observer::{NoopObserver, Observer};
use crate::os::{self, Distribution, OsInfo};
use crate::output::errors::{AnvilError, DetectionError};

/// Detects the target OS, then hands the action its family.
///
/// Printing and exit codes are left to the caller.
pub struct Runner<E = Box<dyn Executor>> {
    executor: E,
    observer: Arc<dyn Observer>,
    ctx: Context,
    distribution: Option<Distribution>,
}

impl<E: Executor> Runner<E> {
    pub fn new(executor: E) -> Self {
        Runner {
            executor,
            observer: Arc::new(NoopObserver),
            ctx: Context::new(),
            distribution: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    /// Skip detection and assume `distribution`
    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = Some(distribution);
        self
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Detect the target OS, unless a distribution was set.
    ///
    /// Through a parallel executor every host answers and the last one to
    /// finish decides, so a host list mixing OS families needs an explicit
    /// distribution (`--os`) or one run per family.
    pub async fn detect(&mut self) -> Result<OsInfo, AnvilError> {
        if let Some(distribution) = self.distribution {
            return Ok(OsInfo {
                id: distribution.to_string(),
                detected: Some(distribution),
                ..Default::default()
            });
        }
        Ok(os::detect(&self.ctx, &mut self.executor).await?)
    }

    pub async fn run(&mut self, action: &Action) -> Result<(), AnvilError> {
        let info = self.detect().await?;
        let Some(distribution) = info.detected else {
            return Err(DetectionError::Unsupported {
                id: info.id,
                id_like: info.id_like,
            }
            .into());
        };

        info!(os = %distribution, action = %action, "running action");
        action
            .handle(
                &self.ctx,
                &mut self.executor,
                distribution.family(),
                self.observer.as_ref(),
            )
            .await?;
        Ok(())
    }
}
