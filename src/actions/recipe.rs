// Run a named recipe from a registry

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::context::Context;
use crate::executor::Executor;
use crate::observer::Observer;
use crate::os::OsFamily;
use crate::output::errors::ActionError;
use crate::recipe::RecipeRegistry;

/// Resolve a recipe by name at run time and execute it
#[derive(Clone)]
pub struct ExecuteRecipe {
    pub name: String,
    registry: Arc<RecipeRegistry>,
}

impl ExecuteRecipe {
    pub fn new(name: impl Into<String>, registry: Arc<RecipeRegistry>) -> Self {
        ExecuteRecipe {
            name: name.into(),
            registry,
        }
    }

    pub(super) async fn run(
        &self,
        ctx: &Context,
        executor: &mut dyn Executor,
        os: OsFamily,
        observer: &dyn Observer,
    ) -> Result<(), ActionError> {
        let recipe = self
            .registry
            .get(&self.name)
            .ok_or_else(|| ActionError::RecipeNotFound(self.name.clone()))?;

        info!(recipe = %recipe.name(), actions = recipe.actions().len(), "executing recipe");
        recipe.execute(ctx, executor, os, observer).await
    }
}

impl fmt::Debug for ExecuteRecipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteRecipe")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Action;
    use crate::executor::FakeExecutor;
    use crate::observer::testing::RecordingObserver;
    use crate::recipe::Recipe;

    fn registry() -> Arc<RecipeRegistry> {
        let mut registry = RecipeRegistry::new();
        registry.register(Recipe::new(
            "tools",
            "Command line tools",
            vec![Action::install_package("curl"), Action::install_package("jq")],
        ));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_unknown_recipe_runs_nothing() {
        let observer = RecordingObserver::new();
        let mut ex = FakeExecutor::new();

        let err = Action::execute_recipe("missing", registry())
            .handle(&Context::new(), &mut ex, OsFamily::Debian, &observer)
            .await
            .unwrap_err();

        assert!(matches!(err, ActionError::RecipeNotFound(ref name) if name == "missing"));
        assert!(ex.history().is_empty());
        assert_eq!(observer.events(), vec!["action_start", "action_end"]);
    }

    #[tokio::test]
    async fn test_runs_recipe_actions_in_order() {
        let observer = RecordingObserver::new();
        let mut ex = FakeExecutor::new();

        Action::execute_recipe("tools", registry())
            .handle(&Context::new(), &mut ex, OsFamily::Fedora, &observer)
            .await
            .unwrap();

        assert_eq!(ex.history(), ["dnf install -y curl", "dnf install -y jq"]);
        // One bracket for the recipe action plus one per nested action
        assert_eq!(observer.count("action_start"), 3);
        assert_eq!(observer.count("action_end"), 3);
    }

    #[tokio::test]
    async fn test_nested_recipe() {
        let mut inner = RecipeRegistry::new();
        inner.register(Recipe::new(
            "tools",
            "Command line tools",
            vec![Action::install_package("curl")],
        ));
        let inner = Arc::new(inner);

        let mut outer = RecipeRegistry::new();
        outer.register(Recipe::new(
            "base",
            "Base system",
            vec![
                Action::update_packages(),
                Action::execute_recipe("tools", inner),
            ],
        ));

        let mut ex = FakeExecutor::new();
        Action::execute_recipe("base", Arc::new(outer))
            .handle(&Context::new(), &mut ex, OsFamily::Debian, &RecordingObserver::new())
            .await
            .unwrap();

        assert_eq!(
            ex.history(),
            ["apt-get update && apt-get upgrade -y", "apt-get install -y curl"]
        );
    }
}
