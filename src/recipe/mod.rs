// Recipes: named, ordered action lists

use std::collections::HashMap;

use tracing::debug;

mod builtin;

pub use builtin::{basic_webserver, default_registry, lamp_server, nginx_webserver};

use crate::actions::Action;
use crate::context::Context;
use crate::executor::Executor;
use crate::observer::Observer;
use crate::os::OsFamily;
use crate::output::errors::ActionError;

/// A named sequence of actions.
///
/// Execution is fail-fast: the first failing action stops the recipe and
/// its error is returned unchanged. Nothing is rolled back, so the actions
/// before it stay applied on the target.
#[derive(Debug, Clone)]
pub struct Recipe {
    name: String,
    description: String,
    actions: Vec<Action>,
}

impl Recipe {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        actions: Vec<Action>,
    ) -> Self {
        Recipe {
            name: name.into(),
            description: description.into(),
            actions,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub async fn execute(
        &self,
        ctx: &Context,
        executor: &mut dyn Executor,
        os: OsFamily,
        observer: &dyn Observer,
    ) -> Result<(), ActionError> {
        for (index, action) in self.actions.iter().enumerate() {
            debug!(recipe = %self.name, step = index + 1, action = %action, "running recipe step");
            action.handle(ctx, &mut *executor, os, observer).await?;
        }
        Ok(())
    }
}

/// Recipes by name. Registering a name twice keeps the later recipe.
#[derive(Debug, Clone, Default)]
pub struct RecipeRegistry {
    recipes: HashMap<String, Recipe>,
}

impl RecipeRegistry {
    pub fn new() -> Self {
        RecipeRegistry::default()
    }

    pub fn register(&mut self, recipe: Recipe) {
        self.recipes.insert(recipe.name.clone(), recipe);
    }

    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name)
    }

    /// All recipes, sorted by name
    pub fn list(&self) -> Vec<&Recipe> {
        let mut recipes: Vec<_> = self.recipes.values().collect();
        recipes.sort_by(|a, b| a.name.cmp(&b.name));
        recipes
    }

    pub fn names(&self) -> Vec<&str> {
        self.list().into_iter().map(Recipe::name).collect()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
