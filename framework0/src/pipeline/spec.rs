//! Step definitions as they appear in recipes.

use crate::context::StepArgs;
use crate::errors::DependencyValidationError;
use crate::steps::registry_key;
use serde::{Deserialize, Serialize};

/// One step of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// The unique step name.
    pub name: String,
    /// Registry module of the implementation.
    pub module: String,
    /// Registry function of the implementation.
    pub function: String,
    /// Arguments handed to the step.
    #[serde(default)]
    pub args: StepArgs,
    /// Names of steps that must succeed first.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Position used to order reports. Defaults to the list position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idx: Option<usize>,
}

impl StepDefinition {
    /// Creates a new step definition.
    #[must_use]
    pub fn new(name: impl Into<String>, module: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            function: function.into(),
            args: StepArgs::new(),
            depends_on: Vec::new(),
            idx: None,
        }
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.depends_on.push(dep.into());
        self
    }

    /// Adds an argument.
    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.args.insert(key.into(), value);
        self
    }

    /// Sets the report index.
    #[must_use]
    pub fn with_idx(mut self, idx: usize) -> Self {
        self.idx = Some(idx);
        self
    }

    /// The key used to resolve the implementation.
    #[must_use]
    pub fn registry_key(&self) -> String {
        registry_key(&self.module, &self.function)
    }

    /// Checks that the identifying fields are present.
    ///
    /// # Errors
    ///
    /// Returns an error naming the step if its name, module or function is blank.
    pub fn validate(&self) -> Result<(), DependencyValidationError> {
        let blank = [("name", &self.name), ("module", &self.module), ("function", &self.function)]
            .into_iter()
            .find(|(_, value)| value.trim().is_empty());
        if let Some((field, _)) = blank {
            return Err(DependencyValidationError::new(format!(
                "Step '{}' has an empty '{field}'",
                self.name
            ))
            .with_steps(vec![self.name.clone()]));
        }
        Ok(())
    }
}

/// Fills missing `idx` values with list positions.
pub(crate) fn assign_indices(steps: &mut [StepDefinition]) {
    for (position, step) in steps.iter_mut().enumerate() {
        step.idx.get_or_insert(position);
    }
}
