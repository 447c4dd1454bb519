//! Recipe documents.
//!
//! A recipe is a YAML (or JSON) file naming a list of steps and, optionally,
//! the scheduler configuration to run them with:
//!
//! ```yaml
//! name: etl
//! config:
//!   parallel: true
//! steps:
//!   - name: load
//!     module: context
//!     function: set
//!     args: { "data.rows": 10 }
//!   - name: report
//!     module: util
//!     function: log
//!     depends_on: [load]
//! ```

use crate::errors::Framework0Error;
use crate::pipeline::{assign_indices, SchedulerConfig, StepDefinition};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A parsed recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Recipe name.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The steps, in declaration order.
    pub steps: Vec<StepDefinition>,
    /// Scheduler settings carried by the recipe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SchedulerConfig>,
}

impl Recipe {
    /// Parses a recipe from YAML. Steps without `idx` get their list position.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, Framework0Error> {
        let mut recipe: Self = serde_yaml::from_str(yaml)?;
        if recipe.name.trim().is_empty() {
            return Err(Framework0Error::InvalidRecipe("recipe name must not be empty".to_string()));
        }
        if recipe.steps.is_empty() {
            return Err(Framework0Error::InvalidRecipe(format!(
                "recipe '{}' has no steps",
                recipe.name
            )));
        }
        assign_indices(&mut recipe.steps);
        Ok(recipe)
    }

    /// Loads a recipe file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Framework0Error> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Returns the recipe's configuration, or the default one.
    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        self.config.clone().unwrap_or_default()
    }
}
