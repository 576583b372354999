use crate::utils::error::{DepotError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named groups of container types, e.g. `Dry` and `Special`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerCategories(pub BTreeMap<String, Vec<String>>);

impl Default for ContainerCategories {
    fn default() -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(
            "Dry".to_string(),
            vec!["Heavy Duty".to_string(), "Hi-Cube".to_string()],
        );
        categories.insert(
            "Special".to_string(),
            vec![
                "Flat Rack".to_string(),
                "Open Top".to_string(),
                "Reefer".to_string(),
                "Standard".to_string(),
            ],
        );
        Self(categories)
    }
}

impl ContainerCategories {
    /// Case-insensitive lookup of a category's type list.
    pub fn resolve(&self, name: &str) -> Result<Vec<String>> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name.trim()))
            .map(|(_, types)| types.clone())
            .ok_or_else(|| DepotError::InvalidConfigValueError {
                field: "category".to_string(),
                value: name.to_string(),
                reason: format!(
                    "Unknown category. Known categories: {}",
                    self.names().join(", ")
                ),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }
}
