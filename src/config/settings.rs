use crate::analysis::inventory_kpi::KpiThresholds;
use crate::analysis::vessel::DEFAULT_ORIGIN;
use crate::analysis::{Columns, ContainerCategories};
use crate::core::export::OutputFormat;
use crate::utils::error::{DepotError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contents of the optional settings file. Every section may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub columns: Columns,
    pub categories: ContainerCategories,
    pub kpi: KpiThresholds,
    pub vessel: VesselSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VesselSettings {
    pub origin: String,
}

impl Default for VesselSettings {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub path: String,
    pub formats: Vec<String>,
    pub bundle: bool,
    pub preview_rows: usize,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: "./reports".to_string(),
            formats: vec!["csv".to_string()],
            bundle: false,
            preview_rows: 15,
        }
    }
}

impl Settings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DepotError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DepotError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value. Unset variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DepotError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("output.path", &self.output.path)?;
        validation::validate_positive_number("output.preview_rows", self.output.preview_rows, 1)?;
        self.output_formats()?;

        validation::validate_non_empty_string("vessel.origin", &self.vessel.origin)?;
        validation::validate_ascending(
            "kpi",
            &[
                self.kpi.excellent_max,
                self.kpi.good_below,
                self.kpi.average_below,
            ],
        )?;

        for (name, types) in &self.categories.0 {
            if types.is_empty() {
                return Err(DepotError::InvalidConfigValueError {
                    field: format!("categories.{}", name),
                    value: "[]".to_string(),
                    reason: "A category must list at least one container type".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn output_formats(&self) -> Result<Vec<OutputFormat>> {
        self.output
            .formats
            .iter()
            .map(|name| OutputFormat::parse(name))
            .collect()
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
