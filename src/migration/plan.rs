use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};
use crate::es::{IndexName, Mapping, Transform};

/// One migration of an alias from one index version to the next.
///
/// ```toml
/// source = "candidates_v2"
/// destination = "candidates_v3"
/// alias = "candidates"
/// mapping = "candidates_v3.json"
/// delete_source = false
///
/// [transform]
/// kind = "full_name"
/// ```
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub source: IndexName,
    pub destination: IndexName,
    pub alias: IndexName,
    pub mapping: Mapping,
    pub mapping_path: Option<PathBuf>,
    pub transform: Option<Transform>,
    pub delete_source: bool,
    pub verify_count: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanFile {
    source: IndexName,
    destination: IndexName,
    alias: IndexName,
    #[serde(default)]
    mapping: Option<PathBuf>,
    #[serde(default)]
    transform: Option<Transform>,
    #[serde(default)]
    delete_source: bool,
    #[serde(default = "default_verify")]
    verify_count: bool,
}

const fn default_verify() -> bool {
    true
}

impl MigrationPlan {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| MigrateError::Config(format!("read plan {}: {err}", path.display())))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&raw, base_dir)
            .map_err(|err| match err {
                MigrateError::Config(msg) => {
                    MigrateError::Config(format!("plan {}: {msg}", path.display()))
                }
                other => other,
            })
    }

    /// Parse a plan; a relative `mapping` path is resolved against `base_dir`.
    pub fn from_toml_str(raw: &str, base_dir: &Path) -> Result<Self> {
        let file: PlanFile =
            toml::from_str(raw).map_err(|err| MigrateError::Config(format!("parse: {err}")))?;

        let mapping_path = file.mapping.map(|path| {
            if path.is_relative() {
                base_dir.join(path)
            } else {
                path
            }
        });
        let mapping = match &mapping_path {
            Some(path) => Mapping::from_file(path)?,
            None => Mapping::empty(),
        };

        let plan = Self {
            source: file.source,
            destination: file.destination,
            alias: file.alias,
            mapping,
            mapping_path,
            transform: file.transform,
            delete_source: file.delete_source,
            verify_count: file.verify_count,
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source == self.destination {
            return Err(MigrateError::ValidationFailed(format!(
                "source and destination are both '{}'",
                self.source
            )));
        }
        if self.alias == self.source || self.alias == self.destination {
            return Err(MigrateError::ValidationFailed(format!(
                "alias '{}' must differ from the index names",
                self.alias
            )));
        }
        Ok(())
    }
}

/// Serializable view of a plan for reports and dry runs.
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub source: String,
    pub destination: String,
    pub alias: String,
    pub mapping: Option<String>,
    pub mapped_fields: Vec<String>,
    pub transform: Option<Transform>,
    pub delete_source: bool,
    pub verify_count: bool,
}

impl From<&MigrationPlan> for PlanSummary {
    fn from(plan: &MigrationPlan) -> Self {
        Self {
            source: plan.source.to_string(),
            destination: plan.destination.to_string(),
            alias: plan.alias.to_string(),
            mapping: plan
                .mapping_path
                .as_ref()
                .map(|path| path.display().to_string()),
            mapped_fields: plan.mapping.field_names(),
            transform: plan.transform.clone(),
            delete_source: plan.delete_source,
            verify_count: plan.verify_count,
        }
    }
}
