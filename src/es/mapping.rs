use std::path::Path;

use serde_json::{Map, Value, json};

use crate::error::{MigrateError, Result};

/// Index creation body: settings plus the immutable field mapping.
///
/// Accepts either a full create body (`{"settings": .., "mappings": ..}`) or a
/// bare mapping (`{"properties": ..}`), which is wrapped under `mappings`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping(Value);

impl Mapping {
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(object) = value else {
            return Err(MigrateError::ValidationFailed(
                "mapping must be a JSON object".to_string(),
            ));
        };
        if object.contains_key("mappings") || object.contains_key("settings") {
            return Ok(Self(Value::Object(object)));
        }
        if object.contains_key("properties") || object.contains_key("dynamic") {
            return Ok(Self(json!({ "mappings": object })));
        }
        if object.is_empty() {
            return Ok(Self::empty());
        }
        Err(MigrateError::ValidationFailed(
            "mapping needs 'mappings', 'settings' or 'properties' at the top level".to_string(),
        ))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            MigrateError::Config(format!("read mapping {}: {err}", path.display()))
        })?;
        let value: Value = serde_json::from_str(&raw).map_err(|err| {
            MigrateError::Config(format!("parse mapping {}: {err}", path.display()))
        })?;
        Self::from_value(value)
    }

    /// No explicit mapping; the engine infers one dynamically.
    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub const fn body(&self) -> &Value {
        &self.0
    }

    /// Names of the top-level mapped fields, for display.
    pub fn field_names(&self) -> Vec<String> {
        self.0
            .pointer("/mappings/properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default()
    }
}
