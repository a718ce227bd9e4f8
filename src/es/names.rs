//! Index and alias name validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

const MAX_NAME_BYTES: usize = 255;
const FORBIDDEN_CHARS: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ' ', ',', '#', ':'];

/// A validated index or alias name.
///
/// Elasticsearch shares one namespace for both, with the same rules:
/// lowercase, no path or wildcard characters, no leading `-`, `_` or `+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IndexName(String);

impl IndexName {
    pub fn parse(raw: &str) -> Result<Self> {
        validate(raw)?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(raw: &str) -> Result<()> {
    let invalid = |why: &str| Err(MigrateError::ValidationFailed(format!("invalid index name '{raw}': {why}")));

    if raw.is_empty() {
        return invalid("empty");
    }
    if raw == "." || raw == ".." {
        return invalid("reserved");
    }
    if raw.len() > MAX_NAME_BYTES {
        return invalid("longer than 255 bytes");
    }
    if raw.starts_with(['-', '_', '+']) {
        return invalid("must not start with '-', '_' or '+'");
    }
    if raw.chars().any(char::is_uppercase) {
        return invalid("must be lowercase");
    }
    if let Some(bad) = raw.chars().find(|c| FORBIDDEN_CHARS.contains(c) || c.is_control()) {
        return invalid(&format!("contains forbidden character {bad:?}"));
    }
    Ok(())
}

impl fmt::Display for IndexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IndexName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IndexName {
    type Error = MigrateError;

    fn try_from(value: String) -> Result<Self> {
        validate(&value)?;
        Ok(Self(value))
    }
}

impl From<IndexName> for String {
    fn from(name: IndexName) -> Self {
        name.0
    }
}

impl std::str::FromStr for IndexName {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
