//! Reindex: copy every document of one index version into another, with an
//! optional engine-side transform, blocking until the engine reports done.

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use super::connection::{Connection, segment};
use crate::error::{MigrateError, Result};

/// Failing document ids kept on a [`MigrateError::Reindex`].
const FAILURE_SAMPLE_SIZE: usize = 10;

/// Painless body of [`Transform::FullName`]. Absent, null, blank or
/// non-scalar parts are skipped; with no parts left the target field is
/// removed.
const FULL_NAME_SCRIPT: &str = "\
List parts = new ArrayList();\n\
for (def field : params.fields) {\n\
  def value = ctx._source[field];\n\
  if (value != null && !(value instanceof Map) && !(value instanceof List)) {\n\
    String text = value.toString().trim();\n\
    if (!text.isEmpty()) { parts.add(text); }\n\
  }\n\
}\n\
if (parts.isEmpty()) { ctx._source.remove(params.target); }\n\
else { ctx._source[params.target] = String.join(params.separator, parts); }";

/// Per-document rewrite applied by the engine during the copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    /// Concatenate name parts into one field.
    FullName {
        #[serde(default = "default_name_fields")]
        fields: Vec<String>,
        #[serde(default = "default_separator")]
        separator: String,
        #[serde(default = "default_target")]
        target: String,
    },
    /// Arbitrary engine script.
    Script {
        source: String,
        #[serde(default = "default_lang")]
        lang: String,
        #[serde(default)]
        params: Map<String, Value>,
    },
}

fn default_name_fields() -> Vec<String> {
    vec!["firstName".to_string(), "lastName".to_string()]
}

fn default_separator() -> String {
    " ".to_string()
}

fn default_target() -> String {
    "fullName".to_string()
}

fn default_lang() -> String {
    "painless".to_string()
}

impl Transform {
    /// `firstName` + `lastName` into `fullName`.
    pub fn full_name() -> Self {
        Self::FullName {
            fields: default_name_fields(),
            separator: default_separator(),
            target: default_target(),
        }
    }

    pub fn script(source: impl Into<String>) -> Self {
        Self::Script {
            source: source.into(),
            lang: default_lang(),
            params: Map::new(),
        }
    }

    /// Whether the transform may drop or merge documents, which makes a
    /// count mismatch after reindexing expected rather than an error.
    pub const fn may_change_count(&self) -> bool {
        matches!(self, Self::Script { .. })
    }

    /// The `script` object of the reindex request.
    pub fn script_body(&self) -> Value {
        match self {
            Self::FullName {
                fields,
                separator,
                target,
            } => json!({
                "lang": "painless",
                "source": FULL_NAME_SCRIPT,
                "params": {
                    "fields": fields,
                    "separator": separator,
                    "target": target,
                },
            }),
            Self::Script {
                source,
                lang,
                params,
            } => {
                let mut script = json!({ "lang": lang, "source": source });
                if !params.is_empty() {
                    script["params"] = Value::Object(params.clone());
                }
                script
            }
        }
    }

    /// Apply the transform locally, the same way the engine script does.
    /// Only built-in transforms can run outside the engine.
    pub fn apply(&self, document: &mut Map<String, Value>) -> Result<()> {
        match self {
            Self::FullName {
                fields,
                separator,
                target,
            } => {
                let parts: Vec<String> = fields
                    .iter()
                    .filter_map(|field| document.get(field))
                    .filter_map(value_text)
                    .collect();
                if parts.is_empty() {
                    document.remove(target);
                } else {
                    document.insert(target.clone(), Value::String(parts.join(separator)));
                }
                Ok(())
            }
            Self::Script { .. } => Err(MigrateError::ValidationFailed(
                "script transforms only run inside the engine".to_string(),
            )),
        }
    }
}

/// Text of one name part. Only scalars count; arrays and objects are
/// skipped like null.
fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// One reindex request. Not persisted; the engine owns its state until the
/// call returns.
#[derive(Debug, Clone, PartialEq)]
pub struct ReindexJob {
    pub source: String,
    pub dest: String,
    pub transform: Option<Transform>,
}

impl ReindexJob {
    pub fn new(source: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            transform: None,
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Option<Transform>) -> Self {
        self.transform = transform;
        self
    }

    pub fn body(&self) -> Value {
        let mut body = json!({
            "source": { "index": self.source },
            "dest": { "index": self.dest },
        });
        if let Some(transform) = &self.transform {
            body["script"] = transform.script_body();
        }
        body
    }
}

#[derive(Debug, Default, Deserialize)]
struct ReindexResponse {
    #[serde(default)]
    took: u64,
    #[serde(default)]
    timed_out: bool,
    #[serde(default)]
    total: u64,
    #[serde(default)]
    created: u64,
    #[serde(default)]
    updated: u64,
    #[serde(default)]
    noops: u64,
    #[serde(default)]
    batches: u64,
    #[serde(default)]
    version_conflicts: u64,
    #[serde(default)]
    failures: Vec<Value>,
}

/// Parse a reindex summary body. `None` for anything else, such as an
/// `{"error": ..}` rejection of the request itself.
fn completed_summary(raw: &str) -> Option<ReindexResponse> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let is_summary = ["failures", "version_conflicts", "timed_out"]
        .iter()
        .any(|key| object.contains_key(*key));
    if !is_summary {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// Summary of a completed reindex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    pub source: String,
    pub dest: String,
    pub total: u64,
    pub created: u64,
    pub updated: u64,
    pub noops: u64,
    pub batches: u64,
    pub took_ms: u64,
}

impl ReindexReport {
    /// Documents now present in the destination because of this run.
    pub const fn documents_copied(&self) -> u64 {
        self.created + self.updated + self.noops
    }
}

/// A source document next to what the transform would turn it into.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformPreview {
    pub id: String,
    pub before: Value,
    pub after: Value,
}

pub struct Reindexer<'a> {
    conn: &'a Connection,
}

impl<'a> Reindexer<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Submit `job` and block until the engine finishes it.
    ///
    /// Both indices must already exist. Writes are keyed by document id, so
    /// re-running after an interruption overwrites rather than duplicates.
    pub fn reindex(&self, job: &ReindexJob) -> Result<ReindexReport> {
        info!(
            source = %job.source,
            dest = %job.dest,
            transform = job.transform.is_some(),
            "reindexing"
        );
        let request = self
            .conn
            .long_request(Method::POST, "/_reindex?wait_for_completion=true&refresh=true")
            .json(&job.body());
        let response = self.conn.send(request)?;
        let status = response.status();
        let raw = response.text()?;

        // A finished job with failures answers with the highest failure
        // status (400, 408, 409) but still carries the full summary.
        let parsed = match completed_summary(&raw) {
            Some(parsed) => parsed,
            None if status.is_success() => serde_json::from_str(&raw)?,
            None => return Err(MigrateError::from_engine_response(status.as_u16(), raw)),
        };
        if !status.is_success()
            || parsed.timed_out
            || parsed.version_conflicts > 0
            || !parsed.failures.is_empty()
        {
            let sample_ids = parsed
                .failures
                .iter()
                .filter_map(|failure| failure.get("id").and_then(Value::as_str))
                .take(FAILURE_SAMPLE_SIZE)
                .map(ToString::to_string)
                .collect();
            warn!(
                source = %job.source,
                dest = %job.dest,
                %status,
                failures = parsed.failures.len(),
                version_conflicts = parsed.version_conflicts,
                timed_out = parsed.timed_out,
                "reindex reported failures"
            );
            return Err(MigrateError::Reindex {
                source_index: job.source.clone(),
                dest_index: job.dest.clone(),
                failures: parsed.failures.len(),
                version_conflicts: parsed.version_conflicts,
                sample_ids,
                timed_out: parsed.timed_out,
                body: raw,
            });
        }

        let report = ReindexReport {
            source: job.source.clone(),
            dest: job.dest.clone(),
            total: parsed.total,
            created: parsed.created,
            updated: parsed.updated,
            noops: parsed.noops,
            batches: parsed.batches,
            took_ms: parsed.took,
        };
        info!(
            source = %job.source,
            dest = %job.dest,
            copied = report.documents_copied(),
            took_ms = report.took_ms,
            "reindex complete"
        );
        Ok(report)
    }

    /// Fetch one source document and show it before and after `transform`,
    /// without writing anything.
    pub fn preview(&self, source: &str, doc_id: &str, transform: &Transform) -> Result<TransformPreview> {
        let path = format!("/{}/_doc/{}", segment(source), segment(doc_id));
        let response = self.conn.send(self.conn.request(Method::GET, &path))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(MigrateError::ValidationFailed(format!(
                "document '{doc_id}' not found in '{source}'"
            )));
        }
        let hit: Value = self.conn.read_json(response)?;
        let before = hit.get("_source").cloned().unwrap_or_else(|| json!({}));
        let mut document = before.as_object().cloned().unwrap_or_default();
        transform.apply(&mut document)?;
        Ok(TransformPreview {
            id: doc_id.to_string(),
            before,
            after: Value::Object(document),
        })
    }
}
