//! Index lifecycle: existence checks, idempotent creation and deletion.
//!
//! Every mutating call is preceded by an existence check so a migration can
//! be re-run after it was interrupted at any point.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::connection::{Connection, segment};
use super::mapping::Mapping;
use crate::error::{MigrateError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsureOutcome {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

pub struct IndexManager<'a> {
    conn: &'a Connection,
}

impl<'a> IndexManager<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn index_exists(&self, name: &str) -> Result<bool> {
        let exists = self.conn.exists(&format!("/{}", segment(name)))?;
        debug!(index = name, exists, "index existence check");
        Ok(exists)
    }

    /// Create `name` with `mapping` unless it already exists. An existing
    /// index is left untouched, whatever its mapping.
    pub fn ensure_index(&self, name: &str, mapping: &Mapping) -> Result<EnsureOutcome> {
        if self.index_exists(name)? {
            info!(index = name, "index already exists");
            return Ok(EnsureOutcome::AlreadyExists);
        }

        let request = self
            .conn
            .request(Method::PUT, &format!("/{}", segment(name)))
            .json(mapping.body());
        let response = self.conn.send(request)?;
        let status = response.status();
        let body = response.text()?;
        if status.is_success() {
            info!(index = name, "index created");
            return Ok(EnsureOutcome::Created);
        }

        // Lost a race with another creator between the check and the PUT.
        let err = MigrateError::from_engine_response(status.as_u16(), body);
        if let MigrateError::Engine { error_type, .. } = &err {
            if error_type == "resource_already_exists_exception" {
                info!(index = name, "index already exists");
                return Ok(EnsureOutcome::AlreadyExists);
            }
        }
        Err(err)
    }

    /// Delete `name` if present. Engine-side failures come back as an
    /// [`MigrateError::Engine`] carrying the raw response.
    pub fn delete_index(&self, name: &str) -> Result<DeleteOutcome> {
        if !self.index_exists(name)? {
            info!(index = name, "index does not exist, nothing to delete");
            return Ok(DeleteOutcome::NotFound);
        }

        let response = self
            .conn
            .send(self.conn.request(Method::DELETE, &format!("/{}", segment(name))))?;
        let status = response.status();
        if status.is_success() {
            info!(index = name, "index deleted");
            return Ok(DeleteOutcome::Deleted);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            info!(index = name, "index disappeared before delete");
            return Ok(DeleteOutcome::NotFound);
        }
        let body = response.text().unwrap_or_default();
        warn!(index = name, %status, "index delete failed");
        Err(MigrateError::from_engine_response(status.as_u16(), body))
    }

    pub fn document_count(&self, name: &str) -> Result<u64> {
        let response = self
            .conn
            .send(self.conn.request(Method::GET, &format!("/{}/_count", segment(name))))?;
        let count: CountResponse = self.conn.read_json(response)?;
        debug!(index = name, count = count.count, "document count");
        Ok(count.count)
    }

    pub fn refresh(&self, name: &str) -> Result<()> {
        let response = self
            .conn
            .send(self.conn.request(Method::POST, &format!("/{}/_refresh", segment(name))))?;
        let _: serde_json::Value = self.conn.read_json(response)?;
        Ok(())
    }
}
