//! Alias cutover.
//!
//! A managed alias resolves to exactly one index version at any time. It is
//! created once and afterwards only moved with a single batched
//! `_aliases` request holding both the remove and the add action, which the
//! engine applies atomically.

use std::collections::BTreeMap;

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::connection::{Connection, segment};
use crate::error::{MigrateError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateAliasOutcome {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapOutcome {
    Swapped,
    /// The alias already pointed at the target; nothing was sent.
    AlreadyCurrent,
    /// The alias does not exist. Swapping never creates it.
    NotFound,
}

/// One entry of an `_aliases` action list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasAction {
    Add {
        index: String,
        alias: String,
    },
    Remove {
        index: String,
        alias: String,
        /// Makes the engine reject the whole batch when the alias is not on
        /// `index`.
        must_exist: bool,
    },
}

/// Actions for an atomic move of `alias` from `from` to `to`.
pub fn swap_actions(from: &str, to: &str, alias: &str) -> Vec<AliasAction> {
    vec![
        AliasAction::Remove {
            index: from.to_string(),
            alias: alias.to_string(),
            must_exist: true,
        },
        AliasAction::Add {
            index: to.to_string(),
            alias: alias.to_string(),
        },
    ]
}

/// Engine error types raised when a `remove` action with `must_exist` finds
/// the alias gone. Every other rejection is an ordinary engine error.
const ALIAS_MISSING_ERRORS: &[&str] = &["aliases_not_found_exception", "alias_not_found_exception"];

#[derive(Serialize)]
struct AliasUpdate<'a> {
    actions: &'a [AliasAction],
}

#[derive(Deserialize)]
struct Acknowledged {
    #[serde(default)]
    acknowledged: bool,
}

pub struct AliasManager<'a> {
    conn: &'a Connection,
}

impl<'a> AliasManager<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn alias_exists(&self, alias: &str) -> Result<bool> {
        let exists = self.conn.exists(&format!("/_alias/{}", segment(alias)))?;
        debug!(alias, exists, "alias existence check");
        Ok(exists)
    }

    /// Index names the alias currently resolves to, sorted. Empty when the
    /// alias does not exist.
    pub fn resolve_alias(&self, alias: &str) -> Result<Vec<String>> {
        let response = self
            .conn
            .send(self.conn.request(Method::GET, &format!("/_alias/{}", segment(alias))))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let indices: BTreeMap<String, Value> = self.conn.read_json(response)?;
        Ok(indices.into_keys().collect())
    }

    pub fn create_alias(&self, index: &str, alias: &str) -> Result<CreateAliasOutcome> {
        if self.alias_exists(alias)? {
            info!(alias, "alias already exists");
            return Ok(CreateAliasOutcome::AlreadyExists);
        }
        let actions = [AliasAction::Add {
            index: index.to_string(),
            alias: alias.to_string(),
        }];
        self.update_aliases(alias, &actions)?;
        info!(alias, index, "alias created");
        Ok(CreateAliasOutcome::Created)
    }

    /// Move `alias` from `from` to `to` in one atomic request.
    ///
    /// Fails with [`MigrateError::AliasConflict`] when the alias points
    /// anywhere other than exactly `from`, before or during the request.
    /// Other rejections, such as a missing `to` index, are
    /// [`MigrateError::Engine`].
    pub fn swap_alias(&self, from: &str, to: &str, alias: &str) -> Result<SwapOutcome> {
        if !self.alias_exists(alias)? {
            warn!(alias, "alias does not exist, swap rejected");
            return Ok(SwapOutcome::NotFound);
        }

        let current = self.resolve_alias(alias)?;
        if current.len() == 1 && current[0] == to {
            info!(alias, index = to, "alias already points at target");
            return Ok(SwapOutcome::AlreadyCurrent);
        }
        if current.len() != 1 || current[0] != from {
            return Err(MigrateError::AliasConflict {
                alias: alias.to_string(),
                message: format!(
                    "expected alias to point at [{from}], found [{}]",
                    current.join(", ")
                ),
                body: String::new(),
            });
        }

        self.update_aliases(alias, &swap_actions(from, to, alias))?;
        info!(alias, from, to, "alias swapped");
        Ok(SwapOutcome::Swapped)
    }

    fn update_aliases(&self, alias: &str, actions: &[AliasAction]) -> Result<()> {
        let request = self
            .conn
            .request(Method::POST, "/_aliases")
            .json(&AliasUpdate { actions });
        let response = self.conn.send(request)?;
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            warn!(alias, %status, "alias update rejected");
            return Err(match MigrateError::from_engine_response(status.as_u16(), body) {
                MigrateError::Engine {
                    error_type,
                    reason,
                    body,
                    ..
                } if ALIAS_MISSING_ERRORS.contains(&error_type.as_str()) => {
                    MigrateError::AliasConflict {
                        alias: alias.to_string(),
                        message: format!("{error_type}: {reason}"),
                        body,
                    }
                }
                other => other,
            });
        }

        let ack: Acknowledged = serde_json::from_str(&body)?;
        if !ack.acknowledged {
            return Err(MigrateError::AliasConflict {
                alias: alias.to_string(),
                message: "alias update not acknowledged".to_string(),
                body,
            });
        }
        Ok(())
    }
}
