//! esmig: zero-downtime search index migrations.
//!
//! A migration moves a stable alias (e.g. `candidates`) from one immutably
//! mapped index version to the next:
//!
//! 1. [`es::IndexManager::ensure_index`] creates the new version.
//! 2. [`es::Reindexer::reindex`] copies documents, optionally transformed.
//! 3. [`es::AliasManager::swap_alias`] moves the alias in one atomic request.
//! 4. [`es::IndexManager::delete_index`] removes the old version.
//!
//! [`migration::Migrator`] runs those steps from a single
//! [`migration::MigrationPlan`].

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod es;
pub mod migration;

pub use error::{MigrateError, Result};
