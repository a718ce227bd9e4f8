//! Search engine primitives: connection, index lifecycle, reindex and alias
//! cutover.
//!
//! Each manager borrows one [`Connection`] for the duration of a process
//! invocation. None of them retries internally; every operation is either
//! idempotent or atomic, so the caller may simply re-run it.

pub mod alias;
pub mod connection;
pub mod indices;
pub mod mapping;
pub mod names;
pub mod reindex;

pub use alias::{AliasAction, AliasManager, CreateAliasOutcome, SwapOutcome, swap_actions};
pub use connection::{
    ClusterInfo, Connection, ConnectionManager, CredentialResolver, Credentials, Endpoint,
    NoCredentials, StaticCredentials, TerminalPrompt, decode_cloud_id,
};
pub use indices::{DeleteOutcome, EnsureOutcome, IndexManager};
pub use mapping::Mapping;
pub use names::IndexName;
pub use reindex::{ReindexJob, ReindexReport, Reindexer, Transform, TransformPreview};
