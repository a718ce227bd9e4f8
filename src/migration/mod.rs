//! Parameterized migrations: one plan value, one entry point, fixed step
//! order (create, reindex, verify, alias, delete).

pub mod plan;
pub mod runner;

pub use plan::{MigrationPlan, PlanSummary};
pub use runner::{MigrationReport, Migrator, Step, StepOutcome, StepReport};
