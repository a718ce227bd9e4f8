use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use super::plan::{MigrationPlan, PlanSummary};
use crate::error::{MigrateError, Result};
use crate::es::{
    AliasManager, Connection, CreateAliasOutcome, DeleteOutcome, EnsureOutcome, IndexManager,
    ReindexJob, ReindexReport, Reindexer, SwapOutcome,
};

/// Migration steps, declared in the order they always run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Create,
    Reindex,
    Verify,
    Alias,
    Delete,
}

impl Step {
    pub const ALL: [Self; 5] = [
        Self::Create,
        Self::Reindex,
        Self::Verify,
        Self::Alias,
        Self::Delete,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Reindex => "reindex",
            Self::Verify => "verify",
            Self::Alias => "alias",
            Self::Delete => "delete",
        }
    }

    /// Steps a full run executes for `plan`.
    pub fn for_plan(plan: &MigrationPlan) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|step| match step {
                Self::Verify => plan.verify_count,
                Self::Delete => plan.delete_source,
                _ => true,
            })
            .collect()
    }

    pub fn describe(self, plan: &MigrationPlan) -> String {
        let (source, dest, alias) = (&plan.source, &plan.destination, &plan.alias);
        match self {
            Self::Create => format!("ensure index '{dest}' exists with the plan mapping"),
            Self::Reindex => match &plan.transform {
                Some(_) => format!("reindex '{source}' into '{dest}' with transform"),
                None => format!("reindex '{source}' into '{dest}'"),
            },
            Self::Verify => format!("compare document counts of '{source}' and '{dest}'"),
            Self::Alias => {
                format!("point alias '{alias}' at '{dest}' (create, or swap from '{source}')")
            }
            Self::Delete => format!("delete '{source}' once '{alias}' no longer uses it"),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a step did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Index(EnsureOutcome),
    Reindexed(ReindexReport),
    CountsMatch { source: u64, destination: u64 },
    CountsDiffer { source: u64, destination: u64 },
    AliasCreated(CreateAliasOutcome),
    AliasSwapped(SwapOutcome),
    SourceDeleted(DeleteOutcome),
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: Step,
    pub outcome: StepOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub plan: PlanSummary,
    pub steps: Vec<StepReport>,
}

impl MigrationReport {
    pub fn warnings(&self) -> Vec<String> {
        self.steps.iter().filter_map(|s| s.warning.clone()).collect()
    }
}

/// Runs the steps of a [`MigrationPlan`] against one connection.
///
/// Steps always run in [`Step`] order and stop at the first error. Each one
/// is safe to re-run, so recovering from a failure means running the same
/// plan again.
pub struct Migrator<'a> {
    indices: IndexManager<'a>,
    reindexer: Reindexer<'a>,
    aliases: AliasManager<'a>,
}

impl<'a> Migrator<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self {
            indices: IndexManager::new(conn),
            reindexer: Reindexer::new(conn),
            aliases: AliasManager::new(conn),
        }
    }

    pub fn run(&self, plan: &MigrationPlan, steps: &[Step]) -> Result<MigrationReport> {
        self.run_with(plan, steps, |_| {})
    }

    /// Like [`Migrator::run`], calling `on_step` before each step starts.
    pub fn run_with(
        &self,
        plan: &MigrationPlan,
        steps: &[Step],
        mut on_step: impl FnMut(Step),
    ) -> Result<MigrationReport> {
        let mut ordered = steps.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let mut reports = Vec::with_capacity(ordered.len());
        for step in ordered {
            on_step(step);
            info!(step = %step, alias = %plan.alias, "running migration step");
            let report = match step {
                Step::Create => self.create(plan),
                Step::Reindex => self.reindex(plan),
                Step::Verify => self.verify(plan),
                Step::Alias => self.alias(plan),
                Step::Delete => self.delete(plan),
            }?;
            if let Some(warning) = &report.warning {
                warn!(step = %step, "{warning}");
            }
            reports.push(report);
        }

        Ok(MigrationReport {
            plan: PlanSummary::from(plan),
            steps: reports,
        })
    }

    fn create(&self, plan: &MigrationPlan) -> Result<StepReport> {
        let outcome = self
            .indices
            .ensure_index(plan.destination.as_str(), &plan.mapping)?;
        Ok(StepReport {
            step: Step::Create,
            outcome: StepOutcome::Index(outcome),
            warning: None,
        })
    }

    fn reindex(&self, plan: &MigrationPlan) -> Result<StepReport> {
        for index in [&plan.source, &plan.destination] {
            if !self.indices.index_exists(index.as_str())? {
                return Err(MigrateError::ValidationFailed(format!(
                    "index '{index}' does not exist; run the create step first"
                )));
            }
        }
        let job = ReindexJob::new(plan.source.as_str(), plan.destination.as_str())
            .with_transform(plan.transform.clone());
        let report = self.reindexer.reindex(&job)?;
        Ok(StepReport {
            step: Step::Reindex,
            outcome: StepOutcome::Reindexed(report),
            warning: None,
        })
    }

    fn verify(&self, plan: &MigrationPlan) -> Result<StepReport> {
        self.indices.refresh(plan.destination.as_str())?;
        let source = self.indices.document_count(plan.source.as_str())?;
        let destination = self.indices.document_count(plan.destination.as_str())?;
        if source == destination {
            return Ok(StepReport {
                step: Step::Verify,
                outcome: StepOutcome::CountsMatch {
                    source,
                    destination,
                },
                warning: None,
            });
        }

        let message = format!(
            "'{}' has {source} documents but '{}' has {destination}",
            plan.source, plan.destination
        );
        if plan
            .transform
            .as_ref()
            .is_some_and(|transform| transform.may_change_count())
        {
            return Ok(StepReport {
                step: Step::Verify,
                outcome: StepOutcome::CountsDiffer {
                    source,
                    destination,
                },
                warning: Some(message),
            });
        }
        Err(MigrateError::ValidationFailed(message))
    }

    fn alias(&self, plan: &MigrationPlan) -> Result<StepReport> {
        let (source, dest, alias) = (
            plan.source.as_str(),
            plan.destination.as_str(),
            plan.alias.as_str(),
        );
        let outcome = match self.aliases.create_alias(dest, alias)? {
            CreateAliasOutcome::Created => StepOutcome::AliasCreated(CreateAliasOutcome::Created),
            CreateAliasOutcome::AlreadyExists => {
                StepOutcome::AliasSwapped(self.aliases.swap_alias(source, dest, alias)?)
            }
        };
        let warning = matches!(outcome, StepOutcome::AliasSwapped(SwapOutcome::NotFound))
            .then(|| format!("alias '{alias}' vanished before it could be swapped"));
        Ok(StepReport {
            step: Step::Alias,
            outcome,
            warning,
        })
    }

    fn delete(&self, plan: &MigrationPlan) -> Result<StepReport> {
        let current = self.aliases.resolve_alias(plan.alias.as_str())?;
        if current.iter().any(|index| index == plan.source.as_str()) {
            return Err(MigrateError::ValidationFailed(format!(
                "alias '{}' still points at '{}'; run the alias step first",
                plan.alias, plan.source
            )));
        }
        let outcome = self.indices.delete_index(plan.source.as_str())?;
        Ok(StepReport {
            step: Step::Delete,
            outcome: StepOutcome::SourceDeleted(outcome),
            warning: None,
        })
    }
}
