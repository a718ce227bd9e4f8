//! esmig migrate - Run a migration plan
//!
//! Steps run in fixed order: create, reindex, verify, alias, delete. Every
//! step is idempotent, so an interrupted migration is resumed by running the
//! same command again.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_robot, robot_ok, spinner};
use crate::error::Result;
use crate::migration::{
    MigrationPlan, MigrationReport, Migrator, PlanSummary, Step, StepOutcome,
};

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Migration plan (TOML)
    #[arg(value_name = "PLAN")]
    pub plan: PathBuf,

    /// Steps to run (comma separated); defaults to the whole plan
    #[arg(long, value_enum, value_delimiter = ',', default_value = "all")]
    pub step: Vec<StepArg>,

    /// Print the resolved plan without contacting the engine
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StepArg {
    All,
    Create,
    Reindex,
    Verify,
    Alias,
    Delete,
}

/// Expand `--step` values into concrete steps for `plan`.
pub fn selected_steps(args: &[StepArg], plan: &MigrationPlan) -> Vec<Step> {
    let mut steps = Vec::new();
    for arg in args {
        match arg {
            StepArg::All => steps.extend(Step::for_plan(plan)),
            StepArg::Create => steps.push(Step::Create),
            StepArg::Reindex => steps.push(Step::Reindex),
            StepArg::Verify => steps.push(Step::Verify),
            StepArg::Alias => steps.push(Step::Alias),
            StepArg::Delete => steps.push(Step::Delete),
        }
    }
    steps.sort_unstable();
    steps.dedup();
    steps
}

pub fn run(ctx: &AppContext, args: &MigrateArgs) -> Result<()> {
    let plan = MigrationPlan::load(&args.plan)?;
    let steps = selected_steps(&args.step, &plan);

    if args.dry_run {
        return dry_run(ctx, &plan, &steps);
    }

    let conn = ctx.connect()?;
    let migrator = Migrator::new(&conn);

    let report = if ctx.robot_mode {
        migrator.run(&plan, &steps)?
    } else {
        let pb = spinner(format!("Migrating alias '{}'", plan.alias));
        let result = migrator.run_with(&plan, &steps, |step| {
            pb.set_message(format!("{step}: {}", step.describe(&plan)));
        });
        pb.finish_and_clear();
        result?
    };

    if ctx.robot_mode {
        let warnings = report.warnings();
        return emit_robot(&robot_ok(&report).with_warnings(warnings));
    }
    print_report(&report);
    Ok(())
}

fn dry_run(ctx: &AppContext, plan: &MigrationPlan, steps: &[Step]) -> Result<()> {
    if ctx.robot_mode {
        let described: Vec<_> = steps
            .iter()
            .map(|step| serde_json::json!({ "step": step, "action": step.describe(plan) }))
            .collect();
        return emit_robot(&robot_ok(serde_json::json!({
            "dry_run": true,
            "plan": PlanSummary::from(plan),
            "steps": described,
        })));
    }

    println!("{}", "Dry run: nothing will be changed".bold());
    println!();
    println!("  source       {}", plan.source.as_str().cyan());
    println!("  destination  {}", plan.destination.as_str().cyan());
    println!("  alias        {}", plan.alias.as_str().cyan());
    if let Some(path) = &plan.mapping_path {
        println!("  mapping      {}", path.display());
    }
    println!();
    for (i, step) in steps.iter().enumerate() {
        println!("  {}. {}", i + 1, step.describe(plan));
    }
    Ok(())
}

fn print_report(report: &MigrationReport) {
    for step in &report.steps {
        let line = match &step.outcome {
            StepOutcome::Index(outcome) => format!("index '{}': {outcome:?}", report.plan.destination),
            StepOutcome::Reindexed(r) => format!(
                "reindexed {} documents ({} ms)",
                r.documents_copied(),
                r.took_ms
            ),
            StepOutcome::CountsMatch { source, .. } => format!("counts match ({source})"),
            StepOutcome::CountsDiffer {
                source,
                destination,
            } => format!("counts differ ({source} vs {destination})"),
            StepOutcome::AliasCreated(outcome) => format!("alias '{}': {outcome:?}", report.plan.alias),
            StepOutcome::AliasSwapped(outcome) => format!(
                "alias '{}' → '{}': {outcome:?}",
                report.plan.alias, report.plan.destination
            ),
            StepOutcome::SourceDeleted(outcome) => {
                format!("index '{}': {outcome:?}", report.plan.source)
            }
        };
        let marker = if step.warning.is_some() {
            "!".yellow()
        } else {
            "✓".green().bold()
        };
        println!("{marker} {:8} {line}", step.step.as_str());
        if let Some(warning) = &step.warning {
            println!("  {}", warning.yellow());
        }
    }
}
