//! esmig reindex - Copy documents between index versions

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok, spinner};
use crate::error::{MigrateError, Result};
use crate::es::{IndexManager, IndexName, ReindexJob, Reindexer, Transform};

#[derive(Args, Debug)]
pub struct ReindexArgs {
    /// Index to copy from
    pub source: IndexName,

    /// Index to copy into (must already exist)
    pub dest: IndexName,

    /// Build fullName from firstName and lastName during the copy
    #[arg(long, conflicts_with = "script")]
    pub full_name: bool,

    /// Painless script applied to each document
    #[arg(long)]
    pub script: Option<String>,

    /// Show one source document before/after the transform instead of copying
    #[arg(long, value_name = "DOC_ID")]
    pub preview: Option<String>,
}

impl ReindexArgs {
    fn transform(&self) -> Option<Transform> {
        if self.full_name {
            Some(Transform::full_name())
        } else {
            self.script.as_ref().map(Transform::script)
        }
    }
}

pub fn run(ctx: &AppContext, args: &ReindexArgs) -> Result<()> {
    let conn = ctx.connect()?;
    let reindexer = Reindexer::new(&conn);
    let transform = args.transform();

    if let Some(doc_id) = &args.preview {
        let transform = transform.ok_or_else(|| {
            MigrateError::ValidationFailed("--preview needs --full-name or --script".to_string())
        })?;
        let preview = reindexer.preview(args.source.as_str(), doc_id, &transform)?;
        if ctx.robot_mode {
            return emit_robot(&robot_ok(preview));
        }
        let mut layout = HumanLayout::new();
        layout
            .title(&format!("Preview of '{}' from {}", doc_id, args.source))
            .kv("Before", &preview.before.to_string())
            .kv("After", &preview.after.to_string());
        emit_human(layout);
        return Ok(());
    }

    let indices = IndexManager::new(&conn);
    for index in [&args.source, &args.dest] {
        if !indices.index_exists(index.as_str())? {
            return Err(MigrateError::ValidationFailed(format!(
                "index '{index}' does not exist"
            )));
        }
    }

    let job = ReindexJob::new(args.source.as_str(), args.dest.as_str()).with_transform(transform);
    let pb = (!ctx.robot_mode).then(|| spinner(format!("Reindexing {} → {}", args.source, args.dest)));
    let result = reindexer.reindex(&job);
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let report = result?;

    if ctx.robot_mode {
        return emit_robot(&robot_ok(&report));
    }
    println!(
        "{} Reindexed {} documents from '{}' into '{}' in {} ms",
        "✓".green().bold(),
        report.documents_copied().to_string().bold(),
        report.source.cyan(),
        report.dest.cyan(),
        report.took_ms
    );
    println!(
        "  {}",
        format!(
            "created {}, updated {}, noops {}, batches {}",
            report.created, report.updated, report.noops, report.batches
        )
        .dimmed()
    );
    Ok(())
}
