//! esmig index - Manage concrete index versions

use std::path::PathBuf;

use clap::{Args, Subcommand};
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_robot, robot_ok};
use crate::error::Result;
use crate::es::{DeleteOutcome, EnsureOutcome, IndexManager, IndexName, Mapping};

#[derive(Args, Debug)]
pub struct IndexArgs {
    #[command(subcommand)]
    pub command: IndexCommand,
}

#[derive(Subcommand, Debug)]
pub enum IndexCommand {
    /// Create an index version unless it already exists
    Create {
        /// Index name (e.g. candidates_v3)
        name: IndexName,

        /// JSON mapping file (bare mapping or full create body)
        #[arg(long, short)]
        mapping: Option<PathBuf>,
    },

    /// Delete an index version if it exists
    Delete {
        name: IndexName,
    },

    /// Check whether an index version exists
    Exists {
        name: IndexName,
    },

    /// Count documents in an index
    Count {
        name: IndexName,
    },
}

pub fn run(ctx: &AppContext, args: &IndexArgs) -> Result<()> {
    let conn = ctx.connect()?;
    let indices = IndexManager::new(&conn);

    match &args.command {
        IndexCommand::Create { name, mapping } => {
            let mapping = match mapping {
                Some(path) => Mapping::from_file(path)?,
                None => Mapping::empty(),
            };
            let outcome = indices.ensure_index(name.as_str(), &mapping)?;
            if ctx.robot_mode {
                return emit_robot(&robot_ok(serde_json::json!({
                    "index": name,
                    "outcome": outcome,
                })));
            }
            match outcome {
                EnsureOutcome::Created => {
                    println!("{} Created index '{}'", "✓".green().bold(), name.as_str().cyan());
                }
                EnsureOutcome::AlreadyExists => {
                    println!("{} Index '{}' already exists", "!".yellow(), name.as_str().cyan());
                }
            }
        }
        IndexCommand::Delete { name } => {
            let outcome = indices.delete_index(name.as_str())?;
            if ctx.robot_mode {
                return emit_robot(&robot_ok(serde_json::json!({
                    "index": name,
                    "outcome": outcome,
                })));
            }
            match outcome {
                DeleteOutcome::Deleted => {
                    println!("{} Deleted index '{}'", "✓".green().bold(), name.as_str().cyan());
                }
                DeleteOutcome::NotFound => {
                    println!("{} Index '{}' does not exist", "!".yellow(), name.as_str());
                }
            }
        }
        IndexCommand::Exists { name } => {
            let exists = indices.index_exists(name.as_str())?;
            if ctx.robot_mode {
                return emit_robot(&robot_ok(serde_json::json!({
                    "index": name,
                    "exists": exists,
                })));
            }
            if exists {
                println!("{} exists", name.as_str().cyan());
            } else {
                println!("{} does not exist", name.as_str().dimmed());
            }
        }
        IndexCommand::Count { name } => {
            let count = indices.document_count(name.as_str())?;
            if ctx.robot_mode {
                return emit_robot(&robot_ok(serde_json::json!({
                    "index": name,
                    "count": count,
                })));
            }
            println!("{} {}", name.as_str().cyan(), count.to_string().bold());
        }
    }

    Ok(())
}
