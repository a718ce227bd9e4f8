//! esmig alias - Manage the stable alias in front of index versions
//!
//! An alias is created once and afterwards only moved with an atomic swap.
//! Swapping an alias that does not exist is refused; create it first.

use clap::{Args, Subcommand};
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_robot, robot_ok};
use crate::error::{MigrateError, Result};
use crate::es::{AliasManager, CreateAliasOutcome, IndexName, SwapOutcome};

#[derive(Args, Debug)]
pub struct AliasArgs {
    #[command(subcommand)]
    pub command: AliasCommand,
}

#[derive(Subcommand, Debug)]
pub enum AliasCommand {
    /// Point a new alias at an index (no-op if the alias exists)
    Create {
        /// Alias name (e.g. candidates)
        alias: IndexName,

        /// Index the alias should resolve to
        index: IndexName,
    },

    /// Atomically move an alias from one index to another
    Swap {
        alias: IndexName,

        /// Index the alias currently points at
        #[arg(long)]
        from: IndexName,

        /// Index the alias should point at afterwards
        #[arg(long)]
        to: IndexName,
    },

    /// Show which index an alias resolves to
    Show {
        alias: IndexName,
    },
}

pub fn run(ctx: &AppContext, args: &AliasArgs) -> Result<()> {
    let conn = ctx.connect()?;
    let aliases = AliasManager::new(&conn);

    match &args.command {
        AliasCommand::Create { alias, index } => {
            let outcome = aliases.create_alias(index.as_str(), alias.as_str())?;
            if ctx.robot_mode {
                return emit_robot(&robot_ok(serde_json::json!({
                    "alias": alias,
                    "index": index,
                    "outcome": outcome,
                })));
            }
            match outcome {
                CreateAliasOutcome::Created => println!(
                    "{} Alias '{}' → '{}'",
                    "✓".green().bold(),
                    alias.as_str().cyan(),
                    index.as_str().cyan()
                ),
                CreateAliasOutcome::AlreadyExists => {
                    println!("{} Alias '{}' already exists", "!".yellow(), alias.as_str().cyan());
                }
            }
        }
        AliasCommand::Swap { alias, from, to } => {
            let outcome = aliases.swap_alias(from.as_str(), to.as_str(), alias.as_str())?;
            if outcome == SwapOutcome::NotFound {
                return Err(MigrateError::ValidationFailed(format!(
                    "alias '{alias}' does not exist; create it with `esmig alias create {alias} {from}`"
                )));
            }
            if ctx.robot_mode {
                return emit_robot(&robot_ok(serde_json::json!({
                    "alias": alias,
                    "from": from,
                    "to": to,
                    "outcome": outcome,
                })));
            }
            match outcome {
                SwapOutcome::AlreadyCurrent => println!(
                    "{} Alias '{}' already points at '{}'",
                    "!".yellow(),
                    alias.as_str().cyan(),
                    to.as_str().cyan()
                ),
                _ => println!(
                    "{} Alias '{}': '{}' → '{}'",
                    "✓".green().bold(),
                    alias.as_str().cyan(),
                    from.as_str().dimmed(),
                    to.as_str().cyan()
                ),
            }
        }
        AliasCommand::Show { alias } => {
            let indices = aliases.resolve_alias(alias.as_str())?;
            if ctx.robot_mode {
                return emit_robot(&robot_ok(serde_json::json!({
                    "alias": alias,
                    "indices": indices,
                })));
            }
            if indices.is_empty() {
                println!("{} Alias '{}' does not exist", "!".yellow(), alias.as_str());
            } else {
                println!("{} → {}", alias.as_str().cyan(), indices.join(", ").green());
                if indices.len() > 1 {
                    println!(
                        "{} alias resolves to {} indices; swaps will be refused",
                        "!".yellow(),
                        indices.len()
                    );
                }
            }
        }
    }

    Ok(())
}
