//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - run() function to execute the command

use clap::Subcommand;

pub mod alias;
pub mod index;
pub mod migrate;
pub mod ping;
pub mod reindex;

use crate::app::AppContext;
use crate::error::Result;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to the search engine and show cluster info
    Ping(ping::PingArgs),

    /// Create, delete and inspect index versions
    Index(index::IndexArgs),

    /// Copy documents from one index version into another
    Reindex(reindex::ReindexArgs),

    /// Create, swap and show aliases
    Alias(alias::AliasArgs),

    /// Run a migration plan
    Migrate(migrate::MigrateArgs),
}

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Ping(args) => ping::run(ctx, args),
        Commands::Index(args) => index::run(ctx, args),
        Commands::Reindex(args) => reindex::run(ctx, args),
        Commands::Alias(args) => alias::run(ctx, args),
        Commands::Migrate(args) => migrate::run(ctx, args),
    }
}
