use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;
use crate::es::{Connection, ConnectionManager};

pub struct AppContext {
    pub project_dir: PathBuf,
    pub config: Config,
    pub robot_mode: bool,
    pub verbosity: u8,
}

impl AppContext {
    pub fn from_cli(cli: &crate::cli::Cli) -> Result<Self> {
        let project_dir = std::env::current_dir()?;
        let config = Config::load(cli.config.as_deref(), &project_dir)?;

        Ok(Self {
            project_dir,
            config,
            robot_mode: cli.robot,
            verbosity: cli.verbose,
        })
    }

    /// Open and validate a connection. Commands that only inspect local
    /// files (dry runs) never call this.
    pub fn connect(&self) -> Result<Connection> {
        ConnectionManager::new(self.config.elasticsearch.clone()).connect()
    }
}
