//! esmig ping - Check connectivity and credentials

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct PingArgs {}

pub fn run(ctx: &AppContext, _args: &PingArgs) -> Result<()> {
    let conn = ctx.connect()?;
    let info = conn.info()?;

    if ctx.robot_mode {
        return emit_robot(&robot_ok(serde_json::json!({
            "endpoint": conn.base_url(),
            "authenticated": conn.is_authenticated(),
            "cluster_name": info.cluster_name,
            "version": info.version.number,
        })));
    }

    let mut layout = HumanLayout::new();
    layout
        .title(&format!("{} Connected", "✓".green().bold()))
        .kv("Endpoint", conn.base_url())
        .kv("Cluster", &info.cluster_name)
        .kv("Version", &info.version.number)
        .kv(
            "Auth",
            if conn.is_authenticated() {
                "basic"
            } else {
                "anonymous"
            },
        );
    emit_human(layout);
    Ok(())
}
