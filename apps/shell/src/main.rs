//! SiteHub shell: hosts the security boundary and speaks line-delimited JSON with the
//! renderer over stdin/stdout. Logs go to stderr and, when configured, rolling files.
//!
//! `sitehub-shell [config.toml]`

mod bridge;
mod headless;

use anyhow::Context;
use headless::HeadlessShell;
use shub_boundary::{Boundary, BoundaryConfig, load_config};
use shub_logger::{LevelFilter, Logger};
use shub_vault::FileKeystore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[shub_runtime::main(event_loop)]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = load_config(config_path.as_deref())?;
    let _logger = init_logger(&config)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting SiteHub shell");

    let keystore = Arc::new(FileKeystore::new(&config.keystore.dir));
    let boundary = Arc::new(Boundary::open(&config, keystore, Arc::new(HeadlessShell::default())).await?);

    let outbox = bridge::spawn_writer();
    boundary.attach_renderer(bridge::surface(&outbox))?;

    bridge::serve(Arc::clone(&boundary), outbox).await?;

    boundary.will_quit().await;
    info!("SiteHub shell stopped");
    Ok(())
}

fn init_logger(config: &BoundaryConfig) -> anyhow::Result<Logger> {
    let settings = &config.logging;
    let level = settings
        .level
        .parse::<LevelFilter>()
        .with_context(|| format!("Invalid log level '{}'", settings.level))?;

    let builder = Logger::builder().name(env!("CARGO_BIN_NAME")).level(level).console(true).ansi(false);
    let logger = match &settings.dir {
        Some(dir) => builder.path(dir).max_files(settings.max_files).json(settings.json).init()?,
        None => builder.init()?,
    };
    Ok(logger)
}
