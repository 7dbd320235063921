mod app;
mod config;
mod controller;
mod ui;
mod views;

use std::{io, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use dashboard_core::source_for_location;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{
    app::DashboardApp,
    controller::{
        commands::HostMessage,
        orchestration::{run_host_loop, spawn_input_reader},
    },
    ui::render::render_sidebar,
};

#[derive(Parser, Debug)]
#[command(name = "dashboard", about = "Hospital map dashboard in the terminal")]
struct Args {
    /// Config file; defaults to dashboard.toml in the config dir and cwd.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Hospital table location, `http(s)://` URL or file path.
    #[arg(long)]
    source: Option<String>,
    #[arg(long)]
    debounce_ms: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = config::load_settings(args.config.as_deref())?;
    if let Some(source) = args.source {
        settings.source = source;
    }
    if let Some(debounce_ms) = args.debounce_ms {
        settings.search_debounce_ms = debounce_ms;
    }
    settings.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    info!(source = %settings.source, "starting dashboard");
    let app = DashboardApp::new(&settings, source_for_location(&settings.source));

    if let Err(err) = runtime.block_on(app.reload()) {
        error!(error = %err, "initial load failed");
    }
    println!("{}", render_sidebar(&app.sidebar().state()));
    println!("type `help` for commands");

    let (tx, rx) = bounded::<HostMessage>(256);
    spawn_input_reader(io::BufReader::new(io::stdin()), tx);

    let mut stdout = io::stdout().lock();
    let result = run_host_loop(&app, &runtime, &rx, &mut stdout);
    app.shutdown();
    result
}
