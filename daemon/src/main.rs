mod cli;
mod config;
mod gpu;
mod host;
mod macros;
mod media;
mod pipeline;
mod scheduler;
mod wayland;

use anyhow::{Context, Result};
use clap::Parser;
use common::{Rect, WeaverError};

use crate::cli::Cli;
use crate::config::{Config, Settings};
use crate::host::ShutdownSignal;
use crate::media::MediaDecoder;
use crate::pipeline::decode::DecodePool;
use crate::wayland::{HostOptions, WaylandHost};

/// Window size used when no view has a positive extent
const FALLBACK_WINDOW_SIZE: (u32, u32) = (640, 480);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => Config::default_config_path()?,
    };
    let config = Config::load_from_path(&config_path)?;

    let settings = match Settings::resolve(&cli, &config) {
        Ok(settings) => settings,
        Err(WeaverError::Usage(msg)) => {
            eprintln!("weaver: {}", msg);
            eprintln!("Usage: weaver [OPTIONS] [PATH SPEED X Y W H]...");
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log_level.as_str()),
    )
    .init();

    log::info!("Starting weaver v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Configuration file: {}", config_path.display());
    settings.log_summary();

    let shutdown = ShutdownSignal::new();

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_signal().await {
            log::error!("Signal handling failed: {}", e);
            return;
        }
        signal_shutdown.request();
    });

    // The graphics context lives on this one blocking thread from creation
    // to teardown.
    let presenter = tokio::task::spawn_blocking(move || present(settings, shutdown));
    presenter.await.context("Presentation thread panicked")??;

    log::info!("weaver stopped");
    Ok(())
}

async fn wait_for_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to set up SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to set up SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => {
            log::info!("Received SIGTERM, shutting down...");
        }
        _ = sigint.recv() => {
            log::info!("Received SIGINT, shutting down...");
        }
    }

    Ok(())
}

fn present(settings: Settings, shutdown: ShutdownSignal) -> Result<()> {
    let window_size = Rect::bounding_size(settings.views.iter().map(|view| &view.rect))
        .unwrap_or(FALLBACK_WINDOW_SIZE);

    let mut host = WaylandHost::new(HostOptions {
        desktop: settings.desktop,
        vsync: settings.vsync,
        window_size,
        clear_color: settings.clear_color,
    })
    .context("Failed to create the display surface")?;

    log::info!(
        "Presenting on {}",
        if host.is_desktop() {
            "the desktop background"
        } else {
            "a window"
        }
    );

    let decoder = MediaDecoder::new(settings.decode);
    let pool = DecodePool::new(settings.decode_threads);

    let reason = pipeline::run(
        &mut host,
        &decoder,
        &pool,
        &settings.views,
        settings.pacing,
        &shutdown,
    )?;

    log::info!("Stopped: {:?}", reason);
    Ok(())
}
