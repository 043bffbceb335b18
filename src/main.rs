//! BIRING - Bike Sharing Analytics Dashboard
//!
//! Loads the daily and hourly bike-sharing tables and renders descriptive
//! statistics and charts for a selectable date range.

mod charts;
mod config;
mod data;
mod gui;
mod stats;

use anyhow::Context;
use config::DashboardConfig;
use eframe::egui;
use gui::BiringApp;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let config = DashboardConfig::discover().context("loading dashboard config")?;
    tracing::info!(
        "starting dashboard (daily: {}, hourly: {})",
        config.daily_csv.display(),
        config.hourly_csv.display()
    );

    // Configure native options
    let title = config.title.clone();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1100.0, 700.0])
            .with_title(&title),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        &title,
        options,
        Box::new(|cc| Ok(Box::new(BiringApp::new(cc, config)))),
    )
    .map_err(|e| anyhow::anyhow!("dashboard window failed: {e}"))
}
