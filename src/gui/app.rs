//! BIRING Main Application
//! Main window with the control sidebar and the dashboard page.

use crate::charts::StaticChartRenderer;
use crate::config::DashboardConfig;
use crate::data::{DataLoader, DataValidator, DateRange, IntegrityReport, LoaderError};
use crate::gui::{load_logo, ChartViewer, ControlPanel, ControlPanelAction, UserSettings};
use crate::stats::StatsCalculator;
use egui::SidePanel;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread;

/// CSV loading result from background thread
enum LoadResult {
    Progress(String),
    Complete {
        loader: Box<DataLoader>,
        bounds: DateRange,
        integrity: IntegrityReport,
    },
    Error(String),
}

/// Drain pending loader messages. Returns `true` once a final result was
/// seen; a thread that hangs up without one is reported as an error.
fn poll_load_channel(rx: &Receiver<LoadResult>) -> (Vec<LoadResult>, bool) {
    let mut results = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(result) => {
                let finished = !matches!(result, LoadResult::Progress(_));
                results.push(result);
                if finished {
                    return (results, true);
                }
            }
            Err(TryRecvError::Empty) => return (results, false),
            Err(TryRecvError::Disconnected) => {
                tracing::error!("loader thread exited without a result");
                results.push(LoadResult::Error(
                    "loading stopped unexpectedly".to_string(),
                ));
                return (results, true);
            }
        }
    }
}

/// Main application window.
pub struct BiringApp {
    config: DashboardConfig,
    loader: DataLoader,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,

    // Async CSV loading
    load_rx: Option<Receiver<LoadResult>>,
    is_loading: bool,
}

impl BiringApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: DashboardConfig) -> Self {
        let settings = UserSettings {
            daily_path: Some(config.daily_csv.clone()),
            hourly_path: Some(config.hourly_csv.clone()),
        };

        let mut app = Self {
            chart_viewer: ChartViewer::new(&config.title),
            config,
            loader: DataLoader::new(),
            control_panel: ControlPanel::new(settings),
            load_rx: None,
            is_loading: false,
        };

        if let Some(path) = &app.config.logo {
            match load_logo(path) {
                Ok(image) => {
                    app.control_panel.logo =
                        Some(cc.egui_ctx.load_texture("logo", image, Default::default()));
                }
                Err(e) => tracing::warn!("logo {} not shown: {}", path.display(), e),
            }
        }

        if app.config.daily_csv.exists() && app.config.hourly_csv.exists() {
            app.start_loading();
        } else {
            tracing::warn!(
                "data files not found ({}, {}); pick them in the sidebar",
                app.config.daily_csv.display(),
                app.config.hourly_csv.display()
            );
            app.control_panel.set_status("Select the daily and hourly CSV files");
        }

        app
    }

    /// Pick a CSV file for the daily or hourly table
    fn handle_browse(&mut self, daily: bool) {
        let title = if daily { "Daily data" } else { "Hourly data" };
        if let Some(path) = rfd::FileDialog::new()
            .set_title(title)
            .add_filter("CSV Files", &["csv"])
            .pick_file()
        {
            if daily {
                self.control_panel.settings.daily_path = Some(path);
            } else {
                self.control_panel.settings.hourly_path = Some(path);
            }
        }
    }

    /// Load both CSV files in a background thread
    fn start_loading(&mut self) {
        if self.is_loading {
            return;
        }

        let (Some(daily_path), Some(hourly_path)) = (
            self.control_panel.settings.daily_path.clone(),
            self.control_panel.settings.hourly_path.clone(),
        ) else {
            self.control_panel.set_status("Select both CSV files first");
            return;
        };

        self.chart_viewer.clear();
        self.control_panel.export_enabled = false;
        self.control_panel.busy = true;
        self.control_panel.set_status("Loading CSV files...");
        self.is_loading = true;

        let (tx, rx) = channel();
        self.load_rx = Some(rx);

        thread::spawn(move || {
            Self::run_loading(tx, daily_path, hourly_path);
        });
    }

    /// Read, normalize and validate both tables (called from background thread)
    fn run_loading(tx: Sender<LoadResult>, daily_path: PathBuf, hourly_path: PathBuf) {
        let load = || -> Result<LoadResult, LoaderError> {
            let mut loader = DataLoader::new();

            let _ = tx.send(LoadResult::Progress("Reading daily data...".to_string()));
            loader.load_daily(&daily_path)?;

            let _ = tx.send(LoadResult::Progress("Reading hourly data...".to_string()));
            loader.load_hourly(&hourly_path)?;

            let (Some(daily), Some(hourly)) = (loader.get_daily(), loader.get_hourly()) else {
                return Err(LoaderError::NoData);
            };

            let _ = tx.send(LoadResult::Progress("Checking data integrity...".to_string()));
            let integrity = DataValidator::validate(daily, hourly)?;
            let (start, end) = DataLoader::date_bounds(daily).ok_or(LoaderError::NoData)?;

            Ok(LoadResult::Complete {
                loader: Box::new(loader),
                bounds: DateRange::new(start, end),
                integrity,
            })
        };

        let result = load().unwrap_or_else(|e| {
            tracing::error!("loading failed: {}", e);
            LoadResult::Error(e.to_string())
        });
        let _ = tx.send(result);
    }

    /// Check for CSV loading results
    fn check_load_results(&mut self) {
        let Some(rx) = self.load_rx.take() else {
            return;
        };

        let (results, finished) = poll_load_channel(&rx);
        for result in results {
            match result {
                LoadResult::Progress(status) => {
                    self.control_panel.set_status(&status);
                }
                LoadResult::Complete {
                    loader,
                    bounds,
                    integrity,
                } => {
                    self.loader = *loader;
                    self.control_panel.integrity = Some(integrity);
                    self.control_panel.set_bounds(bounds);

                    let (daily, hourly) = self.loader.get_file_paths();
                    let name = |p: Option<&PathBuf>| {
                        p.and_then(|p| p.file_name())
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_default()
                    };
                    let status = format!("Loaded {} and {}", name(daily), name(hourly));
                    self.control_panel.set_status(&status);

                    self.control_panel.busy = false;
                    self.is_loading = false;
                    self.recompute();
                }
                LoadResult::Error(error) => {
                    self.control_panel.set_status(&format!("Error: {}", error));
                    self.control_panel.busy = false;
                    self.is_loading = false;
                }
            }
        }

        if !finished {
            self.load_rx = Some(rx);
        }
    }

    /// Recompute every section for the selected range
    fn recompute(&mut self) {
        if !self.loader.is_loaded() {
            return;
        }
        let (Some(daily), Some(hourly)) = (self.loader.get_daily(), self.loader.get_hourly())
        else {
            return;
        };
        let Some(range) = self.control_panel.selected_range() else {
            return;
        };

        match StatsCalculator::compute_dashboard(daily, hourly, range) {
            Ok(data) => {
                self.chart_viewer.set_data(data);
                self.control_panel.export_enabled = true;
            }
            Err(e) => {
                tracing::error!("aggregation failed: {}", e);
                self.control_panel.set_status(&format!("Error: {}", e));
                self.control_panel.export_enabled = false;
            }
        }
    }

    /// Render every chart to PNG files in a chosen folder
    fn handle_export(&mut self) {
        let Some(data) = &self.chart_viewer.data else {
            self.control_panel.set_status("No charts to export");
            return;
        };

        let Some(dir) = rfd::FileDialog::new()
            .set_title("Export charts")
            .set_directory(&self.config.export_dir)
            .pick_folder()
        else {
            return; // User cancelled
        };

        match StaticChartRenderer::render_all(data, &dir) {
            Ok(files) => {
                self.control_panel
                    .set_status(&format!("Exported {} charts to {}", files.len(), dir.display()));
                if let Err(e) = open::that(&dir) {
                    tracing::warn!("could not open {}: {}", dir.display(), e);
                }
            }
            Err(e) => {
                tracing::error!("export failed: {}", e);
                self.control_panel.set_status(&format!("Error: {}", e));
            }
        }
    }
}

impl eframe::App for BiringApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for background results
        self.check_load_results();

        // Request repaint while loading
        if self.is_loading {
            ctx.request_repaint();
        }

        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(350.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);

                    match action {
                        ControlPanelAction::BrowseDaily => self.handle_browse(true),
                        ControlPanelAction::BrowseHourly => self.handle_browse(false),
                        ControlPanelAction::Load => self.start_loading(),
                        ControlPanelAction::RangeChanged => self.recompute(),
                        ControlPanelAction::Export => self.handle_export(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Dashboard
        egui::CentralPanel::default().show(ctx, |ui| {
            self.chart_viewer.show(ui);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_loader_keeps_waiting() {
        let (tx, rx) = channel();
        tx.send(LoadResult::Progress("Reading daily data...".to_string()))
            .unwrap();

        let (results, finished) = poll_load_channel(&rx);
        assert!(!finished);
        assert!(matches!(results.as_slice(), [LoadResult::Progress(_)]));
    }

    #[test]
    fn final_result_stops_polling() {
        let (tx, rx) = channel();
        tx.send(LoadResult::Error("bad file".to_string())).unwrap();
        drop(tx);

        let (results, finished) = poll_load_channel(&rx);
        assert!(finished);
        assert!(matches!(results.as_slice(), [LoadResult::Error(e)] if e == "bad file"));
    }

    #[test]
    fn panicked_loader_becomes_an_error() {
        let (tx, rx) = channel::<LoadResult>();
        let handle = thread::spawn(move || {
            let _ = tx.send(LoadResult::Progress("Reading daily data...".to_string()));
            panic!("csv reader blew up");
        });
        assert!(handle.join().is_err());

        let (results, finished) = poll_load_channel(&rx);
        assert!(finished);
        assert!(matches!(
            results.as_slice(),
            [LoadResult::Progress(_), LoadResult::Error(_)]
        ));
    }
}
