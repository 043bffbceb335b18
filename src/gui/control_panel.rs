//! Control Panel Widget
//! Left sidebar with data source selection, date range picker and export.

use crate::data::{DataLoader, DateRange, IntegrityReport};
use chrono::Datelike;
use egui::{Color32, ColorImage, RichText, TextureHandle};
use std::path::{Path, PathBuf};

const LOGO_WIDTH: f32 = 200.0;

/// Decode a logo file into an egui image.
pub fn load_logo(path: &Path) -> Result<ColorImage, image::ImageError> {
    let rgba = image::open(path)?.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

/// User settings for the dashboard
#[derive(Default, Clone)]
pub struct UserSettings {
    pub daily_path: Option<PathBuf>,
    pub hourly_path: Option<PathBuf>,
}

/// Left side control panel with file selection and the date range picker.
pub struct ControlPanel {
    pub settings: UserSettings,
    /// Earliest and latest date in the daily table
    pub bounds: Option<DateRange>,
    /// Start and end of the selection, as day offsets from `bounds.start`
    start_offset: i32,
    end_offset: i32,
    pub integrity: Option<IntegrityReport>,
    pub status: String,
    pub busy: bool,
    pub export_enabled: bool,
    pub logo: Option<TextureHandle>,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            settings: UserSettings::default(),
            bounds: None,
            start_offset: 0,
            end_offset: 0,
            integrity: None,
            status: "Ready".to_string(),
            busy: false,
            export_enabled: false,
            logo: None,
        }
    }
}

impl ControlPanel {
    pub fn new(settings: UserSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Set the selectable bounds and select the full range.
    pub fn set_bounds(&mut self, bounds: DateRange) {
        self.bounds = Some(bounds);
        self.start_offset = 0;
        self.end_offset = Self::span(bounds);
    }

    fn span(bounds: DateRange) -> i32 {
        bounds.end.num_days_from_ce() - bounds.start.num_days_from_ce()
    }

    fn offset_to_date(bounds: DateRange, offset: i32) -> String {
        DataLoader::day_to_date(bounds.start.num_days_from_ce() + offset)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    /// The currently selected date range.
    pub fn selected_range(&self) -> Option<DateRange> {
        let bounds = self.bounds?;
        let base = bounds.start.num_days_from_ce();
        let start = DataLoader::day_to_date(base + self.start_offset)?;
        let end = DataLoader::day_to_date(base + self.end_offset)?;
        Some(DateRange::new(start, end).clamp_to(bounds))
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        // Title
        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            match &self.logo {
                Some(texture) => {
                    ui.add(
                        egui::Image::from_texture(egui::load::SizedTexture::from_handle(texture))
                            .max_width(LOGO_WIDTH),
                    );
                }
                None => {
                    ui.label(
                        RichText::new("🚲 BIRING")
                            .size(22.0)
                            .color(Color32::from_rgb(144, 238, 144)),
                    );
                }
            }
            ui.label(
                RichText::new("Bike Sharing Dashboard")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Data Source Section =====
        ui.label(RichText::new("📁 Data Source").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                for (label, path, browse) in [
                    ("Daily:", &self.settings.daily_path, ControlPanelAction::BrowseDaily),
                    ("Hourly:", &self.settings.hourly_path, ControlPanelAction::BrowseHourly),
                ] {
                    ui.horizontal(|ui| {
                        ui.label(label);
                        let name = path
                            .as_ref()
                            .and_then(|p| p.file_name())
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_else(|| "No file selected".to_string());
                        let color = if path.is_some() {
                            ui.visuals().text_color()
                        } else {
                            Color32::GRAY
                        };
                        ui.label(RichText::new(name).size(12.0).color(color));

                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.add_enabled(!self.busy, egui::Button::new("📂 Browse")).clicked() {
                                action = browse.clone();
                            }
                        });
                    });
                }

                ui.add_space(4.0);
                ui.vertical_centered(|ui| {
                    let ready = self.settings.daily_path.is_some() && self.settings.hourly_path.is_some();
                    if ui
                        .add_enabled(ready && !self.busy, egui::Button::new("⟳ Load Data"))
                        .clicked()
                    {
                        action = ControlPanelAction::Load;
                    }
                });
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Date Range Section =====
        ui.label(RichText::new("📅 Date Range").size(14.0).strong());
        ui.add_space(5.0);

        match self.bounds {
            Some(bounds) => {
                let span = Self::span(bounds);
                let before = (self.start_offset, self.end_offset);

                ui.horizontal(|ui| {
                    ui.add_sized([45.0, 20.0], egui::Label::new("Start:"));
                    ui.add(
                        egui::Slider::new(&mut self.start_offset, 0..=span)
                            .custom_formatter(move |v, _| Self::offset_to_date(bounds, v as i32)),
                    );
                });
                ui.horizontal(|ui| {
                    ui.add_sized([45.0, 20.0], egui::Label::new("End:"));
                    ui.add(
                        egui::Slider::new(&mut self.end_offset, 0..=span)
                            .custom_formatter(move |v, _| Self::offset_to_date(bounds, v as i32)),
                    );
                });

                // Keep start <= end, moving whichever end was not dragged
                if self.start_offset > self.end_offset {
                    if self.start_offset != before.0 {
                        self.end_offset = self.start_offset;
                    } else {
                        self.start_offset = self.end_offset;
                    }
                }

                ui.add_space(4.0);
                ui.horizontal(|ui| {
                    if let Some(range) = self.selected_range() {
                        ui.label(
                            RichText::new(format!("{} day(s) selected", range.num_days()))
                                .size(11.0)
                                .color(Color32::GRAY),
                        );
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("Full Range").clicked() {
                            self.set_bounds(bounds);
                        }
                    });
                });

                if before != (self.start_offset, self.end_offset) {
                    action = ControlPanelAction::RangeChanged;
                }
            }
            None => {
                ui.label(RichText::new("Load data to pick a range").color(Color32::GRAY));
            }
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Data Integrity Section =====
        if let Some(report) = &self.integrity {
            ui.label(RichText::new("🔎 Data Integrity").size(14.0).strong());
            ui.add_space(5.0);
            ui.label(
                RichText::new(format!(
                    "{} daily rows, {} hourly rows",
                    report.daily_rows, report.hourly_rows
                ))
                .size(11.0),
            );
            if report.is_clean() {
                ui.label(
                    RichText::new("✓ All checks passed")
                        .size(11.0)
                        .color(Color32::from_rgb(40, 167, 69)),
                );
            } else {
                for finding in report.findings() {
                    ui.label(
                        RichText::new(format!("⚠ {}", finding))
                            .size(11.0)
                            .color(Color32::from_rgb(243, 156, 18)),
                    );
                }
            }

            ui.add_space(15.0);
            ui.separator();
            ui.add_space(10.0);
        }

        // ===== Export =====
        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(self.export_enabled && !self.busy, |ui| {
                let button = egui::Button::new(RichText::new("🖼 Export Charts").size(14.0))
                    .min_size(egui::vec2(150.0, 30.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::Export;
                }
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Status =====
        ui.horizontal(|ui| {
            if self.busy {
                ui.spinner();
            }
            let status_color = if self.status.contains("Error") {
                Color32::from_rgb(220, 53, 69)
            } else if self.status.contains("Loaded") || self.status.contains("Exported") {
                Color32::from_rgb(40, 167, 69)
            } else {
                Color32::GRAY
            };
            ui.label(RichText::new(&self.status).size(11.0).color(status_color));
        });

        action
    }

    /// Set status line
    pub fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    BrowseDaily,
    BrowseHourly,
    Load,
    RangeChanged,
    Export,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bounds() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2011, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2012, 12, 31).unwrap(),
        )
    }

    #[test]
    fn no_range_before_load() {
        assert_eq!(ControlPanel::default().selected_range(), None);
    }

    #[test]
    fn bounds_select_full_range() {
        let mut panel = ControlPanel::default();
        panel.set_bounds(bounds());
        assert_eq!(panel.selected_range(), Some(bounds()));
    }

    #[test]
    fn offsets_map_to_dates() {
        let mut panel = ControlPanel::default();
        panel.set_bounds(bounds());
        panel.start_offset = 31;
        panel.end_offset = 58;

        let range = panel.selected_range().unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2011, 2, 1).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2011, 2, 28).unwrap());
        assert_eq!(ControlPanel::offset_to_date(bounds(), 0), "2011-01-01");
    }

    #[test]
    fn logo_decodes_to_color_image() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("logo.png");
        image::RgbaImage::from_pixel(4, 2, image::Rgba([144, 238, 144, 255]))
            .save(&path)
            .unwrap();

        let logo = load_logo(&path).unwrap();
        assert_eq!(logo.size, [4, 2]);
        assert_eq!(logo.pixels[0], Color32::from_rgb(144, 238, 144));
    }

    #[test]
    fn missing_logo_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_logo(&tmp.path().join("absent.png")).is_err());
    }
}
