//! Chart Viewer Widget
//! Central scrollable dashboard page with every section in display order.

use crate::charts::palette::format_count;
use crate::charts::{ChartPlotter, EMPTY_RANGE_MESSAGE};
use crate::stats::DashboardData;
use egui::{Color32, RichText, ScrollArea};

const SECTION_SPACING: f32 = 20.0;

/// Caption for sections that ignore the date range.
const FULL_DATASET_NOTE: &str = "Computed over the full dataset; does not follow the date range.";

/// Dashboard sections in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Summary,
    Trend,
    Season,
    HourlyPattern,
    HourlyAverage,
    Correlation,
    Holiday,
    Rfm,
}

impl Section {
    pub const ALL: [Section; 8] = [
        Section::Summary,
        Section::Trend,
        Section::Season,
        Section::HourlyPattern,
        Section::HourlyAverage,
        Section::Correlation,
        Section::Holiday,
        Section::Rfm,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Section::Summary => "Daily Bike-Sharing Summary",
            Section::Trend => "Daily Bike-Sharing Trend",
            Section::Season => "Total Bike-Sharing by Season",
            Section::HourlyPattern => "Hourly Bicycle Usage Pattern (Casual vs Registered)",
            Section::HourlyAverage => "Average Bike-Sharing by Hour",
            Section::Correlation => "Correlation Matrix - Factors Influencing Bike-Sharing",
            Section::Holiday => "Holiday Impact on Bike-Sharing",
            Section::Rfm => "RFM Analysis: Customer Bike-Sharing Behavior",
        }
    }

    /// Whether the section is computed over the selected date range.
    pub fn follows_range(&self) -> bool {
        !matches!(self, Section::Correlation | Section::Holiday)
    }
}

/// Scrollable dashboard page.
pub struct ChartViewer {
    pub title: String,
    pub data: Option<DashboardData>,
}

impl ChartViewer {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            data: None,
        }
    }

    /// Clear all charts
    pub fn clear(&mut self) {
        self.data = None;
    }

    pub fn set_data(&mut self, data: DashboardData) {
        self.data = Some(data);
    }

    fn subheader(ui: &mut egui::Ui, text: &str) {
        ui.add_space(SECTION_SPACING);
        ui.label(RichText::new(text).size(18.0).strong());
        ui.add_space(6.0);
    }

    fn full_dataset_note(ui: &mut egui::Ui) {
        ui.label(RichText::new(FULL_DATASET_NOTE).size(11.0).color(Color32::GRAY));
    }

    fn metric(ui: &mut egui::Ui, label: &str, value: i64) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(8.0)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.label(RichText::new(label).size(13.0).color(Color32::GRAY));
                ui.label(RichText::new(format_count(value)).size(28.0).strong());
            });
    }

    fn draw_section(ui: &mut egui::Ui, section: Section, data: &DashboardData) {
        match section {
            Section::Summary => {
                if data.is_range_empty() {
                    ui.label(RichText::new(EMPTY_RANGE_MESSAGE).italics().color(Color32::GRAY));
                }
                ui.columns(3, |cols| {
                    Self::metric(&mut cols[0], "Total Casual Users", data.summary.total_casual);
                    Self::metric(
                        &mut cols[1],
                        "Total Registered Users",
                        data.summary.total_registered,
                    );
                    Self::metric(&mut cols[2], "Total Bike-Sharing", data.summary.total_rentals);
                });
            }
            Section::Trend => ChartPlotter::draw_trend_chart(ui, &data.trend),
            Section::Season => ChartPlotter::draw_category_bars(
                ui,
                "season_totals",
                &data.seasons,
                "Season",
                "Total Rentals",
            ),
            Section::HourlyPattern => ChartPlotter::draw_hourly_pattern(ui, &data.hourly),
            Section::HourlyAverage => ChartPlotter::draw_hourly_average(ui, &data.hourly),
            Section::Correlation => ChartPlotter::draw_correlation_heatmap(ui, &data.correlation),
            Section::Holiday => {
                ChartPlotter::draw_holiday_chart(ui, &data.holidays);
                ui.add_space(6.0);
                ChartPlotter::draw_holiday_table(ui, &data.holidays);
            }
            Section::Rfm => ChartPlotter::draw_rfm_charts(ui, &data.rfm),
        }
    }

    /// Draw the dashboard page
    pub fn show(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.label(RichText::new(format!("🚲 {} 🚲", self.title)).size(26.0).strong());
        });
        ui.separator();

        let Some(data) = &self.data else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No Data").size(20.0));
            });
            return;
        };

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.label(
                    RichText::new(format!(
                        "{} to {}",
                        data.range.start.format("%Y-%m-%d"),
                        data.range.end.format("%Y-%m-%d")
                    ))
                    .color(Color32::GRAY),
                );

                for section in Section::ALL {
                    Self::subheader(ui, section.title());
                    if !section.follows_range() {
                        Self::full_dataset_note(ui);
                    }
                    Self::draw_section(ui, section, data);
                }

                ui.add_space(SECTION_SPACING * 2.0);
                ui.separator();
                ui.label(
                    RichText::new("Copyright (c) BIRING : Bike Sharing Dashboard 2025")
                        .size(11.0)
                        .color(Color32::GRAY),
                );
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_sections_carry_full_dataset_note() {
        let fixed: Vec<Section> = Section::ALL
            .into_iter()
            .filter(|s| !s.follows_range())
            .collect();
        assert_eq!(fixed, [Section::Correlation, Section::Holiday]);
    }

    #[test]
    fn sections_keep_page_order() {
        assert_eq!(Section::ALL[0].title(), "Daily Bike-Sharing Summary");
        assert_eq!(Section::ALL[5], Section::Correlation);
        assert_eq!(Section::ALL[6], Section::Holiday);
        assert_eq!(Section::ALL[7].title(), "RFM Analysis: Customer Bike-Sharing Behavior");
    }
}
