//! Chart Plotter Module
//! Draws the interactive dashboard charts using egui_plot and the egui painter.

use crate::charts::palette::{self, format_correlation};
use crate::data::DataLoader;
use crate::stats::{CategoryTotal, CorrelationMatrix, HolidayStats, HourlyMean, RfmBreakdown, TrendPoint};
use chrono::Datelike;
use egui::{Align2, Color32, FontId, RichText, Stroke};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoint, PlotPoints, Points, Text};

pub const CHART_HEIGHT: f32 = 320.0;
const HEATMAP_MAX_CELL: f32 = 56.0;
const HEATMAP_LABEL_WIDTH: f32 = 120.0;

/// Message drawn in place of a chart with nothing to show
pub const EMPTY_RANGE_MESSAGE: &str = "No data in the selected range";

fn rgb((r, g, b): (u8, u8, u8)) -> Color32 {
    Color32::from_rgb(r, g, b)
}

pub fn highlight_color() -> Color32 {
    rgb(palette::HIGHLIGHT_RGB)
}

pub fn casual_color() -> Color32 {
    rgb(palette::CASUAL_RGB)
}

pub fn registered_color() -> Color32 {
    rgb(palette::REGISTERED_RGB)
}

/// Label for a categorical x position, empty between categories.
fn category_label(labels: &[String], value: f64) -> String {
    let idx = value.round();
    if (value - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

/// Creates the dashboard charts.
pub struct ChartPlotter;

impl ChartPlotter {
    fn empty_placeholder(ui: &mut egui::Ui) {
        ui.add_space(8.0);
        ui.label(RichText::new(EMPTY_RANGE_MESSAGE).italics().color(Color32::GRAY));
        ui.add_space(8.0);
    }

    /// Daily total rentals as a line with markers.
    pub fn draw_trend_chart(ui: &mut egui::Ui, trend: &[TrendPoint]) {
        let Some(first) = trend.first() else {
            Self::empty_placeholder(ui);
            return;
        };
        let first_day = first.date.num_days_from_ce();

        let points: Vec<[f64; 2]> = trend
            .iter()
            .map(|p| [(p.date.num_days_from_ce() - first_day) as f64, p.total_rentals])
            .collect();

        Plot::new("daily_trend")
            .height(CHART_HEIGHT)
            .allow_scroll(false)
            .include_y(0.0)
            .x_axis_label("Date")
            .y_axis_label("Total Rentals")
            .x_axis_formatter(move |mark, _range| {
                if mark.value < 0.0 {
                    return String::new();
                }
                DataLoader::day_to_date(first_day + mark.value.round() as i32)
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default()
            })
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(PlotPoints::from_iter(points.iter().copied()))
                        .color(highlight_color())
                        .width(2.0)
                        .name("Total Rentals"),
                );
                plot_ui.points(
                    Points::new(PlotPoints::from_iter(points.iter().copied()))
                        .radius(3.0)
                        .color(highlight_color()),
                );
            });
    }

    /// Bars per category; the maximum is highlighted, the rest muted.
    pub fn draw_category_bars(
        ui: &mut egui::Ui,
        id: &str,
        totals: &[CategoryTotal],
        x_label: &str,
        y_label: &str,
    ) {
        if totals.is_empty() {
            Self::empty_placeholder(ui);
            return;
        }

        let labels: Vec<String> = totals.iter().map(|t| t.label.clone()).collect();
        let bars: Vec<Bar> = totals
            .iter()
            .enumerate()
            .map(|(i, t)| {
                Bar::new(i as f64, t.value)
                    .width(0.6)
                    .fill(rgb(palette::bar_rgb(t.is_max)))
                    .name(&t.label)
            })
            .collect();

        Plot::new(id)
            .height(CHART_HEIGHT)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .include_y(0.0)
            .x_axis_label(x_label)
            .y_axis_label(y_label)
            .x_axis_formatter(move |mark, _range| category_label(&labels, mark.value))
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars));
            });
    }

    /// Mean casual and registered users per hour as two lines.
    pub fn draw_hourly_pattern(ui: &mut egui::Ui, hourly: &[HourlyMean]) {
        if hourly.is_empty() {
            Self::empty_placeholder(ui);
            return;
        }

        let casual: Vec<[f64; 2]> = hourly.iter().map(|h| [h.hour as f64, h.casual]).collect();
        let registered: Vec<[f64; 2]> = hourly
            .iter()
            .map(|h| [h.hour as f64, h.registered])
            .collect();

        Plot::new("hourly_pattern")
            .height(CHART_HEIGHT)
            .legend(Legend::default())
            .allow_scroll(false)
            .include_x(0.0)
            .include_x(23.0)
            .include_y(0.0)
            .x_axis_label("Hour (0-23)")
            .y_axis_label("Average Users")
            .show(ui, |plot_ui| {
                for (name, series, color) in [
                    ("Casual", &casual, casual_color()),
                    ("Registered", &registered, registered_color()),
                ] {
                    plot_ui.line(
                        Line::new(PlotPoints::from_iter(series.iter().copied()))
                            .color(color)
                            .width(2.0)
                            .name(name),
                    );
                    plot_ui.points(
                        Points::new(PlotPoints::from_iter(series.iter().copied()))
                            .radius(3.0)
                            .color(color)
                            .name(name),
                    );
                }
            });
    }

    /// Mean total rentals per hour, peak hour highlighted.
    pub fn draw_hourly_average(ui: &mut egui::Ui, hourly: &[HourlyMean]) {
        if hourly.is_empty() {
            Self::empty_placeholder(ui);
            return;
        }

        let bars: Vec<Bar> = hourly
            .iter()
            .map(|h| {
                Bar::new(h.hour as f64, h.total)
                    .width(0.8)
                    .fill(rgb(palette::bar_rgb(h.is_max)))
                    .name(format!("{:02}:00", h.hour))
            })
            .collect();

        Plot::new("hourly_average")
            .height(CHART_HEIGHT)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .include_x(-0.5)
            .include_x(23.5)
            .include_y(0.0)
            .x_axis_label("Hour (0-23)")
            .y_axis_label("Average Total Rentals")
            .x_grid_spacer(|_input| {
                (0..24)
                    .map(|h| egui_plot::GridMark {
                        value: h as f64,
                        step_size: 1.0,
                    })
                    .collect()
            })
            .x_axis_formatter(|mark, _range| {
                let hour = mark.value.round();
                if (mark.value - hour).abs() < 1e-6 && (0.0..=23.0).contains(&hour) {
                    format!("{}", hour as i64)
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars));
            });
    }

    /// Annotated correlation heatmap with a color scale bar.
    pub fn draw_correlation_heatmap(ui: &mut egui::Ui, matrix: &CorrelationMatrix) {
        if matrix.is_empty() {
            ui.label(RichText::new("No numeric columns to correlate").italics());
            return;
        }

        let n = matrix.len();
        let scale_width = 60.0;
        let avail = ui.available_width() - HEATMAP_LABEL_WIDTH - scale_width;
        let cell = (avail / n as f32).clamp(18.0, HEATMAP_MAX_CELL);
        let grid = cell * n as f32;
        let top_labels = HEATMAP_LABEL_WIDTH;

        let (rect, _) = ui.allocate_exact_size(
            egui::vec2(HEATMAP_LABEL_WIDTH + grid + scale_width, top_labels + grid),
            egui::Sense::hover(),
        );
        let painter = ui.painter_at(rect);
        let text_color = ui.visuals().text_color();
        let origin = rect.min + egui::vec2(HEATMAP_LABEL_WIDTH, top_labels);

        for (i, name) in matrix.columns.iter().enumerate() {
            // Row label
            painter.text(
                egui::pos2(origin.x - 6.0, origin.y + (i as f32 + 0.5) * cell),
                Align2::RIGHT_CENTER,
                name,
                FontId::proportional(12.0),
                text_color,
            );

            // Column label, rotated to read bottom-up
            let galley = painter.layout_no_wrap(name.clone(), FontId::proportional(12.0), text_color);
            let pos = egui::pos2(
                origin.x + (i as f32 + 0.5) * cell - galley.size().y / 2.0,
                origin.y - 6.0,
            );
            painter.add(
                egui::epaint::TextShape::new(pos, galley, text_color)
                    .with_angle(-std::f32::consts::FRAC_PI_2),
            );

            for j in 0..n {
                let value = matrix.get(i, j);
                let min = origin + egui::vec2(j as f32 * cell, i as f32 * cell);
                let cell_rect = egui::Rect::from_min_size(min, egui::vec2(cell, cell));
                painter.rect_filled(cell_rect, 0.0, rgb(palette::coolwarm_rgb(value)));
                painter.rect_stroke(cell_rect, 0.0, Stroke::new(0.5, Color32::WHITE));

                if cell >= 28.0 {
                    let annot = if palette::annotation_is_dark(value) {
                        Color32::BLACK
                    } else {
                        Color32::WHITE
                    };
                    painter.text(
                        cell_rect.center(),
                        Align2::CENTER_CENTER,
                        format_correlation(value),
                        FontId::proportional(11.0),
                        annot,
                    );
                }
            }
        }

        // Color scale from +1 (top) to -1 (bottom)
        let steps = 40;
        let bar_x = origin.x + grid + 12.0;
        let step_h = grid / steps as f32;
        for s in 0..steps {
            let value = 1.0 - 2.0 * (s as f64 + 0.5) / steps as f64;
            let r = egui::Rect::from_min_size(
                egui::pos2(bar_x, origin.y + s as f32 * step_h),
                egui::vec2(14.0, step_h + 0.5),
            );
            painter.rect_filled(r, 0.0, rgb(palette::coolwarm_rgb(value)));
        }
        for (label, y) in [("1.0", origin.y), ("0.0", origin.y + grid / 2.0), ("-1.0", origin.y + grid)] {
            painter.text(
                egui::pos2(bar_x + 18.0, y),
                Align2::LEFT_CENTER,
                label,
                FontId::proportional(11.0),
                text_color,
            );
        }
    }

    /// Mean daily rentals for holiday vs non-holiday days.
    pub fn draw_holiday_chart(ui: &mut egui::Ui, stats: &[HolidayStats]) {
        if stats.is_empty() {
            Self::empty_placeholder(ui);
            return;
        }

        let labels: Vec<String> = stats.iter().map(|s| s.label.clone()).collect();
        let bars: Vec<Bar> = stats
            .iter()
            .enumerate()
            .map(|(x, s)| {
                Bar::new(x as f64, s.mean)
                    .width(0.6)
                    .fill(rgb(palette::bar_rgb(s.holiday == 0)))
                    .name(format!("{} (n={})", s.label, s.count))
            })
            .collect();

        Plot::new("holiday_impact")
            .height(CHART_HEIGHT)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .include_y(0.0)
            .x_axis_label("Day Type")
            .y_axis_label("Average Rentals")
            .x_axis_formatter(move |mark, _range| category_label(&labels, mark.value))
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars));
            });
    }

    /// Holiday statistics table (mean, sum, std, count)
    pub fn draw_holiday_table(ui: &mut egui::Ui, stats: &[HolidayStats]) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                egui::Grid::new(ui.make_persistent_id("holiday_stats_table"))
                    .striped(true)
                    .min_col_width(80.0)
                    .spacing([8.0, 4.0])
                    .show(ui, |ui| {
                        for header in ["Day Type", "Days", "Mean", "Sum", "Std"] {
                            ui.label(RichText::new(header).strong().size(11.0));
                        }
                        ui.end_row();

                        for s in stats {
                            ui.label(RichText::new(&s.label).size(11.0));
                            ui.label(RichText::new(s.count.to_string()).size(11.0));
                            ui.label(RichText::new(format!("{:.1}", s.mean)).size(11.0));
                            ui.label(
                                RichText::new(palette::format_count(s.sum.round() as i64)).size(11.0),
                            );
                            if s.std.is_nan() {
                                ui.label(RichText::new("-").size(11.0));
                            } else {
                                ui.label(RichText::new(format!("{:.1}", s.std)).size(11.0));
                            }
                            ui.end_row();
                        }
                    });
            });
    }

    /// Recency, frequency and monetary bars side by side.
    pub fn draw_rfm_charts(ui: &mut egui::Ui, rfm: &RfmBreakdown) {
        let labels: Vec<String> = rfm
            .segments()
            .iter()
            .map(|s| s.segment.label().to_string())
            .collect();
        let width = (ui.available_width() - 20.0) / 3.0;

        let recency: Vec<(f64, Option<String>)> = rfm
            .segments()
            .iter()
            .map(|s| match &s.recency {
                Some(r) => (r.rentals as f64, Some(r.last_date.format("%Y-%m-%d").to_string())),
                None => (0.0, None),
            })
            .collect();
        let frequency: Vec<f64> = rfm.segments().iter().map(|s| s.frequency).collect();
        let monetary: Vec<f64> = rfm.segments().iter().map(|s| s.monetary as f64).collect();

        ui.horizontal(|ui| {
            ui.vertical(|ui| {
                ui.set_width(width);
                ui.label(RichText::new("Recency: Last Date & Total Rentals").strong());
                Self::draw_rfm_panel(ui, "rfm_recency", &labels, &recency, "Total Rentals");
            });
            ui.vertical(|ui| {
                ui.set_width(width);
                ui.label(RichText::new("Frequency: Average Rentals per Day").strong());
                let values: Vec<(f64, Option<String>)> =
                    frequency.iter().map(|&v| (v, None)).collect();
                Self::draw_rfm_panel(ui, "rfm_frequency", &labels, &values, "Average Rentals");
            });
            ui.vertical(|ui| {
                ui.set_width(width);
                ui.label(RichText::new("Monetary: Total Rentals").strong());
                let values: Vec<(f64, Option<String>)> =
                    monetary.iter().map(|&v| (v, None)).collect();
                Self::draw_rfm_panel(ui, "rfm_monetary", &labels, &values, "Total Rentals");
            });
        });
    }

    /// One RFM panel; bars may carry a text annotation above them.
    fn draw_rfm_panel(
        ui: &mut egui::Ui,
        id: &str,
        labels: &[String],
        values: &[(f64, Option<String>)],
        y_label: &str,
    ) {
        let max_height = values
            .iter()
            .map(|(v, _)| *v)
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max);
        let annotated = values.iter().any(|(_, note)| note.is_some());

        let bars: Vec<Bar> = values
            .iter()
            .enumerate()
            .map(|(i, (v, _))| {
                Bar::new(i as f64, if v.is_finite() { *v } else { 0.0 })
                    .width(0.6)
                    .fill(highlight_color())
                    .name(&labels[i])
            })
            .collect();

        let labels = labels.to_vec();
        let mut plot = Plot::new(id)
            .height(CHART_HEIGHT - 40.0)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .include_y(0.0)
            .y_axis_label(y_label)
            .x_axis_formatter(move |mark, _range| category_label(&labels, mark.value));
        if annotated && max_height > 0.0 {
            plot = plot.include_y(max_height * 1.2);
        }

        plot.show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars));
            for (i, (v, note)) in values.iter().enumerate() {
                let text = match note {
                    Some(note) => note.clone(),
                    None if annotated => "no rentals".to_string(),
                    None => continue,
                };
                plot_ui.text(
                    Text::new(
                        PlotPoint::new(i as f64, v.max(0.0) + max_height * 0.05),
                        RichText::new(text).size(11.0),
                    )
                    .anchor(Align2::CENTER_BOTTOM),
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_only_on_integer_positions() {
        let labels = vec!["Spring".to_string(), "Summer".to_string()];
        assert_eq!(category_label(&labels, 0.0), "Spring");
        assert_eq!(category_label(&labels, 1.0), "Summer");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, 2.0), "");
        assert_eq!(category_label(&labels, -1.0), "");
    }
}
