//! Static Chart Renderer
//! Renders every dashboard section to a PNG file with plotters.
//!
//! Each chart is drawn into an in-memory RGB buffer and encoded with `image`:
//! 1. trend.png - daily rentals line
//! 2. season.png - total rentals by season
//! 3. hourly_pattern.png - casual vs registered per hour
//! 4. hourly_average.png - average total rentals per hour
//! 5. correlation.png - annotated correlation heatmap
//! 6. holiday.png - holiday vs non-holiday mean rentals
//! 7. rfm.png - recency / frequency / monetary panels

use crate::charts::palette::{self, format_correlation};
use crate::data::DataLoader;
use crate::stats::{CorrelationMatrix, DashboardData, HourlyMean, RfmBreakdown, TrendPoint};
use chrono::Datelike;
use image::RgbImage;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::{Path, PathBuf};
use thiserror::Error;

type DrawResult = Result<(), Box<dyn std::error::Error>>;

const FONT: &str = "sans-serif";
const WIDE: (u32, u32) = (1200, 600);
const MEDIUM: (u32, u32) = (1000, 600);
const SQUARE: (u32, u32) = (1000, 900);
const TRIPLE: (u32, u32) = (1800, 600);

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("Drawing failed: {0}")]
    Draw(String),
    #[error("Pixel buffer does not match image size")]
    Buffer,
}

fn rgb((r, g, b): (u8, u8, u8)) -> RGBColor {
    RGBColor(r, g, b)
}

/// Date label for an x offset (in days) from the first trend point.
fn date_label(first_day: i32, offset: f64) -> String {
    if offset < 0.0 {
        return String::new();
    }
    DataLoader::day_to_date(first_day + offset.round() as i32)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Upper y bound leaving headroom above the tallest value.
fn axis_max(values: impl IntoIterator<Item = f64>, headroom: f64) -> f64 {
    let max = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max);
    if max > 0.0 {
        max * headroom
    } else {
        1.0
    }
}

/// A categorical bar chart panel.
struct BarPanel<'a> {
    title: &'a str,
    x_desc: &'a str,
    y_desc: &'a str,
    labels: Vec<String>,
    values: Vec<f64>,
    colors: Vec<RGBColor>,
    notes: Vec<Option<String>>,
}

/// Renders dashboard charts to PNG files.
pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render every section into `dir`, returning the written files.
    pub fn render_all(data: &DashboardData, dir: &Path) -> Result<Vec<PathBuf>, RenderError> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::new();

        let mut save = |name: &str,
                        size: (u32, u32),
                        draw: &dyn Fn(&DrawingArea<BitMapBackend<'_>, Shift>) -> DrawResult|
         -> Result<(), RenderError> {
            let path = dir.join(name);
            Self::render_png(&path, size, draw)?;
            tracing::debug!("rendered {}", path.display());
            written.push(path);
            Ok(())
        };

        save("trend.png", WIDE, &|root| Self::draw_trend(root, &data.trend))?;
        save("season.png", MEDIUM, &|root| {
            Self::draw_bars(
                root,
                &BarPanel {
                    title: "Total Bike-Sharing by Season",
                    x_desc: "Season",
                    y_desc: "Total Rentals",
                    labels: data.seasons.iter().map(|s| s.label.clone()).collect(),
                    values: data.seasons.iter().map(|s| s.value).collect(),
                    colors: data
                        .seasons
                        .iter()
                        .map(|s| rgb(palette::bar_rgb(s.is_max)))
                        .collect(),
                    notes: Vec::new(),
                },
            )
        })?;
        save("hourly_pattern.png", WIDE, &|root| {
            Self::draw_hourly_pattern(root, &data.hourly)
        })?;
        save("hourly_average.png", WIDE, &|root| {
            Self::draw_bars(
                root,
                &BarPanel {
                    title: "Average Bike-Sharing by Hour",
                    x_desc: "Hour (0-23)",
                    y_desc: "Average Total Rentals",
                    labels: data.hourly.iter().map(|h| h.hour.to_string()).collect(),
                    values: data.hourly.iter().map(|h| h.total).collect(),
                    colors: data
                        .hourly
                        .iter()
                        .map(|h| rgb(palette::bar_rgb(h.is_max)))
                        .collect(),
                    notes: Vec::new(),
                },
            )
        })?;
        save("correlation.png", SQUARE, &|root| {
            Self::draw_heatmap(root, &data.correlation)
        })?;
        save("holiday.png", MEDIUM, &|root| {
            Self::draw_bars(
                root,
                &BarPanel {
                    title: "Holiday Impact on Bike-Sharing",
                    x_desc: "Day Type",
                    y_desc: "Average Rentals",
                    labels: data.holidays.iter().map(|h| h.label.clone()).collect(),
                    values: data.holidays.iter().map(|h| h.mean).collect(),
                    colors: data
                        .holidays
                        .iter()
                        .map(|h| rgb(palette::bar_rgb(h.holiday == 0)))
                        .collect(),
                    notes: Vec::new(),
                },
            )
        })?;
        save("rfm.png", TRIPLE, &|root| Self::draw_rfm(root, &data.rfm))?;

        tracing::info!("exported {} charts to {}", written.len(), dir.display());
        Ok(written)
    }

    /// Draw into an RGB buffer and write it as PNG.
    fn render_png(
        path: &Path,
        (width, height): (u32, u32),
        draw: &dyn Fn(&DrawingArea<BitMapBackend<'_>, Shift>) -> DrawResult,
    ) -> Result<(), RenderError> {
        let mut buffer = vec![0u8; (width * height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| RenderError::Draw(e.to_string()))?;
            draw(&root).map_err(|e| RenderError::Draw(e.to_string()))?;
            root.present()
                .map_err(|e| RenderError::Draw(e.to_string()))?;
        }

        let image = RgbImage::from_raw(width, height, buffer).ok_or(RenderError::Buffer)?;
        image.save(path)?;
        Ok(())
    }

    fn draw_empty(root: &DrawingArea<BitMapBackend<'_>, Shift>, title: &str) -> DrawResult {
        let (w, h) = root.dim_in_pixel();
        let centered = TextStyle::from((FONT, 24).into_font()).pos(Pos::new(HPos::Center, VPos::Center));
        root.draw(&Text::new(title.to_string(), (w as i32 / 2, 40), centered.clone()))?;
        root.draw(&Text::new(
            crate::charts::EMPTY_RANGE_MESSAGE.to_string(),
            (w as i32 / 2, h as i32 / 2),
            centered.color(&RGBColor(120, 120, 120)),
        ))?;
        Ok(())
    }

    fn draw_trend(root: &DrawingArea<BitMapBackend<'_>, Shift>, trend: &[TrendPoint]) -> DrawResult {
        let title = "Daily Bike-Sharing Trend";
        let (Some(first), Some(last)) = (trend.first(), trend.last()) else {
            return Self::draw_empty(root, title);
        };

        let first_day = first.date.num_days_from_ce();
        let span = (last.date.num_days_from_ce() - first_day).max(1) as f64;
        let y_max = axis_max(trend.iter().map(|p| p.total_rentals), 1.1);
        let color = rgb(palette::HIGHLIGHT_RGB);

        let points: Vec<(f64, f64)> = trend
            .iter()
            .map(|p| ((p.date.num_days_from_ce() - first_day) as f64, p.total_rentals))
            .collect();

        let mut chart = ChartBuilder::on(root)
            .caption(title, (FONT, 28))
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(80)
            .build_cartesian_2d(0f64..span, 0f64..y_max)?;

        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc("Total Rentals")
            .x_labels(8)
            .x_label_formatter(&|x| date_label(first_day, *x))
            .y_label_formatter(&|y| format!("{:.0}", y))
            .draw()?;

        chart.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?;
        chart.draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
        )?;

        Ok(())
    }

    fn draw_bars(root: &DrawingArea<BitMapBackend<'_>, Shift>, panel: &BarPanel<'_>) -> DrawResult {
        if panel.values.is_empty() {
            return Self::draw_empty(root, panel.title);
        }

        let n = panel.values.len() as u32;
        let annotated = panel.notes.iter().any(Option::is_some);
        let raw_max = axis_max(panel.values.iter().copied(), 1.0);
        let y_max = if annotated { raw_max * 1.2 } else { raw_max * 1.1 };

        let mut chart = ChartBuilder::on(root)
            .caption(panel.title, (FONT, 24))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(80)
            .build_cartesian_2d((0u32..n).into_segmented(), 0f64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(panel.x_desc)
            .y_desc(panel.y_desc)
            .x_label_formatter(&|v| match v {
                SegmentValue::CenterOf(i) => {
                    panel.labels.get(*i as usize).cloned().unwrap_or_default()
                }
                _ => String::new(),
            })
            .y_label_formatter(&|y| format!("{:.0}", y))
            .draw()?;

        chart.draw_series(panel.values.iter().enumerate().map(|(i, &v)| {
            let i = i as u32;
            let height = if v.is_finite() { v } else { 0.0 };
            let color = panel.colors.get(i as usize).copied().unwrap_or(BLACK);
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), height)],
                color.filled(),
            );
            bar.set_margin(0, 0, 12, 12);
            bar
        }))?;

        let note_style = TextStyle::from((FONT, 16).into_font()).pos(Pos::new(HPos::Center, VPos::Bottom));
        chart.draw_series(panel.notes.iter().enumerate().filter_map(|(i, note)| {
            let note = note.as_ref()?;
            let v = panel.values.get(i).copied().filter(|v| v.is_finite()).unwrap_or(0.0);
            Some(Text::new(
                note.clone(),
                (SegmentValue::CenterOf(i as u32), v + raw_max * 0.05),
                note_style.clone(),
            ))
        }))?;

        Ok(())
    }

    fn draw_hourly_pattern(
        root: &DrawingArea<BitMapBackend<'_>, Shift>,
        hourly: &[HourlyMean],
    ) -> DrawResult {
        let title = "Hourly Bicycle Usage Pattern (Casual vs Registered)";
        if hourly.is_empty() {
            return Self::draw_empty(root, title);
        }

        let y_max = axis_max(
            hourly.iter().flat_map(|h| [h.casual, h.registered]),
            1.1,
        );

        let mut chart = ChartBuilder::on(root)
            .caption(title, (FONT, 24))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(80)
            .build_cartesian_2d(0f64..23f64, 0f64..y_max)?;

        chart
            .configure_mesh()
            .x_desc("Hour (0-23)")
            .y_desc("Average Users")
            .x_labels(24)
            .x_label_formatter(&|x| format!("{:.0}", x))
            .y_label_formatter(&|y| format!("{:.0}", y))
            .draw()?;

        let series: [(&str, RGBColor, Vec<(f64, f64)>); 2] = [
            (
                "Casual",
                rgb(palette::CASUAL_RGB),
                hourly.iter().map(|h| (h.hour as f64, h.casual)).collect(),
            ),
            (
                "Registered",
                rgb(palette::REGISTERED_RGB),
                hourly.iter().map(|h| (h.hour as f64, h.registered)).collect(),
            ),
        ];

        for (name, color, points) in series {
            chart
                .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
                .label(name)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
            chart.draw_series(
                points
                    .iter()
                    .map(move |&(x, y)| Circle::new((x, y), 3, color.filled())),
            )?;
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        Ok(())
    }

    fn draw_heatmap(
        root: &DrawingArea<BitMapBackend<'_>, Shift>,
        matrix: &CorrelationMatrix,
    ) -> DrawResult {
        let title = "Correlation Matrix - Factors Influencing Bike-Sharing";
        let n = matrix.len();
        if n == 0 {
            return Self::draw_empty(root, title);
        }

        let (w, h) = root.dim_in_pixel();
        let label_space = 160i32;
        let top = 70i32;
        let scale_space = 90i32;
        let grid = ((w as i32 - label_space - scale_space).min(h as i32 - top - label_space)).max(n as i32);
        let cell = grid / n as i32;
        let origin = (label_space, top);

        let title_style = TextStyle::from((FONT, 26).into_font()).pos(Pos::new(HPos::Center, VPos::Center));
        root.draw(&Text::new(title.to_string(), (w as i32 / 2, top / 2), title_style))?;

        let row_style = TextStyle::from((FONT, 16).into_font()).pos(Pos::new(HPos::Right, VPos::Center));
        let col_style = TextStyle::from((FONT, 16).into_font())
            .transform(FontTransform::Rotate270)
            .pos(Pos::new(HPos::Left, VPos::Center));
        let annot_font = (FONT, (cell / 3).clamp(10, 18)).into_font();

        for (i, name) in matrix.columns.iter().enumerate() {
            let i = i as i32;
            root.draw(&Text::new(
                name.clone(),
                (origin.0 - 8, origin.1 + i * cell + cell / 2),
                row_style.clone(),
            ))?;
            root.draw(&Text::new(
                name.clone(),
                (origin.0 + i * cell + cell / 2, origin.1 + n as i32 * cell + 8),
                col_style.clone(),
            ))?;

            for j in 0..n as i32 {
                let value = matrix.get(i as usize, j as usize);
                let x0 = origin.0 + j * cell;
                let y0 = origin.1 + i * cell;
                root.draw(&Rectangle::new(
                    [(x0, y0), (x0 + cell, y0 + cell)],
                    rgb(palette::coolwarm_rgb(value)).filled(),
                ))?;
                root.draw(&Rectangle::new(
                    [(x0, y0), (x0 + cell, y0 + cell)],
                    WHITE.stroke_width(1),
                ))?;

                let text_color = if palette::annotation_is_dark(value) {
                    BLACK
                } else {
                    WHITE
                };
                root.draw(&Text::new(
                    format_correlation(value),
                    (x0 + cell / 2, y0 + cell / 2),
                    TextStyle::from(annot_font.clone())
                        .color(&text_color)
                        .pos(Pos::new(HPos::Center, VPos::Center)),
                ))?;
            }
        }

        // Color scale
        let bar_x = origin.0 + n as i32 * cell + 20;
        let steps = 50;
        let total = n as i32 * cell;
        for s in 0..steps {
            let value = 1.0 - 2.0 * (s as f64 + 0.5) / steps as f64;
            let y0 = origin.1 + total * s / steps;
            let y1 = origin.1 + total * (s + 1) / steps;
            root.draw(&Rectangle::new(
                [(bar_x, y0), (bar_x + 20, y1)],
                rgb(palette::coolwarm_rgb(value)).filled(),
            ))?;
        }
        let scale_style = TextStyle::from((FONT, 14).into_font()).pos(Pos::new(HPos::Left, VPos::Center));
        for (label, y) in [("1.0", origin.1), ("0.0", origin.1 + total / 2), ("-1.0", origin.1 + total)] {
            root.draw(&Text::new(label.to_string(), (bar_x + 26, y), scale_style.clone()))?;
        }

        Ok(())
    }

    fn draw_rfm(root: &DrawingArea<BitMapBackend<'_>, Shift>, rfm: &RfmBreakdown) -> DrawResult {
        let panels = root.split_evenly((1, 3));
        let labels: Vec<String> = rfm
            .segments()
            .iter()
            .map(|s| s.segment.label().to_string())
            .collect();
        let color = rgb(palette::HIGHLIGHT_RGB);

        let recency = BarPanel {
            title: "Recency: Last Date & Total Rentals",
            x_desc: "",
            y_desc: "Total Rentals",
            labels: labels.clone(),
            values: rfm
                .segments()
                .iter()
                .map(|s| s.recency.as_ref().map_or(0.0, |r| r.rentals as f64))
                .collect(),
            colors: vec![color; 2],
            notes: rfm
                .segments()
                .iter()
                .map(|s| {
                    Some(
                        s.recency
                            .as_ref()
                            .map(|r| r.last_date.format("%Y-%m-%d").to_string())
                            .unwrap_or_else(|| "no rentals".to_string()),
                    )
                })
                .collect(),
        };
        let frequency = BarPanel {
            title: "Frequency: Average Rentals per Day",
            x_desc: "",
            y_desc: "Average Rentals",
            labels: labels.clone(),
            values: rfm.segments().iter().map(|s| s.frequency).collect(),
            colors: vec![color; 2],
            notes: Vec::new(),
        };
        let monetary = BarPanel {
            title: "Monetary: Total Rentals",
            x_desc: "",
            y_desc: "Total Rentals",
            labels,
            values: rfm.segments().iter().map(|s| s.monetary as f64).collect(),
            colors: vec![color; 2],
            notes: Vec::new(),
        };

        for (area, panel) in panels.iter().zip([recency, frequency, monetary].iter()) {
            Self::draw_bars(area, panel)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader_fixtures::{daily_fixture, hourly_fixture};
    use crate::data::DateRange;
    use crate::stats::StatsCalculator;
    use chrono::NaiveDate;
    use polars::prelude::{Column, NamedFrom};
    use tempfile::tempdir;

    const CHART_FILES: [&str; 7] = [
        "trend.png",
        "season.png",
        "hourly_pattern.png",
        "hourly_average.png",
        "correlation.png",
        "holiday.png",
        "rfm.png",
    ];

    fn dashboard(range: Option<DateRange>) -> DashboardData {
        let mut daily = DataLoader::prepare_daily(daily_fixture()).unwrap();
        // Constant column, correlates as NaN
        daily
            .with_column(Column::new("workingday".into(), vec![1i64; 6]))
            .unwrap();
        let hourly = DataLoader::prepare_hourly(hourly_fixture()).unwrap();

        let range = range.unwrap_or_else(|| {
            let (min, max) = DataLoader::date_bounds(&daily).unwrap();
            DateRange::new(min, max)
        });
        StatsCalculator::compute_dashboard(&daily, &hourly, range).unwrap()
    }

    fn assert_charts_written(data: &DashboardData) {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("charts");

        let written = StaticChartRenderer::render_all(data, &dir).unwrap();
        let expected: Vec<PathBuf> = CHART_FILES.iter().map(|name| dir.join(name)).collect();
        assert_eq!(written, expected);

        for path in &written {
            let (w, h) = image::open(path).unwrap().to_rgb8().dimensions();
            assert!(w > 0 && h > 0, "{} is empty", path.display());
        }
    }

    #[test]
    fn full_range_writes_every_chart() {
        let data = dashboard(None);
        assert!(data.correlation.get(0, data.correlation.len() - 1).is_nan());
        assert_charts_written(&data);
    }

    #[test]
    fn empty_range_still_writes_every_chart() {
        let data = dashboard(Some(DateRange::new(
            NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2015, 12, 31).unwrap(),
        )));
        assert!(data.is_range_empty());
        assert!(data.rfm.casual.recency.is_none());
        assert_charts_written(&data);
    }

    #[test]
    fn date_labels_follow_offsets() {
        let first = NaiveDate::from_ymd_opt(2011, 1, 1).unwrap().num_days_from_ce();
        assert_eq!(date_label(first, 0.0), "2011-01-01");
        assert_eq!(date_label(first, 31.2), "2011-02-01");
        assert_eq!(date_label(first, -3.0), "");
    }

    #[test]
    fn axis_max_has_headroom_and_floor() {
        assert_eq!(axis_max([10.0, 20.0], 1.5), 30.0);
        assert_eq!(axis_max([f64::NAN, 4.0], 1.0), 4.0);
        assert_eq!(axis_max(Vec::<f64>::new(), 1.2), 1.0);
        assert_eq!(axis_max([0.0, 0.0], 1.2), 1.0);
    }
}
