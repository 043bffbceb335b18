//! Statistics Calculator Module
//! Aggregations behind every dashboard section: summary metrics, trend,
//! seasonal totals, hourly patterns, correlation, holiday impact and RFM.

use crate::data::{DataLoader, DataProcessor, DateRange, ProcessorError, DAY_COL};
use chrono::NaiveDate;
use polars::prelude::*;
use rayon::prelude::*;
use statrs::statistics::Statistics;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
}

/// Totals shown in the metric row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryMetrics {
    pub total_casual: i64,
    pub total_registered: i64,
    pub total_rentals: i64,
    pub days: usize,
}

/// One point of the daily trend line.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub total_rentals: f64,
}

/// A bar in a categorical chart.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub label: String,
    pub value: f64,
    pub is_max: bool,
}

/// Mean rentals for one hour of the day.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyMean {
    pub hour: i64,
    pub casual: f64,
    pub registered: f64,
    pub total: f64,
    pub is_max: bool,
}

/// Pearson correlation between numeric daily columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(f64::NAN)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Daily rental statistics for holiday or non-holiday days.
#[derive(Debug, Clone, PartialEq)]
pub struct HolidayStats {
    pub holiday: i64,
    pub label: String,
    pub mean: f64,
    pub sum: f64,
    pub std: f64,
    pub count: usize,
}

/// User segment in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Casual,
    Registered,
}

impl Segment {
    pub fn column(&self) -> &'static str {
        match self {
            Segment::Casual => "casual",
            Segment::Registered => "registered",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Segment::Casual => "Casual",
            Segment::Registered => "Registered",
        }
    }
}

/// Last day a segment rented and how many rentals it had that day.
#[derive(Debug, Clone, PartialEq)]
pub struct RecencyEntry {
    pub last_date: NaiveDate,
    pub rentals: i64,
}

/// Recency, frequency and monetary figures for one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRfm {
    pub segment: Segment,
    /// `None` when the segment has no day with rentals in the range
    pub recency: Option<RecencyEntry>,
    /// Mean rentals per day
    pub frequency: f64,
    /// Total rentals over the range
    pub monetary: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RfmBreakdown {
    pub casual: SegmentRfm,
    pub registered: SegmentRfm,
}

impl RfmBreakdown {
    pub fn segments(&self) -> [&SegmentRfm; 2] {
        [&self.casual, &self.registered]
    }
}

/// Everything the dashboard page renders for one date range.
#[derive(Debug, Clone)]
pub struct DashboardData {
    pub range: DateRange,
    pub summary: SummaryMetrics,
    pub trend: Vec<TrendPoint>,
    pub seasons: Vec<CategoryTotal>,
    pub hourly: Vec<HourlyMean>,
    /// Full daily table, independent of the range
    pub correlation: CorrelationMatrix,
    /// Full daily table, independent of the range
    pub holidays: Vec<HolidayStats>,
    pub rfm: RfmBreakdown,
}

impl DashboardData {
    /// No daily rows fall in the selected range.
    pub fn is_range_empty(&self) -> bool {
        self.summary.days == 0
    }
}

/// Season code to calendar season name.
pub fn season_label(code: i64) -> String {
    match code {
        1 => "Spring".to_string(),
        2 => "Summer".to_string(),
        3 => "Fall".to_string(),
        4 => "Winter".to_string(),
        other => format!("Season {}", other),
    }
}

/// Holiday flag to day type name.
pub fn holiday_label(code: i64) -> String {
    match code {
        0 => "Non-Holiday".to_string(),
        1 => "Holiday".to_string(),
        other => format!("Holiday={}", other),
    }
}

/// Handles the dashboard aggregations.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute every section for the selected range.
    ///
    /// `daily` and `hourly` are the full prepared tables; the correlation
    /// and holiday sections always use the full daily table.
    pub fn compute_dashboard(
        daily: &DataFrame,
        hourly: &DataFrame,
        range: DateRange,
    ) -> Result<DashboardData, StatsError> {
        let filtered_daily = DataProcessor::filter_by_date(daily, range)?;
        let filtered_hourly = DataProcessor::filter_by_date(hourly, range)?;

        let (ranged, fixed) = rayon::join(
            || -> Result<_, StatsError> {
                Ok((
                    Self::summary(&filtered_daily)?,
                    Self::daily_trend(&filtered_daily)?,
                    Self::season_totals(&filtered_daily)?,
                    Self::hourly_pattern(&filtered_hourly)?,
                    Self::rfm(&filtered_daily)?,
                ))
            },
            || -> Result<_, StatsError> {
                Ok((Self::correlation_matrix(daily)?, Self::holiday_impact(daily)?))
            },
        );

        let (summary, trend, seasons, hourly, rfm) = ranged?;
        let (correlation, holidays) = fixed?;

        tracing::debug!(
            "dashboard for {}..={}: {} days, {} hours",
            range.start,
            range.end,
            summary.days,
            hourly.len()
        );

        Ok(DashboardData {
            range,
            summary,
            trend,
            seasons,
            hourly,
            correlation,
            holidays,
            rfm,
        })
    }

    /// Totals of casual, registered and all rentals.
    pub fn summary(daily: &DataFrame) -> PolarsResult<SummaryMetrics> {
        Ok(SummaryMetrics {
            total_casual: Self::column_sum(daily, "casual")?,
            total_registered: Self::column_sum(daily, "registered")?,
            total_rentals: Self::column_sum(daily, "total_rentals")?,
            days: daily.height(),
        })
    }

    /// Total rentals per day, in date order.
    pub fn daily_trend(daily: &DataFrame) -> PolarsResult<Vec<TrendPoint>> {
        let sorted = daily
            .clone()
            .lazy()
            .select([col(DAY_COL), col("total_rentals")])
            .sort([DAY_COL], SortMultipleOptions::default())
            .collect()?;

        let days = Self::column_i64(&sorted, DAY_COL)?;
        let totals = Self::column_f64(&sorted, "total_rentals")?;

        Ok(days
            .into_iter()
            .zip(totals)
            .filter_map(|(day, total)| {
                let date = DataLoader::day_to_date(day? as i32)?;
                Some(TrendPoint {
                    date,
                    total_rentals: total,
                })
            })
            .collect())
    }

    /// Sum of total rentals per season, ordered by season code.
    pub fn season_totals(daily: &DataFrame) -> PolarsResult<Vec<CategoryTotal>> {
        let grouped = daily
            .clone()
            .lazy()
            .group_by([col("season")])
            .agg([col("total_rentals").sum().alias("total_rentals")])
            .sort(["season"], SortMultipleOptions::default())
            .collect()?;

        let codes = Self::column_i64(&grouped, "season")?;
        let sums = Self::column_f64(&grouped, "total_rentals")?;

        let mut totals: Vec<CategoryTotal> = codes
            .into_iter()
            .zip(sums)
            .filter_map(|(code, value)| {
                let code = code?;
                Some(CategoryTotal {
                    label: season_label(code),
                    value,
                    is_max: false,
                })
            })
            .collect();

        let values: Vec<f64> = totals.iter().map(|t| t.value).collect();
        for (total, is_max) in totals.iter_mut().zip(Self::highlight_max(&values)) {
            total.is_max = is_max;
        }

        Ok(totals)
    }

    /// Mean casual, registered and total rentals per hour of day.
    pub fn hourly_pattern(hourly: &DataFrame) -> PolarsResult<Vec<HourlyMean>> {
        let grouped = hourly
            .clone()
            .lazy()
            .group_by([col("hour")])
            .agg([
                col("casual").mean().alias("casual"),
                col("registered").mean().alias("registered"),
                col("total_rentals").mean().alias("total_rentals"),
            ])
            .sort(["hour"], SortMultipleOptions::default())
            .collect()?;

        let hours = Self::column_i64(&grouped, "hour")?;
        let casual = Self::column_f64(&grouped, "casual")?;
        let registered = Self::column_f64(&grouped, "registered")?;
        let total = Self::column_f64(&grouped, "total_rentals")?;

        let highlight = Self::highlight_max(&total);

        Ok(hours
            .into_iter()
            .enumerate()
            .filter_map(|(i, hour)| {
                Some(HourlyMean {
                    hour: hour?,
                    casual: casual[i],
                    registered: registered[i],
                    total: total[i],
                    is_max: highlight[i],
                })
            })
            .collect())
    }

    /// Pearson correlation over every numeric column of the daily table.
    ///
    /// Rows where either value is missing are skipped pairwise. A column
    /// without variance correlates as NaN, including with itself.
    pub fn correlation_matrix(daily: &DataFrame) -> PolarsResult<CorrelationMatrix> {
        let columns = DataLoader::get_numeric_columns(daily);
        let data: Vec<Vec<f64>> = columns
            .iter()
            .map(|name| Self::column_f64(daily, name))
            .collect::<PolarsResult<_>>()?;

        let values: Vec<Vec<f64>> = (0..columns.len())
            .into_par_iter()
            .map(|i| {
                (0..columns.len())
                    .map(|j| Self::pearson(&data[i], &data[j]))
                    .collect()
            })
            .collect();

        Ok(CorrelationMatrix { columns, values })
    }

    /// Pearson correlation coefficient of two equally long samples.
    pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
        let (xs, ys): (Vec<f64>, Vec<f64>) = x
            .iter()
            .zip(y)
            .filter(|(a, b)| !a.is_nan() && !b.is_nan())
            .map(|(a, b)| (*a, *b))
            .unzip();

        if xs.len() < 2 {
            return f64::NAN;
        }

        let sx = xs.iter().std_dev();
        let sy = ys.iter().std_dev();
        if sx == 0.0 || sy == 0.0 {
            return f64::NAN;
        }

        let r = xs.iter().covariance(ys.iter()) / (sx * sy);
        r.clamp(-1.0, 1.0)
    }

    /// Mean, sum, std and count of daily rentals split by holiday flag.
    pub fn holiday_impact(daily: &DataFrame) -> PolarsResult<Vec<HolidayStats>> {
        let grouped = daily
            .clone()
            .lazy()
            .group_by([col("holiday")])
            .agg([
                col("total_rentals").mean().alias("mean"),
                col("total_rentals").sum().alias("sum"),
                col("total_rentals").std(1).alias("std"),
                col("total_rentals").count().alias("count"),
            ])
            .sort(["holiday"], SortMultipleOptions::default())
            .collect()?;

        let flags = Self::column_i64(&grouped, "holiday")?;
        let mean = Self::column_f64(&grouped, "mean")?;
        let sum = Self::column_f64(&grouped, "sum")?;
        let std = Self::column_f64(&grouped, "std")?;
        let count = Self::column_i64(&grouped, "count")?;

        Ok(flags
            .into_iter()
            .enumerate()
            .filter_map(|(i, flag)| {
                let holiday = flag?;
                Some(HolidayStats {
                    holiday,
                    label: holiday_label(holiday),
                    mean: mean[i],
                    sum: sum[i],
                    std: std[i],
                    count: count[i].unwrap_or(0).max(0) as usize,
                })
            })
            .collect())
    }

    /// Recency, frequency and monetary breakdown for both segments.
    pub fn rfm(daily: &DataFrame) -> PolarsResult<RfmBreakdown> {
        Ok(RfmBreakdown {
            casual: Self::segment_rfm(daily, Segment::Casual)?,
            registered: Self::segment_rfm(daily, Segment::Registered)?,
        })
    }

    fn segment_rfm(daily: &DataFrame, segment: Segment) -> PolarsResult<SegmentRfm> {
        let days = Self::column_i64(daily, DAY_COL)?;
        let counts = Self::column_i64(daily, segment.column())?;

        // Latest day with rentals; the first row wins for duplicate dates.
        let mut last: Option<(i64, i64)> = None;
        for (day, count) in days.iter().zip(&counts) {
            if let (Some(day), Some(count)) = (*day, *count) {
                if count > 0 && last.map_or(true, |(d, _)| day > d) {
                    last = Some((day, count));
                }
            }
        }

        let recency = last.and_then(|(day, rentals)| {
            Some(RecencyEntry {
                last_date: DataLoader::day_to_date(day as i32)?,
                rentals,
            })
        });

        let present: Vec<f64> = counts.iter().flatten().map(|&c| c as f64).collect();

        Ok(SegmentRfm {
            segment,
            recency,
            frequency: present.iter().mean(),
            monetary: Self::column_sum(daily, segment.column())?,
        })
    }

    /// Flags the maximum value(s); NaN never counts as the maximum.
    pub fn highlight_max(values: &[f64]) -> Vec<bool> {
        let max = values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(f64::NEG_INFINITY, f64::max);
        values.iter().map(|&v| v == max).collect()
    }

    fn column_sum(df: &DataFrame, name: &str) -> PolarsResult<i64> {
        let column = df.column(name)?.cast(&DataType::Int64)?;
        Ok(column.i64()?.sum().unwrap_or(0))
    }

    fn column_i64(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i64>>> {
        let column = df.column(name)?.cast(&DataType::Int64)?;
        Ok(column.i64()?.into_iter().collect())
    }

    fn column_f64(df: &DataFrame, name: &str) -> PolarsResult<Vec<f64>> {
        let column = df.column(name)?.cast(&DataType::Float64)?;
        Ok(column
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader_fixtures::{daily_fixture, hourly_fixture};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tables() -> (DataFrame, DataFrame) {
        (
            DataLoader::prepare_daily(daily_fixture()).unwrap(),
            DataLoader::prepare_hourly(hourly_fixture()).unwrap(),
        )
    }

    fn full_range(daily: &DataFrame) -> DateRange {
        let (min, max) = DataLoader::date_bounds(daily).unwrap();
        DateRange::new(min, max)
    }

    #[test]
    fn summary_totals_match_segments() {
        let (daily, _) = tables();
        let summary = StatsCalculator::summary(&daily).unwrap();

        assert_eq!(summary.total_casual, 1522);
        assert_eq!(summary.total_registered, 5424);
        assert_eq!(summary.total_rentals, 6946);
        assert_eq!(summary.total_casual + summary.total_registered, summary.total_rentals);
        assert_eq!(summary.days, 6);
    }

    #[test]
    fn trend_is_in_date_order() {
        let (daily, _) = tables();
        let reversed = daily.reverse();

        let trend = StatsCalculator::daily_trend(&reversed).unwrap();
        assert_eq!(trend.len(), 6);
        assert_eq!(trend[0].date, date(2011, 1, 1));
        assert_eq!(trend[0].total_rentals, 985.0);
        assert!(trend.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn season_totals_partition_the_full_sum() {
        let (daily, _) = tables();
        let seasons = StatsCalculator::season_totals(&daily).unwrap();
        let summary = StatsCalculator::summary(&daily).unwrap();

        let labels: Vec<&str> = seasons.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["Spring", "Summer", "Fall", "Winter"]);

        let values: Vec<f64> = seasons.iter().map(|s| s.value).collect();
        assert_eq!(values, [1786.0, 1200.0, 3000.0, 960.0]);
        assert_eq!(values.iter().sum::<f64>(), summary.total_rentals as f64);

        let highlighted: Vec<&str> = seasons
            .iter()
            .filter(|s| s.is_max)
            .map(|s| s.label.as_str())
            .collect();
        assert_eq!(highlighted, ["Fall"]);
    }

    #[test]
    fn hourly_pattern_covers_subset_of_day() {
        let (_, hourly) = tables();
        let pattern = StatsCalculator::hourly_pattern(&hourly).unwrap();

        let hours: Vec<i64> = pattern.iter().map(|h| h.hour).collect();
        assert_eq!(hours, [0, 8, 17]);
        assert!(hours.iter().all(|h| (0..=23).contains(h)));

        assert_eq!(pattern[0].casual, 4.0);
        assert_eq!(pattern[0].registered, 14.0);
        assert_eq!(pattern[1].total, 121.0);
        assert_eq!(pattern[2].casual, 30.0);
        assert!(pattern[2].is_max);
        assert!(!pattern[0].is_max);
    }

    #[test]
    fn holiday_impact_splits_days() {
        let (daily, _) = tables();
        let stats = StatsCalculator::holiday_impact(&daily).unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].label, "Non-Holiday");
        assert_eq!(stats[0].count, 4);
        assert_eq!(stats[0].sum, 3906.0);
        assert_eq!(stats[0].mean, 976.5);

        assert_eq!(stats[1].label, "Holiday");
        assert_eq!(stats[1].count, 2);
        assert_eq!(stats[1].mean, 1520.0);
        assert!((stats[1].std - 1480.0 * 2f64.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn rfm_finds_last_active_day_per_segment() {
        let (daily, _) = tables();
        let rfm = StatsCalculator::rfm(&daily).unwrap();

        let casual = rfm.casual.recency.as_ref().unwrap();
        assert_eq!(casual.last_date, date(2011, 12, 25));
        assert_eq!(casual.rentals, 40);

        // registered is zero on the last day, so recency falls back
        let registered = rfm.registered.recency.as_ref().unwrap();
        assert_eq!(registered.last_date, date(2011, 10, 1));
        assert_eq!(registered.rentals, 800);

        assert!((rfm.casual.frequency - 1522.0 / 6.0).abs() < 1e-9);
        assert_eq!(rfm.casual.monetary, 1522);
        assert_eq!(rfm.registered.monetary, 5424);
    }

    #[test]
    fn empty_range_yields_empty_sections() {
        let (daily, hourly) = tables();
        let range = DateRange::new(date(2015, 1, 1), date(2015, 1, 31));

        let data = StatsCalculator::compute_dashboard(&daily, &hourly, range).unwrap();
        assert!(data.is_range_empty());
        assert!(data.trend.is_empty());
        assert!(data.seasons.is_empty());
        assert!(data.hourly.is_empty());
        assert_eq!(data.summary.total_rentals, 0);
        assert!(data.rfm.casual.recency.is_none());
        assert!(data.rfm.registered.frequency.is_nan());

        // static sections still use the full table
        assert_eq!(data.holidays.len(), 2);
        assert!(!data.correlation.is_empty());
    }

    #[test]
    fn full_range_matches_full_table() {
        let (daily, hourly) = tables();
        let data = StatsCalculator::compute_dashboard(&daily, &hourly, full_range(&daily)).unwrap();

        assert_eq!(data.summary.days, daily.height());
        assert_eq!(data.trend.len(), daily.height());
        assert_eq!(data.hourly.len(), 3);
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal() {
        let (daily, _) = tables();
        let corr = StatsCalculator::correlation_matrix(&daily).unwrap();

        assert!(corr.columns.contains(&"temp".to_string()));
        assert!(!corr.columns.contains(&DAY_COL.to_string()));

        for i in 0..corr.len() {
            assert!((corr.get(i, i) - 1.0).abs() < 1e-9, "{}", corr.columns[i]);
            for j in 0..corr.len() {
                assert!((corr.get(i, j) - corr.get(j, i)).abs() < 1e-9);
                assert!((-1.0..=1.0).contains(&corr.get(i, j)));
            }
        }
    }

    #[test]
    fn pearson_handles_perfect_and_degenerate_inputs() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert!((StatsCalculator::pearson(&x, &[2.0, 4.0, 6.0, 8.0]) - 1.0).abs() < 1e-12);
        assert!((StatsCalculator::pearson(&x, &[8.0, 6.0, 4.0, 2.0]) + 1.0).abs() < 1e-12);
        assert!(StatsCalculator::pearson(&x, &[5.0, 5.0, 5.0, 5.0]).is_nan());
        assert!(StatsCalculator::pearson(&[1.0], &[1.0]).is_nan());
        assert!(
            (StatsCalculator::pearson(&[1.0, f64::NAN, 2.0, 3.0], &[1.0, 9.0, 2.0, 3.0]) - 1.0)
                .abs()
                < 1e-12
        );
    }

    #[test]
    fn highlight_marks_all_ties() {
        let flags = StatsCalculator::highlight_max(&[3.0, 7.0, f64::NAN, 7.0]);
        assert_eq!(flags, [false, true, false, true]);
        assert!(StatsCalculator::highlight_max(&[]).is_empty());
    }
}
