//! Data Processor Module
//! Date-range selection and filtering of the loaded tables.

use super::loader::DAY_COL;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Inclusive calendar date range selected in the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range; endpoints are swapped if given in reverse.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Restrict the range to the given bounds.
    pub fn clamp_to(self, bounds: DateRange) -> Self {
        let start = self.start.clamp(bounds.start, bounds.end);
        let end = self.end.clamp(bounds.start, bounds.end);
        Self::new(start, end)
    }

    /// Number of calendar days covered, both ends included.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Handles row selection on the prepared tables.
pub struct DataProcessor;

impl DataProcessor {
    /// Keep rows whose date lies within the range (inclusive).
    pub fn filter_by_date(df: &DataFrame, range: DateRange) -> Result<DataFrame, ProcessorError> {
        let start = range.start.num_days_from_ce();
        let end = range.end.num_days_from_ce();

        let filtered = df
            .clone()
            .lazy()
            .filter(col(DAY_COL).gt_eq(lit(start)).and(col(DAY_COL).lt_eq(lit(end))))
            .collect()?;

        tracing::debug!(
            "filtered {} of {} rows to {}..={}",
            filtered.height(),
            df.height(),
            range.start,
            range.end
        );
        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader_fixtures::{daily_fixture, hourly_fixture};
    use crate::data::DataLoader;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn full_bounds_return_full_table() {
        let df = DataLoader::prepare_daily(daily_fixture()).unwrap();
        let (min, max) = DataLoader::date_bounds(&df).unwrap();

        let filtered = DataProcessor::filter_by_date(&df, DateRange::new(min, max)).unwrap();
        assert_eq!(filtered.height(), df.height());
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let df = DataLoader::prepare_hourly(hourly_fixture()).unwrap();
        let range = DateRange::new(date(2011, 1, 1), date(2011, 1, 2));

        let filtered = DataProcessor::filter_by_date(&df, range).unwrap();
        assert_eq!(filtered.height(), 5);
    }

    #[test]
    fn range_outside_data_is_empty() {
        let df = DataLoader::prepare_daily(daily_fixture()).unwrap();
        let range = DateRange::new(date(2015, 1, 1), date(2015, 2, 1));

        let filtered = DataProcessor::filter_by_date(&df, range).unwrap();
        assert_eq!(filtered.height(), 0);
    }

    #[test]
    fn reversed_endpoints_are_ordered() {
        let range = DateRange::new(date(2011, 3, 1), date(2011, 1, 1));
        assert_eq!(range.start, date(2011, 1, 1));
        assert_eq!(range.num_days(), 60);
    }

    #[test]
    fn clamp_keeps_range_inside_bounds() {
        let bounds = DateRange::new(date(2011, 1, 1), date(2012, 12, 31));
        let range = DateRange::new(date(2010, 6, 1), date(2013, 1, 1)).clamp_to(bounds);
        assert_eq!(range, bounds);
    }
}
