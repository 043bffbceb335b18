//! Data integrity checks over the loaded tables.

use super::loader::{DAILY_COLUMNS, HOURLY_COLUMNS};
use polars::prelude::*;

/// Counts of rows that break the dataset's documented invariants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub daily_rows: usize,
    pub hourly_rows: usize,
    /// Daily rows where total_rentals != casual + registered
    pub daily_total_mismatches: usize,
    /// Hourly rows where total_rentals != casual + registered
    pub hourly_total_mismatches: usize,
    pub invalid_seasons: usize,
    pub invalid_holidays: usize,
    pub invalid_hours: usize,
    /// Rows (both tables) with a missing code or count cell
    pub rows_with_nulls: usize,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.daily_total_mismatches == 0
            && self.hourly_total_mismatches == 0
            && self.invalid_seasons == 0
            && self.invalid_holidays == 0
            && self.invalid_hours == 0
            && self.rows_with_nulls == 0
    }

    /// Human-readable findings, one line each.
    pub fn findings(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if self.daily_total_mismatches > 0 {
            lines.push(format!(
                "{} daily rows where total ≠ casual + registered",
                self.daily_total_mismatches
            ));
        }
        if self.hourly_total_mismatches > 0 {
            lines.push(format!(
                "{} hourly rows where total ≠ casual + registered",
                self.hourly_total_mismatches
            ));
        }
        if self.invalid_seasons > 0 {
            lines.push(format!("{} rows with season outside 1-4", self.invalid_seasons));
        }
        if self.invalid_holidays > 0 {
            lines.push(format!("{} rows with non-binary holiday", self.invalid_holidays));
        }
        if self.invalid_hours > 0 {
            lines.push(format!("{} rows with hour outside 0-23", self.invalid_hours));
        }
        if self.rows_with_nulls > 0 {
            lines.push(format!("{} rows with missing values", self.rows_with_nulls));
        }
        lines
    }
}

/// Runs the integrity checks.
pub struct DataValidator;

impl DataValidator {
    pub fn validate(daily: &DataFrame, hourly: &DataFrame) -> PolarsResult<IntegrityReport> {
        let report = IntegrityReport {
            daily_rows: daily.height(),
            hourly_rows: hourly.height(),
            daily_total_mismatches: Self::count_total_mismatches(daily)?,
            hourly_total_mismatches: Self::count_total_mismatches(hourly)?,
            invalid_seasons: Self::count_where(
                daily,
                col("season")
                    .is_null()
                    .or(col("season").lt(lit(1i64)))
                    .or(col("season").gt(lit(4i64))),
            )?,
            invalid_holidays: Self::count_where(
                daily,
                col("holiday")
                    .is_null()
                    .or(col("holiday").neq(lit(0i64)).and(col("holiday").neq(lit(1i64)))),
            )?,
            invalid_hours: Self::count_where(
                hourly,
                col("hour")
                    .is_null()
                    .or(col("hour").lt(lit(0i64)))
                    .or(col("hour").gt(lit(23i64))),
            )?,
            rows_with_nulls: Self::count_null_rows(daily, &DAILY_COLUMNS)?
                + Self::count_null_rows(hourly, &HOURLY_COLUMNS)?,
        };

        if report.is_clean() {
            tracing::info!(
                "integrity check passed ({} daily, {} hourly rows)",
                report.daily_rows,
                report.hourly_rows
            );
        } else {
            for finding in report.findings() {
                tracing::warn!("integrity: {}", finding);
            }
        }

        Ok(report)
    }

    /// A missing operand counts as a mismatch.
    fn count_total_mismatches(df: &DataFrame) -> PolarsResult<usize> {
        Self::count_where(
            df,
            col("total_rentals").neq_missing(col("casual") + col("registered")),
        )
    }

    fn count_null_rows(df: &DataFrame, columns: &[&str]) -> PolarsResult<usize> {
        let any_null = columns
            .iter()
            .filter(|name| **name != "date")
            .map(|name| col(*name).is_null())
            .reduce(|acc, e| acc.or(e));
        match any_null {
            Some(predicate) => Self::count_where(df, predicate),
            None => Ok(0),
        }
    }

    /// Rows where the predicate is true; a null predicate is not counted.
    fn count_where(df: &DataFrame, predicate: Expr) -> PolarsResult<usize> {
        Ok(df
            .clone()
            .lazy()
            .filter(predicate.fill_null(lit(false)))
            .collect()?
            .height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader_fixtures::{daily_fixture, hourly_fixture};
    use crate::data::DataLoader;

    #[test]
    fn fixtures_are_clean() {
        let daily = DataLoader::prepare_daily(daily_fixture()).unwrap();
        let hourly = DataLoader::prepare_hourly(hourly_fixture()).unwrap();

        let report = DataValidator::validate(&daily, &hourly).unwrap();
        assert!(report.is_clean(), "{:?}", report.findings());
        assert_eq!(report.daily_rows, 6);
        assert_eq!(report.hourly_rows, 6);
    }

    #[test]
    fn broken_rows_are_counted() {
        let daily = DataLoader::prepare_daily(
            df!(
                "date" => ["2011-01-01", "2011-01-02", "2011-01-03"],
                "season" => [1i64, 5, 0],
                "holiday" => [0i64, 2, 1],
                "casual" => [10i64, 10, 10],
                "registered" => [20i64, 20, 20],
                "total_rentals" => [30i64, 31, 30]
            )
            .unwrap(),
        )
        .unwrap();
        let hourly = DataLoader::prepare_hourly(
            df!(
                "date" => ["2011-01-01", "2011-01-01"],
                "hour" => [23i64, 24],
                "casual" => [1i64, 1],
                "registered" => [1i64, 1],
                "total_rentals" => [3i64, 2]
            )
            .unwrap(),
        )
        .unwrap();

        let report = DataValidator::validate(&daily, &hourly).unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.daily_total_mismatches, 1);
        assert_eq!(report.hourly_total_mismatches, 1);
        assert_eq!(report.invalid_seasons, 2);
        assert_eq!(report.invalid_holidays, 1);
        assert_eq!(report.invalid_hours, 1);
        assert_eq!(report.findings().len(), 5);
    }

    #[test]
    fn missing_cells_are_not_reported_clean() {
        let daily = DataLoader::prepare_daily(
            df!(
                "date" => ["2011-01-01", "2011-01-02", "2011-01-03"],
                "season" => [Some(1i64), None, Some(1)],
                "holiday" => [Some(0i64), None, Some(0)],
                "casual" => [Some(10i64), None, Some(10)],
                "registered" => [Some(20i64), Some(20), Some(20)],
                "total_rentals" => [Some(30i64), Some(999), Some(30)]
            )
            .unwrap(),
        )
        .unwrap();
        let hourly = DataLoader::prepare_hourly(
            df!(
                "date" => ["2011-01-01", "2011-01-01"],
                "hour" => [None, Some(1i64)],
                "casual" => [1i64, 1],
                "registered" => [1i64, 1],
                "total_rentals" => [2i64, 2]
            )
            .unwrap(),
        )
        .unwrap();

        let report = DataValidator::validate(&daily, &hourly).unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.daily_total_mismatches, 1);
        assert_eq!(report.hourly_total_mismatches, 0);
        assert_eq!(report.invalid_seasons, 1);
        assert_eq!(report.invalid_holidays, 1);
        assert_eq!(report.invalid_hours, 1);
        assert_eq!(report.rows_with_nulls, 2);
        assert!(report
            .findings()
            .iter()
            .any(|line| line == "2 rows with missing values"));
    }
}
