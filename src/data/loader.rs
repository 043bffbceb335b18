//! CSV Data Loader Module
//! Loads the daily and hourly bike-sharing tables using Polars and normalizes
//! them for date-range filtering.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Internal column holding days since 0001-01-01 CE, used for range filtering.
pub const DAY_COL: &str = "day_number";

/// Columns the daily table must provide.
pub const DAILY_COLUMNS: [&str; 6] = [
    "date",
    "season",
    "holiday",
    "casual",
    "registered",
    "total_rentals",
];

/// Columns the hourly table must provide.
pub const HOURLY_COLUMNS: [&str; 5] = ["date", "hour", "casual", "registered", "total_rentals"];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("{table} table is missing column '{column}'")]
    MissingColumn { table: &'static str, column: String },
    #[error("Invalid date '{value}' in row {row}")]
    InvalidDate { row: usize, value: String },
    #[error("No data loaded")]
    NoData,
}

/// Holds the two dashboard tables loaded with Polars.
pub struct DataLoader {
    daily: Option<DataFrame>,
    hourly: Option<DataFrame>,
    daily_path: Option<PathBuf>,
    hourly_path: Option<PathBuf>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            daily: None,
            hourly: None,
            daily_path: None,
            hourly_path: None,
        }
    }

    /// Read a CSV file into a DataFrame.
    pub fn read_csv(file_path: &Path) -> Result<DataFrame, LoaderError> {
        let df = LazyCsvReader::new(file_path)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;
        Ok(df)
    }

    /// Load and normalize the daily table.
    pub fn load_daily(&mut self, file_path: &Path) -> Result<&DataFrame, LoaderError> {
        let df = Self::prepare_daily(Self::read_csv(file_path)?)?;
        tracing::info!("loaded {} daily rows from {}", df.height(), file_path.display());
        self.daily_path = Some(file_path.to_path_buf());
        self.daily = Some(df);
        self.daily.as_ref().ok_or(LoaderError::NoData)
    }

    /// Load and normalize the hourly table.
    pub fn load_hourly(&mut self, file_path: &Path) -> Result<&DataFrame, LoaderError> {
        let df = Self::prepare_hourly(Self::read_csv(file_path)?)?;
        tracing::info!("loaded {} hourly rows from {}", df.height(), file_path.display());
        self.hourly_path = Some(file_path.to_path_buf());
        self.hourly = Some(df);
        self.hourly.as_ref().ok_or(LoaderError::NoData)
    }

    /// Validate and normalize a raw daily table.
    pub fn prepare_daily(df: DataFrame) -> Result<DataFrame, LoaderError> {
        Self::prepare(df, "daily", &DAILY_COLUMNS)
    }

    /// Validate and normalize a raw hourly table.
    pub fn prepare_hourly(df: DataFrame) -> Result<DataFrame, LoaderError> {
        Self::prepare(df, "hourly", &HOURLY_COLUMNS)
    }

    /// Check required columns, cast the count/code columns to Int64 and
    /// attach the day-number column.
    fn prepare(
        df: DataFrame,
        table: &'static str,
        required: &[&str],
    ) -> Result<DataFrame, LoaderError> {
        if let Some(missing) = required
            .iter()
            .find(|name| df.get_column_index(name).is_none())
        {
            return Err(LoaderError::MissingColumn {
                table,
                column: missing.to_string(),
            });
        }

        if df.height() == 0 {
            return Err(LoaderError::NoData);
        }

        let days = Self::parse_day_numbers(&df)?;

        let casts: Vec<Expr> = required
            .iter()
            .filter(|name| **name != "date")
            .map(|name| col(*name).cast(DataType::Int64))
            .collect();

        let mut df = df.lazy().with_columns(casts).collect()?;
        df.with_column(Column::new(DAY_COL.into(), days))?;

        Ok(df)
    }

    /// Parse the `date` column into day numbers.
    fn parse_day_numbers(df: &DataFrame) -> Result<Vec<i32>, LoaderError> {
        let dates = df.column("date")?.cast(&DataType::String)?;
        let dates = dates.str()?;

        dates
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                value
                    .and_then(Self::parse_date)
                    .map(|d| d.num_days_from_ce())
                    .ok_or_else(|| LoaderError::InvalidDate {
                        row,
                        value: value.unwrap_or_default().to_string(),
                    })
            })
            .collect()
    }

    /// Parse a date cell. Timestamps are truncated to their calendar date.
    pub fn parse_date(value: &str) -> Option<NaiveDate> {
        let value = value.trim();
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
            .or_else(|| {
                DATETIME_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                    .map(|dt| dt.date())
            })
    }

    /// Convert a day number back to a calendar date.
    pub fn day_to_date(day: i32) -> Option<NaiveDate> {
        NaiveDate::from_num_days_from_ce_opt(day)
    }

    /// Earliest and latest date in a prepared table.
    pub fn date_bounds(df: &DataFrame) -> Option<(NaiveDate, NaiveDate)> {
        let days = df.column(DAY_COL).ok()?.i32().ok()?;
        let min = Self::day_to_date(days.min()?)?;
        let max = Self::day_to_date(days.max()?)?;
        Some((min, max))
    }

    /// Numeric column names, excluding the internal day-number column.
    pub fn get_numeric_columns(df: &DataFrame) -> Vec<String> {
        df.get_columns()
            .iter()
            .filter(|col| col.name().as_str() != DAY_COL)
            .filter(|col| {
                matches!(
                    col.dtype(),
                    DataType::Float32
                        | DataType::Float64
                        | DataType::Int8
                        | DataType::Int16
                        | DataType::Int32
                        | DataType::Int64
                        | DataType::UInt8
                        | DataType::UInt16
                        | DataType::UInt32
                        | DataType::UInt64
                )
            })
            .map(|col| col.name().to_string())
            .collect()
    }

    /// Get a reference to the daily table.
    pub fn get_daily(&self) -> Option<&DataFrame> {
        self.daily.as_ref()
    }

    /// Get a reference to the hourly table.
    pub fn get_hourly(&self) -> Option<&DataFrame> {
        self.hourly.as_ref()
    }

    /// Paths of the currently loaded files.
    pub fn get_file_paths(&self) -> (Option<&PathBuf>, Option<&PathBuf>) {
        (self.daily_path.as_ref(), self.hourly_path.as_ref())
    }

    /// Whether both tables are available.
    pub fn is_loaded(&self) -> bool {
        self.daily.is_some() && self.hourly.is_some()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::tempdir;

    pub(crate) fn daily_fixture() -> DataFrame {
        df!(
            "date" => ["2011-01-01", "2011-01-02", "2011-04-01", "2011-07-04", "2011-10-01", "2011-12-25"],
            "season" => [1i64, 1, 2, 3, 4, 4],
            "holiday" => [0i64, 0, 0, 1, 0, 1],
            "casual" => [331i64, 131, 0, 900, 120, 40],
            "registered" => [654i64, 670, 1200, 2100, 800, 0],
            "total_rentals" => [985i64, 801, 1200, 3000, 920, 40],
            "temp" => [0.34f64, 0.36, 0.45, 0.80, 0.50, 0.20]
        )
        .unwrap()
    }

    pub(crate) fn hourly_fixture() -> DataFrame {
        df!(
            "date" => ["2011-01-01", "2011-01-01", "2011-01-01", "2011-01-02", "2011-01-02", "2011-07-04"],
            "hour" => [0i64, 8, 17, 0, 8, 17],
            "casual" => [3i64, 10, 20, 5, 12, 40],
            "registered" => [13i64, 100, 200, 15, 120, 300],
            "total_rentals" => [16i64, 110, 220, 20, 132, 340]
        )
        .unwrap()
    }

    #[test]
    fn prepare_daily_adds_day_numbers() {
        let df = DataLoader::prepare_daily(daily_fixture()).unwrap();
        assert_eq!(df.height(), 6);

        let days = df.column(DAY_COL).unwrap().i32().unwrap();
        let first = NaiveDate::from_ymd_opt(2011, 1, 1).unwrap().num_days_from_ce();
        assert_eq!(days.get(0), Some(first));
        assert_eq!(days.get(1), Some(first + 1));
    }

    #[test]
    fn missing_column_is_reported() {
        let df = daily_fixture().drop("holiday").unwrap();
        let err = DataLoader::prepare_daily(df).unwrap_err();
        match err {
            LoaderError::MissingColumn { table, column } => {
                assert_eq!(table, "daily");
                assert_eq!(column, "holiday");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_date_is_reported_with_row() {
        let df = df!(
            "date" => ["2011-01-01", "yesterday"],
            "hour" => [0i64, 1],
            "casual" => [1i64, 2],
            "registered" => [1i64, 2],
            "total_rentals" => [2i64, 4]
        )
        .unwrap();

        let err = DataLoader::prepare_hourly(df).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidDate { row: 1, .. }));
    }

    #[test]
    fn parse_date_accepts_common_formats() {
        let expected = NaiveDate::from_ymd_opt(2012, 3, 9);
        assert_eq!(DataLoader::parse_date("2012-03-09"), expected);
        assert_eq!(DataLoader::parse_date("03/09/2012"), expected);
        assert_eq!(DataLoader::parse_date("2012-03-09 13:00:00"), expected);
        assert_eq!(DataLoader::parse_date("9 March"), None);
    }

    #[test]
    fn date_bounds_span_the_table() {
        let df = DataLoader::prepare_daily(daily_fixture()).unwrap();
        let (min, max) = DataLoader::date_bounds(&df).unwrap();
        assert_eq!(min, NaiveDate::from_ymd_opt(2011, 1, 1).unwrap());
        assert_eq!(max, NaiveDate::from_ymd_opt(2011, 12, 25).unwrap());
    }

    #[test]
    fn numeric_columns_skip_date_and_day_number() {
        let df = DataLoader::prepare_daily(daily_fixture()).unwrap();
        let cols = DataLoader::get_numeric_columns(&df);
        assert!(cols.contains(&"temp".to_string()));
        assert!(cols.contains(&"total_rentals".to_string()));
        assert!(!cols.contains(&"date".to_string()));
        assert!(!cols.contains(&DAY_COL.to_string()));
    }

    #[test]
    fn load_daily_from_disk() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("day.csv");
        std::fs::write(
            &path,
            "date,season,holiday,casual,registered,total_rentals\n\
             2011-01-01,1,0,331,654,985\n\
             2011-01-02,1,0,131,670,801\n",
        )
        .unwrap();

        let mut loader = DataLoader::new();
        let df = loader.load_daily(&path).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(loader.get_file_paths().0, Some(&path));
        assert!(!loader.is_loaded());
    }
}
