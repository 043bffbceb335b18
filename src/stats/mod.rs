//! Stats module - Dashboard aggregations

mod calculator;

pub use calculator::{
    CategoryTotal, CorrelationMatrix, DashboardData, HolidayStats, HourlyMean, RfmBreakdown,
    StatsCalculator, TrendPoint,
};
