use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of gold prices, reduced to the stored schema.
///
/// The `date` is the unique key: the table holds at most one record per
/// calendar date, and a dedup-merge replaces the older occurrence when the
/// provider re-delivers a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Calendar date of the record (time zone already stripped)
    pub date: NaiveDate,

    /// Highest price of the day
    pub max_price: f64,

    /// Lowest price of the day
    pub min_price: f64,

    /// Closing price
    pub closed_price: f64,
}

impl PriceRecord {
    pub fn new(date: NaiveDate, max_price: f64, min_price: f64, closed_price: f64) -> Self {
        Self {
            date,
            max_price,
            min_price,
            closed_price,
        }
    }
}

/// Whole-table statistics served by `GET /stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceStats {
    pub total_records: usize,
    pub date_range_start: NaiveDate,
    pub date_range_end: NaiveDate,
    pub avg_closed_price: f64,
    pub max_closed_price: f64,
    pub min_closed_price: f64,
}
