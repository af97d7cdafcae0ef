//! Derived, read-only statistics over the price table.
//!
//! Everything here is computed from a slice of records already loaded from
//! the store; nothing writes back.

use serde::Serialize;

use crate::models::{PriceRecord, PriceStats};

/// Whole-table statistics for `GET /stats`; `None` on an empty table
pub fn compute_stats(records: &[PriceRecord]) -> Option<PriceStats> {
    if records.is_empty() {
        return None;
    }

    let closes: Vec<f64> = records.iter().map(|r| r.closed_price).collect();
    let sum: f64 = closes.iter().sum();

    Some(PriceStats {
        total_records: records.len(),
        date_range_start: records.iter().map(|r| r.date).min().unwrap(),
        date_range_end: records.iter().map(|r| r.date).max().unwrap(),
        avg_closed_price: sum / closes.len() as f64,
        max_closed_price: closes.iter().cloned().fold(f64::MIN, f64::max),
        min_closed_price: closes.iter().cloned().fold(f64::MAX, f64::min),
    })
}

/// Descriptive statistics of the closing price
#[derive(Debug, Clone, Serialize)]
pub struct DescriptiveStats {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
}

/// Statistics of the daily trading range (max_price - min_price)
#[derive(Debug, Clone, Serialize)]
pub struct RangeStats {
    pub avg_range: f64,
    pub max_range: f64,
    pub min_range: f64,
    pub total_records: usize,
}

/// Day-over-day closing price change distribution
#[derive(Debug, Clone, Serialize)]
pub struct ChangeDistribution {
    pub up_days: usize,
    pub down_days: usize,
    pub flat_days: usize,
    pub up_pct: f64,
    pub down_pct: f64,
    pub flat_pct: f64,
    pub histogram: Vec<HistogramBin>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Quantile with linear interpolation between closest ranks.
/// `sorted` must be ascending and non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn descriptive_stats(records: &[PriceRecord]) -> Option<DescriptiveStats> {
    if records.is_empty() {
        return None;
    }

    let mut closes: Vec<f64> = records.iter().map(|r| r.closed_price).collect();
    closes.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let n = closes.len() as f64;
    let mean = closes.iter().sum::<f64>() / n;

    // sample standard deviation (n - 1)
    let std_dev = if closes.len() > 1 {
        (closes.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    } else {
        0.0
    };

    Some(DescriptiveStats {
        mean,
        median: quantile(&closes, 0.5),
        std_dev,
        min: closes[0],
        max: *closes.last().unwrap(),
        q1: quantile(&closes, 0.25),
        q3: quantile(&closes, 0.75),
    })
}

pub fn range_stats(records: &[PriceRecord]) -> Option<RangeStats> {
    if records.is_empty() {
        return None;
    }

    let ranges: Vec<f64> = records.iter().map(|r| r.max_price - r.min_price).collect();
    let sum: f64 = ranges.iter().sum();

    Some(RangeStats {
        avg_range: sum / ranges.len() as f64,
        max_range: ranges.iter().cloned().fold(f64::MIN, f64::max),
        min_range: ranges.iter().cloned().fold(f64::MAX, f64::min),
        total_records: records.len(),
    })
}

/// Day-over-day changes of a date-ordered table, bucketed into `bins`.
///
/// The first record has no predecessor and is excluded from the counts,
/// matching a first-difference over the series.
pub fn change_distribution(records: &[PriceRecord], bins: usize) -> Option<ChangeDistribution> {
    if records.len() < 2 {
        return None;
    }

    let changes: Vec<f64> = records
        .windows(2)
        .map(|w| w[1].closed_price - w[0].closed_price)
        .collect();

    let up_days = changes.iter().filter(|c| **c > 0.0).count();
    let down_days = changes.iter().filter(|c| **c < 0.0).count();
    let flat_days = changes.iter().filter(|c| **c == 0.0).count();
    let total = changes.len() as f64;

    let min = changes.iter().cloned().fold(f64::MAX, f64::min);
    let max = changes.iter().cloned().fold(f64::MIN, f64::max);

    let bins = bins.max(1);
    let width = if max > min { (max - min) / bins as f64 } else { 1.0 };

    let mut histogram: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + i as f64 * width,
            upper: min + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();

    for change in &changes {
        let idx = (((change - min) / width) as usize).min(bins - 1);
        histogram[idx].count += 1;
    }

    Some(ChangeDistribution {
        up_days,
        down_days,
        flat_days,
        up_pct: up_days as f64 / total * 100.0,
        down_pct: down_days as f64 / total * 100.0,
        flat_pct: flat_days as f64 / total * 100.0,
        histogram,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, max: f64, min: f64, close: f64) -> PriceRecord {
        PriceRecord::new(date.parse().unwrap(), max, min, close)
    }

    #[test]
    fn test_compute_stats_known_values() {
        let records = vec![
            record("2024-01-01", 105.0, 95.0, 100.0),
            record("2024-01-02", 115.0, 105.0, 110.0),
        ];

        let stats = compute_stats(&records).unwrap();
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.avg_closed_price, 105.0);
        assert_eq!(stats.max_closed_price, 110.0);
        assert_eq!(stats.min_closed_price, 100.0);
        assert_eq!(stats.date_range_start.to_string(), "2024-01-01");
        assert_eq!(stats.date_range_end.to_string(), "2024-01-02");
    }

    #[test]
    fn test_compute_stats_empty() {
        assert!(compute_stats(&[]).is_none());
    }

    #[test]
    fn test_descriptive_stats() {
        let records = vec![
            record("2024-01-01", 0.0, 0.0, 10.0),
            record("2024-01-02", 0.0, 0.0, 20.0),
            record("2024-01-03", 0.0, 0.0, 30.0),
            record("2024-01-04", 0.0, 0.0, 40.0),
            record("2024-01-05", 0.0, 0.0, 50.0),
        ];

        let stats = descriptive_stats(&records).unwrap();
        assert_eq!(stats.mean, 30.0);
        assert_eq!(stats.median, 30.0);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 50.0);
        assert_eq!(stats.q1, 20.0);
        assert_eq!(stats.q3, 40.0);
        // sample std dev of 10..50 step 10
        assert!((stats.std_dev - 15.811388).abs() < 1e-5);
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(quantile(&values, 0.5), 25.0);
        assert_eq!(quantile(&values, 0.25), 17.5);
    }

    #[test]
    fn test_range_stats() {
        let records = vec![
            record("2024-01-01", 110.0, 100.0, 105.0),
            record("2024-01-02", 130.0, 100.0, 115.0),
        ];

        let stats = range_stats(&records).unwrap();
        assert_eq!(stats.avg_range, 20.0);
        assert_eq!(stats.max_range, 30.0);
        assert_eq!(stats.min_range, 10.0);
        assert_eq!(stats.total_records, 2);
    }

    #[test]
    fn test_change_distribution_counts() {
        let records = vec![
            record("2024-01-01", 0.0, 0.0, 100.0),
            record("2024-01-02", 0.0, 0.0, 110.0), // up
            record("2024-01-03", 0.0, 0.0, 105.0), // down
            record("2024-01-04", 0.0, 0.0, 105.0), // flat
            record("2024-01-05", 0.0, 0.0, 120.0), // up
        ];

        let dist = change_distribution(&records, 10).unwrap();
        assert_eq!(dist.up_days, 2);
        assert_eq!(dist.down_days, 1);
        assert_eq!(dist.flat_days, 1);
        assert_eq!(dist.up_pct, 50.0);

        let total: usize = dist.histogram.iter().map(|b| b.count).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn test_change_distribution_needs_two_records() {
        let records = vec![record("2024-01-01", 0.0, 0.0, 100.0)];
        assert!(change_distribution(&records, 10).is_none());
    }
}
