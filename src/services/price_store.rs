use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::models::{PriceRecord, PriceTable};

/// Durable storage for the price table and the ingest checkpoint.
///
/// The table is a single CSV file read and written wholesale; the checkpoint
/// is one ISO-8601 timestamp as text. Both live under `config.data_dir`.
pub struct PriceStore {
    config: AppConfig,
}

impl PriceStore {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Read a table file. Records come back in file order.
    pub fn load_table(&self, path: &Path) -> Result<PriceTable> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut records = Vec::new();
        for result in reader.deserialize() {
            let record: PriceRecord = result?;
            records.push(record);
        }
        Ok(records)
    }

    /// Replace a table file with `records` (read-modify-write, no append)
    pub fn save_table(&self, path: &Path, records: &[PriceRecord]) -> Result<()> {
        fs::create_dir_all(&self.config.data_dir)?;

        let mut writer = csv::Writer::from_path(path)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Load the primary table, falling back to the backup table.
    ///
    /// Errors with `NoData` when neither file exists; callers surface this as
    /// "run the pipeline first".
    pub fn load_with_fallback(&self) -> Result<PriceTable> {
        let daily = self.config.daily_path();
        let backup = self.config.backup_path();

        let mut table = if daily.exists() {
            self.load_table(&daily)?
        } else if backup.exists() {
            self.load_table(&backup)?
        } else {
            return Err(AppError::NoData);
        };

        table.sort_by_key(|r| r.date);
        Ok(table)
    }

    /// Last successfully ingested date, or `None` before the first backup
    pub fn read_checkpoint(&self) -> Result<Option<NaiveDate>> {
        let path = self.config.checkpoint_path();
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let trimmed = content.trim();

        // Written as a midnight timestamp, but accept a bare date too
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
            return Ok(Some(dt.date()));
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Ok(Some(date));
        }

        Err(AppError::Parse(format!("Invalid checkpoint value: {}", trimmed)))
    }

    pub fn write_checkpoint(&self, date: NaiveDate) -> Result<()> {
        fs::create_dir_all(&self.config.data_dir)?;
        fs::write(
            self.config.checkpoint_path(),
            format!("{}T00:00:00", date.format("%Y-%m-%d")),
        )?;
        Ok(())
    }
}

/// Merge new rows into an existing table.
///
/// Deduplicates by date keeping the newest occurrence (new rows win over
/// existing ones, later new rows win over earlier ones) and sorts ascending
/// by date. Merging the same rows twice yields the same table as merging once.
pub fn merge_records(existing: PriceTable, new: Vec<PriceRecord>) -> PriceTable {
    let mut combined = existing;
    combined.extend(new);

    // Walk in reverse so the last occurrence of a date is the one kept
    let mut seen: HashSet<NaiveDate> = HashSet::new();
    let mut merged: Vec<PriceRecord> = Vec::with_capacity(combined.len());
    for record in combined.into_iter().rev() {
        if seen.insert(record.date) {
            merged.push(record);
        }
    }

    merged.sort_by_key(|r| r.date);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(date: &str, close: f64) -> PriceRecord {
        PriceRecord::new(date.parse().unwrap(), close + 10.0, close - 10.0, close)
    }

    fn store(dir: &TempDir) -> PriceStore {
        PriceStore::new(AppConfig::with_data_dir(dir.path()))
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let records = vec![record("2024-01-01", 100.0), record("2024-01-02", 110.0)];

        let path = store.config().daily_path();
        store.save_table(&path, &records).unwrap();
        let loaded = store.load_table(&path).unwrap();

        assert_eq!(loaded, records);
    }

    #[test]
    fn test_fallback_prefers_daily_over_backup() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store
            .save_table(&store.config().backup_path(), &[record("2024-01-01", 100.0)])
            .unwrap();
        store
            .save_table(&store.config().daily_path(), &[record("2024-02-01", 200.0)])
            .unwrap();

        let table = store.load_with_fallback().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].closed_price, 200.0);
    }

    #[test]
    fn test_fallback_uses_backup_when_daily_missing() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store
            .save_table(&store.config().backup_path(), &[record("2024-01-01", 100.0)])
            .unwrap();

        let table = store.load_with_fallback().unwrap();
        assert_eq!(table[0].closed_price, 100.0);
    }

    #[test]
    fn test_fallback_no_data() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(matches!(store.load_with_fallback(), Err(AppError::NoData)));
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert_eq!(store.read_checkpoint().unwrap(), None);

        let date: NaiveDate = "2024-01-10".parse().unwrap();
        store.write_checkpoint(date).unwrap();
        assert_eq!(store.read_checkpoint().unwrap(), Some(date));
    }

    #[test]
    fn test_checkpoint_accepts_bare_date() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        fs::create_dir_all(dir.path()).unwrap();
        fs::write(store.config().checkpoint_path(), "2024-01-10\n").unwrap();

        assert_eq!(
            store.read_checkpoint().unwrap(),
            Some("2024-01-10".parse().unwrap())
        );
    }

    #[test]
    fn test_merge_dedup_keeps_newest() {
        let existing = vec![record("2024-01-01", 100.0), record("2024-01-02", 110.0)];
        let new = vec![record("2024-01-02", 115.0), record("2024-01-03", 120.0)];

        let merged = merge_records(existing, new);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].date.to_string(), "2024-01-01");
        assert_eq!(merged[1].closed_price, 115.0); // replacement wins
        assert_eq!(merged[2].date.to_string(), "2024-01-03");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = vec![record("2024-01-01", 100.0)];
        let new = vec![record("2024-01-02", 110.0), record("2024-01-03", 120.0)];

        let once = merge_records(existing.clone(), new.clone());
        let twice = merge_records(once.clone(), new);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_sorts_ascending() {
        let merged = merge_records(
            vec![record("2024-01-05", 105.0)],
            vec![record("2024-01-01", 100.0), record("2024-01-03", 103.0)],
        );
        let dates: Vec<String> = merged.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-03", "2024-01-05"]);
    }
}
