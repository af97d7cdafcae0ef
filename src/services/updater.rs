use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::services::extractor::{BarSource, Extractor};
use crate::services::price_store::{merge_records, PriceStore};
use crate::services::yahoo::YahooClient;

/// What a pull run did, for CLI reporting
#[derive(Debug, PartialEq)]
pub enum UpdateOutcome {
    /// Full 3-year backup written
    Backup { records: usize },
    /// Incremental merge persisted
    Merged { new_records: usize, total_records: usize },
    /// Checkpoint already at or past the last business day
    UpToDate,
    /// Extraction window was open but the provider returned nothing
    NoNewData,
}

/// Orchestrates full-backup vs incremental-merge against the store.
pub struct Updater<S = Extractor> {
    store: PriceStore,
    source: S,
}

impl Updater<Extractor> {
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = YahooClient::new()
            .map_err(|e| AppError::Network(format!("Failed to create provider client: {}", e)))?;
        let ticker = config.ticker.clone();
        Ok(Self {
            store: PriceStore::new(config),
            source: Extractor::new(client, ticker),
        })
    }
}

impl<S: BarSource> Updater<S> {
    /// Build an updater around an explicit bar source
    pub fn with_source(config: AppConfig, source: S) -> Self {
        Self {
            store: PriceStore::new(config),
            source,
        }
    }

    pub fn store(&self) -> &PriceStore {
        &self.store
    }

    /// Complete re-extraction of the backup window, overwriting any prior
    /// backup table. An empty extraction is fatal.
    pub async fn full_backup(&self) -> Result<UpdateOutcome> {
        let today = Utc::now().date_naive();
        let start = today - Duration::days(self.store.config().backup_years * 365);

        tracing::info!(%start, "Creating historical backup");

        let records = self.source.extract(start, None).await;
        if records.is_empty() {
            return Err(AppError::NoData);
        }

        let table = merge_records(Vec::new(), records);
        self.store
            .save_table(&self.store.config().backup_path(), &table)?;

        // table is sorted ascending, so the last row carries the max date
        let max_date = table.last().map(|r| r.date).ok_or(AppError::NoData)?;
        self.store.write_checkpoint(max_date)?;

        tracing::info!(records = table.len(), checkpoint = %max_date, "Backup complete");
        Ok(UpdateOutcome::Backup { records: table.len() })
    }

    /// Fetch-and-merge of data newer than the checkpoint.
    pub async fn incremental_update(&self) -> Result<UpdateOutcome> {
        let checkpoint = match self.store.read_checkpoint()? {
            Some(date) => date,
            None => {
                tracing::info!("Checkpoint not found, creating complete backup");
                return self.full_backup().await;
            }
        };

        let today = Utc::now().date_naive();
        let business_day = last_business_day(today);

        if checkpoint >= business_day {
            tracing::info!(%checkpoint, %business_day, "Data already up to date");
            return Ok(UpdateOutcome::UpToDate);
        }

        let fetch_start = checkpoint + Duration::days(1);
        tracing::info!(%fetch_start, %business_day, "Fetching incremental window");

        let new_records = self.source.extract(fetch_start, Some(business_day)).await;
        if new_records.is_empty() {
            tracing::info!("No new data available");
            return Ok(UpdateOutcome::NoNewData);
        }

        let daily_path = self.store.config().daily_path();
        let existing = if daily_path.exists() {
            self.store.load_table(&daily_path)?
        } else {
            Vec::new()
        };

        // checkpoint advances to the max of the newly fetched rows,
        // not the merged table
        let new_checkpoint = new_records
            .iter()
            .map(|r| r.date)
            .max()
            .ok_or(AppError::NoData)?;
        let new_count = new_records.len();

        let merged = merge_records(existing, new_records);
        self.store.save_table(&daily_path, &merged)?;
        self.store.write_checkpoint(new_checkpoint)?;

        tracing::info!(
            new_records = new_count,
            total_records = merged.len(),
            checkpoint = %new_checkpoint,
            "Incremental merge complete"
        );

        Ok(UpdateOutcome::Merged {
            new_records: new_count,
            total_records: merged.len(),
        })
    }
}

/// Last completed business day: Saturday and Sunday map to Friday, any other
/// day maps to yesterday. No holiday calendar.
pub fn last_business_day(today: NaiveDate) -> NaiveDate {
    match today.weekday() {
        Weekday::Sat => today - Duration::days(1),
        Weekday::Sun => today - Duration::days(2),
        _ => today - Duration::days(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceRecord;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Bar source replaying a canned set of records, recording the windows
    /// it was asked for.
    struct FakeSource {
        records: Vec<PriceRecord>,
        calls: RefCell<Vec<(NaiveDate, Option<NaiveDate>)>>,
    }

    impl FakeSource {
        fn new(records: Vec<PriceRecord>) -> Self {
            Self {
                records,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl BarSource for FakeSource {
        async fn extract(&self, start: NaiveDate, end: Option<NaiveDate>) -> Vec<PriceRecord> {
            self.calls.borrow_mut().push((start, end));
            self.records
                .iter()
                .filter(|r| r.date >= start && end.map_or(true, |e| r.date <= e))
                .cloned()
                .collect()
        }
    }

    fn record(date: &str, close: f64) -> PriceRecord {
        PriceRecord::new(date.parse().unwrap(), close + 10.0, close - 10.0, close)
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_last_business_day() {
        // 2024-01-13 is a Saturday, 2024-01-14 a Sunday
        assert_eq!(last_business_day(date("2024-01-13")), date("2024-01-12"));
        assert_eq!(last_business_day(date("2024-01-14")), date("2024-01-12"));
        // Monday through Friday map to yesterday
        assert_eq!(last_business_day(date("2024-01-15")), date("2024-01-14"));
        assert_eq!(last_business_day(date("2024-01-10")), date("2024-01-09"));
    }

    #[tokio::test]
    async fn test_full_backup_persists_table_and_checkpoint() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::new(vec![record("2024-01-08", 100.0), record("2024-01-09", 105.0)]);
        let updater = Updater::with_source(AppConfig::with_data_dir(dir.path()), source);

        let outcome = updater.full_backup().await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Backup { records: 2 });

        let table = updater
            .store()
            .load_table(&updater.store().config().backup_path())
            .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(updater.store().read_checkpoint().unwrap(), Some(date("2024-01-09")));
    }

    #[tokio::test]
    async fn test_full_backup_empty_extraction_is_fatal() {
        let dir = TempDir::new().unwrap();
        let updater = Updater::with_source(
            AppConfig::with_data_dir(dir.path()),
            FakeSource::new(Vec::new()),
        );

        assert!(updater.full_backup().await.is_err());
        assert!(!updater.store().config().backup_path().exists());
    }

    #[tokio::test]
    async fn test_incremental_without_checkpoint_delegates_to_backup() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::new(vec![record("2024-01-08", 100.0)]);
        let updater = Updater::with_source(AppConfig::with_data_dir(dir.path()), source);

        let outcome = updater.incremental_update().await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Backup { records: 1 });
        assert!(updater.store().config().backup_path().exists());
    }

    #[tokio::test]
    async fn test_incremental_noop_when_checkpoint_current() {
        let dir = TempDir::new().unwrap();
        let updater = Updater::with_source(
            AppConfig::with_data_dir(dir.path()),
            FakeSource::new(vec![record("2030-01-01", 100.0)]),
        );

        // Checkpoint in the far future is always >= the last business day
        updater.store().write_checkpoint(date("2099-01-01")).unwrap();

        let outcome = updater.incremental_update().await.unwrap();
        assert_eq!(outcome, UpdateOutcome::UpToDate);
        assert_eq!(updater.store().read_checkpoint().unwrap(), Some(date("2099-01-01")));
    }

    #[tokio::test]
    async fn test_incremental_merges_and_advances_checkpoint() {
        let dir = TempDir::new().unwrap();
        let yesterday = last_business_day(Utc::now().date_naive());
        let earlier = yesterday - Duration::days(1);

        let source = FakeSource::new(vec![
            PriceRecord::new(earlier, 112.0, 108.0, 110.0),
            PriceRecord::new(yesterday, 122.0, 118.0, 120.0),
        ]);
        let updater = Updater::with_source(AppConfig::with_data_dir(dir.path()), source);

        // Existing table plus a stale checkpoint two business days back
        let existing = vec![PriceRecord::new(earlier - Duration::days(1), 102.0, 98.0, 100.0)];
        updater
            .store()
            .save_table(&updater.store().config().daily_path(), &existing)
            .unwrap();
        updater
            .store()
            .write_checkpoint(earlier - Duration::days(1))
            .unwrap();

        let outcome = updater.incremental_update().await.unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome::Merged {
                new_records: 2,
                total_records: 3
            }
        );

        // Checkpoint equals the max date among newly fetched rows
        assert_eq!(updater.store().read_checkpoint().unwrap(), Some(yesterday));

        let table = updater
            .store()
            .load_table(&updater.store().config().daily_path())
            .unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[tokio::test]
    async fn test_incremental_empty_extraction_is_noop() {
        let dir = TempDir::new().unwrap();
        let updater = Updater::with_source(
            AppConfig::with_data_dir(dir.path()),
            FakeSource::new(Vec::new()),
        );

        let stale = last_business_day(Utc::now().date_naive()) - Duration::days(5);
        updater.store().write_checkpoint(stale).unwrap();

        let outcome = updater.incremental_update().await.unwrap();
        assert_eq!(outcome, UpdateOutcome::NoNewData);
        // Checkpoint never decreases and does not advance on a no-op
        assert_eq!(updater.store().read_checkpoint().unwrap(), Some(stale));
        assert!(!updater.store().config().daily_path().exists());
    }
}
