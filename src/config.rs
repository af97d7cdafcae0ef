use std::path::PathBuf;

/// Default instrument: gold futures on Yahoo Finance.
pub const DEFAULT_TICKER: &str = "GC=F";

/// Full backup re-extracts this many years of history.
pub const BACKUP_YEARS: i64 = 3;

/// Application configuration, passed into each component at construction.
///
/// Defaults match the original dataset layout; `GOLD_DATA_DIR` and
/// `GOLD_TICKER` environment variables override them.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the table and checkpoint files
    pub data_dir: PathBuf,

    /// Instrument symbol queried from the provider
    pub ticker: String,

    /// Years of history fetched by a full backup
    pub backup_years: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = std::env::var("GOLD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("dataset"));
        let ticker = std::env::var("GOLD_TICKER").unwrap_or_else(|_| DEFAULT_TICKER.to_string());

        Self {
            data_dir,
            ticker,
            backup_years: BACKUP_YEARS,
        }
    }
}

impl AppConfig {
    /// Configuration rooted at an explicit data directory (used by tests)
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Primary table file, replaced wholesale on every incremental merge
    pub fn daily_path(&self) -> PathBuf {
        self.data_dir.join("gold_daily.csv")
    }

    /// Backup table file, written by a full backup
    pub fn backup_path(&self) -> PathBuf {
        self.data_dir.join("gold_backup.csv")
    }

    /// Checkpoint file: single ISO-8601 timestamp as text
    pub fn checkpoint_path(&self) -> PathBuf {
        self.data_dir.join("last_update.txt")
    }
}
