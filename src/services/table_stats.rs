use chrono::NaiveDate;
use std::path::Path;

use crate::error::Result;
use crate::services::price_store::PriceStore;

/// Summary of one table file on disk
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub record_count: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub last_close: f64,
}

/// What the `status` command reports
#[derive(Debug, Clone)]
pub struct DataStatus {
    pub daily: Option<TableInfo>,
    pub backup: Option<TableInfo>,
    pub checkpoint: Option<NaiveDate>,
}

impl DataStatus {
    pub fn has_data(&self) -> bool {
        self.daily.is_some() || self.backup.is_some()
    }
}

/// Read the on-disk state of both table files and the checkpoint
pub fn get_data_status(store: &PriceStore) -> Result<DataStatus> {
    Ok(DataStatus {
        daily: read_table_info(store, &store.config().daily_path())?,
        backup: read_table_info(store, &store.config().backup_path())?,
        checkpoint: store.read_checkpoint()?,
    })
}

fn read_table_info(store: &PriceStore, path: &Path) -> Result<Option<TableInfo>> {
    if !path.exists() {
        return Ok(None);
    }

    let mut table = store.load_table(path)?;
    if table.is_empty() {
        return Ok(None);
    }
    table.sort_by_key(|r| r.date);

    let first = table.first().unwrap();
    let last = table.last().unwrap();

    Ok(Some(TableInfo {
        record_count: table.len(),
        first_date: first.date,
        last_date: last.date,
        last_close: last.closed_price,
    }))
}
