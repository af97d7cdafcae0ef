use crate::config::AppConfig;
use crate::error::Error;
use crate::services::{UpdateOutcome, Updater};

pub fn run(backup: bool) {
    let config = AppConfig::default();

    if backup {
        println!("🔄 Creating historical backup ({} years)", config.backup_years);
    } else {
        println!("🔄 Incremental update");
    }
    println!("📁 Data directory: {}", config.data_dir.display());
    println!("📊 Ticker: {}", config.ticker);

    match run_update(config, backup) {
        Ok(outcome) => report(outcome),
        Err(e) => {
            eprintln!("❌ Update failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_update(config: AppConfig, backup: bool) -> Result<UpdateOutcome, Error> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Network(format!("Failed to create runtime: {}", e)))?;

    runtime.block_on(async {
        let updater = Updater::new(config)?;
        if backup {
            updater.full_backup().await
        } else {
            updater.incremental_update().await
        }
    })
}

fn report(outcome: UpdateOutcome) {
    match outcome {
        UpdateOutcome::Backup { records } => {
            println!("✅ Backup saved: {} records", records);
        }
        UpdateOutcome::Merged {
            new_records,
            total_records,
        } => {
            println!("✅ Data saved: {} new records, {} total", new_records, total_records);
        }
        UpdateOutcome::UpToDate => {
            println!("✅ Data already up to date");
        }
        UpdateOutcome::NoNewData => {
            println!("⚠️  No new data available");
        }
    }
}
