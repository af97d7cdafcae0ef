use crate::config::AppConfig;
use crate::services::table_stats::{get_data_status, TableInfo};
use crate::services::PriceStore;

pub fn run() {
    println!("📊 Gold Price Data Status\n");

    match show_status() {
        Ok(()) => {}
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn show_status() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::default();
    println!("📁 Data directory: {}\n", config.data_dir.display());

    let store = PriceStore::new(config);
    let status = get_data_status(&store)?;

    if !status.has_data() {
        println!("⚠️  No data found. Run 'goldtrack pull --backup' first.");
        return Ok(());
    }

    show_table("Daily ", status.daily.as_ref());
    show_table("Backup", status.backup.as_ref());

    match status.checkpoint {
        Some(date) => println!("\n🔖 Checkpoint: {}", date),
        None => println!("\n🔖 Checkpoint: none"),
    }

    Ok(())
}

fn show_table(label: &str, info: Option<&TableInfo>) {
    match info {
        Some(info) => {
            println!(
                "🔹 {}: {:>6} records  ({} → {})",
                label, info.record_count, info.first_date, info.last_date
            );
            println!("           Latest close: ${:.2}", info.last_close);
        }
        None => println!("🔹 {}: no file", label),
    }
}
