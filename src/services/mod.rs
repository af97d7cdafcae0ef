pub mod analytics;
pub mod extractor;
pub mod price_store;
pub mod table_stats;
pub mod updater;
pub mod yahoo;

pub use extractor::{BarSource, Extractor};
pub use price_store::PriceStore;
pub use table_stats::{get_data_status, DataStatus, TableInfo};
pub use updater::{Updater, UpdateOutcome};
pub use yahoo::{YahooClient, YahooError, DailyBar};
