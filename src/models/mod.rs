mod price;

pub use price::{PriceRecord, PriceStats};

/// Date-ordered collection of daily price records
pub type PriceTable = Vec<PriceRecord>;
