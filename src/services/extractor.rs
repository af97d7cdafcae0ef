use chrono::NaiveDate;

use crate::models::PriceRecord;
use crate::services::yahoo::YahooClient;

/// Source of daily bars for a date window.
///
/// The update job is written against this seam so the extraction step can be
/// replaced in tests.
pub trait BarSource {
    /// Fetch records for `[start, end]` (end defaults to now).
    ///
    /// Always returns a vector: an empty extraction and a provider failure
    /// look the same to callers, the failure is only logged.
    async fn extract(&self, start: NaiveDate, end: Option<NaiveDate>) -> Vec<PriceRecord>;
}

/// Pulls daily bars from the provider and normalizes them into the table schema.
pub struct Extractor {
    client: YahooClient,
    ticker: String,
}

impl Extractor {
    pub fn new(client: YahooClient, ticker: String) -> Self {
        Self { client, ticker }
    }
}

impl BarSource for Extractor {
    async fn extract(&self, start: NaiveDate, end: Option<NaiveDate>) -> Vec<PriceRecord> {
        tracing::info!(
            ticker = %self.ticker,
            %start,
            end = ?end,
            "Extracting daily bars"
        );

        match self.client.get_history(&self.ticker, start, end).await {
            Ok(bars) => {
                if bars.is_empty() {
                    tracing::warn!(ticker = %self.ticker, "No data returned from provider");
                }
                bars.into_iter()
                    // strip the time zone, keep the calendar date
                    .map(|bar| PriceRecord::new(bar.time.date_naive(), bar.high, bar.low, bar.close))
                    .collect()
            }
            Err(e) => {
                tracing::warn!(ticker = %self.ticker, error = %e, "Provider call failed, treating as empty");
                Vec::new()
            }
        }
    }
}
