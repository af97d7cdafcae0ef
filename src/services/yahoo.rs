use chrono::{DateTime, NaiveDate, Utc};
use isahc::{config::Configurable, prelude::*, HttpClient};
use serde_json::Value;
use std::time::Duration as StdDuration;
use tokio::time::sleep;

const MAX_RETRIES: u32 = 5;

#[derive(Debug)]
pub enum YahooError {
    Http(isahc::Error),
    Serialization(serde_json::Error),
    InvalidResponse(String),
    RateLimit,
    NoData,
}

impl From<isahc::Error> for YahooError {
    fn from(error: isahc::Error) -> Self {
        YahooError::Http(error)
    }
}

impl From<serde_json::Error> for YahooError {
    fn from(error: serde_json::Error) -> Self {
        YahooError::Serialization(error)
    }
}

impl std::fmt::Display for YahooError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            YahooError::Http(e) => write!(f, "HTTP error: {}", e),
            YahooError::Serialization(e) => write!(f, "Serialization error: {}", e),
            YahooError::InvalidResponse(s) => write!(f, "Invalid response: {}", s),
            YahooError::RateLimit => write!(f, "Rate limit exceeded"),
            YahooError::NoData => write!(f, "No data available"),
        }
    }
}

impl std::error::Error for YahooError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            YahooError::Http(e) => Some(e),
            YahooError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

/// One daily bar from the Yahoo Finance chart endpoint
#[derive(Debug, Clone)]
pub struct DailyBar {
    pub time: DateTime<Utc>,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Client for the Yahoo Finance v8 chart API.
///
/// Retries transient failures (429, 5xx, network errors) with exponential
/// backoff plus jitter; other 4xx responses are treated as request problems
/// and returned immediately.
pub struct YahooClient {
    client: HttpClient,
    base_url: String,
}

impl YahooClient {
    pub fn new() -> Result<Self, YahooError> {
        let client = HttpClient::builder()
            .timeout(StdDuration::from_secs(30))
            .redirect_policy(isahc::config::RedirectPolicy::Follow)
            .build()?;

        Ok(Self {
            client,
            base_url: "https://query1.finance.yahoo.com/v8/finance/chart".to_string(),
        })
    }

    fn user_agent(&self) -> &'static str {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
    }

    /// End-of-day timestamp so the requested window includes `date` itself
    fn calculate_timestamp(&self, date: Option<NaiveDate>) -> i64 {
        match date {
            Some(d) => d.and_hms_opt(23, 59, 59).unwrap().and_utc().timestamp(),
            None => Utc::now().timestamp(),
        }
    }

    async fn make_request(&self, url: &str) -> Result<Value, YahooError> {
        let mut last_error: Option<String> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay =
                    StdDuration::from_secs_f64(2.0_f64.powi(attempt as i32 - 1) + rand::random::<f64>());
                let delay = delay.min(StdDuration::from_secs(60));
                let reason = last_error.as_deref().unwrap_or("unknown error");
                tracing::info!(
                    "Yahoo API retry backoff: attempt {}/{} - reason: {}, waiting {:.1}s before retry",
                    attempt + 1,
                    MAX_RETRIES,
                    reason,
                    delay.as_secs_f64()
                );
                sleep(delay).await;
            }

            let request = isahc::Request::builder()
                .uri(url)
                .method("GET")
                .header("Accept", "application/json, text/plain, */*")
                .header("Accept-Language", "en-US,en;q=0.9")
                .header("User-Agent", self.user_agent())
                .body(())
                .map_err(|e| YahooError::InvalidResponse(format!("Request build error: {}", e)))?;

            match self.client.send_async(request).await {
                Ok(mut resp) => {
                    let status = resp.status();

                    if status.is_success() {
                        match resp.text().await {
                            Ok(text) => match serde_json::from_str::<Value>(&text) {
                                Ok(data) => return Ok(data),
                                Err(e) => {
                                    last_error = Some(format!("JSON parse error: {}", e));
                                    continue;
                                }
                            },
                            Err(e) => {
                                last_error = Some(format!("Response body error: {}", e));
                                continue;
                            }
                        }
                    } else if status == 429 {
                        last_error = Some("Too Many Requests (429) - rate limited".to_string());
                        continue;
                    } else if status.is_server_error() {
                        let status_text = status.canonical_reason().unwrap_or("Unknown");
                        last_error = Some(format!("Server error ({}) - {}", status.as_u16(), status_text));
                        continue;
                    } else if status.is_client_error() {
                        // Request problems are not retryable
                        let status_text = status.canonical_reason().unwrap_or("Unknown");
                        return Err(YahooError::InvalidResponse(format!(
                            "Client error ({}) - {} - not retryable",
                            status.as_u16(),
                            status_text
                        )));
                    } else {
                        last_error = Some(format!("HTTP error ({})", status.as_u16()));
                        continue;
                    }
                }
                Err(e) => {
                    last_error = Some(format!("Network error: {}", e));
                    continue;
                }
            }
        }

        Err(YahooError::InvalidResponse(format!(
            "Max retries exceeded - last error: {}",
            last_error.unwrap_or_else(|| "unknown".to_string())
        )))
    }

    /// Fetch daily bars for `[start, end]` (end defaults to now).
    ///
    /// Bars with null price entries are skipped; the result is sorted
    /// ascending by time.
    pub async fn get_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<Vec<DailyBar>, YahooError> {
        let period1 = start.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        let period2 = self.calculate_timestamp(end);

        let url = format!(
            "{}/{}?period1={}&period2={}&interval=1d&events=history",
            self.base_url, symbol, period1, period2
        );

        tracing::debug!(
            "YAHOO_GET_HISTORY_INPUT: symbol={}, start={}, end={:?}, period1={}, period2={}",
            symbol,
            start,
            end,
            period1,
            period2
        );

        let response_data = self.make_request(&url).await?;

        parse_chart_response(&response_data, start)
    }
}

/// Parse the chart API body into daily bars, filtering anything before `start`.
pub(crate) fn parse_chart_response(
    response_data: &Value,
    start: NaiveDate,
) -> Result<Vec<DailyBar>, YahooError> {
    let chart = response_data
        .get("chart")
        .ok_or_else(|| YahooError::InvalidResponse("Missing key: chart".to_string()))?;

    if let Some(error) = chart.get("error") {
        if !error.is_null() {
            return Err(YahooError::InvalidResponse(format!("Provider error: {}", error)));
        }
    }

    let result = chart
        .get("result")
        .and_then(|r| r.as_array())
        .ok_or_else(|| YahooError::InvalidResponse("Missing key: result".to_string()))?;

    if result.is_empty() {
        return Err(YahooError::NoData);
    }

    let data_item = &result[0];

    let times = data_item
        .get("timestamp")
        .and_then(|t| t.as_array())
        .ok_or(YahooError::NoData)?;

    let quote = data_item
        .pointer("/indicators/quote/0")
        .ok_or_else(|| YahooError::InvalidResponse("Missing key: indicators.quote".to_string()))?;

    let highs = quote
        .get("high")
        .and_then(|v| v.as_array())
        .ok_or_else(|| YahooError::InvalidResponse("Invalid highs".to_string()))?;
    let lows = quote
        .get("low")
        .and_then(|v| v.as_array())
        .ok_or_else(|| YahooError::InvalidResponse("Invalid lows".to_string()))?;
    let closes = quote
        .get("close")
        .and_then(|v| v.as_array())
        .ok_or_else(|| YahooError::InvalidResponse("Invalid closes".to_string()))?;

    let length = times.len();
    if [highs.len(), lows.len(), closes.len()].iter().any(|&len| len != length) {
        return Err(YahooError::InvalidResponse("Inconsistent array lengths".to_string()));
    }

    let mut bars = Vec::new();
    for i in 0..length {
        let timestamp = times[i].as_i64().ok_or_else(|| {
            YahooError::InvalidResponse(format!("Invalid timestamp at index {}: {:?}", i, &times[i]))
        })?;

        let time = DateTime::<Utc>::from_timestamp(timestamp, 0).ok_or_else(|| {
            YahooError::InvalidResponse(format!(
                "Cannot convert timestamp {} to DateTime at index {}",
                timestamp, i
            ))
        })?;

        // Yahoo pads incomplete days with nulls
        let (high, low, close) = match (highs[i].as_f64(), lows[i].as_f64(), closes[i].as_f64()) {
            (Some(h), Some(l), Some(c)) => (h, l, c),
            _ => continue,
        };

        if time.date_naive() >= start {
            bars.push(DailyBar { time, high, low, close });
        }
    }

    bars.sort_by(|a, b| a.time.cmp(&b.time));

    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_body() -> Value {
        serde_json::json!({
            "chart": {
                "result": [{
                    "meta": {"symbol": "GC=F"},
                    "timestamp": [1704844800, 1704931200, 1705017600],
                    "indicators": {
                        "quote": [{
                            "high": [2045.5, 2051.0, null],
                            "low": [2030.25, 2038.0, null],
                            "close": [2042.75, 2049.3, null]
                        }]
                    }
                }],
                "error": null
            }
        })
    }

    #[test]
    fn test_parse_chart_response() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = parse_chart_response(&fixture_body(), start).unwrap();

        // Null-padded third entry is skipped
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].time.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(bars[0].high, 2045.5);
        assert_eq!(bars[0].low, 2030.25);
        assert_eq!(bars[0].close, 2042.75);
        assert_eq!(bars[1].time.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 11).unwrap());
    }

    #[test]
    fn test_parse_filters_before_start() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        let bars = parse_chart_response(&fixture_body(), start).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 2049.3);
    }

    #[test]
    fn test_parse_empty_result_is_no_data() {
        let body = serde_json::json!({"chart": {"result": [], "error": null}});
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(matches!(parse_chart_response(&body, start), Err(YahooError::NoData)));
    }

    #[test]
    fn test_parse_provider_error() {
        let body = serde_json::json!({
            "chart": {"result": null, "error": {"code": "Not Found", "description": "No data found"}}
        });
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(matches!(
            parse_chart_response(&body, start),
            Err(YahooError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_inconsistent_lengths() {
        let body = serde_json::json!({
            "chart": {
                "result": [{
                    "timestamp": [1704844800, 1704931200],
                    "indicators": {"quote": [{"high": [2045.5], "low": [2030.25], "close": [2042.75]}]}
                }],
                "error": null
            }
        });
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(matches!(
            parse_chart_response(&body, start),
            Err(YahooError::InvalidResponse(_))
        ));
    }
}
