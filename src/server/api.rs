use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::error::{AppError, Result};
use crate::models::{PriceRecord, PriceStats, PriceTable};
use crate::server::AppState;
use crate::services::analytics::compute_stats;

/// Load the table for one request: primary file first, then backup.
fn load_table(state: &AppState) -> Result<PriceTable> {
    state.store().load_with_fallback()
}

/// GET / - API information
#[instrument]
pub async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Gold Price API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /prices": "Get all prices (paginated)",
            "GET /prices/latest": "Get latest available price",
            "GET /prices/date/{date}": "Get price on specific date",
            "GET /prices/range": "Get prices in specific period",
            "GET /stats": "Get data statistics",
            "GET /health": "Health check",
            "GET /dashboard": "Interactive dashboard"
        }
    }))
}

/// Query parameters for /prices
#[derive(Debug, Deserialize)]
pub struct PricesQuery {
    /// Maximum number of records (1..=1000, default 100)
    pub limit: Option<usize>,

    /// Pagination: records to skip (default 0)
    pub skip: Option<usize>,
}

/// GET /prices - newest-first page of the table
#[instrument(skip(state))]
pub async fn get_prices_handler(
    State(state): State<AppState>,
    Query(params): Query<PricesQuery>,
) -> Result<Json<Vec<PriceRecord>>> {
    let limit = params.limit.unwrap_or(100);
    let skip = params.skip.unwrap_or(0);

    if limit < 1 || limit > 1000 {
        return Err(AppError::InvalidInput(format!(
            "limit must be between 1 and 1000, got {}",
            limit
        )));
    }

    let mut table = load_table(&state)?;
    table.sort_by(|a, b| b.date.cmp(&a.date));

    let page: Vec<PriceRecord> = table.into_iter().skip(skip).take(limit).collect();

    info!(returned = page.len(), limit, skip, "Returning price page");
    Ok(Json(page))
}

/// GET /prices/latest - record with the maximum date
#[instrument(skip(state))]
pub async fn get_latest_price_handler(
    State(state): State<AppState>,
) -> Result<Json<PriceRecord>> {
    let table = load_table(&state)?;

    let latest = table
        .into_iter()
        .max_by_key(|r| r.date)
        .ok_or(AppError::NoData)?;

    debug!(date = %latest.date, "Returning latest price");
    Ok(Json(latest))
}

/// GET /prices/date/{date} - exact calendar-date match
#[instrument(skip(state))]
pub async fn get_price_by_date_handler(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<PriceRecord>> {
    let target: NaiveDate = date
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("Invalid date '{}', expected YYYY-MM-DD", date)))?;

    let table = load_table(&state)?;

    // One record per date by invariant; take the first if it is ever violated
    let record = table
        .into_iter()
        .find(|r| r.date == target)
        .ok_or_else(|| AppError::NotFound(format!("No data found for date {}", target)))?;

    Ok(Json(record))
}

/// Query parameters for /prices/range
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    /// Start date (YYYY-MM-DD), inclusive
    pub start_date: NaiveDate,

    /// End date (YYYY-MM-DD), inclusive
    pub end_date: NaiveDate,
}

/// GET /prices/range - inclusive date filter, ascending order
#[instrument(skip(state))]
pub async fn get_prices_by_range_handler(
    State(state): State<AppState>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<Vec<PriceRecord>>> {
    let mut table = load_table(&state)?;
    table.retain(|r| r.date >= params.start_date && r.date <= params.end_date);
    table.sort_by_key(|r| r.date);

    if table.is_empty() {
        return Err(AppError::NotFound(format!(
            "No data found between {} and {}",
            params.start_date, params.end_date
        )));
    }

    info!(
        returned = table.len(),
        start = %params.start_date,
        end = %params.end_date,
        "Returning price range"
    );
    Ok(Json(table))
}

/// GET /stats - whole-table statistics
#[instrument(skip(state))]
pub async fn get_stats_handler(State(state): State<AppState>) -> Result<Json<PriceStats>> {
    let table = load_table(&state)?;
    let stats = compute_stats(&table).ok_or(AppError::NoData)?;
    Ok(Json(stats))
}

/// GET /health - data availability check
///
/// 200 with record count and last date when the table loads, 503 otherwise.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match load_table(&state) {
        Ok(table) => {
            let last_update = table.iter().map(|r| r.date).max();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "status": "healthy",
                    "data_available": true,
                    "total_records": table.len(),
                    "last_update": last_update,
                })),
            )
        }
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unhealthy",
                    "data_available": false,
                    "error": e.to_string(),
                })),
            )
        }
    }
}
