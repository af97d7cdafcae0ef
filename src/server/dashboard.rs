use axum::{
    extract::{Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt::Write as _;
use tracing::{debug, info, instrument};

use crate::error::{AppError, Result};
use crate::models::{PriceRecord, PriceTable};
use crate::server::AppState;
use crate::services::analytics::{change_distribution, descriptive_stats, range_stats};

const HISTOGRAM_BINS: usize = 30;

/// Date-range filter shared by the dashboard page and the CSV export
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub end_date: Option<NaiveDate>,
}

/// Browsers submit empty form fields as `start_date=`; treat that as unset.
fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    match opt.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Load the table into the dashboard cache on first use; reuse it afterwards.
/// The cache lives until the process restarts.
async fn load_cached(state: &AppState) -> Result<PriceTable> {
    {
        let cache = state.dashboard_cache.read().await;
        if let Some(table) = cache.as_ref() {
            debug!(records = table.len(), "Dashboard cache hit");
            return Ok(table.clone());
        }
    }

    let table = state.store().load_with_fallback()?;
    info!(records = table.len(), "Dashboard cache loaded");

    let mut cache = state.dashboard_cache.write().await;
    *cache = Some(table.clone());
    Ok(table)
}

fn filter_range(
    table: PriceTable,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> PriceTable {
    table
        .into_iter()
        .filter(|r| start.map_or(true, |s| r.date >= s) && end.map_or(true, |e| r.date <= e))
        .collect()
}

/// GET /dashboard - server-rendered exploration page
#[instrument(skip(state))]
pub async fn dashboard_handler(
    State(state): State<AppState>,
    Query(params): Query<DashboardQuery>,
) -> Result<Html<String>> {
    let table = load_cached(&state).await?;
    let filtered = filter_range(table, params.start_date, params.end_date);

    if filtered.is_empty() {
        return Err(AppError::NotFound(
            "No records in the selected date range".to_string(),
        ));
    }

    Ok(Html(render_page(&filtered, params.start_date, params.end_date)))
}

/// GET /dashboard/export.csv - CSV download of the filtered table
#[instrument(skip(state))]
pub async fn export_csv_handler(
    State(state): State<AppState>,
    Query(params): Query<DashboardQuery>,
) -> Result<Response> {
    let table = load_cached(&state).await?;
    let filtered = filter_range(table, params.start_date, params.end_date);

    if filtered.is_empty() {
        return Err(AppError::NotFound(
            "No records in the selected date range".to_string(),
        ));
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in &filtered {
        writer
            .serialize(record)
            .map_err(|e| AppError::Io(format!("CSV error: {}", e)))?;
    }
    let body = writer
        .into_inner()
        .map_err(|e| AppError::Io(format!("CSV error: {}", e)))?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, "text/csv; charset=utf-8".parse().unwrap());
    headers.insert(
        CONTENT_DISPOSITION,
        "attachment; filename=\"gold_prices.csv\"".parse().unwrap(),
    );

    info!(records = filtered.len(), "Serving CSV export");
    Ok((StatusCode::OK, headers, body).into_response())
}

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0 auto; max-width: 1100px; padding: 1rem; color: #222; }
h1 { margin-bottom: 0.2rem; }
.metrics { display: flex; gap: 1rem; flex-wrap: wrap; margin: 1rem 0; }
.metric { flex: 1; min-width: 160px; background: #f6f6f8; border-radius: 8px; padding: 0.8rem 1rem; }
.metric .label { font-size: 0.8rem; color: #666; }
.metric .value { font-size: 1.4rem; font-weight: 600; }
.metric .delta-up { color: #2ca02c; font-size: 0.9rem; }
.metric .delta-down { color: #d62728; font-size: 0.9rem; }
section { margin: 2rem 0; }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: right; padding: 0.3rem 0.6rem; border-bottom: 1px solid #eee; }
th:first-child, td:first-child { text-align: left; }
.stats-grid { display: flex; gap: 2rem; flex-wrap: wrap; }
.stats-grid ul { list-style: none; padding: 0; }
.stats-grid li { padding: 0.15rem 0; }
.bar-row { display: flex; align-items: center; gap: 0.5rem; font-size: 0.75rem; }
.bar-row .range { width: 130px; color: #666; }
.bar { background: #1f77b4; height: 10px; }
form.filter { display: flex; gap: 0.5rem; align-items: end; }
canvas { width: 100%; }
"#;

const CHART_SCRIPT: &str = r#"
const data = JSON.parse(document.getElementById('chart-data').textContent);
const canvas = document.getElementById('chart');
canvas.width = canvas.clientWidth * devicePixelRatio;
canvas.height = 400 * devicePixelRatio;
const ctx = canvas.getContext('2d');
ctx.scale(devicePixelRatio, devicePixelRatio);
const w = canvas.clientWidth, h = 400, pad = 50;
const all = data.max.concat(data.min, data.close);
const lo = Math.min(...all), hi = Math.max(...all);
const x = i => pad + (w - 2 * pad) * (data.dates.length < 2 ? 0.5 : i / (data.dates.length - 1));
const y = v => h - pad - (h - 2 * pad) * ((v - lo) / (hi - lo || 1));
function line(series, color, width) {
  ctx.beginPath();
  series.forEach((v, i) => i === 0 ? ctx.moveTo(x(i), y(v)) : ctx.lineTo(x(i), y(v)));
  ctx.strokeStyle = color;
  ctx.lineWidth = width;
  ctx.stroke();
}
ctx.strokeStyle = '#ddd';
ctx.strokeRect(pad, pad, w - 2 * pad, h - 2 * pad);
ctx.fillStyle = '#666';
ctx.font = '11px sans-serif';
ctx.fillText(hi.toFixed(2), 4, pad + 4);
ctx.fillText(lo.toFixed(2), 4, h - pad);
ctx.fillText(data.dates[0], pad, h - pad + 16);
ctx.textAlign = 'right';
ctx.fillText(data.dates[data.dates.length - 1], w - pad, h - pad + 16);
line(data.max, '#2ca02c', 1);
line(data.min, '#d62728', 1);
line(data.close, '#1f77b4', 2);
"#;

fn render_page(records: &[PriceRecord], start: Option<NaiveDate>, end: Option<NaiveDate>) -> String {
    let latest = records.last().unwrap();
    let first = records.first().unwrap();
    let delta = latest.closed_price - first.closed_price;

    let avg_close =
        records.iter().map(|r| r.closed_price).sum::<f64>() / records.len() as f64;
    let highest = records.iter().map(|r| r.max_price).fold(f64::MIN, f64::max);
    let lowest = records.iter().map(|r| r.min_price).fold(f64::MAX, f64::min);

    let chart_data = serde_json::json!({
        "dates": records.iter().map(|r| r.date.to_string()).collect::<Vec<_>>(),
        "close": records.iter().map(|r| r.closed_price).collect::<Vec<_>>(),
        "max": records.iter().map(|r| r.max_price).collect::<Vec<_>>(),
        "min": records.iter().map(|r| r.min_price).collect::<Vec<_>>(),
    });

    let start_value = start.map(|d| d.to_string()).unwrap_or_default();
    let end_value = end.map(|d| d.to_string()).unwrap_or_default();

    let delta_class = if delta >= 0.0 { "delta-up" } else { "delta-down" };

    let mut html = String::with_capacity(16 * 1024);
    html.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    html.push_str("<title>Gold Price Dashboard</title><style>");
    html.push_str(STYLE);
    html.push_str("</style></head><body>");

    let _ = write!(
        html,
        "<h1>Gold Price Dashboard</h1>\
         <p>Historical gold prices tracking and analysis</p>\
         <form class=\"filter\" method=\"get\" action=\"/dashboard\">\
           <label>Start<br><input type=\"date\" name=\"start_date\" value=\"{start_value}\"></label>\
           <label>End<br><input type=\"date\" name=\"end_date\" value=\"{end_value}\"></label>\
           <button type=\"submit\">Apply</button>\
           <a href=\"/dashboard/export.csv?start_date={start_value}&end_date={end_value}\">Download as CSV</a>\
         </form>\
         <div class=\"metrics\">\
           <div class=\"metric\"><div class=\"label\">Latest Price</div>\
             <div class=\"value\">${:.2}</div><div class=\"{delta_class}\">{:+.2}</div></div>\
           <div class=\"metric\"><div class=\"label\">Average Price</div><div class=\"value\">${:.2}</div></div>\
           <div class=\"metric\"><div class=\"label\">Highest Price</div><div class=\"value\">${:.2}</div></div>\
           <div class=\"metric\"><div class=\"label\">Lowest Price</div><div class=\"value\">${:.2}</div></div>\
         </div>",
        latest.closed_price, delta, avg_close, highest, lowest,
    );

    // Chart
    let _ = write!(
        html,
        "<section><h2>Price Trend</h2>\
         <canvas id=\"chart\"></canvas>\
         <script id=\"chart-data\" type=\"application/json\">{chart_data}</script>\
         <script>{CHART_SCRIPT}</script></section>",
    );

    // Statistics
    if let (Some(desc), Some(ranges)) = (descriptive_stats(records), range_stats(records)) {
        let _ = write!(
            html,
            "<section><h2>Statistical Analysis</h2><div class=\"stats-grid\">\
             <div><h3>Price Statistics</h3><ul>\
               <li><b>Mean:</b> ${:.2}</li>\
               <li><b>Median:</b> ${:.2}</li>\
               <li><b>Std Dev:</b> ${:.2}</li>\
               <li><b>Min:</b> ${:.2}</li>\
               <li><b>Max:</b> ${:.2}</li>\
               <li><b>Q1:</b> ${:.2}</li>\
               <li><b>Q3:</b> ${:.2}</li>\
             </ul></div>\
             <div><h3>Daily Range Statistics</h3><ul>\
               <li><b>Average Range:</b> ${:.2}</li>\
               <li><b>Max Range:</b> ${:.2}</li>\
               <li><b>Min Range:</b> ${:.2}</li>\
               <li><b>Total Records:</b> {}</li>\
             </ul></div></div></section>",
            desc.mean,
            desc.median,
            desc.std_dev,
            desc.min,
            desc.max,
            desc.q1,
            desc.q3,
            ranges.avg_range,
            ranges.max_range,
            ranges.min_range,
            ranges.total_records,
        );
    }

    // Day-over-day change distribution
    if let Some(dist) = change_distribution(records, HISTOGRAM_BINS) {
        let _ = write!(
            html,
            "<section><h2>Daily Price Change Analysis</h2>\
             <div class=\"metrics\">\
               <div class=\"metric\"><div class=\"label\">Up Days</div>\
                 <div class=\"value\">{} ({:.1}%)</div></div>\
               <div class=\"metric\"><div class=\"label\">Down Days</div>\
                 <div class=\"value\">{} ({:.1}%)</div></div>\
               <div class=\"metric\"><div class=\"label\">Neutral Days</div>\
                 <div class=\"value\">{} ({:.1}%)</div></div>\
             </div>",
            dist.up_days, dist.up_pct, dist.down_days, dist.down_pct, dist.flat_days, dist.flat_pct,
        );

        let max_count = dist.histogram.iter().map(|b| b.count).max().unwrap_or(1).max(1);
        for bin in dist.histogram.iter().filter(|b| b.count > 0) {
            let width = bin.count as f64 / max_count as f64 * 100.0;
            let _ = write!(
                html,
                "<div class=\"bar-row\"><span class=\"range\">{:+.2} to {:+.2}</span>\
                 <div class=\"bar\" style=\"width:{:.1}%\"></div><span>{}</span></div>",
                bin.lower, bin.upper, width, bin.count,
            );
        }
        html.push_str("</section>");
    }

    // Data table
    html.push_str(
        "<section><h2>Data Table</h2><table>\
         <tr><th>Date</th><th>Max Price</th><th>Min Price</th><th>Closed Price</th></tr>",
    );
    for record in records.iter().rev() {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>${:.2}</td><td>${:.2}</td><td>${:.2}</td></tr>",
            record.date, record.max_price, record.min_price, record.closed_price,
        );
    }
    html.push_str("</table></section>");

    let _ = write!(
        html,
        "<hr><p><b>Data Information:</b> Last Update: {} · Total Records: {} · Date Range: {} to {}</p>",
        latest.date,
        records.len(),
        first.date,
        latest.date,
    );

    html.push_str("</body></html>");
    html
}
