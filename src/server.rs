//! Read-only JSON surface over one session's data products.
//!
//! The dashboard views consume these endpoints; the server itself never
//! mutates the session. One process hosts exactly one loaded file.

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::aggregate::{GroupingSpec, Metric, top_n};
use crate::error::QueryError;
use crate::session::{RecordFilter, SessionContext};

#[derive(Clone)]
pub struct AppState {
    session: Arc<SessionContext>,
}

pub fn build_router(session: Arc<SessionContext>) -> Router {
    let state = AppState { session };
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/v1/stats", get(stats_handler))
        .route("/v1/diagnostics", get(diagnostics_handler))
        .route("/v1/records", get(records_handler))
        .route("/v1/summary", get(summary_handler))
        .route("/v1/pairs", get(pairs_handler))
        .with_state(state)
}

/// Binds the listener and serves until the process is stopped.
pub async fn serve(session: SessionContext, port: u16) -> Result<()> {
    let app = build_router(Arc::new(session));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Serving session data products");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn stats_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.session.stats()))
}

async fn diagnostics_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.session.diagnostics()))
}

#[derive(Debug, Deserialize)]
struct RecordParams {
    agency: Option<String>,
    location: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

async fn records_handler(
    State(state): State<AppState>,
    Query(params): Query<RecordParams>,
) -> Json<Value> {
    let filter = RecordFilter {
        agency: params.agency,
        location_contains: params.location,
        from: params.from,
        to: params.to,
    };
    let records = state.session.filter_records(&filter);
    Json(json!({"count": records.len(), "records": records}))
}

#[derive(Debug, Deserialize)]
struct SummaryParams {
    /// Comma-separated dimensions, e.g. `agency,location`.
    by: String,
    rank_by: Option<String>,
    top: Option<usize>,
}

async fn summary_handler(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let spec = GroupingSpec::parse(&params.by).map_err(bad_request)?;
    let table = state.session.summary(&spec);

    match params.rank_by {
        Some(metric) => {
            let metric: Metric = metric.parse().map_err(bad_request)?;
            let rows = top_n(&table, metric, params.top.unwrap_or(10));
            Ok(Json(json!({
                "dimensions": table.dimensions,
                "ranked_by": metric.as_str(),
                "rows": rows,
                "skipped": table.skipped,
            })))
        }
        None => Ok(Json(json!(table))),
    }
}

#[derive(Debug, Deserialize)]
struct PairParams {
    top: Option<usize>,
}

async fn pairs_handler(
    State(state): State<AppState>,
    Query(params): Query<PairParams>,
) -> Json<Value> {
    let pairs = state.session.pairs(params.top.unwrap_or(10));
    Json(json!({"pairs": pairs}))
}

fn bad_request(err: QueryError) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({"error": err.to_string()})))
}
