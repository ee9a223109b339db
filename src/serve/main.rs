//! HTTP server for eligibility lookups.
//!
//! Accepts a coordinate file as the request body and answers with the result
//! table as JSON or CSV.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tractlookup::config::Config;
use tractlookup::input::{read_coordinates, InputFormat};
use tractlookup::output::{record_cells, to_csv_string};
use tractlookup::models::STATES;
use tractlookup::zones::programs_for;
use tractlookup::{Error, LookupService, LookupWarning};

#[derive(Parser, Debug)]
#[command(name = "serve")]
#[command(about = "Census tract eligibility lookup server")]
struct Args {
    /// Listen address (overrides the config file)
    #[arg(short, long)]
    listen: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep downloaded tract and zone files in this directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

/// Application state shared across handlers
struct AppState {
    service: LookupService,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(cache_dir) = args.cache_dir {
        config.dataset.cache_dir = Some(cache_dir);
    }
    let listen = config.server.listen.clone();

    let state = Arc::new(AppState {
        service: LookupService::new(config)?,
    });

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/states", get(states_handler))
        .route("/v1/lookup", post(lookup_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", listen);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
struct StateEntry {
    name: &'static str,
    abbr: &'static str,
    fips: &'static str,
    programs: Vec<&'static str>,
}

/// Every known state with the zone programs checked for it
async fn states_handler() -> Json<Vec<StateEntry>> {
    Json(
        STATES
            .iter()
            .map(|s| StateEntry {
                name: s.name,
                abbr: s.abbr,
                fips: s.fips,
                programs: programs_for(&[s]).map(|p| p.label).collect(),
            })
            .collect(),
    )
}

#[derive(Deserialize)]
struct LookupParams {
    /// Comma separated state names, abbreviations or FIPS codes
    states: String,
    /// Body format; falls back to Content-Type, then CSV
    format: Option<String>,
    /// `json` (default) or `csv`
    output: Option<String>,
}

#[derive(Serialize)]
struct LookupResponse {
    columns: Vec<&'static str>,
    rows: Vec<Vec<String>>,
    warnings: Vec<LookupWarning>,
    dropped: usize,
}

async fn lookup_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LookupParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, (StatusCode, String)> {
    let states = tractlookup::State::parse_list(&[params.states.as_str()]).map_err(reject)?;

    let format = match params.format.as_deref() {
        Some(name) => InputFormat::from_name(name),
        None => Ok(headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|ct| InputFormat::from_name(ct.split(';').next().unwrap_or(ct)).ok())
            .unwrap_or(InputFormat::Csv)),
    }
    .map_err(reject)?;

    let batch = read_coordinates(&body, format).map_err(reject)?;
    let report = state
        .service
        .lookup(&states, &batch.coordinates)
        .await
        .map_err(reject)?;

    if params.output.as_deref() == Some("csv") {
        let csv = to_csv_string(&report).map_err(reject)?;
        return Ok(([(header::CONTENT_TYPE, "text/csv")], csv).into_response());
    }

    Ok(Json(LookupResponse {
        columns: report.columns(),
        rows: report.records.iter().map(record_cells).collect(),
        warnings: report.warnings,
        dropped: batch.dropped,
    })
    .into_response())
}

fn reject(e: Error) -> (StatusCode, String) {
    let status = match &e {
        Error::UnknownState(_)
        | Error::NoStatesSelected
        | Error::MissingCoordinateColumns
        | Error::UnsupportedFormat(_)
        | Error::Csv(_)
        | Error::Spreadsheet(_) => StatusCode::BAD_REQUEST,
        Error::TractLoad { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("Lookup failed: {}", e);
    }
    (status, e.to_string())
}
