use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::core::{
    Catalog, DEFAULT_SEED, ForecastCache, ForecastParams, ForecastResult, HORIZON_YEARS,
    run_forecast,
};

const ITERATION_CHOICES: [u32; 3] = [1_000, 5_000, 10_000];

#[derive(Parser, Debug)]
#[command(
    name = "capex",
    about = "Monte Carlo CapEx reserve forecaster (20-year component failure risk)"
)]
struct Cli {
    #[arg(
        long,
        default_value_t = 14.2,
        help = "Annual import (USD) inflation in percent, applied to the imported share of each replacement"
    )]
    usd_rate: f64,
    #[arg(
        long,
        default_value_t = 10.0,
        help = "Annual local inflation in percent, applied to the locally sourced share"
    )]
    local_rate: f64,
    #[arg(
        long,
        default_value_t = 5000,
        help = "Monte Carlo trials per forecast; one of 1000, 5000 or 10000"
    )]
    iterations: u32,
    #[arg(
        long,
        default_value_t = DEFAULT_SEED,
        help = "Random seed; the default regenerates identical reports for identical rates"
    )]
    seed: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ForecastPayload {
    usd_rate: Option<f64>,
    local_rate: Option<f64>,
    iterations: Option<u32>,
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ForecastResponse {
    usd_rate_percent: f64,
    local_rate_percent: f64,
    iterations: u32,
    seed: u64,
    horizon_years: usize,
    mean_yearly_spend: Vec<f64>,
    p95_yearly_spend: Vec<f64>,
    total_mean_spend: f64,
    total_p95_spend: f64,
    annual_reserve: f64,
    risk_gap_percent: f64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
struct AppState {
    catalog: Catalog,
    cache: ForecastCache,
}

fn build_params(cli: Cli) -> Result<ForecastParams, String> {
    if !(2.0..=20.0).contains(&cli.usd_rate) {
        return Err("--usd-rate must be between 2 and 20".to_string());
    }

    if !(2.0..=50.0).contains(&cli.local_rate) {
        return Err("--local-rate must be between 2 and 50".to_string());
    }

    if !ITERATION_CHOICES.contains(&cli.iterations) {
        return Err("--iterations must be one of 1000, 5000 or 10000".to_string());
    }

    Ok(ForecastParams {
        usd_rate_percent: cli.usd_rate,
        local_rate_percent: cli.local_rate,
        iterations: cli.iterations,
        seed: cli.seed,
    })
}

fn default_cli_for_api() -> Cli {
    Cli {
        usd_rate: 14.2,
        local_rate: 10.0,
        iterations: 5_000,
        seed: DEFAULT_SEED,
    }
}

fn params_from_payload(payload: ForecastPayload) -> Result<ForecastParams, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.usd_rate {
        cli.usd_rate = v;
    }
    if let Some(v) = payload.local_rate {
        cli.local_rate = v;
    }
    if let Some(v) = payload.iterations {
        cli.iterations = v;
    }
    if let Some(v) = payload.seed {
        cli.seed = v;
    }

    build_params(cli)
}

fn build_forecast_response(params: &ForecastParams, result: &ForecastResult) -> ForecastResponse {
    let total_mean = result.total_mean();
    let total_p95 = result.total_p95();
    let risk_gap_percent = if total_mean > 0.0 {
        (total_p95 / total_mean - 1.0) * 100.0
    } else {
        0.0
    };

    ForecastResponse {
        usd_rate_percent: params.usd_rate_percent,
        local_rate_percent: params.local_rate_percent,
        iterations: params.iterations,
        seed: params.seed,
        horizon_years: HORIZON_YEARS,
        mean_yearly_spend: result.mean.clone(),
        p95_yearly_spend: result.p95.clone(),
        total_mean_spend: total_mean,
        total_p95_spend: total_p95,
        annual_reserve: total_mean / HORIZON_YEARS as f64,
        risk_gap_percent,
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let state = Arc::new(AppState {
        catalog: Catalog::standard(),
        cache: ForecastCache::new(),
    });
    let app = Router::new()
        .route(
            "/api/forecast",
            get(forecast_get_handler).post(forecast_post_handler),
        )
        .fallback(not_found_handler)
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    println!("CapEx forecast API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/forecast");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn forecast_get_handler(
    State(state): State<Arc<AppState>>,
    Query(payload): Query<ForecastPayload>,
) -> Response {
    forecast_handler_impl(&state, payload).await
}

async fn forecast_post_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ForecastPayload>,
) -> Response {
    forecast_handler_impl(&state, payload).await
}

async fn forecast_handler_impl(state: &AppState, payload: ForecastPayload) -> Response {
    let params = match params_from_payload(payload) {
        Ok(params) => params,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match state.cache.get_or_compute(&state.catalog, &params) {
        Ok(result) => json_response(StatusCode::OK, build_forecast_response(&params, &result)),
        Err(err) => {
            let status = if err.is_invalid_argument() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            error_response(status, &err.to_string())
        }
    }
}

pub fn run_forecast_cli() -> Result<(), String> {
    let cli = Cli::parse();
    let params = build_params(cli)?;

    let catalog = Catalog::standard();
    let result = run_forecast(&catalog, &params).map_err(|e| e.to_string())?;
    let response = build_forecast_response(&params, &result);
    let json = serde_json::to_string_pretty(&response).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
