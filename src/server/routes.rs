use crate::config::AppConfig;
use crate::errors::{PricingError, PricingResult};
use crate::models::black_scholes::AnalyticPricer;
use crate::models::monte_carlo::{MonteCarloPricer, PathSimulator};
use crate::models::{quote_all, ContractParameters, ModelQuote, OptionPrices, PricingModel};
use crate::state::{AppState, CountersSnapshot};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use portable_atomic::Ordering::Relaxed;
use std::sync::Arc;

/// Contract fields from the query string. Missing fields take the configured defaults.
#[derive(Debug, Default, serde::Deserialize)]
pub struct PriceQuery {
    pub spot: Option<f64>,
    pub rate: Option<f64>,
    pub volatility: Option<f64>,
    pub maturity: Option<f64>,
    pub strike: Option<f64>,
    pub simulations: Option<usize>,
    pub steps: Option<usize>,
    pub seed: Option<u64>,
}

impl PriceQuery {
    fn resolve(&self, cfg: &AppConfig) -> PricingResult<ContractParameters> {
        let d = cfg.defaults;
        let params = ContractParameters {
            spot: self.spot.unwrap_or(d.spot),
            risk_free_rate: self.rate.unwrap_or(d.risk_free_rate),
            volatility: self.volatility.unwrap_or(d.volatility),
            maturity: self.maturity.unwrap_or(d.maturity),
            strike: self.strike.unwrap_or(d.strike),
            num_simulations: self.simulations.unwrap_or(d.num_simulations),
            num_steps: self.steps.unwrap_or(d.num_steps),
        };

        if params.num_simulations > cfg.max_simulations {
            return Err(PricingError::invalid(format!(
                "simulations must be <= {}, got {}",
                cfg.max_simulations, params.num_simulations
            )));
        }

        if params.num_steps > cfg.max_steps {
            return Err(PricingError::invalid(format!(
                "steps must be <= {}, got {}",
                cfg.max_steps, params.num_steps
            )));
        }

        Ok(params)
    }

    fn seed(&self, cfg: &AppConfig) -> Option<u64> {
        self.seed.or(cfg.rng_seed)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct PriceResponse {
    pub id: String,
    pub parameters: ContractParameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub quotes: Vec<ModelQuote>,
}

#[derive(Debug, serde::Serialize)]
pub struct PathsResponse {
    pub id: String,
    pub parameters: ContractParameters,
    pub time_grid: Vec<f64>,
    /// First `max_paths_returned` paths, each aligned with `time_grid`
    pub paths: Vec<Vec<f64>>,
    pub points_per_path: usize,
    pub total_paths: usize,
    pub monte_carlo: ModelQuote,
}

impl IntoResponse for PricingError {
    fn into_response(self) -> Response {
        let status = match self {
            PricingError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// GET /api/price -- Monte Carlo and Black-Scholes side by side
pub async fn get_price(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PriceQuery>,
) -> Result<Json<PriceResponse>, PricingError> {
    state.counters.price_requests.fetch_add(1, Relaxed);
    let result = price(&state, &query).await;
    if let Err(e) = &result {
        record_error(&state, "price", e);
    }
    result.map(Json)
}

/// GET /api/paths -- time grid plus simulated paths for charting
pub async fn get_paths(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PriceQuery>,
) -> Result<Json<PathsResponse>, PricingError> {
    state.counters.path_requests.fetch_add(1, Relaxed);
    let result = paths(&state, &query).await;
    if let Err(e) = &result {
        record_error(&state, "paths", e);
    }
    result.map(Json)
}

/// GET /api/counters -- request counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<CountersSnapshot> {
    Json(state.counters.snapshot())
}

/// GET /api/health
pub async fn get_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn price(state: &AppState, query: &PriceQuery) -> PricingResult<PriceResponse> {
    let params = query.resolve(&state.config)?;
    let seed = query.seed(&state.config);

    // CPU-bound: keep it off the async workers
    let quotes = tokio::task::spawn_blocking(move || {
        let mc = MonteCarloPricer::new(seed);
        let bs = AnalyticPricer::new();
        let models: [&dyn PricingModel; 2] = [&mc, &bs];
        quote_all(&models, &params)
    })
    .await??;

    state
        .counters
        .paths_simulated
        .fetch_add(params.num_simulations as u64, Relaxed);

    let id = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        id = %id,
        spot = params.spot,
        strike = params.strike,
        simulations = params.num_simulations,
        "priced contract"
    );

    Ok(PriceResponse { id, parameters: params, seed, quotes })
}

async fn paths(state: &AppState, query: &PriceQuery) -> PricingResult<PathsResponse> {
    let params = query.resolve(&state.config)?;
    let seed = query.seed(&state.config);

    let cells = params
        .num_simulations
        .saturating_mul(params.num_steps.saturating_add(1));
    if cells > state.config.max_path_cells {
        return Err(PricingError::invalid(format!(
            "simulations x (steps + 1) must be <= {}, got {cells}",
            state.config.max_path_cells
        )));
    }

    let sim = tokio::task::spawn_blocking(move || {
        let mut rng = MonteCarloPricer::new(seed).rng();
        PathSimulator::simulate(&params, &mut rng)
    })
    .await??;

    state
        .counters
        .paths_simulated
        .fetch_add(params.num_simulations as u64, Relaxed);

    let paths: Vec<Vec<f64>> = sim
        .paths
        .iter()
        .take(state.config.max_paths_returned)
        .map(<[f64]>::to_vec)
        .collect();

    let monte_carlo = ModelQuote::new(
        "Monte Carlo",
        OptionPrices {
            call: sim.monte_carlo_call_price,
            put: sim.monte_carlo_put_price,
            call_std_error: Some(sim.call_std_error),
            put_std_error: Some(sim.put_std_error),
        },
    );

    Ok(PathsResponse {
        id: uuid::Uuid::new_v4().to_string(),
        parameters: params,
        points_per_path: sim.paths.points_per_path(),
        total_paths: sim.paths.num_paths(),
        time_grid: sim.time_grid,
        paths,
        monte_carlo,
    })
}

fn record_error(state: &AppState, route: &'static str, e: &PricingError) {
    state.counters.errors.fetch_add(1, Relaxed);
    match e {
        PricingError::InvalidParameter(_) => tracing::warn!(route, error = %e, "rejected request"),
        _ => tracing::error!(route, error = %e, "pricing failed"),
    }
}
