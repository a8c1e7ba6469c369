mod config;
mod errors;
mod models;
mod server;
mod state;

use crate::models::black_scholes::AnalyticPricer;
use crate::models::monte_carlo::MonteCarloPricer;
use crate::models::{quote_all, PricingModel};
use crate::state::AppState;

#[tokio::main]
async fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("rusty_pricer starting");

    // Load config
    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    log_startup_report(&cfg);

    let port = cfg.server_port;
    let app = server::router(AppState::new(cfg));

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
    }
}

/// Price the default contract with both models and log the two groups.
/// A failure here is logged, not fatal: the server can still take requests.
fn log_startup_report(cfg: &config::AppConfig) {
    let mc = MonteCarloPricer::new(cfg.rng_seed);
    let bs = AnalyticPricer::new();
    let models: Vec<&dyn PricingModel> = vec![&mc, &bs];
    let params = cfg.defaults;

    tracing::info!(
        spot = params.spot,
        rate = params.risk_free_rate,
        volatility = params.volatility,
        maturity = params.maturity,
        strike = params.strike,
        simulations = params.num_simulations,
        steps = params.num_steps,
        "pricing default contract"
    );

    match quote_all(&models, &params) {
        Ok(quotes) => {
            for q in &quotes {
                tracing::info!(
                    model = q.model,
                    call = %q.call_display,
                    put = %q.put_display,
                    "startup valuation"
                );
            }
        }
        Err(e) => tracing::warn!(error = %e, "startup valuation failed"),
    }
}
