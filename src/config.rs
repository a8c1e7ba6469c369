use crate::errors::{PricingError, PricingResult};
use crate::models::params::TRADING_DAYS_PER_YEAR;
use crate::models::ContractParameters;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    /// Contract priced at startup and used to fill fields missing from requests
    pub defaults: ContractParameters,
    pub max_simulations: usize,
    pub max_steps: usize,
    pub max_paths_returned: usize,
    /// Upper bound on paths x (steps + 1) for requests that keep every path
    pub max_path_cells: usize,
    pub rng_seed: Option<u64>,
}

impl AppConfig {
    pub fn from_env() -> PricingResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. Missing keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> PricingResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let steps_default = TRADING_DAYS_PER_YEAR.to_string();

        let defaults = ContractParameters {
            spot: parse_or(&lookup, "DEFAULT_SPOT", "100")?,
            risk_free_rate: parse_or(&lookup, "DEFAULT_RATE", "0.05")?,
            volatility: parse_or(&lookup, "DEFAULT_VOLATILITY", "0.2")?,
            maturity: parse_or(&lookup, "DEFAULT_MATURITY", "1")?,
            strike: parse_or(&lookup, "DEFAULT_STRIKE", "100")?,
            num_simulations: parse_or(&lookup, "DEFAULT_SIMULATIONS", "1000")?,
            num_steps: parse_or(&lookup, "NUM_STEPS", &steps_default)?,
        };

        defaults
            .validate_for_simulation()
            .map_err(|e| PricingError::Config(format!("default contract: {e}")))?;

        let rng_seed = match lookup("RNG_SEED") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|e| PricingError::Config(format!("RNG_SEED: {e}")))?,
            ),
            None => None,
        };

        let cfg = Self {
            server_port: parse_or(&lookup, "SERVER_PORT", "3001")?,
            defaults,
            max_simulations: parse_or(&lookup, "MAX_SIMULATIONS", "1000000")?,
            max_steps: parse_or(&lookup, "MAX_STEPS", "10000")?,
            max_paths_returned: parse_or(&lookup, "MAX_PATHS_RETURNED", "200")?,
            max_path_cells: parse_or(&lookup, "MAX_PATH_CELLS", "5000000")?,
            rng_seed,
        };

        if cfg.defaults.num_simulations > cfg.max_simulations {
            return Err(PricingError::Config(format!(
                "DEFAULT_SIMULATIONS ({}) exceeds MAX_SIMULATIONS ({})",
                cfg.defaults.num_simulations, cfg.max_simulations
            )));
        }

        if cfg.defaults.num_steps > cfg.max_steps {
            return Err(PricingError::Config(format!(
                "NUM_STEPS ({}) exceeds MAX_STEPS ({})",
                cfg.defaults.num_steps, cfg.max_steps
            )));
        }

        Ok(cfg)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 3001,
            defaults: ContractParameters::new(100.0, 0.05, 0.2, 1.0, 100.0, 1000),
            max_simulations: 1_000_000,
            max_steps: 10_000,
            max_paths_returned: 200,
            max_path_cells: 5_000_000,
            rng_seed: None,
        }
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: &str) -> PricingResult<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse::<T>()
        .map_err(|e| PricingError::Config(format!("{key}: {e}")))
}
