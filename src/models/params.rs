use crate::errors::{PricingError, PricingResult};

/// Trading days per year. Default number of time steps per simulated path.
pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// Contract and simulation inputs shared by every pricing model.
/// Created fresh per computation. Copy, no heap.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ContractParameters {
    pub spot: f64,
    pub risk_free_rate: f64, // Annualized, continuously compounded
    pub volatility: f64,     // Annualized
    pub maturity: f64,       // Years to expiry
    pub strike: f64,
    pub num_simulations: usize,
    pub num_steps: usize,
}

impl ContractParameters {
    pub fn new(
        spot: f64,
        risk_free_rate: f64,
        volatility: f64,
        maturity: f64,
        strike: f64,
        num_simulations: usize,
    ) -> Self {
        Self {
            spot,
            risk_free_rate,
            volatility,
            maturity,
            strike,
            num_simulations,
            num_steps: TRADING_DAYS_PER_YEAR,
        }
    }

    #[cfg(test)]
    pub fn with_steps(mut self, num_steps: usize) -> Self {
        self.num_steps = num_steps;
        self
    }

    /// Checks the contract fields common to every model.
    pub fn validate_contract(&self) -> PricingResult<()> {
        require_positive("spot", self.spot)?;
        require_positive("maturity", self.maturity)?;
        require_positive("strike", self.strike)?;

        if !self.risk_free_rate.is_finite() {
            return Err(PricingError::invalid(format!(
                "risk_free_rate must be finite, got {}",
                self.risk_free_rate
            )));
        }

        if !(self.volatility >= 0.0) || !self.volatility.is_finite() {
            return Err(PricingError::invalid(format!(
                "volatility must be >= 0, got {}",
                self.volatility
            )));
        }

        Ok(())
    }

    /// Monte Carlo needs positive path and step counts. Zero volatility is allowed.
    pub fn validate_for_simulation(&self) -> PricingResult<()> {
        if self.num_simulations == 0 {
            return Err(PricingError::invalid("num_simulations must be > 0"));
        }
        if self.num_steps == 0 {
            return Err(PricingError::invalid("num_steps must be > 0"));
        }
        self.points_per_path()?;
        self.validate_contract()
    }

    /// Grid points per path, spot included: `num_steps + 1`.
    pub fn points_per_path(&self) -> PricingResult<usize> {
        self.num_steps.checked_add(1).ok_or_else(|| {
            PricingError::invalid(format!("num_steps must be < {}, got {}", usize::MAX, self.num_steps))
        })
    }

    /// Black-Scholes divides by sigma * sqrt(T), so volatility must be strictly positive.
    pub fn validate_for_analytic(&self) -> PricingResult<()> {
        self.validate_contract()?;
        require_positive("volatility", self.volatility)
    }

    /// Time increment per step.
    #[inline]
    pub fn dt(&self) -> f64 {
        self.maturity / self.num_steps as f64
    }

    /// exp(-r * T)
    #[inline]
    pub fn discount_factor(&self) -> f64 {
        (-self.risk_free_rate * self.maturity).exp()
    }
}

/// NaN fails the comparison and is rejected along with zero and negatives.
fn require_positive(name: &str, value: f64) -> PricingResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(PricingError::invalid(format!("{name} must be > 0, got {value}")))
    }
}
