use crate::errors::{PricingError, PricingResult};
use crate::models::{ContractParameters, OptionPrices, PricingModel};
use statrs::distribution::{ContinuousCDF, Normal};

/// Black-Scholes-Merton European option pricing, no dividends.
///
/// d1 = (ln(S/K) + (r + sigma^2/2)*T) / (sigma * sqrt(T))
/// d2 = d1 - sigma * sqrt(T)
/// call = S*Phi(d1) - K*e^{-rT}*Phi(d2)
/// put  = K*e^{-rT}*Phi(-d2) - S*Phi(-d1)
///
/// Phi comes from statrs (erfc-based), accurate enough that put-call
/// parity holds to floating-point precision.
pub struct AnalyticPricer {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

/// Closed-form call/put prices.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct AnalyticResult {
    pub call_price: f64,
    pub put_price: f64,
}

impl From<AnalyticResult> for OptionPrices {
    fn from(r: AnalyticResult) -> Self {
        OptionPrices {
            call: r.call_price,
            put: r.put_price,
            call_std_error: None,
            put_std_error: None,
        }
    }
}

impl AnalyticPricer {
    pub fn new() -> Self {
        Self { normal: Normal::standard() }
    }

    /// Pure function: deterministic output from inputs only.
    pub fn price(&self, params: &ContractParameters) -> PricingResult<AnalyticResult> {
        params.validate_for_analytic()?;

        let s = params.spot;
        let k = params.strike;
        let t = params.maturity;
        let sigma_sqrt_t = params.volatility * t.sqrt();

        let d1 = d1(s, k, params.risk_free_rate, params.volatility, t);
        let d2 = d1 - sigma_sqrt_t;
        let discounted_strike = k * params.discount_factor();

        let call = s * self.normal.cdf(d1) - discounted_strike * self.normal.cdf(d2);
        let put = discounted_strike * self.normal.cdf(-d2) - s * self.normal.cdf(-d1);

        if !call.is_finite() || !put.is_finite() {
            return Err(PricingError::overflow(format!(
                "black-scholes produced call={call} put={put}"
            )));
        }

        // Cancellation deep out of the money can leave values like -1e-17
        let result = AnalyticResult {
            call_price: call.max(0.0),
            put_price: put.max(0.0),
        };

        tracing::debug!(
            d1 = d1,
            d2 = d2,
            call = result.call_price,
            put = result.put_price,
            "black-scholes priced"
        );

        Ok(result)
    }
}

impl Default for AnalyticPricer {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingModel for AnalyticPricer {
    #[inline]
    fn name(&self) -> &'static str {
        "Black-Scholes"
    }

    fn price(&self, params: &ContractParameters) -> PricingResult<OptionPrices> {
        AnalyticPricer::price(self, params).map(OptionPrices::from)
    }
}

/// Black-Scholes d1 parameter
#[inline]
pub fn d1(spot: f64, strike: f64, rate: f64, vol: f64, time: f64) -> f64 {
    ((spot / strike).ln() + (rate + 0.5 * vol * vol) * time) / (vol * time.sqrt())
}
