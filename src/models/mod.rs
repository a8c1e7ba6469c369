pub mod black_scholes;
pub mod monte_carlo;
pub mod params;

pub use params::ContractParameters;

use crate::errors::PricingResult;

/// All pricing models implement this trait.
/// price() must not touch shared mutable state: each call owns its inputs and outputs.
/// Send + Sync required for use across tokio tasks.
pub trait PricingModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// European call and put prices for the given contract.
    fn price(&self, params: &ContractParameters) -> PricingResult<OptionPrices>;
}

/// Call/put pair from one model. Standard errors are only set by sampling models.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct OptionPrices {
    pub call: f64,
    pub put: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_std_error: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put_std_error: Option<f64>,
}

/// One labeled group of prices, ready for side-by-side display.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelQuote {
    pub model: &'static str,
    #[serde(flatten)]
    pub prices: OptionPrices,
    pub call_display: String,
    pub put_display: String,
}

impl ModelQuote {
    pub fn new(model: &'static str, prices: OptionPrices) -> Self {
        Self {
            model,
            prices,
            call_display: format!("{:.2}", prices.call),
            put_display: format!("{:.2}", prices.put),
        }
    }
}

/// Run every model on the same parameters. The first failure aborts the batch.
pub fn quote_all(
    models: &[&dyn PricingModel],
    params: &ContractParameters,
) -> PricingResult<Vec<ModelQuote>> {
    models
        .iter()
        .map(|model| Ok(ModelQuote::new(model.name(), model.price(params)?)))
        .collect()
}
