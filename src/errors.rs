/// Domain-specific error types for the pricing engine.
/// Failures are deterministic given the inputs. Nothing here is retried:
/// - Invalid inputs are rejected before any computation starts
/// - Non-finite intermediate values abort the computation instead of leaking NaN/Inf
#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("numeric overflow: {0}")]
    NumericOverflow(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("worker task failed: {0}")]
    Worker(String),
}

impl PricingError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn overflow(msg: impl Into<String>) -> Self {
        Self::NumericOverflow(msg.into())
    }
}

impl From<tokio::task::JoinError> for PricingError {
    fn from(e: tokio::task::JoinError) -> Self {
        PricingError::Worker(e.to_string())
    }
}

pub type PricingResult<T> = Result<T, PricingError>;
