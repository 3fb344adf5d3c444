use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by engine operations.
///
/// Validation happens at the entry of each operation, so an `Err` always means
/// nothing was computed. Cases with a defined fallback (zero Sharpe on zero
/// volatility, zero hedge efficiency on a flat position) never reach this type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// An input is outside its valid domain: non-positive price, volatility or
    /// horizon, mismatched lengths, weights summing to zero or less, etc.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Upstream market data was empty or missing.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// The result is mathematically undefined for these inputs, e.g. an empty
    /// CVaR tail or a discount base `1 + y/f <= 0`.
    #[error("numerically degenerate: {0}")]
    NumericDegenerate(String),
}

impl EngineError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Result of a checked `Decimal` operation; `None` means it left Decimal range.
pub(crate) fn decimal_in_range(value: Option<Decimal>, what: &str) -> EngineResult<Decimal> {
    value.ok_or_else(|| EngineError::NumericDegenerate(format!("{what} overflows the decimal range")))
}

/// Fail with `InvalidParameter` unless `value` is finite and strictly positive.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> EngineResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::invalid(name, format!("must be positive, got {value}")))
    }
}

/// Fail with `InvalidParameter` unless `value` is finite.
pub(crate) fn ensure_finite(name: &'static str, value: f64) -> EngineResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EngineError::invalid(name, format!("must be finite, got {value}")))
    }
}

/// Confidence levels must lie strictly inside (0, 1).
pub(crate) fn ensure_confidence(confidence: f64) -> EngineResult<()> {
    if confidence > 0.0 && confidence < 1.0 {
        Ok(())
    } else {
        Err(EngineError::invalid(
            "confidence",
            format!("must be in (0, 1), got {confidence}"),
        ))
    }
}
