//! Black-Scholes valuation of European options.

use crate::core::error::{ensure_finite, ensure_positive, EngineError, EngineResult};
use crate::core::stats::{norm_cdf, norm_pdf, standard_normal};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Call,
    Put,
}

impl FromStr for OptionKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "call" => Ok(OptionKind::Call),
            "put" => Ok(OptionKind::Put),
            other => Err(EngineError::invalid("kind", format!("unknown option kind '{other}'"))),
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKind::Call => f.pad("call"),
            OptionKind::Put => f.pad("put"),
        }
    }
}

/// Market inputs to the Black-Scholes model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionParams {
    pub spot: f64,
    pub strike: f64,
    /// Time to expiry in years.
    pub expiry: f64,
    /// Continuously compounded risk-free rate.
    pub rate: f64,
    pub volatility: f64,
}

impl OptionParams {
    pub fn new(spot: f64, strike: f64, expiry: f64, rate: f64, volatility: f64) -> EngineResult<Self> {
        ensure_positive("spot", spot)?;
        ensure_positive("strike", strike)?;
        ensure_positive("expiry", expiry)?;
        ensure_finite("rate", rate)?;
        ensure_positive("volatility", volatility)?;
        Ok(Self {
            spot,
            strike,
            expiry,
            rate,
            volatility,
        })
    }

    fn validate(&self) -> EngineResult<()> {
        Self::new(self.spot, self.strike, self.expiry, self.rate, self.volatility).map(|_| ())
    }

    /// (d1, d2)
    fn d1_d2(&self) -> (f64, f64) {
        let vol_sqrt_t = self.volatility * self.expiry.sqrt();
        let d1 = ((self.spot / self.strike).ln()
            + (self.rate + 0.5 * self.volatility.powi(2)) * self.expiry)
            / vol_sqrt_t;
        (d1, d1 - vol_sqrt_t)
    }

    fn discounted_strike(&self) -> f64 {
        self.strike * (-self.rate * self.expiry).exp()
    }
}

/// Option sensitivities in trading units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    /// Per 1 volatility point.
    pub vega: f64,
    /// Per calendar day.
    pub theta: f64,
    /// Per 1% rate move.
    pub rho: f64,
}

impl fmt::Display for Greeks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Delta: {:>10.4}", self.delta)?;
        writeln!(f, "Gamma: {:>10.4}", self.gamma)?;
        writeln!(f, "Vega:  {:>10.4}", self.vega)?;
        writeln!(f, "Theta: {:>10.4}", self.theta)?;
        write!(f, "Rho:   {:>10.4}", self.rho)
    }
}

/// Closed-form Black-Scholes pricer.
pub struct OptionPricer;

impl OptionPricer {
    /// # Examples
    ///
    /// ```
    /// use quant_engine::pricing::option::{OptionKind, OptionParams, OptionPricer};
    ///
    /// let params = OptionParams::new(100.0, 100.0, 1.0, 0.02, 0.3).unwrap();
    /// let call = OptionPricer::price(&params, OptionKind::Call).unwrap();
    /// assert!((call - 12.82).abs() < 0.05);
    /// ```
    pub fn price(params: &OptionParams, kind: OptionKind) -> EngineResult<f64> {
        params.validate()?;
        let n = standard_normal()?;
        let (d1, d2) = params.d1_d2();
        let s = params.spot;
        let k_disc = params.discounted_strike();
        Ok(match kind {
            OptionKind::Call => s * norm_cdf(&n, d1) - k_disc * norm_cdf(&n, d2),
            OptionKind::Put => k_disc * norm_cdf(&n, -d2) - s * norm_cdf(&n, -d1),
        })
    }

    pub fn greeks(params: &OptionParams, kind: OptionKind) -> EngineResult<Greeks> {
        params.validate()?;
        let n = standard_normal()?;
        let (d1, d2) = params.d1_d2();
        let s = params.spot;
        let sqrt_t = params.expiry.sqrt();
        let k_disc = params.discounted_strike();
        let pdf_d1 = norm_pdf(&n, d1);

        let gamma = pdf_d1 / (s * params.volatility * sqrt_t);
        let vega = s * pdf_d1 * sqrt_t;
        let decay = -(s * pdf_d1 * params.volatility) / (2.0 * sqrt_t);

        let (delta, theta, rho) = match kind {
            OptionKind::Call => (
                norm_cdf(&n, d1),
                decay - params.rate * k_disc * norm_cdf(&n, d2),
                params.expiry * k_disc * norm_cdf(&n, d2),
            ),
            OptionKind::Put => (
                -norm_cdf(&n, -d1),
                decay + params.rate * k_disc * norm_cdf(&n, -d2),
                -params.expiry * k_disc * norm_cdf(&n, -d2),
            ),
        };

        Ok(Greeks {
            delta,
            gamma,
            vega: vega / 100.0,
            theta: theta / 365.0,
            rho: rho / 100.0,
        })
    }
}
