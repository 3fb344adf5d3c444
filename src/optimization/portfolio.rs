use crate::core::asset::AssetId;
use crate::core::error::{ensure_confidence, ensure_finite, EngineError, EngineResult};
use crate::core::series::ReturnMatrix;
use crate::core::stats::{self, TRADING_DAYS};
use crate::simulation::gbm::tail_mean_loss;
use crate::simulation::stress_test::{self, ShockCategory, StressTestResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Portfolio weights, normalized to sum to one.
///
/// # Examples
///
/// ```
/// use quant_engine::optimization::portfolio::PortfolioWeights;
///
/// let w = PortfolioWeights::new(vec![2.0, 1.0, 1.0]).unwrap();
/// assert_eq!(w.values(), &[0.5, 0.25, 0.25]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct PortfolioWeights(Vec<f64>);

impl PortfolioWeights {
    /// Normalize raw weights. Fails when any weight is non-finite or the raw
    /// sum is not positive.
    pub fn new(raw: Vec<f64>) -> EngineResult<Self> {
        if raw.is_empty() {
            return Err(EngineError::invalid("weights", "at least one weight is required"));
        }
        for w in &raw {
            ensure_finite("weights", *w)?;
        }
        let total: f64 = raw.iter().sum();
        if total <= 0.0 {
            return Err(EngineError::invalid(
                "weights",
                format!("raw weights sum to {total}, must be positive"),
            ));
        }
        Ok(Self(raw.into_iter().map(|w| w / total).collect()))
    }

    /// Equal weight across `n` assets.
    pub fn equal(n: usize) -> EngineResult<Self> {
        Self::new(vec![1.0; n])
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn check_matches(&self, returns: &ReturnMatrix) -> EngineResult<()> {
        if self.len() != returns.n_assets() {
            return Err(EngineError::invalid(
                "weights",
                format!(
                    "has {} entries but the portfolio has {} assets",
                    self.len(),
                    returns.n_assets()
                ),
            ));
        }
        Ok(())
    }

    /// Pair each weight with its asset.
    pub fn labelled<'a>(&'a self, assets: &'a [AssetId]) -> impl Iterator<Item = (&'a AssetId, f64)> + 'a {
        assets.iter().zip(self.0.iter().copied())
    }
}

impl TryFrom<Vec<f64>> for PortfolioWeights {
    type Error = EngineError;

    fn try_from(raw: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<PortfolioWeights> for Vec<f64> {
    fn from(w: PortfolioWeights) -> Self {
        w.0
    }
}

/// Annualized return, volatility and Sharpe ratio of a weighted portfolio.
/// The risk-free rate is taken as zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub annual_return: f64,
    pub volatility: f64,
    pub sharpe: f64,
}

impl fmt::Display for PortfolioMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Annual return: {:>8.2}%", self.annual_return * 100.0)?;
        writeln!(f, "Volatility:    {:>8.2}%", self.volatility * 100.0)?;
        write!(f, "Sharpe:        {:>8.3}", self.sharpe)
    }
}

/// Annualized mean vector and covariance matrix of a return matrix.
#[derive(Debug, Clone)]
pub(crate) struct AnnualizedMoments {
    mean: Vec<f64>,
    covariance: Vec<Vec<f64>>,
}

impl AnnualizedMoments {
    pub(crate) fn estimate(returns: &ReturnMatrix) -> EngineResult<Self> {
        let mean = returns.mean_returns().iter().map(|m| m * TRADING_DAYS).collect();
        let covariance = returns
            .covariance()?
            .into_iter()
            .map(|row| row.into_iter().map(|c| c * TRADING_DAYS).collect())
            .collect();
        Ok(Self { mean, covariance })
    }

    pub(crate) fn evaluate(&self, weights: &[f64]) -> PortfolioMetrics {
        let annual_return = stats::dot(&self.mean, weights);
        let volatility = stats::quadratic_form(&self.covariance, weights).max(0.0).sqrt();
        let sharpe = if volatility > 0.0 {
            annual_return / volatility
        } else {
            0.0
        };
        PortfolioMetrics {
            annual_return,
            volatility,
            sharpe,
        }
    }
}

/// How VaR is estimated from the portfolio's return history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarMethod {
    /// Empirical percentile of realized portfolio returns.
    #[default]
    Historical,
    /// Normal approximation from the sample mean and standard deviation.
    Parametric,
}

impl FromStr for VarMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "historical" => Ok(VarMethod::Historical),
            "parametric" => Ok(VarMethod::Parametric),
            other => Err(EngineError::invalid("method", format!("unknown VaR method '{other}'"))),
        }
    }
}

/// Everything the engine reports about one weighted portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub assets: Vec<AssetId>,
    pub weights: PortfolioWeights,
    pub metrics: PortfolioMetrics,
    pub sortino: f64,
    pub confidence: f64,
    pub historical_var: f64,
    pub parametric_var: f64,
    /// `None` when no observation is worse than historical VaR.
    pub conditional_var: Option<f64>,
}

impl fmt::Display for RiskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Portfolio Risk Report ===")?;
        for (asset, w) in self.weights.labelled(&self.assets) {
            writeln!(f, "  {:<10} {:>6.2}%", asset, w * 100.0)?;
        }
        writeln!(f, "{}", self.metrics)?;
        writeln!(f, "Sortino:       {:>8.3}", self.sortino)?;
        let pct = self.confidence * 100.0;
        writeln!(f, "VaR {pct:.0}% (historical): {:>7.2}%", self.historical_var * 100.0)?;
        writeln!(f, "VaR {pct:.0}% (parametric): {:>7.2}%", self.parametric_var * 100.0)?;
        match self.conditional_var {
            Some(cvar) => writeln!(f, "CVaR {pct:.0}%:            {:>7.2}%", cvar * 100.0),
            None => writeln!(f, "CVaR {pct:.0}%:            undefined"),
        }
    }
}

/// Stateless portfolio analytics over a return matrix.
pub struct PortfolioEngine;

impl PortfolioEngine {
    /// Annualized return (`252 · μ·w`), volatility (`√(wᵀ·252Σ·w)`) and Sharpe.
    ///
    /// # Examples
    ///
    /// ```
    /// use quant_engine::core::asset::AssetId;
    /// use quant_engine::core::series::ReturnMatrix;
    /// use quant_engine::optimization::portfolio::{PortfolioEngine, PortfolioWeights};
    ///
    /// let returns = ReturnMatrix::new(
    ///     vec![AssetId::new("A"), AssetId::new("B")],
    ///     vec![vec![0.01, 0.02], vec![-0.01, 0.0], vec![0.02, 0.01]],
    /// )
    /// .unwrap();
    /// let m = PortfolioEngine::metrics(&returns, &PortfolioWeights::equal(2).unwrap()).unwrap();
    /// assert!(m.volatility > 0.0);
    /// ```
    pub fn metrics(returns: &ReturnMatrix, weights: &PortfolioWeights) -> EngineResult<PortfolioMetrics> {
        weights.check_matches(returns)?;
        Ok(AnnualizedMoments::estimate(returns)?.evaluate(weights.values()))
    }

    /// Annualized excess return over `target` divided by annualized downside
    /// deviation. Zero when the downside deviation is zero or undefined.
    pub fn sortino(returns: &ReturnMatrix, weights: &PortfolioWeights, target: f64) -> EngineResult<f64> {
        weights.check_matches(returns)?;
        ensure_finite("target", target)?;
        let portfolio = returns.portfolio_returns(weights.values())?;
        let excess = TRADING_DAYS * stats::mean(&portfolio) - target;

        let threshold = target / TRADING_DAYS;
        let downside: Vec<f64> = portfolio.into_iter().filter(|r| *r < threshold).collect();
        let deviation = match stats::sample_std(&downside) {
            Some(sd) => sd * TRADING_DAYS.sqrt(),
            None => {
                debug!("{} downside observations, Sortino set to 0", downside.len());
                return Ok(0.0);
            }
        };
        if deviation == 0.0 {
            return Ok(0.0);
        }
        Ok(excess / deviation)
    }

    /// One-period VaR as a positive loss fraction.
    pub fn value_at_risk(
        returns: &ReturnMatrix,
        weights: &PortfolioWeights,
        confidence: f64,
        method: VarMethod,
    ) -> EngineResult<f64> {
        weights.check_matches(returns)?;
        ensure_confidence(confidence)?;
        let portfolio = returns.portfolio_returns(weights.values())?;
        match method {
            VarMethod::Historical => Ok(-stats::percentile(&portfolio, (1.0 - confidence) * 100.0)),
            VarMethod::Parametric => {
                let sd = stats::sample_std(&portfolio).ok_or_else(|| {
                    EngineError::DataUnavailable("parametric VaR needs at least 2 observations".into())
                })?;
                let z = stats::norm_ppf(&stats::standard_normal()?, 1.0 - confidence);
                Ok(-(stats::mean(&portfolio) + z * sd))
            }
        }
    }

    /// Mean loss of the periods strictly worse than historical VaR.
    pub fn conditional_var(returns: &ReturnMatrix, weights: &PortfolioWeights, confidence: f64) -> EngineResult<f64> {
        let var = Self::value_at_risk(returns, weights, confidence, VarMethod::Historical)?;
        let portfolio = returns.portfolio_returns(weights.values())?;
        tail_mean_loss(&portfolio, var)
    }

    /// Apply one shock per asset; see [`stress_test::stress_test`].
    pub fn stress_test(
        returns: &ReturnMatrix,
        weights: &PortfolioWeights,
        scenario: &str,
        shocks: &[f64],
    ) -> EngineResult<StressTestResult> {
        stress_test::stress_test(returns, weights, scenario, shocks)
    }

    /// Shocks keyed by asset; unlisted assets take no shock.
    pub fn stress_test_keyed(
        returns: &ReturnMatrix,
        weights: &PortfolioWeights,
        scenario: &str,
        shocks: &BTreeMap<AssetId, f64>,
    ) -> EngineResult<StressTestResult> {
        stress_test::stress_test_keyed(returns, weights, scenario, shocks)
    }

    /// Every registry scenario, shocking all assets by its `category` value.
    pub fn compare_scenarios(
        returns: &ReturnMatrix,
        weights: &PortfolioWeights,
        category: ShockCategory,
    ) -> EngineResult<Vec<StressTestResult>> {
        stress_test::compare_scenarios(returns, weights, category)
    }

    /// Metrics, Sortino (target 0), both VaR estimates and CVaR in one pass.
    pub fn risk_report(returns: &ReturnMatrix, weights: &PortfolioWeights, confidence: f64) -> EngineResult<RiskReport> {
        debug!(
            "risk report over {} periods x {} assets",
            returns.n_periods(),
            returns.n_assets()
        );
        let conditional_var = match Self::conditional_var(returns, weights, confidence) {
            Ok(cvar) => Some(cvar),
            Err(EngineError::NumericDegenerate(_)) => None,
            Err(e) => return Err(e),
        };
        Ok(RiskReport {
            assets: returns.assets().to_vec(),
            weights: weights.clone(),
            metrics: Self::metrics(returns, weights)?,
            sortino: Self::sortino(returns, weights, 0.0)?,
            confidence,
            historical_var: Self::value_at_risk(returns, weights, confidence, VarMethod::Historical)?,
            parametric_var: Self::value_at_risk(returns, weights, confidence, VarMethod::Parametric)?,
            conditional_var,
        })
    }
}
