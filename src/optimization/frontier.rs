//! Efficient frontier by random weight sampling.
//!
//! Each draw takes a uniform `[0, 1)` raw weight per asset from a seeded
//! generator, normalizes it, and scores the portfolio with the same annualized
//! moments used by [`PortfolioEngine::metrics`](super::portfolio::PortfolioEngine::metrics).
//! [`optimize`] is a discrete argmax/argmin over the sampled points, so its
//! accuracy improves with the number of draws.

use crate::core::asset::AssetId;
use crate::core::error::{EngineError, EngineResult};
use crate::core::series::ReturnMatrix;
use crate::optimization::portfolio::{AnnualizedMoments, PortfolioMetrics, PortfolioWeights};
use crate::simulation::gbm::DEFAULT_SEED;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sampling settings for [`efficient_frontier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontierConfig {
    pub n_draws: usize,
    pub seed: u64,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            n_draws: 5000,
            seed: DEFAULT_SEED,
        }
    }
}

/// One sampled portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub weights: PortfolioWeights,
    pub annual_return: f64,
    pub volatility: f64,
    pub sharpe: f64,
    /// Position of this draw in the sampling sequence.
    pub draw_index: usize,
}

impl FrontierPoint {
    pub fn metrics(&self) -> PortfolioMetrics {
        PortfolioMetrics {
            annual_return: self.annual_return,
            volatility: self.volatility,
            sharpe: self.sharpe,
        }
    }
}

/// All sampled points, in draw order, with the assets their weights refer to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frontier {
    pub assets: Vec<AssetId>,
    pub points: Vec<FrontierPoint>,
}

impl Frontier {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Selection rule over a sampled frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    MaxSharpe,
    MinVariance,
}

impl FromStr for Objective {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "max_sharpe" => Ok(Objective::MaxSharpe),
            "min_variance" => Ok(Objective::MinVariance),
            other => Err(EngineError::invalid("objective", format!("unknown objective '{other}'"))),
        }
    }
}

/// Sample `config.n_draws` long-only portfolios.
///
/// # Examples
///
/// ```
/// use quant_engine::core::asset::AssetId;
/// use quant_engine::core::series::ReturnMatrix;
/// use quant_engine::optimization::frontier::{efficient_frontier, optimize, FrontierConfig, Objective};
///
/// let returns = ReturnMatrix::new(
///     vec![AssetId::new("A"), AssetId::new("B")],
///     vec![vec![0.01, -0.004], vec![-0.006, 0.002], vec![0.012, 0.001], vec![0.002, 0.003]],
/// )
/// .unwrap();
/// let config = FrontierConfig { n_draws: 200, ..Default::default() };
/// let frontier = efficient_frontier(&returns, &config).unwrap();
/// let best = optimize(&frontier, Objective::MaxSharpe).unwrap();
/// assert!(frontier.points.iter().all(|p| p.sharpe <= best.sharpe));
/// ```
pub fn efficient_frontier(returns: &ReturnMatrix, config: &FrontierConfig) -> EngineResult<Frontier> {
    if config.n_draws == 0 {
        return Err(EngineError::invalid("n_draws", "must be at least 1"));
    }
    let moments = AnnualizedMoments::estimate(returns)?;
    let n_assets = returns.n_assets();
    debug!(
        "sampling {} frontier portfolios over {} assets (seed {})",
        config.n_draws, n_assets, config.seed
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut points = Vec::with_capacity(config.n_draws);
    let mut draw_index = 0;
    while points.len() < config.n_draws {
        let raw: Vec<f64> = (0..n_assets).map(|_| rng.gen::<f64>()).collect();
        // An all-zero draw has no direction; skip it and keep the sequence going.
        let Ok(weights) = PortfolioWeights::new(raw) else {
            draw_index += 1;
            continue;
        };
        let m = moments.evaluate(weights.values());
        points.push(FrontierPoint {
            weights,
            annual_return: m.annual_return,
            volatility: m.volatility,
            sharpe: m.sharpe,
            draw_index,
        });
        draw_index += 1;
    }

    Ok(Frontier {
        assets: returns.assets().to_vec(),
        points,
    })
}

/// Best sampled point for `objective`. The earliest draw wins ties.
pub fn optimize(frontier: &Frontier, objective: Objective) -> EngineResult<&FrontierPoint> {
    let mut points = frontier.points.iter();
    let first = points
        .next()
        .ok_or_else(|| EngineError::DataUnavailable("frontier has no points".into()))?;
    Ok(points.fold(first, |best, p| {
        let better = match objective {
            Objective::MaxSharpe => p.sharpe > best.sharpe,
            Objective::MinVariance => p.volatility < best.volatility,
        };
        if better {
            p
        } else {
            best
        }
    }))
}

/// A frontier point rendered with its asset labels.
pub struct LabelledPoint<'a> {
    pub assets: &'a [AssetId],
    pub point: &'a FrontierPoint,
}

impl fmt::Display for LabelledPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.point.metrics())?;
        for (asset, w) in self.point.weights.labelled(self.assets) {
            writeln!(f, "  {:<10} {:>6.2}%", asset, w * 100.0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn returns() -> ReturnMatrix {
        ReturnMatrix::new(
            vec![AssetId::new("A"), AssetId::new("B"), AssetId::new("C")],
            vec![
                vec![0.010, -0.004, 0.003],
                vec![-0.006, 0.002, 0.001],
                vec![0.012, 0.001, -0.002],
                vec![0.002, 0.003, 0.004],
                vec![-0.004, -0.001, 0.002],
            ],
        )
        .unwrap()
    }

    fn config(n_draws: usize) -> FrontierConfig {
        FrontierConfig {
            n_draws,
            ..Default::default()
        }
    }

    #[test]
    fn test_frontier_size_and_weights() {
        let frontier = efficient_frontier(&returns(), &config(300)).unwrap();
        assert_eq!(frontier.len(), 300);
        for p in &frontier.points {
            assert_relative_eq!(p.weights.values().iter().sum::<f64>(), 1.0, epsilon = 1e-12);
            assert!(p.weights.values().iter().all(|w| *w >= 0.0));
        }
    }

    #[test]
    fn test_same_seed_same_frontier() {
        let a = efficient_frontier(&returns(), &config(100)).unwrap();
        let b = efficient_frontier(&returns(), &config(100)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_optimize_picks_extremes() {
        let frontier = efficient_frontier(&returns(), &config(500)).unwrap();
        let best = optimize(&frontier, Objective::MaxSharpe).unwrap();
        let safest = optimize(&frontier, Objective::MinVariance).unwrap();
        for p in &frontier.points {
            assert!(best.sharpe >= p.sharpe);
            assert!(safest.volatility <= p.volatility);
        }
    }

    #[test]
    fn test_ties_go_to_first_draw() {
        let w = PortfolioWeights::equal(1).unwrap();
        let point = |i| FrontierPoint {
            weights: w.clone(),
            annual_return: 0.1,
            volatility: 0.2,
            sharpe: 0.5,
            draw_index: i,
        };
        let frontier = Frontier {
            assets: vec![AssetId::new("A")],
            points: vec![point(0), point(1), point(2)],
        };
        assert_eq!(optimize(&frontier, Objective::MaxSharpe).unwrap().draw_index, 0);
        assert_eq!(optimize(&frontier, Objective::MinVariance).unwrap().draw_index, 0);
    }

    #[test]
    fn test_empty_frontier() {
        let frontier = Frontier {
            assets: vec![],
            points: vec![],
        };
        assert!(optimize(&frontier, Objective::MaxSharpe).is_err());
        assert!(efficient_frontier(&returns(), &config(0)).is_err());
    }

    #[test]
    fn test_objective_parsing() {
        assert_eq!("max-sharpe".parse::<Objective>().unwrap(), Objective::MaxSharpe);
        assert_eq!("min_variance".parse::<Objective>().unwrap(), Objective::MinVariance);
        assert!("max_return".parse::<Objective>().is_err());
    }
}
