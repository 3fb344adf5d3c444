//! Monte Carlo price paths under geometric Brownian motion.
//!
//! Each step applies the exact lognormal update
//!
//! ```text
//! S(t) = S(t-1) · exp((μ − σ²/2)·dt + σ·√dt·Z)
//! ```
//!
//! Draws are taken step-major (one variate per path for step 1, then step 2,
//! ...) from a single seeded generator, so a fixed seed reproduces the whole
//! path set exactly.

use crate::core::error::{ensure_confidence, ensure_finite, ensure_positive, EngineError, EngineResult};
use crate::core::stats;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Seed used when the caller does not ask for independent draws.
pub const DEFAULT_SEED: u64 = 42;

/// Discretization and seeding for the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Step size in years.
    pub step_size: f64,
    /// RNG seed. Pass a different seed for an independent path set.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step_size: 1.0 / 252.0,
            seed: DEFAULT_SEED,
        }
    }
}

/// Parameters of the lognormal price process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GbmParams {
    /// Initial price S0.
    pub spot: f64,
    /// Annualized drift μ.
    pub drift: f64,
    /// Annualized volatility σ.
    pub volatility: f64,
    /// Horizon in years.
    pub horizon_years: f64,
}

impl GbmParams {
    pub fn new(spot: f64, drift: f64, volatility: f64, horizon_years: f64) -> EngineResult<Self> {
        let params = Self {
            spot,
            drift,
            volatility,
            horizon_years,
        };
        params.validate()?;
        Ok(params)
    }

    /// Re-check fields that may have been set directly or deserialized.
    pub fn validate(&self) -> EngineResult<()> {
        let Self {
            spot,
            drift,
            volatility,
            horizon_years,
        } = *self;
        ensure_positive("spot", spot)?;
        ensure_finite("drift", drift)?;
        ensure_finite("volatility", volatility)?;
        if volatility < 0.0 {
            return Err(EngineError::invalid(
                "volatility",
                format!("must be non-negative, got {volatility}"),
            ));
        }
        ensure_positive("horizon_years", horizon_years)?;
        Ok(())
    }

    /// Number of discrete steps for a given step size.
    pub fn steps(&self, step_size: f64) -> usize {
        (self.horizon_years / step_size).round() as usize
    }
}

/// One simulated price path, index 0 being the initial price.
pub type SimulationPath = Vec<f64>;

/// A set of independently drawn paths sharing the same parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPathSet")]
pub struct PathSet {
    params: GbmParams,
    config: SimulationConfig,
    paths: Vec<SimulationPath>,
}

#[derive(Deserialize)]
struct RawPathSet {
    params: GbmParams,
    config: SimulationConfig,
    paths: Vec<SimulationPath>,
}

impl TryFrom<RawPathSet> for PathSet {
    type Error = EngineError;

    fn try_from(raw: RawPathSet) -> Result<Self, Self::Error> {
        PathSet::new(raw.params, raw.config, raw.paths)
    }
}

impl PathSet {
    /// Assemble a path set from precomputed paths.
    ///
    /// There must be at least one path, all of the same length (at least two
    /// prices), each starting at `params.spot` with finite positive prices.
    pub fn new(params: GbmParams, config: SimulationConfig, paths: Vec<SimulationPath>) -> EngineResult<Self> {
        params.validate()?;
        ensure_positive("step_size", config.step_size)?;
        let width = match paths.first() {
            Some(p) => p.len(),
            None => return Err(EngineError::DataUnavailable("path set has no paths".into())),
        };
        if width < 2 {
            return Err(EngineError::invalid("paths", "each path needs at least one step"));
        }
        for (i, path) in paths.iter().enumerate() {
            if path.len() != width {
                return Err(EngineError::invalid(
                    "paths",
                    format!("path {i} has {} prices, expected {width}", path.len()),
                ));
            }
            if path[0] != params.spot {
                return Err(EngineError::invalid(
                    "paths",
                    format!("path {i} starts at {} instead of spot {}", path[0], params.spot),
                ));
            }
            if path.iter().any(|s| !s.is_finite() || *s <= 0.0) {
                return Err(EngineError::invalid("paths", format!("path {i} has a non-positive price")));
            }
        }
        Ok(Self { params, config, paths })
    }

    pub fn params(&self) -> &GbmParams {
        &self.params
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn paths(&self) -> &[SimulationPath] {
        &self.paths
    }

    /// Number of paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Number of time steps N; every path has N + 1 prices.
    pub fn steps(&self) -> usize {
        self.paths.first().map_or(0, |p| p.len().saturating_sub(1))
    }

    pub fn final_prices(&self) -> Vec<f64> {
        self.paths.iter().filter_map(|p| p.last().copied()).collect()
    }

    /// Simple return of each path's final price relative to S0.
    pub fn final_returns(&self) -> Vec<f64> {
        let s0 = self.params.spot;
        self.final_prices().iter().map(|s| (s - s0) / s0).collect()
    }

    /// Cross-path average price at each step.
    pub fn mean_path(&self) -> Vec<f64> {
        let n = self.paths.len() as f64;
        (0..=self.steps())
            .map(|t| self.paths.iter().map(|p| p[t]).sum::<f64>() / n)
            .collect()
    }

    /// Loss threshold (positive fraction of S0) not exceeded with
    /// probability `confidence`.
    pub fn value_at_risk(&self, confidence: f64) -> EngineResult<f64> {
        ensure_confidence(confidence)?;
        Ok(-stats::percentile(&self.final_returns(), (1.0 - confidence) * 100.0))
    }

    /// Mean loss over the paths whose return is strictly worse than −VaR.
    ///
    /// Returns `NumericDegenerate` when no path breaches VaR, e.g. with zero
    /// volatility where every path ends at the same price.
    pub fn conditional_var(&self, confidence: f64) -> EngineResult<f64> {
        let var = self.value_at_risk(confidence)?;
        tail_mean_loss(&self.final_returns(), var)
    }
}

/// −mean of `returns` strictly below `−var`; `NumericDegenerate` on an empty tail.
pub(crate) fn tail_mean_loss(returns: &[f64], var: f64) -> EngineResult<f64> {
    let tail: Vec<f64> = returns.iter().copied().filter(|r| *r < -var).collect();
    if tail.is_empty() {
        return Err(EngineError::NumericDegenerate(format!(
            "no outcome is worse than VaR {var:.6}, CVaR is undefined"
        )));
    }
    Ok(-stats::mean(&tail))
}

/// Simulate `n_paths` GBM price paths.
///
/// # Examples
///
/// ```
/// use quant_engine::simulation::gbm::{simulate, GbmParams, SimulationConfig};
///
/// let params = GbmParams::new(100.0, 0.05, 0.2, 1.0).unwrap();
/// let paths = simulate(&params, 500, &SimulationConfig::default()).unwrap();
///
/// assert_eq!(paths.len(), 500);
/// assert_eq!(paths.steps(), 252);
/// assert!(paths.paths().iter().all(|p| p[0] == 100.0));
/// ```
pub fn simulate(params: &GbmParams, n_paths: usize, config: &SimulationConfig) -> EngineResult<PathSet> {
    params.validate()?;
    if n_paths == 0 {
        return Err(EngineError::invalid("n_paths", "must be at least 1"));
    }
    ensure_positive("step_size", config.step_size)?;
    let steps = params.steps(config.step_size);
    if steps == 0 {
        return Err(EngineError::invalid(
            "horizon_years",
            format!(
                "horizon {} is shorter than half a step of {}",
                params.horizon_years, config.step_size
            ),
        ));
    }

    debug!(
        "simulating {n_paths} GBM paths over {steps} steps (seed {})",
        config.seed
    );

    let dt = config.step_size;
    let drift = (params.drift - 0.5 * params.volatility.powi(2)) * dt;
    let diffusion = params.volatility * dt.sqrt();
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut paths: Vec<SimulationPath> = (0..n_paths)
        .map(|_| {
            let mut path = Vec::with_capacity(steps + 1);
            path.push(params.spot);
            path
        })
        .collect();

    for t in 1..=steps {
        for path in paths.iter_mut() {
            let z: f64 = rng.sample(StandardNormal);
            let next = path[t - 1] * (drift + diffusion * z).exp();
            path.push(next);
        }
    }

    Ok(PathSet {
        params: *params,
        config: *config,
        paths,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> GbmParams {
        GbmParams::new(100.0, 0.1, 0.3, 1.0).unwrap()
    }

    #[test]
    fn test_path_shape() {
        let set = simulate(&params(), 50, &SimulationConfig::default()).unwrap();
        assert_eq!(set.len(), 50);
        assert!(set.paths().iter().all(|p| p.len() == 253));
        assert!(set.paths().iter().all(|p| p[0] == 100.0));
        assert!(set.paths().iter().flatten().all(|s| *s > 0.0));
    }

    #[test]
    fn test_steps_are_rounded() {
        let p = GbmParams::new(100.0, 0.0, 0.2, 0.5).unwrap();
        let config = SimulationConfig {
            step_size: 0.3,
            ..Default::default()
        };
        // 0.5 / 0.3 = 1.67 rounds to 2
        let set = simulate(&p, 3, &config).unwrap();
        assert_eq!(set.steps(), 2);
    }

    #[test]
    fn test_same_seed_reproduces() {
        let a = simulate(&params(), 20, &SimulationConfig::default()).unwrap();
        let b = simulate(&params(), 20, &SimulationConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seed_differs() {
        let a = simulate(&params(), 20, &SimulationConfig::default()).unwrap();
        let b = simulate(
            &params(),
            20,
            &SimulationConfig {
                seed: 7,
                ..Default::default()
            },
        )
        .unwrap();
        assert_ne!(a.final_prices(), b.final_prices());
    }

    #[test]
    fn test_zero_volatility_is_deterministic_growth() {
        let p = GbmParams::new(100.0, 0.05, 0.0, 1.0).unwrap();
        let set = simulate(&p, 5, &SimulationConfig::default()).unwrap();
        for s in set.final_prices() {
            assert_relative_eq!(s, 100.0 * 0.05_f64.exp(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_driftless_mean_close_to_spot() {
        let p = GbmParams::new(100.0, 0.0, 0.2, 1.0).unwrap();
        let set = simulate(&p, 10_000, &SimulationConfig::default()).unwrap();
        let mean = stats::mean(&set.final_prices());
        assert!((mean - 100.0).abs() < 2.0, "mean final price {mean}");
    }

    #[test]
    fn test_mean_path_starts_at_spot() {
        let set = simulate(&params(), 100, &SimulationConfig::default()).unwrap();
        let mean = set.mean_path();
        assert_eq!(mean.len(), set.steps() + 1);
        assert_relative_eq!(mean[0], 100.0);
    }

    #[test]
    fn test_var_and_cvar() {
        let set = simulate(&params(), 2_000, &SimulationConfig::default()).unwrap();
        let var = set.value_at_risk(0.95).unwrap();
        let cvar = set.conditional_var(0.95).unwrap();
        assert!(var > 0.0);
        assert!(cvar >= var);
    }

    #[test]
    fn test_cvar_degenerate_without_volatility() {
        let p = GbmParams::new(100.0, 0.05, 0.0, 1.0).unwrap();
        let set = simulate(&p, 100, &SimulationConfig::default()).unwrap();
        assert!(matches!(
            set.conditional_var(0.95),
            Err(EngineError::NumericDegenerate(_))
        ));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(GbmParams::new(0.0, 0.1, 0.2, 1.0).is_err());
        assert!(GbmParams::new(100.0, 0.1, -0.2, 1.0).is_err());
        assert!(GbmParams::new(100.0, 0.1, 0.2, 0.0).is_err());
        assert!(simulate(&params(), 0, &SimulationConfig::default()).is_err());
        let set = simulate(&params(), 10, &SimulationConfig::default()).unwrap();
        assert!(set.value_at_risk(1.5).is_err());
    }

    #[test]
    fn test_unvalidated_params_are_rejected() {
        let raw = GbmParams {
            spot: -100.0,
            volatility: -0.5,
            ..params()
        };
        assert!(simulate(&raw, 3, &SimulationConfig::default()).is_err());
        let nan_drift = GbmParams {
            drift: f64::NAN,
            ..params()
        };
        assert!(simulate(&nan_drift, 3, &SimulationConfig::default()).is_err());
    }

    #[test]
    fn test_path_set_json_is_validated() {
        let set = simulate(&params(), 4, &SimulationConfig::default()).unwrap();
        let json = serde_json::to_string(&set).unwrap();
        let back: PathSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 4);
        assert_eq!(back.steps(), set.steps());

        let mut value = serde_json::to_value(&set).unwrap();
        value["paths"] = serde_json::json!([[100.0, 101.0, 102.0], [100.0]]);
        assert!(serde_json::from_value::<PathSet>(value.clone()).is_err());
        value["paths"] = serde_json::json!([]);
        assert!(serde_json::from_value::<PathSet>(value).is_err());
    }

    #[test]
    fn test_path_set_from_parts() {
        let p = params();
        let set = PathSet::new(p, SimulationConfig::default(), vec![vec![100.0, 110.0], vec![100.0, 90.0]]).unwrap();
        assert_eq!(set.steps(), 1);
        assert_eq!(set.mean_path(), vec![100.0, 100.0]);
        assert!(PathSet::new(p, SimulationConfig::default(), vec![vec![100.0]]).is_err());
        assert!(PathSet::new(p, SimulationConfig::default(), vec![vec![50.0, 60.0]]).is_err());
    }
}
