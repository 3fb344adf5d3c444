//! # quant-engine
//!
//! Stateless quantitative analytics for single instruments and portfolios.
//!
//! Every operation is a synchronous function of its inputs. Randomness is
//! always drawn from an explicitly seeded generator, so a fixed seed gives
//! identical results.
//!
//! ## Architecture
//!
//! - **core** — Foundational types: errors, assets, price/return series, statistics, yield curves, configuration
//! - **simulation** — Monte Carlo GBM paths and scenario stress tests
//! - **pricing** — Bonds, Black-Scholes options, option strategies, futures hedges, interest rate swaps
//! - **optimization** — Portfolio metrics, VaR/CVaR and the sampled efficient frontier

pub mod core;
pub mod optimization;
pub mod pricing;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::core::asset::AssetId;
    pub use crate::core::config::EngineConfig;
    pub use crate::core::error::{EngineError, EngineResult};
    pub use crate::core::series::{Frequency, PriceSeries, ReturnMatrix, ReturnSeries};
    pub use crate::core::yield_curve::{CurveShift, Maturity, YieldCurve};
    pub use crate::optimization::frontier::{efficient_frontier, optimize, Frontier, FrontierConfig, Objective};
    pub use crate::optimization::portfolio::{PortfolioEngine, PortfolioMetrics, PortfolioWeights, VarMethod};
    pub use crate::pricing::bond::{BondPricer, BondSpec, CouponFrequency};
    pub use crate::pricing::option::{Greeks, OptionKind, OptionParams, OptionPricer};
    pub use crate::pricing::strategy::{Direction, OptionLeg, Strategy, StrategyPreset};
    pub use crate::simulation::gbm::{simulate, GbmParams, PathSet, SimulationConfig};
    pub use crate::simulation::stress_test::{ShockCategory, StressScenario, StressTestResult};
}
