//! quant-engine CLI
//!
//! Run the analytics engine from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Monte Carlo paths with VaR/CVaR
//! quant-engine simulate --spot 100 --drift 0.08 --volatility 0.25 --horizon 1 --paths 5000
//!
//! # Option price and Greeks
//! quant-engine option --spot 100 --strike 105 --expiry 0.5 --rate 0.03 --volatility 0.2 --kind put
//!
//! # Portfolio risk from a market-data file, as JSON
//! quant-engine portfolio --data prices.json --weights 0.6,0.4 --format json
//!
//! # Stress every historical scenario
//! quant-engine stress --data prices.json --category equity
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use quant_engine::core::asset::AssetId;
use quant_engine::core::config::EngineConfig;
use quant_engine::core::series::{Frequency, PriceSeries, ReturnMatrix};
use quant_engine::core::yield_curve::{basis_points_to_percent, CurveShift, Maturity, YieldCurve};
use quant_engine::optimization::frontier::{efficient_frontier, optimize, FrontierPoint, LabelledPoint, Objective};
use quant_engine::optimization::portfolio::{PortfolioEngine, PortfolioWeights};
use quant_engine::pricing::bond::{BondPricer, BondSpec, BondValuation, CouponFrequency};
use quant_engine::pricing::hedge::{contracts_for_ratio, hedge_scenarios, HedgeOutcome};
use quant_engine::pricing::option::{Greeks, OptionKind, OptionParams, OptionPricer};
use quant_engine::pricing::strategy::{price_grid, Strategy, StrategyPreset};
use quant_engine::pricing::swap::{swap_cashflows, FloatingRateScenario};
use quant_engine::simulation::gbm::{simulate, GbmParams};
use quant_engine::simulation::stress_test::{ShockCategory, StressScenario, StressTestResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;

/// Stateless quantitative analytics: simulation, pricing and portfolio risk
#[derive(Parser)]
#[command(name = "quant-engine")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON engine configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate GBM price paths and report path VaR/CVaR
    Simulate {
        #[arg(long)]
        spot: f64,
        #[arg(long, allow_negative_numbers = true)]
        drift: f64,
        #[arg(long)]
        volatility: f64,
        /// Horizon in years
        #[arg(long, default_value = "1.0")]
        horizon: f64,
        #[arg(long, default_value = "1000")]
        paths: usize,
        /// Override the configured seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Price a fixed-coupon bond
    Bond {
        #[arg(long, default_value = "1000")]
        face: f64,
        /// Annual coupon rate as a fraction
        #[arg(long)]
        coupon: f64,
        /// Yield to maturity as a fraction
        #[arg(long, allow_negative_numbers = true)]
        ytm: f64,
        /// Number of coupon periods
        #[arg(long)]
        periods: u32,
        #[arg(long, default_value = "semi-annual")]
        frequency: CouponFrequency,
    },

    /// Shift a treasury yield curve
    Curve {
        /// JSON yield snapshot keyed by maturity label; the sample curve is used when absent
        #[arg(long)]
        snapshot: Option<String>,
        #[arg(long, default_value = "parallel")]
        shift: CurveShift,
        /// Shift in basis points
        #[arg(long, allow_negative_numbers = true, default_value = "50")]
        bp: f64,
    },

    /// Black-Scholes price and Greeks
    #[command(name = "option")]
    OptionPrice {
        #[arg(long)]
        spot: f64,
        #[arg(long)]
        strike: f64,
        /// Time to expiry in years
        #[arg(long)]
        expiry: f64,
        #[arg(long, allow_negative_numbers = true, default_value = "0.0")]
        rate: f64,
        #[arg(long)]
        volatility: f64,
        #[arg(long, default_value = "call")]
        kind: OptionKind,
    },

    /// Payoff profile of a preset option strategy
    Strategy {
        #[arg(long)]
        preset: StrategyPreset,
        #[arg(long, default_value = "100")]
        spot: f64,
        /// Grid points between 60% and 140% of spot
        #[arg(long, default_value = "100")]
        points: usize,
    },

    /// Futures hedge P&L across price moves
    Hedge {
        #[arg(long)]
        position: Decimal,
        /// Futures price
        #[arg(long)]
        price: Decimal,
        /// Signed number of contracts; negative is short
        #[arg(long, allow_negative_numbers = true, conflicts_with = "ratio")]
        contracts: Option<Decimal>,
        /// Hedge ratio used to size the contracts instead
        #[arg(long)]
        ratio: Option<Decimal>,
        /// Comma-separated fractional moves
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, default_value = "-0.2,-0.1,-0.05,0,0.05,0.1,0.2")]
        moves: Vec<Decimal>,
    },

    /// Interest rate swap cash flows
    Swap {
        #[arg(long, default_value = "10000000")]
        notional: Decimal,
        #[arg(long)]
        fixed_rate: Decimal,
        #[arg(long, default_value = "10")]
        periods: u32,
        #[arg(long, value_enum, default_value_t = RateTrend::Rising)]
        trend: RateTrend,
        /// Floating base rate; defaults to the fixed rate
        #[arg(long)]
        base_rate: Option<Decimal>,
    },

    /// Portfolio metrics, VaR and CVaR
    Portfolio {
        #[command(flatten)]
        data: MarketDataArgs,
    },

    /// Sampled efficient frontier and its optimal points
    Frontier {
        #[command(flatten)]
        data: MarketDataArgs,
        /// Override the configured number of draws
        #[arg(long)]
        draws: Option<usize>,
    },

    /// Stress a portfolio with historical scenarios
    Stress {
        #[command(flatten)]
        data: MarketDataArgs,
        #[arg(long, default_value = "equity")]
        category: ShockCategory,
        /// Run a single registry scenario instead of all of them
        #[arg(long)]
        scenario: Option<String>,
        /// Portfolio value used for loss amounts
        #[arg(long, default_value = "1000000")]
        value: f64,
    },

    /// List the historical stress scenarios
    Scenarios,
}

#[derive(clap::Args)]
struct MarketDataArgs {
    /// JSON market-data file: {"series": {"AAPL": [["2024-01-02T00:00:00Z", 185.6], ...]}}
    #[arg(long)]
    data: String,
    /// Comma-separated raw weights in asset order; equal weight when absent
    #[arg(long, value_delimiter = ',')]
    weights: Option<Vec<f64>>,
    #[arg(long, default_value = "daily")]
    sampling: Frequency,
}

#[derive(Clone, Copy, ValueEnum)]
enum RateTrend {
    Rising,
    Falling,
    Random,
}

#[derive(Deserialize)]
struct MarketDataFile {
    series: BTreeMap<String, PriceSeries>,
}

fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let content = fs::read_to_string(path).with_context(|| format!("reading config file '{path}'"))?;
    EngineConfig::from_json(&content).with_context(|| format!("parsing config file '{path}'"))
}

type AssetSeries = Vec<(AssetId, PriceSeries)>;

fn load_returns(args: &MarketDataArgs) -> Result<(AssetSeries, ReturnMatrix, PortfolioWeights)> {
    let content = fs::read_to_string(&args.data).with_context(|| format!("reading market data '{}'", args.data))?;
    let file: MarketDataFile =
        serde_json::from_str(&content).with_context(|| format!("parsing market data '{}'", args.data))?;

    let series: AssetSeries = file
        .series
        .into_iter()
        .map(|(symbol, s)| (AssetId::new(symbol), s.resample(args.sampling)))
        .collect();
    let returns = ReturnMatrix::from_price_series(&series)?;
    info!(
        "loaded {} assets over {} periods",
        returns.n_assets(),
        returns.n_periods()
    );

    let weights = match &args.weights {
        Some(raw) => PortfolioWeights::new(raw.clone())?,
        None => PortfolioWeights::equal(returns.n_assets())?,
    };
    if weights.len() != returns.n_assets() {
        bail!(
            "{} weights given for {} assets with data ({})",
            weights.len(),
            returns.n_assets(),
            returns
                .assets()
                .iter()
                .map(|a| a.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok((series, returns, weights))
}

/// Latest annualized rolling volatility of each asset.
fn print_rolling_volatility(series: &AssetSeries, sampling: Frequency, window: usize) -> Result<()> {
    println!("Rolling {window}-period volatility:");
    for (asset, s) in series {
        match s.returns(sampling).rolling_volatility(window)?.last() {
            Some((ts, vol)) => println!("  {:<10} {:>7.2}%  (as of {})", asset, vol * 100.0, ts.date_naive()),
            None => println!("  {:<10} not enough data", asset),
        }
    }
    Ok(())
}

fn emit<T: Serialize + fmt::Display>(format: OutputFormat, value: &T) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{value}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

#[derive(Serialize)]
struct SimulationSummary {
    paths: usize,
    steps: usize,
    mean_final_price: f64,
    confidence: f64,
    var: f64,
    cvar: Option<f64>,
    mean_path: Vec<f64>,
}

impl fmt::Display for SimulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Monte Carlo Simulation ===")?;
        writeln!(f, "Paths: {}  Steps: {}", self.paths, self.steps)?;
        writeln!(f, "Mean final price: {:.4}", self.mean_final_price)?;
        let pct = self.confidence * 100.0;
        writeln!(f, "VaR {pct:.0}%:  {:.2}%", self.var * 100.0)?;
        match self.cvar {
            Some(c) => write!(f, "CVaR {pct:.0}%: {:.2}%", c * 100.0),
            None => write!(f, "CVaR {pct:.0}%: undefined (no path breaches VaR)"),
        }
    }
}

fn cmd_simulate(
    config: &EngineConfig,
    spot: f64,
    drift: f64,
    volatility: f64,
    horizon: f64,
    n_paths: usize,
    seed: Option<u64>,
) -> Result<SimulationSummary> {
    let params = GbmParams::new(spot, drift, volatility, horizon)?;
    let mut sim = config.simulation;
    if let Some(seed) = seed {
        sim.seed = seed;
    }
    let set = simulate(&params, n_paths, &sim)?;
    let finals = set.final_prices();
    Ok(SimulationSummary {
        paths: set.len(),
        steps: set.steps(),
        mean_final_price: finals.iter().sum::<f64>() / finals.len() as f64,
        confidence: config.confidence,
        var: set.value_at_risk(config.confidence)?,
        cvar: set.conditional_var(config.confidence).ok(),
        mean_path: set.mean_path(),
    })
}

#[derive(Serialize)]
struct BondReport {
    bond: BondSpec,
    valuation: BondValuation,
    profile: Vec<BondValuation>,
}

impl fmt::Display for BondReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Bond: {} ===", self.bond)?;
        writeln!(f, "Price at {:.3}%: {:.4}", self.valuation.ytm * 100.0, self.valuation.price)?;
        writeln!(f, "Macaulay duration: {:.4} years", self.valuation.duration)?;
        writeln!(f, "{:>8} {:>12} {:>10}", "YTM", "Price", "Duration")?;
        for v in &self.profile {
            writeln!(f, "{:>7.2}% {:>12.4} {:>10.4}", v.ytm * 100.0, v.price, v.duration)?;
        }
        Ok(())
    }
}

fn cmd_bond(face: f64, coupon: f64, ytm: f64, periods: u32, frequency: CouponFrequency) -> Result<BondReport> {
    let bond = BondSpec::new(face, coupon, periods, frequency)?;
    let grid: Vec<f64> = (-4..=4).map(|i| ytm + 0.005 * i as f64).filter(|y| *y >= 0.0).collect();
    Ok(BondReport {
        bond,
        valuation: BondPricer::valuation(&bond, ytm)?,
        profile: BondPricer::price_yield_profile(&bond, &grid)?,
    })
}

#[derive(Serialize)]
struct CurveReport {
    shift: CurveShift,
    magnitude_percent: f64,
    base: YieldCurve,
    shifted: YieldCurve,
}

impl fmt::Display for CurveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "=== Yield Curve: {:?} shift of {:+.2} pts ===",
            self.shift, self.magnitude_percent
        )?;
        writeln!(f, "{:>5} {:>8} {:>8} {:>8}", "", "Base", "Shifted", "Change")?;
        for m in Maturity::ALL {
            let (b, s) = (self.base.get(m), self.shifted.get(m));
            writeln!(f, "{:>5} {:>8.3} {:>8.3} {:>+8.3}", m, b, s, s - b)?;
        }
        Ok(())
    }
}

fn cmd_curve(snapshot: Option<&str>, shift: CurveShift, bp: f64) -> Result<CurveReport> {
    let base = match snapshot {
        Some(path) => {
            let content = fs::read_to_string(path).with_context(|| format!("reading yield snapshot '{path}'"))?;
            let raw: BTreeMap<Maturity, f64> =
                serde_json::from_str(&content).with_context(|| format!("parsing yield snapshot '{path}'"))?;
            YieldCurve::from_partial(&raw)
        }
        None => {
            info!("no yield snapshot given, using the sample curve");
            YieldCurve::fallback()
        }
    };
    let magnitude_percent = basis_points_to_percent(bp);
    let shifted = base.shift(shift, magnitude_percent)?;
    Ok(CurveReport {
        shift,
        magnitude_percent,
        base,
        shifted,
    })
}

#[derive(Serialize)]
struct OptionReport {
    kind: OptionKind,
    params: OptionParams,
    price: f64,
    greeks: Greeks,
}

impl fmt::Display for OptionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "=== European {} S={} K={} T={} ===",
            self.kind, self.params.spot, self.params.strike, self.params.expiry
        )?;
        writeln!(f, "Price: {:.4}", self.price)?;
        write!(f, "{}", self.greeks)
    }
}

#[derive(Serialize)]
struct HedgeTable {
    contracts: Decimal,
    outcomes: Vec<HedgeOutcome>,
}

impl fmt::Display for HedgeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Futures Hedge ({} contracts) ===", self.contracts.round_dp(2))?;
        writeln!(f, "{:>8} {:>16} {:>16} {:>16} {:>10}", "Move", "Position", "Hedge", "Total", "Eff.")?;
        for o in &self.outcomes {
            writeln!(
                f,
                "{:>7}% {:>16} {:>16} {:>16} {:>9.1}%",
                (o.price_move * Decimal::from(100)).normalize(),
                o.position_pl.round_dp(2),
                o.hedge_pl.round_dp(2),
                o.total_pl.round_dp(2),
                o.hedge_efficiency * 100.0
            )?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct FrontierSummary {
    assets: Vec<AssetId>,
    draws: usize,
    max_sharpe: FrontierPoint,
    min_variance: FrontierPoint,
}

impl fmt::Display for FrontierSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Efficient Frontier ({} draws) ===", self.draws)?;
        writeln!(f, "-- Max Sharpe (draw {}) --", self.max_sharpe.draw_index)?;
        write!(
            f,
            "{}",
            LabelledPoint {
                assets: &self.assets,
                point: &self.max_sharpe
            }
        )?;
        writeln!(f, "-- Min Variance (draw {}) --", self.min_variance.draw_index)?;
        write!(
            f,
            "{}",
            LabelledPoint {
                assets: &self.assets,
                point: &self.min_variance
            }
        )
    }
}

#[derive(Serialize)]
struct StressReport {
    portfolio_value: f64,
    results: Vec<StressTestResult>,
}

impl fmt::Display for StressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<28} {:>10} {:>16}", "Scenario", "Shock", "P&L")?;
        for r in &self.results {
            writeln!(
                f,
                "{:<28} {:>+9.2}% {:>+16.0}",
                r.scenario,
                r.portfolio_shock * 100.0,
                r.loss_amount(self.portfolio_value)
            )?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ScenarioList(Vec<StressScenario>);

impl fmt::Display for ScenarioList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for s in &self.0 {
            writeln!(f, "{s}")?;
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let format = cli.format;

    match cli.command {
        Commands::Simulate {
            spot,
            drift,
            volatility,
            horizon,
            paths,
            seed,
        } => emit(format, &cmd_simulate(&config, spot, drift, volatility, horizon, paths, seed)?),
        Commands::Bond {
            face,
            coupon,
            ytm,
            periods,
            frequency,
        } => emit(format, &cmd_bond(face, coupon, ytm, periods, frequency)?),
        Commands::Curve { snapshot, shift, bp } => emit(format, &cmd_curve(snapshot.as_deref(), shift, bp)?),
        Commands::OptionPrice {
            spot,
            strike,
            expiry,
            rate,
            volatility,
            kind,
        } => {
            let params = OptionParams::new(spot, strike, expiry, rate, volatility)?;
            let report = OptionReport {
                kind,
                params,
                price: OptionPricer::price(&params, kind)?,
                greeks: OptionPricer::greeks(&params, kind)?,
            };
            emit(format, &report)
        }
        Commands::Strategy { preset, spot, points } => {
            let strategy = Strategy::from_preset(preset, spot)?;
            let grid = price_grid(spot, 0.6, 1.4, points)?;
            emit(format, &strategy.profile(&grid)?)
        }
        Commands::Hedge {
            position,
            price,
            contracts,
            ratio,
            moves,
        } => {
            let contracts = match (contracts, ratio) {
                (Some(c), _) => c,
                (None, Some(r)) => contracts_for_ratio(position, price, r)?,
                (None, None) => contracts_for_ratio(position, price, Decimal::ONE)?,
            };
            let outcomes = hedge_scenarios(position, price, contracts, &moves)?;
            emit(format, &HedgeTable { contracts, outcomes })
        }
        Commands::Swap {
            notional,
            fixed_rate,
            periods,
            trend,
            base_rate,
        } => {
            let scenario = match trend {
                RateTrend::Rising => FloatingRateScenario::Rising,
                RateTrend::Falling => FloatingRateScenario::Falling,
                RateTrend::Random => FloatingRateScenario::Random {
                    seed: config.simulation.seed,
                },
            };
            let rates = scenario.rates(base_rate.unwrap_or(fixed_rate), periods)?;
            emit(format, &swap_cashflows(notional, fixed_rate, &rates, periods)?)
        }
        Commands::Portfolio { data } => {
            let (series, returns, weights) = load_returns(&data)?;
            emit(format, &PortfolioEngine::risk_report(&returns, &weights, config.confidence)?)?;
            if matches!(format, OutputFormat::Text) {
                print_rolling_volatility(&series, data.sampling, config.rolling_window)?;
            }
            Ok(())
        }
        Commands::Frontier { data, draws } => {
            let (_, returns, _) = load_returns(&data)?;
            let mut frontier_config = config.frontier;
            if let Some(n) = draws {
                frontier_config.n_draws = n;
            }
            let frontier = efficient_frontier(&returns, &frontier_config)?;
            let summary = FrontierSummary {
                assets: frontier.assets.clone(),
                draws: frontier.len(),
                max_sharpe: optimize(&frontier, Objective::MaxSharpe)?.clone(),
                min_variance: optimize(&frontier, Objective::MinVariance)?.clone(),
            };
            emit(format, &summary)
        }
        Commands::Stress {
            data,
            category,
            scenario,
            value,
        } => {
            let (_, returns, weights) = load_returns(&data)?;
            let results = match scenario {
                Some(key) => {
                    let s = StressScenario::by_key(&key)?;
                    let shocks = s.uniform_shocks(category, returns.n_assets())?;
                    vec![PortfolioEngine::stress_test(&returns, &weights, s.name, &shocks)?]
                }
                None => PortfolioEngine::compare_scenarios(&returns, &weights, category)?,
            };
            emit(
                format,
                &StressReport {
                    portfolio_value: value,
                    results,
                },
            )
        }
        Commands::Scenarios => emit(format, &ScenarioList(StressScenario::registry().to_vec())),
    }
}
