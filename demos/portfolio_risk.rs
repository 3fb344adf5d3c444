//! Portfolio risk example.
//!
//! Builds a three-asset return matrix, reports its risk, samples the
//! efficient frontier and runs the historical stress scenarios.

use quant_engine::core::asset::AssetId;
use quant_engine::core::series::ReturnMatrix;
use quant_engine::optimization::frontier::{efficient_frontier, optimize, FrontierConfig, LabelledPoint, Objective};
use quant_engine::optimization::portfolio::{PortfolioEngine, PortfolioWeights};
use quant_engine::simulation::gbm::{simulate, GbmParams, SimulationConfig};
use quant_engine::simulation::stress_test::ShockCategory;

fn main() {
    println!("╔══════════════════════════════════════════╗");
    println!("║  quant-engine: Portfolio Risk Example    ║");
    println!("╚══════════════════════════════════════════╝\n");

    // --- Scenario 1: Simulated histories ---
    println!("━━━ Scenario 1: Simulated Price Histories ━━━\n");

    let assets = [
        ("EQUITY", 0.09, 0.22),
        ("CREDIT", 0.05, 0.08),
        ("GOLD", 0.04, 0.15),
    ];
    let histories: Vec<Vec<f64>> = assets
        .iter()
        .enumerate()
        .map(|(i, (_, drift, vol))| {
            let params = GbmParams::new(100.0, *drift, *vol, 1.0).expect("valid GBM parameters");
            let config = SimulationConfig {
                seed: 100 + i as u64,
                ..Default::default()
            };
            simulate(&params, 1, &config).expect("simulation").paths()[0].clone()
        })
        .collect();

    let rows: Vec<Vec<f64>> = (1..histories[0].len())
        .map(|t| histories.iter().map(|h| h[t] / h[t - 1] - 1.0).collect())
        .collect();
    let ids: Vec<AssetId> = assets.iter().map(|(name, _, _)| AssetId::new(*name)).collect();
    let returns = ReturnMatrix::new(ids, rows).expect("return matrix");
    println!("{} assets, {} daily returns\n", returns.n_assets(), returns.n_periods());

    // --- Scenario 2: Risk report ---
    println!("━━━ Scenario 2: 60/30/10 Portfolio ━━━\n");

    let weights = PortfolioWeights::new(vec![0.6, 0.3, 0.1]).expect("weights");
    let report = PortfolioEngine::risk_report(&returns, &weights, 0.95).expect("risk report");
    println!("{report}");

    // --- Scenario 3: Efficient frontier ---
    println!("━━━ Scenario 3: Sampled Efficient Frontier ━━━\n");

    let frontier = efficient_frontier(&returns, &FrontierConfig::default()).expect("frontier");
    for (label, objective) in [("Max Sharpe", Objective::MaxSharpe), ("Min Variance", Objective::MinVariance)] {
        let point = optimize(&frontier, objective).expect("non-empty frontier");
        println!("{label}:");
        println!(
            "{}",
            LabelledPoint {
                assets: &frontier.assets,
                point
            }
        );
    }

    // --- Scenario 4: Stress ---
    println!("━━━ Scenario 4: Historical Stress (equity shock) ━━━\n");

    let results = PortfolioEngine::compare_scenarios(&returns, &weights, ShockCategory::Equity).expect("stress");
    for r in &results {
        println!("{r}");
    }
}
