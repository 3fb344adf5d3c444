use criterion::{black_box, criterion_group, criterion_main, Criterion};
use quant_engine::core::asset::AssetId;
use quant_engine::core::series::ReturnMatrix;
use quant_engine::optimization::frontier::{efficient_frontier, FrontierConfig};
use quant_engine::optimization::portfolio::{PortfolioEngine, PortfolioWeights};
use quant_engine::pricing::option::{OptionKind, OptionParams, OptionPricer};
use quant_engine::simulation::gbm::{simulate, GbmParams, SimulationConfig};

/// Deterministic pseudo-returns for `n_assets` over `n_periods`.
fn returns(n_assets: usize, n_periods: usize) -> ReturnMatrix {
    let assets = (0..n_assets).map(|i| AssetId::new(format!("A{i}"))).collect();
    let rows = (0..n_periods)
        .map(|t| {
            (0..n_assets)
                .map(|j| 0.01 * ((t * (j + 1)) as f64 * 0.37).sin() + 0.0002 * j as f64)
                .collect()
        })
        .collect();
    ReturnMatrix::new(assets, rows).unwrap()
}

fn bench_simulate_1000_paths(c: &mut Criterion) {
    let params = GbmParams::new(100.0, 0.07, 0.2, 1.0).unwrap();
    let config = SimulationConfig::default();

    c.bench_function("simulate_1000_paths_252_steps", |b| {
        b.iter(|| simulate(black_box(&params), 1000, &config))
    });
}

fn bench_path_var(c: &mut Criterion) {
    let params = GbmParams::new(100.0, 0.07, 0.2, 1.0).unwrap();
    let set = simulate(&params, 10_000, &SimulationConfig::default()).unwrap();

    c.bench_function("path_cvar_10000", |b| {
        b.iter(|| black_box(&set).conditional_var(0.95))
    });
}

fn bench_frontier_5000_draws(c: &mut Criterion) {
    let r = returns(5, 252);
    let config = FrontierConfig::default();

    c.bench_function("frontier_5_assets_5000_draws", |b| {
        b.iter(|| efficient_frontier(black_box(&r), &config))
    });
}

fn bench_risk_report(c: &mut Criterion) {
    let r = returns(10, 1000);
    let w = PortfolioWeights::equal(10).unwrap();

    c.bench_function("risk_report_10_assets_1000_periods", |b| {
        b.iter(|| PortfolioEngine::risk_report(black_box(&r), &w, 0.95))
    });
}

fn bench_greeks(c: &mut Criterion) {
    let p = OptionParams::new(100.0, 105.0, 0.5, 0.03, 0.25).unwrap();

    c.bench_function("black_scholes_greeks", |b| {
        b.iter(|| OptionPricer::greeks(black_box(&p), OptionKind::Put))
    });
}

criterion_group!(
    benches,
    bench_simulate_1000_paths,
    bench_path_var,
    bench_frontier_5000_draws,
    bench_risk_report,
    bench_greeks
);
criterion_main!(benches);
