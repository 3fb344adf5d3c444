//! Option pricing and strategy payoff example.
//!
//! Prices a put and a call with Black-Scholes, then walks through the preset
//! multi-leg strategies and their breakevens.

use quant_engine::pricing::option::{OptionKind, OptionParams, OptionPricer};
use quant_engine::pricing::strategy::{price_grid, Strategy, StrategyPreset};

fn main() {
    println!("╔══════════════════════════════════════════╗");
    println!("║  quant-engine: Option Strategies Example ║");
    println!("╚══════════════════════════════════════════╝\n");

    // --- Scenario 1: Black-Scholes ---
    println!("━━━ Scenario 1: Black-Scholes Pricing ━━━\n");

    let params = OptionParams::new(100.0, 100.0, 1.0, 0.02, 0.3).expect("valid parameters");
    for kind in [OptionKind::Call, OptionKind::Put] {
        let price = OptionPricer::price(&params, kind).expect("pricing");
        let greeks = OptionPricer::greeks(&params, kind).expect("greeks");
        println!("ATM {kind}: {price:.4}");
        println!("{greeks}\n");
    }

    // --- Scenario 2: Preset strategies ---
    println!("━━━ Scenario 2: Strategy Payoffs at Expiry ━━━\n");

    let spot = 100.0;
    let grid = price_grid(spot, 0.6, 1.4, 100).expect("grid");
    for preset in StrategyPreset::ALL {
        let strategy = Strategy::from_preset(preset, spot).expect("preset");
        for leg in &strategy.legs {
            println!("  {leg}");
        }
        println!("{}", strategy.profile(&grid).expect("profile"));
    }
}
