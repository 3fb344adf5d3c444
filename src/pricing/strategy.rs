//! Expiry payoffs of option legs and multi-leg strategies.
//!
//! A strategy's payoff is the pointwise sum of its legs' payoffs. There is no
//! interaction between legs, so combining two strategies adds their curves.

use crate::core::error::{ensure_finite, ensure_positive, EngineError, EngineResult};
use crate::pricing::option::OptionKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl FromStr for Direction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "long" | "buy" => Ok(Direction::Long),
            "short" | "sell" => Ok(Direction::Short),
            other => Err(EngineError::invalid("direction", format!("unknown direction '{other}'"))),
        }
    }
}

/// One option position held to expiry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionLeg {
    pub kind: OptionKind,
    pub strike: f64,
    pub premium: f64,
    pub direction: Direction,
}

impl OptionLeg {
    pub fn new(kind: OptionKind, strike: f64, premium: f64, direction: Direction) -> EngineResult<Self> {
        ensure_positive("strike", strike)?;
        ensure_finite("premium", premium)?;
        if premium < 0.0 {
            return Err(EngineError::invalid(
                "premium",
                format!("must be non-negative, got {premium}"),
            ));
        }
        Ok(Self {
            kind,
            strike,
            premium,
            direction,
        })
    }

    fn validate(&self) -> EngineResult<()> {
        Self::new(self.kind, self.strike, self.premium, self.direction).map(|_| ())
    }

    /// Profit at expiry for underlying price `s`.
    pub fn value_at(&self, s: f64) -> f64 {
        let intrinsic = match self.kind {
            OptionKind::Call => (s - self.strike).max(0.0),
            OptionKind::Put => (self.strike - s).max(0.0),
        };
        match self.direction {
            Direction::Long => intrinsic - self.premium,
            Direction::Short => self.premium - intrinsic,
        }
    }
}

impl fmt::Display for OptionLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} {} K={:.2} premium={:.2}",
            self.direction, self.kind, self.strike, self.premium
        )
    }
}

/// Expiry profit of a single leg at each price.
pub fn payoff(prices: &[f64], leg: &OptionLeg) -> EngineResult<Vec<f64>> {
    leg.validate()?;
    Ok(prices.iter().map(|s| leg.value_at(*s)).collect())
}

/// Expiry profit of all legs combined. No legs gives all zeros.
pub fn strategy_payoff(prices: &[f64], legs: &[OptionLeg]) -> EngineResult<Vec<f64>> {
    let mut total = vec![0.0; prices.len()];
    for leg in legs {
        for (acc, value) in total.iter_mut().zip(payoff(prices, leg)?) {
            *acc += value;
        }
    }
    Ok(total)
}

/// `points` evenly spaced prices from `center·low` to `center·high`, inclusive.
pub fn price_grid(center: f64, low: f64, high: f64, points: usize) -> EngineResult<Vec<f64>> {
    ensure_positive("center", center)?;
    ensure_finite("low", low)?;
    ensure_finite("high", high)?;
    if low < 0.0 || high <= low {
        return Err(EngineError::invalid(
            "range",
            format!("need 0 <= low < high, got {low}..{high}"),
        ));
    }
    if points < 2 {
        return Err(EngineError::invalid("points", "must be at least 2"));
    }
    let start = center * low;
    let step = center * (high - low) / (points - 1) as f64;
    Ok((0..points).map(|i| start + step * i as f64).collect())
}

/// Canned strategies built around the current underlying price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyPreset {
    /// Short call at 110% of spot. The stock leg is held outside the strategy.
    CoveredCall,
    /// Long put at 90% of spot. The stock leg is held outside the strategy.
    ProtectivePut,
    Straddle,
    Strangle,
    BullCallSpread,
    BearPutSpread,
}

impl StrategyPreset {
    pub const ALL: [StrategyPreset; 6] = [
        StrategyPreset::CoveredCall,
        StrategyPreset::ProtectivePut,
        StrategyPreset::Straddle,
        StrategyPreset::Strangle,
        StrategyPreset::BullCallSpread,
        StrategyPreset::BearPutSpread,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StrategyPreset::CoveredCall => "Covered Call",
            StrategyPreset::ProtectivePut => "Protective Put",
            StrategyPreset::Straddle => "Straddle",
            StrategyPreset::Strangle => "Strangle",
            StrategyPreset::BullCallSpread => "Bull Call Spread",
            StrategyPreset::BearPutSpread => "Bear Put Spread",
        }
    }

    /// (kind, strike as a multiple of spot, premium, direction) per leg.
    fn template(self) -> &'static [(OptionKind, f64, f64, Direction)] {
        use Direction::{Long, Short};
        use OptionKind::{Call, Put};
        match self {
            StrategyPreset::CoveredCall => &[(Call, 1.1, 5.0, Short)],
            StrategyPreset::ProtectivePut => &[(Put, 0.9, 3.0, Long)],
            StrategyPreset::Straddle => &[(Call, 1.0, 5.0, Long), (Put, 1.0, 5.0, Long)],
            StrategyPreset::Strangle => &[(Call, 1.1, 3.0, Long), (Put, 0.9, 3.0, Long)],
            StrategyPreset::BullCallSpread => &[(Call, 1.0, 5.0, Long), (Call, 1.1, 2.0, Short)],
            StrategyPreset::BearPutSpread => &[(Put, 1.0, 5.0, Long), (Put, 0.9, 2.0, Short)],
        }
    }
}

impl FromStr for StrategyPreset {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.to_ascii_lowercase().replace(['-', ' '], "_");
        StrategyPreset::ALL
            .iter()
            .copied()
            .find(|p| p.name().to_ascii_lowercase().replace(' ', "_") == key)
            .ok_or_else(|| EngineError::invalid("strategy", format!("unknown strategy '{s}'")))
    }
}

/// An ordered collection of option legs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    pub legs: Vec<OptionLeg>,
}

impl Strategy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            legs: Vec::new(),
        }
    }

    /// # Examples
    ///
    /// ```
    /// use quant_engine::pricing::strategy::{Strategy, StrategyPreset};
    ///
    /// let straddle = Strategy::from_preset(StrategyPreset::Straddle, 100.0).unwrap();
    /// let pnl = straddle.payoff(&[80.0, 100.0, 120.0]).unwrap();
    /// assert_eq!(pnl, vec![10.0, -10.0, 10.0]);
    /// ```
    pub fn from_preset(preset: StrategyPreset, spot: f64) -> EngineResult<Self> {
        ensure_positive("spot", spot)?;
        let legs = preset
            .template()
            .iter()
            .map(|(kind, moneyness, premium, direction)| {
                OptionLeg::new(*kind, spot * moneyness, *premium, *direction)
            })
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Self {
            name: preset.name().to_string(),
            legs,
        })
    }

    pub fn with_leg(mut self, leg: OptionLeg) -> Self {
        self.legs.push(leg);
        self
    }

    pub fn payoff(&self, prices: &[f64]) -> EngineResult<Vec<f64>> {
        strategy_payoff(prices, &self.legs)
    }

    /// Prices where the payoff curve crosses zero, linearly interpolated
    /// between neighbouring grid points. `prices` must be ascending.
    pub fn breakevens(&self, prices: &[f64]) -> EngineResult<Vec<f64>> {
        let pnl = self.payoff(prices)?;
        let mut crossings = Vec::new();
        for i in 0..pnl.len() {
            if pnl[i] == 0.0 {
                crossings.push(prices[i]);
                continue;
            }
            if i + 1 < pnl.len() && pnl[i + 1] != 0.0 && (pnl[i] < 0.0) != (pnl[i + 1] < 0.0) {
                let t = pnl[i] / (pnl[i] - pnl[i + 1]);
                crossings.push(prices[i] + t * (prices[i + 1] - prices[i]));
            }
        }
        Ok(crossings)
    }

    pub fn profile(&self, prices: &[f64]) -> EngineResult<PayoffProfile> {
        let payoff = self.payoff(prices)?;
        Ok(PayoffProfile {
            strategy: self.name.clone(),
            prices: prices.to_vec(),
            breakevens: self.breakevens(prices)?,
            payoff,
        })
    }
}

/// Payoff curve with its summary figures over a price grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoffProfile {
    pub strategy: String,
    pub prices: Vec<f64>,
    pub payoff: Vec<f64>,
    pub breakevens: Vec<f64>,
}

impl PayoffProfile {
    /// Largest profit seen on the grid.
    pub fn max_profit(&self) -> f64 {
        self.payoff.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Largest loss seen on the grid, as a signed payoff.
    pub fn max_loss(&self) -> f64 {
        self.payoff.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

impl fmt::Display for PayoffProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.strategy)?;
        writeln!(f, "Max profit on grid: {:.2}", self.max_profit())?;
        writeln!(f, "Max loss on grid:   {:.2}", self.max_loss())?;
        let be: Vec<String> = self.breakevens.iter().map(|b| format!("{b:.2}")).collect();
        writeln!(f, "Breakevens: {}", if be.is_empty() { "none".to_string() } else { be.join(", ") })
    }
}
