//! Fixed-versus-floating interest rate swap cash flows.

use crate::core::error::{decimal_in_range, EngineError, EngineResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-period drift of the trending floating-rate scenarios (20bp).
const TREND_STEP: Decimal = dec!(0.002);
/// Half-width of the random floating-rate band (100bp).
const RANDOM_BAND: f64 = 0.01;

/// One period of a swap schedule, from the fixed payer's side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapCashflow {
    /// 1-based period number.
    pub period: u32,
    pub floating_rate: Decimal,
    pub fixed_payment: Decimal,
    pub floating_payment: Decimal,
    /// `fixed_payment − floating_payment`
    pub net_payment: Decimal,
}

/// Full projected schedule with totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapSchedule {
    pub notional: Decimal,
    pub fixed_rate: Decimal,
    pub cashflows: Vec<SwapCashflow>,
}

impl SwapSchedule {
    pub fn total_fixed(&self) -> Decimal {
        self.cashflows.iter().map(|c| c.fixed_payment).sum()
    }

    pub fn total_floating(&self) -> Decimal {
        self.cashflows.iter().map(|c| c.floating_payment).sum()
    }

    pub fn total_net(&self) -> Decimal {
        self.cashflows.iter().map(|c| c.net_payment).sum()
    }
}

impl fmt::Display for SwapSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Interest Rate Swap ===")?;
        writeln!(f, "Notional: {}  Fixed rate: {}", self.notional, self.fixed_rate)?;
        writeln!(f, "{:>6} {:>10} {:>16} {:>16} {:>16}", "Period", "Float", "Fixed", "Floating", "Net")?;
        for c in &self.cashflows {
            writeln!(
                f,
                "{:>6} {:>10} {:>16} {:>16} {:>16}",
                c.period,
                c.floating_rate.round_dp(6),
                c.fixed_payment.round_dp(2),
                c.floating_payment.round_dp(2),
                c.net_payment.round_dp(2)
            )?;
        }
        writeln!(f, "Total fixed:    {}", self.total_fixed().round_dp(2))?;
        writeln!(f, "Total floating: {}", self.total_floating().round_dp(2))?;
        writeln!(f, "Net:            {}", self.total_net().round_dp(2))
    }
}

/// Project swap cash flows for `n_periods`.
///
/// When `floating_rates` is shorter than the schedule its last rate is used
/// for the remaining periods.
///
/// # Examples
///
/// ```
/// use quant_engine::pricing::swap::swap_cashflows;
/// use rust_decimal_macros::dec;
///
/// let schedule = swap_cashflows(dec!(1000000), dec!(0.04), &[dec!(0.03), dec!(0.05)], 3).unwrap();
/// assert_eq!(schedule.cashflows[0].net_payment, dec!(10000));
/// assert_eq!(schedule.cashflows[2].net_payment, dec!(-10000));
/// ```
pub fn swap_cashflows(
    notional: Decimal,
    fixed_rate: Decimal,
    floating_rates: &[Decimal],
    n_periods: u32,
) -> EngineResult<SwapSchedule> {
    if notional <= Decimal::ZERO {
        return Err(EngineError::invalid("notional", format!("must be positive, got {notional}")));
    }
    if n_periods == 0 {
        return Err(EngineError::invalid("n_periods", "must be at least 1"));
    }
    let last = floating_rates
        .last()
        .copied()
        .ok_or_else(|| EngineError::invalid("floating_rates", "at least one rate is required"))?;

    let fixed_payment = decimal_in_range(notional.checked_mul(fixed_rate), "fixed payment")?;
    let cashflows = (0..n_periods as usize)
        .map(|i| {
            let floating_rate = floating_rates.get(i).copied().unwrap_or(last);
            let floating_payment = decimal_in_range(notional.checked_mul(floating_rate), "floating payment")?;
            Ok(SwapCashflow {
                period: i as u32 + 1,
                floating_rate,
                fixed_payment,
                floating_payment,
                net_payment: decimal_in_range(fixed_payment.checked_sub(floating_payment), "net payment")?,
            })
        })
        .collect::<EngineResult<Vec<_>>>()?;

    // the total accessors sum without checks
    let total = |field: fn(&SwapCashflow) -> Decimal| {
        cashflows
            .iter()
            .try_fold(Decimal::ZERO, |acc, c| acc.checked_add(field(c)))
    };
    decimal_in_range(total(|c| c.fixed_payment), "total fixed")?;
    decimal_in_range(total(|c| c.floating_payment), "total floating")?;
    decimal_in_range(total(|c| c.net_payment), "total net")?;

    Ok(SwapSchedule {
        notional,
        fixed_rate,
        cashflows,
    })
}

/// Generated path of floating rates around a base rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FloatingRateScenario {
    /// `base + 0.002·i`
    Rising,
    /// `base − 0.002·i`
    Falling,
    /// `base + U(−0.01, 0.01)` per period.
    Random { seed: u64 },
}

impl FloatingRateScenario {
    pub fn rates(&self, base_rate: Decimal, n_periods: u32) -> EngineResult<Vec<Decimal>> {
        match self {
            FloatingRateScenario::Rising => (0..n_periods)
                .map(|i| decimal_in_range(base_rate.checked_add(TREND_STEP * Decimal::from(i)), "floating rate"))
                .collect(),
            FloatingRateScenario::Falling => (0..n_periods)
                .map(|i| decimal_in_range(base_rate.checked_sub(TREND_STEP * Decimal::from(i)), "floating rate"))
                .collect(),
            FloatingRateScenario::Random { seed } => {
                let mut rng = StdRng::seed_from_u64(*seed);
                (0..n_periods)
                    .map(|_| {
                        let noise = rng.gen_range(-RANDOM_BAND..RANDOM_BAND);
                        Decimal::from_f64(noise)
                            .ok_or_else(|| {
                                EngineError::NumericDegenerate(format!("rate shock {noise} is not representable"))
                            })
                            .and_then(|d| decimal_in_range(base_rate.checked_add(d.round_dp(8)), "floating rate"))
                    })
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oversized_notional_is_degenerate() {
        let result = swap_cashflows(Decimal::MAX, dec!(2), &[dec!(0.03)], 4);
        assert!(matches!(result, Err(EngineError::NumericDegenerate(_))));
        // each payment fits, the ten-period total does not
        let half = Decimal::MAX / dec!(2);
        let result = swap_cashflows(half, dec!(1), &[dec!(0)], 10);
        assert!(matches!(result, Err(EngineError::NumericDegenerate(_))));
        assert!(FloatingRateScenario::Rising.rates(Decimal::MAX, 3).is_err());
    }

    #[test]
    fn test_fixed_vs_floating() {
        let s = swap_cashflows(dec!(10000000), dec!(0.04), &[dec!(0.035), dec!(0.045)], 2).unwrap();
        assert_eq!(s.cashflows[0].fixed_payment, dec!(400000));
        assert_eq!(s.cashflows[0].floating_payment, dec!(350000));
        assert_eq!(s.cashflows[0].net_payment, dec!(50000));
        assert_eq!(s.cashflows[1].net_payment, dec!(-50000));
        assert_eq!(s.total_net(), Decimal::ZERO);
    }

    #[test]
    fn test_last_rate_carries_forward() {
        let s = swap_cashflows(dec!(100), dec!(0.05), &[dec!(0.01)], 4).unwrap();
        assert_eq!(s.cashflows.len(), 4);
        assert!(s.cashflows.iter().all(|c| c.floating_rate == dec!(0.01)));
        assert_eq!(s.cashflows[3].period, 4);
        assert_eq!(s.total_floating(), dec!(4));
        assert_eq!(s.total_fixed(), dec!(20));
    }

    #[test]
    fn test_extra_rates_are_ignored() {
        let s = swap_cashflows(dec!(100), dec!(0.05), &[dec!(0.01), dec!(0.02), dec!(0.03)], 2).unwrap();
        assert_eq!(s.cashflows.len(), 2);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(swap_cashflows(Decimal::ZERO, dec!(0.05), &[dec!(0.01)], 2).is_err());
        assert!(swap_cashflows(dec!(100), dec!(0.05), &[], 2).is_err());
        assert!(swap_cashflows(dec!(100), dec!(0.05), &[dec!(0.01)], 0).is_err());
    }

    #[test]
    fn test_trending_scenarios() {
        let up = FloatingRateScenario::Rising.rates(dec!(0.04), 3).unwrap();
        assert_eq!(up, vec![dec!(0.04), dec!(0.042), dec!(0.044)]);
        let down = FloatingRateScenario::Falling.rates(dec!(0.04), 3).unwrap();
        assert_eq!(down[2], dec!(0.036));
    }

    #[test]
    fn test_random_scenario_is_seeded_and_bounded() {
        let a = FloatingRateScenario::Random { seed: 42 }.rates(dec!(0.04), 10).unwrap();
        let b = FloatingRateScenario::Random { seed: 42 }.rates(dec!(0.04), 10).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|r| *r >= dec!(0.03) && *r <= dec!(0.05)));
    }
}
