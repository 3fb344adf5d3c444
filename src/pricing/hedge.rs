//! Linear futures-hedge P&L.
//!
//! The hedge instrument is assumed to move one-for-one with the position
//! (beta of 1), so both legs scale by the same fractional move.

use crate::core::error::{decimal_in_range, EngineError, EngineResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// P&L of a hedged position under one price move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgeOutcome {
    /// Fractional move of the underlying.
    pub price_move: Decimal,
    pub position_pl: Decimal,
    pub hedge_pl: Decimal,
    pub total_pl: Decimal,
    /// `|hedge_pl / position_pl|`, 0 when the position P&L is zero. Above 1
    /// means the position is over-hedged.
    pub hedge_efficiency: f64,
}

impl HedgeOutcome {
    pub fn is_over_hedged(&self) -> bool {
        self.hedge_efficiency > 1.0
    }
}

impl fmt::Display for HedgeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Move:        {}%", (self.price_move * Decimal::from(100)).normalize())?;
        writeln!(f, "Position P&L: {}", self.position_pl.round_dp(2))?;
        writeln!(f, "Hedge P&L:    {}", self.hedge_pl.round_dp(2))?;
        writeln!(f, "Total P&L:    {}", self.total_pl.round_dp(2))?;
        write!(f, "Efficiency:   {:.1}%", self.hedge_efficiency * 100.0)
    }
}

/// P&L of `position_value` hedged with `contracts` futures (negative =
/// short) at `hedge_price`, after the underlying moves by `price_move`.
///
/// # Examples
///
/// ```
/// use quant_engine::pricing::hedge::hedge_pl;
/// use rust_decimal_macros::dec;
///
/// let outcome = hedge_pl(dec!(1000000), dec!(250), dec!(-4000), dec!(-0.10)).unwrap();
/// assert_eq!(outcome.total_pl, dec!(0));
/// assert_eq!(outcome.hedge_efficiency, 1.0);
/// ```
pub fn hedge_pl(
    position_value: Decimal,
    hedge_price: Decimal,
    contracts: Decimal,
    price_move: Decimal,
) -> EngineResult<HedgeOutcome> {
    if hedge_price <= Decimal::ZERO {
        return Err(EngineError::invalid(
            "hedge_price",
            format!("must be positive, got {hedge_price}"),
        ));
    }

    let position_pl = decimal_in_range(position_value.checked_mul(price_move), "position P&L")?;
    let hedge_pl = decimal_in_range(
        contracts
            .checked_mul(hedge_price)
            .and_then(|notional| notional.checked_mul(price_move)),
        "hedge P&L",
    )?;
    let total_pl = decimal_in_range(position_pl.checked_add(hedge_pl), "total P&L")?;
    let hedge_efficiency = if position_pl == Decimal::ZERO {
        0.0
    } else {
        decimal_in_range(hedge_pl.checked_div(position_pl), "hedge efficiency")?
            .abs()
            .to_f64()
            .unwrap_or(0.0)
    };

    Ok(HedgeOutcome {
        price_move,
        position_pl,
        hedge_pl,
        total_pl,
        hedge_efficiency,
    })
}

/// Signed contract count that hedges `hedge_ratio` of the position.
/// A ratio of 1 fully offsets a long position with short futures.
pub fn contracts_for_ratio(
    position_value: Decimal,
    hedge_price: Decimal,
    hedge_ratio: Decimal,
) -> EngineResult<Decimal> {
    if hedge_price <= Decimal::ZERO {
        return Err(EngineError::invalid(
            "hedge_price",
            format!("must be positive, got {hedge_price}"),
        ));
    }
    let contracts = position_value
        .checked_div(hedge_price)
        .and_then(|units| units.checked_mul(hedge_ratio));
    Ok(-decimal_in_range(contracts, "contract count")?)
}

/// Hedge outcome for each move in `moves`.
pub fn hedge_scenarios(
    position_value: Decimal,
    hedge_price: Decimal,
    contracts: Decimal,
    moves: &[Decimal],
) -> EngineResult<Vec<HedgeOutcome>> {
    moves
        .iter()
        .map(|m| hedge_pl(position_value, hedge_price, contracts, *m))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_out_of_range_ratio_is_degenerate() {
        // a one-unit position P&L against a 10^17 hedge P&L
        let tiny = Decimal::new(1, 27);
        let result = hedge_pl(tiny, dec!(1000000), dec!(1000000000000), dec!(0.1));
        assert!(matches!(result, Err(EngineError::NumericDegenerate(_))));

        let huge = hedge_pl(Decimal::MAX, dec!(1), Decimal::MAX, dec!(2));
        assert!(matches!(huge, Err(EngineError::NumericDegenerate(_))));
        assert!(contracts_for_ratio(Decimal::MAX, dec!(0.5), dec!(1)).is_err());
    }

    #[test]
    fn test_perfect_hedge() {
        let outcome = hedge_pl(dec!(1000000), dec!(250), dec!(-4000), dec!(-0.10)).unwrap();
        assert_eq!(outcome.position_pl, dec!(-100000));
        assert_eq!(outcome.hedge_pl, dec!(100000));
        assert_eq!(outcome.total_pl, Decimal::ZERO);
        assert_eq!(outcome.hedge_efficiency, 1.0);
        assert!(!outcome.is_over_hedged());
    }

    #[test]
    fn test_over_hedge_efficiency_exceeds_one() {
        let outcome = hedge_pl(dec!(1000000), dec!(250), dec!(-6000), dec!(-0.10)).unwrap();
        assert_eq!(outcome.hedge_efficiency, 1.5);
        assert!(outcome.is_over_hedged());
        assert_eq!(outcome.total_pl, dec!(50000));
    }

    #[test]
    fn test_zero_move_has_zero_efficiency() {
        let outcome = hedge_pl(dec!(1000000), dec!(250), dec!(-4000), Decimal::ZERO).unwrap();
        assert_eq!(outcome.hedge_efficiency, 0.0);
        assert_eq!(outcome.total_pl, Decimal::ZERO);
    }

    #[test]
    fn test_unhedged_position() {
        let outcome = hedge_pl(dec!(500000), dec!(100), Decimal::ZERO, dec!(0.05)).unwrap();
        assert_eq!(outcome.total_pl, dec!(25000));
        assert_eq!(outcome.hedge_efficiency, 0.0);
    }

    #[test]
    fn test_contracts_for_ratio() {
        assert_eq!(
            contracts_for_ratio(dec!(1000000), dec!(250), dec!(1)).unwrap(),
            dec!(-4000)
        );
        assert_eq!(
            contracts_for_ratio(dec!(1000000), dec!(250), dec!(0.5)).unwrap(),
            dec!(-2000)
        );
    }

    #[test]
    fn test_scenario_table() {
        let moves = [dec!(-0.2), dec!(-0.1), dec!(0), dec!(0.1)];
        let table = hedge_scenarios(dec!(1000000), dec!(250), dec!(-2000), &moves).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table[0].total_pl, dec!(-100000));
        assert!(table.iter().filter(|o| o.price_move != Decimal::ZERO).all(|o| o.hedge_efficiency == 0.5));
    }

    #[test]
    fn test_invalid_hedge_price() {
        assert!(hedge_pl(dec!(1000), Decimal::ZERO, dec!(1), dec!(0.1)).is_err());
        assert!(contracts_for_ratio(dec!(1000), dec!(-5), dec!(1)).is_err());
    }
}
