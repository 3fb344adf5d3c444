//! Present-value bond pricing and Macaulay duration.

use crate::core::error::{ensure_finite, ensure_positive, EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coupon payments per year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponFrequency {
    Annual,
    SemiAnnual,
    Quarterly,
    Monthly,
}

impl CouponFrequency {
    pub fn periods_per_year(self) -> u32 {
        match self {
            CouponFrequency::Annual => 1,
            CouponFrequency::SemiAnnual => 2,
            CouponFrequency::Quarterly => 4,
            CouponFrequency::Monthly => 12,
        }
    }

    pub fn from_periods_per_year(n: u32) -> EngineResult<Self> {
        match n {
            1 => Ok(CouponFrequency::Annual),
            2 => Ok(CouponFrequency::SemiAnnual),
            4 => Ok(CouponFrequency::Quarterly),
            12 => Ok(CouponFrequency::Monthly),
            other => Err(EngineError::invalid(
                "frequency",
                format!("{other} payments per year is not one of 1, 2, 4, 12"),
            )),
        }
    }
}

impl Default for CouponFrequency {
    fn default() -> Self {
        CouponFrequency::SemiAnnual
    }
}

impl FromStr for CouponFrequency {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "annual" | "1" => Ok(CouponFrequency::Annual),
            "semi_annual" | "semiannual" | "2" => Ok(CouponFrequency::SemiAnnual),
            "quarterly" | "4" => Ok(CouponFrequency::Quarterly),
            "monthly" | "12" => Ok(CouponFrequency::Monthly),
            other => Err(EngineError::invalid("frequency", format!("unknown coupon frequency '{other}'"))),
        }
    }
}

/// Terms of a fixed-coupon bond.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BondSpec {
    pub face_value: f64,
    /// Annual coupon rate as a fraction.
    pub coupon_rate: f64,
    /// Number of coupon periods to maturity.
    pub n_periods: u32,
    pub frequency: CouponFrequency,
}

impl BondSpec {
    pub fn new(face_value: f64, coupon_rate: f64, n_periods: u32, frequency: CouponFrequency) -> EngineResult<Self> {
        let bond = Self {
            face_value,
            coupon_rate,
            n_periods,
            frequency,
        };
        bond.validate()?;
        Ok(bond)
    }

    pub fn validate(&self) -> EngineResult<()> {
        let Self {
            face_value,
            coupon_rate,
            n_periods,
            ..
        } = *self;
        ensure_positive("face_value", face_value)?;
        ensure_finite("coupon_rate", coupon_rate)?;
        if coupon_rate < 0.0 {
            return Err(EngineError::invalid(
                "coupon_rate",
                format!("must be non-negative, got {coupon_rate}"),
            ));
        }
        if n_periods == 0 {
            return Err(EngineError::invalid("n_periods", "must be at least 1"));
        }
        Ok(())
    }

    /// Coupon paid each period.
    pub fn coupon(&self) -> f64 {
        self.face_value * self.coupon_rate / self.periods_per_year()
    }

    /// Time to maturity in years.
    pub fn maturity_years(&self) -> f64 {
        self.n_periods as f64 / self.periods_per_year()
    }

    fn periods_per_year(&self) -> f64 {
        self.frequency.periods_per_year() as f64
    }

    /// Per-period discount factor base `1 + ytm / freq`.
    fn discount_base(&self, ytm: f64) -> EngineResult<f64> {
        ensure_finite("ytm", ytm)?;
        let base = 1.0 + ytm / self.periods_per_year();
        if base <= 0.0 {
            return Err(EngineError::NumericDegenerate(format!(
                "discount base 1 + {ytm}/{} is not positive",
                self.frequency.periods_per_year()
            )));
        }
        Ok(base)
    }

    /// (time in years, cash flow, present value) for every period.
    fn discounted_cash_flows(&self, ytm: f64) -> EngineResult<Vec<(f64, f64, f64)>> {
        self.validate()?;
        let base = self.discount_base(ytm)?;
        let coupon = self.coupon();
        Ok((1..=self.n_periods)
            .map(|t| {
                let cf = if t == self.n_periods {
                    coupon + self.face_value
                } else {
                    coupon
                };
                let pv = cf / base.powi(t as i32);
                (t as f64 / self.periods_per_year(), cf, pv)
            })
            .collect())
    }
}

impl fmt::Display for BondSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} face, {:.3}% coupon, {} periods ({:?})",
            self.face_value,
            self.coupon_rate * 100.0,
            self.n_periods,
            self.frequency
        )
    }
}

/// Price of a bond at one yield, with its duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BondValuation {
    pub ytm: f64,
    pub price: f64,
    pub duration: f64,
}

/// Bond valuation functions.
pub struct BondPricer;

impl BondPricer {
    /// Present value of the coupons and principal at yield `ytm`.
    ///
    /// # Examples
    ///
    /// ```
    /// use quant_engine::pricing::bond::{BondPricer, BondSpec, CouponFrequency};
    ///
    /// let bond = BondSpec::new(1000.0, 0.05, 10, CouponFrequency::SemiAnnual).unwrap();
    /// let price = BondPricer::price(&bond, 0.05).unwrap();
    /// assert!((price - 1000.0).abs() < 1e-9);
    /// ```
    pub fn price(bond: &BondSpec, ytm: f64) -> EngineResult<f64> {
        Ok(bond
            .discounted_cash_flows(ytm)?
            .iter()
            .map(|(_, _, pv)| pv)
            .sum())
    }

    /// Macaulay duration in years.
    pub fn duration(bond: &BondSpec, ytm: f64) -> EngineResult<f64> {
        let flows = bond.discounted_cash_flows(ytm)?;
        let price: f64 = flows.iter().map(|(_, _, pv)| pv).sum();
        let weighted: f64 = flows.iter().map(|(t, _, pv)| t * pv).sum();
        Ok(weighted / price)
    }

    pub fn valuation(bond: &BondSpec, ytm: f64) -> EngineResult<BondValuation> {
        Ok(BondValuation {
            ytm,
            price: Self::price(bond, ytm)?,
            duration: Self::duration(bond, ytm)?,
        })
    }

    /// Price and duration at each yield of `ytm_grid`.
    pub fn price_yield_profile(bond: &BondSpec, ytm_grid: &[f64]) -> EngineResult<Vec<BondValuation>> {
        ytm_grid.iter().map(|y| Self::valuation(bond, *y)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bond(coupon: f64) -> BondSpec {
        BondSpec::new(1000.0, coupon, 10, CouponFrequency::SemiAnnual).unwrap()
    }

    #[test]
    fn test_par_bond() {
        assert_relative_eq!(BondPricer::price(&bond(0.05), 0.05).unwrap(), 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_coupon_reduction() {
        let zero = bond(0.0);
        let price = BondPricer::price(&zero, 0.06).unwrap();
        assert_relative_eq!(price, 1000.0 / 1.03_f64.powi(10), epsilon = 1e-9);
        // a zero has duration equal to maturity
        assert_relative_eq!(BondPricer::duration(&zero, 0.06).unwrap(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_price_falls_as_yield_rises() {
        let b = bond(0.05);
        let profile = BondPricer::price_yield_profile(&b, &[0.03, 0.05, 0.07]).unwrap();
        assert!(profile[0].price > profile[1].price);
        assert!(profile[1].price > profile[2].price);
    }

    #[test]
    fn test_duration_within_maturity() {
        let b = bond(0.08);
        let d = BondPricer::duration(&b, 0.04).unwrap();
        assert!(d > 0.0 && d < b.maturity_years());
    }

    #[test]
    fn test_negative_discount_base() {
        let b = bond(0.05);
        assert!(matches!(
            BondPricer::price(&b, -2.0),
            Err(EngineError::NumericDegenerate(_))
        ));
        assert!(BondPricer::price(&b, -3.0).is_err());
    }

    #[test]
    fn test_invalid_terms() {
        assert!(BondSpec::new(0.0, 0.05, 10, CouponFrequency::Annual).is_err());
        assert!(BondSpec::new(1000.0, -0.01, 10, CouponFrequency::Annual).is_err());
        assert!(BondSpec::new(1000.0, 0.05, 0, CouponFrequency::Annual).is_err());
        assert!(CouponFrequency::from_periods_per_year(3).is_err());
    }

    #[test]
    fn test_unvalidated_terms_are_rejected() {
        let raw = BondSpec {
            face_value: -1000.0,
            n_periods: 0,
            ..bond(0.05)
        };
        assert!(BondPricer::price(&raw, 0.05).is_err());
        assert!(BondPricer::duration(&raw, 0.05).is_err());
        let no_periods = BondSpec {
            n_periods: 0,
            ..bond(0.05)
        };
        assert!(matches!(
            BondPricer::duration(&no_periods, 0.05),
            Err(EngineError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_frequency_parsing() {
        assert_eq!("semi-annual".parse::<CouponFrequency>().unwrap(), CouponFrequency::SemiAnnual);
        assert_eq!("12".parse::<CouponFrequency>().unwrap(), CouponFrequency::Monthly);
        assert_eq!(CouponFrequency::from_periods_per_year(4).unwrap(), CouponFrequency::Quarterly);
    }
}
