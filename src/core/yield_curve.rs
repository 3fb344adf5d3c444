use crate::core::error::{ensure_finite, EngineError, EngineResult};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Maturity at which the curve is anchored for steepening/flattening shifts.
const ANCHOR_YEARS: f64 = 30.0;

/// Canonical treasury maturities, ordered shortest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Maturity {
    #[serde(rename = "1M")]
    M1,
    #[serde(rename = "3M")]
    M3,
    #[serde(rename = "6M")]
    M6,
    #[serde(rename = "1Y")]
    Y1,
    #[serde(rename = "2Y")]
    Y2,
    #[serde(rename = "3Y")]
    Y3,
    #[serde(rename = "5Y")]
    Y5,
    #[serde(rename = "7Y")]
    Y7,
    #[serde(rename = "10Y")]
    Y10,
    #[serde(rename = "20Y")]
    Y20,
    #[serde(rename = "30Y")]
    Y30,
}

impl Maturity {
    pub const ALL: [Maturity; 11] = [
        Maturity::M1,
        Maturity::M3,
        Maturity::M6,
        Maturity::Y1,
        Maturity::Y2,
        Maturity::Y3,
        Maturity::Y5,
        Maturity::Y7,
        Maturity::Y10,
        Maturity::Y20,
        Maturity::Y30,
    ];

    pub fn years(self) -> f64 {
        match self {
            Maturity::M1 => 1.0 / 12.0,
            Maturity::M3 => 3.0 / 12.0,
            Maturity::M6 => 6.0 / 12.0,
            Maturity::Y1 => 1.0,
            Maturity::Y2 => 2.0,
            Maturity::Y3 => 3.0,
            Maturity::Y5 => 5.0,
            Maturity::Y7 => 7.0,
            Maturity::Y10 => 10.0,
            Maturity::Y20 => 20.0,
            Maturity::Y30 => 30.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Maturity::M1 => "1M",
            Maturity::M3 => "3M",
            Maturity::M6 => "6M",
            Maturity::Y1 => "1Y",
            Maturity::Y2 => "2Y",
            Maturity::Y3 => "3Y",
            Maturity::Y5 => "5Y",
            Maturity::Y7 => "7Y",
            Maturity::Y10 => "10Y",
            Maturity::Y20 => "20Y",
            Maturity::Y30 => "30Y",
        }
    }

    /// Yield of the sample curve used when no snapshot is available.
    fn fallback_yield(self) -> f64 {
        match self {
            Maturity::M1 => 5.0,
            Maturity::M3 => 5.2,
            Maturity::M6 => 5.3,
            Maturity::Y1 => 4.8,
            Maturity::Y2 => 4.5,
            Maturity::Y3 => 4.3,
            Maturity::Y5 => 4.2,
            Maturity::Y7 => 4.3,
            Maturity::Y10 => 4.4,
            Maturity::Y20 => 4.6,
            Maturity::Y30 => 4.5,
        }
    }
}

impl fmt::Display for Maturity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for Maturity {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Maturity::ALL
            .iter()
            .copied()
            .find(|m| m.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EngineError::invalid("maturity", format!("unknown maturity label '{s}'")))
    }
}

/// Shape of a yield-curve shock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveShift {
    /// Every maturity moves by the full magnitude.
    Parallel,
    /// Longer maturities move more: `m · years / 30`.
    Steepening,
    /// Shorter maturities move more: `m · (1 − years / 30)`.
    Flattening,
}

impl CurveShift {
    pub fn weight(self, maturity: Maturity) -> f64 {
        match self {
            CurveShift::Parallel => 1.0,
            CurveShift::Steepening => maturity.years() / ANCHOR_YEARS,
            CurveShift::Flattening => 1.0 - maturity.years() / ANCHOR_YEARS,
        }
    }
}

impl FromStr for CurveShift {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "parallel" => Ok(CurveShift::Parallel),
            "steepening" => Ok(CurveShift::Steepening),
            "flattening" => Ok(CurveShift::Flattening),
            other => Err(EngineError::invalid("shift", format!("unknown curve shift '{other}'"))),
        }
    }
}

/// Convert a shock in basis points to the curve's percentage units.
pub fn basis_points_to_percent(bp: f64) -> f64 {
    bp / 100.0
}

/// Annualized yields (percentage units) at every canonical maturity.
///
/// A curve always carries all eleven maturities; gaps in a snapshot are
/// filled from [`YieldCurve::fallback`].
///
/// # Examples
///
/// ```
/// use quant_engine::core::yield_curve::{CurveShift, Maturity, YieldCurve};
///
/// let curve = YieldCurve::fallback();
/// let shifted = curve.shift(CurveShift::Parallel, 0.25).unwrap();
/// assert!((shifted.get(Maturity::Y10) - 4.65).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<Maturity, f64>", into = "BTreeMap<Maturity, f64>")]
pub struct YieldCurve {
    yields: BTreeMap<Maturity, f64>,
}

impl YieldCurve {
    /// The documented sample curve used when the market-data provider fails.
    pub fn fallback() -> Self {
        Self {
            yields: Maturity::ALL
                .iter()
                .map(|m| (*m, m.fallback_yield()))
                .collect(),
        }
    }

    /// Build a curve from a possibly incomplete snapshot. Missing or
    /// non-finite maturities take their fallback value.
    pub fn from_partial(snapshot: &BTreeMap<Maturity, f64>) -> Self {
        let yields = Maturity::ALL
            .iter()
            .map(|m| match snapshot.get(m) {
                Some(y) if y.is_finite() => (*m, *y),
                _ => {
                    warn!("no yield for {m}, using fallback {}", m.fallback_yield());
                    (*m, m.fallback_yield())
                }
            })
            .collect();
        Self { yields }
    }

    pub fn get(&self, maturity: Maturity) -> f64 {
        self.yields
            .get(&maturity)
            .copied()
            .unwrap_or_else(|| maturity.fallback_yield())
    }

    /// (maturity, yield) pairs, shortest maturity first.
    pub fn points(&self) -> impl Iterator<Item = (Maturity, f64)> + '_ {
        self.yields.iter().map(|(m, y)| (*m, *y))
    }

    /// Apply a shift of `magnitude` percentage points with the given shape.
    pub fn shift(&self, shift: CurveShift, magnitude: f64) -> EngineResult<YieldCurve> {
        ensure_finite("magnitude", magnitude)?;
        let yields = self
            .yields
            .iter()
            .map(|(m, y)| (*m, y + magnitude * shift.weight(*m)))
            .collect();
        Ok(YieldCurve { yields })
    }
}

impl From<BTreeMap<Maturity, f64>> for YieldCurve {
    fn from(snapshot: BTreeMap<Maturity, f64>) -> Self {
        Self::from_partial(&snapshot)
    }
}

impl From<YieldCurve> for BTreeMap<Maturity, f64> {
    fn from(curve: YieldCurve) -> Self {
        curve.yields
    }
}

/// Free-function form of [`YieldCurve::shift`].
pub fn shift_curve(curve: &YieldCurve, shift: CurveShift, magnitude: f64) -> EngineResult<YieldCurve> {
    curve.shift(shift, magnitude)
}
