use crate::core::asset::AssetId;
use crate::core::error::{EngineError, EngineResult};
use crate::core::stats::{self, TRADING_DAYS};
use chrono::{DateTime, Datelike, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Sampling frequency for returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    /// Last observation of each ISO week.
    Weekly,
    /// Last observation of each calendar month.
    Monthly,
}

impl FromStr for Frequency {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" | "d" => Ok(Frequency::Daily),
            "weekly" | "w" => Ok(Frequency::Weekly),
            "monthly" | "m" => Ok(Frequency::Monthly),
            other => Err(EngineError::invalid("frequency", format!("unknown frequency '{other}'"))),
        }
    }
}

/// A timestamp-ordered price history for one instrument.
///
/// Timestamps are strictly increasing and prices are finite and positive.
/// An empty series is valid: it is how a market-data provider signals
/// "no data" for a symbol.
///
/// # Examples
///
/// ```
/// use quant_engine::core::series::PriceSeries;
/// use chrono::{TimeZone, Utc};
///
/// let series = PriceSeries::new(vec![
///     (Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(), 100.0),
///     (Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap(), 110.0),
/// ]).unwrap();
///
/// let returns = series.simple_returns();
/// assert_eq!(returns.len(), 1);
/// assert!((returns.values()[0] - 0.10).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<(DateTime<Utc>, f64)>",
    into = "Vec<(DateTime<Utc>, f64)>"
)]
pub struct PriceSeries {
    points: Vec<(DateTime<Utc>, f64)>,
}

impl PriceSeries {
    pub fn new(points: Vec<(DateTime<Utc>, f64)>) -> EngineResult<Self> {
        for window in points.windows(2) {
            if window[1].0 <= window[0].0 {
                return Err(EngineError::invalid(
                    "points",
                    format!(
                        "timestamps must be strictly increasing ({} followed by {})",
                        window[0].0, window[1].0
                    ),
                ));
            }
        }
        if let Some((ts, price)) = points.iter().find(|(_, p)| !(p.is_finite() && *p > 0.0)) {
            return Err(EngineError::invalid(
                "points",
                format!("price at {ts} must be positive, got {price}"),
            ));
        }
        Ok(Self { points })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[(DateTime<Utc>, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last_price(&self) -> Option<f64> {
        self.points.last().map(|(_, p)| *p)
    }

    /// Period-over-period fractional changes, stamped with the later timestamp.
    /// Fewer than two prices yield an empty series.
    pub fn simple_returns(&self) -> ReturnSeries {
        let points = self
            .points
            .windows(2)
            .map(|w| (w[1].0, w[1].1 / w[0].1 - 1.0))
            .collect();
        ReturnSeries { points }
    }

    /// Keep the last observation in each bucket of the given frequency.
    pub fn resample(&self, frequency: Frequency) -> PriceSeries {
        let bucket = |ts: &DateTime<Utc>| -> (i32, u32) {
            match frequency {
                Frequency::Daily => (ts.year(), ts.ordinal()),
                Frequency::Weekly => {
                    let week = ts.iso_week();
                    (week.year(), week.week())
                }
                Frequency::Monthly => (ts.year(), ts.month()),
            }
        };

        let mut out: Vec<(DateTime<Utc>, f64)> = Vec::new();
        let mut last_bucket = None;
        for point in &self.points {
            let b = bucket(&point.0);
            if last_bucket == Some(b) {
                if let Some(slot) = out.last_mut() {
                    *slot = *point;
                }
            } else {
                out.push(*point);
                last_bucket = Some(b);
            }
        }
        PriceSeries { points: out }
    }

    /// Returns at the given sampling frequency.
    pub fn returns(&self, frequency: Frequency) -> ReturnSeries {
        self.resample(frequency).simple_returns()
    }
}

impl TryFrom<Vec<(DateTime<Utc>, f64)>> for PriceSeries {
    type Error = EngineError;

    fn try_from(points: Vec<(DateTime<Utc>, f64)>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<PriceSeries> for Vec<(DateTime<Utc>, f64)> {
    fn from(series: PriceSeries) -> Self {
        series.points
    }
}

/// Ordered fractional returns derived from a [`PriceSeries`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    points: Vec<(DateTime<Utc>, f64)>,
}

impl ReturnSeries {
    pub fn points(&self) -> &[(DateTime<Utc>, f64)] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, r)| *r).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Annualized rolling volatility: sample std over each trailing window,
    /// scaled by √252. The first value is stamped at the window's last return.
    pub fn rolling_volatility(&self, window: usize) -> EngineResult<Vec<(DateTime<Utc>, f64)>> {
        if window < 2 {
            return Err(EngineError::invalid(
                "window",
                format!("must be at least 2, got {window}"),
            ));
        }
        let values = self.values();
        Ok(self
            .points
            .iter()
            .enumerate()
            .skip(window - 1)
            .filter_map(|(i, (ts, _))| {
                stats::sample_std(&values[i + 1 - window..=i])
                    .map(|sd| (*ts, sd * TRADING_DAYS.sqrt()))
            })
            .collect())
    }
}

/// Periods × assets matrix of simple returns.
///
/// Every row has one entry per asset, in the order of [`ReturnMatrix::assets`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawReturnMatrix")]
pub struct ReturnMatrix {
    assets: Vec<AssetId>,
    rows: Vec<Vec<f64>>,
}

/// Unchecked wire form of [`ReturnMatrix`].
#[derive(Deserialize)]
struct RawReturnMatrix {
    assets: Vec<AssetId>,
    rows: Vec<Vec<f64>>,
}

impl TryFrom<RawReturnMatrix> for ReturnMatrix {
    type Error = EngineError;

    fn try_from(raw: RawReturnMatrix) -> Result<Self, Self::Error> {
        ReturnMatrix::new(raw.assets, raw.rows)
    }
}

impl ReturnMatrix {
    pub fn new(assets: Vec<AssetId>, rows: Vec<Vec<f64>>) -> EngineResult<Self> {
        if assets.is_empty() {
            return Err(EngineError::DataUnavailable("no assets supplied".into()));
        }
        if rows.is_empty() {
            return Err(EngineError::DataUnavailable("no return observations".into()));
        }
        let unique: BTreeSet<&AssetId> = assets.iter().collect();
        if unique.len() != assets.len() {
            return Err(EngineError::invalid("assets", "asset identifiers must be unique"));
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != assets.len() {
                return Err(EngineError::invalid(
                    "rows",
                    format!(
                        "row {i} has {} values but there are {} assets",
                        row.len(),
                        assets.len()
                    ),
                ));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(EngineError::invalid("rows", format!("row {i} has a non-finite return")));
            }
        }
        Ok(Self { assets, rows })
    }

    /// Build a matrix from one price series per asset.
    ///
    /// Empty series are skipped. The remaining series are aligned on the
    /// timestamps they all share, and returns are taken over those aligned
    /// prices.
    pub fn from_price_series(series: &[(AssetId, PriceSeries)]) -> EngineResult<Self> {
        let available: Vec<&(AssetId, PriceSeries)> = series
            .iter()
            .filter(|(asset, s)| {
                if s.is_empty() {
                    warn!("no price data for {asset}, excluding it from the return matrix");
                }
                !s.is_empty()
            })
            .collect();

        let (first, rest) = available
            .split_first()
            .ok_or_else(|| EngineError::DataUnavailable("every price series is empty".into()))?;

        let mut common: BTreeSet<DateTime<Utc>> = first.1.points().iter().map(|(ts, _)| *ts).collect();
        for (_, s) in rest {
            let stamps: BTreeSet<DateTime<Utc>> = s.points().iter().map(|(ts, _)| *ts).collect();
            common = common.intersection(&stamps).copied().collect();
        }

        let aligned: Vec<Vec<f64>> = available
            .iter()
            .map(|(_, s)| {
                s.points()
                    .iter()
                    .filter(|(ts, _)| common.contains(ts))
                    .map(|(_, p)| *p)
                    .collect()
            })
            .collect();

        let n_prices = common.len();
        if n_prices < 2 {
            return Err(EngineError::DataUnavailable(format!(
                "series share {n_prices} timestamps, need at least 2 to form returns"
            )));
        }

        let rows = (1..n_prices)
            .map(|t| aligned.iter().map(|p| p[t] / p[t - 1] - 1.0).collect())
            .collect();
        let assets = available.iter().map(|(a, _)| a.clone()).collect();

        debug!(
            "aligned {} series on {} common timestamps",
            available.len(),
            n_prices
        );
        Self::new(assets, rows)
    }

    pub fn assets(&self) -> &[AssetId] {
        &self.assets
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    pub fn n_periods(&self) -> usize {
        self.rows.len()
    }

    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[index]).collect()
    }

    /// Per-asset mean period return.
    pub fn mean_returns(&self) -> Vec<f64> {
        (0..self.n_assets())
            .map(|j| stats::mean(&self.column(j)))
            .collect()
    }

    /// Sample covariance of period returns (not annualized).
    pub fn covariance(&self) -> EngineResult<Vec<Vec<f64>>> {
        self.require_periods(2)?;
        Ok(stats::covariance_matrix(&self.rows))
    }

    /// Pearson correlation matrix. An asset with zero variance makes the
    /// matrix undefined.
    pub fn correlation(&self) -> EngineResult<Vec<Vec<f64>>> {
        let cov = self.covariance()?;
        let sd: Vec<f64> = (0..self.n_assets()).map(|i| cov[i][i].sqrt()).collect();
        if let Some(i) = sd.iter().position(|s| *s == 0.0) {
            return Err(EngineError::NumericDegenerate(format!(
                "{} has zero variance, correlation is undefined",
                self.assets[i]
            )));
        }
        Ok(cov
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .map(|(j, c)| if i == j { 1.0 } else { c / (sd[i] * sd[j]) })
                    .collect()
            })
            .collect())
    }

    /// Weighted per-period portfolio returns.
    pub fn portfolio_returns(&self, weights: &[f64]) -> EngineResult<Vec<f64>> {
        if weights.len() != self.n_assets() {
            return Err(EngineError::invalid(
                "weights",
                format!(
                    "has {} entries but the matrix has {} assets",
                    weights.len(),
                    self.n_assets()
                ),
            ));
        }
        Ok(self.rows.iter().map(|r| stats::dot(r, weights)).collect())
    }

    pub(crate) fn require_periods(&self, required: usize) -> EngineResult<()> {
        if self.n_periods() < required {
            return Err(EngineError::DataUnavailable(format!(
                "need at least {required} return observations, have {}",
                self.n_periods()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn series(prices: &[(u32, f64)]) -> PriceSeries {
        PriceSeries::new(prices.iter().map(|(d, p)| (day(*d), *p)).collect()).unwrap()
    }

    #[test]
    fn test_price_series_rejects_duplicate_timestamps() {
        let result = PriceSeries::new(vec![(day(2), 100.0), (day(2), 101.0)]);
        assert!(matches!(result, Err(EngineError::InvalidParameter { .. })));
    }

    #[test]
    fn test_price_series_rejects_non_positive_price() {
        assert!(PriceSeries::new(vec![(day(2), 0.0)]).is_err());
    }

    #[test]
    fn test_simple_returns_length() {
        let s = series(&[(2, 100.0), (3, 110.0), (4, 99.0)]);
        let r = s.simple_returns();
        assert_eq!(r.len(), s.len() - 1);
        assert_relative_eq!(r.values()[0], 0.10, epsilon = 1e-12);
        assert_relative_eq!(r.values()[1], -0.10, epsilon = 1e-12);
        assert_eq!(r.points()[0].0, day(3));
    }

    #[test]
    fn test_empty_series_has_no_returns() {
        assert!(PriceSeries::empty().simple_returns().is_empty());
        assert!(series(&[(2, 100.0)]).simple_returns().is_empty());
    }

    #[test]
    fn test_weekly_resample_keeps_last_of_week() {
        // 2024-01-01 is a Monday; days 1..=7 are one ISO week, day 8 starts the next.
        let s = series(&[(1, 100.0), (3, 102.0), (5, 104.0), (8, 110.0), (9, 111.0)]);
        let weekly = s.resample(Frequency::Weekly);
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly.points()[0], (day(5), 104.0));
        assert_eq!(weekly.points()[1], (day(9), 111.0));
    }

    #[test]
    fn test_monthly_returns() {
        let s = PriceSeries::new(vec![
            (Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(), 100.0),
            (Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap(), 100.0),
            (Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap(), 120.0),
        ])
        .unwrap();
        let r = s.returns(Frequency::Monthly);
        assert_eq!(r.len(), 1);
        assert_relative_eq!(r.values()[0], 0.20, epsilon = 1e-12);
    }

    #[test]
    fn test_rolling_volatility_window() {
        let s = series(&[(2, 100.0), (3, 101.0), (4, 100.0), (5, 102.0), (8, 101.0)]);
        let r = s.simple_returns();
        let vol = r.rolling_volatility(3).unwrap();
        assert_eq!(vol.len(), r.len() - 2);
        assert!(vol.iter().all(|(_, v)| *v > 0.0));
        assert!(r.rolling_volatility(1).is_err());
    }

    #[test]
    fn test_matrix_alignment_on_common_timestamps() {
        let a = series(&[(2, 100.0), (3, 110.0), (4, 121.0)]);
        let b = series(&[(3, 50.0), (4, 55.0), (5, 60.0)]);
        let m = ReturnMatrix::from_price_series(&[
            (AssetId::new("A"), a),
            (AssetId::new("B"), b),
        ])
        .unwrap();
        assert_eq!(m.n_periods(), 1);
        assert_relative_eq!(m.rows()[0][0], 0.10, epsilon = 1e-12);
        assert_relative_eq!(m.rows()[0][1], 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_matrix_skips_empty_series() {
        let a = series(&[(2, 100.0), (3, 110.0), (4, 121.0)]);
        let m = ReturnMatrix::from_price_series(&[
            (AssetId::new("A"), a),
            (AssetId::new("EMPTY"), PriceSeries::empty()),
        ])
        .unwrap();
        assert_eq!(m.assets(), &[AssetId::new("A")]);
        assert_eq!(m.n_periods(), 2);
    }

    #[test]
    fn test_matrix_all_empty_is_data_unavailable() {
        let result = ReturnMatrix::from_price_series(&[(AssetId::new("A"), PriceSeries::empty())]);
        assert!(matches!(result, Err(EngineError::DataUnavailable(_))));
    }

    #[test]
    fn test_matrix_rejects_ragged_rows() {
        let result = ReturnMatrix::new(
            vec![AssetId::new("A"), AssetId::new("B")],
            vec![vec![0.01, 0.02], vec![0.01]],
        );
        assert!(matches!(result, Err(EngineError::InvalidParameter { .. })));
    }

    #[test]
    fn test_correlation_of_identical_columns() {
        let m = ReturnMatrix::new(
            vec![AssetId::new("A"), AssetId::new("B")],
            vec![vec![0.01, 0.01], vec![-0.02, -0.02], vec![0.03, 0.03]],
        )
        .unwrap();
        let corr = m.correlation().unwrap();
        assert_relative_eq!(corr[0][1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_correlation_zero_variance_is_degenerate() {
        let m = ReturnMatrix::new(
            vec![AssetId::new("A"), AssetId::new("B")],
            vec![vec![0.01, 0.0], vec![-0.02, 0.0]],
        )
        .unwrap();
        assert!(matches!(m.correlation(), Err(EngineError::NumericDegenerate(_))));
    }

    #[test]
    fn test_price_series_json_shape() {
        let s = series(&[(2, 100.0)]);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json[0][1], 100.0);
        let back: PriceSeries = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_ragged_matrix_json_is_rejected() {
        let json = r#"{"assets":["A","B"],"rows":[[0.1],[0.2,0.3]]}"#;
        assert!(serde_json::from_str::<ReturnMatrix>(json).is_err());

        let dup = r#"{"assets":["A","A"],"rows":[[0.1,0.2]]}"#;
        assert!(serde_json::from_str::<ReturnMatrix>(dup).is_err());
    }

    #[test]
    fn test_matrix_json_round_trip() {
        let m = ReturnMatrix::new(
            vec![AssetId::new("A"), AssetId::new("B")],
            vec![vec![0.01, 0.02], vec![-0.01, 0.0]],
        )
        .unwrap();
        let back: ReturnMatrix = serde_json::from_str(&serde_json::to_string(&m).unwrap()).unwrap();
        assert_eq!(back.assets(), m.assets());
        assert_eq!(back.n_periods(), 2);
    }
}
