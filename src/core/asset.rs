use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an asset (ticker, ISIN, internal code) in a return matrix.
///
/// # Examples
///
/// ```
/// use quant_engine::core::asset::AssetId;
///
/// let aapl = AssetId::new("AAPL");
/// let msft = AssetId::new("MSFT");
/// assert_ne!(aapl, msft);
/// assert_eq!(aapl.as_str(), "AAPL");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_display() {
        assert_eq!(format!("{}", AssetId::new("GOOGL")), "GOOGL");
    }

    #[test]
    fn test_asset_ordering() {
        assert!(AssetId::new("AAPL") < AssetId::new("MSFT"));
    }

    #[test]
    fn test_asset_serializes_transparently() {
        let json = serde_json::to_string(&AssetId::new("TSLA")).unwrap();
        assert_eq!(json, "\"TSLA\"");
    }
}
