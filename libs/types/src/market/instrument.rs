//! Instrument identification
//!
//! Instruments are identified by their `BASE/QUOTE` symbol as supplied by the
//! market data vendors (`EUR/USD`, `XAU/USD`, `BTC/USD`). The asset class is
//! derived from the base currency so no registry lookup is needed.

use crate::common::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Broad asset class used for per-class scheduling and volume handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Forex,
    Metal,
    Crypto,
}

const METALS: [&str; 4] = ["XAU", "XAG", "XPT", "XPD"];
const CRYPTO: [&str; 6] = ["BTC", "ETH", "SOL", "XRP", "LTC", "ADA"];

/// A tradable instrument, e.g. `EUR/USD`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Instrument {
    symbol: String,
    asset_class: AssetClass,
}

impl Instrument {
    pub fn new(symbol: &str) -> Result<Self, ValidationError> {
        let symbol = symbol.trim().to_ascii_uppercase();
        let invalid = || ValidationError::InvalidSymbol {
            symbol: symbol.clone(),
        };

        let (base, quote) = symbol.split_once('/').ok_or_else(invalid)?;
        let well_formed = |code: &str| {
            (3..=5).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphabetic())
        };
        if !well_formed(base) || !well_formed(quote) {
            return Err(invalid());
        }

        let asset_class = if METALS.contains(&base) {
            AssetClass::Metal
        } else if CRYPTO.contains(&base) {
            AssetClass::Crypto
        } else {
            AssetClass::Forex
        };

        Ok(Self {
            symbol,
            asset_class,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn asset_class(&self) -> AssetClass {
        self.asset_class
    }

    pub fn base(&self) -> &str {
        self.symbol.split('/').next().unwrap_or_default()
    }

    pub fn quote(&self) -> &str {
        self.symbol.split('/').nth(1).unwrap_or_default()
    }

    /// Filesystem-safe form of the symbol (`EUR/USD` -> `EUR_USD`)
    pub fn file_stem(&self) -> String {
        self.symbol.replace('/', "_")
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

impl FromStr for Instrument {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Instrument::new(s)
    }
}

impl TryFrom<String> for Instrument {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Instrument::new(&value)
    }
}

impl From<Instrument> for String {
    fn from(value: Instrument) -> Self {
        value.symbol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_class_inference() {
        assert_eq!(Instrument::new("EUR/USD").unwrap().asset_class(), AssetClass::Forex);
        assert_eq!(Instrument::new("xau/usd").unwrap().asset_class(), AssetClass::Metal);
        assert_eq!(Instrument::new("BTC/USD").unwrap().asset_class(), AssetClass::Crypto);
    }

    #[test]
    fn test_symbol_normalisation() {
        let gold = Instrument::new(" xau/usd ").unwrap();
        assert_eq!(gold.symbol(), "XAU/USD");
        assert_eq!(gold.base(), "XAU");
        assert_eq!(gold.quote(), "USD");
        assert_eq!(gold.file_stem(), "XAU_USD");
    }

    #[test]
    fn test_rejects_malformed_symbols() {
        for bad in ["EURUSD", "EUR/", "/USD", "EU/USD", "EUR/US1", ""] {
            assert!(Instrument::new(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_serde_as_plain_string() {
        let json = serde_json::to_string(&Instrument::new("GBP/USD").unwrap()).unwrap();
        assert_eq!(json, "\"GBP/USD\"");
        let back: Instrument = serde_json::from_str(&json).unwrap();
        assert_eq!(back.asset_class(), AssetClass::Forex);
        assert!(serde_json::from_str::<Instrument>("\"GBPUSD\"").is_err());
    }
}
