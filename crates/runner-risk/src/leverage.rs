//! Per-symbol leverage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Highest leverage the venue accepts.
pub const MAX_LEVERAGE: u32 = 125;

/// Default leverage plus per-symbol overrides, each clamped to 1..=125.
///
/// Parses from the compact form `BTCUSDT:15,ETHUSDT:10`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeverageMap {
    pub default: u32,
    pub overrides: BTreeMap<String, u32>,
}

impl Default for LeverageMap {
    fn default() -> Self {
        Self {
            default: 10,
            overrides: BTreeMap::new(),
        }
    }
}

impl LeverageMap {
    pub fn new(default: u32) -> Self {
        Self {
            default: clamp(default),
            overrides: BTreeMap::new(),
        }
    }

    /// Add an override.
    pub fn with_override(mut self, symbol: impl Into<String>, leverage: u32) -> Self {
        self.overrides
            .insert(symbol.into().to_uppercase(), clamp(leverage));
        self
    }

    /// Leverage to use for `symbol`.
    pub fn for_symbol(&self, symbol: &str) -> u32 {
        clamp(
            self.overrides
                .get(&symbol.to_uppercase())
                .copied()
                .unwrap_or(self.default),
        )
    }
}

fn clamp(leverage: u32) -> u32 {
    leverage.clamp(1, MAX_LEVERAGE)
}

impl FromStr for LeverageMap {
    type Err = String;

    /// Parse `SYMBOL:LEV` pairs; the default stays 10 until set separately.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut map = LeverageMap::default();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (symbol, lev) = pair
                .split_once(':')
                .ok_or_else(|| format!("Invalid leverage entry: {}", pair))?;
            let lev: u32 = lev
                .trim()
                .parse()
                .map_err(|_| format!("Invalid leverage value in: {}", pair))?;
            map = map.with_override(symbol.trim(), lev);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_lookup() {
        let map: LeverageMap = "BTCUSDT:15, ethusdt:10".parse().unwrap();
        assert_eq!(map.for_symbol("BTCUSDT"), 15);
        assert_eq!(map.for_symbol("ETHUSDT"), 10);
        assert_eq!(map.for_symbol("SOLUSDT"), 10);
    }

    #[test]
    fn test_clamped() {
        let map = LeverageMap::new(0).with_override("XUSDT", 500);
        assert_eq!(map.for_symbol("XUSDT"), MAX_LEVERAGE);
        assert_eq!(map.for_symbol("YUSDT"), 1);
    }

    #[test]
    fn test_parse_errors() {
        assert!("BTCUSDT".parse::<LeverageMap>().is_err());
        assert!("BTCUSDT:x".parse::<LeverageMap>().is_err());
        assert!("".parse::<LeverageMap>().is_ok());
    }
}
