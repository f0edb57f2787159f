//! Entry signal registry, used to pick one signal at startup.

use crate::{
    BreakoutAtrConfig, BreakoutAtrSignal, CombinedConfig, CombinedSignal, EmaCrossConfig,
    EmaCrossSignal, NeverSignal, RsiMacdConfig, RsiMacdSignal,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use runner_core::{
    error::SignalError,
    traits::{EntrySignal, SignalConfig},
};

/// Information about a registered signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalInfo {
    pub name: String,
    pub description: String,
    /// Default configuration as JSON
    pub default_config: serde_json::Value,
}

/// Registry of the built-in entry signals.
pub struct SignalRegistry {
    signals: BTreeMap<String, SignalInfo>,
}

impl SignalRegistry {
    /// Create a registry with all built-in signals.
    pub fn new() -> Self {
        let mut registry = Self {
            signals: BTreeMap::new(),
        };

        registry.register(
            "combined",
            "Majority vote of rsi_macd, ema_cross and breakout_atr (production)",
            &CombinedConfig::default(),
        );
        registry.register(
            "rsi_macd",
            "RSI bounce confirmed by a MACD cross and EMA200 trend",
            &RsiMacdConfig::default(),
        );
        registry.register(
            "ema_cross",
            "EMA20/EMA50 cross on the side of EMA200",
            &EmaCrossConfig::default(),
        );
        registry.register(
            "breakout_atr",
            "Donchian 20 breakout with ATR14 above 0.4% of price",
            &BreakoutAtrConfig::default(),
        );
        registry.register("never", "Never enters; manage-only mode", &serde_json::json!({}));

        registry
    }

    fn register(&mut self, name: &str, description: &str, config: &impl Serialize) {
        self.signals.insert(
            name.to_string(),
            SignalInfo {
                name: name.to_string(),
                description: description.to_string(),
                default_config: serde_json::to_value(config).unwrap_or_default(),
            },
        );
    }

    /// List all available signals, sorted by name.
    pub fn list(&self) -> Vec<&SignalInfo> {
        self.signals.values().collect()
    }

    /// Get signal info by name.
    pub fn get(&self, name: &str) -> Option<&SignalInfo> {
        self.signals.get(name)
    }

    /// Check if a signal exists.
    pub fn exists(&self, name: &str) -> bool {
        self.signals.contains_key(name)
    }

    /// Create a signal from a JSON configuration.
    ///
    /// Missing fields take their defaults.
    pub fn create(
        &self,
        name: &str,
        config: serde_json::Value,
    ) -> Result<Box<dyn EntrySignal>, SignalError> {
        match name {
            "combined" => Ok(Box::new(CombinedSignal::new(parse::<CombinedConfig>(config)?))),
            "rsi_macd" => Ok(Box::new(RsiMacdSignal::new(parse::<RsiMacdConfig>(config)?))),
            "ema_cross" => Ok(Box::new(EmaCrossSignal::new(parse::<EmaCrossConfig>(config)?))),
            "breakout_atr" => Ok(Box::new(BreakoutAtrSignal::new(parse::<BreakoutAtrConfig>(
                config,
            )?))),
            "never" => Ok(Box::new(NeverSignal)),
            _ => Err(SignalError::NotFound(name.to_string())),
        }
    }

    /// Create a signal with its default configuration.
    pub fn create_default(&self, name: &str) -> Result<Box<dyn EntrySignal>, SignalError> {
        let info = self
            .get(name)
            .ok_or_else(|| SignalError::NotFound(name.to_string()))?;
        self.create(name, info.default_config.clone())
    }
}

impl Default for SignalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn parse<C>(config: serde_json::Value) -> Result<C, SignalError>
where
    C: SignalConfig + DeserializeOwned,
{
    // null and {} both mean "defaults"
    let config = if config.is_null() {
        serde_json::json!({})
    } else {
        config
    };
    let parsed: C =
        serde_json::from_value(config).map_err(|e| SignalError::InvalidConfig(e.to_string()))?;
    parsed.validate()?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_list() {
        let registry = SignalRegistry::new();
        let names: Vec<&str> = registry.list().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["breakout_atr", "combined", "ema_cross", "never", "rsi_macd"]
        );
    }

    #[test]
    fn test_create_default() {
        let registry = SignalRegistry::new();
        let signal = registry.create_default("combined").unwrap();
        assert_eq!(signal.name(), "combined");
        assert_eq!(signal.warmup_period(), 202);
    }

    #[test]
    fn test_create_with_partial_config() {
        let registry = SignalRegistry::new();
        let signal = registry
            .create("ema_cross", serde_json::json!({ "fast_period": 9 }))
            .unwrap();
        assert_eq!(signal.name(), "ema_cross");

        let invalid = registry.create("ema_cross", serde_json::json!({ "fast_period": 80 }));
        assert!(matches!(invalid, Err(SignalError::InvalidConfig(_))));
    }

    #[test]
    fn test_create_unknown_signal() {
        let registry = SignalRegistry::new();
        assert!(matches!(
            registry.create_default("moon"),
            Err(SignalError::NotFound(_))
        ));
    }
}
