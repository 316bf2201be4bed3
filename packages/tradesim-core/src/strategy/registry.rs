//! Built-in strategy catalogue.

use super::{CrossingAverages, OscillatorTrader, RandomTrader, TradingStrategy};
use crate::config::{CrossingParams, OscillatorParams, RandomParams, SimulationConfig};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Catalogue entry describing a strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    /// Strategy identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Description of how the strategy works
    pub description: String,
    /// Default parameters, as they appear in the config file
    pub parameters: serde_json::Value,
}

fn entry<P: Serialize>(id: &str, name: &str, description: &str, parameters: P) -> (String, Strategy) {
    (
        id.to_string(),
        Strategy {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            parameters: serde_json::to_value(parameters).unwrap_or_default(),
        },
    )
}

/// Built-in trading strategies.
pub static BUILTIN_STRATEGIES: LazyLock<HashMap<String, Strategy>> = LazyLock::new(|| {
    HashMap::from([
        entry(
            "random",
            "Random Strategy",
            "Every period, buy, sell or hold each stock at random",
            RandomParams::default(),
        ),
        entry(
            "crossing_averages",
            "Crossing Averages",
            "Buy when the fast moving average crosses above the slow one, sell on the opposite cross",
            CrossingParams::default(),
        ),
        entry(
            "oscillator",
            "Oscillator Threshold",
            "Buy after the oscillator stays below the lower threshold, sell after it stays above the upper one",
            OscillatorParams::default(),
        ),
    ])
});

/// List all available strategies, sorted by id.
pub fn list_strategies() -> Vec<Strategy> {
    let mut strategies: Vec<Strategy> = BUILTIN_STRATEGIES.values().cloned().collect();
    strategies.sort_by(|a, b| a.id.cmp(&b.id));
    strategies
}

/// Get a specific strategy by ID.
pub fn get_strategy(id: &str) -> Option<Strategy> {
    BUILTIN_STRATEGIES.get(&id.to_lowercase()).cloned()
}

/// Get all strategy IDs, sorted.
pub fn strategy_ids() -> Vec<String> {
    let mut ids: Vec<String> = BUILTIN_STRATEGIES.keys().cloned().collect();
    ids.sort();
    ids
}

/// Instantiate a strategy with the parameters from `config`.
pub fn build_strategy(id: &str, config: &SimulationConfig) -> Result<Box<dyn TradingStrategy>> {
    let strategy: Box<dyn TradingStrategy> = match id.to_lowercase().as_str() {
        "random" => Box::new(RandomTrader::new(config.random.clone())?),
        "crossing_averages" => Box::new(CrossingAverages::new(config.crossing.clone())?),
        "oscillator" => Box::new(OscillatorTrader::new(config.oscillator.clone())?),
        _ => {
            return Err(Error::UnknownStrategy(format!(
                "{} (available: {})",
                id,
                strategy_ids().join(", ")
            )))
        }
    };
    Ok(strategy)
}
