//! Simulation and strategy configuration.
//!
//! Every knob the strategies use lives here rather than in the strategy code.
//! The whole structure round-trips through JSON and every field has a default,
//! so a config file only needs the values it changes.

use crate::indicators::OscillatorKind;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Five years of daily prices.
pub const DEFAULT_DAYS: usize = 5 * 365;

/// Top-level configuration for a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed fee charged per transaction
    pub fees: f64,
    /// Budget per stock for the day 0 purchase
    pub initial_amount: f64,
    /// Horizon for generated data
    pub days: usize,
    /// Daily probability of a news shock in generated data
    pub news_probability: f64,
    /// Seed for data generation (entropy when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Random strategy parameters
    pub random: RandomParams,
    /// Moving-average crossover parameters
    pub crossing: CrossingParams,
    /// Oscillator threshold parameters
    pub oscillator: OscillatorParams,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fees: 20.0,
            initial_amount: 5000.0,
            days: DEFAULT_DAYS,
            news_probability: 0.01,
            seed: None,
            random: RandomParams::default(),
            crossing: CrossingParams::default(),
            oscillator: OscillatorParams::default(),
        }
    }
}

/// Parameters for the random strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RandomParams {
    /// Days between trading decisions
    pub period: usize,
    /// Maximum spend per purchase, fee included
    pub amount: f64,
    /// Probability of buying a given stock on a decision day
    pub buy_probability: f64,
    /// Probability of selling a given stock on a decision day
    pub sell_probability: f64,
    /// Seed for the decision RNG (entropy when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Sell every holding on the final day
    pub liquidate_at_end: bool,
}

impl Default for RandomParams {
    fn default() -> Self {
        Self {
            period: 7,
            amount: 5000.0,
            buy_probability: 1.0 / 3.0,
            sell_probability: 1.0 / 3.0,
            seed: None,
            liquidate_at_end: true,
        }
    }
}

/// Parameters for the moving-average crossover strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrossingParams {
    /// Window of the fast moving average
    pub fast: usize,
    /// Window of the slow moving average
    pub slow: usize,
    /// Optional weights for the fast average (length `fast`, oldest first)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fast_weights: Vec<f64>,
    /// Optional weights for the slow average (length `slow`, oldest first)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub slow_weights: Vec<f64>,
    /// Maximum spend per purchase, fee included
    pub amount: f64,
    /// Days after a trade during which signals for that stock are ignored
    pub cool_off: usize,
    /// Sell every holding on the final day
    pub liquidate_at_end: bool,
    /// Send both averages of every stock to the report sink
    pub plot: bool,
}

impl Default for CrossingParams {
    fn default() -> Self {
        Self {
            fast: 50,
            slow: 200,
            fast_weights: Vec::new(),
            slow_weights: Vec::new(),
            amount: 5000.0,
            cool_off: 0,
            liquidate_at_end: true,
            plot: false,
        }
    }
}

/// Parameters for the oscillator threshold strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OscillatorParams {
    /// Which oscillator to compute
    pub kind: OscillatorKind,
    /// Oscillator lookback in days
    pub period: usize,
    /// Undervalued below this level
    pub lower: f64,
    /// Overvalued above this level
    pub upper: f64,
    /// Consecutive days beyond a threshold before trading
    pub wait_time: usize,
    /// Moving-average smoothing applied to the oscillator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smoothing: Option<usize>,
    /// Maximum spend per purchase, fee included
    pub amount: f64,
    /// Sell every holding on the final day
    pub liquidate_at_end: bool,
    /// Send the oscillator of every stock to the report sink
    pub plot: bool,
}

impl Default for OscillatorParams {
    fn default() -> Self {
        Self {
            kind: OscillatorKind::Stochastic,
            period: 7,
            lower: 0.25,
            upper: 0.75,
            wait_time: 3,
            smoothing: None,
            amount: 5000.0,
            liquidate_at_end: true,
            plot: false,
        }
    }
}

impl RandomParams {
    pub fn validate(&self) -> Result<()> {
        if self.period == 0 {
            return Err(Error::InvalidOperation(
                "Random strategy period must be at least 1 day".to_string(),
            ));
        }
        let total = self.buy_probability + self.sell_probability;
        if self.buy_probability < 0.0 || self.sell_probability < 0.0 || total > 1.0 {
            return Err(Error::InvalidOperation(format!(
                "Buy/sell probabilities must be non-negative and sum to at most 1, got {} and {}",
                self.buy_probability, self.sell_probability
            )));
        }
        Ok(())
    }
}

impl CrossingParams {
    pub fn validate(&self) -> Result<()> {
        if self.fast == 0 || self.fast >= self.slow {
            return Err(Error::InvalidOperation(format!(
                "Fast window must be positive and shorter than the slow window ({} vs {})",
                self.fast, self.slow
            )));
        }
        check_weights("fast", &self.fast_weights, self.fast)?;
        check_weights("slow", &self.slow_weights, self.slow)?;
        Ok(())
    }
}

impl OscillatorParams {
    pub fn validate(&self) -> Result<()> {
        if self.period < 2 {
            return Err(Error::InvalidOperation(
                "Oscillator period must be at least 2 days".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.lower)
            || !(0.0..=1.0).contains(&self.upper)
            || self.lower >= self.upper
        {
            return Err(Error::InvalidOperation(format!(
                "Thresholds must satisfy 0 <= lower < upper <= 1, got {} and {}",
                self.lower, self.upper
            )));
        }
        if self.smoothing == Some(0) {
            return Err(Error::InvalidOperation(
                "Smoothing period must be at least 1 day".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_weights(which: &str, weights: &[f64], window: usize) -> Result<()> {
    if !weights.is_empty() && weights.len() != window {
        return Err(Error::InvalidOperation(format!(
            "{} weights have length {}, expected {}",
            which,
            weights.len(),
            window
        )));
    }
    Ok(())
}

impl SimulationConfig {
    /// Get the default config file path (`~/.tradesim/config.json`).
    pub fn default_path() -> PathBuf {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".tradesim/config.json"))
            .unwrap_or_else(|| PathBuf::from("tradesim.json"))
    }

    /// Load the config from the default path.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::default_path())
    }

    /// Load the config from a specific path, falling back to defaults when it does not exist.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the config to a specific path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        if self.fees < 0.0 {
            return Err(Error::InvalidOperation(format!(
                "Fees cannot be negative, got {}",
                self.fees
            )));
        }
        if !(0.0..=1.0).contains(&self.news_probability) {
            return Err(Error::InvalidOperation(format!(
                "News probability must be within [0, 1], got {}",
                self.news_probability
            )));
        }
        self.random.validate()?;
        self.crossing.validate()?;
        self.oscillator.validate()
    }
}
