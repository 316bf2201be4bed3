//! Technical indicators used by the trading strategies.
//!
//! - **Moving averages**: plain or weighted, `NaN`-aware
//! - **RSI**: relative strength oscillator scaled to `[0, 1]`
//! - **Stochastic**: position of the price inside its recent range
//! - **Crossovers**: buy/sell signals from two series crossing

mod rsi;
mod sma;

pub use rsi::rsi_oscillator;
pub use sma::{moving_average, sma};

use crate::types::TradeSide;
use serde::{Deserialize, Serialize};
use sma::first_nan;

/// Oscillator families available to the threshold strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OscillatorKind {
    #[default]
    Stochastic,
    Rsi,
}

/// Calculate the `period`-day stochastic oscillator.
///
/// `(price - min) / (max - min)` over the last `period` prices, in `[0, 1]`.
/// A flat window has no range and reads 0.5. `NaN` before a full window and
/// from the first `NaN` price on.
pub fn stochastic_oscillator(prices: &[f64], period: usize) -> Vec<f64> {
    let n = prices.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    for day in (period - 1)..first_nan(prices) {
        let window = &prices[day + 1 - period..=day];
        let low = window.iter().cloned().fold(f64::INFINITY, f64::min);
        let high = window.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        let range = high - low;
        result[day] = if range > 0.0 {
            (prices[day] - low) / range
        } else {
            0.5
        };
    }

    result
}

/// Calculate an oscillator, optionally smoothed by a moving average.
///
/// Smoothing applies a `smoothing`-day moving average to the oscillator from
/// its first defined day, so the smoothed series starts `smoothing - 1` days
/// later.
pub fn oscillator(
    prices: &[f64],
    period: usize,
    kind: OscillatorKind,
    smoothing: Option<usize>,
) -> Vec<f64> {
    let raw = match kind {
        OscillatorKind::Stochastic => stochastic_oscillator(prices, period),
        OscillatorKind::Rsi => rsi_oscillator(prices, period),
    };

    match smoothing {
        Some(window) if window > 1 && period >= 1 && raw.len() >= period => {
            let start = period - 1;
            let mut smoothed = vec![f64::NAN; raw.len()];
            let tail = moving_average(&raw[start..], window, &[]);
            smoothed[start..].copy_from_slice(&tail);
            smoothed
        }
        _ => raw,
    }
}

/// Generate trading signals from two series crossing.
///
/// `Some(Buy)` on the day `fast` moves above `slow`, `Some(Sell)` on the day it
/// moves below, `None` otherwise. Days where either series is `NaN` never
/// signal.
pub fn crossover_signals(fast: &[f64], slow: &[f64]) -> Vec<Option<TradeSide>> {
    let n = fast.len().min(slow.len());
    let mut signals = vec![None; n];

    for i in 1..n {
        let prev_diff = fast[i - 1] - slow[i - 1];
        let curr_diff = fast[i] - slow[i];

        if prev_diff <= 0.0 && curr_diff > 0.0 {
            signals[i] = Some(TradeSide::Buy); // Golden cross
        } else if prev_diff >= 0.0 && curr_diff < 0.0 {
            signals[i] = Some(TradeSide::Sell); // Death cross
        }
    }

    signals
}
