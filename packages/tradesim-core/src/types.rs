//! Core data types shared across the simulator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trade direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Ledger token for this side.
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }

    /// Sign applied to share counts: +1 for a buy, -1 for a sell.
    pub fn sign(&self) -> i64 {
        match self {
            TradeSide::Buy => 1,
            TradeSide::Sell => -1,
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            other => Err(format!("unknown trade side '{}'", other)),
        }
    }
}

/// Share counts held per stock, indexed like the price table columns.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Portfolio {
    /// Number of shares owned of each stock
    pub shares: Vec<u64>,
}

impl Portfolio {
    /// Create an empty portfolio covering `stocks` stocks.
    pub fn new(stocks: usize) -> Self {
        Self {
            shares: vec![0; stocks],
        }
    }

    /// Number of stocks tracked.
    pub fn len(&self) -> usize {
        self.shares.len()
    }

    /// Whether the portfolio tracks no stocks at all.
    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    /// Shares held of `stock` (0 for an unknown index).
    pub fn get(&self, stock: usize) -> u64 {
        self.shares.get(stock).copied().unwrap_or(0)
    }

    /// Total shares across all stocks.
    pub fn total_shares(&self) -> u64 {
        self.shares.iter().sum()
    }

    /// Indices of stocks with a non-zero holding.
    pub fn held_stocks(&self) -> Vec<usize> {
        self.shares
            .iter()
            .enumerate()
            .filter(|(_, &n)| n > 0)
            .map(|(i, _)| i)
            .collect()
    }
}

impl From<Vec<u64>> for Portfolio {
    fn from(shares: Vec<u64>) -> Self {
        Self { shares }
    }
}

/// API response wrapper used by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Round to two decimal places, the precision the ledger and reports use.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
