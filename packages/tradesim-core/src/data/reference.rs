//! Reference price data and closest-match column selection.

use super::PriceTable;
use crate::{Error, Result};
use std::fs;
use std::path::Path;

/// A reference table plus the volatility of each column.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub prices: PriceTable,
    pub volatilities: Vec<f64>,
}

/// Columns picked out of the reference data.
#[derive(Debug, Clone)]
pub struct Selection {
    pub prices: PriceTable,
    /// Day 0 price of each picked column
    pub initial_prices: Vec<f64>,
    /// Volatility of each picked column
    pub volatilities: Vec<f64>,
}

/// Population standard deviation of the non-`NaN` values.
pub fn realized_volatility(column: &[f64]) -> f64 {
    let values: Vec<f64> = column.iter().copied().filter(|p| !p.is_nan()).collect();
    if values.is_empty() {
        return f64::NAN;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

impl ReferenceData {
    /// Parse reference text.
    ///
    /// With `volatility_header` the first row lists each column's volatility
    /// and the price rows follow. Without it, volatilities are realized from
    /// the prices. Failed companies are normalized to stay `NaN`.
    pub fn parse(content: &str, volatility_header: bool) -> Result<Self> {
        let table = PriceTable::parse(content)?;

        let (mut prices, volatilities) = if volatility_header {
            if table.days() < 2 {
                return Err(Error::InsufficientData(
                    "reference data needs a volatility row and at least one price row".to_string(),
                ));
            }
            let header = table.row(0).to_vec();
            let rows = (1..table.days()).map(|day| table.row(day).to_vec()).collect();
            (PriceTable::from_rows(rows)?, header)
        } else {
            let volatilities = table.columns().iter().map(|c| realized_volatility(c)).collect();
            (table, volatilities)
        };

        prices.normalize_failures();
        Ok(Self {
            prices,
            volatilities,
        })
    }

    /// Load reference data from a file.
    pub fn load(path: &Path, volatility_header: bool) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content, volatility_header)
    }

    /// Pick, for each target, the unused column whose day 0 price is closest.
    pub fn select_by_initial_price(&self, targets: &[f64]) -> Result<Selection> {
        let keys = self.prices.row(0).to_vec();
        self.select(&keys, targets)
    }

    /// Pick, for each target, the unused column whose volatility is closest.
    pub fn select_by_volatility(&self, targets: &[f64]) -> Result<Selection> {
        self.select(&self.volatilities, targets)
    }

    fn select(&self, keys: &[f64], targets: &[f64]) -> Result<Selection> {
        if targets.len() > keys.len() {
            return Err(Error::InsufficientData(format!(
                "requested {} stocks but the reference data only has {}",
                targets.len(),
                keys.len()
            )));
        }

        let mut used = vec![false; keys.len()];
        let mut picked = Vec::with_capacity(targets.len());

        for &target in targets {
            // Ties go to the lowest column index; NaN keys never match
            let best = keys
                .iter()
                .enumerate()
                .filter(|(i, key)| !used[*i] && !key.is_nan())
                .fold(None::<(usize, f64)>, |best, (i, key)| {
                    let distance = (key - target).abs();
                    match best {
                        Some((_, d)) if d <= distance => best,
                        _ => Some((i, distance)),
                    }
                })
                .map(|(i, _)| i)
                .ok_or_else(|| {
                    Error::InsufficientData(format!("no usable column left for {}", target))
                })?;
            used[best] = true;
            picked.push(best);
        }

        let columns = picked.iter().map(|&i| self.prices.column(i)).collect();
        Ok(Selection {
            prices: PriceTable::from_columns(columns)?,
            initial_prices: picked.iter().map(|&i| self.prices.price(0, i)).collect(),
            volatilities: picked.iter().map(|&i| self.volatilities[i]).collect(),
        })
    }
}
