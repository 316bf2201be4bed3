//! Dense day-by-stock price table and its whitespace text format.

use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Daily prices, one row per day and one column per stock.
///
/// A `NaN` cell means the company has failed by that day.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    days: usize,
    stocks: usize,
    /// Row-major values
    values: Vec<f64>,
}

impl PriceTable {
    /// Build a table from rows (days). All rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let days = rows.len();
        let stocks = rows.first().map(|r| r.len()).unwrap_or(0);

        if let Some((day, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != stocks) {
            return Err(Error::InvalidPriceTable(format!(
                "row {} has {} values, expected {}",
                day,
                row.len(),
                stocks
            )));
        }

        Ok(Self {
            days,
            stocks,
            values: rows.into_iter().flatten().collect(),
        })
    }

    /// Build a table from columns (stocks). All columns must have the same length.
    pub fn from_columns(columns: Vec<Vec<f64>>) -> Result<Self> {
        let stocks = columns.len();
        let days = columns.first().map(|c| c.len()).unwrap_or(0);

        if let Some((stock, col)) = columns.iter().enumerate().find(|(_, c)| c.len() != days) {
            return Err(Error::InvalidPriceTable(format!(
                "column {} has {} values, expected {}",
                stock,
                col.len(),
                days
            )));
        }

        let mut values = vec![0.0; days * stocks];
        for (stock, column) in columns.iter().enumerate() {
            for (day, &price) in column.iter().enumerate() {
                values[day * stocks + stock] = price;
            }
        }

        Ok(Self {
            days,
            stocks,
            values,
        })
    }

    /// Number of days (rows).
    pub fn days(&self) -> usize {
        self.days
    }

    /// Number of stocks (columns).
    pub fn stocks(&self) -> usize {
        self.stocks
    }

    pub fn is_empty(&self) -> bool {
        self.days == 0 || self.stocks == 0
    }

    /// Price of `stock` on `day`. Out-of-range lookups read as `NaN`.
    pub fn price(&self, day: usize, stock: usize) -> f64 {
        if day >= self.days || stock >= self.stocks {
            return f64::NAN;
        }
        self.values[day * self.stocks + stock]
    }

    /// All prices on `day`.
    pub fn row(&self, day: usize) -> &[f64] {
        &self.values[day * self.stocks..(day + 1) * self.stocks]
    }

    /// Price history of one stock.
    pub fn column(&self, stock: usize) -> Vec<f64> {
        (0..self.days).map(|day| self.price(day, stock)).collect()
    }

    /// Every column, in stock order.
    pub fn columns(&self) -> Vec<Vec<f64>> {
        (0..self.stocks).map(|stock| self.column(stock)).collect()
    }

    /// Whether the company behind `stock` has failed by `day`.
    pub fn is_failed(&self, day: usize, stock: usize) -> bool {
        self.price(day, stock).is_nan()
    }

    /// Make every column stay `NaN` from its first non-positive or `NaN` price on.
    pub fn normalize_failures(&mut self) {
        for stock in 0..self.stocks {
            let failed_from = (0..self.days).find(|&day| {
                let price = self.values[day * self.stocks + stock];
                price.is_nan() || price <= 0.0
            });
            if let Some(first) = failed_from {
                for day in first..self.days {
                    self.values[day * self.stocks + stock] = f64::NAN;
                }
            }
        }
    }

    /// Parse a whitespace-delimited numeric table. Blank lines are skipped.
    pub fn parse(content: &str) -> Result<Self> {
        let mut rows = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let row = line
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|token| !token.is_empty())
                .map(|token| {
                    token.parse::<f64>().map_err(|_| {
                        Error::InvalidPriceTable(format!(
                            "line {}: '{}' is not a number",
                            idx + 1,
                            token
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            rows.push(row);
        }
        Self::from_rows(rows)
    }

    /// Load a table from a whitespace-delimited text file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Write the table as whitespace-delimited text, `nan` for failed days.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut out = BufWriter::new(File::create(path)?);
        for day in 0..self.days {
            let line = self
                .row(day)
                .iter()
                .map(|p| {
                    if p.is_nan() {
                        "nan".to_string()
                    } else {
                        format!("{:.6}", p)
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(out, "{}", line)?;
        }
        out.flush()?;
        Ok(())
    }
}
