//! Trading ledger: one text line per buy or sell.
//!
//! Lines are written as
//!
//! ```text
//! buy, 5, 2, 10, 100.00, 50.00, -1050.00
//! ```
//!
//! that is `side, day, stock, shares, price, fee, amount`, where `amount` is the
//! cash impact including the fee (negative when buying). The reader also
//! accepts the short form `day, stock, side, shares, price[, fee]`. Commas and
//! whitespace may be mixed freely.

use crate::types::{round2, TradeSide};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Largest day a ledger may mention (a century of daily prices).
pub const MAX_DAY: usize = 100 * 366;
/// Largest number of stocks a ledger may mention.
pub const MAX_STOCKS: usize = 100_000;
/// Difference allowed between a written amount and the one implied by its line.
const AMOUNT_TOLERANCE: f64 = 0.011;

/// A single ledger line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub side: TradeSide,
    /// Days since day 0
    pub day: usize,
    /// Column index in the price table
    pub stock: usize,
    pub shares: u64,
    /// Price per share
    pub price: f64,
    /// Fee charged for this transaction
    pub fee: f64,
    /// Signed cash impact, fee included
    pub amount: f64,
}

impl LedgerEntry {
    /// Create an entry, deriving the cash amount from shares, price and fee.
    pub fn new(side: TradeSide, day: usize, stock: usize, shares: u64, price: f64, fee: f64) -> Self {
        let gross = shares as f64 * price;
        let amount = match side {
            TradeSide::Buy => -(gross + fee),
            TradeSide::Sell => gross - fee,
        };
        Self {
            side,
            day,
            stock,
            shares,
            price,
            fee,
            amount,
        }
    }

    /// Cash paid out by this entry (0 for an entry that brings cash in).
    pub fn spent(&self) -> f64 {
        match self.side {
            TradeSide::Buy => -self.amount,
            TradeSide::Sell => 0.0,
        }
    }

    /// Cash brought in by this entry (0 for a buy).
    pub fn earned(&self) -> f64 {
        match self.side {
            TradeSide::Buy => 0.0,
            TradeSide::Sell => self.amount,
        }
    }

    /// Signed share delta applied to the holding, `None` if it does not fit an `i64`.
    pub fn share_delta(&self) -> Option<i64> {
        i64::try_from(self.shares).ok().map(|shares| self.side.sign() * shares)
    }
}

/// A parsed entry together with the 1-based file line it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerLine {
    pub line: usize,
    pub entry: LedgerEntry,
}

/// Prices and fees in whole cents print with two decimals, anything else in
/// full so the amount on the same line can be recomputed from it.
fn format_price(price: f64) -> String {
    if round2(price) == price {
        format!("{:.2}", price)
    } else {
        format!("{}", price)
    }
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Zero-share buys would otherwise print as -0.00
        let amount = if self.amount == 0.0 { 0.0 } else { round2(self.amount) };
        write!(
            f,
            "{}, {}, {}, {}, {}, {}, {:.2}",
            self.side,
            self.day,
            self.stock,
            self.shares,
            format_price(self.price),
            format_price(self.fee),
            amount
        )
    }
}

fn corrupt(line: usize, reason: impl Into<String>) -> Error {
    Error::CorruptLedger {
        line,
        reason: reason.into(),
    }
}

fn parse_number(line: usize, what: &str, token: &str) -> Result<f64> {
    let value: f64 = token
        .parse()
        .map_err(|_| corrupt(line, format!("{} '{}' is not a number", what, token)))?;
    if !value.is_finite() {
        return Err(corrupt(line, format!("{} '{}' is not finite", what, token)));
    }
    Ok(value)
}

/// Parse a non-negative whole number, accepting integral floats such as `10.0`.
fn parse_count(line: usize, what: &str, token: &str) -> Result<u64> {
    if let Ok(value) = token.parse::<u64>() {
        return Ok(value);
    }
    let value = parse_number(line, what, token)?;
    if value < 0.0 || value.fract() != 0.0 {
        return Err(corrupt(
            line,
            format!("{} '{}' is not a non-negative whole number", what, token),
        ));
    }
    Ok(value as u64)
}

fn parse_side(line: usize, token: &str) -> Result<TradeSide> {
    token
        .parse()
        .map_err(|e: String| corrupt(line, e))
}

fn is_side(token: &str) -> bool {
    token.parse::<TradeSide>().is_ok()
}

fn parse_index(line: usize, what: &str, token: &str, limit: usize) -> Result<usize> {
    let value = parse_count(line, what, token)?;
    if value > limit as u64 {
        return Err(corrupt(
            line,
            format!("{} {} is beyond the limit of {}", what, value, limit),
        ));
    }
    Ok(value as usize)
}

fn parse_shares(line: usize, token: &str) -> Result<u64> {
    let shares = parse_count(line, "shares", token)?;
    if i64::try_from(shares).is_err() {
        return Err(corrupt(line, format!("share count {} is too large", shares)));
    }
    Ok(shares)
}

/// Check a written amount against side, shares, price and fee.
fn check_amount(line: usize, written: f64, expected: &LedgerEntry) -> Result<()> {
    if expected.side == TradeSide::Buy && written > 0.0 {
        return Err(corrupt(line, format!("buy with positive amount {}", written)));
    }
    if (written - expected.amount).abs() > AMOUNT_TOLERANCE {
        return Err(corrupt(
            line,
            format!(
                "amount {} does not match shares, price and fee (expected {:.2})",
                written, expected.amount
            ),
        ));
    }
    Ok(())
}

/// Parse one non-blank ledger line. `line` is 1-based and only used in errors.
///
/// Days above [`MAX_DAY`] and stocks above [`MAX_STOCKS`] are rejected, as is
/// a written amount that disagrees with the rest of the line.
pub fn parse_line(line: usize, text: &str) -> Result<LedgerEntry> {
    let tokens: Vec<&str> = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .collect();

    if tokens.first().map(|t| is_side(t)).unwrap_or(false) {
        if tokens.len() != 7 {
            return Err(corrupt(
                line,
                format!("expected 7 fields after '{}', found {}", tokens[0], tokens.len()),
            ));
        }
        let side = parse_side(line, tokens[0])?;
        let day = parse_index(line, "day", tokens[1], MAX_DAY)?;
        let stock = parse_index(line, "stock", tokens[2], MAX_STOCKS - 1)?;
        let shares = parse_shares(line, tokens[3])?;
        let price = parse_number(line, "price", tokens[4])?;
        let fee = parse_number(line, "fee", tokens[5])?;
        let amount = parse_number(line, "amount", tokens[6])?;

        let expected = LedgerEntry::new(side, day, stock, shares, price, fee);
        check_amount(line, amount, &expected)?;
        return Ok(LedgerEntry { amount, ..expected });
    }

    if tokens.len() >= 3 && is_side(tokens[2]) {
        if tokens.len() != 5 && tokens.len() != 6 {
            return Err(corrupt(
                line,
                format!("expected 5 or 6 fields, found {}", tokens.len()),
            ));
        }
        let day = parse_index(line, "day", tokens[0], MAX_DAY)?;
        let stock = parse_index(line, "stock", tokens[1], MAX_STOCKS - 1)?;
        let side = parse_side(line, tokens[2])?;
        let shares = parse_shares(line, tokens[3])?;
        let price = parse_number(line, "price", tokens[4])?;
        let fee = match tokens.get(5) {
            Some(token) => parse_number(line, "fee", token)?,
            None => 0.0,
        };
        return Ok(LedgerEntry::new(side, day, stock, shares, price, fee));
    }

    Err(corrupt(line, format!("no buy/sell field in '{}'", text.trim())))
}

/// Parse a whole ledger. Blank lines are skipped and days must never go backwards.
pub fn parse_ledger(content: &str) -> Result<Vec<LedgerLine>> {
    let mut lines: Vec<LedgerLine> = Vec::new();

    for (idx, text) in content.lines().enumerate() {
        if text.trim().is_empty() {
            continue;
        }
        let entry = parse_line(idx + 1, text)?;
        if let Some(previous) = lines.last() {
            if entry.day < previous.entry.day {
                return Err(corrupt(
                    idx + 1,
                    format!("day {} recorded after day {}", entry.day, previous.entry.day),
                ));
            }
        }
        lines.push(LedgerLine {
            line: idx + 1,
            entry,
        });
    }

    Ok(lines)
}

/// Read and parse a ledger file, keeping source line numbers.
pub fn read_lines(path: &Path) -> Result<Vec<LedgerLine>> {
    let content = fs::read_to_string(path)?;
    let lines = parse_ledger(&content)?;
    if lines.is_empty() {
        return Err(Error::EmptyLedger(path.display().to_string()));
    }
    Ok(lines)
}

/// Read and parse a ledger file.
pub fn read_entries(path: &Path) -> Result<Vec<LedgerEntry>> {
    Ok(read_lines(path)?.into_iter().map(|l| l.entry).collect())
}

/// Get `path` ready for a new run.
///
/// A ledger that already holds entries would put a second day 0 after the
/// previous run's last day, so it is removed when `overwrite` is set and
/// refused otherwise.
pub fn start_ledger(path: &Path, overwrite: bool) -> Result<()> {
    let has_entries = match fs::read_to_string(path) {
        Ok(content) => content.lines().any(|l| !l.trim().is_empty()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => return Err(e.into()),
    };
    if !has_entries {
        return Ok(());
    }
    if !overwrite {
        return Err(Error::InvalidOperation(format!(
            "Ledger {} already has entries; overwrite it or pick another file",
            path.display()
        )));
    }

    tracing::info!(ledger = %path.display(), "removing previous ledger");
    fs::remove_file(path)?;
    Ok(())
}

/// Append-only writer over a ledger file.
///
/// The file is created if needed and never truncated.
#[derive(Debug)]
pub struct LedgerWriter {
    path: PathBuf,
    file: File,
}

impl LedgerWriter {
    /// Open `path` for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Append one entry as a full line.
    pub fn append(&mut self, entry: &LedgerEntry) -> Result<()> {
        writeln!(self.file, "{}", entry)?;
        tracing::debug!(ledger = %self.path.display(), "{}", entry);
        Ok(())
    }
}
