//! Trading session: applies buys and sells to a portfolio and records them.

use crate::data::PriceTable;
use crate::ledger::{LedgerEntry, LedgerWriter};
use crate::types::{Portfolio, TradeSide};
use crate::{Error, Result};
use std::path::Path;

/// A portfolio being traded against a price table.
///
/// Every change is appended to the ledger before the in-memory holding is
/// touched, so the ledger is always at least as current as the portfolio.
#[derive(Debug)]
pub struct TradingSession<'a> {
    prices: &'a PriceTable,
    portfolio: &'a mut Portfolio,
    fees: f64,
    ledger: LedgerWriter,
    trades: usize,
}

impl<'a> TradingSession<'a> {
    /// Open a session appending to `ledger_path`.
    pub fn open(
        prices: &'a PriceTable,
        portfolio: &'a mut Portfolio,
        fees: f64,
        ledger_path: &Path,
    ) -> Result<Self> {
        if portfolio.len() != prices.stocks() {
            return Err(Error::InvalidOperation(format!(
                "Portfolio covers {} stocks but the price table has {}",
                portfolio.len(),
                prices.stocks()
            )));
        }
        if fees < 0.0 {
            return Err(Error::InvalidOperation(format!(
                "Fees cannot be negative, got {}",
                fees
            )));
        }

        Ok(Self {
            prices,
            portfolio,
            fees,
            ledger: LedgerWriter::open(ledger_path)?,
            trades: 0,
        })
    }

    /// Number of entries this session has appended.
    pub fn trade_count(&self) -> usize {
        self.trades
    }

    /// Shares held of `stock`.
    pub fn holding(&self, stock: usize) -> u64 {
        self.portfolio.get(stock)
    }

    fn record(&mut self, entry: LedgerEntry) -> Result<()> {
        self.ledger.append(&entry)?;
        self.trades += 1;

        let held = &mut self.portfolio.shares[entry.stock];
        match entry.side {
            TradeSide::Buy => *held += entry.shares,
            TradeSide::Sell => *held = held.saturating_sub(entry.shares),
        }
        Ok(())
    }

    /// Shares of `stock` that `budget` buys on `day` once the fee is paid.
    pub fn affordable_shares(&self, day: usize, stock: usize, budget: f64) -> u64 {
        let price = self.prices.price(day, stock);
        if price.is_nan() || price <= 0.0 || budget <= self.fees {
            return 0;
        }
        ((budget - self.fees) / price).floor() as u64
    }

    /// Buy as many shares as `budget` allows, fee included.
    ///
    /// Returns the number of shares bought. Nothing is recorded when the
    /// company has failed or the budget does not cover a single share.
    pub fn buy_with_budget(&mut self, day: usize, stock: usize, budget: f64) -> Result<u64> {
        let shares = self.affordable_shares(day, stock, budget);
        self.buy_shares(day, stock, shares)
    }

    /// Buy exactly `shares` shares on `day` at that day's price.
    pub fn buy_shares(&mut self, day: usize, stock: usize, shares: u64) -> Result<u64> {
        self.check_stock(stock)?;
        let price = self.prices.price(day, stock);
        if shares == 0 || price.is_nan() {
            return Ok(0);
        }

        self.record(LedgerEntry::new(
            TradeSide::Buy,
            day,
            stock,
            shares,
            price,
            self.fees,
        ))?;
        Ok(shares)
    }

    /// Sell up to `shares` shares on `day`, capped at the current holding.
    ///
    /// A failed company cannot be sold; its holding is written off instead.
    pub fn sell_shares(&mut self, day: usize, stock: usize, shares: u64) -> Result<u64> {
        self.check_stock(stock)?;
        let shares = shares.min(self.holding(stock));
        if shares == 0 {
            return Ok(0);
        }

        let price = self.prices.price(day, stock);
        if price.is_nan() {
            return self.write_off(day, stock);
        }

        self.record(LedgerEntry::new(
            TradeSide::Sell,
            day,
            stock,
            shares,
            price,
            self.fees,
        ))?;
        Ok(shares)
    }

    /// Sell the whole holding of `stock`.
    pub fn sell_all(&mut self, day: usize, stock: usize) -> Result<u64> {
        let held = self.holding(stock);
        self.sell_shares(day, stock, held)
    }

    /// Record the holding of a failed company as sold for nothing, without a fee.
    fn write_off(&mut self, day: usize, stock: usize) -> Result<u64> {
        let shares = self.holding(stock);
        if shares == 0 {
            return Ok(0);
        }

        tracing::warn!(day, stock, shares, "company failed, holding written off");
        self.record(LedgerEntry::new(TradeSide::Sell, day, stock, shares, 0.0, 0.0))?;
        Ok(shares)
    }

    /// Write off every holding whose company has failed by `day`.
    pub fn write_off_failures(&mut self, day: usize) -> Result<()> {
        for stock in self.portfolio.held_stocks() {
            if self.prices.is_failed(day, stock) {
                self.write_off(day, stock)?;
            }
        }
        Ok(())
    }

    /// Sell every remaining holding on the last day of the table.
    pub fn liquidate(&mut self) -> Result<()> {
        let Some(last_day) = self.prices.days().checked_sub(1) else {
            return Ok(());
        };
        for stock in self.portfolio.held_stocks() {
            self.sell_all(last_day, stock)?;
        }
        tracing::info!(day = last_day, "portfolio liquidated");
        Ok(())
    }

    fn check_stock(&self, stock: usize) -> Result<()> {
        if stock >= self.prices.stocks() {
            return Err(Error::InvalidOperation(format!(
                "Stock {} does not exist ({} stocks)",
                stock,
                self.prices.stocks()
            )));
        }
        Ok(())
    }
}

/// Buy the initial portfolio on day 0.
///
/// Stock `i` gets `floor((available_amounts[i] - fees) / price)` shares, so the
/// purchase plus its fee never exceeds the budget. Every stock gets exactly one
/// day 0 ledger line; a stock that cannot be bought (budget too small or
/// already failed) is recorded as a zero-share buy with no fee.
pub fn create_portfolio(
    available_amounts: &[f64],
    prices: &PriceTable,
    fees: f64,
    ledger_path: &Path,
) -> Result<Portfolio> {
    if available_amounts.len() != prices.stocks() {
        return Err(Error::InvalidOperation(format!(
            "{} budgets given for {} stocks",
            available_amounts.len(),
            prices.stocks()
        )));
    }
    if prices.days() == 0 {
        return Err(Error::InsufficientData(
            "price table has no days".to_string(),
        ));
    }

    let mut portfolio = Portfolio::new(prices.stocks());
    {
        let mut session = TradingSession::open(prices, &mut portfolio, fees, ledger_path)?;
        for (stock, &budget) in available_amounts.iter().enumerate() {
            if session.buy_with_budget(0, stock, budget)? == 0 {
                let price = prices.price(0, stock);
                let price = if price.is_nan() { 0.0 } else { price };
                session.ledger.append(&LedgerEntry::new(TradeSide::Buy, 0, stock, 0, price, 0.0))?;
                session.trades += 1;
            }
        }
    }

    tracing::info!(
        stocks = portfolio.len(),
        shares = portfolio.total_shares(),
        ledger = %ledger_path.display(),
        "initial portfolio created"
    );
    Ok(portfolio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::read_entries;
    use tempfile::TempDir;

    fn prices() -> PriceTable {
        PriceTable::from_columns(vec![
            vec![100.0, 110.0, 120.0, 90.0],
            vec![30.0, 31.0, f64::NAN, f64::NAN],
        ])
        .unwrap()
    }

    #[test]
    fn test_create_portfolio_respects_budget() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.txt");
        let table = prices();

        let portfolio = create_portfolio(&[1000.0, 1000.0], &table, 40.0, &path).unwrap();

        // (1000 - 40) / 100 = 9.6 -> 9, (1000 - 40) / 30 = 32
        assert_eq!(portfolio.shares, vec![9, 32]);

        let entries = read_entries(&path).unwrap();
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            assert_eq!(entry.day, 0);
            assert!(entry.spent() <= 1000.0);
        }
    }

    #[test]
    fn test_create_portfolio_records_unaffordable_stock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.txt");
        let table = prices();

        let portfolio = create_portfolio(&[30.0, 1000.0], &table, 40.0, &path).unwrap();
        assert_eq!(portfolio.shares[0], 0);

        let entries = read_entries(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].shares, 0);
        assert_eq!(entries[0].amount, 0.0);
    }

    #[test]
    fn test_create_portfolio_budget_count_mismatch() {
        let dir = TempDir::new().unwrap();
        let result = create_portfolio(&[1000.0], &prices(), 40.0, &dir.path().join("l.txt"));
        assert!(matches!(result, Err(Error::InvalidOperation(_))));
    }

    #[test]
    fn test_buy_and_sell() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.txt");
        let table = prices();
        let mut portfolio = Portfolio::new(2);

        let mut session = TradingSession::open(&table, &mut portfolio, 10.0, &path).unwrap();
        assert_eq!(session.buy_with_budget(1, 0, 560.0).unwrap(), 5);
        assert_eq!(session.sell_shares(2, 0, 3).unwrap(), 3);
        // Capped at the holding
        assert_eq!(session.sell_shares(3, 0, 10).unwrap(), 2);
        assert_eq!(session.holding(0), 0);
        assert_eq!(session.trade_count(), 3);

        let entries = read_entries(&path).unwrap();
        assert_eq!(entries[0].amount, -560.0);
        assert_eq!(entries[1].amount, 350.0);
        assert_eq!(entries[2].amount, 170.0);
    }

    #[test]
    fn test_cannot_buy_failed_company() {
        let dir = TempDir::new().unwrap();
        let table = prices();
        let mut portfolio = Portfolio::new(2);

        let mut session =
            TradingSession::open(&table, &mut portfolio, 0.0, &dir.path().join("l.txt")).unwrap();
        assert_eq!(session.buy_with_budget(2, 1, 1000.0).unwrap(), 0);
        assert_eq!(session.trade_count(), 0);
    }

    #[test]
    fn test_failed_holding_written_off() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.txt");
        let table = prices();
        let mut portfolio = Portfolio::from(vec![0, 10]);

        {
            let mut session = TradingSession::open(&table, &mut portfolio, 5.0, &path).unwrap();
            session.write_off_failures(1).unwrap();
            assert_eq!(session.holding(1), 10);
            session.write_off_failures(2).unwrap();
            assert_eq!(session.holding(1), 0);
        }

        let entries = read_entries(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].side, TradeSide::Sell);
        assert_eq!(entries[0].shares, 10);
        assert_eq!(entries[0].amount, 0.0);
        assert_eq!(entries[0].fee, 0.0);
    }

    #[test]
    fn test_liquidate_sells_everything() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.txt");
        let table = prices();
        let mut portfolio = Portfolio::from(vec![4, 10]);

        {
            let mut session = TradingSession::open(&table, &mut portfolio, 1.0, &path).unwrap();
            session.liquidate().unwrap();
        }
        assert_eq!(portfolio.total_shares(), 0);

        let entries = read_entries(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.day == 3));
        // 4 * 90 - 1 for the live stock, nothing for the failed one
        assert_eq!(entries[0].amount, 359.0);
        assert_eq!(entries[1].amount, 0.0);
    }

    #[test]
    fn test_portfolio_size_must_match() {
        let dir = TempDir::new().unwrap();
        let table = prices();
        let mut portfolio = Portfolio::new(3);

        let result = TradingSession::open(&table, &mut portfolio, 0.0, &dir.path().join("l.txt"));
        assert!(matches!(result, Err(Error::InvalidOperation(_))));
    }
}
