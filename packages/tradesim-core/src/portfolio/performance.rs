//! Ledger replay: profit/loss, holdings and the cumulative cash series.

use crate::ledger::{read_lines, LedgerEntry, LedgerLine, MAX_DAY, MAX_STOCKS};
use crate::report::{ProfitPlot, ProfitPoint, ReportSink};
use crate::types::{round2, Portfolio, TradeSide};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// What `read_ledger` should produce besides the summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportOptions {
    /// Send the cumulative profit/loss chart to the sink
    pub profit_plot: bool,
    /// Strategy name used in the chart title
    pub strategy_label: String,
    /// Also break out a single stock
    pub stock: Option<usize>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            profit_plot: true,
            strategy_label: "Random Strategy".to_string(),
            stock: None,
        }
    }
}

/// Aggregate figures over the whole ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportInfo {
    /// Cash paid for buys, fees included
    pub total_spent: f64,
    /// Cash received from sells, net of fees
    pub total_earned: f64,
    pub profit_loss: f64,
    /// Number of ledger entries
    pub trade_count: usize,
    /// Distinct days with at least one entry
    pub trading_days: usize,
    /// Trading days after the one the portfolio was created on
    pub trades_after_creation: usize,
    /// Distinct stocks that appear in the ledger
    pub stocks_traded: usize,
}

/// Cash flows and trade dates for one stock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockReport {
    pub stock: usize,
    pub spent: f64,
    pub earned: f64,
    pub profit_loss: f64,
    /// Days with a buy of at least one share, ascending
    pub buy_days: Vec<usize>,
    /// Days with a sell of at least one share, ascending
    pub sell_days: Vec<usize>,
}

/// Everything recovered from a ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerReport {
    /// Holdings after the first trading day
    pub initial_portfolio: Portfolio,
    /// Holdings after every entry
    pub final_portfolio: Portfolio,
    /// Holdings before the last trading day
    pub holdings_before_liquidation: Portfolio,
    pub info: ReportInfo,
    pub stock: Option<StockReport>,
    /// Running cash total for every day from 0 to the last ledger day
    pub cumulative: Vec<ProfitPoint>,
}

fn to_portfolio(holdings: &[i64]) -> Portfolio {
    Portfolio::from(holdings.iter().map(|&h| h.max(0) as u64).collect::<Vec<_>>())
}

fn stock_report(entries: &[LedgerEntry], stock: usize) -> StockReport {
    let mut spent = 0.0;
    let mut earned = 0.0;
    let mut buy_days = BTreeSet::new();
    let mut sell_days = BTreeSet::new();

    for entry in entries.iter().filter(|e| e.stock == stock) {
        spent += entry.spent();
        earned += entry.earned();
        if entry.shares > 0 {
            match entry.side {
                TradeSide::Buy => buy_days.insert(entry.day),
                TradeSide::Sell => sell_days.insert(entry.day),
            };
        }
    }

    StockReport {
        stock,
        spent,
        earned,
        profit_loss: earned - spent,
        buy_days: buy_days.into_iter().collect(),
        sell_days: sell_days.into_iter().collect(),
    }
}

fn check_bounds(line: &LedgerLine) -> Result<()> {
    let entry = &line.entry;
    let reason = if entry.day > MAX_DAY {
        format!("day {} is beyond the limit of {}", entry.day, MAX_DAY)
    } else if entry.stock >= MAX_STOCKS {
        format!("stock {} is beyond the limit of {}", entry.stock, MAX_STOCKS - 1)
    } else if entry.share_delta().is_none() {
        format!("share count {} is too large", entry.shares)
    } else {
        return Ok(());
    };
    Err(Error::CorruptLedger {
        line: line.line,
        reason,
    })
}

impl LedgerReport {
    /// Replay entries held in memory. Errors number them from 1 in order.
    pub fn from_entries(entries: &[LedgerEntry], stock: Option<usize>) -> Result<Self> {
        let lines: Vec<LedgerLine> = entries
            .iter()
            .enumerate()
            .map(|(idx, &entry)| LedgerLine {
                line: idx + 1,
                entry,
            })
            .collect();
        Self::from_lines(&lines, stock)
    }

    /// Replay parsed ledger lines.
    ///
    /// Entries must be in non-decreasing day order. Holdings are checked once
    /// per day, so a stock may be bought and sold on the same day in any
    /// order, but a day that leaves a holding negative is corrupt. Errors
    /// carry the file line of the offending entry.
    pub fn from_lines(lines: &[LedgerLine], stock: Option<usize>) -> Result<Self> {
        let Some(last) = lines.last() else {
            return Err(Error::EmptyLedger("no entries".to_string()));
        };
        for line in lines {
            check_bounds(line)?;
        }
        let last_day = last.entry.day;
        let stocks = lines.iter().map(|l| l.entry.stock).max().map_or(0, |s| s + 1);

        let mut holdings = vec![0i64; stocks];
        let mut initial: Option<Vec<i64>> = None;
        let mut before_last: Option<Vec<i64>> = None;
        let mut daily_cash = vec![0.0; last_day + 1];
        let mut days = BTreeSet::new();

        let mut start = 0;
        while start < lines.len() {
            let day = lines[start].entry.day;
            let end = lines[start..]
                .iter()
                .position(|l| l.entry.day != day)
                .map_or(lines.len(), |offset| start + offset);

            if let Some(next) = lines.get(end) {
                if next.entry.day < day {
                    return Err(Error::CorruptLedger {
                        line: next.line,
                        reason: format!("day {} recorded after day {}", next.entry.day, day),
                    });
                }
            }
            if day == last_day {
                before_last = Some(holdings.clone());
            }

            // Last line touching each stock today, for error reporting
            let mut touched: Vec<(usize, usize)> = Vec::new();
            for line in &lines[start..end] {
                let entry = &line.entry;
                let delta = entry.share_delta().unwrap_or_default();
                holdings[entry.stock] = holdings[entry.stock]
                    .checked_add(delta)
                    .ok_or_else(|| Error::CorruptLedger {
                        line: line.line,
                        reason: format!("stock {} holding overflows on day {}", entry.stock, day),
                    })?;
                daily_cash[day] += entry.amount;
                match touched.iter_mut().find(|(held, _)| *held == entry.stock) {
                    Some(slot) => slot.1 = line.line,
                    None => touched.push((entry.stock, line.line)),
                }
            }
            if let Some(&(held, line)) = touched.iter().find(|(held, _)| holdings[*held] < 0) {
                return Err(Error::CorruptLedger {
                    line,
                    reason: format!("stock {} holding goes negative on day {}", held, day),
                });
            }

            if initial.is_none() {
                initial = Some(holdings.clone());
            }
            days.insert(day);
            start = end;
        }

        let initial = initial.unwrap_or_default();
        // With a single trading day there is no earlier state to liquidate from
        let before_last = match before_last {
            Some(state) if days.len() > 1 => state,
            _ => initial.clone(),
        };

        let entries: Vec<LedgerEntry> = lines.iter().map(|l| l.entry).collect();
        let total_spent: f64 = entries.iter().map(LedgerEntry::spent).sum();
        let total_earned: f64 = entries.iter().map(LedgerEntry::earned).sum();
        let stocks_traded = entries
            .iter()
            .map(|e| e.stock)
            .collect::<BTreeSet<_>>()
            .len();

        let mut running = 0.0;
        let cumulative = daily_cash
            .iter()
            .enumerate()
            .map(|(day, cash)| {
                running += cash;
                ProfitPoint {
                    day,
                    cumulative: running,
                }
            })
            .collect();

        Ok(Self {
            initial_portfolio: to_portfolio(&initial),
            final_portfolio: to_portfolio(&holdings),
            holdings_before_liquidation: to_portfolio(&before_last),
            info: ReportInfo {
                total_spent,
                total_earned,
                profit_loss: total_earned - total_spent,
                trade_count: entries.len(),
                trading_days: days.len(),
                trades_after_creation: days.len().saturating_sub(1),
                stocks_traded,
            },
            stock: stock.map(|s| stock_report(&entries, s)),
            cumulative,
        })
    }

    /// Chart data for the cumulative series.
    pub fn profit_plot(&self, label: &str) -> ProfitPlot {
        ProfitPlot {
            label: label.to_string(),
            total_profit_loss: round2(self.info.profit_loss),
            reference_line: 0.0,
            points: self.cumulative.clone(),
        }
    }
}

/// Read a ledger file and summarize it.
///
/// The file is only read, so calling this twice gives the same report.
pub fn read_ledger(
    ledger_path: &Path,
    options: &ReportOptions,
    sink: &mut dyn ReportSink,
) -> Result<LedgerReport> {
    let lines = read_lines(ledger_path)?;
    let report = LedgerReport::from_lines(&lines, options.stock)?;

    tracing::info!(
        ledger = %ledger_path.display(),
        trades = report.info.trade_count,
        profit_loss = round2(report.info.profit_loss),
        "ledger replayed"
    );

    if options.profit_plot {
        sink.profit_plot(&report.profit_plot(&options.strategy_label));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerWriter;
    use crate::report::{NullSink, RecordingSink};
    use approx::assert_relative_eq;
    use std::fs;
    use tempfile::TempDir;

    fn ledger(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("ledger.txt");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_buy_then_sell() {
        let dir = TempDir::new().unwrap();
        let path = ledger(&dir, "0, 0, buy, 5, 100\n10, 0, sell, 5, 120\n");
        let mut sink = RecordingSink::new();

        let report = read_ledger(&path, &ReportOptions::default(), &mut sink).unwrap();

        assert_relative_eq!(report.info.total_spent, 500.0);
        assert_relative_eq!(report.info.total_earned, 600.0);
        assert_relative_eq!(report.info.profit_loss, 100.0);
        assert_eq!(report.final_portfolio.shares, vec![0]);
        assert_eq!(report.initial_portfolio.shares, vec![5]);
        assert_eq!(report.holdings_before_liquidation.shares, vec![5]);
        assert_eq!(report.info.trade_count, 2);
        assert_eq!(report.info.trading_days, 2);
        assert_eq!(report.info.trades_after_creation, 1);

        assert_eq!(report.cumulative.len(), 11);
        assert_relative_eq!(report.cumulative[0].cumulative, -500.0);
        assert_relative_eq!(report.cumulative[9].cumulative, -500.0);
        assert_relative_eq!(report.cumulative[10].cumulative, 100.0);

        assert_eq!(sink.plots.len(), 1);
        assert_eq!(sink.plots[0].label, "Random Strategy");
        assert_relative_eq!(sink.plots[0].total_profit_loss, 100.0);
        assert_eq!(sink.plots[0].reference_line, 0.0);
    }

    #[test]
    fn test_fees_count_on_both_sides() {
        let dir = TempDir::new().unwrap();
        let path = ledger(
            &dir,
            "buy, 0, 0, 10, 100.00, 20.00, -1020.00\nsell, 3, 0, 10, 100.00, 20.00, 980.00\n",
        );

        let report = read_ledger(&path, &ReportOptions::default(), &mut NullSink).unwrap();
        assert_relative_eq!(report.info.total_spent, 1020.0);
        assert_relative_eq!(report.info.total_earned, 980.0);
        assert_relative_eq!(report.info.profit_loss, -40.0);
    }

    #[test]
    fn test_read_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = ledger(&dir, "0,0,buy,5,100\n0,1,buy,2,50\n4,1,sell,1,55\n");

        let first = read_ledger(&path, &ReportOptions::default(), &mut NullSink).unwrap();
        let second = read_ledger(&path, &ReportOptions::default(), &mut NullSink).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_same_day_buy_and_sell() {
        let dir = TempDir::new().unwrap();
        // Sell listed before the buy that covers it
        let path = ledger(&dir, "0,0,buy,1,10\n2,0,sell,3,12\n2,0,buy,2,11\n");

        let report = read_ledger(&path, &ReportOptions::default(), &mut NullSink).unwrap();
        assert_eq!(report.final_portfolio.shares, vec![0]);
        assert_eq!(report.info.trading_days, 2);
    }

    #[test]
    fn test_negative_holding_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = ledger(&dir, "0,0,buy,1,10\n2,0,sell,3,12\n");

        let result = read_ledger(&path, &ReportOptions::default(), &mut NullSink);
        assert!(matches!(result, Err(Error::CorruptLedger { line: 2, .. })));
    }

    #[test]
    fn test_errors_name_the_file_line() {
        let dir = TempDir::new().unwrap();
        let path = ledger(&dir, "\n\n\n0,0,buy,1,10\n\n\n2,0,sell,3,12\n");
        assert!(matches!(
            read_ledger(&path, &ReportOptions::default(), &mut NullSink),
            Err(Error::CorruptLedger { line: 7, .. })
        ));

        // The offending stock's line, not the last line of the day
        let path = ledger(&dir, "0,0,buy,1,10\n0,1,buy,1,10\n\n2,0,sell,3,12\n2,1,buy,1,10\n");
        assert!(matches!(
            read_ledger(&path, &ReportOptions::default(), &mut NullSink),
            Err(Error::CorruptLedger { line: 4, .. })
        ));
    }

    #[test]
    fn test_out_of_range_entries_are_corrupt() {
        let dir = TempDir::new().unwrap();
        for content in [
            "0,18446744073709551615,buy,1,10\n",
            "18446744073709551615,0,buy,1,10\n",
        ] {
            let path = ledger(&dir, content);
            assert!(matches!(
                read_ledger(&path, &ReportOptions::default(), &mut NullSink),
                Err(Error::CorruptLedger { line: 1, .. })
            ));
        }

        let far_stock = LedgerEntry::new(TradeSide::Buy, 0, usize::MAX, 1, 10.0, 0.0);
        assert!(matches!(
            LedgerReport::from_entries(&[far_stock], None),
            Err(Error::CorruptLedger { line: 1, .. })
        ));
        let far_day = LedgerEntry::new(TradeSide::Buy, usize::MAX, 0, 1, 10.0, 0.0);
        assert!(LedgerReport::from_entries(&[far_day], None).is_err());
        let huge = LedgerEntry::new(TradeSide::Buy, 0, 0, u64::MAX, 10.0, 0.0);
        assert!(LedgerReport::from_entries(&[huge], None).is_err());
    }

    #[test]
    fn test_open_holdings_match_ledger() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.txt");
        let entries = [
            LedgerEntry::new(TradeSide::Buy, 0, 0, 5, 100.0, 1.0),
            LedgerEntry::new(TradeSide::Buy, 0, 1, 4, 50.0, 1.0),
            LedgerEntry::new(TradeSide::Sell, 3, 0, 4, 110.0, 1.0),
            LedgerEntry::new(TradeSide::Buy, 3, 0, 2, 105.0, 1.0),
            LedgerEntry::new(TradeSide::Buy, 6, 1, 3, 48.5, 1.0),
        ];
        {
            let mut writer = LedgerWriter::open(&path).unwrap();
            for entry in &entries {
                writer.append(entry).unwrap();
            }
        }

        let report = read_ledger(&path, &ReportOptions::default(), &mut NullSink).unwrap();

        let mut expected = [0i64; 2];
        for entry in &entries {
            expected[entry.stock] += entry.share_delta().unwrap();
        }
        assert_eq!(expected, [3, 7]);
        assert_eq!(report.final_portfolio.shares, vec![3, 7]);
        assert_eq!(report.holdings_before_liquidation.shares, vec![3, 4]);
        assert_eq!(report.initial_portfolio.shares, vec![5, 4]);
        assert_relative_eq!(report.info.total_spent, 501.0 + 201.0 + 211.0 + 146.5);
        assert_relative_eq!(report.info.total_earned, 439.0);
    }

    #[test]
    fn test_stock_breakdown() {
        let dir = TempDir::new().unwrap();
        let path = ledger(
            &dir,
            "0,0,buy,5,100\n0,1,buy,2,50\n3,1,buy,1,40\n7,1,sell,3,60\n7,0,sell,5,90\n",
        );
        let options = ReportOptions {
            stock: Some(1),
            ..ReportOptions::default()
        };

        let report = read_ledger(&path, &options, &mut NullSink).unwrap();
        let stock = report.stock.unwrap();
        assert_eq!(stock.stock, 1);
        assert_relative_eq!(stock.spent, 140.0);
        assert_relative_eq!(stock.earned, 180.0);
        assert_relative_eq!(stock.profit_loss, 40.0);
        assert_eq!(stock.buy_days, vec![0, 3]);
        assert_eq!(stock.sell_days, vec![7]);
        assert_eq!(report.info.stocks_traded, 2);
        assert_eq!(report.holdings_before_liquidation.shares, vec![5, 3]);
    }

    #[test]
    fn test_plot_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        let path = ledger(&dir, "0,0,buy,5,100\n");
        let mut sink = RecordingSink::new();
        let options = ReportOptions {
            profit_plot: false,
            ..ReportOptions::default()
        };

        let report = read_ledger(&path, &options, &mut sink).unwrap();
        assert!(sink.plots.is_empty());
        // One trading day: nothing after creation
        assert_eq!(report.info.trades_after_creation, 0);
        assert_eq!(report.holdings_before_liquidation, report.initial_portfolio);
    }

    #[test]
    fn test_corrupt_and_empty_ledgers() {
        let dir = TempDir::new().unwrap();
        let path = ledger(&dir, "0,0,buy,5,100\n1,0,hold,5,100\n");
        assert!(matches!(
            read_ledger(&path, &ReportOptions::default(), &mut NullSink),
            Err(Error::CorruptLedger { line: 2, .. })
        ));

        let path = ledger(&dir, "");
        assert!(matches!(
            read_ledger(&path, &ReportOptions::default(), &mut NullSink),
            Err(Error::EmptyLedger(_))
        ));
    }
}
