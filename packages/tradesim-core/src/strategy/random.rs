//! Random trading: a baseline that buys and sells on coin flips.

use super::TradingStrategy;
use crate::config::RandomParams;
use crate::data::PriceTable;
use crate::portfolio::TradingSession;
use crate::report::ReportSink;
use crate::types::Portfolio;
use crate::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

/// Every `period` days, each stock independently is bought, sold or left alone.
///
/// A buy takes a random share count between one and what `amount` affords;
/// a sell takes a random count between one and the current holding.
#[derive(Debug)]
pub struct RandomTrader {
    params: RandomParams,
    rng: StdRng,
}

impl RandomTrader {
    pub fn new(params: RandomParams) -> Result<Self> {
        params.validate()?;
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { params, rng })
    }

    fn trade_stock(&mut self, session: &mut TradingSession<'_>, day: usize, stock: usize) -> Result<()> {
        let roll: f64 = self.rng.gen();

        if roll < self.params.buy_probability {
            let affordable = session.affordable_shares(day, stock, self.params.amount);
            if affordable > 0 {
                let shares = self.rng.gen_range(1..=affordable);
                session.buy_shares(day, stock, shares)?;
            }
        } else if roll < self.params.buy_probability + self.params.sell_probability {
            let held = session.holding(stock);
            if held > 0 {
                let shares = self.rng.gen_range(1..=held);
                session.sell_shares(day, stock, shares)?;
            }
        }
        Ok(())
    }
}

impl TradingStrategy for RandomTrader {
    fn id(&self) -> &str {
        "random"
    }

    fn execute(
        &mut self,
        prices: &PriceTable,
        portfolio: &mut Portfolio,
        fees: f64,
        ledger_path: &Path,
        _sink: &mut dyn ReportSink,
    ) -> Result<()> {
        let mut session = TradingSession::open(prices, portfolio, fees, ledger_path)?;

        for day in 0..prices.days() {
            session.write_off_failures(day)?;
            if day == 0 || day % self.params.period != 0 {
                continue;
            }
            for stock in 0..prices.stocks() {
                self.trade_stock(&mut session, day, stock)?;
            }
        }

        if self.params.liquidate_at_end {
            session.liquidate()?;
        }
        tracing::info!(strategy = "random", trades = session.trade_count(), "strategy finished");
        Ok(())
    }
}

/// Run the random strategy once.
pub fn random_trading(
    prices: &PriceTable,
    portfolio: &mut Portfolio,
    fees: f64,
    ledger_path: &Path,
    params: &RandomParams,
    sink: &mut dyn ReportSink,
) -> Result<()> {
    RandomTrader::new(params.clone())?.execute(prices, portfolio, fees, ledger_path, sink)
}
