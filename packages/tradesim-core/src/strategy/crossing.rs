//! Moving-average crossover strategy.

use super::TradingStrategy;
use crate::config::CrossingParams;
use crate::data::PriceTable;
use crate::indicators::{crossover_signals, moving_average};
use crate::portfolio::TradingSession;
use crate::report::{IndicatorPlot, NamedSeries, ReportSink};
use crate::types::{Portfolio, TradeSide};
use crate::Result;
use std::path::Path;

/// Buy when the fast average crosses above the slow one, sell everything when
/// it crosses back below.
///
/// After a trade in a stock, its signals are ignored for `cool_off` days.
#[derive(Debug, Clone)]
pub struct CrossingAverages {
    params: CrossingParams,
}

impl CrossingAverages {
    pub fn new(params: CrossingParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    fn averages(&self, column: &[f64]) -> (Vec<f64>, Vec<f64>) {
        (
            moving_average(column, self.params.fast, &self.params.fast_weights),
            moving_average(column, self.params.slow, &self.params.slow_weights),
        )
    }

    /// Crossover signal per day for one price column.
    pub fn signals(&self, column: &[f64]) -> Vec<Option<TradeSide>> {
        let (fast, slow) = self.averages(column);
        crossover_signals(&fast, &slow)
    }

    /// Both averages of one stock as chart data.
    pub fn plot(&self, stock: usize, column: &[f64]) -> IndicatorPlot {
        let (fast, slow) = self.averages(column);
        IndicatorPlot {
            title: format!(
                "{}-day MA vs {}-day MA",
                self.params.fast, self.params.slow
            ),
            stock,
            series: vec![
                NamedSeries {
                    label: format!("{}-day MA", self.params.fast),
                    values: fast,
                },
                NamedSeries {
                    label: format!("{}-day MA", self.params.slow),
                    values: slow,
                },
            ],
            thresholds: Vec::new(),
        }
    }

    fn cooling_off(&self, last_trade: Option<usize>, day: usize) -> bool {
        matches!(last_trade, Some(traded) if day - traded <= self.params.cool_off)
    }
}

impl TradingStrategy for CrossingAverages {
    fn id(&self) -> &str {
        "crossing_averages"
    }

    fn execute(
        &mut self,
        prices: &PriceTable,
        portfolio: &mut Portfolio,
        fees: f64,
        ledger_path: &Path,
        sink: &mut dyn ReportSink,
    ) -> Result<()> {
        let columns = prices.columns();
        if self.params.plot {
            for (stock, column) in columns.iter().enumerate() {
                sink.indicator_plot(&self.plot(stock, column));
            }
        }

        let signals: Vec<_> = columns.iter().map(|c| self.signals(c)).collect();
        let mut last_trade: Vec<Option<usize>> = vec![None; prices.stocks()];
        let mut session = TradingSession::open(prices, portfolio, fees, ledger_path)?;

        for day in 0..prices.days() {
            session.write_off_failures(day)?;

            for (stock, stock_signals) in signals.iter().enumerate() {
                let Some(side) = stock_signals[day] else {
                    continue;
                };
                if self.cooling_off(last_trade[stock], day) {
                    tracing::debug!(day, stock, "signal ignored during cool-off");
                    continue;
                }

                let traded = match side {
                    TradeSide::Buy => session.buy_with_budget(day, stock, self.params.amount)?,
                    TradeSide::Sell => session.sell_all(day, stock)?,
                };
                if traded > 0 {
                    last_trade[stock] = Some(day);
                }
            }
        }

        if self.params.liquidate_at_end {
            session.liquidate()?;
        }
        tracing::info!(
            strategy = "crossing_averages",
            trades = session.trade_count(),
            "strategy finished"
        );
        Ok(())
    }
}

/// Run the crossover strategy once.
pub fn crossing_averages(
    prices: &PriceTable,
    portfolio: &mut Portfolio,
    fees: f64,
    ledger_path: &Path,
    params: &CrossingParams,
    sink: &mut dyn ReportSink,
) -> Result<()> {
    CrossingAverages::new(params.clone())?.execute(prices, portfolio, fees, ledger_path, sink)
}
