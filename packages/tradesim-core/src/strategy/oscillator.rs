//! Oscillator threshold strategy.
//!
//! The oscillator reads between 0 and 1. Below `lower` the stock counts as
//! undervalued, above `upper` as overvalued. Crossing into either zone arms a
//! trade, which fires once the oscillator has stayed in the zone for
//! `wait_time` more days. Each excursion into a zone trades at most once.

use super::TradingStrategy;
use crate::config::OscillatorParams;
use crate::data::PriceTable;
use crate::indicators::oscillator;
use crate::portfolio::TradingSession;
use crate::report::{IndicatorPlot, NamedSeries, ReportSink};
use crate::types::{Portfolio, TradeSide};
use crate::Result;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Trigger {
    /// Outside both zones, or no crossing seen yet
    Idle,
    /// Crossed into a zone on `since`
    Armed { side: TradeSide, since: usize },
    /// Already traded during this excursion
    Spent,
}

/// Per-stock trigger state machine.
#[derive(Debug, Clone, Copy)]
struct ThresholdTrigger {
    lower: f64,
    upper: f64,
    wait_time: usize,
    state: Trigger,
}

impl ThresholdTrigger {
    fn new(params: &OscillatorParams) -> Self {
        Self {
            lower: params.lower,
            upper: params.upper,
            wait_time: params.wait_time,
            state: Trigger::Idle,
        }
    }

    fn zone(&self, value: f64) -> Option<TradeSide> {
        if value < self.lower {
            Some(TradeSide::Buy)
        } else if value > self.upper {
            Some(TradeSide::Sell)
        } else {
            None
        }
    }

    /// Feed one day of the oscillator; returns the trade to make today, if any.
    fn step(&mut self, day: usize, previous: f64, value: f64) -> Option<TradeSide> {
        let Some(zone) = self.zone(value) else {
            self.state = Trigger::Idle;
            return None;
        };

        // NaN compares false, so the first defined day can never be a crossing
        let crossed = match zone {
            TradeSide::Buy => previous >= self.lower,
            TradeSide::Sell => previous <= self.upper,
        };
        if crossed {
            self.state = Trigger::Armed {
                side: zone,
                since: day,
            };
        }

        match self.state {
            Trigger::Armed { side, since } if side == zone => {
                if day - since >= self.wait_time {
                    self.state = Trigger::Spent;
                    return Some(side);
                }
                None
            }
            Trigger::Armed { .. } => {
                self.state = Trigger::Idle;
                None
            }
            _ => None,
        }
    }
}

/// Buys undervalued and sells overvalued stocks, judged by an oscillator.
#[derive(Debug, Clone)]
pub struct OscillatorTrader {
    params: OscillatorParams,
}

impl OscillatorTrader {
    pub fn new(params: OscillatorParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Oscillator series for one price column.
    pub fn oscillator(&self, column: &[f64]) -> Vec<f64> {
        oscillator(
            column,
            self.params.period,
            self.params.kind,
            self.params.smoothing,
        )
    }

    fn plot(&self, stock: usize, values: &[f64]) -> IndicatorPlot {
        let label = format!("{:?} oscillator ({} days)", self.params.kind, self.params.period);
        IndicatorPlot {
            title: label.clone(),
            stock,
            series: vec![NamedSeries {
                label,
                values: values.to_vec(),
            }],
            thresholds: vec![self.params.upper, self.params.lower],
        }
    }
}

impl TradingStrategy for OscillatorTrader {
    fn id(&self) -> &str {
        "oscillator"
    }

    fn execute(
        &mut self,
        prices: &PriceTable,
        portfolio: &mut Portfolio,
        fees: f64,
        ledger_path: &Path,
        sink: &mut dyn ReportSink,
    ) -> Result<()> {
        let series: Vec<Vec<f64>> = prices.columns().iter().map(|c| self.oscillator(c)).collect();
        if self.params.plot {
            for (stock, values) in series.iter().enumerate() {
                sink.indicator_plot(&self.plot(stock, values));
            }
        }
        let mut triggers = vec![ThresholdTrigger::new(&self.params); prices.stocks()];
        let mut session = TradingSession::open(prices, portfolio, fees, ledger_path)?;

        for day in 0..prices.days() {
            session.write_off_failures(day)?;
            if day == 0 {
                continue;
            }

            for (stock, values) in series.iter().enumerate() {
                let Some(side) = triggers[stock].step(day, values[day - 1], values[day]) else {
                    continue;
                };
                match side {
                    TradeSide::Buy => {
                        session.buy_with_budget(day, stock, self.params.amount)?;
                    }
                    TradeSide::Sell => {
                        session.sell_all(day, stock)?;
                    }
                }
            }
        }

        if self.params.liquidate_at_end {
            session.liquidate()?;
        }
        tracing::info!(
            strategy = "oscillator",
            kind = ?self.params.kind,
            trades = session.trade_count(),
            "strategy finished"
        );
        Ok(())
    }
}

/// Run the oscillator threshold strategy once.
pub fn oscillator_trading(
    prices: &PriceTable,
    portfolio: &mut Portfolio,
    fees: f64,
    ledger_path: &Path,
    params: &OscillatorParams,
    sink: &mut dyn ReportSink,
) -> Result<()> {
    OscillatorTrader::new(params.clone())?.execute(prices, portfolio, fees, ledger_path, sink)
}
