//! Trading strategies.
//!
//! Each strategy walks the price table one day at a time, appends every buy
//! and sell to the ledger and updates the portfolio in place. They share the
//! [`TradingStrategy`] trait so callers can pick one by id at runtime.

mod crossing;
mod oscillator;
mod random;
mod registry;

pub use crossing::{crossing_averages, CrossingAverages};
pub use oscillator::{oscillator_trading, OscillatorTrader};
pub use random::{random_trading, RandomTrader};
pub use registry::{
    build_strategy, get_strategy, list_strategies, strategy_ids, Strategy, BUILTIN_STRATEGIES,
};

use crate::data::PriceTable;
use crate::report::ReportSink;
use crate::types::Portfolio;
use crate::Result;
use std::path::Path;

/// A trading policy that can be run over a whole price table.
pub trait TradingStrategy {
    /// Registry id of this strategy.
    fn id(&self) -> &str;

    /// Trade `portfolio` over every day of `prices`, appending to `ledger_path`.
    ///
    /// Strategies with a `plot` parameter send their indicators to `sink`.
    fn execute(
        &mut self,
        prices: &PriceTable,
        portfolio: &mut Portfolio,
        fees: f64,
        ledger_path: &Path,
        sink: &mut dyn ReportSink,
    ) -> Result<()>;
}
