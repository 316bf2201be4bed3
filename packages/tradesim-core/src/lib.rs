//! Tradesim Core - a toy share-trading simulator.
//!
//! The crate is a four stage pipeline:
//!
//! - **Data**: generate synthetic price tables or pick columns from a reference file
//! - **Portfolio**: buy an initial portfolio on day 0
//! - **Strategies**: random, crossing moving averages, oscillator thresholds
//! - **Performance**: replay the text ledger into profit/loss figures
//!
//! The ledger file is the only handoff between the trading and reporting stages.
//!
//! # Example
//!
//! ```rust,no_run
//! use tradesim_core::data::{get_data, DataMethod, DataRequest};
//! use tradesim_core::portfolio::{create_portfolio, read_ledger, ReportOptions};
//! use tradesim_core::report::LogSink;
//! use tradesim_core::strategy::crossing_averages;
//! use tradesim_core::config::CrossingParams;
//! use tradesim_core::ledger::start_ledger;
//!
//! # fn main() -> tradesim_core::Result<()> {
//! let mut sink = LogSink;
//! let request = DataRequest {
//!     method: DataMethod::generate(Some(7)),
//!     initial_prices: vec![150.0, 250.0],
//!     volatilities: vec![1.8, 3.2],
//! };
//! let prices = get_data(&request, &mut sink)?.expect("both lists were given");
//!
//! let ledger = std::path::Path::new("crossing_ledger.txt");
//! start_ledger(ledger, true)?;
//! let mut portfolio = create_portfolio(&[5000.0, 5000.0], &prices, 20.0, ledger)?;
//! let params = CrossingParams::default();
//! crossing_averages(&prices, &mut portfolio, 20.0, ledger, &params, &mut sink)?;
//!
//! let report = read_ledger(ledger, &ReportOptions::default(), &mut sink)?;
//! println!("profit/loss: {:.2}", report.info.profit_loss);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod indicators;
pub mod ledger;
pub mod portfolio;
pub mod report;
pub mod strategy;
pub mod types;

// Re-export commonly used types
pub use config::{CrossingParams, OscillatorParams, RandomParams, SimulationConfig};
pub use data::{get_data, DataMethod, DataRequest, PriceTable};
pub use ledger::{start_ledger, LedgerEntry};
pub use portfolio::{create_portfolio, read_ledger, LedgerReport, ReportOptions};
pub use report::{IndicatorPlot, LogSink, NullSink, RecordingSink, ReportSink};
pub use strategy::{
    build_strategy, crossing_averages, get_strategy, list_strategies, oscillator_trading,
    random_trading, TradingStrategy,
};
pub use types::{ApiResponse, Portfolio, TradeSide};

/// Error types for tradesim-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt ledger at line {line}: {reason}")]
    CorruptLedger { line: usize, reason: String },

    #[error("Ledger is empty: {0}")]
    EmptyLedger(String),

    #[error("Invalid price table: {0}")]
    InvalidPriceTable(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),
}

/// Result type for tradesim-core operations.
pub type Result<T> = std::result::Result<T, Error>;
