//! Portfolio creation, trading sessions and ledger reporting.

mod performance;
mod session;

pub use performance::{read_ledger, LedgerReport, ReportInfo, ReportOptions, StockReport};
pub use session::{create_portfolio, TradingSession};
