//! Price data provider.
//!
//! Produces the price table a simulation runs on, either by generating it or by
//! picking columns from a reference file.

mod generate;
mod reference;
mod table;

pub use generate::generate_stock_prices;
pub use reference::{realized_volatility, ReferenceData, Selection};
pub use table::PriceTable;

use crate::config::DEFAULT_DAYS;
use crate::report::ReportSink;
use crate::types::round2;
use crate::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

/// How to obtain price data.
#[derive(Debug, Clone, PartialEq)]
pub enum DataMethod {
    /// Simulate prices from scratch.
    Generate {
        days: usize,
        news_probability: f64,
        seed: Option<u64>,
    },
    /// Pick columns out of a reference file.
    Read {
        path: PathBuf,
        /// First row of the file lists column volatilities
        volatility_header: bool,
    },
}

impl DataMethod {
    /// Five years of generated data with the default news probability.
    pub fn generate(seed: Option<u64>) -> Self {
        DataMethod::Generate {
            days: DEFAULT_DAYS,
            news_probability: 0.01,
            seed,
        }
    }

    /// Read a reference file in the volatility-header format.
    pub fn read(path: impl Into<PathBuf>) -> Self {
        DataMethod::Read {
            path: path.into(),
            volatility_header: true,
        }
    }
}

/// A request for price data.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    pub method: DataMethod,
    /// Target initial price per stock
    pub initial_prices: Vec<f64>,
    /// Target volatility per stock
    pub volatilities: Vec<f64>,
}

impl DataRequest {
    /// Request the whole table behind `method`.
    pub fn all(method: DataMethod) -> Self {
        Self {
            method,
            initial_prices: Vec::new(),
            volatilities: Vec::new(),
        }
    }
}

fn format_list(values: &[f64]) -> String {
    let items: Vec<String> = values.iter().map(|v| round2(*v).to_string()).collect();
    format!("[{}]", items.join(", "))
}

/// Produce a price table.
///
/// Missing or mismatched arguments are use errors: they are reported to
/// `sink` and the result is `Ok(None)`. File and parse problems are `Err`.
///
/// - `Generate` needs one volatility per initial price.
/// - `Read` matches each requested initial price (or, when no prices are
///   given, each requested volatility) to the closest unused reference column
///   and reports what it found. Volatilities are ignored when prices are
///   given. With nothing requested the full reference table is returned.
pub fn get_data(request: &DataRequest, sink: &mut dyn ReportSink) -> Result<Option<PriceTable>> {
    match &request.method {
        DataMethod::Generate {
            days,
            news_probability,
            seed,
        } => {
            let n = request.initial_prices.len();
            if n == 0 || request.volatilities.len() > n {
                sink.message("Please specify the initial price for each stock.");
                return Ok(None);
            }
            if request.volatilities.len() < n {
                sink.message("Please specify the volatility for each stock.");
                return Ok(None);
            }

            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(*seed),
                None => StdRng::from_entropy(),
            };
            let table = generate_stock_prices(
                *days,
                &request.initial_prices,
                &request.volatilities,
                *news_probability,
                &mut rng,
            )?;
            tracing::info!(days = table.days(), stocks = table.stocks(), "generated price data");
            Ok(Some(table))
        }
        DataMethod::Read {
            path,
            volatility_header,
        } => {
            let reference = ReferenceData::load(path, *volatility_header)?;

            let selection = if !request.initial_prices.is_empty() {
                reference.select_by_initial_price(&request.initial_prices)
            } else if !request.volatilities.is_empty() {
                reference.select_by_volatility(&request.volatilities)
            } else {
                tracing::info!(
                    days = reference.prices.days(),
                    stocks = reference.prices.stocks(),
                    "read full reference data"
                );
                return Ok(Some(reference.prices));
            };

            let selection = match selection {
                Ok(selection) => selection,
                Err(crate::Error::InsufficientData(reason)) => {
                    sink.message(&format!("Cannot select data: {}.", reason));
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };

            sink.message(&format!(
                "Found data with initial prices {} and volatilities {}.",
                format_list(&selection.initial_prices),
                format_list(&selection.volatilities)
            ));
            if !request.initial_prices.is_empty() && !request.volatilities.is_empty() {
                tracing::warn!("both initial prices and volatilities given, volatilities ignored");
                sink.message("Input argument volatility ignored.");
            }

            Ok(Some(selection.prices))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::RecordingSink;
    use std::fs;
    use tempfile::TempDir;

    const REFERENCE: &str = "\
1.5 0.7 5.0 3.0
200 50 850 120
201 51 860 118
203 50.5 845 -2
204 50.1 850 7
";

    fn reference_file(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("stock_data_5y.txt");
        fs::write(&path, REFERENCE).unwrap();
        path
    }

    #[test]
    fn test_generate_requires_volatility() {
        let mut sink = RecordingSink::new();
        let request = DataRequest {
            method: DataMethod::generate(Some(1)),
            initial_prices: vec![150.0, 200.0],
            volatilities: vec![],
        };

        assert!(get_data(&request, &mut sink).unwrap().is_none());
        assert!(sink.saw("Please specify the volatility for each stock"));
    }

    #[test]
    fn test_generate_requires_initial_price() {
        let mut sink = RecordingSink::new();
        let request = DataRequest {
            method: DataMethod::generate(Some(1)),
            initial_prices: vec![],
            volatilities: vec![3.0],
        };

        assert!(get_data(&request, &mut sink).unwrap().is_none());
        assert!(sink.saw("Please specify the initial price for each stock"));
    }

    #[test]
    fn test_generate_one_column_per_stock() {
        let mut sink = RecordingSink::new();
        let request = DataRequest {
            method: DataMethod::generate(Some(11)),
            initial_prices: vec![150.0, 250.0],
            volatilities: vec![1.8, 3.2],
        };

        let table = get_data(&request, &mut sink).unwrap().unwrap();
        assert_eq!(table.stocks(), 2);
        assert_eq!(table.days(), DEFAULT_DAYS);
        assert!(sink.messages.is_empty());
    }

    #[test]
    fn test_read_by_initial_price() {
        let dir = TempDir::new().unwrap();
        let mut sink = RecordingSink::new();
        let request = DataRequest {
            method: DataMethod::read(reference_file(&dir)),
            initial_prices: vec![210.0, 58.0],
            volatilities: vec![],
        };

        let table = get_data(&request, &mut sink).unwrap().unwrap();
        assert_eq!(table.row(0), &[200.0, 50.0]);
        assert_eq!(
            sink.messages,
            vec!["Found data with initial prices [200, 50] and volatilities [1.5, 0.7].".to_string()]
        );
    }

    #[test]
    fn test_read_ignores_volatility_when_prices_given() {
        let dir = TempDir::new().unwrap();
        let mut sink = RecordingSink::new();
        let request = DataRequest {
            method: DataMethod::read(reference_file(&dir)),
            initial_prices: vec![210.0, 58.0],
            volatilities: vec![5.0, 7.0],
        };

        let table = get_data(&request, &mut sink).unwrap().unwrap();
        assert_eq!(table.stocks(), 2);
        assert!(sink.saw("initial prices [200, 50]"));
        assert!(sink.saw("Input argument volatility ignored."));
    }

    #[test]
    fn test_read_by_volatility() {
        let dir = TempDir::new().unwrap();
        let mut sink = RecordingSink::new();
        let request = DataRequest {
            method: DataMethod::read(reference_file(&dir)),
            initial_prices: vec![],
            volatilities: vec![5.1],
        };

        let table = get_data(&request, &mut sink).unwrap().unwrap();
        assert_eq!(table.stocks(), 1);
        assert!(sink.saw("initial prices [850] and volatilities [5]"));
    }

    #[test]
    fn test_read_everything() {
        let dir = TempDir::new().unwrap();
        let mut sink = RecordingSink::new();
        let request = DataRequest::all(DataMethod::read(reference_file(&dir)));

        let table = get_data(&request, &mut sink).unwrap().unwrap();
        assert_eq!(table.stocks(), 4);
        assert_eq!(table.days(), 4);
        // The bust in column 3 stays bust
        assert!(table.price(2, 3).is_nan() && table.price(3, 3).is_nan());
        assert!(sink.messages.is_empty());
    }

    #[test]
    fn test_read_too_many_requests_is_use_error() {
        let dir = TempDir::new().unwrap();
        let mut sink = RecordingSink::new();
        let request = DataRequest {
            method: DataMethod::read(reference_file(&dir)),
            initial_prices: vec![1.0; 6],
            volatilities: vec![],
        };

        assert!(get_data(&request, &mut sink).unwrap().is_none());
        assert!(sink.saw("Cannot select data"));
    }

    #[test]
    fn test_read_missing_file_is_error() {
        let mut sink = RecordingSink::new();
        let request = DataRequest::all(DataMethod::read("/nonexistent/prices.txt"));
        assert!(get_data(&request, &mut sink).is_err());
    }
}
