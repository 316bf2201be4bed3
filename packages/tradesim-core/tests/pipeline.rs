//! End-to-end runs: data, initial portfolio, strategy, report.

use approx::assert_relative_eq;
use std::path::Path;
use tempfile::TempDir;
use tradesim_core::data::{get_data, DataMethod, DataRequest, PriceTable};
use tradesim_core::ledger::{read_entries, start_ledger};
use tradesim_core::{
    build_strategy, create_portfolio, read_ledger, Error, NullSink, RecordingSink, ReportOptions,
    SimulationConfig, TradeSide,
};

fn generated_prices() -> PriceTable {
    let request = DataRequest {
        method: DataMethod::Generate {
            days: 400,
            news_probability: 0.02,
            seed: Some(2024),
        },
        initial_prices: vec![150.0, 80.0, 300.0],
        volatilities: vec![1.5, 1.0, 4.0],
    };
    get_data(&request, &mut NullSink).unwrap().unwrap()
}

fn config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.random.seed = Some(17);
    config.crossing.fast = 10;
    config.crossing.slow = 40;
    config.oscillator.wait_time = 2;
    config
}

fn run(strategy_id: &str, prices: &PriceTable, ledger: &Path) {
    let config = config();
    let budgets = vec![config.initial_amount; prices.stocks()];
    let mut portfolio = create_portfolio(&budgets, prices, config.fees, ledger).unwrap();

    let mut strategy = build_strategy(strategy_id, &config).unwrap();
    strategy
        .execute(prices, &mut portfolio, config.fees, ledger, &mut NullSink)
        .unwrap();

    assert_eq!(portfolio.total_shares(), 0, "{} left holdings", strategy_id);
}

#[test]
fn test_every_strategy_round_trips_through_the_ledger() {
    let dir = TempDir::new().unwrap();
    let prices = generated_prices();

    for id in ["random", "crossing_averages", "oscillator"] {
        let ledger = dir.path().join(format!("{}_ledger.txt", id));
        run(id, &prices, &ledger);

        let entries = read_entries(&ledger).unwrap();
        let report = read_ledger(&ledger, &ReportOptions::default(), &mut NullSink).unwrap();

        assert_eq!(report.info.trade_count, entries.len());
        assert_eq!(report.initial_portfolio.len(), prices.stocks());
        assert!(report.final_portfolio.shares.iter().all(|&s| s == 0));
        let last_day = entries.last().unwrap().day;
        assert_eq!(report.cumulative.len(), last_day + 1);
        assert!(last_day < prices.days());

        let net: f64 = entries.iter().map(|e| e.amount).sum();
        assert_relative_eq!(report.info.profit_loss, net, epsilon = 1e-6);
        assert_relative_eq!(
            report.cumulative.last().unwrap().cumulative,
            net,
            epsilon = 1e-6
        );
    }
}

#[test]
fn test_initial_purchase_stays_within_budget() {
    let dir = TempDir::new().unwrap();
    let ledger = dir.path().join("ledger.txt");
    let prices = generated_prices();
    let config = config();

    let budgets = vec![config.initial_amount; prices.stocks()];
    create_portfolio(&budgets, &prices, config.fees, &ledger).unwrap();

    let entries = read_entries(&ledger).unwrap();
    assert_eq!(entries.len(), prices.stocks());
    for entry in entries {
        assert_eq!(entry.day, 0);
        assert_eq!(entry.side, TradeSide::Buy);
        assert!(entry.spent() <= config.initial_amount);
    }
}

#[test]
fn test_second_run_needs_a_fresh_ledger() {
    let dir = TempDir::new().unwrap();
    let ledger = dir.path().join("ledger.txt");
    let prices = generated_prices();

    start_ledger(&ledger, false).unwrap();
    run("oscillator", &prices, &ledger);
    let first = read_ledger(&ledger, &ReportOptions::default(), &mut NullSink).unwrap();

    // Appending a second run would restart at day 0 after the last day
    assert!(matches!(
        start_ledger(&ledger, false),
        Err(Error::InvalidOperation(_))
    ));

    start_ledger(&ledger, true).unwrap();
    run("oscillator", &prices, &ledger);
    let second = read_ledger(&ledger, &ReportOptions::default(), &mut NullSink).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_saved_prices_feed_the_strategies() {
    let dir = TempDir::new().unwrap();
    let prices_path = dir.path().join("prices.txt");
    let ledger = dir.path().join("ledger.txt");

    generated_prices().save(&prices_path).unwrap();
    let prices = PriceTable::load(&prices_path).unwrap();
    assert_eq!(prices.days(), 400);
    assert_eq!(prices.stocks(), 3);

    run("crossing_averages", &prices, &ledger);

    let mut sink = RecordingSink::new();
    let options = ReportOptions {
        strategy_label: "Crossing Averages".to_string(),
        stock: Some(2),
        ..ReportOptions::default()
    };
    let report = read_ledger(&ledger, &options, &mut sink).unwrap();

    assert_eq!(sink.plots.len(), 1);
    assert_eq!(sink.plots[0].label, "Crossing Averages");
    let stock = report.stock.unwrap();
    assert_eq!(stock.buy_days.first(), Some(&0));
    assert_relative_eq!(stock.profit_loss, stock.earned - stock.spent);
}

#[test]
fn test_read_method_selects_reference_columns() {
    let dir = TempDir::new().unwrap();
    let reference = dir.path().join("reference.txt");
    std::fs::write(
        &reference,
        "2.0 0.5 6.0\n100 40 900\n101 41 880\n99 40.5 905\n102 40.2 910\n",
    )
    .unwrap();

    let mut sink = RecordingSink::new();
    let request = DataRequest {
        method: DataMethod::read(&reference),
        initial_prices: vec![950.0],
        volatilities: vec![],
    };
    let prices = get_data(&request, &mut sink).unwrap().unwrap();

    assert_eq!(prices.column(0), vec![900.0, 880.0, 905.0, 910.0]);
    assert!(sink.saw("Found data with initial prices [900] and volatilities [6]."));
}
