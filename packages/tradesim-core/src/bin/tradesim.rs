//! Tradesim CLI - run the simulator stages from the command line.
//!
//! Every command prints one JSON `ApiResponse` on stdout. Logs go to stderr.

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tradesim_core::{
    build_strategy, create_portfolio, get_data, get_strategy, list_strategies, read_ledger,
    start_ledger, ApiResponse, DataMethod, DataRequest, PriceTable, RecordingSink, ReportOptions,
    SimulationConfig,
};

#[derive(Parser)]
#[command(name = "tradesim")]
#[command(about = "Tradesim CLI - price data, strategies and ledger reports")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price data commands
    Data {
        #[command(subcommand)]
        action: DataAction,
    },
    /// Buy the initial portfolio and run a strategy over a price file
    Simulate {
        /// Price table file
        #[arg(short, long)]
        prices: PathBuf,
        /// Strategy ID
        #[arg(short, long)]
        strategy: String,
        /// Ledger file to append to
        #[arg(short, long)]
        ledger: PathBuf,
        /// Day 0 budget per stock (defaults to the config value)
        #[arg(short, long)]
        amount: Option<f64>,
        /// Fee per transaction (defaults to the config value)
        #[arg(short, long)]
        fees: Option<f64>,
        /// Seed for the random strategy
        #[arg(long)]
        seed: Option<u64>,
        /// Config file (defaults to ~/.tradesim/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Replace a ledger that already has entries
        #[arg(long)]
        overwrite: bool,
        /// Write the strategy's indicator chart data here as JSON
        #[arg(long)]
        plot_out: Option<PathBuf>,
    },
    /// Replay a ledger into profit/loss figures
    Report {
        /// Ledger file
        #[arg(short, long)]
        ledger: PathBuf,
        /// Also report this stock on its own
        #[arg(short, long)]
        stock: Option<usize>,
        /// Strategy label for the chart
        #[arg(long, default_value = "Random Strategy")]
        label: String,
        /// Write the cumulative profit/loss chart data here as JSON
        #[arg(long)]
        plot_out: Option<PathBuf>,
    },
    /// Strategy commands
    Strategy {
        #[command(subcommand)]
        action: StrategyAction,
    },
}

#[derive(Subcommand)]
enum DataAction {
    /// Generate a synthetic price table
    Generate {
        /// Initial price per stock (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        initial_price: Vec<f64>,
        /// Volatility per stock (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        volatility: Vec<f64>,
        /// Number of days
        #[arg(short, long, default_value = "1825")]
        days: usize,
        /// Daily probability of a news shock
        #[arg(short, long, default_value = "0.01")]
        news_probability: f64,
        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,
        /// Output file
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Select columns from a reference price file
    Read {
        /// Reference file
        #[arg(short, long)]
        file: PathBuf,
        /// First row of the file holds column volatilities
        #[arg(long)]
        volatility_header: bool,
        /// Initial price per stock to match (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        initial_price: Vec<f64>,
        /// Volatility per stock to match (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        volatility: Vec<f64>,
        /// Output file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum StrategyAction {
    /// List available strategies
    List,
    /// Get strategy details
    Get {
        /// Strategy ID
        #[arg(short, long)]
        id: String,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let output = match cli.command {
        Commands::Data { action } => handle_data(action),
        Commands::Simulate {
            prices,
            strategy,
            ledger,
            amount,
            fees,
            seed,
            config,
            overwrite,
            plot_out,
        } => handle_simulate(SimulateArgs {
            prices,
            strategy,
            ledger,
            amount,
            fees,
            seed,
            config,
            overwrite,
            plot_out,
        }),
        Commands::Report {
            ledger,
            stock,
            label,
            plot_out,
        } => handle_report(&ledger, stock, label, plot_out.as_deref()),
        Commands::Strategy { action } => handle_strategy(action),
    };

    println!("{}", output);
}

fn render<T: Serialize>(response: &ApiResponse<T>) -> String {
    serde_json::to_string_pretty(response)
        .unwrap_or_else(|e| format!(r#"{{"ok":false,"data":null,"error":"{}"}}"#, e))
}

fn respond(result: tradesim_core::Result<Value>) -> String {
    match result {
        Ok(data) => render(&ApiResponse::ok(data)),
        Err(e) => render(&ApiResponse::<()>::err(e.to_string())),
    }
}

/// Use errors carry the messages explaining what was missing.
fn use_error(sink: &RecordingSink) -> String {
    render(&ApiResponse::<()>::err(sink.messages.join(" ")))
}

fn table_summary(table: &PriceTable) -> Value {
    let initial_prices: &[f64] = if table.is_empty() { &[] } else { table.row(0) };
    json!({
        "days": table.days(),
        "stocks": table.stocks(),
        "initial_prices": initial_prices,
    })
}

fn handle_data(action: DataAction) -> String {
    let mut sink = RecordingSink::new();

    let (request, out) = match action {
        DataAction::Generate {
            initial_price,
            volatility,
            days,
            news_probability,
            seed,
            out,
        } => (
            DataRequest {
                method: DataMethod::Generate {
                    days,
                    news_probability,
                    seed,
                },
                initial_prices: initial_price,
                volatilities: volatility,
            },
            Some(out),
        ),
        DataAction::Read {
            file,
            volatility_header,
            initial_price,
            volatility,
            out,
        } => (
            DataRequest {
                method: DataMethod::Read {
                    path: file,
                    volatility_header,
                },
                initial_prices: initial_price,
                volatilities: volatility,
            },
            out,
        ),
    };

    let table = match get_data(&request, &mut sink) {
        Ok(Some(table)) => table,
        Ok(None) => return use_error(&sink),
        Err(e) => return render(&ApiResponse::<()>::err(e.to_string())),
    };

    respond((|| -> tradesim_core::Result<Value> {
        if let Some(out) = &out {
            table.save(out)?;
        }
        Ok(json!({
            "table": table_summary(&table),
            "out": out,
            "messages": sink.messages,
        }))
    })())
}

struct SimulateArgs {
    prices: PathBuf,
    strategy: String,
    ledger: PathBuf,
    amount: Option<f64>,
    fees: Option<f64>,
    seed: Option<u64>,
    config: Option<PathBuf>,
    overwrite: bool,
    plot_out: Option<PathBuf>,
}

fn simulate(args: SimulateArgs) -> tradesim_core::Result<Value> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load_from_path(path)?,
        None => SimulationConfig::load()?,
    };
    if let Some(fees) = args.fees {
        config.fees = fees;
    }
    if let Some(amount) = args.amount {
        config.initial_amount = amount;
    }
    if args.seed.is_some() {
        config.random.seed = args.seed;
    }
    if args.plot_out.is_some() {
        config.crossing.plot = true;
        config.oscillator.plot = true;
    }
    config.validate()?;

    let mut strategy = build_strategy(&args.strategy, &config)?;
    let prices = PriceTable::load(&args.prices)?;

    start_ledger(&args.ledger, args.overwrite)?;

    let budgets = vec![config.initial_amount; prices.stocks()];
    let mut portfolio = create_portfolio(&budgets, &prices, config.fees, &args.ledger)?;
    let initial = portfolio.clone();
    let mut sink = RecordingSink::new();
    strategy.execute(&prices, &mut portfolio, config.fees, &args.ledger, &mut sink)?;

    if let Some(path) = &args.plot_out {
        fs::write(path, serde_json::to_string_pretty(&sink.indicator_plots)?)?;
    }

    Ok(json!({
        "strategy": strategy.id(),
        "ledger": args.ledger,
        "days": prices.days(),
        "initial_portfolio": initial,
        "final_portfolio": portfolio,
        "plot": args.plot_out,
    }))
}

fn handle_simulate(args: SimulateArgs) -> String {
    respond(simulate(args))
}

fn handle_report(ledger: &Path, stock: Option<usize>, label: String, plot_out: Option<&Path>) -> String {
    let mut sink = RecordingSink::new();
    let options = ReportOptions {
        profit_plot: plot_out.is_some(),
        strategy_label: label,
        stock,
    };

    respond((|| -> tradesim_core::Result<Value> {
        let report = read_ledger(ledger, &options, &mut sink)?;
        if let (Some(path), Some(plot)) = (plot_out, sink.plots.first()) {
            fs::write(path, serde_json::to_string_pretty(plot)?)?;
        }
        Ok(json!({
            "initial_portfolio": report.initial_portfolio,
            "final_portfolio": report.final_portfolio,
            "holdings_before_liquidation": report.holdings_before_liquidation,
            "info": report.info,
            "stock": report.stock,
            "plot": plot_out,
        }))
    })())
}

fn handle_strategy(action: StrategyAction) -> String {
    match action {
        StrategyAction::List => render(&ApiResponse::ok(json!({
            "strategies": list_strategies(),
        }))),
        StrategyAction::Get { id } => match get_strategy(&id) {
            Some(strategy) => render(&ApiResponse::ok(strategy)),
            None => render(&ApiResponse::<()>::err(format!("Strategy not found: {}", id))),
        },
    }
}
