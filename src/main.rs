use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use holdbook::app::{self, App, TradeRequest};
use holdbook::config::{default_config_path, ResolvedConfig};
use holdbook::models::TradeSide;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "holdbook")]
#[command(about = "FIFO holdings and profit ledger")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show current configuration
    Config,

    /// Manage portfolios
    Portfolio {
        #[command(subcommand)]
        command: PortfolioCommand,
    },

    /// Manage the asset registry
    Asset {
        #[command(subcommand)]
        command: AssetCommand,
    },

    /// Record a buy
    Buy(TradeArgs),

    /// Record a sell; rejected if it exceeds current holdings
    Sell(TradeArgs),

    /// Holdings, profits and totals as of a date
    Holdings {
        /// Cutoff date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        as_of: Option<String>,

        /// Portfolio id or name; omit for the global ledger
        #[arg(long)]
        portfolio: Option<String>,

        /// Count realized profit of currently held assets only
        #[arg(long)]
        held_only: bool,
    },

    /// Stored daily prices
    Price {
        #[command(subcommand)]
        command: PriceCommand,
    },

    /// Market-wide views
    Market {
        #[command(subcommand)]
        command: MarketCommand,
    },
}

#[derive(Subcommand)]
enum PortfolioCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    List,
    Show {
        /// Portfolio id or name
        id: String,
    },
    Update {
        /// Portfolio id or name
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Subcommand)]
enum AssetCommand {
    /// Register an asset by hand
    Add {
        symbol: String,
        #[arg(long)]
        name: Option<String>,
        /// stock, crypto, etf, mutual_fund or other
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        exchange: Option<String>,
    },
    /// Register an asset from the market-data source
    Sync { symbol: String },
    List,
    Show { symbol: String },
    /// Remove from the registry; ledger entries are kept
    Remove { symbol: String },
}

#[derive(clap::Args)]
struct TradeArgs {
    #[arg(long)]
    symbol: String,
    #[arg(long)]
    quantity: String,
    #[arg(long)]
    price: String,
    /// Trade date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    date: Option<String>,
    /// Portfolio id or name; omit for the global ledger
    #[arg(long)]
    portfolio: Option<String>,
}

#[derive(Subcommand)]
enum PriceCommand {
    /// Record a closing price by hand
    Set {
        symbol: String,
        #[arg(long)]
        price: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Fetch daily bars from the market-data source
    Sync {
        symbol: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Show stored daily bars
    History {
        symbol: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
}

#[derive(Subcommand)]
enum MarketCommand {
    /// Top gainers and losers by intraday change
    Movers {
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        top: Option<usize>,
        /// Symbols to screen; defaults to a fixed list of large US stocks
        symbols: Vec<String>,
    },
}

impl TradeArgs {
    fn request(&self, side: TradeSide) -> TradeRequest<'_> {
        TradeRequest {
            side,
            symbol: &self.symbol,
            quantity: &self.quantity,
            price: &self.price,
            date: self.date.as_deref(),
            portfolio: self.portfolio.as_deref(),
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = ResolvedConfig::load_or_default(&config_path)?;

    let app = App::open(config)?;
    let output = run(&app, &config_path, cli.command).await?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(app: &App, config_path: &Path, command: Command) -> Result<serde_json::Value> {
    let output = match command {
        Command::Config => app::config_output(config_path, &app.config),
        Command::Portfolio { command } => match command {
            PortfolioCommand::Create { name, description } => {
                app::create_portfolio(app, &name, &description).await?
            }
            PortfolioCommand::List => app::list_portfolios(app).await?,
            PortfolioCommand::Show { id } => app::show_portfolio(app, &id).await?,
            PortfolioCommand::Update {
                id,
                name,
                description,
            } => {
                app::update_portfolio(app, &id, name.as_deref(), description.as_deref()).await?
            }
        },
        Command::Asset { command } => match command {
            AssetCommand::Add {
                symbol,
                name,
                kind,
                exchange,
            } => {
                app::add_asset(
                    app,
                    &symbol,
                    name.as_deref(),
                    kind.as_deref(),
                    exchange.as_deref(),
                )
                .await?
            }
            AssetCommand::Sync { symbol } => app::sync_asset(app, &symbol).await?,
            AssetCommand::List => app::list_assets(app).await?,
            AssetCommand::Show { symbol } => app::show_asset(app, &symbol).await?,
            AssetCommand::Remove { symbol } => app::remove_asset(app, &symbol).await?,
        },
        Command::Buy(args) => app::record_trade(app, args.request(TradeSide::Buy)).await?,
        Command::Sell(args) => app::record_trade(app, args.request(TradeSide::Sell)).await?,
        Command::Holdings {
            as_of,
            portfolio,
            held_only,
        } => app::holdings(app, portfolio.as_deref(), as_of.as_deref(), held_only).await?,
        Command::Price { command } => match command {
            PriceCommand::Set {
                symbol,
                price,
                date,
            } => app::set_price(app, &symbol, date.as_deref(), &price).await?,
            PriceCommand::Sync { symbol, start, end } => {
                app::sync_prices(app, &symbol, start.as_deref(), end.as_deref()).await?
            }
            PriceCommand::History { symbol, start, end } => {
                app::price_history(app, &symbol, start.as_deref(), end.as_deref()).await?
            }
        },
        Command::Market { command } => match command {
            MarketCommand::Movers { date, top, symbols } => {
                app::market_movers(app, &symbols, date.as_deref(), top).await?
            }
        },
    };
    Ok(output)
}
