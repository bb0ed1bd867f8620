use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use pundi::core::investment::{
    Asset, DepositHolding, FundHolding, InterestPayout, MarketHolding, Tenor,
};
use pundi::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for pundi::AppCommand {
    fn from(cmd: Commands) -> pundi::AppCommand {
        match cmd {
            Commands::List => pundi::AppCommand::List,
            Commands::Summary => pundi::AppCommand::Summary,
            Commands::Add { asset } => {
                let (asset, notes) = asset.into_asset();
                pundi::AppCommand::Add { asset, notes }
            }
            Commands::Edit { id, asset } => {
                let (asset, notes) = asset.into_asset();
                pundi::AppCommand::Edit { id, asset, notes }
            }
            Commands::Remove { id } => pundi::AppCommand::Remove { id },
            Commands::Refresh { force, id } => pundi::AppCommand::Refresh { force, id },
            Commands::Retry => pundi::AppCommand::Retry,
            Commands::Sync => pundi::AppCommand::Sync,
            Commands::Pull => pundi::AppCommand::Pull,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show all recorded investments
    List,
    /// Display portfolio summary
    Summary,
    /// Record a new investment
    Add {
        #[command(subcommand)]
        asset: AssetCommands,
    },
    /// Replace an investment's details
    Edit {
        /// Record id as shown by `list`
        id: String,
        #[command(subcommand)]
        asset: AssetCommands,
    },
    /// Delete an investment
    Remove {
        /// Record id as shown by `list`
        id: String,
    },
    /// Refresh market prices
    Refresh {
        /// Re-quote everything, bypassing cached prices
        #[arg(long)]
        force: bool,
        /// Refresh a single record
        #[arg(long)]
        id: Option<String>,
    },
    /// Re-queue failed price updates
    Retry,
    /// Push unsynced records to the remote endpoint
    Sync,
    /// Replace local records with the remote collection
    Pull,
}

#[derive(Subcommand)]
enum AssetCommands {
    /// Crypto holding, quoted in IDR on Indodax
    Crypto(MarketArgs),
    /// Stock holding, quoted on the IDX
    Stock(MarketArgs),
    /// Mutual fund position, valued at cost
    Reksadana(ReksadanaArgs),
    /// Fixed-term bank deposit
    Deposito(DepositoArgs),
}

#[derive(Args)]
struct MarketArgs {
    /// Ticker symbol, e.g. BTC or BBCA
    symbol: String,
    /// Display name, defaults to the symbol
    #[arg(long)]
    name: Option<String>,
    /// Purchase date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    buy_date: Option<NaiveDate>,
    /// Price paid per unit
    #[arg(long)]
    buy_price: f64,
    #[arg(long)]
    quantity: f64,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args)]
struct ReksadanaArgs {
    /// Fund name as listed by the platform
    fund_name: String,
    /// Fund category, e.g. "pasar uang"
    #[arg(long)]
    category: String,
    /// Platform the fund was bought on, e.g. Bibit
    #[arg(long)]
    platform: Option<String>,
    /// Amount invested
    #[arg(long)]
    amount: f64,
    /// Purchase date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    purchase_date: Option<NaiveDate>,
    #[arg(long)]
    units: Option<f64>,
    #[arg(long)]
    nav_at_purchase: Option<f64>,
    #[arg(long)]
    current_nav: Option<f64>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args)]
struct DepositoArgs {
    /// Bank name
    bank_name: String,
    #[arg(long)]
    principal: f64,
    /// Term: 1m, 3m, 6m or 12m
    #[arg(long)]
    tenor: Tenor,
    /// Annual interest rate, in percent
    #[arg(long)]
    rate: f64,
    /// Interest payout: monthly or maturity
    #[arg(long, default_value = "maturity")]
    payout: InterestPayout,
    /// Withholding tax on interest, in percent
    #[arg(long, default_value_t = 20.0)]
    tax_rate: f64,
    /// Start date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    start_date: Option<NaiveDate>,
    /// Roll the deposit over automatically at maturity
    #[arg(long)]
    auto_rollover: bool,
    #[arg(long)]
    notes: Option<String>,
}

impl AssetCommands {
    fn into_asset(self) -> (Asset, Option<String>) {
        let today = || chrono::Local::now().date_naive();
        match self {
            AssetCommands::Crypto(args) => {
                let holding = market_holding(&args, today());
                (Asset::Crypto(holding), args.notes)
            }
            AssetCommands::Stock(args) => {
                let holding = market_holding(&args, today());
                (Asset::Stock(holding), args.notes)
            }
            AssetCommands::Reksadana(args) => (
                Asset::Reksadana(FundHolding {
                    fund_name: args.fund_name,
                    fund_category: args.category,
                    platform: args.platform,
                    amount: args.amount,
                    purchase_date: args.purchase_date.unwrap_or_else(today),
                    units: args.units,
                    nav_at_purchase: args.nav_at_purchase,
                    current_nav: args.current_nav,
                }),
                args.notes,
            ),
            AssetCommands::Deposito(args) => (
                Asset::Deposito(DepositHolding {
                    bank_name: args.bank_name,
                    principal: args.principal,
                    tenor: args.tenor,
                    annual_rate: args.rate,
                    payout: args.payout,
                    tax_rate: args.tax_rate,
                    start_date: args.start_date.unwrap_or_else(today),
                    auto_rollover: args.auto_rollover,
                }),
                args.notes,
            ),
        }
    }
}

fn market_holding(args: &MarketArgs, today: NaiveDate) -> MarketHolding {
    MarketHolding {
        symbol: args.symbol.to_uppercase(),
        name: args.name.clone().unwrap_or_else(|| args.symbol.to_uppercase()),
        buy_date: args.buy_date.unwrap_or(today),
        buy_price: args.buy_price,
        quantity: args.quantity,
        current_price: None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => pundi::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = pundi::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
providers:
  indodax:
    base_url: "https://indodax.com"
  yahoo:
    base_url: "https://query1.finance.yahoo.com"

# Mirror records to a remote endpoint by uncommenting:
# sync:
#   base_url: "https://example.com/api"
#   api_key: "..."

currency: "IDR"
refresh_after_minutes: 60
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
