use anyhow::Result;
use clap::Parser;
use crossbot::broker::AlpacaClient;
use crossbot::config::{AlpacaConfig, StrategyConfig};
use crossbot::{RunOutcome, Trader};
use tracing_subscriber::EnvFilter;

/// Daily SMA crossover trader: evaluate once, act once, exit
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Override CROSSBOT_SYMBOL
    #[arg(long)]
    symbol: Option<String>,

    /// Evaluate and log the decision without touching orders
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let args = Args::parse();

    let mut strategy_config = StrategyConfig::from_env()?;
    if let Some(symbol) = args.symbol {
        strategy_config.symbol = symbol;
    }
    let alpaca_config = AlpacaConfig::from_env()?;

    tracing::info!("🚀 Crossbot starting");
    tracing::info!(
        "  {} fast={} slow={} lookback={} sessions ({})",
        strategy_config.symbol,
        strategy_config.fast_window,
        strategy_config.slow_window,
        strategy_config.lookback_days,
        strategy_config.timeframe
    );
    tracing::info!(
        "  Broker: {} ({})",
        alpaca_config.url,
        if alpaca_config.is_paper() { "paper" } else { "live" }
    );
    if args.dry_run {
        tracing::info!("  Dry run: no orders will be cancelled or placed");
    }

    let client = AlpacaClient::new(&alpaca_config)?;
    let trader = Trader::new(client, &strategy_config)?.with_dry_run(args.dry_run);

    match trader.run_once().await? {
        RunOutcome::MarketClosed => tracing::info!("Market closed, exiting"),
        RunOutcome::Evaluated { action, signal } => {
            tracing::info!("✅ {} as of {} ({})", action, signal.as_of, signal.state)
        }
    }

    Ok(())
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crossbot=info")),
        )
        .init();
}
