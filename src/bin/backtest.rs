use anyhow::Result;
use clap::Parser;
use crossbot::backtest::{BacktestReport, BacktestRunner, MarketScenario, SyntheticBarGenerator};
use crossbot::strategy::CrossoverSettings;
use rust_decimal::Decimal;

/// Run the crossover against synthetic daily bars for every market scenario
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    #[arg(long, default_value_t = 7)]
    fast: usize,

    #[arg(long, default_value_t = 14)]
    slow: usize,

    /// Trading days per scenario
    #[arg(long, default_value_t = 250)]
    days: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, default_value = "10000")]
    cash: Decimal,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("crossbot=info")
        .init();

    let args = Args::parse();

    println!("\n╔═══════════════════════════════════════════════════════╗");
    println!("║          CROSSBOT BACKTESTING SUITE                   ║");
    println!("╚═══════════════════════════════════════════════════════╝");

    let settings = CrossoverSettings::new(args.fast, args.slow)?;
    let runner = BacktestRunner::new(settings, args.cash)?;

    let mut results = Vec::new();
    for scenario in MarketScenario::ALL {
        let bars = SyntheticBarGenerator::new(args.seed).generate(scenario, args.days)?;

        match runner.run("SYNTH", &bars) {
            Ok(report) => {
                println!("\n{}\n  {}", scenario.name(), report.summary());
                results.push((scenario, report));
            }
            Err(e) => eprintln!("❌ Backtest failed for {}: {}", scenario.name(), e),
        }
    }

    print_summary_comparison(&results);
    Ok(())
}

fn print_summary_comparison(results: &[(MarketScenario, BacktestReport)]) {
    println!("\n╔═══════════════════════════════════════════════════════╗");
    println!("║              SCENARIO COMPARISON                      ║");
    println!("╚═══════════════════════════════════════════════════════╝\n");

    println!(
        "{:<12} {:>12} {:>10} {:>8} {:>8} {:>8}",
        "Scenario", "Equity", "Return%", "Trades", "Win%", "MaxDD%"
    );
    println!("{}", "─".repeat(64));

    for (scenario, report) in results {
        println!(
            "{:<12} {:>12.2} {:>10.2} {:>8} {:>8.1} {:>8.2}",
            scenario.name(),
            report.final_equity,
            report.total_return_pct,
            report.trades.len(),
            report.win_rate(),
            report.max_drawdown_pct()
        );
    }

    println!();
}
