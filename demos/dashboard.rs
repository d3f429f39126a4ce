use std::{env, fs, time::Instant};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;
use tracing_subscriber::EnvFilter;
use warroom::prelude::*;

/// Renders the dashboard once and prints it as text.
///
/// Usage:
///   cargo run --example dashboard -- <workbook.xlsx>   # local file
///   WARROOM_SHEET_ID=... cargo run --example dashboard  # live fetch
#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let workbook = load_workbook().await?;

    let config = DashboardConfig::default();
    let dashboard = Dashboard::new(&workbook, &config);

    let render_start = Instant::now();
    let today = Local::now().date_naive();
    let snapshot = dashboard.snapshot(today)?;
    let render_time = render_start.elapsed();

    print_snapshot(&snapshot);
    info!(?render_time, "Render pass complete");

    Ok(())
}

async fn load_workbook() -> Result<Workbook> {
    if let Some(path) = env::args().nth(1) {
        let bytes = fs::read(&path).with_context(|| format!("Failed to read {path}"))?;
        return Ok(Workbook::open(bytes)?);
    }

    let sheet_id = SheetId::from_env()
        .context("Pass an xlsx path or set WARROOM_SHEET_ID to fetch the live workbook")?;
    let fetcher = WorkbookFetcher::new(sheet_id);
    Ok(fetcher.fetch().await?)
}

fn print_snapshot(snapshot: &DashboardSnapshot) {
    println!("=== 交易績效戰情室 {} ===", snapshot.generated_on);

    if let Some(equity) = &snapshot.equity {
        println!(
            "\nTotal equity: ${:.0} ({} points on the curve)",
            equity.latest,
            equity.curve.len()
        );
    }

    for year in &snapshot.years {
        println!("\n--- {} ---", year.year);
        println!(
            "net ${:.0} | high ${:.0} | low ${:.0} | max drawdown ${:.0}",
            year.kpis.net_pnl, year.kpis.peak_pnl, year.kpis.trough_pnl, year.kpis.max_drawdown
        );

        print!("monthly: ");
        for month in 1..=12 {
            match year.monthly.get(month) {
                Some(total) => print!("{month}月 ${total:.0}  "),
                None => print!("{month}月 ---  "),
            }
        }
        println!();

        for cal in &year.calendar {
            println!(
                "  {}-{:02}: {} trading days, net ${:.0}, day win rate {:.1}%, best ${:.0}, worst ${:.0}",
                cal.year,
                cal.month,
                cal.stats.trading_days,
                cal.stats.net_pnl,
                cal.stats.day_win_rate * 100.0,
                cal.stats.best_day,
                cal.stats.worst_day
            );
        }
    }

    if let Some(expectancy) = &snapshot.expectancy {
        let k = &expectancy.kpis;
        println!("\n--- 期望值實驗室 ---");
        println!(
            "trades {} (w {} / l {}) | win rate {:.1}% | payoff {:.2} | profit factor {:.2}",
            k.total_trades,
            k.winning_trades,
            k.losing_trades,
            k.win_rate * 100.0,
            k.payoff_ratio,
            k.profit_factor
        );
        println!(
            "expectancy {:.3} | kelly {:.1}% | curve R^2 {:.3} | streaks +{} / -{}",
            k.expectancy,
            k.kelly_fraction * 100.0,
            k.r_squared,
            k.max_consecutive_wins,
            k.max_consecutive_losses
        );

        println!("by strategy:");
        for row in &expectancy.by_strategy {
            println!(
                "  {:<12} {:>3} trades | net ${:.0} | avg R {:.2}",
                row.key, row.trade_count, row.net_pnl, row.avg_r_multiple
            );
        }
    }
}
