mod board;
mod client;
mod config;
mod notify;
mod types;
mod ui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use board::Board;
use client::ApiClient;
use config::Settings;
use notify::{NotificationGate, NotifiedStore};

#[derive(Parser)]
#[command(name = "trendwatch")]
#[command(version = "0.1.0")]
#[command(about = "Terminal dashboard client for a trading-pairs analytics backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "trendwatch.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the live dashboard
    Watch,
    /// Fetch current prices once and print them
    Prices,
    /// Fetch indicator bundles once and print them
    Indicators,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };

    match cli.command {
        Commands::Watch => {
            // The log path comes from the settings, so load them first; the
            // dashboard owns the terminal, so log lines go to a file.
            let settings = Settings::load(&cli.config)?;
            init_file_logging(&settings.log_path, level)?;
            info!("trendwatch v0.1.0 watching {}", settings.base_url);
            run_watch(settings).await
        }
        Commands::Prices => {
            init_stderr_logging(level)?;
            let settings = Settings::load(&cli.config)?;
            show_prices(&settings).await
        }
        Commands::Indicators => {
            init_stderr_logging(level)?;
            let settings = Settings::load(&cli.config)?;
            show_indicators(&settings).await
        }
    }
}

fn init_stderr_logging(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn init_file_logging(path: &Path, level: Level) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run_watch(settings: Settings) -> Result<()> {
    let mut api = ApiClient::new(&settings.base_url)?;
    if let Err(e) = api.fetch_csrf_token().await {
        warn!("Could not fetch CSRF token, notification dispatches may be rejected: {e:#}");
    }
    let api = Arc::new(api);

    let store = NotifiedStore::open(&settings.state_path)?;
    info!("Notified-pairs set loaded with {} entries", store.len());
    let mut gate = NotificationGate::new(store, settings.chat_id.clone());

    let mut board = Board::new(&settings.pairs);
    board.restyle();
    let board = Arc::new(RwLock::new(board));

    let flash = Duration::from_millis(settings.flash_millis);

    // Each poller awaits its fetch inside its own interval loop: a slow
    // response delays that poller's next tick instead of overlapping it.
    let price_api = Arc::clone(&api);
    let price_board = Arc::clone(&board);
    let price_every = Duration::from_secs(settings.price_poll_secs);
    let price_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(price_every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            price_tick(&price_api, &price_board, &mut gate, flash).await;
        }
    });

    let indicator_api = Arc::clone(&api);
    let indicator_board = Arc::clone(&board);
    let indicator_every = Duration::from_secs(settings.indicator_poll_secs);
    let indicator_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(indicator_every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            indicator_tick(&indicator_api, &indicator_board).await;
        }
    });

    let result = ui::run(Arc::clone(&board)).await;

    price_task.abort();
    indicator_task.abort();
    info!("Dashboard closed");
    result
}

/// One price poll: refresh displayed prices, then evaluate the notification
/// condition. A fetch or parse failure logs and leaves this tick a no-op.
async fn price_tick(
    api: &ApiClient,
    board: &RwLock<Board>,
    gate: &mut NotificationGate,
    flash: Duration,
) {
    let prices = match api.get_prices().await {
        Ok(prices) => prices,
        Err(e) => {
            error!("Price refresh failed: {e:#}");
            return;
        }
    };
    let batch = {
        let mut board = board.write().await;
        board.apply_prices(&prices, Instant::now(), flash);
        gate.collect(&board)
    };
    gate.dispatch(api, &batch).await;
}

/// One indicator poll: overwrite every indicator cell and re-render.
async fn indicator_tick(api: &ApiClient, board: &RwLock<Board>) {
    match api.get_indicators().await {
        Ok(data) => board.write().await.apply_indicators(&data),
        Err(e) => error!("Indicator refresh failed: {e:#}"),
    }
}

async fn show_prices(settings: &Settings) -> Result<()> {
    let api = ApiClient::new(&settings.base_url)?;
    let prices = api.get_prices().await?;
    let mut entries: Vec<_> = prices.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    println!("{:<12} {:>16}", "Pair", "Price");
    for (pair, price) in entries {
        println!("{pair:<12} {:>16}", price.to_string());
    }
    Ok(())
}

async fn show_indicators(settings: &Settings) -> Result<()> {
    let api = ApiClient::new(&settings.base_url)?;
    let indicators = api.get_indicators().await?;
    let mut entries: Vec<_> = indicators.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    for (pair, b) in entries {
        println!("{pair}");
        println!(
            "  SMA: {} | Stoch: {} | ADX: {} ({}) | RSI: {} ({})",
            b.sma_signal, b.stoch_signal, b.adx, b.adx_signal, b.rsi, b.rsi_signal
        );
        println!(
            "  Ichimoku: {} | ATR: {} ({}) | VWAP: {} ({})",
            b.ichimoku_signal, b.atr, b.atr_signal, b.vwap, b.vwap_signal
        );
        println!(
            "  Fibo: {} | Reversal: {} | Uptrend: {} | Downtrend: {}",
            b.near_fibo, b.reversal, b.uptrend, b.downtrend
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotifiedStore;
    use crate::types::DisplayValue;
    use std::collections::HashMap;

    // Port 1 is never bound, so every request fails to connect.
    fn unreachable_client() -> ApiClient {
        ApiClient::new("http://127.0.0.1:1").unwrap()
    }

    fn gate() -> NotificationGate {
        NotificationGate::new(NotifiedStore::temporary().unwrap(), "1001423950701".into())
    }

    #[tokio::test]
    async fn failed_price_fetch_leaves_board_unchanged() {
        let pairs = vec!["BTCUSDT".to_string()];
        let mut board = Board::new(&pairs);
        let prices: HashMap<String, DisplayValue> =
            [("BTCUSDT".to_string(), DisplayValue::Number(100.0))].into();
        board.apply_prices(&prices, Instant::now(), Duration::from_millis(1000));
        let before = board.clone();

        let board = RwLock::new(board);
        let mut gate = gate();
        price_tick(
            &unreachable_client(),
            &board,
            &mut gate,
            Duration::from_millis(1000),
        )
        .await;

        // The tick is a no-op: no price text, flash, or trend class moved.
        assert_eq!(*board.read().await, before);
    }

    #[tokio::test]
    async fn failed_indicator_fetch_leaves_board_unchanged() {
        let board = RwLock::new(Board::new(&["BTCUSDT".to_string()]));
        let before = board.read().await.clone();

        indicator_tick(&unreachable_client(), &board).await;

        assert_eq!(*board.read().await, before);
    }
}
