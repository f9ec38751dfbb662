use anyhow::{Context, Result};
use chartkit_core::candle::Candle;
use chartkit_core::pipeline::{self, ChartConfig};
use chartkit_core::resample::resample;
use chartkit_core::session::Session;
use chartkit_core::signal::{SignalConfig, SignalKind};
use chartkit_providers::dashboard::DashboardProvider;
use chartkit_providers::provider::Interval;
use chrono::NaiveDate;
use chrono_tz::Asia::Tokyo;
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "chartkit",
    about = "Inspect intraday chart series: resampling, oscillator signals, previews"
)]
struct Cli {
    /// Price API base URL (falls back to CHARTKIT_API_BASE)
    #[arg(long)]
    api_base: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a day's oscillator for entry/exit signals
    Signals {
        /// Ticker to analyze
        #[arg(short, long)]
        ticker: String,

        /// Trading date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Oscillator smoothing period
        #[arg(long, default_value_t = 9)]
        period: usize,

        /// Latest venue-local hour at which entries may fire
        #[arg(long, default_value_t = 14)]
        max_entry_hour: u32,
    },

    /// Print a compact shape-preserving preview of closing prices
    Preview {
        /// Ticker to preview
        #[arg(short, long)]
        ticker: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Downsample target
        #[arg(long, default_value_t = 240)]
        points: usize,
    },

    /// Resample a day's candles to a coarser bucket width
    Resample {
        /// Ticker to resample
        #[arg(short, long)]
        ticker: String,

        /// Trading date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Bucket width in minutes
        #[arg(long, default_value_t = 5)]
        minutes: u32,
    },
}

fn create_provider(api_base: Option<&str>) -> Result<DashboardProvider> {
    match api_base {
        Some(base) => Ok(DashboardProvider::new(base)),
        None => DashboardProvider::from_env()
            .context("no --api-base given and CHARTKIT_API_BASE not set"),
    }
}

async fn fetch_day(
    provider: &DashboardProvider,
    ticker: &str,
    date: NaiveDate,
) -> Result<(Vec<Candle>, Interval)> {
    let (candles, served) = provider
        .fetch_intraday(ticker, date, date)
        .await
        .with_context(|| format!("failed to fetch {ticker} for {date}"))?;
    info!(
        "{ticker}: {} candle(s) at {} granularity",
        candles.len(),
        served.label()
    );
    Ok((candles, served))
}

async fn cmd_signals(
    provider: &DashboardProvider,
    ticker: &str,
    date: NaiveDate,
    period: usize,
    max_entry_hour: u32,
) -> Result<()> {
    let (candles, _) = fetch_day(provider, ticker, date).await?;

    let config = ChartConfig {
        period,
        signals: SignalConfig {
            max_entry_hour,
            ..SignalConfig::default()
        },
        ..ChartConfig::default()
    };
    let derived = pipeline::derive(&candles, &config);
    info!(
        "{ticker}: {} resampled candle(s), {} signal(s)",
        derived.candles.len(),
        derived.signals.len()
    );

    if derived.signals.is_empty() {
        println!("{ticker} {date}: no signals");
        return Ok(());
    }

    for event in &derived.signals {
        let local = event.timestamp.with_timezone(&Tokyo);
        let kind = match event.kind {
            SignalKind::Entry => "entry",
            SignalKind::Exit => "exit ",
        };
        let session = match Session::classify(&event.timestamp) {
            Some(Session::Morning) => "morning",
            Some(Session::Afternoon) => "afternoon",
            Some(Session::PreOpen) => "pre-open",
            Some(Session::Break) => "break",
            None => "off-hours",
        };
        println!(
            "{} {kind} @ {} osc={:.1} ({session})",
            local.format("%H:%M"),
            event.price,
            event.oscillator
        );
    }

    Ok(())
}

async fn cmd_preview(
    provider: &DashboardProvider,
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
    points: usize,
) -> Result<()> {
    let (candles, _) = provider
        .fetch_intraday(ticker, start, end)
        .await
        .with_context(|| format!("failed to fetch {ticker} from {start} to {end}"))?;

    let config = ChartConfig {
        preview_points: points,
        ..ChartConfig::default()
    };
    let shaped = pipeline::preview_series(&candles, &config);
    info!("{ticker}: {} preview point(s)", shaped.len());

    for point in &shaped {
        println!("{} {:.2}", point.timestamp.format("%Y-%m-%d %H:%M"), point.value);
    }

    Ok(())
}

async fn cmd_resample(
    provider: &DashboardProvider,
    ticker: &str,
    date: NaiveDate,
    minutes: u32,
) -> Result<()> {
    let (candles, _) = fetch_day(provider, ticker, date).await?;
    let resampled = resample(&candles, minutes);
    info!("{ticker}: {} bucket(s) of {minutes}m", resampled.len());

    for candle in &resampled {
        let local = candle.timestamp.with_timezone(&Tokyo);
        println!(
            "{} o={} h={} l={} c={} v={}",
            local.format("%H:%M"),
            candle.open,
            candle.high,
            candle.low,
            candle.close,
            candle
                .volume
                .map_or_else(|| "-".to_string(), |v| v.to_string())
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    let provider = create_provider(cli.api_base.as_deref())?;

    match &cli.command {
        Commands::Signals {
            ticker,
            date,
            period,
            max_entry_hour,
        } => {
            cmd_signals(&provider, ticker, *date, *period, *max_entry_hour).await?;
        }
        Commands::Preview {
            ticker,
            start,
            end,
            points,
        } => {
            cmd_preview(&provider, ticker, *start, *end, *points).await?;
        }
        Commands::Resample {
            ticker,
            date,
            minutes,
        } => {
            cmd_resample(&provider, ticker, *date, *minutes).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_signals_args() {
        let cli = Cli::try_parse_from([
            "chartkit",
            "--api-base",
            "http://localhost:8000",
            "signals",
            "-t",
            "7203",
            "--date",
            "2025-01-15",
        ])
        .unwrap();

        assert_eq!(cli.api_base.as_deref(), Some("http://localhost:8000"));
        match cli.command {
            Commands::Signals {
                ticker,
                date,
                period,
                max_entry_hour,
            } => {
                assert_eq!(ticker, "7203");
                assert_eq!(date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
                assert_eq!(period, 9);
                assert_eq!(max_entry_hour, 14);
            }
            _ => panic!("expected Signals command"),
        }
    }

    #[test]
    fn parse_signals_overrides() {
        let cli = Cli::try_parse_from([
            "chartkit",
            "signals",
            "-t",
            "7203",
            "--date",
            "2025-01-15",
            "--period",
            "14",
            "--max-entry-hour",
            "11",
        ])
        .unwrap();

        match cli.command {
            Commands::Signals {
                period,
                max_entry_hour,
                ..
            } => {
                assert_eq!(period, 14);
                assert_eq!(max_entry_hour, 11);
            }
            _ => panic!("expected Signals command"),
        }
    }

    #[test]
    fn parse_preview_args() {
        let cli = Cli::try_parse_from([
            "chartkit",
            "preview",
            "-t",
            "9984",
            "--start",
            "2025-01-06",
            "--end",
            "2025-01-15",
        ])
        .unwrap();

        match cli.command {
            Commands::Preview {
                ticker,
                start,
                end,
                points,
            } => {
                assert_eq!(ticker, "9984");
                assert_eq!(start, NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
                assert_eq!(end, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
                assert_eq!(points, 240);
            }
            _ => panic!("expected Preview command"),
        }
    }

    #[test]
    fn parse_resample_defaults() {
        let cli = Cli::try_parse_from([
            "chartkit",
            "resample",
            "-t",
            "7203",
            "--date",
            "2025-01-15",
        ])
        .unwrap();

        match cli.command {
            Commands::Resample { minutes, .. } => {
                assert_eq!(minutes, 5);
            }
            _ => panic!("expected Resample command"),
        }
    }

    #[test]
    fn missing_ticker_is_rejected() {
        assert!(Cli::try_parse_from(["chartkit", "signals", "--date", "2025-01-15"]).is_err());
    }
}
