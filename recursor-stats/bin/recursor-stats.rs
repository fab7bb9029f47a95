//! Collect statistics from `PowerDNS` Recursor control sockets
//!
//! Metrics are written to stdout, one record per queried Recursor; logs and
//! per-target errors go to stderr.

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use recursor_stats::{
    Accumulator, Config, GatherSummary, JsonSink, LineProtocolSink, SAMPLE_CONFIG, ServerTarget,
    gather, logging,
};
use tracing::info;

/// Collect statistics from `PowerDNS` Recursor control sockets
#[derive(Parser, Debug)]
#[command(name = "recursor-stats")]
#[command(about = "Collect statistics from PowerDNS Recursor", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Query every configured Recursor once
    Gather {
        /// Output format
        #[arg(long, value_enum, default_value = "line")]
        format: Format,
    },
    /// Query every configured Recursor repeatedly until interrupted
    Watch {
        /// Seconds between two gathers
        #[arg(long, default_value = "10")]
        interval: u64,

        /// Output format
        #[arg(long, value_enum, default_value = "line")]
        format: Format,
    },
    /// Print an annotated configuration file
    SampleConfig,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// `InfluxDB` line protocol
    Line,
    /// One JSON object per line
    Json,
}

impl Format {
    fn sink(self) -> Box<dyn Accumulator> {
        match self {
            Self::Line => Box::new(LineProtocolSink::new(std::io::stdout())),
            Self::Json => Box::new(JsonSink::new(std::io::stdout())),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::SampleConfig) {
        print!("{SAMPLE_CONFIG}");
        return Ok(());
    }

    logging::init();

    let config = Config::load(cli.config.as_deref())?;
    let targets = config.targets();

    match cli.command {
        Commands::Gather { format } => {
            let summary = gather(&targets, format.sink().as_mut()).await;
            if summary.all_failed() {
                anyhow::bail!("Failed to gather statistics from any of {} targets", summary.failed);
            }
        }
        Commands::Watch { interval, format } => {
            watch(&targets, Duration::from_secs(interval.max(1)), format).await?;
        }
        Commands::SampleConfig => {}
    }

    Ok(())
}

/// Gather on every tick of `interval` until Ctrl-C
async fn watch(targets: &[ServerTarget], interval: Duration, format: Format) -> anyhow::Result<()> {
    let mut sink = format.sink();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(
        "Gathering from {} targets every {}s",
        targets.len(),
        interval.as_secs()
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let GatherSummary { succeeded, failed } = gather(targets, sink.as_mut()).await;
                info!("Gathered {succeeded} targets, {failed} failed");
            }
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Interrupted, shutting down");
                return Ok(());
            }
        }
    }
}
