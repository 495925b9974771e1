use anyhow::Result;
use clap::{Parser, Subcommand};
use proxy_probe::{
    proxy::{BatchOutcome, CheckerConfig, EndpointParser, GeoResolver, ProbeOrchestrator, ResultSink},
    store::{CacheStore, SqliteStore},
    summary::load_summary,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Batch liveness prober for proxy endpoints
#[derive(Parser)]
#[command(name = "proxy-probe")]
#[command(about = "Probe proxy endpoints, attribute them geographically, track a rolling summary")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database file path
    #[arg(short, long, default_value = "proxy-probe.db")]
    database: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe a batch of endpoints from a file (one per line: host:port or
    /// a JSON spec with hint fields)
    Check {
        /// Input file containing endpoints
        input: PathBuf,
        /// Connect timeout per endpoint in milliseconds
        #[arg(long, default_value_t = 5000)]
        timeout: u64,
        /// Number of concurrent probes
        #[arg(short = 'n', long, default_value_t = 10)]
        concurrency: usize,
        /// Geolocation service base URL
        #[arg(long)]
        geo_url: Option<String>,
        /// Forward results to a remote collector instead of the local store
        #[arg(long)]
        collector_url: Option<String>,
    },
    /// Print the rolling summary
    Summary,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let store: Arc<dyn CacheStore> = Arc::new(SqliteStore::new(&cli.database).await?);

    match cli.command {
        Commands::Check {
            input,
            timeout,
            concurrency,
            geo_url,
            collector_url,
        } => {
            let content = std::fs::read_to_string(&input)?;
            let items = EndpointParser::parse_input(&content);
            println!("Loaded {} endpoints from {:?}", items.len(), input);

            let mut geo = GeoResolver::new(Arc::clone(&store));
            if let Some(url) = geo_url {
                geo = geo.with_api_url(url);
            }
            let config = CheckerConfig::new()
                .with_timeout(Duration::from_millis(timeout))
                .with_concurrency(concurrency);
            let orchestrator = ProbeOrchestrator::with_config(geo, config);

            let outcomes = orchestrator.check_batch(&items).await;

            let sink = match collector_url {
                Some(url) => ResultSink::remote(url),
                None => ResultSink::direct(Arc::clone(&store)),
            };
            sink.persist(&outcomes).await?;

            for outcome in &outcomes {
                match outcome {
                    BatchOutcome::Record(record) => {
                        let latency = record
                            .latency
                            .map_or(String::from("-"), |ms| format!("{}ms", ms));
                        println!(
                            "{} {} {} {} {}",
                            record.proxy,
                            record.status,
                            latency,
                            record.country.as_deref().unwrap_or("-"),
                            record.isp.as_deref().unwrap_or("-"),
                        );
                    }
                    BatchOutcome::Error { error } => eprintln!("error: {}", error),
                }
            }

            let alive = outcomes
                .iter()
                .filter_map(|o| o.as_record())
                .filter(|r| r.is_alive())
                .count();
            println!(
                "\nResults: {} alive, {} total",
                alive,
                outcomes.len()
            );
        }
        Commands::Summary => {
            let summary = load_summary(store.as_ref()).await?;
            println!(
                "total: {}  alive: {}  dead: {}",
                summary.total, summary.alive, summary.dead
            );
            let mut countries: Vec<_> = summary.countries.iter().collect();
            countries.sort_by(|a, b| a.0.cmp(b.0));
            for (country, tally) in countries {
                println!("  {}: {} alive, {} dead", country, tally.alive, tally.dead);
            }
        }
    }

    Ok(())
}
