//! chargeboard - EV charging KPI dashboard

mod cli;

use anyhow::{Context, Result};
use chargeboard_core::analytics::{kpi_summary, top_sites_by_total};
use chargeboard_core::{
    AnalyticalCache, ChargeboardConfig, Filter, QueryParams, RecordStore, RefreshScheduler,
    SqliteRecordStore,
};
use chargeboard_web::AppState;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "chargeboard",
    version,
    about = "EV charging KPI dashboard",
    long_about = "Loads charging sessions, alerts and faults from the KPI database into memory,\n\
                  refreshes them periodically and serves filtered KPIs over a JSON API.\n\
                  \n\
                  Examples:\n\
                    chargeboard                                  # Serve the API (default)\n\
                    chargeboard serve --port 9000                # Custom port\n\
                    chargeboard refresh                          # One refresh pass, print report\n\
                    chargeboard kpis --date-mode full_month --year 2024 --month 6\n\
                  \n\
                  Environment Variables:\n\
                    CHARGEBOARD_CONFIG                           # Config file path\n\
                    CHARGEBOARD_DATABASE                         # Override database path\n\
                    CHARGEBOARD_NO_COLOR                         # Disable ANSI colors\n\
                    RUST_LOG                                     # Log filter (default: info)"
)]
struct Cli {
    #[command(subcommand)]
    mode: Option<Mode>,

    /// Config file (default: <config dir>/chargeboard/config.toml)
    #[arg(long, env = "CHARGEBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database holding the KPI tables
    #[arg(long, env = "CHARGEBOARD_DATABASE")]
    database: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Disable ANSI colors (log-friendly)
    #[arg(long, env = "CHARGEBOARD_NO_COLOR")]
    no_color: bool,
}

#[derive(Subcommand)]
enum Mode {
    /// Serve the JSON API with periodic refresh (default)
    Serve {
        /// Port for web server
        #[arg(long, env = "CHARGEBOARD_PORT")]
        port: Option<u16>,
        /// Bind address
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run a single refresh pass and print its report
    Refresh {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print KPIs for a filter and exit
    Kpis {
        /// Sites to keep (comma-separated)
        #[arg(long, value_delimiter = ',')]
        sites: Vec<String>,
        /// focus_day, full_month, day_minus_1, week_minus_1 or all_time
        #[arg(long)]
        date_mode: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
        /// Focus day (YYYY-MM-DD)
        #[arg(long)]
        day: Option<NaiveDate>,
        /// Error types to keep (comma-separated)
        #[arg(long, value_delimiter = ',')]
        error_types: Vec<String>,
        /// Error moments to keep (comma-separated)
        #[arg(long, value_delimiter = ',')]
        moments: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_json);

    let mut config =
        ChargeboardConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(database) = cli.database {
        config.database = database;
    }

    let no_color = cli.no_color;

    match cli.mode.unwrap_or(Mode::Serve {
        port: None,
        bind: None,
    }) {
        Mode::Serve { port, bind } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(bind) = bind {
                config.bind = bind;
            }
            config.validate()?;
            run_serve(config).await?;
        }
        Mode::Refresh { json } => {
            run_refresh(config, json, no_color).await?;
        }
        Mode::Kpis {
            sites,
            date_mode,
            year,
            month,
            day,
            error_types,
            moments,
            json,
        } => {
            let params = QueryParams {
                sites,
                date_mode,
                focus_year: year,
                focus_month: month,
                focus_day: day,
                error_types,
                moments,
            };
            run_kpis(config, params, json, no_color).await?;
        }
    }

    Ok(())
}

/// Logs go to stderr so command output stays pipeable
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn open_cache(config: &ChargeboardConfig) -> Arc<AnalyticalCache> {
    let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(config.database.clone()));
    Arc::new(AnalyticalCache::new(store))
}

async fn run_serve(config: ChargeboardConfig) -> Result<()> {
    let cache = open_cache(&config);

    info!(
        database = %config.database.display(),
        interval_secs = config.refresh_interval_secs,
        "Starting refresh scheduler"
    );
    let scheduler = RefreshScheduler::start(Arc::clone(&cache), config.refresh_interval())?;

    let state = AppState {
        cache,
        refresh: scheduler.handle(),
        resolver: config.resolver(),
        top_sites: config.top_sites,
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested");
    };

    let result = chargeboard_web::run(state, &config.listen_addr(), shutdown).await;
    scheduler.shutdown().await;
    result
}

async fn run_refresh(config: ChargeboardConfig, json: bool, no_color: bool) -> Result<()> {
    let cache = open_cache(&config);
    let report = cache.refresh().await;

    println!("{}", cli::format_report(&report, json, no_color));

    if report.has_fatal_errors() {
        anyhow::bail!(
            "Could not reach record store at {}",
            config.database.display()
        );
    }
    Ok(())
}

async fn run_kpis(
    config: ChargeboardConfig,
    params: QueryParams,
    json: bool,
    no_color: bool,
) -> Result<()> {
    let cache = open_cache(&config);
    let report = cache.refresh().await;
    if report.has_fatal_errors() {
        anyhow::bail!(
            "Could not reach record store at {}",
            config.database.display()
        );
    }

    let filter = Filter::from_params(&params, &config.resolver(), Utc::now());
    let sessions = cache.sessions();
    let filtered = filter.apply(&sessions);

    let kpis = kpi_summary(&filtered);
    let top = top_sites_by_total(&filtered, config.top_sites);

    println!(
        "{}",
        cli::format_kpis(&kpis, &top, &filter.window, json, no_color)
    );
    Ok(())
}
