//! CLI entry point for the Transit Insights tool.
//!
//! Provides subcommands for analyzing a transit-card CSV export and for
//! hosting the derived data products for the dashboard views.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use transit_insights::aggregate::{GroupingSpec, Metric};
use transit_insights::fetch::load_input;
use transit_insights::output::{print_json, print_pretty, write_summary_csv};
use transit_insights::schema::LocationAliases;
use transit_insights::session::{SessionConfig, SessionContext};

/// Groupings written out by `analyze --output-dir`, one CSV per spec.
const DEFAULT_SUMMARIES: &[&str] = &["agency", "location", "day_of_week", "hour_of_day", "month"];

#[derive(Parser)]
#[command(name = "transit_insights")]
#[command(about = "A tool to analyze transit-card usage exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a CSV export from a file or URL
    Analyze {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// Directory to write per-dimension summary CSVs to
        #[arg(short, long)]
        output_dir: Option<String>,

        /// Grouping spec for the logged top-N table, e.g. "agency,location"
        #[arg(short, long, default_value = "location")]
        group_by: String,

        /// Aggregate to rank the top-N table by
        #[arg(short, long, default_value = "count")]
        rank_by: String,

        /// Number of top groups to log
        #[arg(short = 'n', long, default_value_t = 10)]
        top: usize,

        /// JSON file mapping raw location labels to display names
        #[arg(long)]
        aliases: Option<String>,

        /// Allow trip pairs whose legs share one location
        #[arg(long, default_value_t = false)]
        allow_same_location_pairs: bool,
    },
    /// Host the session's data products as JSON on a local port
    Serve {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// Listen port
        #[arg(short, long, default_value_t = 8080)]
        port: u16,

        /// JSON file mapping raw location labels to display names
        #[arg(long)]
        aliases: Option<String>,

        /// Allow trip pairs whose legs share one location
        #[arg(long, default_value_t = false)]
        allow_same_location_pairs: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/transit_insights.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_insights.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            source,
            output_dir,
            group_by,
            rank_by,
            top,
            aliases,
            allow_same_location_pairs,
        } => {
            let config = session_config(aliases.as_deref(), allow_same_location_pairs)?;
            let bytes = load_input(&source).await?;
            let session = SessionContext::load(&bytes, &config)?;

            report(&session, &group_by, &rank_by, top)?;

            if let Some(dir) = output_dir {
                write_summaries(&session, &dir)?;
            }
        }
        Commands::Serve {
            source,
            port,
            aliases,
            allow_same_location_pairs,
        } => {
            let config = session_config(aliases.as_deref(), allow_same_location_pairs)?;
            let bytes = load_input(&source).await?;
            let session = SessionContext::load(&bytes, &config)?;

            transit_insights::server::serve(session, port).await?;
        }
    }

    Ok(())
}

fn session_config(aliases: Option<&str>, allow_same_location_pairs: bool) -> Result<SessionConfig> {
    let mut config = SessionConfig::default();
    if let Some(path) = aliases {
        config.aliases = LocationAliases::load(path)?;
    }
    config.pairing.require_distinct_locations = !allow_same_location_pairs;
    Ok(config)
}

/// Logs the session's headline numbers and the requested top-N table.
fn report(session: &SessionContext, group_by: &str, rank_by: &str, top: usize) -> Result<()> {
    let stats = session.stats();
    let diagnostics = session.diagnostics();

    info!(
        records = stats.total_records,
        stops = stats.unique_stops,
        agencies = stats.unique_agencies,
        spent = %stats.total_spent,
        reloaded = %stats.total_reloaded,
        days_travelled = stats.days_travelled,
        busiest_day = stats.busiest_weekday_name().unwrap_or("n/a"),
        "Usage summary"
    );

    if diagnostics.rows_excluded > 0 {
        warn!(
            excluded = diagnostics.rows_excluded,
            "Some rows could not be parsed"
        );
        for sample in &diagnostics.failure_samples {
            warn!(row = sample.row, reason = %sample.reason, "Excluded row");
        }
    }

    let spec = GroupingSpec::parse(group_by)?;
    let metric: Metric = rank_by.parse()?;
    let rows = session.top(&spec, metric, top);
    print_json(&rows)?;

    print_pretty(stats);
    Ok(())
}

/// Writes one summary CSV per default grouping into `dir`.
fn write_summaries(session: &SessionContext, dir: &str) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    for spec_str in DEFAULT_SUMMARIES {
        let spec = GroupingSpec::parse(spec_str)?;
        let table = session.summary(&spec);
        let path = format!("{}/by_{}.csv", dir, spec_str);
        write_summary_csv(&path, &table)?;
        info!(path, groups = table.rows.len(), "Summary written");
    }

    Ok(())
}
