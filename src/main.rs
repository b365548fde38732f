//! pulsedash - PhonePe Pulse analytics dashboard
//!
//! A CLI tool that aggregates digital-payment transaction, user and
//! insurance data into the dashboard views and writes them as a report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, data source, contract violation, etc.)

mod cli;
mod config;
mod engine;
mod error;
mod models;
mod report;
mod source;
mod views;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use engine::Engine;
use report::{Report, ReportMetadata};
use source::{CachedSource, DataSource, MemorySource, SqliteSource};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;
use views::{View, ViewKind, ViewParams};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so the file can ask for verbose output
    let (mut config, config_origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("pulsedash v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", config_origin);
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_report(args, config) {
        error!("Report failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .pulsedash.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the data source, ranking sizes, and more.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete report workflow.
fn run_report(args: Args, config: Config) -> Result<()> {
    let start_time = Instant::now();

    // Step 1: Open the data source
    let data_path = config.data.path.clone().map(PathBuf::from).with_context(|| {
        format!(
            "No data source given. Pass --data, set PULSEDASH_DATA, or set [data] path in {}",
            CONFIG_FILE
        )
    })?;

    println!("📥 Opening data source: {}", data_path.display());
    let source = open_source(&data_path)?;
    let data_source = source.describe();
    info!("Data source: {}", data_source);

    // Step 2: Build the views
    let kinds = args.selected_views();
    let params = ViewParams {
        year: args.year,
        state: args.state.clone(),
        top_n: config.views.top_n,
        state_top_n: config.views.state_top_n,
        quadrant_threshold: config.views.quadrant_threshold,
    };
    debug!("View parameters: {:?}", params);

    println!("\n🔬 Building {} view(s)...", kinds.len());
    let built = if config.cache.enabled {
        let engine = Engine::new(CachedSource::new(source));
        let built = build_views(&engine, &kinds, &params)?;
        let stats = engine.source().stats();
        info!("Query cache: {} hits, {} misses", stats.hits, stats.misses);
        built
    } else {
        debug!("Query cache disabled");
        build_views(&Engine::new(source), &kinds, &params)?
    };

    // Step 3: Build the report
    println!("\n📝 Generating report...");

    let duration = start_time.elapsed().as_secs_f64();
    let report = Report {
        metadata: ReportMetadata {
            data_source,
            generated_at: Utc::now(),
            year: params.year,
            state: params.state.clone(),
            top_n: params.top_n,
            duration_seconds: duration,
        },
        views: built,
    };

    let output = match config.general.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    let output_path = PathBuf::from(&config.general.output);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    let panels: usize = report.views.iter().map(|v| v.panels.len()).sum();
    let empty: usize = report
        .views
        .iter()
        .map(|v| v.panels.iter().filter(|p| p.is_empty()).count())
        .sum();

    println!("\n📊 Report Summary:");
    println!("   Views: {}", report.views.len());
    println!("   Panels: {} ({} with no data)", panels, empty);
    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Report complete! Saved to: {}", output_path.display());

    Ok(())
}

/// Open the data source: `.json` files are snapshots, anything else SQLite.
fn open_source(path: &Path) -> Result<Box<dyn DataSource>> {
    let is_snapshot = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_snapshot {
        Ok(Box::new(MemorySource::from_json_file(path)?))
    } else {
        Ok(Box::new(SqliteSource::open(path)?))
    }
}

/// Build each requested view in order.
fn build_views<S: DataSource>(
    engine: &Engine<S>,
    kinds: &[ViewKind],
    params: &ViewParams,
) -> Result<Vec<View>> {
    let mut built = Vec::with_capacity(kinds.len());

    for &kind in kinds {
        println!("   📈 {}", kind.title());
        let view = views::build_view(engine, kind, params)
            .with_context(|| format!("Failed to build view: {}", kind))?;
        debug!("{}: {} panels", kind, view.panels.len());
        built.push(view);
    }

    Ok(built)
}

/// Load configuration from file or use defaults, along with where it came
/// from. Runs before logging is set up, so problems go to stderr.
fn load_config(args: &Args) -> Result<(Config, String)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, config_path.display().to_string()));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, CONFIG_FILE.to_string())),
        Ok(None) => Ok((Config::default(), "defaults".to_string())),
        Err(e) => {
            eprintln!("⚠️  Failed to load config, using defaults: {:#}", e);
            Ok((Config::default(), "defaults".to_string()))
        }
    }
}
