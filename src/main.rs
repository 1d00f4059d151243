use analytics::{candle_series, correlation_matrix, label_positions};
use anyhow::{Context, bail};
use api_client::{ConstituentSource, PriceHistorySource, WikipediaClient, YahooClient};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use collector::{ClosingPrices, SymbolOutcome, collect_closing_prices};
use comfy_table::Table;
use configuration::settings::Config;
use configuration::{LabelAnchor, LoggingSettings};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use universe::{Universe, select_universe};

/// The main entry point for the Meridian data tool.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from a .env file, if there is one.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => configuration::load_config_from(path),
        None => configuration::load_config(),
    }
    .context("Failed to load configuration")?;

    // Keep the guard alive so the file writer flushes on exit.
    let _log_guard = init_tracing(&config.logging)?;
    tracing::debug!(?config, "Configuration loaded.");

    // Execute the appropriate command
    match cli.command {
        Commands::Universe(args) => handle_universe(args, &config).await,
        Commands::Closes => handle_closes(&config).await,
        Commands::Correlation(args) => handle_correlation(args, &config),
        Commands::Candles(args) => handle_candles(args, &config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Historical closing prices for long-standing S&P 500 constituents.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file to use instead of `config.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the constituent table and show the selected symbols.
    Universe(UniverseArgs),
    /// Download closing prices and write the symbol, sector and combined tables.
    Closes,
    /// Compute the correlation matrix of a previously written table.
    Correlation(CorrelationArgs),
    /// Download OHLCV bars for one symbol and add moving averages.
    Candles(CandlesArgs),
}

#[derive(Parser)]
struct UniverseArgs {
    /// Also write the selection to this CSV file.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Parser)]
struct CorrelationArgs {
    /// The table to read (defaults to `closes_by_sector.csv` in the output directory).
    #[arg(long)]
    input: Option<PathBuf>,

    /// Where sector labels sit along the matrix axis.
    #[arg(long, value_enum)]
    anchor: Option<LabelAnchor>,
}

#[derive(Parser)]
struct CandlesArgs {
    /// The ticker to download (e.g., "AAPL").
    #[arg(long)]
    symbol: String,

    /// The start date (format: YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// The exclusive end date (format: YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_universe(args: UniverseArgs, config: &Config) -> anyhow::Result<()> {
    let universe = load_universe(config).await?;

    let mut table = Table::new();
    table.set_header(vec!["Symbol", "Security", "Code", "Sector", "Date added"]);
    for assignment in &universe.assignments {
        let constituent = universe.constituent(&assignment.symbol);
        table.add_row(vec![
            assignment.symbol.clone(),
            constituent.map(|c| c.security.clone()).unwrap_or_default(),
            assignment.sector.code().to_string(),
            assignment.sector.name().to_string(),
            constituent
                .and_then(|c| c.date_added_raw.clone())
                .unwrap_or_else(|| "unknown".to_string()),
        ]);
    }
    println!("{table}");
    println!("{} symbols selected.", universe.len());
    if !universe.unclassified.is_empty() {
        println!("Unknown sector for: {}", universe.unclassified.join(", "));
    }

    if let Some(path) = args.output {
        export::write_universe(&path, &universe)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Selection written to {}", path.display());
    }

    Ok(())
}

/// Handles the orchestration of the closing-price download.
async fn handle_closes(config: &Config) -> anyhow::Result<()> {
    let universe = load_universe(config).await?;
    let source = YahooClient::new(&config.http).context("Failed to build the price client")?;

    println!(
        "Downloading {} symbols from {} to {}",
        universe.len(),
        config.history.start,
        config.history.end
    );

    // Set up the progress bar
    let progress_bar = ProgressBar::new(universe.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );

    let prices = collect_closing_prices(&source, &universe, &config.history, |outcome| {
        progress_bar.inc(1);
        progress_bar.set_message(match outcome {
            SymbolOutcome::Included { symbol, .. } => format!("{} ok", symbol),
            SymbolOutcome::LateListed { symbol, .. } => format!("{} not in past", symbol),
            SymbolOutcome::Unavailable { symbol, .. } => format!("{} unavailable", symbol),
        });
    })
    .await?;

    progress_bar.finish_with_message("Download complete!");

    write_closes(config, &universe, &prices)?;

    println!(
        "{} symbols over {} sessions, {} not in past, {} unavailable.",
        prices.by_symbol.width(),
        prices.by_symbol.height(),
        prices.late_listed.len(),
        prices.unavailable.len()
    );
    if !prices.unavailable.is_empty() {
        let symbols: Vec<&str> = prices.unavailable.iter().map(|s| s.symbol.as_str()).collect();
        println!("Not collected: {}", symbols.join(", "));
    }

    Ok(())
}

fn write_closes(config: &Config, universe: &Universe, prices: &ClosingPrices) -> anyhow::Result<()> {
    let dir = &config.output.directory;
    let tables = [
        ("closes_by_symbol.csv", &prices.by_symbol),
        ("closes_by_sector.csv", &prices.by_sector),
        ("closes_by_symbol_sector.csv", &prices.by_symbol_sector),
    ];
    for (name, table) in tables {
        let path = dir.join(name);
        export::write_wide_table(&path, table)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    export::write_skipped(&dir.join("skipped.csv"), prices).context("Failed to write skipped.csv")?;
    export::write_universe(&dir.join("universe.csv"), universe).context("Failed to write universe.csv")?;

    tracing::info!(directory = %dir.display(), "Tables written.");
    Ok(())
}

fn handle_correlation(args: CorrelationArgs, config: &Config) -> anyhow::Result<()> {
    let input = args
        .input
        .unwrap_or_else(|| config.output.directory.join("closes_by_sector.csv"));
    let anchor = args.anchor.unwrap_or(config.correlation.anchor);

    let table = export::read_wide_table(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    if table.is_empty() {
        bail!("{} has no price columns", input.display());
    }

    let matrix = correlation_matrix(&table);
    let output = config.output.directory.join("correlation.csv");
    export::write_correlation(&output, &matrix)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let mut positions = Table::new();
    positions.set_header(vec!["Label", "Position"]);
    for position in label_positions(&matrix.labels, anchor) {
        positions.add_row(vec![position.label, position.position.to_string()]);
    }
    println!("{positions}");
    println!(
        "{}x{} correlation matrix written to {}",
        matrix.len(),
        matrix.len(),
        output.display()
    );

    Ok(())
}

async fn handle_candles(args: CandlesArgs, config: &Config) -> anyhow::Result<()> {
    let start = args.from.unwrap_or(config.candles.start);
    let end = args.to.unwrap_or(config.candles.end);
    if start >= end {
        bail!("--from ({}) must be before --to ({})", start, end);
    }

    let source = YahooClient::new(&config.http).context("Failed to build the price client")?;
    let bars = source
        .fetch_daily_bars(&args.symbol, start, end)
        .await
        .with_context(|| format!("Failed to download {}", args.symbol))?;
    if bars.is_empty() {
        bail!("No bars for {} between {} and {}", args.symbol, start, end);
    }

    let series = candle_series(&args.symbol, bars, &config.candles.moving_averages)?;
    let path = config
        .output
        .directory
        .join(format!("candles_{}.csv", args.symbol));
    export::write_candles(&path, &series)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("{} bars for {} written to {}", series.bars.len(), args.symbol, path.display());
    Ok(())
}

/// Fetches the reference table and applies the selection rules.
async fn load_universe(config: &Config) -> anyhow::Result<Universe> {
    let client = WikipediaClient::new(&config.universe, &config.http)
        .context("Failed to build the constituent client")?;
    let table = client
        .fetch_reference_table()
        .await
        .context("Failed to fetch the constituent table")?;
    let universe = select_universe(table, &config.universe)?;
    if universe.is_empty() {
        tracing::warn!("No constituents matched the selection rules.");
    }
    Ok(universe)
}

// ==============================================================================
// Logging
// ==============================================================================

/// Installs the global subscriber: stderr always, plus a daily rolling file
/// when a log directory is configured.
fn init_tracing(settings: &LoggingSettings) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .context("Invalid log level")?;

    let (file_layer, guard) = match &settings.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "meridian.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();

    Ok(guard)
}
