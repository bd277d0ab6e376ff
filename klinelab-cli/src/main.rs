//! KlineLab CLI — fetch, enrich, preview and export kline datasets.
//!
//! Commands:
//! - `fetch` — download candles for one or more symbols, optionally add
//!   indicator columns, print a preview and export the result
//! - `indicators` — list the indicator catalog by category
//! - `config show` — print the effective configuration (secret redacted)
//! - `config init` — write a starter `klinelab.toml`

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use klinelab_core::config::{AppConfig, DEFAULT_CONFIG_FILE};
use klinelab_core::data::{BybitClient, PaginatedFetcher};
use klinelab_core::domain::{
    format_date, parse_timestamp, Category, ChannelProgress, Dataset, FetchRequest, LogProgress,
    ProgressSink, DEFAULT_LIMIT,
};
use klinelab_core::export::{self, format_datetime, ExportFormat};
use klinelab_core::indicators::{IndicatorCategory, IndicatorEngine, IndicatorRegistry, PruneMode};
use klinelab_core::interval::Interval;
use klinelab_core::session::{FetchStatus, Session};

#[derive(Parser)]
#[command(
    name = "klinelab",
    about = "KlineLab CLI — Bybit kline downloader with technical indicators"
)]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch candles, optionally enrich them with indicators, and export.
    Fetch {
        /// Symbols to fetch (e.g., BTCUSDT ETHUSDT).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Market category: linear, inverse or spot.
        #[arg(long, default_value = "linear")]
        category: String,

        /// Interval: 1,3,5,15,30,60,120,240,360,720 (or 15m etc.), D, W, M.
        #[arg(long, default_value = "D")]
        interval: String,

        /// Page size, 100-1000.
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: u32,

        /// Start: epoch ms, RFC 3339 or YYYY-MM-DD. Defaults to 30 days ago.
        #[arg(long)]
        start: Option<String>,

        /// End: epoch ms, RFC 3339 or YYYY-MM-DD. Defaults to now.
        #[arg(long)]
        end: Option<String>,

        /// Comma-separated indicators, optionally with a period (e.g., SMA:50,RSI,MACD).
        #[arg(long, value_delimiter = ',')]
        indicators: Vec<String>,

        /// Prune warm-up rows after each indicator or once at the end.
        #[arg(long, default_value = "progressive")]
        prune: String,

        /// Output file (single symbol) or directory.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Export format: csv, json or parquet. Defaults to the output extension, else csv.
        #[arg(long)]
        format: Option<String>,

        /// Rows shown from each end of the dataset.
        #[arg(long, default_value_t = 5)]
        preview: usize,

        /// Config file. Defaults to ./klinelab.toml when present.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List available indicators.
    Indicators {
        /// Only this category: trend, momentum, volatility or volume.
        #[arg(long)]
        category: Option<String>,
    },
    /// Configuration commands.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration with the secret redacted.
    Show {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write a starter config file.
    Init {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

/// Parsed `fetch` arguments shared by every symbol.
struct FetchPlan {
    category: Category,
    interval: Interval,
    limit: u32,
    start: i64,
    end: Option<i64>,
    indicators: Vec<String>,
    prune: PruneMode,
    output: Option<PathBuf>,
    format: ExportFormat,
    preview: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Fetch {
            symbols,
            category,
            interval,
            limit,
            start,
            end,
            indicators,
            prune,
            output,
            format,
            preview,
            config,
        } => {
            let config = AppConfig::resolve(config.as_deref()).context("failed to load config")?;
            let (registry, names) = build_registry(&indicators)?;
            let format = match (format.as_deref(), output.as_deref()) {
                (Some(f), _) => f.parse()?,
                (None, Some(path)) => ExportFormat::from_path(path).unwrap_or(ExportFormat::Csv),
                (None, None) => ExportFormat::Csv,
            };
            let plan = FetchPlan {
                category: category.parse()?,
                interval: interval.parse()?,
                limit,
                start: match start {
                    Some(s) => parse_time(&s)?,
                    None => chrono::Utc::now().timestamp_millis() - 30 * 86_400_000,
                },
                end: end.as_deref().map(parse_time).transpose()?,
                indicators: names,
                prune: parse_prune(&prune)?,
                output,
                format,
                preview,
            };
            run_fetch(&config, &registry, &plan, symbols)
        }
        Commands::Indicators { category } => run_indicators(category.as_deref()),
        Commands::Config { action } => match action {
            ConfigAction::Show { config } => run_config_show(config.as_deref()),
            ConfigAction::Init { path, force } => run_config_init(&path, force),
        },
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "klinelab=info",
        1 => "klinelab=debug",
        _ => "klinelab=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_time(text: &str) -> Result<i64> {
    parse_timestamp(text)
        .with_context(|| format!("invalid timestamp '{text}' (expected epoch ms, RFC 3339 or YYYY-MM-DD)"))
}

fn parse_prune(text: &str) -> Result<PruneMode> {
    match text.trim().to_ascii_lowercase().as_str() {
        "progressive" => Ok(PruneMode::Progressive),
        "final" => Ok(PruneMode::Final),
        other => bail!("unknown prune mode '{other}'. Valid: progressive, final"),
    }
}

/// Apply `NAME:period` overrides to a copy of the catalog. Returns the
/// registry and the bare names in selection order.
fn build_registry(selection: &[String]) -> Result<(IndicatorRegistry, Vec<String>)> {
    let mut registry = IndicatorRegistry::builtin().clone();
    let mut names = Vec::with_capacity(selection.len());

    for item in selection.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let Some((name, period)) = item.split_once(':') else {
            names.push(item.to_string());
            continue;
        };
        let period: usize = period
            .trim()
            .parse()
            .with_context(|| format!("invalid period in '{item}'"))?;
        let Some(descriptor) = registry.lookup(name) else {
            // Unknown names are reported as warnings by the engine.
            names.push(name.to_string());
            continue;
        };
        let mut config = descriptor.config;
        config.period = Some(period);
        registry = registry.with_config(name, config)?;
        names.push(name.to_string());
    }
    Ok((registry, names))
}

fn run_fetch(
    config: &AppConfig,
    registry: &IndicatorRegistry,
    plan: &FetchPlan,
    symbols: Vec<String>,
) -> Result<()> {
    if symbols.len() > 1 {
        if let Some(out) = &plan.output {
            if out.extension().is_some() {
                bail!("--output must be a directory when fetching several symbols");
            }
        }
    }

    let results: Vec<(String, Result<()>)> = if symbols.len() == 1 {
        let symbol = symbols[0].clone();
        let (tx, rx) = mpsc::channel::<klinelab_core::domain::ProgressEvent>();
        let printer = thread::spawn(move || {
            for event in rx {
                eprintln!("[{:>3}%] {}", event.progress, event.message);
            }
        });
        let result = fetch_symbol(config, registry, plan, &symbol, &ChannelProgress::new(tx));
        // The sink is dropped with the call, which closes the channel.
        let _ = printer.join();
        vec![(symbol, result)]
    } else {
        symbols
            .into_par_iter()
            .map(|symbol| {
                let result = fetch_symbol(config, registry, plan, &symbol, &LogProgress);
                (symbol, result)
            })
            .collect()
    };

    let mut failed = 0;
    for (symbol, result) in &results {
        if let Err(e) = result {
            eprintln!("Error for {symbol}: {e:#}");
            failed += 1;
        }
    }
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn fetch_symbol(
    config: &AppConfig,
    registry: &IndicatorRegistry,
    plan: &FetchPlan,
    symbol: &str,
    progress: &dyn ProgressSink,
) -> Result<()> {
    let client = BybitClient::new(&config.api, config.credentials.clone())
        .context("failed to build HTTP client")?;
    let engine = IndicatorEngine::new(registry).with_prune_mode(plan.prune);
    let mut session = Session::with_parts(PaginatedFetcher::new(client), engine);

    let mut request = FetchRequest::new(plan.category, symbol.to_uppercase(), plan.interval, plan.start)
        .with_limit(plan.limit);
    if let Some(end) = plan.end {
        request = request.with_end(end);
    }

    match session
        .fetch(&request, progress)
        .with_context(|| format!("fetch failed for {symbol}"))?
    {
        FetchStatus::Complete { rows } => info!(symbol, rows, "fetched"),
        FetchStatus::Empty => bail!("no data returned for {symbol} from {}", format_date(plan.start)),
        FetchStatus::Cancelled => bail!("fetch cancelled for {symbol}"),
    }

    if !plan.indicators.is_empty() {
        let warnings = session
            .enrich(&plan.indicators, progress)
            .with_context(|| format!("indicator calculation failed for {symbol}"))?;
        for w in &warnings {
            warn!(symbol, "{w}");
        }
    }

    let dataset = session
        .take_dataset()
        .with_context(|| format!("no dataset held for {symbol}"))?;
    println!("{}", preview(&dataset, plan.preview));

    if let Some(out) = &plan.output {
        let path = output_path(out, &dataset, plan.format);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let meta = export::write(&dataset, &path, plan.format)?;
        println!("Saved {} rows to {} (fingerprint {})", meta.rows, path.display(), &meta.fingerprint[..16]);
    }
    Ok(())
}

/// `out` itself when it names a file, else `{out}/{SYMBOL}_{interval}.{ext}`.
fn output_path(out: &Path, dataset: &Dataset, format: ExportFormat) -> PathBuf {
    if out.extension().is_some() {
        return out.to_path_buf();
    }
    out.join(format!(
        "{}_{}.{}",
        dataset.symbol,
        dataset.interval.title(),
        format.extension()
    ))
}

/// Text table of the first and last `n` rows.
fn preview(dataset: &Dataset, n: usize) -> String {
    let mut out = format!("{} ({} rows)\n", dataset.name, dataset.len());
    let header = export::header(dataset);
    out.push_str(&header.iter().map(|h| format!("{h:>19}")).collect::<Vec<_>>().join(" "));
    out.push('\n');

    let rows = dataset.rows();
    let shown: Vec<usize> = if rows.len() <= 2 * n {
        (0..rows.len()).collect()
    } else {
        (0..n).chain(rows.len() - n..rows.len()).collect()
    };

    for (k, &i) in shown.iter().enumerate() {
        if k == n && rows.len() > 2 * n {
            out.push_str(&format!("{:>19}\n", "..."));
        }
        let c = &rows[i];
        let mut cells = vec![
            c.timestamp.to_string(),
            format_datetime(c.timestamp),
            format!("{:.4}", c.open),
            format!("{:.4}", c.high),
            format!("{:.4}", c.low),
            format!("{:.4}", c.close),
            format!("{:.4}", c.volume),
        ];
        cells.extend(
            dataset
                .columns()
                .iter()
                .map(|col| c.value(col).map(|v| format!("{v:.2}")).unwrap_or_else(|| "null".into())),
        );
        out.push_str(&cells.iter().map(|s| format!("{s:>19}")).collect::<Vec<_>>().join(" "));
        out.push('\n');
    }
    out
}

fn run_indicators(category: Option<&str>) -> Result<()> {
    let categories: Vec<IndicatorCategory> = match category {
        None => IndicatorCategory::ALL.to_vec(),
        Some(c) => {
            let found = IndicatorCategory::ALL
                .into_iter()
                .find(|cat| cat.as_str().eq_ignore_ascii_case(c.trim()));
            match found {
                Some(cat) => vec![cat],
                None => bail!("unknown category '{c}'. Valid: trend, momentum, volatility, volume"),
            }
        }
    };

    let registry = IndicatorRegistry::builtin();
    for category in categories {
        println!("{category}");
        for d in registry.in_category(category) {
            let inputs: Vec<&str> = d.inputs.iter().map(|r| r.as_str()).collect();
            println!(
                "  {:<11} {:<38} inputs: {:<24} {}",
                d.name,
                d.title,
                inputs.join(","),
                d.config.summary()
            );
        }
    }
    Ok(())
}

fn run_config_show(path: Option<&Path>) -> Result<()> {
    let config = AppConfig::resolve(path).context("failed to load config")?;
    print!("{}", config.redacted().to_toml_string()?);
    Ok(())
}

fn run_config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    std::fs::write(path, AppConfig::template())
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
