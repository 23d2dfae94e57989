//! healthgraph CLI
//!
//! Command-line interface for the health analytics engine:
//! - Correlations, anomalies and cascades
//! - Threshold, conditional and weekly patterns
//! - Timelines, daily scores and recommendations
//! - Full reports

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use healthgraph::config::generate_default_config;
use healthgraph::{BaselineMethod, Config, HealthEngine, LoggingConfig};
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

#[derive(Parser)]
#[command(name = "healthgraph")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Personal health analytics from daily records")]
#[command(long_about = "healthgraph finds correlations, anomalies and cascades in daily health records\nand scores each day with concrete recommendations.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Record-set: a JSON file or a directory of <category>.csv files
    #[arg(short, long, global = true)]
    pub data: Option<PathBuf>,

    /// Config file (default: platform config dir, then ./healthgraph.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pairwise correlations, strongest first
    Correlations {
        /// Only edges touching this metric
        #[arg(short, long)]
        metric: Option<String>,
        /// Minimum |r| (overrides config)
        #[arg(long)]
        min: Option<f64>,
        /// Largest lag in days (overrides config)
        #[arg(long)]
        max_lag: Option<usize>,
        /// Rows shown in table output
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Top anomalies, or every anomaly run of one metric
    Anomalies {
        #[arg(short, long)]
        metric: Option<String>,
        /// Use a trailing rolling baseline instead of the leading window
        #[arg(long)]
        rolling: bool,
    },

    /// Multi-hop chains of correlated metrics across categories
    Cascades,

    /// Step effect of one metric on another
    Threshold { input: String, output: String },

    /// Correlation of two metrics on high vs low days of a third
    Conditional {
        condition: String,
        metric_a: String,
        metric_b: String,
    },

    /// Weekday rhythm of one metric, or of every metric that varies enough
    Weekly { metric: Option<String> },

    /// Date-filtered layers plus correlation edges for charting
    Timeline {
        /// Metrics (comma-separated or multiple args)
        #[arg(required = true)]
        metrics: Vec<String>,
        /// First date (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,
        /// Last date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,
    },

    /// Daily health score with insights and recommendations
    Score {
        /// Date to score (default: latest)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Target score for recommendations (overrides config)
        #[arg(long)]
        target: Option<u8>,
    },

    /// Run every analysis
    Report,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let template = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, template).with_context(|| format!("Failed to write {:?}", path))?;
                println!("Wrote default config to {:?}", path);
            }
            None => print!("{}", template),
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    apply_cli_overrides(&mut config, &cli.command);
    config.validate()?;

    init_logging(&config.logging)?;
    tracing::debug!("healthgraph v{}", env!("CARGO_PKG_VERSION"));

    let Some(data) = cli.data.as_deref() else {
        bail!("No record-set given; pass --data <file.json|dir>");
    };
    let engine = HealthEngine::load(data, config)
        .with_context(|| format!("Failed to load records from {:?}", data))?;

    run(&engine, cli.command, cli.format).await
}

fn apply_cli_overrides(config: &mut Config, command: &Commands) {
    match command {
        Commands::Correlations { min, max_lag, .. } => {
            if let Some(min) = min {
                config.correlation.min_correlation = *min;
            }
            if let Some(max_lag) = max_lag {
                config.correlation.max_lag = *max_lag;
            }
        }
        Commands::Anomalies { rolling: true, .. } => {
            config.anomaly.method = BaselineMethod::Rolling;
        }
        Commands::Score {
            target: Some(target),
            ..
        } => {
            config.score.target_score = *target;
        }
        _ => {}
    }
}

fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("healthgraph={}", config.level)));

    tracing_subscriber::registry()
        .with(fmt_layer(config)?)
        .with(filter)
        .init();

    Ok(())
}

/// stdout carries results, so logs go to stderr or the configured file
fn fmt_layer(config: &LoggingConfig) -> anyhow::Result<Box<dyn Layer<Registry> + Send + Sync>> {
    let json = config.format == "json";

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            let base = fmt::layer().with_writer(Mutex::new(file)).with_ansi(false);
            if json {
                base.json().boxed()
            } else {
                base.boxed()
            }
        }
        None => {
            let base = fmt::layer().with_writer(std::io::stderr);
            if json {
                base.json().boxed()
            } else {
                base.boxed()
            }
        }
    };

    Ok(layer)
}

async fn run(engine: &HealthEngine, command: Commands, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        Commands::Correlations { metric, limit, .. } => {
            let edges = match &metric {
                Some(name) => engine.correlations_for_metric(name),
                None => engine.compute_correlations(),
            };
            emit(format, &edges, || {
                if edges.is_empty() {
                    println!("No correlations above the threshold.");
                    return;
                }
                println!(
                    "{:<28} {:<28} {:>7} {:>4} {:<9} {:>6}",
                    "Metric 1", "Metric 2", "r", "Lag", "Strength", "n"
                );
                println!("{}", "-".repeat(87));
                for edge in edges.iter().take(limit) {
                    println!(
                        "{:<28} {:<28} {:>7.3} {:>4} {:<9} {:>6}",
                        edge.metric1,
                        edge.metric2,
                        edge.correlation,
                        edge.lag,
                        format!("{:?}", edge.strength).to_lowercase(),
                        edge.point_count
                    );
                }
                if edges.len() > limit {
                    println!("... {} more", edges.len() - limit);
                }
            })
        }

        Commands::Anomalies { metric, .. } => {
            let findings = match &metric {
                Some(name) => engine.detect_metric_anomalies(name),
                None => engine.detect_all_anomalies(),
            };
            emit(format, &findings, || {
                if findings.is_empty() {
                    println!("No anomalies found.");
                    return;
                }
                for finding in &findings {
                    println!(
                        "{} ({}) - {} severity, {} day(s), baseline {:.2} ± {:.2}",
                        finding.label,
                        finding.category,
                        finding.severity,
                        finding.consecutive_days,
                        finding.baseline_mean,
                        finding.baseline_std_dev
                    );
                    for event in &finding.occurrences {
                        println!(
                            "  {}  value {:.2}  z {:.2}  deviation {:+.2}",
                            event.date, event.value, event.z_score, event.deviation
                        );
                    }
                }
            })
        }

        Commands::Cascades => {
            let cascades = engine.discover_cascades();
            emit(format, &cascades, || {
                if cascades.is_empty() {
                    println!("No cascades found.");
                    return;
                }
                for cascade in &cascades {
                    println!(
                        "{:.2}  {}  ({} steps, {} category changes)",
                        cascade.mean_correlation,
                        cascade.description,
                        cascade.steps,
                        cascade.cross_category_count
                    );
                }
            })
        }

        Commands::Threshold { input, output } => {
            let effect = engine.threshold_effect(&input, &output);
            emit(format, &effect, || match &effect {
                None => println!("Not enough paired data for {} → {}.", input, output),
                Some(effect) => {
                    println!(
                        "{} → {}: output changes by {:+.2} around {:.2}",
                        effect.input_metric,
                        effect.output_metric,
                        effect.effect_size,
                        effect.inflection_value
                    );
                    println!("{:>12} {:>12} {:>12} {:>6}", "Input min", "Input max", "Output", "n");
                    for bin in &effect.bins {
                        println!(
                            "{:>12.2} {:>12.2} {:>12.2} {:>6}",
                            bin.min_input, bin.max_input, bin.mean_output, bin.count
                        );
                    }
                }
            })
        }

        Commands::Conditional {
            condition,
            metric_a,
            metric_b,
        } => {
            let result = engine.conditional_correlation(&condition, &metric_a, &metric_b);
            emit(format, &result, || match &result {
                None => println!("No conditional effect of {} on {} ↔ {}.", condition, metric_a, metric_b),
                Some(c) => {
                    println!(
                        "{} ↔ {} split at {} = {:.2}",
                        c.metric_a, c.metric_b, c.condition_metric, c.median
                    );
                    println!("  high: r = {:.3} (n = {})", c.high_correlation, c.high_count);
                    println!("  low:  r = {:.3} (n = {})", c.low_correlation, c.low_count);
                    println!("  difference: {:+.3}", c.difference);
                }
            })
        }

        Commands::Weekly { metric } => {
            let patterns = match &metric {
                Some(name) => engine.weekly_pattern(name).into_iter().collect(),
                None => engine.weekly_patterns(),
            };
            emit(format, &patterns, || {
                if patterns.is_empty() {
                    println!("No weekly patterns found.");
                    return;
                }
                for pattern in &patterns {
                    println!(
                        "{}: peak {}, trough {}, {:.1}% variation",
                        pattern.metric, pattern.peak_day, pattern.trough_day, pattern.variation_percent
                    );
                    for day in &pattern.weekdays {
                        println!("  {:<10} {:>10.2} ± {:<8.2} (n = {})", day.weekday, day.mean, day.std_dev, day.count);
                    }
                }
            })
        }

        Commands::Timeline { metrics, from, to } => {
            if from > to {
                bail!("--from {} is after --to {}", from, to);
            }
            let metrics: Vec<String> = metrics
                .iter()
                .flat_map(|m| m.split(',').map(|s| s.trim().to_string()))
                .filter(|m| !m.is_empty())
                .collect();
            let timeline = engine.timeline(&metrics, from, to);
            emit(format, &timeline, || {
                print!("{:<12}", "Date");
                for layer in &timeline.layers {
                    print!(" | {:<14}", truncate(&layer.metric, 14));
                }
                println!();
                println!("{}", "-".repeat(12 + timeline.layers.len() * 17));
                for (i, date) in timeline.dates.iter().enumerate() {
                    print!("{:<12}", date);
                    for layer in &timeline.layers {
                        match layer.values.get(i).copied().flatten() {
                            Some(v) => print!(" | {:<14.2}", v),
                            None => print!(" | {:<14}", "-"),
                        }
                    }
                    println!();
                }
                if !timeline.edges.is_empty() {
                    println!();
                    println!("Edges:");
                    for edge in &timeline.edges {
                        println!("  {} ↔ {}: r = {:.3}, lag {}", edge.metric1, edge.metric2, edge.correlation, edge.lag);
                    }
                }
            })
        }

        Commands::Score { date, .. } => {
            let scored = match date {
                Some(date) => engine.score_for_date(date).map(|r| (date, r)),
                None => engine.score_latest(),
            };
            let Some((date, result)) = scored else {
                bail!("No data to score");
            };
            let recommendations = engine.guarded_recommendations(&result).await;

            #[derive(Serialize)]
            struct ScoreOutput<'a> {
                date: NaiveDate,
                #[serde(flatten)]
                result: &'a healthgraph::ScoreResult,
                recommendations: &'a [healthgraph::Recommendation],
            }

            let output = ScoreOutput {
                date,
                result: &result,
                recommendations: &recommendations,
            };
            emit(format, &output, || {
                println!("Health score for {}: {}/100", date, result.score);
                println!();
                for (category, entry) in &result.breakdown {
                    println!("  {:<10} {:>5.1}  (weight {:.0}%)", category.as_str(), entry.score, entry.weight * 100.0);
                }
                if !result.insights.is_empty() {
                    println!();
                    println!("Insights:");
                    for insight in &result.insights {
                        println!("  [{}] {}", insight.severity, insight.message);
                    }
                }
                if !recommendations.is_empty() {
                    println!();
                    println!("Recommendations (target {}):", engine.config().score.target_score);
                    for rec in &recommendations {
                        println!("  +{:.1}  {}: {}", rec.impact, rec.category, rec.action);
                        println!("        {}", rec.detail);
                    }
                }
            })
        }

        Commands::Report => {
            let report = engine.report();
            emit(format, &report, || {
                println!("{} days, {} metrics", report.days, report.metrics);
                if let (Some(date), Some(score)) = (report.date, &report.score) {
                    println!("Latest score ({}): {}/100", date, score.score);
                }
                println!();
                println!("Top correlations:");
                for edge in report.correlations.iter().take(5) {
                    println!("  {:+.2}  {} ↔ {} (lag {})", edge.correlation, edge.metric1, edge.metric2, edge.lag);
                }
                println!();
                println!("Anomalies:");
                for finding in &report.anomalies {
                    println!("  {} - {} severity, {} day(s)", finding.label, finding.severity, finding.consecutive_days);
                }
                println!();
                println!("Cascades:");
                for cascade in report.cascades.iter().take(5) {
                    println!("  {:.2}  {}", cascade.mean_correlation, cascade.description);
                }
                println!();
                println!("Weekly patterns:");
                for pattern in &report.weekly_patterns {
                    println!("  {}: peak {}, trough {} ({:.0}%)", pattern.metric, pattern.peak_day, pattern.trough_day, pattern.variation_percent);
                }
                if !report.recommendations.is_empty() {
                    println!();
                    println!("Recommendations:");
                    for rec in &report.recommendations {
                        println!("  +{:.1}  {}", rec.impact, rec.action);
                    }
                }
            })
        }

        Commands::Config { .. } => Ok(()),
    }
}

/// Print JSON, or run the table printer
fn emit<T: Serialize>(format: OutputFormat, value: &T, table: impl FnOnce()) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table => table(),
    }
    Ok(())
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width - 1).collect();
        out.push('…');
        out
    }
}
