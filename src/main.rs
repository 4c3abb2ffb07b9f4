//! CLI entry point for the grade analytics tool.
//!
//! Provides subcommands for the full course report, per-field statistics,
//! section comparison, the at-risk list and an interactive roster menu.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use grade_analytics::analyzers::analyzer::{ReportOptions, run_full_report};
use grade_analytics::analyzers::compare::compare_sections;
use grade_analytics::analyzers::statistics::{
    at_risk_students, basic_stats, detect_outliers, percentiles,
};
use grade_analytics::analyzers::transform::transform_all;
use grade_analytics::config::Config;
use grade_analytics::ingest::ingest;
use grade_analytics::menu::{MenuContext, run_menu};
use grade_analytics::output::{render_roster, render_section_comparison};
use grade_analytics::record::{ScoreField, StudentRecord};
use grade_analytics::roster::Roster;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_CONFIG: &str = "config.json";

#[derive(Parser)]
#[command(name = "grade_analytics")]
#[command(about = "Grades a course roster CSV and reports on it", long_about = None)]
struct Cli {
    /// Path to the JSON configuration (falls back to GRADE_ANALYTICS_CONFIG, then config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade every student and write all reports
    Report {
        /// Roster CSV (defaults to paths.input_csv from the config)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Directory for CSV, JSON and chart output
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,

        /// Skip writing text charts
        #[arg(long, default_value_t = false)]
        no_charts: bool,
    },
    /// Basic statistics, percentiles and outliers for one score field
    Stats {
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// final_score, midterm, final_exam, attendance, quiz_average or quiz_<n>
        #[arg(short, long, default_value = "final_score")]
        field: ScoreField,
    },
    /// Compare final-score figures across sections
    Compare {
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// List students below the at-risk threshold
    AtRisk {
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Overrides thresholds.at_risk_grade from the config
        #[arg(short, long)]
        threshold: Option<f64>,
    },
    /// Interactive roster editor
    Menu {
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,

        #[arg(long, default_value_t = false)]
        no_charts: bool,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_logging();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .or_else(|| std::env::var_os("GRADE_ANALYTICS_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = Config::load(&config_path)
        .with_context(|| format!("cannot start without configuration ({})", config_path.display()))?;

    match cli.command {
        Commands::Report {
            input,
            output_dir,
            no_charts,
        } => {
            let Some(records) = load_records(input, &config) else {
                return Ok(());
            };
            let output_dir = output_dir.unwrap_or_else(|| config.paths.output_dir.clone());
            let options = ReportOptions { charts: !no_charts };

            println!("\n--- Running Full Report ---");
            let report = run_full_report(&records, &config, &output_dir, options)?;
            println!("{}", report.console);
            for path in &report.artifacts {
                println!("  wrote {}", path.display());
            }
            println!("--- Report Generation Complete ---");
        }
        Commands::Stats { input, field } => {
            let Some(records) = load_records(input, &config) else {
                return Ok(());
            };
            let graded = transform_all(&records, &config);
            print_field_stats(&graded, &field);
        }
        Commands::Compare { input } => {
            let Some(records) = load_records(input, &config) else {
                return Ok(());
            };
            let graded = transform_all(&records, &config);
            println!("{}", render_section_comparison(&compare_sections(&graded)));
        }
        Commands::AtRisk { input, threshold } => {
            let Some(records) = load_records(input, &config) else {
                return Ok(());
            };
            let threshold = threshold.unwrap_or(config.thresholds.at_risk_grade);
            let graded = transform_all(&records, &config);
            let at_risk: Vec<StudentRecord> = at_risk_students(&graded, threshold)
                .into_iter()
                .cloned()
                .collect();

            info!(threshold, count = at_risk.len(), "At-risk students selected");
            println!("Students below {threshold:.2}:");
            if at_risk.is_empty() {
                println!("No at-risk students found.");
            } else {
                print!("{}", render_roster(&at_risk));
            }
        }
        Commands::Menu {
            input,
            output_dir,
            no_charts,
        } => {
            let Some(records) = load_records(input, &config) else {
                return Ok(());
            };
            let output_dir = output_dir.unwrap_or_else(|| config.paths.output_dir.clone());
            let ctx = MenuContext {
                config: &config,
                output_dir: &output_dir,
                options: ReportOptions { charts: !no_charts },
            };

            let mut roster = Roster::new(records);
            let stdin = std::io::stdin();
            run_menu(stdin.lock(), std::io::stdout(), &mut roster, &ctx)?;
        }
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_logging() -> WorkerGuard {
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/grade_analytics.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("grade_analytics.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(log_filter(
            std::env::var("RUST_LOG").ok().as_deref(),
            LevelFilter::INFO,
        ));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(log_filter(
            std::env::var("RUST_LOG_JSON").ok().as_deref(),
            LevelFilter::DEBUG,
        ));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    file_guard
}

/// Builds a filter from a `RUST_LOG`-style value, using `default` only when
/// the value is unset or names no directives.
fn log_filter(directives: Option<&str>, default: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default.into())
        .parse_lossy(directives.unwrap_or(""))
}

/// Ingests the roster, or returns `None` after telling the user there is nothing to do.
fn load_records(input: Option<PathBuf>, config: &Config) -> Option<Vec<StudentRecord>> {
    let path = input.unwrap_or_else(|| config.paths.input_csv.clone());
    let ingested = ingest(&path);

    if ingested.records.is_empty() {
        warn!(path = %path.display(), "No student records loaded");
        println!("No student records loaded from {}; nothing to do.", path.display());
        return None;
    }
    if !ingested.diagnostics.is_empty() {
        info!(
            diagnostics = ingested.diagnostics.len(),
            "Roster loaded with warnings"
        );
    }
    Some(ingested.records)
}

fn print_field_stats(records: &[StudentRecord], field: &ScoreField) {
    let basic = basic_stats(records, field);
    let pct = percentiles(records, field);
    let outliers = detect_outliers(records, field);

    println!("--- Statistics for {field} ---");
    println!("Mean: {:.2}", basic.mean);
    println!("Min:  {:.2}", basic.min);
    println!("Max:  {:.2}", basic.max);
    println!(
        "Percentiles: 25th {:.2} | 50th {:.2} | 75th {:.2} | 90th {:.2}",
        pct.p25, pct.p50, pct.p75, pct.p90
    );
    if outliers.is_empty() {
        println!("Outliers: none");
    } else {
        println!("Outliers:");
        for r in outliers {
            let value = r.value(field).unwrap_or_default();
            println!("  - {} {}, {}: {:.2}", r.student_id, r.last_name, r.first_name, value);
        }
    }
}
