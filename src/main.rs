//! Psych Survey CLI
//!
//! Command-line interface for generating synthetic survey data and building
//! the age-group chart report.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use psych_survey::{
    analytics::{
        logger::{format_aggregates, print_summary, SurveyLogger},
        report::write_report,
        ChartRenderer, MetricsCalculator,
    },
    config::SurveyConfig,
    simulation::SampleGenerator,
    utils::csv_io::{read_survey_table, write_samples},
};

#[derive(Parser)]
#[command(name = "psych-survey")]
#[command(author = "Psych Survey Team")]
#[command(version = "0.1.0")]
#[command(about = "Synthetic psychological survey data and age-group chart reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate synthetic survey data as CSV
    Generate {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output CSV path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rows per age group
        #[arg(short = 'n', long)]
        samples: Option<usize>,

        /// RNG seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,

        /// Directory for the JSON generation summary
        #[arg(long)]
        summary_dir: Option<PathBuf>,
    },

    /// Build the HTML chart report from a survey CSV
    Report {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Input CSV path
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output HTML path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// TrueType/OpenType font for chart text
        #[arg(long)]
        font: Option<PathBuf>,
    },

    /// Generate data, then build the report from it
    Run {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// RNG seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,

        /// TrueType/OpenType font for chart text
        #[arg(long)]
        font: Option<PathBuf>,

        /// Directory for the JSON generation summary
        #[arg(long)]
        summary_dir: Option<PathBuf>,
    },

    /// Write the default configuration as JSON
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "survey.json")]
        output: PathBuf,
    },

    /// Print pipeline and default configuration info
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG overrides the verbosity flag
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match cli.command {
        Commands::Generate {
            config,
            output,
            samples,
            seed,
            summary_dir,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(output) = output {
                config.data_path = output;
            }
            if samples.is_some() {
                config.sample_size = samples;
            }
            if seed.is_some() {
                config.seed = seed;
            }
            run_generate(&config, summary_dir.as_deref())?;
        }

        Commands::Report {
            config,
            input,
            output,
            font,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(input) = input {
                config.data_path = input;
            }
            if let Some(output) = output {
                config.report_path = output;
            }
            if font.is_some() {
                config.font_path = font;
            }
            run_report(&config)?;
        }

        Commands::Run {
            config,
            seed,
            font,
            summary_dir,
        } => {
            let mut config = load_config(config.as_deref())?;
            if seed.is_some() {
                config.seed = seed;
            }
            if font.is_some() {
                config.font_path = font;
            }
            run_generate(&config, summary_dir.as_deref())?;
            run_report(&config)?;
        }

        Commands::InitConfig { output } => {
            SurveyConfig::default()
                .save(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Default configuration written to {}", output.display());
        }

        Commands::Info => {
            print_info();
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SurveyConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            SurveyConfig::load(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))
        }
        None => Ok(SurveyConfig::default()),
    }
}

fn run_generate(config: &SurveyConfig, summary_dir: Option<&Path>) -> Result<()> {
    info!("Configuration:");
    info!("  Age groups:   {}", config.age_groups.join(", "));
    info!("  Indicators:   {}", config.indicators.len());
    info!("  Rows/group:   {}", config.effective_sample_size());
    info!("  Score range:  {}..={}", config.score_range.lo, config.score_range.hi);
    info!("  Spread:       {}", config.spread);

    let mut generator = SampleGenerator::new(config).context("Invalid survey configuration")?;
    let samples = generator.generate()?;

    write_samples(&config.data_path, &samples)
        .with_context(|| format!("Failed to write {}", config.data_path.display()))?;

    let summary = MetricsCalculator::generation_summary(&samples, &config.target_averages);
    print_summary(&summary);

    if let Some(dir) = summary_dir {
        SurveyLogger::new(dir).save_summary(&summary)?;
    }

    println!("数据已保存到文件：{}", config.data_path.display());
    Ok(())
}

fn run_report(config: &SurveyConfig) -> Result<()> {
    let renderer = ChartRenderer::from_config(config)?;
    if !renderer.labels_enabled() {
        info!("No chart font configured; charts are drawn without text (use --font)");
    }

    let table = read_survey_table(&config.data_path)
        .with_context(|| format!("Failed to read {}", config.data_path.display()))?;
    let aggregates = MetricsCalculator::aggregate_groups(&table, &config.age_groups);
    print!("{}", format_aggregates(&aggregates));

    if aggregates.is_empty() {
        warn!(
            "None of the {} requested groups has rows in {}",
            config.age_groups.len(),
            config.data_path.display()
        );
    }

    let path = write_report(&aggregates, &renderer, &config.report_path)?;

    println!("📊 Report generated: {}", path.display());
    println!("输出完成");
    Ok(())
}

fn print_info() {
    let defaults = SurveyConfig::default();

    println!();
    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║       Psych Survey - Info                                ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();
    println!("PIPELINE:");
    println!("  • Generator  - normal draws around target means, rounded and clamped");
    println!("  • Report     - per-group means charted as radar, heatmap, bar,");
    println!("                 barh, pie and step views in one HTML page");
    println!();
    println!("DEFAULTS:");
    println!("  Age groups:   {}", defaults.age_groups.join(", "));
    println!("  Indicators:   {}", defaults.indicators.join(", "));
    println!("  Rows/group:   {}", defaults.effective_sample_size());
    println!("  Data file:    {}", defaults.data_path.display());
    println!("  Report file:  {}", defaults.report_path.display());
    println!();
    println!("USAGE:");
    println!("  psych-survey run --seed 42 --font SimHei.ttf   # Generate and report");
    println!("  psych-survey generate -n 150                   # Data only");
    println!("  psych-survey report -i sample_data.csv         # Report only");
    println!("  psych-survey init-config -o survey.json        # Editable config");
    println!();
}
