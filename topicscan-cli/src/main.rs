use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::{num::NonZeroUsize, path::PathBuf};
use topicscan::{
    ConfigOverrides, DocumentFormat, DocumentId, ScanConfig, ScanContext, ScanError, ScanReport,
    Strategy,
};
use tracing::warn;
use tracing_subscriber::{filter::Directive, EnvFilter};

type Result<T> = std::result::Result<T, ScanError>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CliScanConfig {
    /// Topic to count (matched case-sensitively in titles, then descriptions)
    #[arg(short = 't', long)]
    topic: Option<String>,

    /// Corpus directory
    #[arg(short = 'd', long)]
    dir: Option<PathBuf>,

    /// Generate `<prefix>-0000.<ext>` ids instead of listing the directory
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Map every id to the file named by its first N characters
    #[arg(long)]
    shared_prefix: Option<usize>,

    /// Document format (rss|json)
    #[arg(short = 'f', long)]
    format: Option<String>,

    /// Number of workers or permits
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// Queue capacity between pipeline stages
    #[arg(long)]
    capacity: Option<NonZeroUsize>,

    /// Emit task and region markers
    #[arg(long)]
    trace: bool,

    /// Configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Log level (error|warn|info|debug|trace); RUST_LOG takes precedence
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Count topic matches with one strategy
    Scan {
        /// Scheduling strategy
        #[arg(short = 's', long)]
        strategy: Option<String>,

        #[command(flatten)]
        config: CliScanConfig,
    },

    /// Run every strategy over the same corpus and compare
    Compare {
        #[command(flatten)]
        config: CliScanConfig,
    },
}

fn main() -> Result<()> {
    run()
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { strategy, config } => {
            let strategy = strategy.map(|s| s.parse::<Strategy>()).transpose()?;
            let config = load_config(config, strategy)?;
            init_logging(&config);
            if config.trace && config.strategy != Strategy::TracedPool {
                warn!(
                    "--trace only adds markers to the traced-pool strategy; {} runs without them",
                    config.strategy
                );
            }

            let ids = enumerate_corpus(&config);
            let ctx = ScanContext::from_config(&config);
            let report = config.strategy.build(ctx, &config).scan(&config.topic, &ids);
            print_scan_report(&report, &config.topic);
            Ok(())
        }
        Commands::Compare { config } => {
            let config = load_config(config, None)?;
            init_logging(&config);

            let ids = enumerate_corpus(&config);
            let ctx = ScanContext::from_config(&config);
            let reports: Vec<ScanReport> = Strategy::ALL
                .iter()
                .map(|strategy| {
                    ctx.metrics().reset();
                    strategy.build(ctx.clone(), &config).scan(&config.topic, &ids)
                })
                .collect();
            print_comparison(&reports, ids.len(), &config.topic);
            Ok(())
        }
    }
}

fn load_config(cli: CliScanConfig, strategy: Option<Strategy>) -> Result<ScanConfig> {
    let format = cli
        .format
        .map(|f| f.parse::<DocumentFormat>())
        .transpose()?;

    let config = ScanConfig::load_from(cli.config.as_deref())?.merge_with_cli(ConfigOverrides {
        topic: cli.topic,
        corpus_dir: cli.dir,
        document_count: cli.count,
        shared_prefix_len: cli.shared_prefix,
        format,
        strategy,
        parallelism: cli.threads,
        pipeline_capacity: cli.capacity,
        log_level: cli.log_level,
        trace: cli.trace,
    });
    config.validate()?;
    Ok(config)
}

/// Lists the corpus. A corpus that cannot be listed is reported and scanned
/// as empty, so the total is 0.
fn enumerate_corpus(config: &ScanConfig) -> Vec<DocumentId> {
    match config.enumerator().enumerate() {
        Ok(ids) => ids,
        Err(e) => {
            eprintln!("{} {}", "Cannot list corpus:".red(), e);
            Vec::new()
        }
    }
}

fn init_logging(config: &ScanConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // Task and region markers are trace events; make sure they get through
    let filter = if config.trace {
        match "topicscan::trace=trace".parse::<Directive>() {
            Ok(directive) => filter.add_directive(directive),
            Err(_) => filter,
        }
    } else {
        filter
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_scan_report(report: &ScanReport, topic: &str) {
    println!(
        "Searching {} files, found {} {} times.",
        report.documents, topic, report.total
    );

    if !report.is_clean() {
        println!(
            "\n{} documents could not be scanned:",
            report.failures.len().to_string().yellow()
        );
        for failure in &report.failures {
            println!(
                "  {} ({}): {}",
                failure.id.to_string().blue(),
                failure.phase,
                failure.error.to_string().red()
            );
        }
    }
}

fn print_comparison(reports: &[ScanReport], documents: usize, topic: &str) {
    println!("Searching {} files for {}", documents, topic);
    for report in reports {
        println!(
            "{} found {:>8} in {:>10.2?} ({} failed)",
            format!("{:<14}", report.strategy).blue(),
            report.total,
            report.elapsed,
            report.failures.len()
        );
    }

    let Some(first) = reports.first() else {
        return;
    };
    if reports.iter().all(|r| r.total == first.total) {
        println!("\n{}", "All strategies agree".green());
    } else {
        println!("\n{}", "Strategies disagree".red());
    }
}
