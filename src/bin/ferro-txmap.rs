// Copyright (c) 2024-2025 Fulcrum Genomics LLC
// SPDX-License-Identifier: MIT

//! ferro-txmap CLI - transcript/genome coordinate mapping

use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use ferro_txmap::batch::{BatchPipeline, CancellationToken};
use ferro_txmap::cli::{output_load_report, output_result, ExitStatus, OutputFormat};
use ferro_txmap::config::{CliOverrides, TxMapConfig};
use ferro_txmap::io::{create_output, load_transcripts, TsvQuerySource, TsvResultSink};
use ferro_txmap::query::{Query, QueryEngine};
use ferro_txmap::FerroError;

#[derive(Parser)]
#[command(name = "ferro-txmap")]
#[command(author, version, about = "Map coordinates between transcripts and the genome")]
#[command(
    long_about = "Translate 0-based transcript offsets to genome positions (T2G) and back \
                  (G2T) using each transcript's CIGAR alignment."
)]
struct Cli {
    /// Log level filter (e.g. info, debug, ferro_txmap=trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Configuration file (defaults to .ferro-txmap.toml, then ~/.config/ferro/txmap.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every query in a file
    Map {
        /// Transcript table (TSV, optionally .gz)
        #[arg(short, long)]
        transcripts: PathBuf,

        /// Query table (TSV, optionally .gz)
        #[arg(short, long)]
        queries: PathBuf,

        /// Output file, `-` for stdout
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Worker threads
        #[arg(short = 'j', long)]
        workers: Option<usize>,

        /// Query rows per chunk
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Attempts per chunk read or write
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Write the five-column layout without `Status`
        #[arg(long)]
        omit_status: bool,
    },

    /// Resolve a single coordinate
    Lookup {
        /// Transcript table (TSV, optionally .gz)
        #[arg(short, long)]
        transcripts: PathBuf,

        /// Output format
        #[arg(short = 'f', long, default_value = "text", value_parser = ["text", "json"])]
        format: String,

        #[command(subcommand)]
        query: LookupQuery,
    },

    /// Load a transcript table and report rejected rows
    Validate {
        /// Transcript table (TSV, optionally .gz)
        #[arg(short, long)]
        transcripts: PathBuf,

        /// Output format
        #[arg(short = 'f', long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
}

#[derive(Subcommand)]
enum LookupQuery {
    /// Transcript offset to genome position
    T2g { transcript: String, coord: u64 },
    /// Genome position to transcript offset
    G2t { chromosome: String, coord: u64 },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.log_level) {
        eprintln!("Error: {}", e);
        process::exit(ExitStatus::Failure.code());
    }

    let status = match run(cli) {
        Ok(status) => status,
        Err(e) => {
            match e.downcast_ref::<FerroError>() {
                Some(ferro) => error!("{}", ferro.detailed_message()),
                None => error!("{}", e),
            }
            ExitStatus::Failure
        }
    };
    process::exit(status.code());
}

fn run(cli: Cli) -> Result<ExitStatus, Box<dyn Error>> {
    match cli.command {
        Commands::Map {
            transcripts,
            queries,
            output,
            workers,
            chunk_size,
            max_attempts,
            omit_status,
        } => {
            let overrides = CliOverrides {
                workers,
                chunk_size,
                max_attempts,
                omit_status,
            };
            run_map(
                &transcripts,
                &queries,
                &output,
                cli.config.as_deref(),
                &overrides,
            )
        }
        Commands::Lookup {
            transcripts,
            format,
            query,
        } => {
            let query = match query {
                LookupQuery::T2g { transcript, coord } => Query::t2g(transcript, coord),
                LookupQuery::G2t { chromosome, coord } => Query::g2t(chromosome, coord),
            };
            run_lookup(&transcripts, &query, parse_format(&format))
        }
        Commands::Validate {
            transcripts,
            format,
        } => run_validate(&transcripts, parse_format(&format)),
    }
}

fn parse_format(format: &str) -> OutputFormat {
    format.parse().unwrap_or_default()
}

fn run_map(
    transcripts: &Path,
    queries: &Path,
    output: &Path,
    config_path: Option<&Path>,
    overrides: &CliOverrides,
) -> Result<ExitStatus, Box<dyn Error>> {
    let config = TxMapConfig::load(config_path)?;
    let (pipeline_config, layout) = config.merge_with_cli(overrides);

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupt received, finishing chunks in progress");
        handler_token.cancel();
    })?;

    let mut pipeline = BatchPipeline::new(pipeline_config);
    let (catalog, report) = pipeline.load_catalog(transcripts)?;

    let mut source = TsvQuerySource::open(queries)?;
    let mut sink = TsvResultSink::new(create_output(output)?, layout)?;
    let summary = pipeline.run(&catalog, &mut source, &mut sink, &token)?;

    info!(
        "Finished in {:.2?}: {} of {} row(s) written",
        summary.elapsed, summary.rows_written, summary.rows_read
    );
    if summary.has_rejections() {
        warn!(
            "{} malformed query row(s) skipped, first at line {}",
            summary.malformed.len(),
            summary.malformed[0].line().unwrap_or(0)
        );
    }
    if report.has_rejections() {
        warn!("{} transcript(s) rejected", report.rejected.len());
    }

    Ok(ExitStatus::from_outcome(&report, Some(&summary)))
}

fn run_lookup(
    transcripts: &Path,
    query: &Query,
    format: OutputFormat,
) -> Result<ExitStatus, Box<dyn Error>> {
    let (catalog, report) = load_transcripts(transcripts)?;
    let result = QueryEngine::new(&catalog).resolve(query);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output_result(&mut handle, &result, format)?;
    handle.flush()?;

    Ok(ExitStatus::from_outcome(&report, None))
}

fn run_validate(transcripts: &Path, format: OutputFormat) -> Result<ExitStatus, Box<dyn Error>> {
    let (catalog, report) = load_transcripts(transcripts)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output_load_report(&mut handle, &report, format)?;
    if format == OutputFormat::Text {
        writeln!(
            handle,
            "{} transcript(s) loaded, {} rejected",
            catalog.len(),
            report.rejected.len()
        )?;
    }
    handle.flush()?;

    Ok(ExitStatus::from_outcome(&report, None))
}

/// Install the tracing subscriber. `log` records from the library are
/// forwarded through the subscriber's log bridge. Logs go to stderr so that
/// results can be written to stdout.
fn init_tracing(level: &str) -> Result<(), Box<dyn Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = match std::env::var("RUST_LOG") {
        Ok(env) if !env.is_empty() => EnvFilter::try_new(&env)
            .map_err(|e| format!("Invalid RUST_LOG '{}': {}", env, e))?,
        _ => EnvFilter::try_new(level)
            .map_err(|e| format!("Invalid log level '{}': {}", level, e))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .try_init()?;

    Ok(())
}
