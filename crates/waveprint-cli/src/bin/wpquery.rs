//! wpquery - Identify an audio sample against the corpus
//!
//! Usage: wpquery <audio> [--seconds N] [--start S]
//!
//! Exit codes: 0 on match, 1 on no-match, 2 on error.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use waveprint_cli::config::{CliConfig, StorageBackend};
use waveprint_cli::corpus::load_corpus;
use waveprint_cli::output::print_query_result;
use waveprint_core::{
    recognize, FingerprintCommandBuilder, RecognitionResult, Stride,
};
use waveprint_db::PostgresStore;

#[derive(Parser, Debug)]
#[command(name = "wpquery")]
#[command(about = "Identify an audio sample against the fingerprint corpus", long_about = None)]
struct Args {
    /// Query audio file (wav, mp3, flac, ogg)
    audio: String,

    /// Seconds of audio to process
    #[arg(long)]
    seconds: Option<f64>,

    /// Seconds to skip at the start of the file
    #[arg(long)]
    start: Option<f64>,

    /// Override the query stride step in samples
    #[arg(long)]
    query_stride: Option<usize>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    match run_query(&args).await {
        Ok(result) => {
            print_query_result(&args.audio, &result);
            if result.is_successful() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run_query(args: &Args) -> Result<RecognitionResult> {
    let config = CliConfig::resolve(args.config.as_deref())?;

    if !Path::new(&args.audio).exists() {
        anyhow::bail!("query file not found: {}", args.audio);
    }

    let mut builder = FingerprintCommandBuilder::new().from_file(&args.audio);
    if let Some(start) = args.start {
        builder = builder.with_start_seconds(start);
    }
    if let Some(seconds) = args.seconds {
        builder = builder.with_seconds_to_process(seconds);
    }
    let query_config = config.query_config();
    let stride = match args.query_stride {
        Some(step) => Stride::Incremental { step },
        None => query_config.stride,
    };
    let command = builder.with_stride(stride).build()?;

    let result = match config.storage.backend {
        StorageBackend::Filesystem => {
            let dir = Path::new(&config.storage.filesystem.base_directory);
            let (store, tracks) = load_corpus(dir, &command.schema_id()).await?;
            log::info!("Corpus loaded: {} tracks", tracks);
            recognize(&store, &command, &query_config).await?
        }
        StorageBackend::Postgresql => {
            let pg = &config.storage.postgresql;
            let pool = waveprint_db::create_pool(
                &pg.host,
                pg.port,
                &pg.database,
                &pg.user,
                &pg.password,
                pg.max_connections,
            )?;
            waveprint_db::init_schema(&pool).await?;
            let store = PostgresStore::new(pool);
            recognize(&store, &command, &query_config).await?
        }
    };

    log::info!(
        "Query finished: {} matching tracks",
        result.matches.len()
    );

    Ok(result)
}
