//! wpingest - Fingerprint an audio file into the corpus
//!
//! Usage: wpingest <audio> --meta <json> [--start S] [--seconds N]
//!
//! Exit codes: 0 on success, 2 on error.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use waveprint_cli::config::{CliConfig, StorageBackend};
use waveprint_cli::corpus::corpus_path;
use waveprint_cli::output::print_ingest_status;
use waveprint_core::{
    ingest_track, FingerprintCommandBuilder, TrackMetadata,
};
use waveprint_db::PostgresStore;
use waveprint_fp::{WfpFile, WfpWriter};

#[derive(Parser, Debug)]
#[command(name = "wpingest")]
#[command(about = "Fingerprint an audio file and add it to the corpus", long_about = None)]
struct Args {
    /// Input audio file (wav, mp3, flac, ogg)
    audio: String,

    /// Track metadata JSON file (track_id, artist, title, ...)
    #[arg(long)]
    meta: Option<String>,

    /// Seconds to skip at the start of the file
    #[arg(long)]
    start: Option<f64>,

    /// Seconds of audio to process
    #[arg(long)]
    seconds: Option<f64>,

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

    match run_ingest(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run_ingest(args: &Args) -> Result<()> {
    let config = CliConfig::resolve(args.config.as_deref())?;

    let audio_path = Path::new(&args.audio);
    if !audio_path.exists() {
        anyhow::bail!("input file not found: {}", audio_path.display());
    }

    let meta = load_metadata(args)?;
    log::info!("Processing: {} as {}", audio_path.display(), meta.track_id);

    let mut builder = FingerprintCommandBuilder::new().from_file(&args.audio);
    if let Some(start) = args.start {
        builder = builder.with_start_seconds(start);
    }
    if let Some(seconds) = args.seconds {
        builder = builder.with_seconds_to_process(seconds);
    }
    let command = builder.build()?;

    let started = std::time::Instant::now();

    let (stored, destination) = match config.storage.backend {
        StorageBackend::Filesystem => {
            let fingerprints = command.compute()?;
            let dir = Path::new(&config.storage.filesystem.base_directory);
            std::fs::create_dir_all(dir).with_context(|| {
                format!("failed to create corpus directory: {}", dir.display())
            })?;

            let out_path = corpus_path(dir, &meta);
            let file = WfpFile::new(
                command.schema_id().encode(),
                meta.clone(),
                command.config().sample_rate,
                (meta.length_seconds * 1000.0) as u32,
            )
            .with_fingerprints(fingerprints);
            WfpWriter::write(&out_path, &file)?;
            (
                file.fingerprints.len(),
                out_path.display().to_string(),
            )
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
            let (_, stored) = ingest_track(&store, &meta, &command).await?;
            (stored, format!("postgresql://{}/{}", pg.host, pg.database))
        }
    };

    let elapsed = started.elapsed();
    log::info!("Stored {} fingerprints in {:.2}s", stored, elapsed.as_secs_f64());

    print_ingest_status(
        &args.audio,
        &meta.track_id,
        stored,
        elapsed.as_secs_f64(),
        &destination,
    );

    Ok(())
}

/// Track metadata from --meta JSON, or synthesized from the file name.
fn load_metadata(args: &Args) -> Result<TrackMetadata> {
    match &args.meta {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read metadata file: {}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse metadata JSON: {}", path))
        }
        None => {
            let stem = Path::new(&args.audio)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown")
                .to_string();
            Ok(TrackMetadata {
                track_id: stem.clone(),
                artist: String::new(),
                title: stem,
                album: None,
                release_year: None,
                length_seconds: args.seconds.unwrap_or(0.0),
            })
        }
    }
}
