//! Mediaport CLI: upload local files through the concurrent pipeline.
//!
//! Reads MEDIAPORT_* settings from the environment (or a `.env` file). Progress
//! lines go to stderr, the final summary is printed as JSON on stdout.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use mediaport_api_client::{ApiClient, HttpTransport};
use mediaport_cli::{init_tracing, progress_line, UploadSummary};
use mediaport_core::{ByteSource, FileSource, HashStrategy, UploaderConfig};
use mediaport_processing::{
    FingerprintEngine, ImageTranscoder, PassthroughTranscoder, PayloadTranscoder,
};
use mediaport_worker::{UploadContext, UploadRequest, UploadScheduler};

#[derive(Parser)]
#[command(name = "mediaport", about = "Concurrent media uploader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload one or more files
    Upload {
        /// Paths of the files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Override MEDIAPORT_MAX_CONCURRENT
        #[arg(long)]
        max_concurrent: Option<usize>,
        /// Send original bytes without re-encoding images
        #[arg(long)]
        no_transcode: bool,
    },
    /// Print the dedup fingerprint of a file
    Fingerprint {
        /// Path to the file
        file: PathBuf,
        /// sampled or streaming (defaults to MEDIAPORT_HASH_STRATEGY)
        #[arg(long)]
        strategy: Option<String>,
    },
}

#[derive(Serialize)]
struct FingerprintOutput {
    file: String,
    size_bytes: u64,
    strategy: HashStrategy,
    fingerprint: String,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", s);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let mut config = UploaderConfig::from_env().context("Load MEDIAPORT_* configuration")?;

    match cli.command {
        Commands::Upload {
            files,
            max_concurrent,
            no_transcode,
        } => {
            if let Some(n) = max_concurrent {
                config.max_concurrent = n;
            }
            if no_transcode {
                config.transcode_enabled = false;
            }
            config.validate()?;
            upload(&config, files).await
        }
        Commands::Fingerprint { file, strategy } => {
            if let Some(raw) = strategy {
                config.hash_strategy = HashStrategy::parse(&raw)?;
            }
            fingerprint(&config, file).await
        }
    }
}

async fn upload(config: &UploaderConfig, files: Vec<PathBuf>) -> anyhow::Result<()> {
    let registry = Arc::new(ApiClient::from_config(config).context("Create API client")?);
    let transport = Arc::new(HttpTransport::new().context("Create transfer client")?);
    let transcoder: Arc<dyn PayloadTranscoder> = if config.transcode_enabled {
        Arc::new(ImageTranscoder::from_config(config))
    } else {
        Arc::new(PassthroughTranscoder)
    };

    let context = UploadContext::new(registry, transport, transcoder);
    let scheduler = UploadScheduler::new(config, context);
    let mut events = scheduler.subscribe();

    let mut requests = Vec::with_capacity(files.len());
    for path in &files {
        let request = UploadRequest::from_path(path)
            .await
            .with_context(|| format!("Open {}", path.display()))?;
        requests.push(request);
    }
    let filenames: Vec<String> = requests.iter().map(|r| r.filename.clone()).collect();
    let ids = scheduler.submit(requests);
    let names: HashMap<_, _> = ids.into_iter().zip(filenames).collect();

    tracing::info!(
        files = names.len(),
        max_concurrent = scheduler.max_concurrent(),
        "Upload batch started"
    );

    let idle = scheduler.wait_idle();
    tokio::pin!(idle);
    loop {
        tokio::select! {
            _ = &mut idle => break,
            event = events.recv() => match event {
                Ok(event) => {
                    let name = names.get(&event.task_id).map(String::as_str).unwrap_or("?");
                    eprintln!("{}", progress_line(name, &event));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Progress output fell behind");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    while let Ok(event) = events.try_recv() {
        let name = names.get(&event.task_id).map(String::as_str).unwrap_or("?");
        eprintln!("{}", progress_line(name, &event));
    }

    let summary = UploadSummary::from_tasks(scheduler.tasks());
    let failed = summary.failed;
    print_json(&summary)?;
    if failed > 0 {
        anyhow::bail!("{} of {} uploads failed", failed, names.len());
    }
    Ok(())
}

async fn fingerprint(config: &UploaderConfig, file: PathBuf) -> anyhow::Result<()> {
    let source = FileSource::open(&file)
        .await
        .with_context(|| format!("Open {}", file.display()))?;
    let engine = FingerprintEngine::from_config(config);
    let fingerprint = engine
        .fingerprint(&source)
        .await
        .with_context(|| format!("Read {}", file.display()))?;

    print_json(&FingerprintOutput {
        file: source.filename(),
        size_bytes: source.total_length(),
        strategy: config.hash_strategy,
        fingerprint: fingerprint.as_str().to_string(),
    })
}
