use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use trove_indexer::indexer::image::CaptionImagePipeline;
use trove_indexer::indexer::video::SegmentingVideoPipeline;
use trove_indexer::media::{MockCaptioner, MockSegmenter, MockTranscriber};
use trove_indexer::{IndexerConfig, JobTracker, Orchestrator, WalkScanner, DEFAULT_BATCH_SIZE};
use trove_search::SearchEngine;
use trove_store::{HttpStore, StoreConfig};

/// Index directories into the trove content store and search across them.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the content store backend
    #[arg(long, default_value = "http://127.0.0.1:7003")]
    store_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Index all text, video, and image files under a directory
    Index {
        /// Root directory to index
        directory: PathBuf,
        /// Files per text-scan batch
        #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Extension-to-category mapping document
        #[arg(long, default_value = "config/file_types.json")]
        file_types: PathBuf,
        /// Ignore-policy document
        #[arg(long, default_value = "config/ignore.json")]
        ignore: PathBuf,
    },
    /// Search indexed content across all modalities
    Search {
        /// Free-text query
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let store = Arc::new(HttpStore::new(StoreConfig::new(args.store_url)));

    match args.command {
        Commands::Index {
            directory,
            batch_size,
            file_types,
            ignore,
        } => {
            let config = IndexerConfig::default()
                .with_file_types_path(file_types)
                .with_ignore_path(ignore)
                .with_batch_size(batch_size);
            let (classification, ignore) = config.load_documents();
            let tracker = JobTracker::new();

            // Stand-in media services; real transcription and captioning
            // run out of process.
            let video_pipeline = Arc::new(SegmentingVideoPipeline::new(
                store.clone(),
                Arc::new(MockSegmenter::default()),
                Arc::new(MockTranscriber),
                Arc::new(MockCaptioner),
            ));
            let image_pipeline =
                Arc::new(CaptionImagePipeline::new(store.clone(), Arc::new(MockCaptioner)));

            let orchestrator = Orchestrator::new(
                store,
                tracker.clone(),
                Arc::new(WalkScanner::new()),
                video_pipeline,
                image_pipeline,
                Arc::new(classification),
                Arc::new(ignore),
                config.batch_size,
            );

            let job_id = orchestrator.start_job(&directory)?;
            let record = loop {
                tokio::time::sleep(Duration::from_millis(200)).await;
                match tracker.get(&job_id) {
                    Some(record) if record.is_terminal() => break record,
                    Some(_) => {}
                    None => {
                        eprintln!("job {job_id} vanished from the tracker");
                        process::exit(1);
                    }
                }
            };

            println!("{}", serde_json::to_string_pretty(&record)?);
            if record.status == trove_indexer::JobStatus::Failed {
                process::exit(1);
            }
        }
        Commands::Search { query } => {
            let response = SearchEngine::new(store).search(&query).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
