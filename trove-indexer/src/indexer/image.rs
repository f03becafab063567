//! Image indexing: caption each image and store it with embeddings.
//!
//! The whole discovered batch is handed over at once; the pipeline reports
//! one outcome per image, marking dedup hits with the duplicate-hash
//! error so the orchestrator can count them as skips.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use trove_store::{ops, ContentStore};

use crate::dedup::{hash_file, Deduplicator};
use crate::indexer::ItemOutcome;
use crate::media::Captioner;

/// Turns a batch of image paths into stored records.
#[async_trait]
pub trait ImagePipeline: Send + Sync {
    async fn index_images(&self, paths: Vec<PathBuf>) -> Vec<ItemOutcome>;
}

pub struct CaptionImagePipeline {
    store: Arc<dyn ContentStore>,
    captioner: Arc<dyn Captioner>,
}

impl CaptionImagePipeline {
    pub fn new(store: Arc<dyn ContentStore>, captioner: Arc<dyn Captioner>) -> Self {
        Self { store, captioner }
    }

    async fn index_one(&self, path: &PathBuf) -> ItemOutcome {
        let display_path = path.to_string_lossy().to_string();

        let content_hash = match hash_file(path).await {
            Ok(hash) => hash,
            Err(e) => {
                warn!("failed to hash image {display_path}: {e}");
                return ItemOutcome::failed(display_path, e.to_string());
            }
        };
        if Deduplicator::new(self.store.clone())
            .is_duplicate_file(&content_hash)
            .await
        {
            debug!("skipping image {display_path}: content already indexed");
            return ItemOutcome::duplicate(display_path);
        }

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to read image {display_path}: {e}");
                return ItemOutcome::failed(display_path, e.to_string());
            }
        };
        let caption = match self.captioner.caption(&bytes).await {
            Ok(caption) => caption,
            Err(e) => {
                warn!("captioning failed for {display_path}: {e}");
                return ItemOutcome::failed(display_path, e.to_string());
            }
        };

        let image_id = Uuid::new_v4().to_string();
        if let Err(e) = ops::create_image(
            self.store.as_ref(),
            &image_id,
            &content_hash,
            &caption,
            &display_path,
        )
        .await
        {
            warn!("failed to store image {display_path}: {e}");
            return ItemOutcome::failed(display_path, e.to_string());
        }
        if let Err(e) =
            ops::create_image_embeddings(self.store.as_ref(), &image_id, &caption, &display_path).await
        {
            warn!("failed to store image embeddings for {display_path}: {e}");
            return ItemOutcome::failed(display_path, e.to_string());
        }

        ItemOutcome::indexed(display_path, image_id)
    }
}

#[async_trait]
impl ImagePipeline for CaptionImagePipeline {
    async fn index_images(&self, paths: Vec<PathBuf>) -> Vec<ItemOutcome> {
        let mut outcomes = Vec::with_capacity(paths.len());
        for path in &paths {
            outcomes.push(self.index_one(path).await);
        }
        outcomes
    }
}
