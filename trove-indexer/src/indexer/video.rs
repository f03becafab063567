//! Video indexing: segment, transcribe, caption, store the chunk graph.
//!
//! Videos are processed one at a time. Each segment becomes a chunk record
//! linked to its video, with a transcript and a frame summary hanging off
//! the chunk, each with their own embeddings record.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use trove_store::{ops, ContentStore};

use crate::dedup::{hash_file, Deduplicator};
use crate::indexer::ItemOutcome;
use crate::media::{Captioner, Transcriber, VideoSegmenter};

/// Turns one video path into stored records.
#[async_trait]
pub trait VideoPipeline: Send + Sync {
    async fn index_video(&self, path: &Path) -> ItemOutcome;
}

/// The real pipeline: hash and dedup the file, then segment it and store
/// one chunk per segment with cumulative timing.
pub struct SegmentingVideoPipeline {
    store: Arc<dyn ContentStore>,
    segmenter: Arc<dyn VideoSegmenter>,
    transcriber: Arc<dyn Transcriber>,
    captioner: Arc<dyn Captioner>,
}

impl SegmentingVideoPipeline {
    pub fn new(
        store: Arc<dyn ContentStore>,
        segmenter: Arc<dyn VideoSegmenter>,
        transcriber: Arc<dyn Transcriber>,
        captioner: Arc<dyn Captioner>,
    ) -> Self {
        Self {
            store,
            segmenter,
            transcriber,
            captioner,
        }
    }

    async fn store_chunk(
        &self,
        video_id: &str,
        chunk_index: usize,
        start_time: f64,
        end_time: f64,
        transcript: &str,
        frame_summary: &str,
    ) -> anyhow::Result<()> {
        let chunk_id = format!("{video_id}-chunk-{chunk_index}");
        let store = self.store.as_ref();

        ops::create_chunk(store, video_id, &chunk_id, start_time, end_time, transcript).await?;
        ops::create_video_chunk_relationship(store, video_id, &chunk_id).await?;

        let transcript_id = format!("{chunk_id}-transcript");
        ops::create_transcript(store, &chunk_id, transcript).await?;
        ops::create_transcript_embeddings(store, &chunk_id, transcript).await?;
        ops::create_chunk_transcript_relationship(store, &chunk_id, &transcript_id).await?;

        let frame_summary_id = format!("{chunk_id}-frame");
        ops::create_frame_summary(store, &chunk_id, frame_summary).await?;
        ops::create_frame_summary_embeddings(store, &chunk_id, frame_summary).await?;
        ops::create_chunk_frame_summary_relationship(store, &chunk_id, &frame_summary_id).await?;

        Ok(())
    }
}

#[async_trait]
impl VideoPipeline for SegmentingVideoPipeline {
    async fn index_video(&self, path: &Path) -> ItemOutcome {
        let display_path = path.to_string_lossy().to_string();

        let content_hash = match hash_file(path).await {
            Ok(hash) => hash,
            Err(e) => {
                warn!("failed to hash video {display_path}: {e}");
                return ItemOutcome::failed(display_path, e.to_string());
            }
        };
        if Deduplicator::new(self.store.clone())
            .is_duplicate_video(&content_hash)
            .await
        {
            debug!("skipping video {display_path}: content already indexed");
            return ItemOutcome::duplicate(display_path);
        }

        let segments = match self.segmenter.segment(path).await {
            Ok(segments) => segments,
            Err(e) => {
                warn!("segmentation failed for {display_path}: {e}");
                return ItemOutcome::failed(display_path, e.to_string());
            }
        };
        if segments.is_empty() {
            warn!("segmentation produced no chunks for {display_path}");
            return ItemOutcome::failed(display_path, "video produced no segments".to_string());
        }

        let video_id = Uuid::new_v4().to_string();
        if let Err(e) = ops::create_video(
            self.store.as_ref(),
            &video_id,
            &content_hash,
            segments.len(),
            &display_path,
        )
        .await
        {
            warn!("failed to store video record for {display_path}: {e}");
            return ItemOutcome::failed(display_path, e.to_string());
        }

        // A failed chunk is logged and skipped; remaining chunks still land.
        let mut elapsed = 0.0;
        let mut stored = 0usize;
        for (index, segment) in segments.iter().enumerate() {
            let start_time = elapsed;
            elapsed += segment.duration;

            let transcript = match self.transcriber.transcribe(&segment.audio).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("transcription failed for {display_path} chunk {index}: {e}");
                    continue;
                }
            };
            let frame_summary = match self.captioner.caption(&segment.frame).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("captioning failed for {display_path} chunk {index}: {e}");
                    continue;
                }
            };

            match self
                .store_chunk(&video_id, index, start_time, elapsed, &transcript, &frame_summary)
                .await
            {
                Ok(()) => stored += 1,
                Err(e) => warn!("failed to store chunk {index} of {display_path}: {e}"),
            }
        }

        if stored == 0 {
            return ItemOutcome::failed(display_path, "no chunks could be stored".to_string());
        }
        ItemOutcome::indexed(display_path, video_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MockCaptioner, MockSegmenter, MockTranscriber};
    use serde_json::json;
    use tempfile::tempdir;
    use trove_store::MockStore;

    fn pipeline(store: Arc<MockStore>, segments: usize) -> SegmentingVideoPipeline {
        SegmentingVideoPipeline::new(
            store,
            Arc::new(MockSegmenter {
                segments,
                segment_seconds: 30.0,
            }),
            Arc::new(MockTranscriber),
            Arc::new(MockCaptioner),
        )
    }

    #[tokio::test]
    async fn stores_one_chunk_graph_per_segment() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("talk.mp4");
        std::fs::write(&path, "video bytes").unwrap();

        let store = Arc::new(MockStore::new());
        let outcome = pipeline(store.clone(), 3).index_video(&path).await;

        assert!(outcome.indexed);
        assert_eq!(store.call_count("CreateVideo"), 1);
        assert_eq!(store.call_count("CreateChunk"), 3);
        assert_eq!(store.call_count("CreateVideoToChunkRelationship"), 3);
        assert_eq!(store.call_count("CreateTranscriptEmbeddings"), 3);
        assert_eq!(store.call_count("CreateFrameSummaryEmbeddings"), 3);
    }

    #[tokio::test]
    async fn chunk_times_are_cumulative() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("talk.mp4");
        std::fs::write(&path, "video bytes").unwrap();

        let store = Arc::new(MockStore::new());
        pipeline(store.clone(), 2).index_video(&path).await;

        let chunk_calls: Vec<_> = store
            .calls()
            .into_iter()
            .filter(|(op, _)| op == "CreateChunk")
            .collect();
        assert_eq!(chunk_calls[0].1["start_time"], json!(0.0));
        assert_eq!(chunk_calls[0].1["end_time"], json!(30.0));
        assert_eq!(chunk_calls[1].1["start_time"], json!(30.0));
        assert_eq!(chunk_calls[1].1["end_time"], json!(60.0));
    }

    #[tokio::test]
    async fn known_hash_skips_segmentation_entirely() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("talk.mp4");
        std::fs::write(&path, "seen before").unwrap();

        let store = Arc::new(MockStore::new());
        let hash = crate::dedup::hash_file(&path).await.unwrap();
        store.insert_video(&hash, json!({"video_id": "existing"}));

        let outcome = pipeline(store.clone(), 2).index_video(&path).await;

        assert!(outcome.is_duplicate());
        assert_eq!(store.call_count("CreateVideo"), 0);
        assert_eq!(store.call_count("CreateChunk"), 0);
    }

    #[tokio::test]
    async fn chunk_store_failure_fails_item_only_when_nothing_lands() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("talk.mp4");
        std::fs::write(&path, "video bytes").unwrap();

        let store = Arc::new(MockStore::new());
        store.fail_operation("CreateChunk");

        let outcome = pipeline(store.clone(), 2).index_video(&path).await;
        assert!(!outcome.indexed);
        assert!(outcome.error.is_some());
    }
}
