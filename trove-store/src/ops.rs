//! Typed wrappers for the named operations the indexer and search layers use.
//!
//! Each wrapper builds the flat parameter mapping for one backend operation
//! and hands back the raw (or minimally unwrapped) JSON. Write operations
//! return the backend response untouched; the by-hash lookups unwrap the
//! handful of shapes the backend is known to produce.

use serde_json::{Value, json};

use crate::client::ContentStore;
use crate::error::Result;

/// Store a raw text-file record.
pub async fn create_file(
    store: &dyn ContentStore,
    file_id: &str,
    content_hash: &str,
    content: &str,
    path: &str,
) -> Result<Value> {
    store
        .query(
            "CreateFile",
            json!({
                "file_id": file_id,
                "content_hash": content_hash,
                "content": content,
                "path": path,
            }),
        )
        .await
}

/// Create and attach the embeddings record for a stored file.
///
/// Depends on the `CreateFile` record already existing.
pub async fn create_file_embeddings(
    store: &dyn ContentStore,
    file_id: &str,
    content: &str,
    path: &str,
) -> Result<Value> {
    store
        .query(
            "CreateFileEmbeddings",
            json!({ "file_id": file_id, "content": content, "path": path }),
        )
        .await
}

/// Look up an existing file record by content hash.
///
/// The backend wraps the record inconsistently: sometimes `{"file": [..]}`,
/// sometimes `{"file": {..}}`, sometimes a bare list. All of those unwrap
/// to the first record; anything else is `None`.
pub async fn get_file_by_hash(store: &dyn ContentStore, content_hash: &str) -> Result<Option<Value>> {
    let response = store
        .query("GetFileByHash", json!({ "content_hash": content_hash }))
        .await?;
    Ok(unwrap_single_record(response, "file"))
}

/// Look up an existing video record by content hash.
pub async fn get_video_by_hash(store: &dyn ContentStore, content_hash: &str) -> Result<Option<Value>> {
    let response = store
        .query("GetVideoByHash", json!({ "content_hash": content_hash }))
        .await?;
    Ok(unwrap_single_record(response, "video"))
}

/// Store an image record; `content` carries the structured caption summary.
pub async fn create_image(
    store: &dyn ContentStore,
    image_id: &str,
    content_hash: &str,
    content: &str,
    path: &str,
) -> Result<Value> {
    store
        .query(
            "CreateImage",
            json!({
                "image_id": image_id,
                "content_hash": content_hash,
                "content": content,
                "path": path,
            }),
        )
        .await
}

/// Create and attach the embeddings record for a stored image.
pub async fn create_image_embeddings(
    store: &dyn ContentStore,
    image_id: &str,
    content: &str,
    path: &str,
) -> Result<Value> {
    store
        .query(
            "CreateImageEmbeddings",
            json!({ "image_id": image_id, "content": content, "path": path }),
        )
        .await
}

/// Store a video record with its segment count.
pub async fn create_video(
    store: &dyn ContentStore,
    video_id: &str,
    content_hash: &str,
    no_of_chunks: usize,
    path: &str,
) -> Result<Value> {
    store
        .query(
            "CreateVideo",
            json!({
                "video_id": video_id,
                "content_hash": content_hash,
                "no_of_chunks": no_of_chunks,
                "path": path,
            }),
        )
        .await
}

/// Store one video chunk with its time range and transcript text.
pub async fn create_chunk(
    store: &dyn ContentStore,
    video_id: &str,
    chunk_id: &str,
    start_time: f64,
    end_time: f64,
    transcript: &str,
) -> Result<Value> {
    store
        .query(
            "CreateChunk",
            json!({
                "video_id": video_id,
                "chunk_id": chunk_id,
                "start_time": start_time,
                "end_time": end_time,
                "transcript": transcript,
            }),
        )
        .await
}

/// Store the transcript node for a chunk.
pub async fn create_transcript(
    store: &dyn ContentStore,
    chunk_id: &str,
    content: &str,
) -> Result<Value> {
    store
        .query(
            "CreateTranscript",
            json!({ "chunk_id": chunk_id, "content": content }),
        )
        .await
}

/// Create and attach transcript embeddings to a chunk.
pub async fn create_transcript_embeddings(
    store: &dyn ContentStore,
    chunk_id: &str,
    content: &str,
) -> Result<Value> {
    store
        .query(
            "CreateTranscriptEmbeddings",
            json!({ "chunk_id": chunk_id, "content": content }),
        )
        .await
}

/// Store the frame-summary node for a chunk.
pub async fn create_frame_summary(
    store: &dyn ContentStore,
    chunk_id: &str,
    content: &str,
) -> Result<Value> {
    store
        .query(
            "CreateFrameSummary",
            json!({ "chunk_id": chunk_id, "content": content }),
        )
        .await
}

/// Create and attach frame-summary embeddings to a chunk.
pub async fn create_frame_summary_embeddings(
    store: &dyn ContentStore,
    chunk_id: &str,
    content: &str,
) -> Result<Value> {
    store
        .query(
            "CreateFrameSummaryEmbeddings",
            json!({ "chunk_id": chunk_id, "content": content }),
        )
        .await
}

/// Connect a video record to one of its chunks.
pub async fn create_video_chunk_relationship(
    store: &dyn ContentStore,
    video_id: &str,
    chunk_id: &str,
) -> Result<Value> {
    store
        .query(
            "CreateVideoToChunkRelationship",
            json!({ "video_id": video_id, "chunk_id": chunk_id }),
        )
        .await
}

/// Connect a chunk to its transcript node.
pub async fn create_chunk_transcript_relationship(
    store: &dyn ContentStore,
    chunk_id: &str,
    transcript_id: &str,
) -> Result<Value> {
    store
        .query(
            "CreateChunkToTranscriptRelationship",
            json!({ "chunk_id": chunk_id, "transcript_id": transcript_id }),
        )
        .await
}

/// Connect a chunk to its frame-summary node.
pub async fn create_chunk_frame_summary_relationship(
    store: &dyn ContentStore,
    chunk_id: &str,
    frame_summary_id: &str,
) -> Result<Value> {
    store
        .query(
            "CreateChunkToFrameSummaryRelationship",
            json!({ "chunk_id": chunk_id, "frame_summary_id": frame_summary_id }),
        )
        .await
}

/// Semantic search over file embeddings. Raw backend shape.
pub async fn search_file_embeddings(store: &dyn ContentStore, query: &str) -> Result<Value> {
    store
        .query("SearchFileEmbeddings", json!({ "search_text": query }))
        .await
}

/// Combined semantic search over transcript and frame-summary embeddings.
pub async fn search_transcript_and_frame_embeddings(
    store: &dyn ContentStore,
    query: &str,
) -> Result<Value> {
    store
        .query(
            "SearchTranscriptAndFrameEmbeddings",
            json!({ "search_text": query }),
        )
        .await
}

/// Semantic search over image embeddings. Raw backend shape.
pub async fn search_image_embeddings(store: &dyn ContentStore, query: &str) -> Result<Value> {
    store
        .query("SearchImageEmbeddings", json!({ "search_text": query }))
        .await
}

/// Fetch every chunk record (used to map chunks back to their videos).
pub async fn get_all_chunks(store: &dyn ContentStore) -> Result<Value> {
    store.query("GetAllChunks", json!({})).await
}

/// Fetch every video record.
pub async fn get_all_videos(store: &dyn ContentStore) -> Result<Value> {
    store.query("GetAllVideos", json!({})).await
}

/// Unwrap a single record from the loose shapes the backend produces for
/// point lookups: a dict keyed by `key` holding a list or an object, a bare
/// list, or a JSON-encoded string of either.
fn unwrap_single_record(response: Value, key: &str) -> Option<Value> {
    let response = match response {
        Value::String(s) => serde_json::from_str(&s).ok()?,
        other => other,
    };

    match response {
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(mut items)) => {
                if items.is_empty() {
                    None
                } else {
                    Some(items.remove(0))
                }
            }
            Some(record @ Value::Object(_)) => Some(record),
            _ => None,
        },
        Value::Array(mut items) => {
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        }
        _ => None,
    }
}
