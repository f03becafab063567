//! The fusion engine: concurrent backend fan-out, reciprocal-rank scoring,
//! and cross-modality merge.

use std::sync::Arc;

use itertools::Itertools;
use serde::Serialize;
use tracing::warn;

use trove_store::{ContentStore, ops};

use std::collections::HashMap;

use crate::normalize::{
    Modality, SearchHit, collect_keyed_items, get_str, normalize_file_results,
    normalize_image_results, normalize_video_results,
};

/// Reciprocal-rank fusion constant: base score is `1 / (rank + K)`.
const RRF_K: f64 = 60.0;

/// Multiplier applied when a hit's content or path contains a query token.
const KEYWORD_BOOST: f64 = 1.2;

/// A fused, deduplicated, ordered result set for one query.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
}

/// Issues the three per-modality searches and merges their results.
///
/// A failing backend contributes zero hits and a warning; it never fails
/// the query. The three calls run concurrently, so a slow backend delays the
/// merge but not its siblings.
#[derive(Clone)]
pub struct SearchEngine {
    store: Arc<dyn ContentStore>,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Run one multi-modal query and fuse the results.
    pub async fn search(&self, query: &str) -> SearchResponse {
        let store = self.store.as_ref();
        let (file_response, video_response, image_response) = tokio::join!(
            ops::search_file_embeddings(store, query),
            ops::search_transcript_and_frame_embeddings(store, query),
            ops::search_image_embeddings(store, query),
        );

        let file_hits = match file_response {
            Ok(response) => normalize_file_results(&response),
            Err(e) => {
                warn!("file search failed: {e}");
                Vec::new()
            }
        };
        let mut video_hits = match video_response {
            Ok(response) => normalize_video_results(&response),
            Err(e) => {
                warn!("video search failed: {e}");
                Vec::new()
            }
        };
        self.enrich_video_paths(&mut video_hits).await;
        let image_hits = match image_response {
            Ok(response) => normalize_image_results(&response),
            Err(e) => {
                warn!("image search failed: {e}");
                Vec::new()
            }
        };

        SearchResponse {
            query: query.to_string(),
            results: fuse(query, file_hits, video_hits, image_hits),
        }
    }

    /// Fill in missing video hit paths from the chunk and video catalogs.
    ///
    /// The video backend returns chunk-level entries that often omit the
    /// owning video's path; resolve chunk -> video -> path through the
    /// catalog operations. Best effort: a catalog failure leaves the hits
    /// as returned.
    async fn enrich_video_paths(&self, hits: &mut [SearchHit]) {
        if !hits.iter().any(|hit| hit.path.is_none()) {
            return;
        }
        let store = self.store.as_ref();
        let (chunks, videos) = tokio::join!(ops::get_all_chunks(store), ops::get_all_videos(store));
        let (chunks, videos) = match (chunks, videos) {
            (Ok(chunks), Ok(videos)) => (chunks, videos),
            (Err(e), _) | (_, Err(e)) => {
                warn!("video catalog unavailable, leaving hit paths unresolved: {e}");
                return;
            }
        };

        let mut chunk_to_video: HashMap<String, String> = HashMap::new();
        for entry in collect_keyed_items(&chunks, "chunks") {
            if let (Some(chunk_id), Some(video_id)) =
                (get_str(entry, "chunk_id"), get_str(entry, "video_id"))
            {
                chunk_to_video.insert(chunk_id, video_id);
            }
        }
        let mut video_paths: HashMap<String, String> = HashMap::new();
        for entry in collect_keyed_items(&videos, "videos") {
            if let (Some(video_id), Some(path)) = (get_str(entry, "video_id"), get_str(entry, "path"))
            {
                video_paths.insert(video_id, path);
            }
        }

        for hit in hits.iter_mut().filter(|hit| hit.path.is_none()) {
            let video_id = hit.video_id.clone().or_else(|| {
                hit.chunk_id
                    .as_ref()
                    .and_then(|chunk_id| chunk_to_video.get(chunk_id).cloned())
            });
            if let Some(video_id) = video_id {
                hit.path = video_paths.get(&video_id).cloned();
                if hit.video_id.is_none() {
                    hit.video_id = Some(video_id);
                }
            }
        }
    }
}

/// True when any whitespace token of the lowercased query occurs in the
/// hit's lowercased content or path.
fn has_keyword_match(hit: &SearchHit, tokens: &[String]) -> bool {
    if tokens.is_empty() {
        return false;
    }
    let content = hit.content.as_deref().unwrap_or("").to_lowercase();
    let path = hit.path.as_deref().unwrap_or("").to_lowercase();
    tokens
        .iter()
        .any(|token| content.contains(token.as_str()) || path.contains(token.as_str()))
}

/// Rank one modality's hits in backend order (assumed relevance-ordered)
/// and assign reciprocal-rank scores with the keyword boost.
fn attach_rank_scores(hits: &mut [SearchHit], source: Modality, tokens: &[String]) {
    for (index, hit) in hits.iter_mut().enumerate() {
        let rank = index + 1;
        hit.rank = rank;
        let mut score = 1.0 / (rank as f64 + RRF_K);
        if has_keyword_match(hit, tokens) {
            score *= KEYWORD_BOOST;
        }
        hit.score = score;
        hit.source = source;
    }
}

/// Merge the three scored modality lists into one ordered, deduplicated list.
///
/// Sorts descending by `(score, is_video)`, with ties going to video hits, then
/// keeps the first occurrence of each composite identity key.
pub fn fuse(
    query: &str,
    mut file_hits: Vec<SearchHit>,
    mut video_hits: Vec<SearchHit>,
    mut image_hits: Vec<SearchHit>,
) -> Vec<SearchHit> {
    let tokens: Vec<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    attach_rank_scores(&mut file_hits, Modality::File, &tokens);
    attach_rank_scores(&mut video_hits, Modality::Video, &tokens);
    attach_rank_scores(&mut image_hits, Modality::Image, &tokens);

    let mut combined: Vec<SearchHit> = file_hits;
    combined.extend(video_hits);
    combined.extend(image_hits);

    combined.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                let a_video = a.source == Modality::Video;
                let b_video = b.source == Modality::Video;
                b_video.cmp(&a_video)
            })
    });

    combined
        .into_iter()
        .unique_by(|hit| {
            (
                hit.label,
                hit.file_id.clone().or_else(|| hit.chunk_id.clone()),
                hit.video_id.clone(),
                hit.image_id.clone(),
                hit.path.clone(),
                hit.content.clone(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(label: Modality, content: Option<&str>, path: Option<&str>) -> SearchHit {
        let mut hit = match label {
            Modality::File => {
                let mut h = base(label);
                h.file_id = Some("f".into());
                h
            }
            Modality::Video => {
                let mut h = base(label);
                h.chunk_id = Some("c".into());
                h
            }
            Modality::Image => {
                let mut h = base(label);
                h.image_id = Some("i".into());
                h
            }
        };
        hit.content = content.map(str::to_string);
        hit.path = path.map(str::to_string);
        hit
    }

    fn base(label: Modality) -> SearchHit {
        SearchHit {
            label,
            file_id: None,
            chunk_id: None,
            video_id: None,
            image_id: None,
            content: None,
            path: None,
            rank: 0,
            score: 0.0,
            source: label,
        }
    }

    #[test]
    fn earlier_rank_scores_higher() {
        let first = hit(Modality::File, Some("alpha"), None);
        let second = hit(Modality::File, Some("beta"), None);
        let results = fuse("unrelated", vec![first, second], Vec::new(), Vec::new());
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[1].rank, 2);
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn keyword_match_outscores_identical_rank() {
        let mut matching = hit(Modality::File, Some("the founders dinner"), None);
        matching.file_id = Some("f1".into());
        let mut other = hit(Modality::Image, Some("nothing relevant"), None);
        other.image_id = Some("i1".into());

        // Both rank 1 in their own modality; only one matches the query.
        let results = fuse("founders", vec![matching], Vec::new(), vec![other]);
        assert_eq!(results[0].content.as_deref(), Some("the founders dinner"));
        assert!(results[0].score > results[1].score);
        assert!((results[0].score - KEYWORD_BOOST / 61.0).abs() < 1e-12);
    }

    #[test]
    fn keyword_match_applies_to_path_too() {
        let by_path = hit(Modality::File, None, Some("/notes/founders.md"));
        let results = fuse("founders", vec![by_path], Vec::new(), Vec::new());
        assert!((results[0].score - KEYWORD_BOOST / 61.0).abs() < 1e-12);
    }

    #[test]
    fn score_ties_break_in_favor_of_video() {
        let file = hit(Modality::File, Some("x"), None);
        let mut video = hit(Modality::Video, None, None);
        video.content = Some("y".into());
        let image = hit(Modality::Image, Some("z"), None);

        // All rank 1, no keyword matches, identical scores.
        let results = fuse("unrelated", vec![file], vec![video], vec![image]);
        assert_eq!(results[0].source, Modality::Video);
    }

    #[test]
    fn dedup_keeps_earlier_ranked_copy() {
        let a = hit(Modality::File, Some("same"), Some("/same"));
        let b = hit(Modality::File, Some("same"), Some("/same"));
        let results = fuse("unrelated", vec![a, b], Vec::new(), Vec::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rank, 1);
    }

    #[test]
    fn distinct_paths_survive_dedup() {
        let a = hit(Modality::File, Some("same"), Some("/one"));
        let b = hit(Modality::File, Some("same"), Some("/two"));
        let results = fuse("unrelated", vec![a, b], Vec::new(), Vec::new());
        assert_eq!(results.len(), 2);
    }
}
