//! Normalizers that flatten the loosely-shaped backend search responses.
//!
//! Each search backend wraps its hits differently: sometimes a bare list,
//! sometimes a dict with a backend-specific key (`chunks`, `images`,
//! `transcript_videos`/`frame_videos`), sometimes a list of dicts each
//! holding a nested `text` list. The normalizers here are total functions:
//! any shape they do not recognize produces an empty list, never an error.
//!
//! An entry is usable only if it carries at least one of an id field,
//! `content`, or `path`; everything else is discarded.

use serde::Serialize;
use serde_json::Value;

/// Which search backend produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    File,
    Video,
    Image,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::File => "file",
            Modality::Video => "video",
            Modality::Image => "image",
        }
    }
}

/// One normalized cross-modality search result.
///
/// Produced fresh per query, never persisted. `rank`, `score` and `source`
/// are filled in by the fusion pass; the normalizers only populate the
/// identity fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub label: Modality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    pub content: Option<String>,
    pub path: Option<String>,
    pub rank: usize,
    pub score: f64,
    pub source: Modality,
}

impl SearchHit {
    fn new(label: Modality) -> Self {
        Self {
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
}

/// Non-empty string field of a JSON object, if present.
pub(crate) fn get_str(entry: &Value, key: &str) -> Option<String> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Unwrap the `{"text": [..]}` nesting some backends add around entries.
fn unwrap_text_entries(item: &Value) -> Vec<&Value> {
    match item.get("text") {
        Some(Value::Array(entries)) => entries.iter().collect(),
        _ => vec![item],
    }
}

/// Flatten a response that is either a dict keyed by `key`, a list whose
/// elements may each hold a `key` list, or a single bare entry.
pub(crate) fn collect_keyed_items<'a>(response: &'a Value, key: &str) -> Vec<&'a Value> {
    match response {
        Value::Object(_) => match response.get(key) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(_) => Vec::new(),
            None => vec![response],
        },
        Value::Array(entries) => {
            let mut items = Vec::new();
            for entry in entries {
                match entry.get(key) {
                    Some(Value::Array(nested)) => items.extend(nested.iter()),
                    Some(_) => {}
                    None => items.push(entry),
                }
            }
            items
        }
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Normalize a `SearchFileEmbeddings` response.
pub fn normalize_file_results(response: &Value) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for item in collect_keyed_items(response, "chunks") {
        for entry in unwrap_text_entries(item) {
            if !entry.is_object() {
                continue;
            }
            let file_id = get_str(entry, "file_id").or_else(|| get_str(entry, "id"));
            let content = get_str(entry, "content");
            let path = get_str(entry, "path");
            if file_id.is_none() && content.is_none() && path.is_none() {
                continue;
            }
            let mut hit = SearchHit::new(Modality::File);
            hit.file_id = file_id;
            hit.content = content;
            hit.path = path;
            hits.push(hit);
        }
    }
    hits
}

/// Recursively collect video entries: any object carrying at least one of
/// the recognized keys is an entry; other objects and lists are descended.
fn collect_video_entries<'a>(value: &'a Value, entries: &mut Vec<&'a Value>) {
    const ENTRY_KEYS: [&str; 5] = ["chunk_id", "video_id", "file_id", "path", "content"];
    match value {
        Value::Array(items) => {
            for item in items {
                collect_video_entries(item, entries);
            }
        }
        Value::Object(map) => {
            if ENTRY_KEYS.iter().any(|key| map.contains_key(*key)) {
                entries.push(value);
            } else {
                for nested in map.values() {
                    collect_video_entries(nested, entries);
                }
            }
        }
        _ => {}
    }
}

/// Normalize a `SearchTranscriptAndFrameEmbeddings` response.
///
/// Prefers the explicit `transcript_videos`/`frame_videos` lists when the
/// backend provides them, otherwise falls back to the recursive unwrap.
/// Deduplicates within the modality by `(video_id, chunk_id, file_id, path)`.
pub fn normalize_video_results(response: &Value) -> Vec<SearchHit> {
    let mut entries: Vec<&Value> = Vec::new();
    match response {
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("transcript_videos") {
                entries.extend(items.iter());
            }
            if let Some(Value::Array(items)) = map.get("frame_videos") {
                entries.extend(items.iter());
            }
            if entries.is_empty() {
                collect_video_entries(response, &mut entries);
            }
        }
        Value::Array(_) => collect_video_entries(response, &mut entries),
        _ => return Vec::new(),
    }

    let mut hits = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for entry in entries {
        if !entry.is_object() {
            continue;
        }
        let chunk_id = get_str(entry, "chunk_id");
        let video_id = get_str(entry, "video_id");
        let file_id = get_str(entry, "file_id").or_else(|| get_str(entry, "id"));
        let content = get_str(entry, "content");
        let path = get_str(entry, "path");
        if chunk_id.is_none()
            && video_id.is_none()
            && file_id.is_none()
            && content.is_none()
            && path.is_none()
        {
            continue;
        }
        let key = (
            video_id.clone(),
            chunk_id.clone(),
            file_id.clone(),
            path.clone(),
        );
        if !seen.insert(key) {
            continue;
        }
        let mut hit = SearchHit::new(Modality::Video);
        hit.chunk_id = chunk_id;
        hit.video_id = video_id;
        hit.file_id = file_id;
        hit.content = content;
        hit.path = path;
        hits.push(hit);
    }
    hits
}

/// Normalize a `SearchImageEmbeddings` response.
///
/// Deduplicates within the modality by `(image_id, path)`.
pub fn normalize_image_results(response: &Value) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for item in collect_keyed_items(response, "images") {
        for entry in unwrap_text_entries(item) {
            if !entry.is_object() {
                continue;
            }
            let image_id = get_str(entry, "image_id").or_else(|| get_str(entry, "id"));
            let content = get_str(entry, "content");
            let path = get_str(entry, "path");
            if image_id.is_none() && content.is_none() && path.is_none() {
                continue;
            }
            if !seen.insert((image_id.clone(), path.clone())) {
                continue;
            }
            let mut hit = SearchHit::new(Modality::Image);
            hit.image_id = image_id;
            hit.content = content;
            hit.path = path;
            hits.push(hit);
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_results_unwrap_chunks_and_text_nesting() {
        let response = json!([
            { "chunks": [ { "text": [ { "file_id": "f1", "content": "hello", "path": "/a" } ] } ] },
            { "file_id": "f2", "content": "plain entry" },
        ]);
        let hits = normalize_file_results(&response);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].file_id.as_deref(), Some("f1"));
        assert_eq!(hits[1].file_id.as_deref(), Some("f2"));
    }

    #[test]
    fn file_results_discard_entries_with_no_identity() {
        let response = json!([{ "irrelevant": true }, { "content": "keep me" }]);
        let hits = normalize_file_results(&response);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content.as_deref(), Some("keep me"));
    }

    #[test]
    fn video_results_prefer_explicit_lists() {
        let response = json!({
            "transcript_videos": [ { "chunk_id": "c1", "video_id": "v1" } ],
            "frame_videos": [ { "chunk_id": "c2", "video_id": "v1" } ],
        });
        let hits = normalize_video_results(&response);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.label == Modality::Video));
    }

    #[test]
    fn video_results_fall_back_to_recursive_unwrap() {
        let response = json!([
            { "results": { "inner": [ { "chunk_id": "c1", "path": "/v.mp4" } ] } }
        ]);
        let hits = normalize_video_results(&response);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id.as_deref(), Some("c1"));
    }

    #[test]
    fn video_results_dedup_within_modality() {
        let response = json!([
            { "chunk_id": "c1", "video_id": "v1", "path": "/v.mp4" },
            { "chunk_id": "c1", "video_id": "v1", "path": "/v.mp4" },
        ]);
        assert_eq!(normalize_video_results(&response).len(), 1);
    }

    #[test]
    fn image_results_accept_id_alias_and_dedup() {
        let response = json!({ "images": [
            { "id": "i1", "path": "/p.png" },
            { "image_id": "i1", "path": "/p.png" },
            { "image_id": "i2", "content": "a red door" },
        ]});
        let hits = normalize_image_results(&response);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].image_id.as_deref(), Some("i1"));
    }

    #[test]
    fn unrecognized_shapes_produce_empty_lists() {
        assert!(normalize_file_results(&json!(42)).is_empty());
        assert!(normalize_video_results(&json!("nope")).is_empty());
        assert!(normalize_image_results(&Value::Null).is_empty());
    }
}
