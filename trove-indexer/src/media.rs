//! Capability interfaces for the external media services.
//!
//! Segmentation, transcription, and captioning all live outside this
//! process. The pipelines only depend on these traits, so tests swap in
//! [`MockSegmenter`], [`MockTranscriber`], and [`MockCaptioner`] without a
//! GPU in sight.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

/// One chunk of a segmented video: a slice of audio plus a representative
/// frame, with the chunk's wall-clock duration in seconds.
#[derive(Debug, Clone)]
pub struct VideoSegment {
    pub duration: f64,
    pub audio: Vec<u8>,
    pub frame: Vec<u8>,
}

/// Splits a video file into transcribable chunks.
#[async_trait]
pub trait VideoSegmenter: Send + Sync {
    async fn segment(&self, path: &Path) -> Result<Vec<VideoSegment>>;
}

/// Speech-to-text over a chunk's audio.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;
}

/// Vision captioning over raw image bytes.
#[async_trait]
pub trait Captioner: Send + Sync {
    async fn caption(&self, image: &[u8]) -> Result<String>;
}

/// Deterministic segmenter for tests: N fixed-length segments per file.
#[derive(Debug, Clone)]
pub struct MockSegmenter {
    pub segments: usize,
    pub segment_seconds: f64,
}

impl Default for MockSegmenter {
    fn default() -> Self {
        Self {
            segments: 2,
            segment_seconds: 30.0,
        }
    }
}

#[async_trait]
impl VideoSegmenter for MockSegmenter {
    async fn segment(&self, path: &Path) -> Result<Vec<VideoSegment>> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("video");
        Ok((0..self.segments)
            .map(|i| VideoSegment {
                duration: self.segment_seconds,
                audio: format!("{stem}-audio-{i}").into_bytes(),
                frame: format!("{stem}-frame-{i}").into_bytes(),
            })
            .collect())
    }
}

/// Echo transcriber: returns the audio bytes as text.
#[derive(Debug, Clone, Default)]
pub struct MockTranscriber;

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        Ok(String::from_utf8_lossy(audio).into_owned())
    }
}

/// Canned captioner: fixed prefix plus the image byte length.
#[derive(Debug, Clone, Default)]
pub struct MockCaptioner;

#[async_trait]
impl Captioner for MockCaptioner {
    async fn caption(&self, image: &[u8]) -> Result<String> {
        Ok(format!("an image ({} bytes)", image.len()))
    }
}
