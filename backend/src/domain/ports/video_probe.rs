//! Port deriving duration and resolution metadata from an uploaded video.
use async_trait::async_trait;

/// Metadata attached to a movie from its video.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoMetadata {
    pub duration_seconds: u32,
    pub resolutions: Vec<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoProbe: Send + Sync {
    /// Inspect `bytes`; `declared_duration` is the uploader's claim, if any.
    async fn probe(&self, bytes: &[u8], declared_duration: Option<u32>) -> VideoMetadata;
}

/// Probe that trusts the declared duration and reports no resolutions.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclaredVideoProbe;

#[async_trait]
impl VideoProbe for DeclaredVideoProbe {
    async fn probe(&self, _bytes: &[u8], declared_duration: Option<u32>) -> VideoMetadata {
        VideoMetadata {
            duration_seconds: declared_duration.unwrap_or_default(),
            resolutions: Vec::new(),
        }
    }
}
