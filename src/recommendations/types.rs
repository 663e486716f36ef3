//! Data types for the recommendation cascade.

use serde::{Deserialize, Serialize};

use crate::data::Track;

/// An artist returned by a similar-artist lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarArtist {
    pub name: String,
    /// Similarity to the seed artist
    pub match_score: Option<f64>,
}

/// When a tier counts as a source of the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePolicy {
    /// The tier added at least one new track to the result
    #[default]
    Contributed,
    /// The tier returned at least one track, even if all of them were duplicates
    RawOutput,
}

/// Failures of the two tiers that are reported to the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CascadeErrors {
    /// Similar-track lookup failure
    pub similar: Option<String>,
    /// Top-tag lookup failure
    pub tags: Option<String>,
}

/// Outcome of one cascade run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CascadeResult {
    /// Unique tracks, best first
    pub tracks: Vec<Track>,
    /// Labels of the tiers that contributed, in the order they ran
    pub sources: Vec<String>,
    /// Top tags of the seed
    pub tags: Vec<String>,
    pub errors: CascadeErrors,
}

impl CascadeResult {
    /// Single-word summary of `sources`: "merged", the only source, or "none"
    pub fn source_summary(&self) -> &str {
        match self.sources.as_slice() {
            [] => "none",
            [only] => only.as_str(),
            _ => "merged",
        }
    }
}

/// Result of an incremental "more like this" request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MoreRecommendations {
    pub cascade: CascadeResult,
    /// Play count of the seed, if it could be looked up
    pub playcount: Option<u64>,
}
