//! Recommendation cascade.
//!
//! Finds tracks related to a seed by asking the metadata service a sequence of
//! increasingly generic questions (similar tracks, similar artists, genre tags,
//! global chart) until enough unique tracks have been collected.

pub mod cascade;
pub mod merge;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use cascade::{CascadeSettings, RecommendationCascade, Tier};
pub use merge::merge_unique_tracks;
pub use types::{CascadeErrors, CascadeResult, MoreRecommendations, SimilarArtist, SourcePolicy};

use crate::data::Track;
use crate::helpers::lastfm::LastfmError;

/// Remote read operations the cascade is built on.
///
/// Every operation fails independently; the cascade treats a failure as
/// "no tracks from this tier" and carries on.
pub trait MetadataService: Send + Sync {
    /// Tracks similar to one specific track
    fn similar_by_track(&self, artist: &str, track: &str, limit: usize) -> Result<Vec<Track>, LastfmError>;

    /// Artists similar to an artist, best match first
    fn similar_artists(&self, artist: &str, limit: usize) -> Result<Vec<SimilarArtist>, LastfmError>;

    /// The single most popular track of an artist, if it has any
    fn top_track_by_artist(&self, artist: &str) -> Result<Option<Track>, LastfmError>;

    /// Most popular tracks carrying a tag
    fn top_tracks_by_tag(&self, tag: &str, limit: usize) -> Result<Vec<Track>, LastfmError>;

    /// Global chart
    fn chart_top_tracks(&self, limit: usize) -> Result<Vec<Track>, LastfmError>;

    /// Top tag names of a track
    fn top_tags(&self, artist: &str, track: &str, limit: usize) -> Result<Vec<String>, LastfmError>;

    /// Play count of a track. Best effort: `None` on any failure.
    fn track_playcount(&self, artist: &str, track: &str) -> Option<u64>;
}
