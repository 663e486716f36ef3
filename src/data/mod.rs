/// Tracks, seeds and the keys used to compare them
pub mod track;

/// Result of a fingerprint lookup
pub mod identified;

pub use identified::IdentifiedTrack;
pub use track::{ExclusionSet, Seed, Track, TrackKey};
