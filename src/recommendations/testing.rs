//! In-memory metadata service for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::data::Track;
use crate::helpers::lastfm::LastfmError;
use crate::recommendations::{MetadataService, SimilarArtist};

/// Scripted answers; `None` or a missing map entry makes the call fail.
#[derive(Debug, Default)]
pub(crate) struct FakeMetadataService {
    pub similar_tracks: Option<Vec<Track>>,
    pub similar_artists: Option<Vec<SimilarArtist>>,
    pub artist_top_tracks: HashMap<String, Option<Track>>,
    pub tag_tracks: HashMap<String, Vec<Track>>,
    pub chart: Option<Vec<Track>>,
    pub tags: Option<Vec<String>>,
    pub playcount: Option<u64>,
    calls: Mutex<Vec<String>>,
}

impl FakeMetadataService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call made so far as "method:argument"
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(method))
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn failure(method: &str) -> LastfmError {
    LastfmError::NetworkError(format!("{} timed out", method))
}

fn truncated(tracks: &[Track], limit: usize) -> Vec<Track> {
    tracks.iter().take(limit).cloned().collect()
}

/// Tracks named `prefix1..prefixN` by artists `Artist prefix1..N`
pub(crate) fn numbered_tracks(prefix: &str, count: usize) -> Vec<Track> {
    (1..=count)
        .map(|i| Track::new(&format!("Artist {}{}", prefix, i), &format!("{}{}", prefix, i)))
        .collect()
}

pub(crate) fn track_names(tracks: &[Track]) -> Vec<String> {
    tracks.iter().map(|t| t.name.clone()).collect()
}

impl MetadataService for FakeMetadataService {
    fn similar_by_track(&self, artist: &str, track: &str, limit: usize) -> Result<Vec<Track>, LastfmError> {
        self.record(format!("track.getSimilar:{}/{}:{}", artist, track, limit));
        self.similar_tracks
            .as_ref()
            .map(|t| truncated(t, limit))
            .ok_or_else(|| failure("track.getSimilar"))
    }

    fn similar_artists(&self, artist: &str, limit: usize) -> Result<Vec<SimilarArtist>, LastfmError> {
        self.record(format!("artist.getSimilar:{}:{}", artist, limit));
        self.similar_artists
            .as_ref()
            .map(|a| a.iter().take(limit).cloned().collect())
            .ok_or_else(|| failure("artist.getSimilar"))
    }

    fn top_track_by_artist(&self, artist: &str) -> Result<Option<Track>, LastfmError> {
        self.record(format!("artist.getTopTracks:{}", artist));
        self.artist_top_tracks
            .get(artist)
            .cloned()
            .ok_or_else(|| failure("artist.getTopTracks"))
    }

    fn top_tracks_by_tag(&self, tag: &str, limit: usize) -> Result<Vec<Track>, LastfmError> {
        self.record(format!("tag.getTopTracks:{}:{}", tag, limit));
        self.tag_tracks
            .get(tag)
            .map(|t| truncated(t, limit))
            .ok_or_else(|| failure("tag.getTopTracks"))
    }

    fn chart_top_tracks(&self, limit: usize) -> Result<Vec<Track>, LastfmError> {
        self.record(format!("chart.getTopTracks:{}", limit));
        self.chart
            .as_ref()
            .map(|t| truncated(t, limit))
            .ok_or_else(|| failure("chart.getTopTracks"))
    }

    fn top_tags(&self, artist: &str, track: &str, limit: usize) -> Result<Vec<String>, LastfmError> {
        self.record(format!("track.getTopTags:{}/{}:{}", artist, track, limit));
        self.tags
            .as_ref()
            .map(|t| t.iter().take(limit).cloned().collect())
            .ok_or_else(|| failure("track.getTopTags"))
    }

    fn track_playcount(&self, artist: &str, track: &str) -> Option<u64> {
        self.record(format!("track.getInfo:{}/{}", artist, track));
        self.playcount
    }
}
