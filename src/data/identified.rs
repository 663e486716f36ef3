use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata of the best fingerprint match for an uploaded sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifiedTrack {
    /// Artist as reported by the fingerprint service (may list several artists)
    pub artist: String,
    pub title: String,
    pub album: Option<String>,
    pub release_date: Option<String>,
    pub duration_ms: Option<u64>,
    /// Match confidence reported by the service
    pub score: Option<f64>,
    /// Fingerprint service track id
    pub acrid: Option<String>,
}

impl IdentifiedTrack {
    /// Build from one entry of the fingerprint service's `metadata.music` array.
    ///
    /// Returns `None` if artist or title is missing.
    pub fn from_music_entry(entry: &Value) -> Option<Self> {
        let artist = entry
            .get("artists")
            .and_then(|artists| artists.get(0))
            .and_then(|first| first.get("name"))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .or_else(|| entry.get("artist").and_then(Value::as_str))
            .filter(|name| !name.is_empty())?;

        let title = entry
            .get("title")
            .and_then(Value::as_str)
            .filter(|title| !title.is_empty())?;

        let album = match entry.get("album") {
            Some(Value::Object(album)) => album.get("name").and_then(Value::as_str).map(str::to_string),
            Some(Value::String(album)) => Some(album.clone()),
            _ => None,
        };

        Some(IdentifiedTrack {
            artist: artist.to_string(),
            title: title.to_string(),
            album,
            release_date: entry.get("release_date").and_then(Value::as_str).map(str::to_string),
            duration_ms: entry.get("duration_ms").and_then(Value::as_u64),
            score: entry.get("score").and_then(Value::as_f64),
            acrid: entry.get("acrid").and_then(Value::as_str).map(str::to_string),
        })
    }
}
