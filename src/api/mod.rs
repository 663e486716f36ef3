//! HTTP API.

pub mod identify;
pub mod recommend;
pub mod server;
pub mod static_files;

#[cfg(test)]
pub(crate) mod testing;

use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::data::{Seed, Track};
use crate::recommendations::{CascadeErrors, CascadeResult};

pub use server::{build_rocket, start_server, AppState};

/// Error response: status code plus a JSON body with an "error" field
pub type ApiError = Custom<Json<Value>>;

pub fn api_error(status: Status, body: Value) -> ApiError {
    Custom(status, Json(body))
}

pub(crate) fn internal_error(details: impl std::fmt::Display) -> ApiError {
    api_error(
        Status::InternalServerError,
        json!({"error": "internal_error", "details": details.to_string()}),
    )
}

/// The artist/title pair that was sent to the metadata service
#[derive(Debug, Clone, Serialize)]
pub struct QueryEcho {
    pub artist: String,
    pub track: String,
}

/// Recommendation block shared by /identify and /recommend
#[derive(Debug, Clone, Serialize)]
pub struct LastfmBlock {
    pub similar_tracks: Vec<Track>,
    /// "merged", the only contributing source, or "none"
    pub similar_source: String,
    pub similar_sources: Vec<String>,
    pub top_tags: Vec<String>,
    pub query: QueryEcho,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<CascadeErrors>,
}

impl LastfmBlock {
    pub fn new(result: CascadeResult, query: &Seed, include_errors: bool) -> Self {
        let similar_source = result.source_summary().to_string();
        LastfmBlock {
            similar_tracks: result.tracks,
            similar_source,
            similar_sources: result.sources,
            top_tags: result.tags,
            query: QueryEcho {
                artist: query.artist.clone(),
                track: query.title.clone(),
            },
            errors: include_errors.then_some(result.errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lastfm_block_shape() {
        let result = CascadeResult {
            tracks: vec![Track::new("A", "One")],
            sources: vec!["track.getSimilar".to_string(), "chart.getTopTracks".to_string()],
            tags: vec!["rock".to_string()],
            errors: CascadeErrors {
                similar: None,
                tags: Some("timeout".to_string()),
            },
        };
        let block = LastfmBlock::new(result.clone(), &Seed::new("A", "Song"), true);
        let value = serde_json::to_value(&block).unwrap();

        assert_eq!(value["similar_source"], "merged");
        assert_eq!(value["similar_tracks"][0]["match"], Value::Null);
        assert_eq!(value["query"], json!({"artist": "A", "track": "Song"}));
        assert_eq!(value["errors"], json!({"similar": null, "tags": "timeout"}));

        let without = serde_json::to_value(LastfmBlock::new(result, &Seed::new("A", "Song"), false)).unwrap();
        assert!(without.get("errors").is_none());
    }
}
