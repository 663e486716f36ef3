use log::info;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{post, State};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::{api_error, internal_error, ApiError, AppState, LastfmBlock};
use crate::data::{ExclusionSet, Seed};

#[derive(Debug, Default, Deserialize)]
pub struct RecommendRequest {
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Tracks the client already shows, `[{"artist": ..., "title": ...}]`
    #[serde(default)]
    pub exclude: Option<Value>,
}

impl RecommendRequest {
    /// (artist, title) of every exclude entry. A missing or malformed list excludes nothing.
    fn excluded_tracks(&self) -> Vec<(String, String)> {
        match &self.exclude {
            Some(Value::Array(entries)) => entries
                .iter()
                .map(|entry| (text_field(entry, "artist"), text_field(entry, "title")))
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn text_field(entry: &Value, field: &str) -> String {
    match entry.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[derive(Debug, Serialize)]
pub struct SeedInfo {
    pub artist: String,
    pub title: String,
    pub playcount: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub seed: SeedInfo,
    pub lastfm: LastfmBlock,
}

/// More recommendations for a known track, skipping the ones the client already has
///
/// POST /recommend {"artist": "...", "title": "...", "exclude": [{"artist": "...", "title": "..."}]}
#[post("/recommend", data = "<request>")]
pub async fn recommend(
    request: Option<Json<RecommendRequest>>,
    state: &State<AppState>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let request = request.map(Json::into_inner).unwrap_or_default();
    let artist = request.artist.as_deref().unwrap_or("").trim().to_string();
    let title = request.title.as_deref().unwrap_or("").trim().to_string();

    if artist.is_empty() || title.is_empty() {
        return Err(api_error(
            Status::BadRequest,
            json!({
                "error": "missing_artist_or_title",
                "hint": "POST JSON with 'artist' and 'title'"
            }),
        ));
    }

    let seed = Seed::new(&artist, &title);
    let excluded = request.excluded_tracks();
    let exclusions = ExclusionSet::new(
        &seed,
        excluded.iter().map(|(artist, title)| (artist.as_str(), title.as_str())),
    );
    let query = Seed::for_query(&artist, &title);

    let cascade = state.cascade.clone();
    let desired = state.more_limit;
    let worker_query = query.clone();
    let more = tokio::task::spawn_blocking(move || cascade.recommend_more(&worker_query, &exclusions, desired))
        .await
        .map_err(internal_error)?;

    info!(
        "{} more recommendations for '{}' - '{}' from {}",
        more.cascade.tracks.len(),
        artist,
        title,
        more.cascade.source_summary()
    );

    Ok(Json(RecommendResponse {
        seed: SeedInfo {
            artist,
            title,
            playcount: more.playcount,
        },
        lastfm: LastfmBlock::new(more.cascade, &query, false),
    }))
}
