use crate::config::LastfmConfig;
use crate::data::Track;
use crate::helpers::http_client::{new_http_client, HttpClient, HttpClientError};
use crate::recommendations::{MetadataService, SimilarArtist};
use log::{debug, error, info};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const LASTFM_API_ROOT: &str = "https://ws.audioscrobbler.com/2.0/";

/// Timeout for list queries (similar tracks, tags, charts)
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 20;

/// Timeout for single-item lookups (an artist's top track, track info)
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 15;

// Error types for Last.fm API
#[derive(Debug, Error)]
pub enum LastfmError {
    #[error("Last.fm API error ({1}): {0}")]
    ApiError(String, i32), // message, code
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Parsing error: {0}")]
    ParsingError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Last.fm's own error responses, sent with 200 OK as well as with HTTP error codes.
/// Any payload carrying an `error` key counts, whatever shape the code and message have.
fn application_error(payload: &Value) -> Option<LastfmError> {
    let code = match payload.get("error")? {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()).unwrap_or(0),
        Value::String(s) => s.trim().parse::<i32>().unwrap_or(0),
        _ => 0,
    };
    let message = string_field(payload, "message");
    Some(LastfmError::ApiError(message, code))
}

/// Read-only Last.fm client for recommendation lookups
#[derive(Clone, Debug)]
pub struct LastfmClient {
    api_key: String,
    api_root: String,
    client: Box<dyn HttpClient>,
    query_timeout: Duration,
    lookup_timeout: Duration,
}

impl LastfmClient {
    /// Create a client using the default HTTP implementation
    pub fn new(api_key: &str) -> Result<Self, LastfmError> {
        Self::with_http_client(api_key, new_http_client())
    }

    /// Create a client on top of a specific HTTP implementation
    pub fn with_http_client(api_key: &str, client: Box<dyn HttpClient>) -> Result<Self, LastfmError> {
        if api_key.trim().is_empty() {
            return Err(LastfmError::ConfigError("API key is required".to_string()));
        }

        Ok(LastfmClient {
            api_key: api_key.trim().to_string(),
            api_root: LASTFM_API_ROOT.to_string(),
            client,
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            lookup_timeout: Duration::from_secs(DEFAULT_LOOKUP_TIMEOUT_SECS),
        })
    }

    /// Create a client from the `lastfm` configuration section
    pub fn from_config(config: &LastfmConfig) -> Result<Self, LastfmError> {
        let client = Self::new(&config.api_key)?.with_timeouts(
            Duration::from_secs(config.timeout_secs),
            Duration::from_secs(config.lookup_timeout_secs),
        );
        info!(
            "Last.fm client initialized (query timeout {}s, lookup timeout {}s)",
            config.timeout_secs, config.lookup_timeout_secs
        );
        Ok(client)
    }

    pub fn with_timeouts(mut self, query_timeout: Duration, lookup_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self.lookup_timeout = lookup_timeout;
        self
    }

    /// Make an API request to Last.fm
    fn make_api_request(&self, params: &[(&str, &str)], timeout: Duration) -> Result<Value, LastfmError> {
        let mut query: Vec<(&str, &str)> = params.to_vec();
        // Always add api_key and format
        query.push(("api_key", self.api_key.as_str()));
        query.push(("format", "json"));

        let method = params
            .iter()
            .find(|(k, _)| *k == "method")
            .map(|(_, v)| *v)
            .unwrap_or("unknown_method");

        match self.client.get_json_with_query(&self.api_root, &query, timeout) {
            Ok(body) => {
                // Check for a Last.fm error first, even on 200 OK
                if let Some(api_error) = application_error(&body) {
                    debug!("Last.fm API returned an error for {}: {}", method, api_error);
                    return Err(api_error);
                }
                if !body.is_object() {
                    return Err(LastfmError::ParsingError(format!(
                        "{} returned a non-object payload: {}",
                        method, body
                    )));
                }
                Ok(body)
            }
            Err(HttpClientError::ServerError(code, error_body)) => {
                // Last.fm might return structured errors on HTTP error codes
                let api_error = serde_json::from_str::<Value>(&error_body)
                    .ok()
                    .and_then(|payload| application_error(&payload));
                if let Some(api_error) = api_error {
                    Err(api_error)
                } else {
                    Err(LastfmError::NetworkError(format!(
                        "HTTP error {} with unparseable body: {}",
                        code, error_body
                    )))
                }
            }
            Err(HttpClientError::ParseError(msg)) => {
                error!("Unparseable Last.fm response for {}: {}", method, msg);
                Err(LastfmError::ParsingError(msg))
            }
            Err(e) => {
                error!("Last.fm API request {} failed: {}", method, e);
                Err(LastfmError::NetworkError(e.to_string()))
            }
        }
    }

    /// Similar tracks for a track (`track.getSimilar`)
    pub fn get_similar_tracks(&self, artist: &str, track: &str, limit: usize) -> Result<Vec<Track>, LastfmError> {
        let limit_str = limit.to_string();
        let params = [
            ("method", "track.getSimilar"),
            ("artist", artist),
            ("track", track),
            ("limit", limit_str.as_str()),
            ("autocorrect", "1"),
        ];
        let payload = self.make_api_request(&params, self.query_timeout)?;

        one_or_many(&payload, "similartracks", "track")?
            .into_iter()
            .take(limit)
            .map(|item| track_from_item(item, true))
            .collect()
    }

    /// Similar artists for an artist (`artist.getSimilar`)
    pub fn get_similar_artists(&self, artist: &str, limit: usize) -> Result<Vec<SimilarArtist>, LastfmError> {
        let limit_str = limit.to_string();
        let params = [
            ("method", "artist.getSimilar"),
            ("artist", artist),
            ("limit", limit_str.as_str()),
            ("autocorrect", "1"),
        ];
        let payload = self.make_api_request(&params, self.query_timeout)?;

        let mut artists = Vec::new();
        for item in one_or_many(&payload, "similarartists", "artist")?.into_iter().take(limit) {
            expect_object(item, "artist.getSimilar")?;
            let name = string_field(item, "name");
            if name.is_empty() {
                continue;
            }
            artists.push(SimilarArtist {
                name,
                match_score: parse_score(item.get("match")),
            });
        }
        Ok(artists)
    }

    /// Most popular track of an artist (`artist.getTopTracks` with limit 1)
    pub fn get_artist_top_track(&self, artist: &str) -> Result<Option<Track>, LastfmError> {
        let params = [
            ("method", "artist.getTopTracks"),
            ("artist", artist),
            ("limit", "1"),
            ("autocorrect", "1"),
        ];
        let payload = self.make_api_request(&params, self.lookup_timeout)?;

        match one_or_many(&payload, "toptracks", "track")?.first() {
            Some(item) => Ok(Some(track_from_item(item, false)?)),
            None => Ok(None),
        }
    }

    /// Most popular tracks for a tag (`tag.getTopTracks`)
    pub fn get_tag_top_tracks(&self, tag: &str, limit: usize) -> Result<Vec<Track>, LastfmError> {
        let limit_str = limit.to_string();
        let params = [
            ("method", "tag.getTopTracks"),
            ("tag", tag),
            ("limit", limit_str.as_str()),
        ];
        let payload = self.make_api_request(&params, self.query_timeout)?;

        one_or_many(&payload, "tracks", "track")?
            .into_iter()
            .take(limit)
            .map(|item| track_from_item(item, false))
            .collect()
    }

    /// Global chart (`chart.getTopTracks`)
    pub fn get_chart_top_tracks(&self, limit: usize) -> Result<Vec<Track>, LastfmError> {
        let limit_str = limit.to_string();
        let params = [("method", "chart.getTopTracks"), ("limit", limit_str.as_str())];
        let payload = self.make_api_request(&params, self.query_timeout)?;

        one_or_many(&payload, "tracks", "track")?
            .into_iter()
            .take(limit)
            .map(|item| track_from_item(item, false))
            .collect()
    }

    /// Top tag names of a track (`track.getTopTags`), most relevant first
    pub fn get_top_tags(&self, artist: &str, track: &str, limit: usize) -> Result<Vec<String>, LastfmError> {
        let params = [
            ("method", "track.getTopTags"),
            ("artist", artist),
            ("track", track),
            ("autocorrect", "1"),
        ];
        let payload = self.make_api_request(&params, self.query_timeout)?;

        let mut names = Vec::new();
        for tag in one_or_many(&payload, "toptags", "tag")? {
            if names.len() >= limit {
                break;
            }
            let name = string_field(tag, "name");
            if !name.is_empty() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Global play count of a track (`track.getInfo`)
    pub fn get_track_playcount(&self, artist: &str, track: &str) -> Result<Option<u64>, LastfmError> {
        let params = [
            ("method", "track.getInfo"),
            ("artist", artist),
            ("track", track),
            ("autocorrect", "1"),
        ];
        let payload = self.make_api_request(&params, self.lookup_timeout)?;

        let playcount = payload.get("track").and_then(|t| t.get("playcount"));
        Ok(match playcount {
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            Some(Value::Number(n)) => n.as_u64(),
            _ => None,
        })
    }
}

impl MetadataService for LastfmClient {
    fn similar_by_track(&self, artist: &str, track: &str, limit: usize) -> Result<Vec<Track>, LastfmError> {
        self.get_similar_tracks(artist, track, limit)
    }

    fn similar_artists(&self, artist: &str, limit: usize) -> Result<Vec<SimilarArtist>, LastfmError> {
        self.get_similar_artists(artist, limit)
    }

    fn top_track_by_artist(&self, artist: &str) -> Result<Option<Track>, LastfmError> {
        self.get_artist_top_track(artist)
    }

    fn top_tracks_by_tag(&self, tag: &str, limit: usize) -> Result<Vec<Track>, LastfmError> {
        self.get_tag_top_tracks(tag, limit)
    }

    fn chart_top_tracks(&self, limit: usize) -> Result<Vec<Track>, LastfmError> {
        self.get_chart_top_tracks(limit)
    }

    fn top_tags(&self, artist: &str, track: &str, limit: usize) -> Result<Vec<String>, LastfmError> {
        self.get_top_tags(artist, track, limit)
    }

    fn track_playcount(&self, artist: &str, track: &str) -> Option<u64> {
        match self.get_track_playcount(artist, track) {
            Ok(playcount) => playcount,
            Err(e) => {
                debug!("No play count for '{}' - '{}': {}", artist, track, e);
                None
            }
        }
    }
}

/// Items of `payload[container][field]` as a list.
///
/// Last.fm returns a single object instead of an array when there is exactly one
/// result, and an empty string or nothing at all when there are none.
fn one_or_many<'a>(payload: &'a Value, container: &str, field: &str) -> Result<Vec<&'a Value>, LastfmError> {
    let items = match payload.get(container) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(c)) => match c.get(field) {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(items) => items,
        },
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(Vec::new()),
        Some(other) => {
            return Err(LastfmError::ParsingError(format!(
                "Expected '{}' to be an object, got {}",
                container, other
            )))
        }
    };

    match items {
        Value::Array(list) => Ok(list.iter().collect()),
        Value::Object(_) => Ok(vec![items]),
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        other => Err(LastfmError::ParsingError(format!(
            "Expected '{}.{}' to be an object or array, got {}",
            container, field, other
        ))),
    }
}

fn expect_object(item: &Value, method: &str) -> Result<(), LastfmError> {
    if item.is_object() {
        Ok(())
    } else {
        Err(LastfmError::ParsingError(format!("{} returned a non-object item: {}", method, item)))
    }
}

fn track_from_item(item: &Value, with_match: bool) -> Result<Track, LastfmError> {
    expect_object(item, "track list")?;
    Ok(Track {
        name: string_field(item, "name"),
        artist: artist_name(item.get("artist")),
        url: item.get("url").and_then(Value::as_str).map(str::to_string),
        match_score: if with_match { parse_score(item.get("match")) } else { None },
    })
}

fn string_field(item: &Value, field: &str) -> String {
    match item.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// The artist of a track is either `{"name": ...}` or a plain string
fn artist_name(artist: Option<&Value>) -> String {
    match artist {
        Some(Value::Object(a)) => a.get("name").and_then(Value::as_str).unwrap_or("").to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Match scores come as numbers from some methods and as strings from others
fn parse_score(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    enum Canned {
        Json(Value),
        Status(u16, String),
        Transport,
    }

    /// Answers requests by Last.fm method name and records every query
    #[derive(Debug, Clone, Default)]
    struct ScriptedHttpClient {
        responses: HashMap<String, Canned>,
        calls: Arc<Mutex<Vec<Vec<(String, String)>>>>,
    }

    impl ScriptedHttpClient {
        fn with(mut self, method: &str, response: Canned) -> Self {
            self.responses.insert(method.to_string(), response);
            self
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn get_json_with_query(
            &self,
            _url: &str,
            query: &[(&str, &str)],
            _timeout: Duration,
        ) -> Result<Value, HttpClientError> {
            self.calls
                .lock()
                .unwrap()
                .push(query.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect());
            let method = query.iter().find(|(k, _)| *k == "method").map(|(_, v)| *v).unwrap_or("");
            match self.responses.get(method) {
                Some(Canned::Json(v)) => Ok(v.clone()),
                Some(Canned::Status(code, body)) => Err(HttpClientError::ServerError(*code, body.clone())),
                Some(Canned::Transport) | None => Err(HttpClientError::RequestError("timed out".to_string())),
            }
        }

        fn clone_box(&self) -> Box<dyn HttpClient> {
            Box::new(self.clone())
        }
    }

    fn client(http: ScriptedHttpClient) -> LastfmClient {
        LastfmClient::with_http_client("test_api_key", Box::new(http)).unwrap()
    }

    #[test]
    fn test_empty_api_key_is_rejected() {
        let result = LastfmClient::with_http_client("  ", Box::new(ScriptedHttpClient::default()));
        assert!(matches!(result, Err(LastfmError::ConfigError(_))));
    }

    #[test]
    fn test_similar_tracks_are_parsed_and_truncated() {
        let http = ScriptedHttpClient::default().with(
            "track.getSimilar",
            Canned::Json(json!({
                "similartracks": {"track": [
                    {"name": "Song A", "artist": {"name": "Artist A"}, "url": "https://last.fm/a", "match": 1.0},
                    {"name": "Song B", "artist": {"name": "Artist B"}, "match": "0.5"},
                    {"name": "Song C", "artist": {"name": "Artist C"}, "match": 0.25}
                ]}
            })),
        );
        let calls = http.calls.clone();
        let tracks = client(http).get_similar_tracks("Seed Artist", "Seed Song", 2).unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].artist, "Artist A");
        assert_eq!(tracks[0].url.as_deref(), Some("https://last.fm/a"));
        assert_eq!(tracks[0].match_score, Some(1.0));
        assert_eq!(tracks[1].match_score, Some(0.5));

        let calls = calls.lock().unwrap();
        let query = &calls[0];
        assert!(query.contains(&("limit".to_string(), "2".to_string())));
        assert!(query.contains(&("autocorrect".to_string(), "1".to_string())));
        assert!(query.contains(&("api_key".to_string(), "test_api_key".to_string())));
        assert!(query.contains(&("format".to_string(), "json".to_string())));
    }

    #[test]
    fn test_single_object_is_coerced_to_list() {
        let http = ScriptedHttpClient::default().with(
            "tag.getTopTracks",
            Canned::Json(json!({
                "tracks": {"track": {"name": "Only", "artist": {"name": "One"}, "match": 0.9}}
            })),
        );
        let tracks = client(http).get_tag_top_tracks("rock", 5).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].name, "Only");
        // Tag results never carry a match score
        assert_eq!(tracks[0].match_score, None);
    }

    #[test]
    fn test_plain_string_artist() {
        let http = ScriptedHttpClient::default().with(
            "chart.getTopTracks",
            Canned::Json(json!({"tracks": {"track": [{"name": "Hit", "artist": "Star"}]}})),
        );
        let tracks = client(http).get_chart_top_tracks(5).unwrap();
        assert_eq!(tracks[0].artist, "Star");
    }

    #[test]
    fn test_missing_container_is_empty() {
        let http = ScriptedHttpClient::default()
            .with("track.getSimilar", Canned::Json(json!({"similartracks": {"track": ""}})))
            .with("chart.getTopTracks", Canned::Json(json!({})));
        let client = client(http);
        assert!(client.get_similar_tracks("a", "b", 5).unwrap().is_empty());
        assert!(client.get_chart_top_tracks(5).unwrap().is_empty());
    }

    #[test]
    fn test_unexpected_shape_is_parsing_error() {
        let http = ScriptedHttpClient::default()
            .with("track.getSimilar", Canned::Json(json!({"similartracks": {"track": 42}})))
            .with("chart.getTopTracks", Canned::Json(json!({"tracks": {"track": ["nope"]}})))
            .with("tag.getTopTracks", Canned::Json(json!("unexpected")));
        let client = client(http);
        assert!(matches!(client.get_similar_tracks("a", "b", 5), Err(LastfmError::ParsingError(_))));
        assert!(matches!(client.get_chart_top_tracks(5), Err(LastfmError::ParsingError(_))));
        assert!(matches!(client.get_tag_top_tracks("x", 5), Err(LastfmError::ParsingError(_))));
    }

    #[test]
    fn test_application_error_in_ok_response() {
        let http = ScriptedHttpClient::default().with(
            "track.getSimilar",
            Canned::Json(json!({"error": 6, "message": "Track not found", "links": []})),
        );
        match client(http).get_similar_tracks("a", "b", 5) {
            Err(LastfmError::ApiError(msg, code)) => {
                assert_eq!(code, 6);
                assert_eq!(msg, "Track not found");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_application_error_without_message_or_numeric_code() {
        let http = ScriptedHttpClient::default()
            .with("track.getSimilar", Canned::Json(json!({"error": 6})))
            .with("track.getTopTags", Canned::Json(json!({"error": "29", "message": "Rate limit exceeded"})))
            .with("artist.getSimilar", Canned::Json(json!({"error": "unknown"})));
        let client = client(http);
        match client.get_similar_tracks("a", "b", 5) {
            Err(LastfmError::ApiError(msg, code)) => {
                assert_eq!(code, 6);
                assert_eq!(msg, "");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(client.get_top_tags("a", "b", 3), Err(LastfmError::ApiError(_, 29))));
        assert!(matches!(client.get_similar_artists("a", 5), Err(LastfmError::ApiError(_, 0))));
    }

    #[test]
    fn test_application_error_with_http_status() {
        let http = ScriptedHttpClient::default()
            .with(
                "artist.getSimilar",
                Canned::Status(400, r#"{"error": 10, "message": "Invalid API key"}"#.to_string()),
            )
            .with("chart.getTopTracks", Canned::Status(503, "Service Unavailable".to_string()));
        let client = client(http);
        assert!(matches!(client.get_similar_artists("a", 5), Err(LastfmError::ApiError(_, 10))));
        assert!(matches!(client.get_chart_top_tracks(5), Err(LastfmError::NetworkError(_))));
    }

    #[test]
    fn test_transport_error() {
        let http = ScriptedHttpClient::default().with("track.getTopTags", Canned::Transport);
        assert!(matches!(client(http).get_top_tags("a", "b", 3), Err(LastfmError::NetworkError(_))));
    }

    #[test]
    fn test_similar_artists_skip_unnamed() {
        let http = ScriptedHttpClient::default().with(
            "artist.getSimilar",
            Canned::Json(json!({"similarartists": {"artist": [
                {"name": "First", "match": "0.9"},
                {"name": "", "match": "0.8"},
                {"match": "0.7"},
                {"name": "Second", "match": 0.6}
            ]}})),
        );
        let artists = client(http).get_similar_artists("Seed", 10).unwrap();
        assert_eq!(
            artists,
            vec![
                SimilarArtist { name: "First".to_string(), match_score: Some(0.9) },
                SimilarArtist { name: "Second".to_string(), match_score: Some(0.6) },
            ]
        );
    }

    #[test]
    fn test_artist_top_track() {
        let http = ScriptedHttpClient::default().with(
            "artist.getTopTracks",
            Canned::Json(json!({"toptracks": {"track": [{"name": "Big Hit", "artist": {"name": "Band"}, "url": "u"}]}})),
        );
        let calls = http.calls.clone();
        let track = client(http).get_artist_top_track("Band").unwrap().unwrap();
        assert_eq!(track.name, "Big Hit");
        assert!(calls.lock().unwrap()[0].contains(&("limit".to_string(), "1".to_string())));

        let http = ScriptedHttpClient::default()
            .with("artist.getTopTracks", Canned::Json(json!({"toptracks": {"track": []}})));
        assert_eq!(client(http).get_artist_top_track("Nobody").unwrap(), None);
    }

    #[test]
    fn test_top_tags_limit_and_empty_names() {
        let http = ScriptedHttpClient::default().with(
            "track.getTopTags",
            Canned::Json(json!({"toptags": {"tag": [
                {"name": "rock"}, {"name": ""}, {"name": "indie"}, {"name": "90s"}, {"name": "alternative"}
            ]}})),
        );
        let tags = client(http).get_top_tags("a", "b", 3).unwrap();
        assert_eq!(tags, vec!["rock", "indie", "90s"]);
    }

    #[test]
    fn test_track_playcount() {
        let http = ScriptedHttpClient::default()
            .with("track.getInfo", Canned::Json(json!({"track": {"name": "x", "playcount": "12345"}})));
        assert_eq!(client(http).track_playcount("a", "b"), Some(12345));

        let http = ScriptedHttpClient::default()
            .with("track.getInfo", Canned::Json(json!({"track": {"playcount": 77}})));
        assert_eq!(client(http).track_playcount("a", "b"), Some(77));
    }

    #[test]
    fn test_track_playcount_failure_is_none() {
        let http = ScriptedHttpClient::default().with("track.getInfo", Canned::Transport);
        assert_eq!(client(http).track_playcount("a", "b"), None);

        let http = ScriptedHttpClient::default()
            .with("track.getInfo", Canned::Json(json!({"error": 6, "message": "Track not found"})));
        assert_eq!(client(http).track_playcount("a", "b"), None);
    }
}
