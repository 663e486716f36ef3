//! Test doubles and helpers for the HTTP handlers.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rocket::http::ContentType;
use rocket::local::blocking::Client;
use serde_json::{json, Value};

use crate::api::{build_rocket, AppState};
use crate::config::WebserverConfig;
use crate::helpers::acrcloud::{interpret_identification, AcrCloudError, Identification, SampleIdentifier};
use crate::recommendations::testing::FakeMetadataService;
use crate::recommendations::RecommendationCascade;

pub(crate) const BOUNDARY: &str = "trackscout-boundary";

/// Answers every sample with a fixed payload, or fails the transport if `transport_error` is set
#[derive(Debug)]
pub(crate) struct FakeIdentifier {
    pub response: Value,
    pub transport_error: Option<String>,
    /// (file name, sample size) of every call
    pub samples: Mutex<Vec<(Option<String>, usize)>>,
}

impl Default for FakeIdentifier {
    fn default() -> Self {
        FakeIdentifier::matching(json!({
            "artists": [{"name": "Daft Punk"}],
            "title": "Get Lucky",
            "album": {"name": "Random Access Memories"},
            "release_date": "2013-05-17",
            "duration_ms": 248000,
            "score": 100,
            "acrid": "6049f11da7095e8bb8266871d4a70873"
        }))
    }
}

impl FakeIdentifier {
    pub fn matching(entry: Value) -> Self {
        Self::with_response(json!({
            "status": {"code": 0, "msg": "Success"},
            "metadata": {"music": [entry]}
        }))
    }

    pub fn with_response(response: Value) -> Self {
        FakeIdentifier {
            response,
            transport_error: None,
            samples: Mutex::new(Vec::new()),
        }
    }

    pub fn received(&self) -> Vec<(Option<String>, usize)> {
        self.samples.lock().unwrap().clone()
    }
}

impl SampleIdentifier for FakeIdentifier {
    fn identify(&self, file_name: Option<&str>, sample: Vec<u8>) -> Result<Identification, AcrCloudError> {
        self.samples
            .lock()
            .unwrap()
            .push((file_name.map(str::to_string), sample.len()));
        if let Some(error) = &self.transport_error {
            return Err(AcrCloudError::RequestFailed(error.clone()));
        }
        let track = interpret_identification(&self.response)?;
        Ok(Identification {
            track,
            raw: self.response.clone(),
        })
    }
}

/// Pass an `Arc<FakeIdentifier>` to inspect the received samples afterwards
pub(crate) fn test_state(service: FakeMetadataService, identifier: impl Into<Arc<FakeIdentifier>>) -> AppState {
    let identifier: Arc<FakeIdentifier> = identifier.into();
    AppState {
        cascade: RecommendationCascade::new(Arc::new(service)),
        identifier,
        static_dir: PathBuf::from("."),
        identify_limit: 5,
        more_limit: 5,
    }
}

pub(crate) fn client(state: AppState) -> Client {
    Client::tracked(build_rocket(state, &WebserverConfig::default())).unwrap()
}

pub(crate) fn multipart_type() -> ContentType {
    ContentType::new("multipart", "form-data").with_params(("boundary", BOUNDARY))
}

/// multipart/form-data body with one file field
pub(crate) fn multipart_file(field: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: audio/wav\r\n\r\n",
        b = BOUNDARY,
        field = field,
        file_name = file_name
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// multipart/form-data body with one text field
pub(crate) fn multipart_text(field: &str, value: &str) -> Vec<u8> {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n--{b}--\r\n",
        b = BOUNDARY,
        field = field,
        value = value
    )
    .into_bytes()
}
