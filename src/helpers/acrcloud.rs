use crate::config::AcrCloudConfig;
use crate::data::IdentifiedTrack;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use log::{debug, info, warn};
use reqwest::blocking::multipart::{Form, Part};
use serde_json::{json, Value};
use sha1::Sha1;
use std::time::Duration;
use thiserror::Error;

type HmacSha1 = Hmac<Sha1>;

pub const IDENTIFY_URI: &str = "/v1/identify";
pub const DATA_TYPE: &str = "audio";
pub const SIGNATURE_VERSION: &str = "1";

/// Upload timeout for a sample
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// File name used when the uploaded sample has none
pub const DEFAULT_SAMPLE_NAME: &str = "audio.wav";

/// Errors of an identification request.
///
/// The variants that are caused by the service's answer carry the raw payload
/// so that callers can pass it on.
#[derive(Debug, Error)]
pub enum AcrCloudError {
    #[error("ACRCloud request failed: {0}")]
    RequestFailed(String),
    #[error("ACRCloud returned a body that is not JSON")]
    InvalidJson,
    #[error("ACRCloud found no match: {status}")]
    NoMatch { status: Value, raw: Value },
    #[error("ACRCloud response carries no music metadata")]
    NoMetadata { raw: Value },
    #[error("ACRCloud match has no artist or title")]
    MissingArtistOrTitle { raw: Value },
}

impl AcrCloudError {
    /// Machine readable error code used in API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AcrCloudError::RequestFailed(_) => "acrcloud_request_failed",
            AcrCloudError::InvalidJson => "acrcloud_invalid_json",
            AcrCloudError::NoMatch { .. } => "acrcloud_no_match",
            AcrCloudError::NoMetadata { .. } => "acrcloud_no_metadata",
            AcrCloudError::MissingArtistOrTitle { .. } => "acrcloud_missing_artist_or_title",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            AcrCloudError::NoMatch { .. } => 404,
            _ => 502,
        }
    }

    /// JSON body describing this error to an API client
    pub fn to_json(&self) -> Value {
        let mut body = json!({ "error": self.error_code() });
        match self {
            AcrCloudError::RequestFailed(details) => {
                body["details"] = json!(details);
            }
            AcrCloudError::InvalidJson => {}
            AcrCloudError::NoMatch { status, raw } => {
                body["acrcloud_status"] = status.clone();
                body["raw"] = raw.clone();
            }
            AcrCloudError::NoMetadata { raw } | AcrCloudError::MissingArtistOrTitle { raw } => {
                body["raw"] = raw.clone();
            }
        }
        body
    }
}

/// A successful identification
#[derive(Debug, Clone)]
pub struct Identification {
    pub track: IdentifiedTrack,
    /// Unmodified response of the service
    pub raw: Value,
}

/// Anything that can turn an audio sample into a track match
pub trait SampleIdentifier: Send + Sync {
    fn identify(&self, file_name: Option<&str>, sample: Vec<u8>) -> Result<Identification, AcrCloudError>;
}

/// The exact text that gets signed for an identify request
pub fn string_to_sign(access_key: &str, timestamp: i64) -> String {
    [
        "POST",
        IDENTIFY_URI,
        access_key,
        DATA_TYPE,
        SIGNATURE_VERSION,
        &timestamp.to_string(),
    ]
    .join("\n")
}

/// Base64 encoded HMAC-SHA1 of `data` keyed with `secret`
pub fn sign(secret: &str, data: &str) -> Result<String, AcrCloudError> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|e| AcrCloudError::RequestFailed(format!("Cannot sign request: {}", e)))?;
    mac.update(data.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Check the service's answer and extract the first match.
pub fn interpret_identification(payload: &Value) -> Result<IdentifiedTrack, AcrCloudError> {
    let status = payload.get("status").cloned().unwrap_or_else(|| json!({}));
    if status.get("code").and_then(Value::as_i64) != Some(0) {
        return Err(AcrCloudError::NoMatch {
            status,
            raw: payload.clone(),
        });
    }

    let first = payload
        .get("metadata")
        .and_then(|metadata| metadata.get("music"))
        .and_then(Value::as_array)
        .and_then(|music| music.first())
        .ok_or_else(|| AcrCloudError::NoMetadata { raw: payload.clone() })?;

    IdentifiedTrack::from_music_entry(first).ok_or_else(|| AcrCloudError::MissingArtistOrTitle { raw: payload.clone() })
}

/// Client for the ACRCloud identification API
#[derive(Debug, Clone)]
pub struct AcrCloudClient {
    host: String,
    access_key: String,
    access_secret: String,
    client: reqwest::blocking::Client,
}

impl AcrCloudClient {
    pub fn new(config: &AcrCloudConfig) -> Result<Self, AcrCloudError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("trackscout/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AcrCloudError::RequestFailed(format!("Cannot create HTTP client: {}", e)))?;

        Ok(AcrCloudClient {
            host: config.host.clone(),
            access_key: config.access_key.clone(),
            access_secret: config.access_secret.clone(),
            client,
        })
    }

    pub fn identify_url(&self) -> String {
        format!("https://{}{}", self.host, IDENTIFY_URI)
    }
}

impl SampleIdentifier for AcrCloudClient {
    /// Upload a sample and return the best match.
    ///
    /// This blocks for up to the configured timeout; call it from a blocking context.
    fn identify(&self, file_name: Option<&str>, sample: Vec<u8>) -> Result<Identification, AcrCloudError> {
        let timestamp = chrono::Utc::now().timestamp();
        let signature = sign(&self.access_secret, &string_to_sign(&self.access_key, timestamp))?;
        let sample_bytes = sample.len();
        let file_name = file_name
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_SAMPLE_NAME)
            .to_string();

        info!("Identifying {} byte sample '{}' at {}", sample_bytes, file_name, self.host);

        let form = Form::new()
            .text("access_key", self.access_key.clone())
            .text("data_type", DATA_TYPE)
            .text("signature_version", SIGNATURE_VERSION)
            .text("signature", signature)
            .text("timestamp", timestamp.to_string())
            .text("sample_bytes", sample_bytes.to_string())
            .part("sample", Part::bytes(sample).file_name(file_name));

        let response = self
            .client
            .post(self.identify_url())
            .multipart(form)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| {
                warn!("ACRCloud request failed: {}", e);
                AcrCloudError::RequestFailed(e.to_string())
            })?;

        let body = response
            .text()
            .map_err(|e| AcrCloudError::RequestFailed(e.to_string()))?;
        let payload: Value = serde_json::from_str(&body).map_err(|e| {
            warn!("ACRCloud response is not JSON: {}", e);
            AcrCloudError::InvalidJson
        })?;

        let track = interpret_identification(&payload)?;
        debug!("ACRCloud matched '{}' - '{}'", track.artist, track.title);
        Ok(Identification { track, raw: payload })
    }
}
