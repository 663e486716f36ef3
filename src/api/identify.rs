use std::sync::Arc;

use log::{debug, info, warn};
use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{post, FromForm, State};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::AsyncReadExt;

use crate::api::{api_error, internal_error, ApiError, AppState, LastfmBlock};
use crate::data::{IdentifiedTrack, Seed};
use crate::helpers::acrcloud::AcrCloudError;

/// Upload form; the sample may be sent as "audio" or as "file"
#[derive(FromForm)]
pub struct IdentifyUpload<'r> {
    pub audio: Option<TempFile<'r>>,
    pub file: Option<TempFile<'r>>,
}

impl<'r> IdentifyUpload<'r> {
    fn sample(&self) -> Option<&TempFile<'r>> {
        self.audio.as_ref().or(self.file.as_ref())
    }
}

#[derive(Debug, Serialize)]
pub struct RawResponses {
    pub acrcloud: Value,
}

#[derive(Debug, Serialize)]
pub struct IdentifyResponse {
    pub identified: IdentifiedTrack,
    pub lastfm: LastfmBlock,
    pub raw: RawResponses,
}

async fn read_sample(file: &TempFile<'_>) -> std::io::Result<Vec<u8>> {
    let reader = file.open().await?;
    tokio::pin!(reader);
    let mut bytes = Vec::with_capacity(file.len() as usize);
    reader.read_to_end(&mut bytes).await?;
    Ok(bytes)
}

fn fingerprint_error(error: AcrCloudError) -> ApiError {
    warn!("Identification failed: {}", error);
    let status = Status::from_code(error.http_status()).unwrap_or(Status::BadGateway);
    api_error(status, error.to_json())
}

/// Identify an uploaded audio sample and recommend related tracks
///
/// POST /identify (multipart/form-data, file field "audio" or "file")
#[post("/identify", data = "<upload>")]
pub async fn identify(
    upload: Option<Form<IdentifyUpload<'_>>>,
    state: &State<AppState>,
) -> Result<Json<IdentifyResponse>, ApiError> {
    let file = match upload.as_ref().and_then(|upload| upload.sample()) {
        Some(file) => file,
        None => {
            return Err(api_error(
                Status::BadRequest,
                json!({
                    "error": "missing_audio_file",
                    "hint": "POST multipart/form-data with field 'audio'"
                }),
            ))
        }
    };

    let sample = read_sample(file).await.map_err(internal_error)?;
    if sample.is_empty() {
        return Err(api_error(Status::BadRequest, json!({"error": "empty_audio_file"})));
    }
    let file_name = file.name().map(str::to_string);
    debug!("Received sample {:?} with {} bytes", file_name, sample.len());

    let identifier = Arc::clone(&state.identifier);
    let cascade = state.cascade.clone();
    let limit = state.identify_limit;

    let outcome = tokio::task::spawn_blocking(move || {
        identifier.identify(file_name.as_deref(), sample).map(|identification| {
            let query = Seed::for_query(&identification.track.artist, &identification.track.title);
            let result = cascade.recommend(&query, limit);
            (identification, query, result)
        })
    })
    .await
    .map_err(internal_error)?;

    let (identification, query, result) = outcome.map_err(fingerprint_error)?;
    info!(
        "Identified '{}' - '{}', {} recommendations from {}",
        identification.track.artist,
        identification.track.title,
        result.tracks.len(),
        result.source_summary()
    );

    Ok(Json(IdentifyResponse {
        identified: identification.track,
        lastfm: LastfmBlock::new(result, &query, true),
        raw: RawResponses {
            acrcloud: identification.raw,
        },
    }))
}
