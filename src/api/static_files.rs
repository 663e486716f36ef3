use log::debug;
use rocket::fs::NamedFile;
use rocket::{get, State};

use crate::api::AppState;

pub const INDEX_FILE: &str = "index.html";

/// Serve the web frontend
///
/// GET / returns index.html from the configured static directory, or 404 if it is missing
#[get("/")]
pub async fn index(state: &State<AppState>) -> Option<NamedFile> {
    let path = state.static_dir.join(INDEX_FILE);
    match NamedFile::open(&path).await {
        Ok(file) => Some(file),
        Err(e) => {
            debug!("Cannot serve {}: {}", path.display(), e);
            None
        }
    }
}
