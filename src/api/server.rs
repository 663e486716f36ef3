use std::path::PathBuf;
use std::sync::Arc;

use log::info;
use rocket::data::{Limits, ToByteUnit};
use rocket::{routes, Build, Rocket};

use crate::api::{identify, recommend, static_files};
use crate::config::{AppConfig, WebserverConfig};
use crate::helpers::acrcloud::{AcrCloudClient, SampleIdentifier};
use crate::helpers::lastfm::LastfmClient;
use crate::recommendations::RecommendationCascade;

/// Everything the request handlers need; shared read-only by all requests
pub struct AppState {
    pub cascade: RecommendationCascade,
    pub identifier: Arc<dyn SampleIdentifier>,
    /// Directory that index.html is served from
    pub static_dir: PathBuf,
    /// Number of recommendations returned by /identify
    pub identify_limit: usize,
    /// Number of recommendations returned by /recommend
    pub more_limit: usize,
}

impl AppState {
    /// Build the production clients from the configuration.
    ///
    /// Must not be called from within an async runtime.
    pub fn from_config(config: &AppConfig) -> Result<Self, String> {
        let lastfm = LastfmClient::from_config(&config.lastfm)
            .map_err(|e| format!("Cannot create Last.fm client: {}", e))?;
        let acrcloud = AcrCloudClient::new(&config.acrcloud)
            .map_err(|e| format!("Cannot create ACRCloud client: {}", e))?;

        let cascade = RecommendationCascade::new(Arc::new(lastfm))
            .with_settings(config.recommendations.cascade_settings());

        Ok(AppState {
            cascade,
            identifier: Arc::new(acrcloud),
            static_dir: PathBuf::from(&config.webserver.static_dir),
            identify_limit: config.recommendations.identify_limit,
            more_limit: config.recommendations.more_limit,
        })
    }
}

/// Rocket instance with all routes, listening where `webserver` says
pub fn build_rocket(state: AppState, webserver: &WebserverConfig) -> Rocket<Build> {
    let upload_limit = webserver.upload_limit_bytes().bytes();
    let limits = Limits::default()
        .limit("file", upload_limit)
        .limit("data-form", upload_limit);

    let figment = rocket::Config::figment()
        .merge(("address", webserver.host.clone()))
        .merge(("port", webserver.port))
        .merge(("limits", limits));

    rocket::custom(figment)
        .manage(state)
        .mount(
            "/",
            routes![static_files::index, identify::identify, recommend::recommend],
        )
}

/// Run the API server until it is shut down
pub async fn start_server(state: AppState, webserver: &WebserverConfig) -> Result<(), rocket::Error> {
    info!(
        "Starting API server on {}:{} (uploads up to {} MiB)",
        webserver.host, webserver.port, webserver.max_upload_mb
    );
    let _rocket = build_rocket(state, webserver).launch().await?;
    info!("API server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{test_state, FakeIdentifier};
    use crate::recommendations::testing::FakeMetadataService;

    #[test]
    fn test_limits_follow_config() {
        let webserver = WebserverConfig {
            max_upload_mb: 3,
            ..WebserverConfig::default()
        };
        let state = test_state(FakeMetadataService::new(), FakeIdentifier::default());
        let rocket = build_rocket(state, &webserver);

        let config: rocket::Config = rocket.figment().extract().unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.limits.get("file"), Some(3.mebibytes()));
        assert_eq!(config.limits.get("data-form"), Some(3.mebibytes()));
    }

    #[test]
    fn test_routes_are_mounted() {
        let state = test_state(FakeMetadataService::new(), FakeIdentifier::default());
        let rocket = build_rocket(state, &WebserverConfig::default());

        let mut routes: Vec<String> = rocket
            .routes()
            .map(|route| format!("{} {}", route.method, route.uri))
            .collect();
        routes.sort();
        assert_eq!(routes, vec!["GET /", "POST /identify", "POST /recommend"]);
    }

    #[test]
    fn test_from_config_uses_recommendation_settings() {
        let mut config = AppConfig::default();
        config.recommendations.more_limit = 8;
        config.recommendations.overfetch_margin = 4;

        let state = AppState::from_config(&config).unwrap();
        assert_eq!(state.more_limit, 8);
        assert_eq!(state.identify_limit, 5);
        assert_eq!(state.cascade.settings().overfetch_margin, 4);
    }
}
