use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{Config, ConfigError};
use crate::predict::{Catalog, Observer};

use super::api::passes as pass_handlers;
use super::api_doc::ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub observer: Observer,
    pub catalog: Option<Arc<Catalog>>,
}

impl AppState {
    /// A catalog that fails to load is logged and left out; uploads still work.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let observer = config.observer()?;
        let catalog = match config.catalog {
            Some(ref catalog_config) => match Catalog::load(&catalog_config.path) {
                Ok(catalog) => Some(Arc::new(catalog)),
                Err(e) => {
                    log::warn!("Failed to load element set catalog: {}", e);
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            config: Arc::new(config),
            observer,
            catalog,
        })
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/passes",
            get(pass_handlers::get_passes).post(pass_handlers::post_passes),
        )
        .route("/api/passes.csv", get(pass_handlers::get_passes_csv))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(state: AppState) -> std::io::Result<()> {
    let bind_addr = state.config.web.bind.clone();
    let station = state
        .config
        .station
        .name
        .clone()
        .unwrap_or_else(|| state.config.station.coordinates.clone());
    let app = router(state);

    log::info!("Starting server for {} on {}", station, bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use std::io::Write;
    use tower::ServiceExt;

    use crate::predict::fixtures::{ISS_LINE1, ISS_LINE2};

    #[test]
    fn test_state_loads_configured_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("stations.tle")).unwrap();
        writeln!(file, "ISS (ZARYA)\n{}\n{}", ISS_LINE1, ISS_LINE2).unwrap();

        let yaml = format!(
            "station:\n  coordinates: \"35.0, 139.0\"\ncatalog:\n  path: {}\n",
            dir.path().display()
        );
        let state = AppState::new(Config::from_str(&yaml).unwrap()).unwrap();
        assert_eq!(state.catalog.unwrap().len(), 1);
        assert_eq!(state.observer.latitude_deg, 35.0);
    }

    #[test]
    fn test_state_skips_missing_catalog() {
        let yaml = "station:\n  coordinates: \"35.0, 139.0\"\ncatalog:\n  path: /nonexistent/tle\n";
        let state = AppState::new(Config::from_str(yaml).unwrap()).unwrap();
        assert!(state.catalog.is_none());
    }

    #[test]
    fn test_state_rejects_bad_station() {
        let yaml = "station:\n  coordinates: \"north\"\n";
        assert!(AppState::new(Config::from_str(yaml).unwrap()).is_err());
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let state =
            AppState::new(Config::from_str("station:\n  coordinates: \"0, 0\"\n").unwrap())
                .unwrap();
        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/api-doc/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
