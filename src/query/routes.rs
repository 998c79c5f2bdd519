//! HTTP handlers and request/response shapes.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        FromRequestParts, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use courtside::engine::{court_from_record, project_all, ALL_SPORTS};
use courtside::geocode::GeocodeHit;
use courtside::models::{Court, NearestResponse};
use courtside::store::load_all;
use courtside::EngineError;

use crate::AppState;

const DEFAULT_K: usize = 5;

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

#[derive(Debug)]
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let status = match err {
            EngineError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            EngineError::UnknownDataset(_) => StatusCode::NOT_FOUND,
        };
        ApiError(status, err.to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError(rejection.status(), rejection.body_text())
    }
}

/// `Query` whose rejections use the JSON error body
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `Path` whose rejections use the JSON error body
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

fn internal_error(context: &str, err: anyhow::Error) -> ApiError {
    error!("{}: {:#}", context, err);
    ApiError(StatusCode::INTERNAL_SERVER_ERROR, format!("{}: {}", context, err))
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    app: String,
    datasets: Vec<DatasetStatus>,
}

#[derive(Serialize)]
struct DatasetStatus {
    name: String,
    records: usize,
    built_at: DateTime<Utc>,
}

/// Health and readiness probe
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let snapshot = state.engine.registry().snapshot();
    let datasets = snapshot
        .iter()
        .map(|entry| DatasetStatus {
            name: entry.name().to_string(),
            records: entry.dataset().len(),
            built_at: entry.built_at(),
        })
        .collect();

    Json(HealthResponse {
        status: "ok",
        app: state.config.server.app_name.clone(),
        datasets,
    })
}

#[derive(Deserialize)]
pub struct NearestParams {
    lat: f64,
    lon: f64,
    /// Number of results (capped at server.max_k)
    k: Option<usize>,
    /// Dataset name, or "both" for every dataset
    sport: Option<String>,
}

/// Requested k, defaulted and capped. Zero passes through so the engine rejects it.
fn resolve_k(requested: Option<usize>, max_k: usize) -> usize {
    requested.unwrap_or(DEFAULT_K).min(max_k)
}

/// Nearest courts to a point
pub async fn nearest_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<NearestParams>,
) -> Result<Json<NearestResponse>, ApiError> {
    let k = resolve_k(params.k, state.config.server.max_k);
    let sport = params.sport.as_deref().unwrap_or(ALL_SPORTS);

    debug!(
        "Nearest query at ({}, {}) sport={} k={}",
        params.lat, params.lon, sport, k
    );

    let results = state.engine.nearest(sport, params.lat, params.lon, k)?;

    Ok(Json(NearestResponse::new(project_all(&results))))
}

/// Single court by dataset and id
pub async fn court_handler(
    State(state): State<Arc<AppState>>,
    ApiPath((sport, court_id)): ApiPath<(String, String)>,
) -> Result<Json<Court>, ApiError> {
    let record = state
        .engine
        .find(&sport, &court_id)?
        .ok_or_else(|| ApiError(StatusCode::NOT_FOUND, "Court not found".to_string()))?;

    Ok(Json(court_from_record(&record, Some(&sport))))
}

#[derive(Deserialize)]
pub struct GeocodeParams {
    address: String,
}

/// Address to coordinates
pub async fn geocode_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<GeocodeParams>,
) -> Result<Json<GeocodeHit>, ApiError> {
    let address = params.address.trim();
    if address.chars().count() < 3 {
        return Err(ApiError(
            StatusCode::BAD_REQUEST,
            "address must be at least 3 characters".to_string(),
        ));
    }

    state
        .geocoder
        .forward(address)
        .await
        .map_err(|e| internal_error("Geocoding failed", e))?
        .map(Json)
        .ok_or_else(|| ApiError(StatusCode::NOT_FOUND, "Address not found".to_string()))
}

#[derive(Deserialize)]
pub struct ReverseParams {
    lat: f64,
    lon: f64,
}

/// Coordinates to a display name
pub async fn reverse_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ReverseParams>,
) -> Result<Json<GeocodeHit>, ApiError> {
    if !courtside::models::valid_coordinates(params.lat, params.lon) {
        return Err(ApiError(
            StatusCode::BAD_REQUEST,
            "coordinates out of range".to_string(),
        ));
    }

    state
        .geocoder
        .reverse(params.lat, params.lon)
        .await
        .map_err(|e| internal_error("Reverse geocoding failed", e))?
        .map(Json)
        .ok_or_else(|| ApiError(StatusCode::NOT_FOUND, "Location not found".to_string()))
}

#[derive(Serialize)]
pub struct ReloadResponse {
    reloaded: Vec<String>,
}

/// Re-read every dataset file and swap in fresh indexes
pub async fn reload_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReloadResponse>, ApiError> {
    let sources = state.config.dataset_sources();

    let registry = Arc::clone(state.engine.registry());
    let reloaded = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<String>> {
        // Load everything first so a bad file leaves the live data untouched
        let datasets = load_all(&sources)?;
        Ok(datasets
            .into_iter()
            .map(|(name, dataset)| {
                registry.replace(name.clone(), dataset);
                name
            })
            .collect())
    })
    .await
    .map_err(|e| internal_error("Reload task failed", e.into()))?
    .map_err(|e| internal_error("Reload failed", e))?;

    info!("Reloaded datasets: {:?}", reloaded);

    Ok(Json(ReloadResponse { reloaded }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use courtside::config::Config;
    use courtside::geocode::Geocoder;
    use courtside::{Dataset, DatasetRegistry, PointRecord, QueryEngine};

    fn app_state(max_k: usize) -> Arc<AppState> {
        let handball: Vec<PointRecord> = (0..12)
            .map(|i| PointRecord::new(format!("H{}", i), 40.70 + i as f64 * 0.001, -73.90))
            .collect();
        let registry = DatasetRegistry::from_datasets(vec![
            ("handball", Dataset::from_records(handball)),
            (
                "tennis",
                Dataset::from_records(vec![PointRecord::new("T0", 40.7005, -73.90)]),
            ),
        ]);

        let config = Config::from_toml(&format!("[server]\nmax_k = {}\n", max_k)).unwrap();
        Arc::new(AppState {
            engine: QueryEngine::new(Arc::new(registry)),
            geocoder: Geocoder::new(&config.geocoder).unwrap(),
            config,
        })
    }

    fn params(k: Option<usize>, sport: Option<&str>) -> ApiQuery<NearestParams> {
        ApiQuery(NearestParams {
            lat: 40.70,
            lon: -73.90,
            k,
            sport: sport.map(String::from),
        })
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn query_rejection(uri: &str) -> ApiError {
        let (mut parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        ApiQuery::<NearestParams>::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap()
    }

    #[test]
    fn test_resolve_k() {
        assert_eq!(resolve_k(None, 10), DEFAULT_K);
        assert_eq!(resolve_k(None, 3), 3);
        assert_eq!(resolve_k(Some(50), 10), 10);
        assert_eq!(resolve_k(Some(2), 10), 2);
        assert_eq!(resolve_k(Some(0), 10), 0);
    }

    #[tokio::test]
    async fn test_engine_error_status_and_body() {
        let response =
            ApiError::from(EngineError::InvalidArgument("k must be at least 1".to_string()))
                .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], 400);
        assert!(body["error"].as_str().unwrap().contains("k must be at least 1"));

        let response = ApiError::from(EngineError::UnknownDataset("golf".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], 404);
    }

    #[tokio::test]
    async fn test_nearest_defaults_to_every_sport() {
        let Json(response) = nearest_handler(State(app_state(10)), params(None, None))
            .await
            .unwrap();

        assert_eq!(response.count, DEFAULT_K);
        assert_eq!(response.results[0].court_id, "H0");
        assert_eq!(response.results[1].court_id, "T0");
        assert_eq!(response.results[1].sport.as_deref(), Some("tennis"));
    }

    #[tokio::test]
    async fn test_nearest_k_capped_at_max_k() {
        let Json(response) = nearest_handler(State(app_state(4)), params(Some(50), Some("handball")))
            .await
            .unwrap();
        assert_eq!(response.count, 4);
        assert!(response
            .results
            .iter()
            .all(|c| c.sport.as_deref() == Some("handball")));
    }

    #[tokio::test]
    async fn test_nearest_errors() {
        let err = nearest_handler(State(app_state(10)), params(Some(0), None))
            .await
            .unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], 400);

        let err = nearest_handler(State(app_state(10)), params(None, Some("squash")))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bad_query_string_uses_json_body() {
        for uri in [
            "/v1/nearest?lon=-73.9",
            "/v1/nearest?lat=40.7&lon=-73.9&k=-1",
            "/v1/nearest?lat=north&lon=-73.9",
        ] {
            let response = query_rejection(uri).await.into_response();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
            let body = body_json(response).await;
            assert_eq!(body["code"], 400);
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_court_lookup() {
        let state = app_state(10);

        let Json(court) = court_handler(
            State(Arc::clone(&state)),
            ApiPath(("handball".to_string(), "H3".to_string())),
        )
        .await
        .unwrap();
        assert_eq!(court.court_id, "H3");
        assert_eq!(court.sport.as_deref(), Some("handball"));

        let missing = court_handler(
            State(Arc::clone(&state)),
            ApiPath(("handball".to_string(), "H99".to_string())),
        )
        .await
        .unwrap_err();
        assert_eq!(missing.0, StatusCode::NOT_FOUND);

        let unknown = court_handler(
            State(state),
            ApiPath(("golf".to_string(), "H3".to_string())),
        )
        .await
        .unwrap_err();
        assert_eq!(unknown.0, StatusCode::NOT_FOUND);
    }
}
