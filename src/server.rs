use crate::app::Session;
use crate::config::AppConfig;
use crate::controls::UiEvent;
use crate::map::{Camera, MapDocument, Popup};
use crate::page::PageDocument;
use crate::style::SOURCE_ID;
use crate::types::{FeatureId, LngLat};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub struct AppState {
    pub session: Mutex<Session<MapDocument, PageDocument>>,
    pub config: AppConfig,
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
pub struct QueryResponse {
    id: FeatureId,
    properties: serde_json::Map<String, Value>,
}

/// What the browser needs to mirror after every event.
#[derive(Serialize)]
pub struct StateResponse<'a> {
    camera: Camera,
    popup: Option<&'a Popup>,
    hovered: Vec<FeatureId>,
    page: &'a PageDocument,
}

impl<'a> StateResponse<'a> {
    fn of(session: &'a Session<MapDocument, PageDocument>) -> Self {
        Self {
            camera: session.map.camera(),
            popup: session.map.popup(),
            hovered: session.map.hovered(SOURCE_ID),
            page: &session.page,
        }
    }
}

pub struct ApiError(anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(error = ?self.0, "Event rejected");
        (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError(e)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.server.static_dir);
    Router::new()
        .route("/api/config", get(config_handler))
        .route("/api/style", get(style_handler))
        .route("/api/state", get(state_handler))
        .route("/api/events", post(event_handler))
        .route("/api/query", get(query_handler))
        .fallback_service(static_files)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, session: Session<MapDocument, PageDocument>) -> Result<()> {
    let port = config.server.port;
    let state = Arc::new(AppState {
        session: Mutex::new(session),
        config,
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Map bootstrap: style URL, token, default view, geocoder and map controls.
async fn config_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "style_url": config.view.style_url,
        "access_token": config.view.access_token,
        "center": config.view.center,
        "zoom": config.view.zoom,
        "geocoder": {
            "countries": config.geocoder.countries,
            "bbox": config.geocoder.bbox,
            "proximity": config.geocoder.proximity,
        },
        "controls": ["navigation", "fullscreen"],
    }))
}

async fn style_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let session = state.session.lock().await;
    Json(session.map.style())
}

async fn state_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let session = state.session.lock().await;
    Json(json!(StateResponse::of(&session)))
}

async fn event_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<UiEvent>,
) -> Result<Json<Value>, ApiError> {
    let mut session = state.session.lock().await;
    session.handle(event)?;
    Ok(Json(json!(StateResponse::of(&session))))
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<QueryResponse>> {
    let session = state.session.lock().await;
    let hit = session
        .index()
        .and_then(|index| index.features_at(LngLat::new(params.lon, params.lat)).into_iter().next());
    Json(hit.map(|f| QueryResponse { id: f.id, properties: f.properties }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::assign_feature_ids;
    use geojson::FeatureCollection;

    async fn spawn(data: Option<FeatureCollection>) -> String {
        let mut config = AppConfig::default();
        config.server.static_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("static");
        let map = MapDocument::new(Camera { center: config.view.center, zoom: config.view.zoom });
        let session = Session::start(config.clone(), map, PageDocument::new(), async move { data }, async {})
            .await
            .unwrap();
        let state = Arc::new(AppState { session: Mutex::new(session), config });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn collection() -> FeatureCollection {
        let mut fc: FeatureCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "AREA_NA7": "Annex", "CapPerc": 1.0, "centroid": "[-79.4,43.67]" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-79.45, 43.65], [-79.35, 43.65], [-79.35, 43.7], [-79.45, 43.7], [-79.45, 43.65]]]
                }
            }]
        }))
        .unwrap();
        assign_feature_ids(&mut fc);
        fc
    }

    async fn post_event(base: &str, event: Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}/api/events", base))
            .header("content-type", "application/json")
            .body(event.to_string())
            .send()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn hover_round_trip() {
        let base = spawn(Some(collection())).await;
        let response = post_event(&base, json!({ "type": "pointer_move", "lng_lat": [-79.4, 43.66] })).await;
        assert!(response.status().is_success());
        let state: Value = serde_json::from_str(&response.text().await.unwrap()).unwrap();
        assert_eq!(state["hovered"], json!([0]));
        assert_eq!(state["popup"]["at"], json!([-79.4, 43.67]));

        let response = post_event(&base, json!({ "type": "pointer_leave" })).await;
        let state: Value = serde_json::from_str(&response.text().await.unwrap()).unwrap();
        assert_eq!(state["hovered"], json!([]));
        assert!(state["popup"].is_null());
    }

    #[tokio::test]
    async fn style_and_query() {
        let base = spawn(Some(collection())).await;
        let style: Value = serde_json::from_str(
            &reqwest::get(format!("{}/api/style", base)).await.unwrap().text().await.unwrap(),
        )
        .unwrap();
        assert_eq!(style["layers"].as_array().unwrap().len(), 2);

        let hit: Value = serde_json::from_str(
            &reqwest::get(format!("{}/api/query?lat=43.66&lon=-79.4", base))
                .await
                .unwrap()
                .text()
                .await
                .unwrap(),
        )
        .unwrap();
        assert_eq!(hit["id"], json!(0));
        assert_eq!(hit["properties"]["AREA_NA7"], json!("Annex"));
    }

    #[tokio::test]
    async fn no_data_state() {
        let base = spawn(None).await;
        let state: Value = serde_json::from_str(
            &reqwest::get(format!("{}/api/state", base)).await.unwrap().text().await.unwrap(),
        )
        .unwrap();
        assert_eq!(state["page"]["dropdown_visible"], json!(false));
        let style: Value = serde_json::from_str(
            &reqwest::get(format!("{}/api/style", base)).await.unwrap().text().await.unwrap(),
        )
        .unwrap();
        assert!(style["layers"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn serves_map_page() {
        let base = spawn(None).await;
        let index = reqwest::get(format!("{}/", base)).await.unwrap();
        assert!(index.status().is_success());
        let html = index.text().await.unwrap();
        assert!(html.contains("app.js"));
        assert!(html.contains("id=\"geocoder\""));

        let script = reqwest::get(format!("{}/app.js", base)).await.unwrap().text().await.unwrap();
        for path in ["/api/config", "/api/style", "/api/state", "/api/events"] {
            assert!(script.contains(path), "{path}");
        }
    }

    #[tokio::test]
    async fn malformed_event_is_rejected() {
        let base = spawn(None).await;
        let response = post_event(&base, json!({ "type": "teleport" })).await;
        assert!(response.status().is_client_error());
    }
}
