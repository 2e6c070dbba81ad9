pub mod config;
pub mod error;
pub mod geo;
pub mod geocode;
pub mod gpx_export;
pub mod itinerary;
pub mod models;
pub mod osrm;
pub mod planner;
pub mod query;
pub mod wiki;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::error::{PlanError, QueryError, RouteError};
use crate::models::{ApiError, ModelKind, TripOutline, TripPlan};
use crate::planner::Planner;

#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<Planner>,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(ping_handler))
        .route("/getmap", get(getmap_handler))
        .route("/api/plan", get(plan_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct PlanParams {
    pub query: String,
    #[serde(default)]
    pub model: Option<String>,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

impl PlanParams {
    /// Malformed or incomplete query strings answer with an `ApiError` body
    /// like every other failure.
    fn extract(params: Result<Query<PlanParams>, QueryRejection>) -> ApiResult<Self> {
        params.map(|Query(params)| params).map_err(|rejection| {
            tracing::info!("bad query string: {rejection}");
            api_error(StatusCode::BAD_REQUEST, rejection.body_text())
        })
    }

    fn model(&self) -> ApiResult<ModelKind> {
        match &self.model {
            None => Ok(ModelKind::default()),
            Some(name) => name
                .parse()
                .map_err(|message| api_error(StatusCode::BAD_REQUEST, message)),
        }
    }
}

async fn ping_handler() -> Json<Value> {
    tracing::debug!("pinged");
    Json(json!({ "message": "Hello, World!" }))
}

/// GET /getmap - start, end and sampled direct route for a query
async fn getmap_handler(
    State(state): State<AppState>,
    params: Result<Query<PlanParams>, QueryRejection>,
) -> ApiResult<Json<TripOutline>> {
    let params = PlanParams::extract(params)?;
    let model = params.model()?;
    tracing::info!("getmap request with {model}: {:?}", params.query);
    state
        .planner
        .outline(&params.query, model)
        .await
        .map(Json)
        .map_err(plan_error)
}

/// GET /api/plan - full trip with stops, route and itinerary
async fn plan_handler(
    State(state): State<AppState>,
    params: Result<Query<PlanParams>, QueryRejection>,
) -> ApiResult<Json<TripPlan>> {
    let params = PlanParams::extract(params)?;
    let model = params.model()?;
    tracing::info!("plan request with {model}: {:?}", params.query);
    state
        .planner
        .plan(&params.query, model)
        .await
        .map(Json)
        .map_err(plan_error)
}

fn plan_error(err: PlanError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        PlanError::InvalidQuery => StatusCode::UNPROCESSABLE_ENTITY,
        PlanError::Query(QueryError::Unparseable { .. } | QueryError::MissingField(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PlanError::Query(QueryError::Model(_)) | PlanError::Geocode(_) => StatusCode::BAD_GATEWAY,
        PlanError::Route(RouteError::Geometry(_)) | PlanError::Gpx(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        PlanError::Route(_) => StatusCode::BAD_GATEWAY,
    };

    if status.is_server_error() {
        tracing::error!("plan failed: {err}");
    } else {
        tracing::info!("plan rejected: {err}");
    }
    api_error(status, err.to_string())
}

fn api_error(status: StatusCode, message: String) -> (StatusCode, Json<ApiError>) {
    (status, Json(ApiError { message }))
}
