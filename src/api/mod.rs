use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use crate::counter::{CounterSnapshot, MatchCounterStore};
use crate::error::{PredictError, StoreError};
use crate::predictor::Predictor;

#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
    /// `None` when match tracking is disabled
    pub counter: Option<Arc<dyn MatchCounterStore>>,
}

/// Build the Axum router for the prediction API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict_handler))
        .route("/contador", get(pair_count_handler))
        .route("/counter", get(counter_handler))
        .route("/teams", get(teams_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Error body returned by every route: `{"error": message}`.
#[derive(Debug)]
pub enum ApiError {
    /// Caller mistake: missing field, unknown team, unreadable body
    BadRequest(String),
    /// Counter routes with tracking disabled
    NotFound(String),
    /// Anything else; reported as "Error interno: …"
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(m) | ApiError::NotFound(m) => m.clone(),
            ApiError::Internal(m) => format!("Error interno: {}", m),
        }
    }

    fn missing_teams() -> Self {
        ApiError::BadRequest("Request must include both 'team1' and 'team2'".into())
    }

    fn tracking_disabled() -> Self {
        ApiError::NotFound("Match tracking is disabled".into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<PredictError> for ApiError {
    fn from(e: PredictError) -> Self {
        match e {
            PredictError::UnknownTeam(_) => ApiError::BadRequest(e.to_string()),
            PredictError::InvalidModelOutput(..) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        error!("Counter storage failure: {}", e);
        ApiError::Internal(e.to_string())
    }
}

/// Both teams of a request; blank names count as missing.
#[derive(Debug, Default, Deserialize)]
pub struct TeamPair {
    pub team1: Option<String>,
    pub team2: Option<String>,
}

impl TeamPair {
    fn required(&self) -> Result<(&str, &str), ApiError> {
        match (self.team1.as_deref(), self.team2.as_deref()) {
            (Some(t1), Some(t2)) if !t1.is_empty() && !t2.is_empty() => Ok((t1, t2)),
            _ => Err(ApiError::missing_teams()),
        }
    }
}

/// POST /predict {"team1": "...", "team2": "..."}
pub async fn predict_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TeamPair>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(pair) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let (team1, team2) = pair.required()?;

    let result = state.predictor.predict(team1, team2).map_err(|e| {
        warn!("Rejected prediction {} vs {}: {}", team1, team2, e);
        ApiError::from(e)
    })?;

    // Keys are the caller's own team names.
    let mut body = Map::new();
    body.insert(result.team1.clone(), json!(result.probability1));
    body.insert(result.team2.clone(), json!(result.probability2));
    body.insert("recommendation".into(), json!(result.recommendation));

    if let Some(counter) = &state.counter {
        let count = counter.increment(team1, team2)?;
        body.insert("match_count".into(), json!(count));
    }

    Ok(Json(Value::Object(body)))
}

/// GET /contador?team1=...&team2=...
pub async fn pair_count_handler(
    State(state): State<Arc<AppState>>,
    Query(pair): Query<TeamPair>,
) -> Result<Json<Value>, ApiError> {
    let counter = state.counter.as_ref().ok_or_else(ApiError::tracking_disabled)?;
    let (team1, team2) = pair.required()?;
    let count = counter.get(team1, team2)?;
    Ok(Json(json!({ "team1": team1, "team2": team2, "count": count })))
}

/// GET /counter
pub async fn counter_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CounterSnapshot>, ApiError> {
    let counter = state.counter.as_ref().ok_or_else(ApiError::tracking_disabled)?;
    Ok(Json(counter.snapshot()?))
}

/// GET /teams
pub async fn teams_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "teams": state.predictor.stats().team_names() }))
}

/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "teams": state.predictor.stats().len(),
        "model": state.predictor.model_kind(),
        "counter": state.counter.as_ref().map(|c| c.name().to_string()),
    }))
}
