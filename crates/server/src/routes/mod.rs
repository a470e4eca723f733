use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use graphite_studio::layout::{compose, Scene};
use graphite_studio::narration::{construction_steps, ConstructionStep};
use graphite_studio::state::ChatError;
use graphite_studio::{AiError, GenerateError, TutorContext, ViewState};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::{ImagePayload, Model, ModelSummary, PayloadError, Unit, ViewMode};
use thiserror::Error;

use crate::AppState;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("model '{0}' not found")]
    NotFound(String),

    #[error("no active model")]
    NoActiveModel,

    #[error("GEMINI_API_KEY is not configured")]
    MissingCredential,

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("stored image is unreadable: {0}")]
    Payload(#[from] PayloadError),
}

fn ai_status(e: &AiError) -> StatusCode {
    match e {
        AiError::MissingCredential => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) | ApiError::NoActiveModel => StatusCode::NOT_FOUND,
            ApiError::MissingCredential => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Generate(GenerateError::Busy) => StatusCode::CONFLICT,
            ApiError::Generate(GenerateError::InvalidDrawing { .. })
            | ApiError::Generate(GenerateError::Ingest(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Generate(GenerateError::Ai(e)) => ai_status(e),
            ApiError::Chat(ChatError::UnknownModel(_)) => StatusCode::NOT_FOUND,
            ApiError::Chat(ChatError::EmptyMessage) => StatusCode::BAD_REQUEST,
            ApiError::Chat(ChatError::Ai(e)) => ai_status(e),
            ApiError::Payload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{self}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl AppState {
    fn credential(&self) -> Result<&str, ApiError> {
        self.api_key.as_deref().ok_or(ApiError::MissingCredential)
    }

    fn model(&self, id: &str) -> Result<Model, ApiError> {
        self.store
            .model(id)
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }
}

/// Health check
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// History, newest first
pub async fn list_models(State(state): State<AppState>) -> Json<Vec<ModelSummary>> {
    Json(state.store.summaries())
}

pub async fn get_model(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Model>, ApiError> {
    Ok(Json(state.model(&id)?))
}

/// The uploaded drawing, decoded, with its own content type
pub async fn original_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let model = state.model(&id)?;
    let payload = ImagePayload::parse(&model.original_image);
    let bytes = payload.decode()?;
    Ok(([(header::CONTENT_TYPE, payload.mime_type)], bytes).into_response())
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Data URL of the drawing
    pub image: String,
}

pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<Model>), ApiError> {
    let credential = state.credential()?;
    let id = state.store.generate_model(&request.image, credential).await?;
    Ok((StatusCode::CREATED, Json(state.model(&id)?)))
}

pub async fn select_model(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.store.set_current_model(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(id))
    }
}

pub async fn get_view(State(state): State<AppState>) -> Json<ViewState> {
    Json(state.store.view())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPatch {
    pub view_mode: Option<ViewMode>,
    pub unit: Option<Unit>,
    pub wireframe: Option<bool>,
    pub show_dimensions: Option<bool>,
}

pub async fn update_view(
    State(state): State<AppState>,
    Json(patch): Json<ViewPatch>,
) -> Json<ViewState> {
    let store = &state.store;
    if let Some(mode) = patch.view_mode {
        store.set_view_mode(mode);
    }
    if let Some(unit) = patch.unit {
        store.set_unit(unit);
    }
    if let Some(on) = patch.wireframe {
        store.set_wireframe(on);
    }
    if let Some(on) = patch.show_dimensions {
        if on != store.view().show_dimensions {
            store.toggle_show_dimensions();
        }
    }
    Json(store.view())
}

#[derive(Debug, Deserialize)]
pub struct StepsQuery {
    pub unit: Option<Unit>,
}

/// Numbered construction steps, in the view unit unless `?unit=` says otherwise
pub async fn steps(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<StepsQuery>,
) -> Result<Json<Vec<ConstructionStep>>, ApiError> {
    let model = state.model(&id)?;
    let unit = query.unit.unwrap_or(state.store.view().unit);
    Ok(Json(construction_steps(&model.parts, unit)))
}

/// Composed scene of the active model under the current view
pub async fn scene(State(state): State<AppState>) -> Result<Json<Scene>, ApiError> {
    let model = state.store.current_model().ok_or(ApiError::NoActiveModel)?;
    Ok(Json(compose(&model.parts, &state.store.view())))
}

#[derive(Debug, Serialize)]
pub struct TutorMessage {
    pub message: String,
}

pub async fn welcome(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TutorMessage>, ApiError> {
    let model = state.model(&id)?;
    Ok(Json(TutorMessage {
        message: TutorContext::from_model(&model).welcome_message(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

pub async fn chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<TutorMessage>, ApiError> {
    let credential = state.credential()?;
    let reply = state.store.chat(&id, &request.message, credential).await?;
    Ok(Json(TutorMessage { message: reply }))
}
