//! Notes handlers

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::models::CreateNoteRequest;
use super::services::NotesService;
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};

/// GET /api/notes - List the authenticated user's notes, newest first
pub async fn list_notes(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
) -> Result<impl IntoResponse, ApiError> {
    let app_state = state.read().await;
    let notes_service = NotesService::new(app_state.db.clone());

    let notes = notes_service.list_notes(&user.id).await?;

    Ok(Json(notes))
}

/// POST /api/notes - Create a note owned by the authenticated user
pub async fn create_note(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(request): Json<CreateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let app_state = state.read().await;
    let notes_service = NotesService::new(app_state.db.clone());

    let note = notes_service.create_note(&user.id, request).await?;

    Ok(Json(note))
}

/// DELETE /api/notes/:id - Delete one of the authenticated user's notes
pub async fn delete_note(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Path(note_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let app_state = state.read().await;
    let notes_service = NotesService::new(app_state.db.clone());

    notes_service.delete_note(&user.id, &note_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
