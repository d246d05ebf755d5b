//! Notes routes

use axum::{
    routing::{delete, get},
    Router,
};

use super::handlers;

/// Creates the notes router
///
/// # Routes
/// - `GET /api/notes` - List notes for the authenticated user
/// - `POST /api/notes` - Create a note
/// - `DELETE /api/notes/:id` - Delete a note
///
/// All routes require a bearer token; the `AuthedUser` extractor rejects
/// unauthenticated requests before the handlers run.
pub fn notes_routes() -> Router {
    Router::new()
        .route(
            "/api/notes",
            get(handlers::list_notes).post(handlers::create_note),
        )
        .route("/api/notes/:id", delete(handlers::delete_note))
}
