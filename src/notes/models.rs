//! Notes data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Note database model
///
/// The owner id stays server-side; clients only ever see their own notes,
/// so serializing it would be noise.
#[derive(FromRow, Serialize, Debug, Clone)]
pub struct Note {
    pub id: String,
    #[serde(skip_serializing)]
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub created_at: String,
}

/// POST /api/notes body
#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub title: String,
    pub body: String,
}
