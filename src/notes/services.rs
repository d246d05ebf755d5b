use super::models::{CreateNoteRequest, Note};
use crate::common::{generate_note_id, with_retry, ApiError, Validator};
use sqlx::SqlitePool;
use tracing::info;

pub struct NotesService {
    db: SqlitePool,
}

impl NotesService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// All notes owned by `user_id`, newest first.
    pub async fn list_notes(&self, user_id: &str) -> Result<Vec<Note>, ApiError> {
        let notes = sqlx::query_as::<_, Note>(
            r#"
            SELECT id, user_id, title, body, created_at
            FROM notes
            WHERE user_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(notes)
    }

    /// Create a note for `user_id`. Oversize input is rejected, never
    /// truncated.
    pub async fn create_note(
        &self,
        user_id: &str,
        request: CreateNoteRequest,
    ) -> Result<Note, ApiError> {
        let validation_result = request.validate(&request);
        if !validation_result.is_valid {
            return Err(ApiError::from(validation_result));
        }

        let note = Note {
            id: generate_note_id(),
            user_id: user_id.to_string(),
            title: request.title,
            body: request.body,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        {
            let db = self.db.clone();
            let note = note.clone();
            with_retry(move || {
                let db = db.clone();
                let note = note.clone();
                async move {
                    sqlx::query(
                        r#"
                        INSERT INTO notes (id, user_id, title, body, created_at)
                        VALUES (?, ?, ?, ?, ?)
                        "#,
                    )
                    .bind(&note.id)
                    .bind(&note.user_id)
                    .bind(&note.title)
                    .bind(&note.body)
                    .bind(&note.created_at)
                    .execute(&db)
                    .await
                }
            })
            .await
            .map_err(ApiError::DatabaseError)?;
        }

        info!(note_id = %note.id, user_id = %user_id, "Note created");

        Ok(note)
    }

    /// Delete a note owned by `user_id`.
    ///
    /// A missing id is 404 even if it existed earlier — a repeated delete
    /// does not report success. An id owned by someone else is 403; the
    /// existence of foreign notes is not hidden behind 404.
    pub async fn delete_note(&self, user_id: &str, note_id: &str) -> Result<(), ApiError> {
        let owner: Option<(String,)> =
            sqlx::query_as("SELECT user_id FROM notes WHERE id = ?")
                .bind(note_id)
                .fetch_optional(&self.db)
                .await
                .map_err(ApiError::DatabaseError)?;

        let owner = match owner {
            Some((owner,)) => owner,
            None => return Err(ApiError::NotFound("note not found".to_string())),
        };

        if owner != user_id {
            return Err(ApiError::Forbidden("access denied".to_string()));
        }

        {
            let db = self.db.clone();
            let note_id = note_id.to_string();
            with_retry(move || {
                let db = db.clone();
                let note_id = note_id.clone();
                async move {
                    sqlx::query("DELETE FROM notes WHERE id = ? AND user_id = ?")
                        .bind(&note_id)
                        .bind(user_id)
                        .execute(&db)
                        .await
                }
            })
            .await
            .map_err(ApiError::DatabaseError)?;
        }

        info!(note_id = %note_id, user_id = %user_id, "Note deleted");

        Ok(())
    }
}
