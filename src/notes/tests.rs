//! Tests for notes module
//!
//! Validation boundaries plus service behavior against an in-memory
//! SQLite pool: ownership scoping, ordering, and the delete status ladder.

#[cfg(test)]
mod tests {
    use super::super::models::CreateNoteRequest;
    use super::super::services::NotesService;
    use crate::common::test_support::test_pool;
    use crate::common::{ApiError, Validator};

    fn request(title: &str, body: &str) -> CreateNoteRequest {
        CreateNoteRequest {
            title: title.to_string(),
            body: body.to_string(),
        }
    }

    async fn seed_user(pool: &sqlx::SqlitePool, id: &str) {
        sqlx::query("INSERT INTO users (id, email, provider) VALUES (?, ?, 'email')")
            .bind(id)
            .bind(format!("{}@example.com", id.to_lowercase()))
            .execute(pool)
            .await
            .unwrap();
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    #[test]
    fn test_title_boundary_120_accepted_121_rejected() {
        let at_limit = request(&"x".repeat(120), "body");
        assert!(at_limit.validate(&at_limit).is_valid);

        let over_limit = request(&"x".repeat(121), "body");
        assert!(!over_limit.validate(&over_limit).is_valid);
    }

    #[test]
    fn test_body_boundary_2000_accepted_2001_rejected() {
        let at_limit = request("title", &"x".repeat(2000));
        assert!(at_limit.validate(&at_limit).is_valid);

        let over_limit = request("title", &"x".repeat(2001));
        assert!(!over_limit.validate(&over_limit).is_valid);
    }

    #[test]
    fn test_empty_title_rejected() {
        let empty = request("", "body");
        assert!(!empty.validate(&empty).is_valid);

        let whitespace = request("   ", "body");
        assert!(!whitespace.validate(&whitespace).is_valid);
    }

    #[test]
    fn test_empty_body_accepted() {
        let no_body = request("title", "");
        assert!(no_body.validate(&no_body).is_valid);
    }

    // ------------------------------------------------------------------
    // Service behavior
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_then_list_round_trip() {
        let pool = test_pool().await;
        seed_user(&pool, "U_ALICE1").await;
        let service = NotesService::new(pool.clone());

        let created = service
            .create_note("U_ALICE1", request("T", "B"))
            .await
            .unwrap();
        assert!(created.id.starts_with("N_"));

        let notes = service.list_notes("U_ALICE1").await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, created.id);
        assert_eq!(notes[0].title, "T");
        assert_eq!(notes[0].body, "B");
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let pool = test_pool().await;
        seed_user(&pool, "U_ALICE1").await;
        let service = NotesService::new(pool.clone());

        let first = service
            .create_note("U_ALICE1", request("first", ""))
            .await
            .unwrap();
        let second = service
            .create_note("U_ALICE1", request("second", ""))
            .await
            .unwrap();

        let notes = service.list_notes("U_ALICE1").await.unwrap();
        assert_eq!(notes[0].id, second.id);
        assert_eq!(notes[1].id, first.id);
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_owner() {
        let pool = test_pool().await;
        seed_user(&pool, "U_ALICE1").await;
        seed_user(&pool, "U_BOB001").await;
        let service = NotesService::new(pool.clone());

        service
            .create_note("U_ALICE1", request("alice note", ""))
            .await
            .unwrap();
        service
            .create_note("U_BOB001", request("bob note", ""))
            .await
            .unwrap();

        let alice_notes = service.list_notes("U_ALICE1").await.unwrap();
        assert_eq!(alice_notes.len(), 1);
        assert_eq!(alice_notes[0].title, "alice note");

        let bob_notes = service.list_notes("U_BOB001").await.unwrap();
        assert_eq!(bob_notes.len(), 1);
        assert_eq!(bob_notes[0].title, "bob note");
    }

    #[tokio::test]
    async fn test_oversize_note_is_not_persisted() {
        let pool = test_pool().await;
        seed_user(&pool, "U_ALICE1").await;
        let service = NotesService::new(pool.clone());

        let result = service
            .create_note("U_ALICE1", request(&"x".repeat(121), "body"))
            .await;
        assert!(matches!(result, Err(ApiError::ValidationError(_))));

        let notes = service.list_notes("U_ALICE1").await.unwrap();
        assert!(notes.is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_note_is_not_found() {
        let pool = test_pool().await;
        seed_user(&pool, "U_ALICE1").await;
        let service = NotesService::new(pool.clone());

        let result = service.delete_note("U_ALICE1", "N_MISSNG").await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_foreign_note_is_forbidden() {
        let pool = test_pool().await;
        seed_user(&pool, "U_ALICE1").await;
        seed_user(&pool, "U_BOB001").await;
        let service = NotesService::new(pool.clone());

        let note = service
            .create_note("U_ALICE1", request("alice note", ""))
            .await
            .unwrap();

        let result = service.delete_note("U_BOB001", &note.id).await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));

        // the note survives the failed delete
        let notes = service.list_notes("U_ALICE1").await.unwrap();
        assert_eq!(notes.len(), 1);
    }

    #[tokio::test]
    async fn test_owner_delete_then_repeat_is_not_found() {
        let pool = test_pool().await;
        seed_user(&pool, "U_ALICE1").await;
        let service = NotesService::new(pool.clone());

        let note = service
            .create_note("U_ALICE1", request("to delete", ""))
            .await
            .unwrap();

        service.delete_note("U_ALICE1", &note.id).await.unwrap();

        let notes = service.list_notes("U_ALICE1").await.unwrap();
        assert!(notes.is_empty());

        // repeated delete of the same id reports 404, not success
        let repeat = service.delete_note("U_ALICE1", &note.id).await;
        assert!(matches!(repeat, Err(ApiError::NotFound(_))));
    }
}
