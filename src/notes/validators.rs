use super::models::CreateNoteRequest;
use crate::common::{ValidationResult, Validator};

pub const MAX_TITLE_LENGTH: usize = 120;
pub const MAX_BODY_LENGTH: usize = 2000;

impl Validator<CreateNoteRequest> for CreateNoteRequest {
    fn validate(&self, data: &CreateNoteRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.title.trim().is_empty() {
            result.add_error("title", "Title is required");
        } else if data.title.chars().count() > MAX_TITLE_LENGTH {
            result.add_error("title", "Title must not exceed 120 characters");
        }

        if data.body.chars().count() > MAX_BODY_LENGTH {
            result.add_error("body", "Body must not exceed 2000 characters");
        }

        result
    }
}
