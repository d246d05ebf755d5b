use super::models::{OtpPurpose, OtpRequestPayload, OtpVerifyPayload};
use crate::common::{ValidationResult, Validator};

use super::services::OTP_CODE_LENGTH;

// RFC 5321 path limit; anything longer is garbage input
const MAX_EMAIL_LENGTH: usize = 254;

fn check_email(result: &mut ValidationResult, email: &str) {
    let email = email.trim();

    if email.is_empty() {
        result.add_error("email", "Email is required");
        return;
    }

    if email.len() > MAX_EMAIL_LENGTH {
        result.add_error("email", "Email is too long");
        return;
    }

    let parts: Vec<&str> = email.split('@').collect();
    let shape_ok = parts.len() == 2
        && !parts[0].is_empty()
        && parts[1].contains('.')
        && !parts[1].starts_with('.')
        && !parts[1].ends_with('.');

    if !shape_ok {
        result.add_error("email", "Email address is not valid");
    }
}

fn check_purpose(result: &mut ValidationResult, purpose: &str) {
    if OtpPurpose::parse(purpose).is_none() {
        result.add_error("purpose", "Purpose must be 'signup' or 'login'");
    }
}

impl Validator<OtpRequestPayload> for OtpRequestPayload {
    fn validate(&self, data: &OtpRequestPayload) -> ValidationResult {
        let mut result = ValidationResult::new();
        check_email(&mut result, &data.email);
        check_purpose(&mut result, &data.purpose);
        result
    }
}

impl Validator<OtpVerifyPayload> for OtpVerifyPayload {
    fn validate(&self, data: &OtpVerifyPayload) -> ValidationResult {
        let mut result = ValidationResult::new();
        check_email(&mut result, &data.email);
        check_purpose(&mut result, &data.purpose);

        if data.code.len() != OTP_CODE_LENGTH || !data.code.chars().all(|c| c.is_ascii_digit()) {
            result.add_error("code", "Code must be a 6-digit number");
        }

        result
    }
}
