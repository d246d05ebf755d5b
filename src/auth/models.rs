//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// JWT claims structure
#[derive(Serialize, Deserialize, Debug)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// User database model
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
    /// 'email' or 'google'
    pub provider: String,
    /// Google subject id; NULL for email-provider users
    pub provider_id: Option<String>,
    pub created_at: Option<String>,
}

/// What a one-time passcode is proving control of the address for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    Signup,
    Login,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::Signup => "signup",
            OtpPurpose::Login => "login",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "signup" => Some(OtpPurpose::Signup),
            "login" => Some(OtpPurpose::Login),
            _ => None,
        }
    }
}

/// POST /api/auth/otp/request body
#[derive(Deserialize)]
pub struct OtpRequestPayload {
    pub email: String,
    pub purpose: String,
}

/// POST /api/auth/otp/verify body
#[derive(Deserialize)]
pub struct OtpVerifyPayload {
    pub email: String,
    pub code: String,
    pub purpose: String,
}

/// POST /api/auth/google body
#[derive(Deserialize)]
pub struct GoogleIdTokenPayload {
    #[serde(rename = "idToken", alias = "id_token")]
    pub id_token: String,
}
