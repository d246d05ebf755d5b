// src/common/id_generator.rs
//! Crockford Base32 ID Generator
//!
//! Generates human-readable, prefixed IDs using Crockford Base32 encoding.
//! Format: PREFIX_XXXXXX (e.g., N_K7NP3X for notes)
//!
//! Benefits:
//! - No ambiguous characters (excludes I, L, O, U)
//! - Case-insensitive
//! - ~1 billion combinations per entity type (32^6)
//! - Easy to read, type, and communicate verbally

use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// User account (U_)
    User,
    /// Note (N_)
    Note,
    /// One-time passcode record (P_)
    Otp,
}

impl EntityPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::User => "U",
            EntityPrefix::Note => "N",
            EntityPrefix::Otp => "P",
        }
    }
}

/// Generate a random Crockford Base32 string of specified length
fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a prefixed ID using Crockford Base32 encoding
///
/// Returns a string in format "PREFIX_XXXXXX" (e.g., "N_K7NP3X")
pub fn generate_id(prefix: EntityPrefix) -> String {
    format!("{}_{}", prefix.as_str(), generate_crockford_string(6))
}

/// Generate a User ID (U_XXXXXX)
pub fn generate_user_id() -> String {
    generate_id(EntityPrefix::User)
}

/// Generate a Note ID (N_XXXXXX)
pub fn generate_note_id() -> String {
    generate_id(EntityPrefix::Note)
}

/// Generate an OTP record ID (P_XXXXXX)
pub fn generate_otp_id() -> String {
    generate_id(EntityPrefix::Otp)
}

/// Generate a fixed-length numeric one-time passcode.
///
/// `thread_rng` is a CSPRNG, so codes are not guessable from prior codes.
pub fn generate_otp_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length).map(|_| rng.gen_range(0..10).to_string()).collect()
}
