//! Small helpers for identifier generation and input normalization.

use anyhow::{Context, Result};
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use uuid::Uuid;

/// Create an unguessable opaque id for tokens and verification records.
///
/// 32 bytes of OS randomness, url-safe base64 without padding.
pub(super) fn generate_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Fresh user id.
pub(super) fn generate_user_id() -> String {
    Uuid::new_v4().to_string()
}

/// Normalize an email for lookup/uniqueness checks.
///
/// Emails are compared case-insensitively; usernames are compared exactly.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}
