//! Built-in user authentication.
//!
//! Accounts are created unverified: the signup verification row created in
//! the same transaction as the user is the sole marker of the unverified
//! state, and deleting it (via `/user/verify/{id}`) is what verifies the
//! account. Login issues an opaque access token, replacing any previous one
//! so a user never holds two live tokens. Protected routes resolve the token
//! through [`identity::resolve_identity`] before their handler runs.

pub mod identity;
pub mod login;
pub mod session;
pub mod signup;
pub mod types;
pub mod verify;

mod password;
mod storage;
mod utils;

pub use self::identity::{resolve_identity, Identity};

// seconds for a day
pub(crate) const DEFAULT_SIGNUP_VERIFICATION_TTL_SECONDS: i64 = 86_400;
// access token = two days
pub(crate) const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 172_800;

#[cfg(test)]
mod tests;
