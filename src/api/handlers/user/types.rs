//! Request and domain types for the user auth endpoints.

use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Account record. The credential hash never leaves the process: it is not
/// serialized and must not be logged.
#[derive(Serialize, Clone, Debug)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(rename = "created_at")]
    pub created_at_unix: i64,
    #[serde(rename = "updated_at")]
    pub updated_at_unix: i64,
}

/// Bearer token for a logged-in user. The id is the opaque token value
/// itself; a user holds at most one at a time.
#[derive(Serialize, Clone, Debug)]
pub struct AccessToken {
    pub id: String,
    pub user_id: String,
    pub ttl: i64,
    #[serde(rename = "created_at")]
    pub created_at_unix: i64,
}

/// Marker record: while it exists the account has not completed signup
/// verification. Deleting it is the verified transition.
#[derive(Serialize, Clone, Debug)]
pub struct SignupVerification {
    pub id: String,
    pub user_id: String,
    pub ttl: i64,
    #[serde(rename = "created_at")]
    pub created_at_unix: i64,
}
