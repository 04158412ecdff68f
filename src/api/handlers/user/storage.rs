//! Database access for users, access tokens, and signup verifications.
//!
//! Lookups return `Result<Option<T>>` so call sites decide explicitly what
//! "not found" means. Multi-step writes (user + verification, token replace)
//! run inside a single transaction so a crash or a concurrent request cannot
//! leave half the state behind.

use anyhow::{Context, Result};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;

use super::types::{AccessToken, SignupVerification, User};
use super::utils::{generate_token, generate_user_id};
use super::{DEFAULT_ACCESS_TOKEN_TTL_SECONDS, DEFAULT_SIGNUP_VERIFICATION_TTL_SECONDS};

/// Outcome when attempting to create a new user + verification record.
#[derive(Debug)]
pub(super) enum SignupOutcome {
    Created {
        user: User,
        verification: SignupVerification,
    },
    /// A unique index rejected the insert (lost race with another signup).
    Conflict,
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at_unix: row.get("created_at_unix"),
        updated_at_unix: row.get("updated_at_unix"),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

pub(super) async fn lookup_user_by_id(pool: &PgPool, user_id: &str) -> Result<Option<User>> {
    let query = r"
        SELECT id, username, email, password_hash,
               EXTRACT(EPOCH FROM created_at)::BIGINT AS created_at_unix,
               EXTRACT(EPOCH FROM updated_at)::BIGINT AS updated_at_unix
        FROM users
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    Ok(row.map(|row| user_from_row(&row)))
}

/// Look up a user by login identifier: exact username match, or
/// case-insensitive email match (`email_normalized` is trim + lowercase).
pub(super) async fn lookup_user_by_identifier(
    pool: &PgPool,
    identifier: &str,
    email_normalized: &str,
) -> Result<Option<User>> {
    let query = r"
        SELECT id, username, email, password_hash,
               EXTRACT(EPOCH FROM created_at)::BIGINT AS created_at_unix,
               EXTRACT(EPOCH FROM updated_at)::BIGINT AS updated_at_unix
        FROM users
        WHERE username = $1 OR email = $2
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(identifier)
        .bind(email_normalized)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by identifier")?;

    Ok(row.map(|row| user_from_row(&row)))
}

/// Check which signup identifiers are already taken. Both checks always run
/// so the caller can report every violated field at once.
pub(super) async fn identifiers_in_use(
    pool: &PgPool,
    email_normalized: &str,
    username: &str,
) -> Result<(bool, bool)> {
    let query = "SELECT 1 FROM users WHERE email = $1 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let email_taken = sqlx::query(query)
        .bind(email_normalized)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check email uniqueness")?
        .is_some();

    let query = "SELECT 1 FROM users WHERE username = $1 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let username_taken = sqlx::query(query)
        .bind(username)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check username uniqueness")?
        .is_some();

    Ok((email_taken, username_taken))
}

/// Create the user and its signup verification as one atomic operation.
///
/// Both rows commit together or not at all; an account can never exist
/// without the marker that says it is unverified.
pub(super) async fn insert_user_and_verification(
    pool: &PgPool,
    username: &str,
    email_normalized: &str,
    password_hash: &str,
) -> Result<SignupOutcome> {
    let mut tx = pool.begin().await.context("begin signup transaction")?;

    let user_id = generate_user_id();
    let query = r"
        INSERT INTO users (id, username, email, password_hash)
        VALUES ($1, $2, $3, $4)
        RETURNING EXTRACT(EPOCH FROM created_at)::BIGINT AS created_at_unix,
                  EXTRACT(EPOCH FROM updated_at)::BIGINT AS updated_at_unix
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(&user_id)
        .bind(username)
        .bind(email_normalized)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .instrument(span)
        .await;

    let row = match row {
        Ok(row) => row,
        Err(err) => {
            if is_unique_violation(&err) {
                let _ = tx.rollback().await;
                return Ok(SignupOutcome::Conflict);
            }
            return Err(err).context("failed to insert user");
        }
    };

    let user = User {
        id: user_id.clone(),
        username: username.to_string(),
        email: email_normalized.to_string(),
        password_hash: password_hash.to_string(),
        created_at_unix: row.get("created_at_unix"),
        updated_at_unix: row.get("updated_at_unix"),
    };

    let verification_id = generate_token()?;
    let query = r"
        INSERT INTO signup_verifications (id, user_id, ttl)
        VALUES ($1, $2, $3)
        RETURNING EXTRACT(EPOCH FROM created_at)::BIGINT AS created_at_unix
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(&verification_id)
        .bind(&user_id)
        .bind(DEFAULT_SIGNUP_VERIFICATION_TTL_SECONDS)
        .fetch_one(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert signup verification")?;

    let verification = SignupVerification {
        id: verification_id,
        user_id,
        ttl: DEFAULT_SIGNUP_VERIFICATION_TTL_SECONDS,
        created_at_unix: row.get("created_at_unix"),
    };

    tx.commit().await.context("commit signup transaction")?;

    Ok(SignupOutcome::Created { user, verification })
}

/// Issue a fresh access token for the user, superseding any existing one.
///
/// A single upsert keyed on the per-user unique index keeps at most one
/// token per user live and replaces it in place, so two concurrent logins
/// cannot trip over each other: the loser's insert becomes an update and
/// both callers get a valid token.
pub(super) async fn issue_access_token(pool: &PgPool, user_id: &str) -> Result<AccessToken> {
    let token_id = generate_token()?;
    let query = r"
        INSERT INTO access_tokens (id, user_id, ttl)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id) DO UPDATE
        SET id = EXCLUDED.id,
            ttl = EXCLUDED.ttl,
            created_at = NOW()
        RETURNING EXTRACT(EPOCH FROM created_at)::BIGINT AS created_at_unix
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(&token_id)
        .bind(user_id)
        .bind(DEFAULT_ACCESS_TOKEN_TTL_SECONDS)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to issue access token")?;

    Ok(AccessToken {
        id: token_id,
        user_id: user_id.to_string(),
        ttl: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
        created_at_unix: row.get("created_at_unix"),
    })
}

/// Resolve a token by id. Only unexpired tokens resolve; expiry is part of
/// the lookup predicate rather than a separate check.
pub(super) async fn lookup_access_token(
    pool: &PgPool,
    token_id: &str,
) -> Result<Option<AccessToken>> {
    let query = r"
        SELECT id, user_id, ttl,
               EXTRACT(EPOCH FROM created_at)::BIGINT AS created_at_unix
        FROM access_tokens
        WHERE id = $1
          AND created_at + (ttl * INTERVAL '1 second') > NOW()
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup access token")?;

    Ok(row.map(|row| AccessToken {
        id: row.get("id"),
        user_id: row.get("user_id"),
        ttl: row.get("ttl"),
        created_at_unix: row.get("created_at_unix"),
    }))
}

pub(super) async fn revoke_access_token(pool: &PgPool, token_id: &str) -> Result<()> {
    // Logout is idempotent; it's fine if no rows are deleted.
    let query = "DELETE FROM access_tokens WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to revoke access token")?;
    Ok(())
}

/// A pending verification row means the account has not been verified.
pub(super) async fn verification_pending(pool: &PgPool, user_id: &str) -> Result<bool> {
    let query = "SELECT 1 FROM signup_verifications WHERE user_id = $1 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check signup verification")?;
    Ok(row.is_some())
}

/// Delete the verification record by id; the deletion is the verified
/// transition. Returns `false` when the id is unknown or already consumed.
pub(super) async fn consume_signup_verification(
    pool: &PgPool,
    verification_id: &str,
) -> Result<bool> {
    let query = "DELETE FROM signup_verifications WHERE id = $1 RETURNING user_id";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(verification_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to consume signup verification")?;
    Ok(row.is_some())
}
