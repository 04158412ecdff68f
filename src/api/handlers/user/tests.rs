//! Router-level tests for paths that terminate before touching the store.

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower::ServiceExt;

use crate::api::app;

fn lazy_pool() -> Result<PgPool> {
    // Never actually dialed by these tests.
    Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
}

async fn send(request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app(lazy_pool()?).oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

#[tokio::test]
async fn token_infos_without_token_is_unauthorized() -> Result<()> {
    let request = Request::builder()
        .uri("/user/token-infos")
        .body(Body::empty())?;
    let (status, body) = send(request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body,
        json!({"status": "fail", "data": {"access_token": "missing access token"}})
    );
    Ok(())
}

#[tokio::test]
async fn logout_without_token_is_unauthorized() -> Result<()> {
    let request = Request::builder().uri("/user/logout").body(Body::empty())?;
    let (status, body) = send(request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body,
        json!({"status": "fail", "data": {"access_token": "missing access token"}})
    );
    Ok(())
}

#[tokio::test]
async fn empty_bearer_counts_as_missing() -> Result<()> {
    let request = Request::builder()
        .uri("/user/token-infos")
        .header("authorization", "Bearer ")
        .body(Body::empty())?;
    let (status, body) = send(request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body,
        json!({"status": "fail", "data": {"access_token": "missing access token"}})
    );
    Ok(())
}

#[tokio::test]
async fn login_with_unparseable_body() -> Result<()> {
    let request = Request::builder()
        .method("POST")
        .uri("/user/login")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))?;
    let (status, body) = send(request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"status": "fail", "data": "invalid json"}));
    Ok(())
}

#[tokio::test]
async fn signup_with_empty_body_names_every_field() -> Result<()> {
    let request = Request::builder()
        .method("POST")
        .uri("/user/signup")
        .header("content-type", "application/json")
        .body(Body::from("{}"))?;
    let (status, body) = send(request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "status": "fail",
            "data": {
                "email": "missing field",
                "username": "missing field",
                "password": "missing field"
            }
        })
    );
    Ok(())
}
