//! JSON HTTP layer for the hanzi learning platform.
//!
//! Exposes an axum [`Router`] backed by any
//! [`PlatformStore`](hanzi_core::store::PlatformStore): invitation-gated
//! registration, bearer-token sessions, the course catalog, enrollment,
//! and the spaced-repetition review queue.

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use hanzi_core::store::PlatformStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use handlers::{auth as auth_routes, courses, health, reviews};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  pub store_path:        PathBuf,
  /// Bearer tokens expire this many minutes after issue.
  #[serde(default = "default_token_ttl_minutes")]
  pub token_ttl_minutes: i64,
}

fn default_token_ttl_minutes() -> i64 {
  30
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: PlatformStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the platform API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: PlatformStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Auth
    .route("/api/auth/register", post(auth_routes::register::<S>))
    .route("/api/auth/login", post(auth_routes::login::<S>))
    .route("/api/auth/logout", post(auth_routes::logout::<S>))
    .route("/api/auth/me", get(auth_routes::me::<S>))
    // Course catalog
    .route("/api/courses", get(courses::list::<S>))
    .route("/api/courses/{id}", get(courses::get_one::<S>))
    .route("/api/courses/{id}/enroll", post(courses::enroll::<S>))
    // Spaced repetition
    .route("/api/reviews/due", get(reviews::due::<S>))
    .route("/api/reviews/submit", post(reviews::submit::<S>))
    // Monitoring
    .route("/health", get(health::handler))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::{Duration, Utc};
  use hanzi_core::{
    course::{NewCourse, NewLesson},
    review::NewCharacter,
    store::PlatformStore,
  };
  use hanzi_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use crate::auth::token_digest;

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    AppState {
      store:  Arc::new(store),
      config: Arc::new(ServerConfig {
        host:              "127.0.0.1".to_string(),
        port:              8000,
        store_path:        PathBuf::from(":memory:"),
        token_ttl_minutes: 30,
      }),
    }
  }

  async fn request(
    state:  AppState<SqliteStore>,
    method: &str,
    uri:    &str,
    token:  Option<&str>,
    body:   Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
      Some(v) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(v.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };

    let resp = router(state).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  /// Register a fresh user behind a minted invitation; returns the token.
  async fn register(state: &AppState<SqliteStore>, email: &str) -> String {
    state
      .store
      .create_invitation(format!("inv-{email}"))
      .await
      .unwrap();

    let (status, body) = request(
      state.clone(),
      "POST",
      "/api/auth/register",
      None,
      Some(json!({
        "email": email,
        "password": "correct horse",
        "username": "learner",
        "invitation_code": format!("inv-{email}"),
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    body["access_token"].as_str().unwrap().to_string()
  }

  /// Create a published course with lessons and two characters.
  async fn seed_course(state: &AppState<SqliteStore>) -> Uuid {
    let course = state
      .store
      .create_course(NewCourse {
        title:       "HSK 1".into(),
        description: "Starter characters".into(),
        published:   true,
      })
      .await
      .unwrap();

    for (sequence, title) in [(2, "Tones"), (1, "Strokes")] {
      state
        .store
        .add_lesson(NewLesson {
          course_id: course.course_id,
          sequence,
          title: title.into(),
          body: "...".into(),
        })
        .await
        .unwrap();
    }

    for (glyph, pinyin, meaning) in
      [("水", "shuǐ", "water"), ("火", "huǒ", "fire")]
    {
      state
        .store
        .add_character(NewCharacter {
          course_id: course.course_id,
          glyph:     glyph.into(),
          pinyin:    pinyin.into(),
          meaning:   meaning.into(),
        })
        .await
        .unwrap();
    }

    course.course_id
  }

  // ── Auth flow ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn register_login_me_flow() {
    let state = make_state().await;
    register(&state, "alice@example.com").await;

    let (status, body) = request(
      state.clone(),
      "POST",
      "/api/auth/login",
      None,
      Some(json!({ "email": "alice@example.com", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["user"]["email"], "alice@example.com");
    let token = body["access_token"].as_str().unwrap().to_string();

    let (status, body) =
      request(state, "GET", "/api/auth/me", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["username"], "learner");
    assert!(body.get("password_hash").is_none());
  }

  #[tokio::test]
  async fn register_rejects_bad_invitation() {
    let state = make_state().await;
    let (status, body) = request(
      state,
      "POST",
      "/api/auth/register",
      None,
      Some(json!({
        "email": "alice@example.com",
        "password": "correct horse",
        "username": "learner",
        "invitation_code": "never-minted",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid or used invitation code");
  }

  #[tokio::test]
  async fn register_rejects_reused_invitation() {
    let state = make_state().await;
    state.store.create_invitation("once".into()).await.unwrap();

    let payload = |email: &str| {
      json!({
        "email": email,
        "password": "correct horse",
        "username": "learner",
        "invitation_code": "once",
      })
    };

    let (status, _) = request(
      state.clone(),
      "POST",
      "/api/auth/register",
      None,
      Some(payload("first@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = request(
      state,
      "POST",
      "/api/auth/register",
      None,
      Some(payload("second@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn register_rejects_weak_password_and_short_username() {
    let state = make_state().await;
    state.store.create_invitation("inv".into()).await.unwrap();

    let (status, body) = request(
      state.clone(),
      "POST",
      "/api/auth/register",
      None,
      Some(json!({
        "email": "alice@example.com",
        "password": "short",
        "username": "learner",
        "invitation_code": "inv",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = request(
      state,
      "POST",
      "/api/auth/register",
      None,
      Some(json!({
        "email": "alice@example.com",
        "password": "correct horse",
        "username": "ab",
        "invitation_code": "inv",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn register_rejects_duplicate_email() {
    let state = make_state().await;
    register(&state, "alice@example.com").await;
    state.store.create_invitation("inv-2".into()).await.unwrap();

    let (status, body) = request(
      state,
      "POST",
      "/api/auth/register",
      None,
      Some(json!({
        "email": "alice@example.com",
        "password": "correct horse",
        "username": "learner",
        "invitation_code": "inv-2",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "email already registered");
  }

  #[tokio::test]
  async fn login_with_wrong_password_returns_401() {
    let state = make_state().await;
    register(&state, "alice@example.com").await;

    let (status, _) = request(
      state,
      "POST",
      "/api/auth/login",
      None,
      Some(json!({ "email": "alice@example.com", "password": "wrong horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn me_without_token_returns_401_with_challenge() {
    let state = make_state().await;
    let req = Request::builder()
      .method("GET")
      .uri("/api/auth/me")
      .body(Body::empty())
      .unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let challenge = resp
      .headers()
      .get(header::WWW_AUTHENTICATE)
      .unwrap()
      .to_str()
      .unwrap();
    assert!(challenge.starts_with("Bearer"), "challenge: {challenge}");
  }

  #[tokio::test]
  async fn logout_revokes_the_session() {
    let state = make_state().await;
    let token = register(&state, "alice@example.com").await;

    let (status, _) = request(
      state.clone(),
      "POST",
      "/api/auth/logout",
      Some(token.as_str()),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) =
      request(state, "GET", "/api/auth/me", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn expired_token_is_rejected() {
    let state = make_state().await;
    register(&state, "alice@example.com").await;
    let user = state
      .store
      .get_credentials("alice@example.com")
      .await
      .unwrap()
      .unwrap()
      .user;

    let stale = "0123456789abcdef0123456789abcdef";
    state
      .store
      .create_session(
        user.user_id,
        token_digest(stale),
        Utc::now() - Duration::minutes(1),
      )
      .await
      .unwrap();

    let (status, _) =
      request(state, "GET", "/api/auth/me", Some(stale), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  // ── Course catalog ────────────────────────────────────────────────────────

  #[tokio::test]
  async fn courses_lists_only_published() {
    let state = make_state().await;
    seed_course(&state).await;
    state
      .store
      .create_course(NewCourse {
        title:       "Draft".into(),
        description: "Unready".into(),
        published:   false,
      })
      .await
      .unwrap();

    let (status, body) =
      request(state, "GET", "/api/courses", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let courses = body.as_array().unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0]["title"], "HSK 1");
  }

  #[tokio::test]
  async fn course_detail_includes_ordered_content() {
    let state = make_state().await;
    let course_id = seed_course(&state).await;

    let (status, body) = request(
      state,
      "GET",
      &format!("/api/courses/{course_id}"),
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "HSK 1");

    let content = body["content"].as_array().unwrap();
    assert_eq!(content.len(), 2);
    assert_eq!(content[0]["title"], "Strokes");
    assert_eq!(content[1]["title"], "Tones");
  }

  #[tokio::test]
  async fn unknown_course_returns_404() {
    let state = make_state().await;
    let (status, _) = request(
      state,
      "GET",
      &format!("/api/courses/{}", Uuid::new_v4()),
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Enrollment ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn enroll_seeds_the_due_queue() {
    let state = make_state().await;
    let token = register(&state, "alice@example.com").await;
    let course_id = seed_course(&state).await;

    let (status, body) = request(
      state.clone(),
      "POST",
      &format!("/api/courses/{course_id}/enroll"),
      Some(token.as_str()),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["progress"], 0);
    assert_eq!(body["course_id"], course_id.to_string());

    let (status, body) =
      request(state, "GET", "/api/reviews/due", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    let reviews = body["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 2);
    for entry in reviews {
      assert_eq!(entry["review"]["repetition_count"], 0);
      assert!(entry["character"]["glyph"].is_string());
    }
  }

  #[tokio::test]
  async fn enroll_twice_returns_400() {
    let state = make_state().await;
    let token = register(&state, "alice@example.com").await;
    let course_id = seed_course(&state).await;

    let uri = format!("/api/courses/{course_id}/enroll");
    let (status, _) =
      request(state.clone(), "POST", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = request(state, "POST", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "already enrolled in this course");
  }

  #[tokio::test]
  async fn enroll_unknown_course_returns_404() {
    let state = make_state().await;
    let token = register(&state, "alice@example.com").await;

    let (status, _) = request(
      state,
      "POST",
      &format!("/api/courses/{}/enroll", Uuid::new_v4()),
      Some(token.as_str()),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn enroll_requires_auth() {
    let state = make_state().await;
    let course_id = seed_course(&state).await;

    let (status, _) = request(
      state,
      "POST",
      &format!("/api/courses/{course_id}/enroll"),
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  // ── Reviews ───────────────────────────────────────────────────────────────

  /// Enroll and return (token, id of one due review).
  async fn enrolled_with_due_review(
    state: &AppState<SqliteStore>,
  ) -> (String, Uuid) {
    let token = register(state, "alice@example.com").await;
    let course_id = seed_course(state).await;
    let (_, _) = request(
      state.clone(),
      "POST",
      &format!("/api/courses/{course_id}/enroll"),
      Some(token.as_str()),
      None,
    )
    .await;

    let (_, body) = request(
      state.clone(),
      "GET",
      "/api/reviews/due",
      Some(token.as_str()),
      None,
    )
    .await;
    let review_id = body["reviews"][0]["review"]["review_id"]
      .as_str()
      .unwrap()
      .parse()
      .unwrap();
    (token, review_id)
  }

  #[tokio::test]
  async fn submit_reschedules_and_drains_the_queue() {
    let state = make_state().await;
    let (token, review_id) = enrolled_with_due_review(&state).await;

    let (status, body) = request(
      state.clone(),
      "POST",
      "/api/reviews/submit",
      Some(token.as_str()),
      Some(json!({ "review_id": review_id, "quality": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["interval_days"].as_f64().unwrap(), 1.0);
    assert_eq!(body["ease_factor"].as_f64().unwrap(), 2.5);
    assert!(body["next_review_at"].is_string());

    // The rescheduled record is a day out; only the other seeded review
    // remains due.
    let (status, body) =
      request(state, "GET", "/api/reviews/due", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_ne!(
      body["reviews"][0]["review"]["review_id"],
      review_id.to_string()
    );
  }

  #[tokio::test]
  async fn submit_rejects_out_of_range_quality_without_touching_state() {
    let state = make_state().await;
    let (token, review_id) = enrolled_with_due_review(&state).await;
    let user = state
      .store
      .get_credentials("alice@example.com")
      .await
      .unwrap()
      .unwrap()
      .user;

    for quality in [-1, 6] {
      let (status, body) = request(
        state.clone(),
        "POST",
        "/api/reviews/submit",
        Some(token.as_str()),
        Some(json!({ "review_id": review_id, "quality": quality })),
      )
      .await;
      assert_eq!(status, StatusCode::BAD_REQUEST, "quality {quality}: {body}");
    }

    let record = state
      .store
      .get_review(review_id, user.user_id)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(record.revision, 0);
    assert_eq!(record.repetition_count, 0);
    assert!(record.last_reviewed_at.is_none());
  }

  #[tokio::test]
  async fn submit_unknown_review_returns_404() {
    let state = make_state().await;
    let token = register(&state, "alice@example.com").await;

    let (status, _) = request(
      state,
      "POST",
      "/api/reviews/submit",
      Some(token.as_str()),
      Some(json!({ "review_id": Uuid::new_v4(), "quality": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn submit_against_foreign_review_returns_404() {
    let state = make_state().await;
    let (_owner_token, review_id) = enrolled_with_due_review(&state).await;
    let intruder = register(&state, "mallory@example.com").await;

    let (status, _) = request(
      state,
      "POST",
      "/api/reviews/submit",
      Some(intruder.as_str()),
      Some(json!({ "review_id": review_id, "quality": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn reviews_require_auth() {
    let state = make_state().await;

    let (status, _) =
      request(state.clone(), "GET", "/api/reviews/due", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(
      state,
      "POST",
      "/api/reviews/submit",
      None,
      Some(json!({ "review_id": Uuid::new_v4(), "quality": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  // ── Health ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn health_reports_status_and_version() {
    let state = make_state().await;
    let (status, body) = request(state, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["timestamp"].is_string());
  }
}
