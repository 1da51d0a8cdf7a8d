//! Handlers for `/api/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/auth/register` | Invitation-gated; returns 201 + token |
//! | `POST` | `/api/auth/login` | Returns a fresh bearer token |
//! | `POST` | `/api/auth/logout` | Revokes the presented session |
//! | `GET`  | `/api/auth/me` | Current authenticated user |

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
};
use chrono::{Duration, Utc};
use hanzi_core::{
  store::PlatformStore,
  user::{NewUser, User},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  auth::{
    CurrentUser, bearer_token, generate_token, hash_password, token_digest,
    verify_password,
  },
  error::Error,
};

// ─── Token issue ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct TokenResponse {
  pub access_token: String,
  pub token_type:   &'static str,
  pub user:         User,
}

/// Mint a bearer token for `user_id` and persist its session.
async fn issue_token<S>(
  state: &AppState<S>,
  user_id: Uuid,
) -> Result<String, Error>
where
  S: PlatformStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let token = generate_token();
  let expires_at =
    Utc::now() + Duration::minutes(state.config.token_ttl_minutes);
  state
    .store
    .create_session(user_id, token_digest(&token), expires_at)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  Ok(token)
}

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub email:           String,
  pub password:        String,
  pub username:        String,
  pub invitation_code: String,
}

fn validate_register(body: &RegisterBody) -> Result<(), Error> {
  if !body.email.contains('@') || !body.email.contains('.') {
    return Err(Error::BadRequest("invalid email address".into()));
  }
  if body.password.chars().count() < 8 {
    return Err(Error::BadRequest(
      "password must be at least 8 characters".into(),
    ));
  }
  if body.username.chars().count() < 3 {
    return Err(Error::BadRequest(
      "username must be at least 3 characters".into(),
    ));
  }
  Ok(())
}

/// `POST /api/auth/register` — invitation-gated signup.
///
/// Returns 201 with a fresh bearer token. The invitation is claimed only
/// after the account exists, so a rejected email never burns a code.
pub async fn register<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, Error>
where
  S: PlatformStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  validate_register(&body)?;

  let invitation = state
    .store
    .get_invitation(&body.invitation_code)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  match invitation {
    Some(inv) if !inv.used => {}
    _ => {
      return Err(Error::BadRequest(
        "invalid or used invitation code".into(),
      ));
    }
  }

  let existing = state
    .store
    .get_credentials(&body.email)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  if existing.is_some() {
    return Err(Error::BadRequest("email already registered".into()));
  }

  let password_hash = hash_password(&body.password)?;
  let user = state
    .store
    .create_user(NewUser {
      email: body.email,
      username: body.username,
      password_hash,
    })
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  state
    .store
    .claim_invitation(&body.invitation_code, user.user_id)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  tracing::info!(user_id = %user.user_id, "registered new user");

  let access_token = issue_token(&state, user.user_id).await?;
  Ok((
    StatusCode::CREATED,
    Json(TokenResponse {
      access_token,
      token_type: "bearer",
      user,
    }),
  ))
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /api/auth/login`
///
/// A missing account and a wrong password are deliberately
/// indistinguishable to the caller.
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<TokenResponse>, Error>
where
  S: PlatformStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let credentials = state
    .store
    .get_credentials(&body.email)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  let credentials = match credentials {
    Some(c) if verify_password(&body.password, &c.password_hash) => c,
    _ => {
      tracing::warn!(email = %body.email, "failed login attempt");
      return Err(Error::Unauthorized);
    }
  };

  let access_token = issue_token(&state, credentials.user.user_id).await?;
  Ok(Json(TokenResponse {
    access_token,
    token_type: "bearer",
    user: credentials.user,
  }))
}

// ─── Logout ──────────────────────────────────────────────────────────────────

/// `POST /api/auth/logout` — revoke the presented session.
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<StatusCode, Error>
where
  S: PlatformStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let token = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(bearer_token)
    .ok_or(Error::Unauthorized)?;

  let revoked = state
    .store
    .revoke_session(&token_digest(token))
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  if !revoked {
    return Err(Error::Unauthorized);
  }
  Ok(StatusCode::NO_CONTENT)
}

// ─── Me ──────────────────────────────────────────────────────────────────────

/// `GET /api/auth/me`
pub async fn me<S>(CurrentUser(user): CurrentUser) -> Json<User>
where
  S: PlatformStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Json(user)
}
