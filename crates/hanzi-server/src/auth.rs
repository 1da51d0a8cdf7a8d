//! Password hashing and bearer-token session management.
//!
//! Tokens are opaque: 32 random bytes hex-encoded on the wire, persisted
//! only as their SHA-256 digest. Losing the database therefore leaks no
//! usable credentials.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use hanzi_core::{store::PlatformStore, user::User};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::{AppState, error::Error};

/// Hash a password into an argon2 PHC string for storage.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Internal(format!("argon2 error: {e}")))
}

/// Verify a password against a stored PHC string.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
  PasswordHash::new(password_hash)
    .map(|parsed| {
      Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
    })
    .unwrap_or(false)
}

/// Generate a fresh opaque bearer token.
pub fn generate_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// The SHA-256 digest under which a token is persisted and looked up.
pub fn token_digest(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

/// Pull the bearer token out of an `Authorization` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
  header_value.strip_prefix("Bearer ")
}

/// The authenticated caller, resolved from the `Authorization: Bearer`
/// header against the session table. Identity is threaded explicitly into
/// each handler that needs it; nothing is ambient.
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: PlatformStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let header_val = parts
      .headers
      .get(axum::http::header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .ok_or(Error::Unauthorized)?;

    let token = bearer_token(header_val).ok_or(Error::Unauthorized)?;

    let session = state
      .store
      .get_session(&token_digest(token))
      .await
      .map_err(|e| Error::Store(Box::new(e)))?
      .ok_or(Error::Unauthorized)?;

    if session.is_expired(Utc::now()) {
      return Err(Error::Unauthorized);
    }

    let user = state
      .store
      .get_user(session.user_id)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?
      .ok_or(Error::Unauthorized)?;

    Ok(CurrentUser(user))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn password_hash_roundtrip() {
    let hash = hash_password("correct horse").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("correct horse", &hash));
    assert!(!verify_password("wrong horse", &hash));
  }

  #[test]
  fn verify_rejects_malformed_hash() {
    assert!(!verify_password("anything", "not-a-phc-string"));
  }

  #[test]
  fn tokens_are_unique_and_digests_stable() {
    let a = generate_token();
    let b = generate_token();
    assert_ne!(a, b);
    assert_eq!(a.len(), 64);
    assert_eq!(token_digest(&a), token_digest(&a));
    assert_ne!(token_digest(&a), token_digest(&b));
  }

  #[test]
  fn bearer_token_requires_scheme_prefix() {
    assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
    assert_eq!(bearer_token("Basic abc123"), None);
    assert_eq!(bearer_token("abc123"), None);
  }
}
