//! User accounts, invitation codes, and bearer-token sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account. The password hash never rides along with this
/// type; it travels separately as [`Credentials`] so a `User` can be
/// serialised outward without redaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:    Uuid,
  pub email:      String,
  pub username:   String,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::PlatformStore::create_user`].
/// `user_id` and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub email:         String,
  pub username:      String,
  /// PHC string, e.g. `$argon2id$v=19$…`; hashing happens in the caller.
  pub password_hash: String,
}

/// A user together with their stored password hash, for login checks only.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub user:          User,
  pub password_hash: String,
}

/// A single-use registration gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationCode {
  pub code:       String,
  pub used:       bool,
  pub used_by:    Option<Uuid>,
  pub created_at: DateTime<Utc>,
  pub used_at:    Option<DateTime<Utc>>,
}

/// Server-side state backing one bearer token. Only the SHA-256 digest of
/// the token is stored; the plaintext is handed to the client once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
  pub session_id: Uuid,
  pub user_id:    Uuid,
  pub token_hash: String,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

impl Session {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.expires_at <= now
  }
}
