//! Error types for `hanzi-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// Recall quality outside the accepted `0..=5` range. Raised before any
  /// record state is touched; out-of-range grades are never clamped.
  #[error("recall quality {0} is outside the accepted range 0..=5")]
  InvalidQuality(i64),

  #[error("course not found: {0}")]
  CourseNotFound(Uuid),

  #[error("email already registered: {0}")]
  EmailTaken(String),

  #[error("invitation code is invalid or already used")]
  InvalidInvitation,

  #[error("user {user_id} is already enrolled in course {course_id}")]
  AlreadyEnrolled { user_id: Uuid, course_id: Uuid },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
