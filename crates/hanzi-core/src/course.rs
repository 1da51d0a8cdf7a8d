//! Course catalog and enrollment types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
  pub course_id:   Uuid,
  pub title:       String,
  pub description: String,
  /// Unpublished drafts are hidden from the catalog listing.
  pub published:   bool,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::PlatformStore::create_course`].
/// `course_id` and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewCourse {
  pub title:       String,
  pub description: String,
  pub published:   bool,
}

/// An ordered unit of course content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
  pub lesson_id: Uuid,
  pub course_id: Uuid,
  /// Position within the course; listings are sorted by this.
  pub sequence:  u32,
  pub title:     String,
  pub body:      String,
}

#[derive(Debug, Clone)]
pub struct NewLesson {
  pub course_id: Uuid,
  pub sequence:  u32,
  pub title:     String,
  pub body:      String,
}

/// A user's membership in a course. At most one per (user, course) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
  pub enrollment_id: Uuid,
  pub user_id:       Uuid,
  pub course_id:     Uuid,
  pub enrolled_at:   DateTime<Utc>,
  pub progress:      u32,
}
