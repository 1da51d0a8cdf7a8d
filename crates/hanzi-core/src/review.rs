//! Review state — one [`ReviewRecord`] per (user, character) pair.
//!
//! The record is the only place scheduling state lives. The scheduler in
//! [`crate::scheduler`] transforms a value copy and returns a successor;
//! persistence of that successor is the store's concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scheduler::{INITIAL_EASE_FACTOR, INITIAL_INTERVAL_DAYS};

/// A reviewable item: a single character within a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
  pub character_id: Uuid,
  pub course_id:    Uuid,
  pub glyph:        String,
  pub pinyin:       String,
  pub meaning:      String,
}

/// Input to [`crate::store::PlatformStore::add_character`].
#[derive(Debug, Clone)]
pub struct NewCharacter {
  pub course_id: Uuid,
  pub glyph:     String,
  pub pinyin:    String,
  pub meaning:   String,
}

/// Per-(user, character) scheduling state.
///
/// All mutation goes through [`crate::scheduler::submit`]; the store only
/// persists what it returns. Records are created when a user enrolls and
/// are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
  pub review_id:        Uuid,
  pub user_id:          Uuid,
  pub character_id:     Uuid,
  /// Consecutive successful recalls since the last lapse.
  pub repetition_count: u32,
  /// Interval growth multiplier; never below
  /// [`crate::scheduler::MIN_EASE_FACTOR`].
  pub ease_factor:      f64,
  pub interval_days:    f64,
  pub next_review_at:   DateTime<Utc>,
  /// Absent until the first submission.
  pub last_reviewed_at: Option<DateTime<Utc>>,
  /// Optimistic-concurrency counter, bumped by the store on every apply.
  pub revision:         i64,
}

impl ReviewRecord {
  /// A fresh record: no streak, default ease, due immediately.
  pub fn new(user_id: Uuid, character_id: Uuid, now: DateTime<Utc>) -> Self {
    Self {
      review_id:        Uuid::new_v4(),
      user_id,
      character_id,
      repetition_count: 0,
      ease_factor:      INITIAL_EASE_FACTOR,
      interval_days:    INITIAL_INTERVAL_DAYS,
      next_review_at:   now,
      last_reviewed_at: None,
      revision:         0,
    }
  }
}

/// A due review joined with the character it schedules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueReview {
  pub review:    ReviewRecord,
  pub character: Character,
}
