//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings (UTC offset, so
//! lexicographic order matches chronological order). UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use hanzi_core::{
  course::{Course, Enrollment, Lesson},
  review::{Character, ReviewRecord},
  user::{Credentials, InvitationCode, Session, User},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String {
  id.hyphenated().to_string()
}

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Ok(Uuid::parse_str(s)?)
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339()
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_dt_opt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:       String,
  pub email:         String,
  pub username:      String,
  pub password_hash: String,
  pub created_at:    String,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:    decode_uuid(&self.user_id)?,
      email:      self.email,
      username:   self.username,
      created_at: decode_dt(&self.created_at)?,
    })
  }

  pub fn into_credentials(self) -> Result<Credentials> {
    let password_hash = self.password_hash.clone();
    Ok(Credentials {
      user: self.into_user()?,
      password_hash,
    })
  }
}

pub struct RawInvitation {
  pub code:       String,
  pub used:       bool,
  pub used_by:    Option<String>,
  pub created_at: String,
  pub used_at:    Option<String>,
}

impl RawInvitation {
  pub fn into_invitation(self) -> Result<InvitationCode> {
    Ok(InvitationCode {
      code:       self.code,
      used:       self.used,
      used_by:    self.used_by.as_deref().map(decode_uuid).transpose()?,
      created_at: decode_dt(&self.created_at)?,
      used_at:    decode_dt_opt(self.used_at.as_deref())?,
    })
  }
}

pub struct RawSession {
  pub session_id: String,
  pub user_id:    String,
  pub token_hash: String,
  pub created_at: String,
  pub expires_at: String,
}

impl RawSession {
  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      session_id: decode_uuid(&self.session_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      token_hash: self.token_hash,
      created_at: decode_dt(&self.created_at)?,
      expires_at: decode_dt(&self.expires_at)?,
    })
  }
}

pub struct RawCourse {
  pub course_id:   String,
  pub title:       String,
  pub description: String,
  pub published:   bool,
  pub created_at:  String,
}

impl RawCourse {
  pub fn into_course(self) -> Result<Course> {
    Ok(Course {
      course_id:   decode_uuid(&self.course_id)?,
      title:       self.title,
      description: self.description,
      published:   self.published,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawLesson {
  pub lesson_id: String,
  pub course_id: String,
  pub sequence:  u32,
  pub title:     String,
  pub body:      String,
}

impl RawLesson {
  pub fn into_lesson(self) -> Result<Lesson> {
    Ok(Lesson {
      lesson_id: decode_uuid(&self.lesson_id)?,
      course_id: decode_uuid(&self.course_id)?,
      sequence:  self.sequence,
      title:     self.title,
      body:      self.body,
    })
  }
}

pub struct RawCharacter {
  pub character_id: String,
  pub course_id:    String,
  pub glyph:        String,
  pub pinyin:       String,
  pub meaning:      String,
}

impl RawCharacter {
  pub fn into_character(self) -> Result<Character> {
    Ok(Character {
      character_id: decode_uuid(&self.character_id)?,
      course_id:    decode_uuid(&self.course_id)?,
      glyph:        self.glyph,
      pinyin:       self.pinyin,
      meaning:      self.meaning,
    })
  }
}

pub struct RawEnrollment {
  pub enrollment_id: String,
  pub user_id:       String,
  pub course_id:     String,
  pub enrolled_at:   String,
  pub progress:      u32,
}

impl RawEnrollment {
  pub fn into_enrollment(self) -> Result<Enrollment> {
    Ok(Enrollment {
      enrollment_id: decode_uuid(&self.enrollment_id)?,
      user_id:       decode_uuid(&self.user_id)?,
      course_id:     decode_uuid(&self.course_id)?,
      enrolled_at:   decode_dt(&self.enrolled_at)?,
      progress:      self.progress,
    })
  }
}

pub struct RawReview {
  pub review_id:        String,
  pub user_id:          String,
  pub character_id:     String,
  pub repetition_count: u32,
  pub ease_factor:      f64,
  pub interval_days:    f64,
  pub next_review_at:   String,
  pub last_reviewed_at: Option<String>,
  pub revision:         i64,
}

impl RawReview {
  pub fn into_review(self) -> Result<ReviewRecord> {
    Ok(ReviewRecord {
      review_id:        decode_uuid(&self.review_id)?,
      user_id:          decode_uuid(&self.user_id)?,
      character_id:     decode_uuid(&self.character_id)?,
      repetition_count: self.repetition_count,
      ease_factor:      self.ease_factor,
      interval_days:    self.interval_days,
      next_review_at:   decode_dt(&self.next_review_at)?,
      last_reviewed_at: decode_dt_opt(self.last_reviewed_at.as_deref())?,
      revision:         self.revision,
    })
  }
}
