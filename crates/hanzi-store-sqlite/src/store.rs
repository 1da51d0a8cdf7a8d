//! [`SqliteStore`] — the SQLite implementation of [`PlatformStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use hanzi_core::{
  course::{Course, Enrollment, Lesson, NewCourse, NewLesson},
  review::{Character, DueReview, NewCharacter, ReviewRecord},
  store::PlatformStore,
  user::{Credentials, InvitationCode, NewUser, Session, User},
};

use crate::{
  Error, Result,
  encode::{
    RawCharacter, RawCourse, RawEnrollment, RawInvitation, RawLesson,
    RawReview, RawSession, RawUser, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A hanzi platform store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

const REVIEW_COLUMNS: &str = "review_id, user_id, character_id, \
   repetition_count, ease_factor, interval_days, next_review_at, \
   last_reviewed_at, revision";

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// `true` iff a user with this email already exists.
  async fn email_exists(&self, email: String) -> Result<bool> {
    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM users WHERE email = ?1",
              rusqlite::params![email],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(exists)
  }
}

fn review_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawReview> {
  Ok(RawReview {
    review_id:        row.get(0)?,
    user_id:          row.get(1)?,
    character_id:     row.get(2)?,
    repetition_count: row.get(3)?,
    ease_factor:      row.get(4)?,
    interval_days:    row.get(5)?,
    next_review_at:   row.get(6)?,
    last_reviewed_at: row.get(7)?,
    revision:         row.get(8)?,
  })
}

// ─── PlatformStore impl ──────────────────────────────────────────────────────

impl PlatformStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    if self.email_exists(input.email.clone()).await? {
      return Err(Error::Core(hanzi_core::Error::EmailTaken(input.email)));
    }

    let user = User {
      user_id:    Uuid::new_v4(),
      email:      input.email,
      username:   input.username,
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(user.user_id);
    let email = user.email.clone();
    let username = user.username.clone();
    let password_hash = input.password_hash;
    let at_str = encode_dt(user.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, email, username, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, email, username, password_hash, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, email, username, password_hash, created_at
               FROM users WHERE user_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawUser {
                  user_id:       row.get(0)?,
                  email:         row.get(1)?,
                  username:      row.get(2)?,
                  password_hash: row.get(3)?,
                  created_at:    row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn get_credentials(&self, email: &str) -> Result<Option<Credentials>> {
    let email = email.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, email, username, password_hash, created_at
               FROM users WHERE email = ?1",
              rusqlite::params![email],
              |row| {
                Ok(RawUser {
                  user_id:       row.get(0)?,
                  email:         row.get(1)?,
                  username:      row.get(2)?,
                  password_hash: row.get(3)?,
                  created_at:    row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_credentials).transpose()
  }

  // ── Invitation codes ──────────────────────────────────────────────────────

  async fn create_invitation(&self, code: String) -> Result<InvitationCode> {
    let invitation = InvitationCode {
      code,
      used: false,
      used_by: None,
      created_at: Utc::now(),
      used_at: None,
    };

    let code_str = invitation.code.clone();
    let at_str = encode_dt(invitation.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO invitation_codes (code, used, created_at) VALUES (?1, 0, ?2)",
          rusqlite::params![code_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(invitation)
  }

  async fn get_invitation(&self, code: &str) -> Result<Option<InvitationCode>> {
    let code = code.to_owned();

    let raw: Option<RawInvitation> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT code, used, used_by, created_at, used_at
               FROM invitation_codes WHERE code = ?1",
              rusqlite::params![code],
              |row| {
                Ok(RawInvitation {
                  code:       row.get(0)?,
                  used:       row.get(1)?,
                  used_by:    row.get(2)?,
                  created_at: row.get(3)?,
                  used_at:    row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawInvitation::into_invitation).transpose()
  }

  async fn claim_invitation(&self, code: &str, user_id: Uuid) -> Result<()> {
    let code = code.to_owned();
    let user_id_str = encode_uuid(user_id);
    let at_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE invitation_codes
           SET used = 1, used_by = ?1, used_at = ?2
           WHERE code = ?3 AND used = 0",
          rusqlite::params![user_id_str, at_str, code],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::Core(hanzi_core::Error::InvalidInvitation));
    }
    Ok(())
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(
    &self,
    user_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
  ) -> Result<Session> {
    let session = Session {
      session_id: Uuid::new_v4(),
      user_id,
      token_hash,
      created_at: Utc::now(),
      expires_at,
    };

    let id_str = encode_uuid(session.session_id);
    let user_id_str = encode_uuid(user_id);
    let token_hash_str = session.token_hash.clone();
    let created_str = encode_dt(session.created_at);
    let expires_str = encode_dt(session.expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (session_id, user_id, token_hash, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, user_id_str, token_hash_str, created_str, expires_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(session)
  }

  async fn get_session(&self, token_hash: &str) -> Result<Option<Session>> {
    let token_hash = token_hash.to_owned();

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT session_id, user_id, token_hash, created_at, expires_at
               FROM sessions WHERE token_hash = ?1",
              rusqlite::params![token_hash],
              |row| {
                Ok(RawSession {
                  session_id: row.get(0)?,
                  user_id:    row.get(1)?,
                  token_hash: row.get(2)?,
                  created_at: row.get(3)?,
                  expires_at: row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn revoke_session(&self, token_hash: &str) -> Result<bool> {
    let token_hash = token_hash.to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE token_hash = ?1",
          rusqlite::params![token_hash],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  // ── Course catalog ────────────────────────────────────────────────────────

  async fn create_course(&self, input: NewCourse) -> Result<Course> {
    let course = Course {
      course_id:   Uuid::new_v4(),
      title:       input.title,
      description: input.description,
      published:   input.published,
      created_at:  Utc::now(),
    };

    let id_str = encode_uuid(course.course_id);
    let title = course.title.clone();
    let description = course.description.clone();
    let published = course.published;
    let at_str = encode_dt(course.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO courses (course_id, title, description, published, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, title, description, published, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(course)
  }

  async fn get_course(&self, id: Uuid) -> Result<Option<Course>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCourse> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT course_id, title, description, published, created_at
               FROM courses WHERE course_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawCourse {
                  course_id:   row.get(0)?,
                  title:       row.get(1)?,
                  description: row.get(2)?,
                  published:   row.get(3)?,
                  created_at:  row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCourse::into_course).transpose()
  }

  async fn list_published_courses(&self) -> Result<Vec<Course>> {
    let raws: Vec<RawCourse> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT course_id, title, description, published, created_at
           FROM courses WHERE published = 1",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawCourse {
              course_id:   row.get(0)?,
              title:       row.get(1)?,
              description: row.get(2)?,
              published:   row.get(3)?,
              created_at:  row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCourse::into_course).collect()
  }

  async fn add_lesson(&self, input: NewLesson) -> Result<Lesson> {
    let lesson = Lesson {
      lesson_id: Uuid::new_v4(),
      course_id: input.course_id,
      sequence:  input.sequence,
      title:     input.title,
      body:      input.body,
    };

    let id_str = encode_uuid(lesson.lesson_id);
    let course_id_str = encode_uuid(lesson.course_id);
    let sequence = lesson.sequence;
    let title = lesson.title.clone();
    let body = lesson.body.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO lessons (lesson_id, course_id, sequence, title, body)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, course_id_str, sequence, title, body],
        )?;
        Ok(())
      })
      .await?;

    Ok(lesson)
  }

  async fn list_lessons(&self, course_id: Uuid) -> Result<Vec<Lesson>> {
    let course_id_str = encode_uuid(course_id);

    let raws: Vec<RawLesson> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT lesson_id, course_id, sequence, title, body
           FROM lessons WHERE course_id = ?1
           ORDER BY sequence ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![course_id_str], |row| {
            Ok(RawLesson {
              lesson_id: row.get(0)?,
              course_id: row.get(1)?,
              sequence:  row.get(2)?,
              title:     row.get(3)?,
              body:      row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLesson::into_lesson).collect()
  }

  async fn add_character(&self, input: NewCharacter) -> Result<Character> {
    let character = Character {
      character_id: Uuid::new_v4(),
      course_id:    input.course_id,
      glyph:        input.glyph,
      pinyin:       input.pinyin,
      meaning:      input.meaning,
    };

    let id_str = encode_uuid(character.character_id);
    let course_id_str = encode_uuid(character.course_id);
    let glyph = character.glyph.clone();
    let pinyin = character.pinyin.clone();
    let meaning = character.meaning.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO characters (character_id, course_id, glyph, pinyin, meaning)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, course_id_str, glyph, pinyin, meaning],
        )?;
        Ok(())
      })
      .await?;

    Ok(character)
  }

  async fn list_characters(&self, course_id: Uuid) -> Result<Vec<Character>> {
    let course_id_str = encode_uuid(course_id);

    let raws: Vec<RawCharacter> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT character_id, course_id, glyph, pinyin, meaning
           FROM characters WHERE course_id = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![course_id_str], |row| {
            Ok(RawCharacter {
              character_id: row.get(0)?,
              course_id:    row.get(1)?,
              glyph:        row.get(2)?,
              pinyin:       row.get(3)?,
              meaning:      row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCharacter::into_character).collect()
  }

  // ── Enrollments ───────────────────────────────────────────────────────────

  async fn create_enrollment(
    &self,
    user_id: Uuid,
    course_id: Uuid,
  ) -> Result<Enrollment> {
    if self.get_course(course_id).await?.is_none() {
      return Err(Error::Core(hanzi_core::Error::CourseNotFound(course_id)));
    }
    if self.get_enrollment(user_id, course_id).await?.is_some() {
      return Err(Error::Core(hanzi_core::Error::AlreadyEnrolled {
        user_id,
        course_id,
      }));
    }

    let now = Utc::now();
    let enrollment = Enrollment {
      enrollment_id: Uuid::new_v4(),
      user_id,
      course_id,
      enrolled_at: now,
      progress: 0,
    };

    let enrollment_id_str = encode_uuid(enrollment.enrollment_id);
    let user_id_str = encode_uuid(user_id);
    let course_id_str = encode_uuid(course_id);
    let at_str = encode_dt(now);

    // The enrollment row and its seeded review rows land in one
    // transaction: a partially-seeded queue must not survive a crash.
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        tx.execute(
          "INSERT INTO enrollments (enrollment_id, user_id, course_id, enrolled_at, progress)
           VALUES (?1, ?2, ?3, ?4, 0)",
          rusqlite::params![enrollment_id_str, user_id_str, course_id_str, at_str],
        )?;

        let character_ids: Vec<String> = {
          let mut stmt = tx.prepare(
            "SELECT character_id FROM characters WHERE course_id = ?1",
          )?;
          stmt
            .query_map(rusqlite::params![course_id_str], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        for character_id_str in character_ids {
          tx.execute(
            "INSERT INTO reviews (
               review_id, user_id, character_id,
               repetition_count, ease_factor, interval_days,
               next_review_at, last_reviewed_at, revision
             ) VALUES (?1, ?2, ?3, 0, 2.5, 1, ?4, NULL, 0)",
            rusqlite::params![
              encode_uuid(Uuid::new_v4()),
              user_id_str,
              character_id_str,
              at_str,
            ],
          )?;
        }

        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(enrollment)
  }

  async fn get_enrollment(
    &self,
    user_id: Uuid,
    course_id: Uuid,
  ) -> Result<Option<Enrollment>> {
    let user_id_str = encode_uuid(user_id);
    let course_id_str = encode_uuid(course_id);

    let raw: Option<RawEnrollment> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT enrollment_id, user_id, course_id, enrolled_at, progress
               FROM enrollments WHERE user_id = ?1 AND course_id = ?2",
              rusqlite::params![user_id_str, course_id_str],
              |row| {
                Ok(RawEnrollment {
                  enrollment_id: row.get(0)?,
                  user_id:       row.get(1)?,
                  course_id:     row.get(2)?,
                  enrolled_at:   row.get(3)?,
                  progress:      row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEnrollment::into_enrollment).transpose()
  }

  async fn list_enrollments(&self, user_id: Uuid) -> Result<Vec<Enrollment>> {
    let user_id_str = encode_uuid(user_id);

    let raws: Vec<RawEnrollment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT enrollment_id, user_id, course_id, enrolled_at, progress
           FROM enrollments WHERE user_id = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_id_str], |row| {
            Ok(RawEnrollment {
              enrollment_id: row.get(0)?,
              user_id:       row.get(1)?,
              course_id:     row.get(2)?,
              enrolled_at:   row.get(3)?,
              progress:      row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEnrollment::into_enrollment).collect()
  }

  // ── Reviews ───────────────────────────────────────────────────────────────

  async fn get_review(
    &self,
    review_id: Uuid,
    user_id: Uuid,
  ) -> Result<Option<ReviewRecord>> {
    let review_id_str = encode_uuid(review_id);
    let user_id_str = encode_uuid(user_id);

    let raw: Option<RawReview> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REVIEW_COLUMNS} FROM reviews
                 WHERE review_id = ?1 AND user_id = ?2"
              ),
              rusqlite::params![review_id_str, user_id_str],
              review_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawReview::into_review).transpose()
  }

  async fn due_reviews(
    &self,
    user_id: Uuid,
    as_of: DateTime<Utc>,
  ) -> Result<Vec<DueReview>> {
    let user_id_str = encode_uuid(user_id);
    let as_of_str = encode_dt(as_of);

    let raws: Vec<(RawReview, RawCharacter)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT
             r.review_id, r.user_id, r.character_id,
             r.repetition_count, r.ease_factor, r.interval_days,
             r.next_review_at, r.last_reviewed_at, r.revision,
             c.character_id, c.course_id, c.glyph, c.pinyin, c.meaning
           FROM reviews r
           JOIN characters c ON c.character_id = r.character_id
           WHERE r.user_id = ?1
             AND r.next_review_at <= ?2
           ORDER BY r.next_review_at ASC",
        )?;

        let rows = stmt
          .query_map(rusqlite::params![user_id_str, as_of_str], |row| {
            let review = review_from_row(row)?;
            let character = RawCharacter {
              character_id: row.get(9)?,
              course_id:    row.get(10)?,
              glyph:        row.get(11)?,
              pinyin:       row.get(12)?,
              meaning:      row.get(13)?,
            };
            Ok((review, character))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(review, character)| {
        Ok(DueReview {
          review:    review.into_review()?,
          character: character.into_character()?,
        })
      })
      .collect()
  }

  async fn apply_review(
    &self,
    review: ReviewRecord,
  ) -> Result<Option<ReviewRecord>> {
    let review_id_str = encode_uuid(review.review_id);
    let user_id_str = encode_uuid(review.user_id);
    let repetition = review.repetition_count;
    let ease = review.ease_factor;
    let interval = review.interval_days;
    let next_str = encode_dt(review.next_review_at);
    let last_str = review.last_reviewed_at.map(encode_dt);
    let expected_revision = review.revision;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE reviews
           SET repetition_count = ?1, ease_factor = ?2, interval_days = ?3,
               next_review_at = ?4, last_reviewed_at = ?5,
               revision = revision + 1
           WHERE review_id = ?6 AND user_id = ?7 AND revision = ?8",
          rusqlite::params![
            repetition,
            ease,
            interval,
            next_str,
            last_str,
            review_id_str,
            user_id_str,
            expected_revision,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }

    Ok(Some(ReviewRecord {
      revision: expected_revision + 1,
      ..review
    }))
  }
}
