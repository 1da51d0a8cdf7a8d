//! The `PlatformStore` trait — storage abstraction for the platform.
//!
//! The trait is implemented by storage backends (e.g. `hanzi-store-sqlite`).
//! The HTTP layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  course::{Course, Enrollment, Lesson, NewCourse, NewLesson},
  review::{Character, DueReview, NewCharacter, ReviewRecord},
  user::{Credentials, InvitationCode, NewUser, Session, User},
};

/// Abstraction over a hanzi platform storage backend.
///
/// Review scheduling state is read-modify-write: callers fetch a
/// [`ReviewRecord`], run it through [`crate::scheduler::submit`], and
/// persist the result with [`PlatformStore::apply_review`], which
/// compare-and-swaps on the record's `revision`. A lost race is reported
/// (never partially applied) so the caller can re-read and re-submit.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait PlatformStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create and persist a new user. Fails if the email is already taken.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Retrieve a user by id. Returns `None` if not found.
  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up a user together with their password hash, for login checks.
  fn get_credentials<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + 'a;

  // ── Invitation codes ──────────────────────────────────────────────────

  fn create_invitation(
    &self,
    code: String,
  ) -> impl Future<Output = Result<InvitationCode, Self::Error>> + Send + '_;

  fn get_invitation<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<Option<InvitationCode>, Self::Error>> + Send + 'a;

  /// Mark an unused invitation as claimed by `user_id`. Fails if the code
  /// is unknown or already used.
  fn claim_invitation<'a>(
    &'a self,
    code: &'a str,
    user_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Persist a session under the SHA-256 digest of its bearer token.
  fn create_session(
    &self,
    user_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// Retrieve a session by token digest. Expiry is the caller's check.
  fn get_session<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + 'a;

  /// Delete a session by token digest. Returns `true` if one existed.
  fn revoke_session<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Course catalog ────────────────────────────────────────────────────

  fn create_course(
    &self,
    input: NewCourse,
  ) -> impl Future<Output = Result<Course, Self::Error>> + Send + '_;

  fn get_course(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + '_;

  /// All published courses; unpublished drafts stay hidden.
  fn list_published_courses(
    &self,
  ) -> impl Future<Output = Result<Vec<Course>, Self::Error>> + Send + '_;

  fn add_lesson(
    &self,
    input: NewLesson,
  ) -> impl Future<Output = Result<Lesson, Self::Error>> + Send + '_;

  /// Lessons for a course, ordered by `sequence` ascending.
  fn list_lessons(
    &self,
    course_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Lesson>, Self::Error>> + Send + '_;

  fn add_character(
    &self,
    input: NewCharacter,
  ) -> impl Future<Output = Result<Character, Self::Error>> + Send + '_;

  fn list_characters(
    &self,
    course_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Character>, Self::Error>> + Send + '_;

  // ── Enrollments ───────────────────────────────────────────────────────

  /// Enroll `user_id` in `course_id` and seed one immediately-due
  /// [`ReviewRecord`] per character in the course, atomically.
  /// Fails if the course is unknown or the user is already enrolled.
  fn create_enrollment(
    &self,
    user_id: Uuid,
    course_id: Uuid,
  ) -> impl Future<Output = Result<Enrollment, Self::Error>> + Send + '_;

  fn get_enrollment(
    &self,
    user_id: Uuid,
    course_id: Uuid,
  ) -> impl Future<Output = Result<Option<Enrollment>, Self::Error>> + Send + '_;

  fn list_enrollments(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Enrollment>, Self::Error>> + Send + '_;

  // ── Reviews ───────────────────────────────────────────────────────────

  /// Point lookup scoped to the owning user. A review belonging to someone
  /// else is indistinguishable from a missing one.
  fn get_review(
    &self,
    review_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<ReviewRecord>, Self::Error>> + Send + '_;

  /// Reviews due at `as_of` for `user_id`, joined with their characters.
  fn due_reviews(
    &self,
    user_id: Uuid,
    as_of: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<DueReview>, Self::Error>> + Send + '_;

  /// Persist scheduler output with a compare-and-swap on `revision`.
  ///
  /// Returns the stored record (revision bumped) on success, or `None`
  /// when another writer applied first; callers re-read and re-submit.
  fn apply_review(
    &self,
    review: ReviewRecord,
  ) -> impl Future<Output = Result<Option<ReviewRecord>, Self::Error>> + Send + '_;
}
