//! Handlers for `/api/courses` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/courses` | Published courses only |
//! | `GET`  | `/api/courses/:id` | Course plus lessons ordered by sequence |
//! | `POST` | `/api/courses/:id/enroll` | Authenticated; seeds the review queue |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use hanzi_core::{
  course::{Course, Enrollment, Lesson},
  store::PlatformStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{AppState, auth::CurrentUser, error::Error};

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /api/courses`
pub async fn list<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Course>>, Error>
where
  S: PlatformStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let courses = state
    .store
    .list_published_courses()
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  Ok(Json(courses))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// A course together with its ordered content.
#[derive(Debug, Serialize)]
pub struct CourseDetail {
  #[serde(flatten)]
  pub course:  Course,
  pub content: Vec<Lesson>,
}

/// `GET /api/courses/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CourseDetail>, Error>
where
  S: PlatformStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let course = state
    .store
    .get_course(id)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?
    .ok_or_else(|| Error::NotFound(format!("course {id} not found")))?;

  let content = state
    .store
    .list_lessons(id)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  Ok(Json(CourseDetail { course, content }))
}

// ─── Enroll ──────────────────────────────────────────────────────────────────

/// `POST /api/courses/:id/enroll`
///
/// Returns 201 with the new enrollment. Every character in the course gets
/// an immediately-due review record for this user.
pub async fn enroll<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, Error>
where
  S: PlatformStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let course = state
    .store
    .get_course(id)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  if course.is_none() {
    return Err(Error::NotFound(format!("course {id} not found")));
  }

  let existing = state
    .store
    .get_enrollment(user.user_id, id)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  if existing.is_some() {
    return Err(Error::BadRequest(
      "already enrolled in this course".into(),
    ));
  }

  let enrollment: Enrollment = state
    .store
    .create_enrollment(user.user_id, id)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  tracing::info!(
    user_id = %user.user_id,
    course_id = %id,
    "enrolled and seeded review queue"
  );

  Ok((StatusCode::CREATED, Json(enrollment)))
}
