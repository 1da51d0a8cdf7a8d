//! Handlers for `/api/reviews` endpoints — the spaced-repetition surface.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/reviews/due` | The caller's due queue, with characters |
//! | `POST` | `/api/reviews/submit` | Grade a recall and reschedule |

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use hanzi_core::{
  review::DueReview,
  scheduler::{self, Quality},
  store::PlatformStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, auth::CurrentUser, error::Error};

/// Bound on read-submit-apply retries when concurrent submissions race on
/// the same record.
const MAX_APPLY_ATTEMPTS: u32 = 3;

// ─── Due queue ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DueResponse {
  pub reviews: Vec<DueReview>,
  pub count:   usize,
}

/// `GET /api/reviews/due`
pub async fn due<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
) -> Result<Json<DueResponse>, Error>
where
  S: PlatformStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let reviews = state
    .store
    .due_reviews(user.user_id, Utc::now())
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  let count = reviews.len();
  Ok(Json(DueResponse { reviews, count }))
}

// ─── Submit ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  pub review_id: Uuid,
  pub quality:   i64,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
  pub next_review_at: DateTime<Utc>,
  pub interval_days:  f64,
  pub ease_factor:    f64,
}

/// `POST /api/reviews/submit`
///
/// Validates the quality grade before anything else, runs the scheduler on
/// the owner's record, and persists the result. An apply that loses a
/// revision race is recomputed from a fresh read; the submission is never
/// partially or doubly applied.
pub async fn submit<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Json(body): Json<SubmitBody>,
) -> Result<Json<SubmitResponse>, Error>
where
  S: PlatformStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let quality = Quality::new(body.quality)
    .map_err(|e| Error::BadRequest(e.to_string()))?;

  for _attempt in 0..MAX_APPLY_ATTEMPTS {
    let record = state
      .store
      .get_review(body.review_id, user.user_id)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?
      .ok_or_else(|| {
        Error::NotFound(format!("review {} not found", body.review_id))
      })?;

    let next = scheduler::submit(&record, quality, Utc::now());

    match state.store.apply_review(next).await {
      Ok(Some(applied)) => {
        return Ok(Json(SubmitResponse {
          next_review_at: applied.next_review_at,
          interval_days:  applied.interval_days,
          ease_factor:    applied.ease_factor,
        }));
      }
      Ok(None) => {
        tracing::debug!(
          review_id = %body.review_id,
          "revision race on review apply, retrying"
        );
      }
      Err(e) => return Err(Error::Store(Box::new(e))),
    }
  }

  Err(Error::Conflict(format!(
    "review {} was concurrently modified; retry the submission",
    body.review_id
  )))
}
