//! The spaced-repetition scheduler (SM-2 family).
//!
//! A pure function of `(record, quality, now) → record'` plus the due-set
//! predicate built on top of it. Every call transforms a value copy; the
//! scheduler keeps no state of its own, so it can run from any number of
//! concurrent callers without locking. This is the one piece of the
//! platform that decides long-term study load, and its numeric edge cases
//! are pinned by the tests below.

use chrono::{DateTime, Duration, Utc};

use crate::{Error, Result, review::ReviewRecord};

/// Hard floor for the ease factor. The transition never lets ease drop
/// below this, no matter how many failed recalls accumulate.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor assigned to a freshly created record.
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// Interval seed for a freshly created record, in days.
pub const INITIAL_INTERVAL_DAYS: f64 = 1.0;

// ─── Quality ─────────────────────────────────────────────────────────────────

/// A recall-quality grade in `0..=5`.
///
/// 0 is a complete blackout, 5 a perfect response. Out-of-range values are
/// rejected at construction rather than clamped, so an invalid submission
/// can touch no record state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
  pub fn new(value: i64) -> Result<Self> {
    if (0..=5).contains(&value) {
      Ok(Self(value as u8))
    } else {
      Err(Error::InvalidQuality(value))
    }
  }

  pub fn value(self) -> u8 {
    self.0
  }

  /// Grades below 3 count as a lapse: the streak resets entirely.
  pub fn is_lapse(self) -> bool {
    self.0 < 3
  }
}

impl TryFrom<i64> for Quality {
  type Error = Error;

  fn try_from(value: i64) -> Result<Self> {
    Self::new(value)
  }
}

// ─── Transition ──────────────────────────────────────────────────────────────

/// Convert a fractional day count into a [`Duration`] at millisecond
/// precision. [`submit`] uses this to place `next_review_at`, and anything
/// asserting the `next_review_at = last_reviewed_at + interval` relation
/// must use it too.
pub fn interval_duration(days: f64) -> Duration {
  Duration::milliseconds((days * 86_400_000.0).round() as i64)
}

/// Apply one recall result to a record and return the successor state.
///
/// The ease factor is updated first and unconditionally:
///
/// `ease' = max(1.3, ease + (0.1 − (5 − q) × (0.08 + (5 − q) × 0.02)))`
///
/// The interval branch then depends on whether the recall was a lapse:
///
/// - lapse (`quality < 3`): streak and interval reset to 0 and 1 day,
///   regardless of how long the prior streak was;
/// - first success after a reset: fixed 1-day interval;
/// - second consecutive success: fixed 6-day interval;
/// - beyond that: the previous interval scaled by the just-updated ease
///   (not the pre-update snapshot).
///
/// `now` is caller-supplied, so the transition is deterministic under test.
/// The input record is untouched; `revision` is carried over as-is and
/// only the store bumps it.
pub fn submit(
  record: &ReviewRecord,
  quality: Quality,
  now: DateTime<Utc>,
) -> ReviewRecord {
  let q = f64::from(quality.value());
  let ease = (record.ease_factor
    + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02)))
  .max(MIN_EASE_FACTOR);

  let (repetition, interval) = if quality.is_lapse() {
    (0, 1.0)
  } else {
    let streak = record.repetition_count + 1;
    let interval = match streak {
      1 => 1.0,
      2 => 6.0,
      _ => record.interval_days * ease,
    };
    (streak, interval)
  };

  ReviewRecord {
    review_id:        record.review_id,
    user_id:          record.user_id,
    character_id:     record.character_id,
    repetition_count: repetition,
    ease_factor:      ease,
    interval_days:    interval,
    next_review_at:   now + interval_duration(interval),
    last_reviewed_at: Some(now),
    revision:         record.revision,
  }
}

// ─── Due-set selection ───────────────────────────────────────────────────────

/// True iff the record has come due.
pub fn is_due(record: &ReviewRecord, now: DateTime<Utc>) -> bool {
  record.next_review_at <= now
}

/// Filter `records` down to the due subset. Input order is preserved and
/// nothing more is guaranteed; callers needing determinism must sort,
/// e.g. by `next_review_at` ascending.
pub fn due_set(
  records: Vec<ReviewRecord>,
  now: DateTime<Utc>,
) -> Vec<ReviewRecord> {
  records.into_iter().filter(|r| is_due(r, now)).collect()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
