//! Handler for the `/notifications` polling feed.
//!
//! The core never pushes notifications; this endpoint exposes the state an
//! external notifier (or the UI badge) polls: situations awaiting the
//! caller's validation, the caller's rejected situations, recent
//! validations, and periods the caller's structure has not filed.

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::{Datelike, Duration, Utc};
use serde::Serialize;
use sitrep_core::{
  engine::Reporting,
  period::{MONTH_NAMES, Period},
  situation::Situation,
  store::SituationStore,
};

use crate::{ApiError, CurrentPrincipal};

/// How far back "recently validated" reaches.
const VALIDATION_WINDOW_DAYS: i64 = 3;

#[derive(Debug, Serialize)]
pub struct NotificationFeed {
  /// Submitted situations awaiting the caller's validation.
  pub pending_validation: Vec<Situation>,
  /// The caller's own rejected situations.
  pub rejected:           Vec<Situation>,
  /// The caller's situations validated in the last few days.
  pub recently_validated: Vec<Situation>,
  /// Periods with no situation filed for the caller's home structure,
  /// from January of last year through the last elapsed month.
  pub missing_periods:    Vec<Period>,
}

/// `GET /notifications`
pub async fn feed<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<NotificationFeed>, ApiError> {
  let now = Utc::now();

  let pending_validation = engine.pending_validation(&principal).await?;
  let rejected = engine.my_rejected(&principal).await?;
  let recently_validated = engine
    .my_recently_validated(&principal, now - Duration::days(VALIDATION_WINDOW_DAYS))
    .await?;

  // Submitting roles are checked for gaps from January of last year up to
  // the last elapsed month; reviewers have no home structure to check.
  let missing_periods = if principal.role.submits_reports() {
    let last_elapsed = previous_month(now.month(), now.year());
    let from = Period::new(MONTH_NAMES[0], (now.year() - 1).to_string());
    engine.missing_periods(&principal, from, last_elapsed).await?
  } else {
    Vec::new()
  };

  Ok(Json(NotificationFeed {
    pending_validation,
    rejected,
    recently_validated,
    missing_periods,
  }))
}

fn previous_month(month: u32, year: i32) -> Period {
  if month == 1 {
    Period::new(MONTH_NAMES[11], (year - 1).to_string())
  } else {
    Period::new(MONTH_NAMES[month as usize - 2], year.to_string())
  }
}
