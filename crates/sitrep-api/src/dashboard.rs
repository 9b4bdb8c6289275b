//! Handlers for `/dashboard` endpoints.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use sitrep_core::{
  engine::{Dashboard, DiwComparisonRow, Reporting},
  principal::Principal,
  situation::ReportKind,
  store::SituationStore,
  structure::HomeAssignment,
};

use crate::{ApiError, CurrentPrincipal};

/// The declaration family a principal's dashboard shows by default: DC homes
/// report strategically, everyone else consolidates operational reports.
fn default_kind(principal: &Principal) -> ReportKind {
  match ReportKind::for_role(principal.role) {
    Some(kind) if !matches!(principal.home, HomeAssignment::Dri(_)) => kind,
    _ => match principal.home {
      HomeAssignment::Dc(_) => ReportKind::Strategic,
      _ => ReportKind::Operational,
    },
  }
}

#[derive(Debug, Deserialize)]
pub struct DashboardParams {
  /// Override the default family: `operational`, `strategic`, `dri_self`.
  pub kind: Option<ReportKind>,
}

/// `GET /dashboard[?kind=...]`
pub async fn dashboard<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Query(params): Query<DashboardParams>,
) -> Result<Json<Dashboard>, ApiError> {
  let kind = params.kind.unwrap_or_else(|| default_kind(&principal));
  Ok(Json(engine.dashboard(&principal, kind).await?))
}

#[derive(Debug, Deserialize)]
pub struct ComparisonParams {
  /// Reference month (1–12); defaults to the current month.
  pub month: Option<u32>,
  /// Reference year; defaults to the current year.
  pub year:  Option<String>,
}

/// `GET /dashboard/comparison[?month=...][&year=...]` — per-DIW completion
/// table; DRI principals only.
pub async fn comparison<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Query(params): Query<ComparisonParams>,
) -> Result<Json<Vec<DiwComparisonRow>>, ApiError> {
  let now = Utc::now();
  let month = params.month.unwrap_or(now.month());
  let year = params.year.unwrap_or_else(|| now.year().to_string());
  Ok(Json(engine.diw_comparison(&principal, month, &year).await?))
}
