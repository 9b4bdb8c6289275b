//! Handlers for `/analysis` and `/reports/export`.
//!
//! Analysis aggregates scoped declarations per indicator (weighted), under
//! year/axis/indicator/month/trimester/semester filters. Export assembles
//! the same aggregation into flat rows and renders them; only CSV is
//! rendered in-process, richer formats belong to an external generator.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
  http::{StatusCode, header},
  response::IntoResponse,
};
use serde::Deserialize;
use sitrep_core::{
  engine::Reporting,
  report::{AggregatedRow, CsvReportGenerator, FilterContext, ReportFormat},
  situation::ReportKind,
  store::SituationStore,
};

use crate::{ApiError, CurrentPrincipal};

#[derive(Debug, Deserialize)]
pub struct AnalysisParams {
  pub kind:      Option<ReportKind>,
  pub year:      Option<String>,
  pub month:     Option<u8>,
  pub trimester: Option<u8>,
  pub semester:  Option<u8>,
  pub category:  Option<String>,
  pub indicator: Option<String>,
  /// Only meaningful for `/reports/export`; ignored by `/analysis`.
  pub format:    Option<ReportFormat>,
}

impl AnalysisParams {
  fn context(&self) -> FilterContext {
    FilterContext {
      year:         self.year.clone(),
      month:        self.month,
      trimester:    self.trimester,
      semester:     self.semester,
      category_id:  self.category.clone(),
      indicator_id: self.indicator.clone(),
    }
  }
}

/// `GET /analysis?[kind=...][&year=...][&month=...]...`
pub async fn analysis<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Query(params): Query<AnalysisParams>,
) -> Result<Json<Vec<AggregatedRow>>, ApiError> {
  let kind = params.kind.unwrap_or(ReportKind::Operational);
  let rows = engine.analysis(&principal, kind, &params.context()).await?;
  Ok(Json(rows))
}

/// `GET /reports/export?format=csv&...` — same filters as `/analysis`.
pub async fn export<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Query(params): Query<AnalysisParams>,
) -> Result<impl IntoResponse, ApiError> {
  let format = params.format.unwrap_or(ReportFormat::Csv);
  if format != ReportFormat::Csv {
    return Err(ApiError::BadRequest(
      "only csv export is rendered in-process".into(),
    ));
  }
  let kind = params.kind.unwrap_or(ReportKind::Operational);
  let bytes = engine
    .export(&principal, kind, &params.context(), &CsvReportGenerator, format)
    .await?;
  Ok((
    StatusCode::OK,
    [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
    bytes,
  ))
}
