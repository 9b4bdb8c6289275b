//! Handlers for `/catalog` endpoints: indicator/target reads for data entry,
//! plus the admin-gated write surface (indicator creation, target upserts,
//! explicit default-target materialization).

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use sitrep_core::{
  catalog::{
    CatalogEntry, Category, Indicator, Objective, StrategicCatalogEntry,
    StrategicIndicator,
  },
  engine::Reporting,
  principal::Principal,
  store::SituationStore,
};

use crate::{ApiError, CurrentPrincipal};

fn require_admin(principal: &Principal) -> Result<(), ApiError> {
  if principal.is_unrestricted() {
    Ok(())
  } else {
    Err(ApiError::Core(sitrep_core::Error::Forbidden(
      "catalog administration requires an admin".into(),
    )))
  }
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ScopedParams {
  pub structure: String,
  pub year:      String,
}

#[derive(Debug, Deserialize)]
pub struct YearParams {
  pub year: String,
}

/// `GET /catalog/operational?structure=...&year=...`
pub async fn operational<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(_principal): CurrentPrincipal,
  Query(params): Query<ScopedParams>,
) -> Result<Json<Vec<CatalogEntry>>, ApiError> {
  let entries = engine
    .store()
    .operational_catalog(params.structure, params.year)
    .await
    .map_err(Into::into)
    .map_err(ApiError::Core)?;
  Ok(Json(entries))
}

/// `GET /catalog/strategic?year=...`
pub async fn strategic<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(_principal): CurrentPrincipal,
  Query(params): Query<YearParams>,
) -> Result<Json<Vec<StrategicCatalogEntry>>, ApiError> {
  let entries = engine
    .store()
    .strategic_catalog(params.year)
    .await
    .map_err(Into::into)
    .map_err(ApiError::Core)?;
  Ok(Json(entries))
}

/// `GET /catalog/dri?structure=...&year=...`
pub async fn dri<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(_principal): CurrentPrincipal,
  Query(params): Query<ScopedParams>,
) -> Result<Json<Vec<CatalogEntry>>, ApiError> {
  let entries = engine
    .store()
    .dri_catalog(params.structure, params.year)
    .await
    .map_err(Into::into)
    .map_err(ApiError::Core)?;
  Ok(Json(entries))
}

// ─── Reference-data writes ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CategoryBody {
  pub category_id: String,
  pub label:       String,
}

/// `POST /catalog/categories`
pub async fn create_category<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Json(body): Json<CategoryBody>,
) -> Result<impl IntoResponse, ApiError> {
  require_admin(&principal)?;
  engine
    .store()
    .create_category(Category {
      category_id: body.category_id,
      label:       body.label,
    })
    .await
    .map_err(Into::into)
    .map_err(ApiError::Core)?;
  Ok(StatusCode::CREATED)
}

#[derive(Debug, Deserialize)]
pub struct ObjectiveBody {
  pub category_id: String,
  pub label:       String,
}

/// `POST /catalog/objectives`
pub async fn create_objective<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Json(body): Json<ObjectiveBody>,
) -> Result<(StatusCode, Json<Objective>), ApiError> {
  require_admin(&principal)?;
  let objective = engine
    .store()
    .create_objective(body.category_id, body.label)
    .await
    .map_err(Into::into)
    .map_err(ApiError::Core)?;
  Ok((StatusCode::CREATED, Json(objective)))
}

#[derive(Debug, Deserialize)]
pub struct IndicatorBody {
  pub category_id: String,
  pub label:       String,
}

/// `POST /catalog/indicators` — the id is allocated server-side, never
/// chosen by the caller.
pub async fn create_indicator<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Json(body): Json<IndicatorBody>,
) -> Result<(StatusCode, Json<Indicator>), ApiError> {
  require_admin(&principal)?;
  let indicator = engine
    .store()
    .create_indicator(body.category_id, body.label)
    .await
    .map_err(Into::into)
    .map_err(ApiError::Core)?;
  Ok((StatusCode::CREATED, Json(indicator)))
}

#[derive(Debug, Deserialize)]
pub struct StrategicIndicatorBody {
  pub category_id:  String,
  pub objective_id: i64,
  pub label:        String,
}

/// `POST /catalog/strategic-indicators`
pub async fn create_strategic_indicator<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Json(body): Json<StrategicIndicatorBody>,
) -> Result<(StatusCode, Json<StrategicIndicator>), ApiError> {
  require_admin(&principal)?;
  let indicator = engine
    .store()
    .create_strategic_indicator(body.category_id, body.objective_id, body.label)
    .await
    .map_err(Into::into)
    .map_err(ApiError::Core)?;
  Ok((StatusCode::CREATED, Json(indicator)))
}

// ─── Target writes ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OperationalTargetBody {
  pub indicator_id: String,
  pub structure:    String,
  pub year:         String,
  pub value:        f64,
}

/// `PUT /catalog/targets/operational`
pub async fn set_operational_target<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Json(body): Json<OperationalTargetBody>,
) -> Result<StatusCode, ApiError> {
  require_admin(&principal)?;
  engine
    .store()
    .set_operational_target(body.indicator_id, body.structure, body.year, body.value)
    .await
    .map_err(Into::into)
    .map_err(ApiError::Core)?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct StrategicTargetBody {
  pub indicator_id: String,
  pub year:         String,
  pub value:        f64,
}

/// `PUT /catalog/targets/strategic` — strategic targets are global per
/// year, not per structure.
pub async fn set_strategic_target<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Json(body): Json<StrategicTargetBody>,
) -> Result<StatusCode, ApiError> {
  require_admin(&principal)?;
  engine
    .store()
    .set_strategic_target(body.indicator_id, body.year, body.value)
    .await
    .map_err(Into::into)
    .map_err(ApiError::Core)?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct DriTargetBody {
  pub indicator_id: i64,
  pub structure:    String,
  pub year:         String,
  pub value:        f64,
}

/// `PUT /catalog/targets/dri`
pub async fn set_dri_target<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Json(body): Json<DriTargetBody>,
) -> Result<StatusCode, ApiError> {
  require_admin(&principal)?;
  engine
    .store()
    .set_dri_target(body.indicator_id, body.structure, body.year, body.value)
    .await
    .map_err(Into::into)
    .map_err(ApiError::Core)?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct MaterializeBody {
  pub structure: String,
  pub year:      String,
}

#[derive(Debug, Serialize)]
pub struct MaterializeResult {
  pub inserted: usize,
}

/// `POST /catalog/targets/materialize` — deliberately a separate write
/// operation, so catalog reads stay side-effect free.
pub async fn materialize_targets<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Json(body): Json<MaterializeBody>,
) -> Result<Json<MaterializeResult>, ApiError> {
  require_admin(&principal)?;
  let inserted = engine
    .store()
    .materialize_default_targets(body.structure, body.year)
    .await
    .map_err(Into::into)
    .map_err(ApiError::Core)?;
  Ok(Json(MaterializeResult { inserted }))
}
