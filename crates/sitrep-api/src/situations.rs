//! Handlers for `/situations` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/situations` | scoped list; optional `year`, `status`, `structure` |
//! | `POST`   | `/situations` | body: `{month, year}`; 201 + situation in Draft |
//! | `GET`    | `/situations/:id` | situation + declarations + rejection history |
//! | `DELETE` | `/situations/:id` | owner only, Draft/Rejected only |
//! | `PUT`    | `/situations/:id/draft` | replace draft declarations |
//! | `POST`   | `/situations/:id/confirm` | submit for approval |
//! | `POST`   | `/situations/:id/validate` | validating authority only |
//! | `POST`   | `/situations/:id/reject` | body: `{comment}`, non-empty |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use sitrep_core::{
  declaration::DeclarationInput,
  engine::{Reporting, SituationView},
  period::Period,
  situation::{RejectionEvent, Situation, Status},
  store::{SituationQuery, SituationStore},
};
use uuid::Uuid;

use crate::{ApiError, CurrentPrincipal};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub year:      Option<String>,
  /// Status name: `draft`, `submitted`, `rejected`, `validated`.
  pub status:    Option<Status>,
  /// Narrow to one structure within the caller's scope.
  pub structure: Option<String>,
}

/// `GET /situations[?year=...][&status=...][&structure=...]`
pub async fn list<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Situation>>, ApiError> {
  let query = SituationQuery {
    structures: params.structure.map(|s| vec![s]),
    status: params.status,
    year: params.year,
    ..Default::default()
  };
  let situations = engine.scoped_situations(&principal, query).await?;
  Ok(Json(situations))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub month: String,
  pub year:  String,
}

/// `POST /situations` — returns 201 + the new Draft situation.
pub async fn create<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  if body.month.trim().is_empty() || body.year.trim().is_empty() {
    return Err(ApiError::BadRequest("month and year are required".into()));
  }
  let situation = engine
    .create_situation(&principal, Period::new(body.month, body.year))
    .await?;
  Ok((StatusCode::CREATED, Json(situation)))
}

// ─── Read ────────────────────────────────────────────────────────────────────

/// `GET /situations/:id`
pub async fn get_one<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Uuid>,
) -> Result<Json<SituationView>, ApiError> {
  Ok(Json(engine.situation_view(&principal, id).await?))
}

/// `GET /situations/:id/rejections`
pub async fn rejections<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<RejectionEvent>>, ApiError> {
  let view = engine.situation_view(&principal, id).await?;
  Ok(Json(view.rejections))
}

// ─── Mutations ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DeclarationsBody {
  pub declarations: Vec<DeclarationInput>,
}

/// `PUT /situations/:id/draft` — replace all draft rows.
pub async fn save_draft<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Uuid>,
  Json(body): Json<DeclarationsBody>,
) -> Result<StatusCode, ApiError> {
  engine.save_draft(&principal, id, body.declarations).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /situations/:id/confirm` — submit for approval.
pub async fn confirm<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Uuid>,
  Json(body): Json<DeclarationsBody>,
) -> Result<Json<Situation>, ApiError> {
  if body.declarations.is_empty() {
    return Err(ApiError::BadRequest("no declarations submitted".into()));
  }
  let situation = engine.confirm(&principal, id, body.declarations).await?;
  Ok(Json(situation))
}

/// `POST /situations/:id/validate`
pub async fn validate<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Uuid>,
) -> Result<Json<Situation>, ApiError> {
  Ok(Json(engine.validate(&principal, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
  pub comment: String,
}

/// `POST /situations/:id/reject` — body: `{"comment":"..."}`.
pub async fn reject<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Uuid>,
  Json(body): Json<RejectBody>,
) -> Result<Json<Situation>, ApiError> {
  Ok(Json(engine.reject(&principal, id, body.comment).await?))
}

/// `DELETE /situations/:id`
pub async fn delete_one<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  engine.delete(&principal, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
