//! Handlers for the admin-gated `/users` surface.
//!
//! Accounts are created inactive and must be explicitly activated. Deletion
//! is soft-blocked while the user still owns situations.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use serde::Deserialize;
use sitrep_core::{
  engine::Reporting,
  principal::{Principal, Role},
  store::SituationStore,
  user::{NewUser, User},
};
use uuid::Uuid;

use crate::{ApiError, CurrentPrincipal};

fn require_admin(principal: &Principal) -> Result<(), ApiError> {
  if principal.is_unrestricted() {
    Ok(())
  } else {
    Err(ApiError::Core(sitrep_core::Error::Forbidden(
      "user administration requires an admin".into(),
    )))
  }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
  pub username:       String,
  pub role:           Role,
  pub structure:      Option<String>,
  pub first_name:     Option<String>,
  pub last_name:      Option<String>,
  pub email:          Option<String>,
  pub phone:          Option<String>,
  #[serde(default)]
  pub is_super_admin: bool,
}

/// `POST /users` — returns 201 + the created (inactive) user.
pub async fn create<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Json(body): Json<CreateUserBody>,
) -> Result<(StatusCode, Json<User>), ApiError> {
  require_admin(&principal)?;
  // Only a super-admin may mint another super-admin.
  if body.is_super_admin && !principal.is_super_admin {
    return Err(ApiError::Core(sitrep_core::Error::Forbidden(
      "only a super-admin may create super-admins".into(),
    )));
  }

  let user = engine
    .store()
    .create_user(NewUser {
      username:       body.username,
      first_name:     body.first_name,
      last_name:      body.last_name,
      email:          body.email,
      phone:          body.phone,
      role:           body.role,
      structure_code: body.structure,
      is_super_admin: body.is_super_admin,
      created_by:     Some(principal.user_id),
    })
    .await
    .map_err(Into::into)
    .map_err(ApiError::Core)?;
  Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /users/:id/activate`
pub async fn activate<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  require_admin(&principal)?;
  engine
    .store()
    .set_user_active(id, true)
    .await
    .map_err(Into::into)
    .map_err(ApiError::Core)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /users/:id/deactivate`
pub async fn deactivate<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  require_admin(&principal)?;
  engine
    .store()
    .set_user_active(id, false)
    .await
    .map_err(Into::into)
    .map_err(ApiError::Core)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /users/:id` — fails with 409 while the user owns situations.
pub async fn delete_one<S: SituationStore>(
  State(engine): State<Arc<Reporting<S>>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  require_admin(&principal)?;
  engine
    .store()
    .delete_user(id)
    .await
    .map_err(Into::into)
    .map_err(ApiError::Core)?;
  Ok(StatusCode::NO_CONTENT)
}
