//! Bearer-token authentication middleware.
//!
//! Token issuance (login, password checks, single-session rotation) happens
//! in the identity layer upstream of this service; here a presented token is
//! only resolved back to its user. The user's structure code is classified
//! into a tagged [`HomeAssignment`] exactly once per request, so nothing
//! downstream ever re-probes the structure tables to figure out what kind
//! of caller it is dealing with.

use axum::{
  body::Body,
  extract::{Request, State},
  http::{StatusCode, header},
  middleware::Next,
  response::{IntoResponse, Response},
};
use sitrep_core::{
  principal::{Principal, Role},
  store::SituationStore as _,
  structure::{HomeAssignment, Structure},
  user::User,
};

use crate::AppState;

fn unauthorized(message: &str) -> Response {
  (
    StatusCode::UNAUTHORIZED,
    [(header::WWW_AUTHENTICATE, "Bearer")],
    message.to_owned(),
  )
    .into_response()
}

/// Resolve `Authorization: Bearer <token>` to a [`Principal`] and stash it
/// in request extensions for the API handlers.
pub async fn authenticate(
  State(state): State<AppState>,
  mut req: Request<Body>,
  next: Next,
) -> Response {
  let token = match bearer_token(&req) {
    Some(t) => t.to_owned(),
    None => return unauthorized("missing bearer token"),
  };

  let user = match state.engine.store().user_by_session_token(token).await {
    Ok(Some(user)) => user,
    Ok(None) => return unauthorized("unknown or expired session"),
    Err(e) => {
      tracing::error!(error = %e, "session lookup failed");
      return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
  };
  if !user.is_active {
    return unauthorized("account is deactivated");
  }

  let principal = match resolve_principal(&state, &user).await {
    Ok(p) => p,
    Err(resp) => return resp,
  };

  req.extensions_mut().insert(principal);
  next.run(req).await
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
  req
    .headers()
    .get(header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Bearer ")
}

/// Classify the user's home structure once, at authentication time.
async fn resolve_principal(
  state: &AppState,
  user: &User,
) -> Result<Principal, Response> {
  let unrestricted = user.role == Role::Admin || user.is_super_admin;

  let home = match &user.structure_code {
    None if unrestricted => HomeAssignment::Global,
    None => {
      return Err(
        (StatusCode::FORBIDDEN, "account has no home structure")
          .into_response(),
      );
    }
    Some(code) => {
      match state.engine.store().resolve_structure(code.clone()).await {
        Ok(Some(Structure::Dc { code, .. })) => HomeAssignment::Dc(code),
        Ok(Some(Structure::Dri { code, .. })) => HomeAssignment::Dri(code),
        Ok(Some(Structure::Diw { code, .. })) => HomeAssignment::Diw(code),
        Ok(None) if unrestricted => HomeAssignment::Global,
        Ok(None) => {
          return Err(
            (StatusCode::FORBIDDEN, "home structure no longer exists")
              .into_response(),
          );
        }
        Err(e) => {
          tracing::error!(error = %e, "structure resolution failed");
          return Err(StatusCode::INTERNAL_SERVER_ERROR.into_response());
        }
      }
    }
  };

  Ok(Principal {
    user_id:        user.user_id,
    role:           user.role,
    home,
    is_super_admin: user.is_super_admin,
  })
}
