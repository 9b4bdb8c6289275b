//! JSON REST API for sitrep.
//!
//! Exposes an axum [`Router`] backed by any
//! [`sitrep_core::store::SituationStore`] through the
//! [`Reporting`](sitrep_core::engine::Reporting) engine. Authentication is
//! the caller's responsibility: handlers read the already-resolved
//! [`Principal`] from request extensions (see `sitrep-server`'s auth
//! middleware).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", sitrep_api::api_router(engine.clone()))
//! ```

pub mod catalog;
pub mod dashboard;
pub mod error;
pub mod notifications;
pub mod reports;
pub mod situations;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  extract::FromRequestParts,
  http::request::Parts,
  routing::{get, post, put},
};
use sitrep_core::{
  engine::Reporting, principal::Principal, store::SituationStore,
};

pub use error::ApiError;

/// The authenticated caller, taken from request extensions where the
/// server's auth middleware placed it.
pub struct CurrentPrincipal(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for CurrentPrincipal {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Principal>()
      .cloned()
      .map(CurrentPrincipal)
      .ok_or(ApiError::Unauthorized)
  }
}

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Arc<Reporting<S>>) -> Router<()>
where
  S: SituationStore + Send + Sync + 'static,
{
  Router::new()
    // Situations — lifecycle
    .route(
      "/situations",
      get(situations::list::<S>).post(situations::create::<S>),
    )
    .route(
      "/situations/{id}",
      get(situations::get_one::<S>).delete(situations::delete_one::<S>),
    )
    .route("/situations/{id}/draft", put(situations::save_draft::<S>))
    .route("/situations/{id}/confirm", post(situations::confirm::<S>))
    .route("/situations/{id}/validate", post(situations::validate::<S>))
    .route("/situations/{id}/reject", post(situations::reject::<S>))
    .route("/situations/{id}/rejections", get(situations::rejections::<S>))
    // Catalog
    .route("/catalog/operational", get(catalog::operational::<S>))
    .route("/catalog/strategic", get(catalog::strategic::<S>))
    .route("/catalog/dri", get(catalog::dri::<S>))
    .route("/catalog/categories", post(catalog::create_category::<S>))
    .route("/catalog/objectives", post(catalog::create_objective::<S>))
    .route("/catalog/indicators", post(catalog::create_indicator::<S>))
    .route(
      "/catalog/strategic-indicators",
      post(catalog::create_strategic_indicator::<S>),
    )
    .route(
      "/catalog/targets/operational",
      put(catalog::set_operational_target::<S>),
    )
    .route(
      "/catalog/targets/strategic",
      put(catalog::set_strategic_target::<S>),
    )
    .route("/catalog/targets/dri", put(catalog::set_dri_target::<S>))
    .route(
      "/catalog/targets/materialize",
      post(catalog::materialize_targets::<S>),
    )
    // Dashboards & analysis
    .route("/dashboard", get(dashboard::dashboard::<S>))
    .route("/dashboard/comparison", get(dashboard::comparison::<S>))
    .route("/analysis", get(reports::analysis::<S>))
    .route("/reports/export", get(reports::export::<S>))
    // Notification feed
    .route("/notifications", get(notifications::feed::<S>))
    // User administration
    .route("/users", post(users::create::<S>))
    .route("/users/{id}/activate", post(users::activate::<S>))
    .route("/users/{id}/deactivate", post(users::deactivate::<S>))
    .route("/users/{id}", axum::routing::delete(users::delete_one::<S>))
    .with_state(engine)
}
