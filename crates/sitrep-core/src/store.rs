//! The `SituationStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `sitrep-store-sqlite`).
//! Higher layers (`sitrep-api`, the [`crate::engine::Reporting`] engine)
//! depend on this abstraction, not on any concrete backend.
//!
//! The store owns mechanics and atomicity; policy (scope, ownership) lives
//! in the engine. The exceptions are the checks that must be atomic with
//! their write: the one-situation-per-period rule at creation, and the
//! status preconditions inside `confirm` / `validate` / `reject`, which the
//! store re-verifies within the same transaction as the swap.

use std::future::Future;

use uuid::Uuid;

use crate::{
  catalog::{
    CatalogEntry, Category, DriIndicator, Indicator, Objective,
    StrategicCatalogEntry, StrategicIndicator,
  },
  declaration::{AnalysisRow, DeclarationRow},
  period::Period,
  principal::Role,
  situation::{
    NewSituation, RejectionEvent, ReportKind, Situation, Status,
  },
  structure::{Structure, StructureKind},
  user::{NewUser, User},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`SituationStore::list_situations`]. `None` means "any".
#[derive(Debug, Clone, Default)]
pub struct SituationQuery {
  pub structures: Option<Vec<String>>,
  pub owner:      Option<Uuid>,
  pub status:     Option<Status>,
  pub kind:       Option<ReportKind>,
  pub year:       Option<String>,
}

/// Parameters for [`SituationStore::analysis_rows`]. `None` means "any";
/// `kind` selects the declaration family and is always required.
#[derive(Debug, Clone)]
pub struct AnalysisFilter {
  pub kind:         ReportKind,
  pub structures:   Option<Vec<String>>,
  pub year:         Option<String>,
  pub category_id:  Option<String>,
  pub indicator_id: Option<String>,
  /// Month-name whitelist (lowercased on comparison).
  pub months:       Option<Vec<String>>,
}

/// Which timestamp a validation sets; derived from the situation's
/// [`ReportKind`] by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationAuthority {
  /// Parent DRI validating a DIW report — sets `dri_validated_at`.
  Dri,
  /// Admin validating a DRI-self or DC report — sets `admin_validated_at`.
  Admin,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a sitrep storage backend.
///
/// Timestamps (`created_at`, `edited_at`, transition dates) are always set
/// by the store, never accepted from callers. `confirm_situation`,
/// `reject_situation`, and `delete_situation` execute as single atomic
/// units: a failure mid-way leaves the situation in its prior state.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait SituationStore: Send + Sync {
  type Error: Into<crate::Error> + std::error::Error + Send + Sync + 'static;

  // ── Structures ────────────────────────────────────────────────────────

  /// Persist a structure. DIWs must reference an existing parent DRI.
  fn create_structure(
    &self,
    structure: Structure,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Classify a code. Lookup order is DC → DRI → DIW; first match wins.
  /// Codes are assumed disjoint across the three tables.
  fn resolve_structure(
    &self,
    code: String,
  ) -> impl Future<Output = Result<Option<Structure>, Self::Error>> + Send + '_;

  /// Child DIW codes of a DRI. Empty when the code is not a DRI.
  fn children_of(
    &self,
    dri_code: String,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// List structures, optionally restricted to one kind.
  fn list_structures(
    &self,
    kind: Option<StructureKind>,
  ) -> impl Future<Output = Result<Vec<Structure>, Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create a user (inactive until explicitly activated).
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Resolve a session token back to its user, if any.
  fn user_by_session_token(
    &self,
    token: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn set_user_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Replace (or clear) the user's single session token.
  fn set_session_token(
    &self,
    id: Uuid,
    token: Option<String>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete a user. Fails with `OwnedSituationsExist` while the user still
  /// owns any situation.
  fn delete_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Ids of users with `role` homed at `structure_code`; used for the DC
  /// owner-narrowing rule.
  fn user_ids_with_role_at(
    &self,
    role: Role,
    structure_code: String,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  // ── Catalog ───────────────────────────────────────────────────────────

  fn create_category(
    &self,
    category: Category,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_categories(
    &self,
  ) -> impl Future<Output = Result<Vec<Category>, Self::Error>> + Send + '_;

  fn create_objective(
    &self,
    category_id: String,
    label: String,
  ) -> impl Future<Output = Result<Objective, Self::Error>> + Send + '_;

  /// Create an operational indicator, allocating its `"{category}.{seq}"`
  /// id from the category's never-reused sequence.
  fn create_indicator(
    &self,
    category_id: String,
    label: String,
  ) -> impl Future<Output = Result<Indicator, Self::Error>> + Send + '_;

  /// Same allocation scheme, against the category's strategic sequence.
  fn create_strategic_indicator(
    &self,
    category_id: String,
    objective_id: i64,
    label: String,
  ) -> impl Future<Output = Result<StrategicIndicator, Self::Error>> + Send + '_;

  /// Insert or relabel one of the fixed DRI performance indicators.
  fn upsert_dri_indicator(
    &self,
    indicator: DriIndicator,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Operational indicators with their `(structure, year)` targets,
  /// defaulting to 0, ordered by indicator id.
  fn operational_catalog(
    &self,
    structure_code: String,
    year: String,
  ) -> impl Future<Output = Result<Vec<CatalogEntry>, Self::Error>> + Send + '_;

  /// Strategic indicators with their global per-year targets, ordered by
  /// category, objective, indicator.
  fn strategic_catalog(
    &self,
    year: String,
  ) -> impl Future<Output = Result<Vec<StrategicCatalogEntry>, Self::Error>> + Send + '_;

  /// The fixed DRI self-report indicator set with `(dri, year)` targets.
  fn dri_catalog(
    &self,
    dri_code: String,
    year: String,
  ) -> impl Future<Output = Result<Vec<CatalogEntry>, Self::Error>> + Send + '_;

  /// `(indicator id, label)` pairs for one declaration family; used to
  /// annotate dashboards and exports.
  fn indicator_labels(
    &self,
    kind: ReportKind,
  ) -> impl Future<Output = Result<Vec<(String, String)>, Self::Error>> + Send + '_;

  /// Upsert one target value; at most one row per scope tuple.
  fn set_operational_target(
    &self,
    indicator_id: String,
    structure_code: String,
    year: String,
    value: f64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn set_strategic_target(
    &self,
    indicator_id: String,
    year: String,
    value: f64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn set_dri_target(
    &self,
    indicator_id: i64,
    dri_code: String,
    year: String,
    value: f64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Insert zero-valued operational target rows for every indicator lacking
  /// one at `(structure, year)`. Returns the number inserted. Deliberately a
  /// separate write operation — catalog reads never materialise targets.
  fn materialize_default_targets(
    &self,
    structure_code: String,
    year: String,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Situations ────────────────────────────────────────────────────────

  /// Create a situation in `Draft`. Fails with `DuplicatePeriod` when one
  /// already exists for `(structure, month, year)`; the check and insert
  /// are atomic.
  fn create_situation(
    &self,
    input: NewSituation,
  ) -> impl Future<Output = Result<Situation, Self::Error>> + Send + '_;

  fn get_situation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Situation>, Self::Error>> + Send + '_;

  fn list_situations<'a>(
    &'a self,
    query: &'a SituationQuery,
  ) -> impl Future<Output = Result<Vec<Situation>, Self::Error>> + Send + 'a;

  /// Replace every draft row for the situation (delete-then-insert, not
  /// incremental) and stamp `edited_at`. Does not change status.
  fn replace_draft(
    &self,
    id: Uuid,
    rows: Vec<DeclarationRow>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Submit for approval. Atomically: delete live and draft rows, insert
  /// `rows` live, set `Submitted` + `confirmed_at`. Requires the situation
  /// to be in `Draft` or `Rejected`.
  fn confirm_situation(
    &self,
    id: Uuid,
    rows: Vec<DeclarationRow>,
  ) -> impl Future<Output = Result<Situation, Self::Error>> + Send + '_;

  /// Set `Validated` and the authority's timestamp. Requires `Submitted`.
  /// There is no inverse transition.
  fn validate_situation(
    &self,
    id: Uuid,
    authority: ValidationAuthority,
  ) -> impl Future<Output = Result<Situation, Self::Error>> + Send + '_;

  /// Bounce back to the owner. Atomically: copy live rows into the draft
  /// shadow, delete them, append a rejection event, set `Rejected` +
  /// `edited_at`. Requires `Submitted`.
  fn reject_situation(
    &self,
    id: Uuid,
    comment: String,
    rejected_by: Uuid,
  ) -> impl Future<Output = Result<Situation, Self::Error>> + Send + '_;

  /// Remove the situation and its declaration rows. Policy (owner-only,
  /// `Draft`/`Rejected` only) is enforced by the engine.
  fn delete_situation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Declarations & history ────────────────────────────────────────────

  fn live_declarations(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<DeclarationRow>, Self::Error>> + Send + '_;

  fn draft_declarations(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<DeclarationRow>, Self::Error>> + Send + '_;

  /// Live declarations for a set of situations, joined with their situation
  /// context (structure, period, category) for aggregation.
  fn declarations_for_situations(
    &self,
    kind: ReportKind,
    ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<Vec<AnalysisRow>, Self::Error>> + Send + '_;

  /// Filtered live declarations across situations, for analysis queries.
  fn analysis_rows<'a>(
    &'a self,
    filter: &'a AnalysisFilter,
  ) -> impl Future<Output = Result<Vec<AnalysisRow>, Self::Error>> + Send + 'a;

  /// Rejection events for a situation, oldest first.
  fn rejection_history(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<RejectionEvent>, Self::Error>> + Send + '_;

  /// Every period a structure has a situation for, any status; feeds
  /// missing-period detection.
  fn filed_periods(
    &self,
    structure_code: String,
  ) -> impl Future<Output = Result<Vec<Period>, Self::Error>> + Send + '_;
}
