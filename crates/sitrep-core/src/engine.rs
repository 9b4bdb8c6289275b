//! [`Reporting`] — the situation lifecycle engine.
//!
//! One implementation of the rules the legacy application duplicated across
//! five role controllers: every read goes through the scope gate, every
//! mutation through the ownership gate, every transition through the state
//! machine, and every metric through the one aggregator.
//!
//! The engine is generic over the storage backend and holds no state of its
//! own; it can be shared freely behind an `Arc`.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  declaration::{DeclarationInput, DeclarationRow},
  metrics::{
    self, IndicatorAggregate, StatusCounts, completion_rate, expected_periods,
  },
  period::Period,
  principal::{Principal, Role},
  report::{
    AggregatedRow, FilterContext, FlatExportRow, NameIndex, ReportFormat,
    ReportGenerator, assemble,
  },
  scope::{self, Visibility},
  situation::{
    NewSituation, RejectionEvent, ReportKind, Situation, Status,
  },
  store::{
    AnalysisFilter, SituationQuery, SituationStore, ValidationAuthority,
  },
  structure::{HomeAssignment, StructureKind},
};

// ─── View types ──────────────────────────────────────────────────────────────

/// A situation with its declarations and rejection history, as shown to a
/// scope member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SituationView {
  pub situation:  Situation,
  pub live:       Vec<DeclarationRow>,
  pub draft:      Vec<DeclarationRow>,
  pub rejections: Vec<RejectionEvent>,
}

/// One indicator on a dashboard chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
  pub label:     String,
  pub aggregate: IndicatorAggregate,
}

/// One category (axis) block of a dashboard year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySnapshot {
  pub category_id:    String,
  pub category_label: String,
  pub indicators:     Vec<IndicatorSnapshot>,
}

/// Aggregates for one year: status counters plus the latest-validated
/// snapshot per structure, decomposed by category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearSnapshot {
  pub year:       String,
  pub counts:     StatusCounts,
  pub categories: Vec<CategorySnapshot>,
}

/// The dashboard read model for one principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
  /// Situations owned by the caller.
  pub own:   StatusCounts,
  /// Every situation in the caller's visible scope.
  pub scope: StatusCounts,
  pub years: Vec<YearSnapshot>,
}

/// One row of the per-DIW completion table shown to a DRI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiwComparisonRow {
  pub code:       String,
  pub label:      String,
  pub counts:     StatusCounts,
  /// Periods expected to be filed by now this year.
  pub expected:   u32,
  pub missing:    u32,
  /// `filed / expected`, as a percentage.
  pub completion: f64,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct Reporting<S> {
  store: S,
}

impl<S: SituationStore> Reporting<S> {
  pub fn new(store: S) -> Self { Self { store } }

  /// Direct access to the underlying store, for administrative surfaces
  /// that sit outside the lifecycle rules.
  pub fn store(&self) -> &S { &self.store }

  // ── Scope ─────────────────────────────────────────────────────────────

  /// The visible structure set for a principal. DRI homes (including
  /// Directors resolved to a DRI) expand to self plus child DIWs.
  pub async fn visibility(&self, principal: &Principal) -> Result<Visibility> {
    let children = self.home_children(principal).await?;
    Ok(scope::visible_structures(principal, &children))
  }

  async fn home_children(&self, principal: &Principal) -> Result<Vec<String>> {
    match &principal.home {
      HomeAssignment::Dri(code) => {
        self.store.children_of(code.clone()).await.map_err(Into::into)
      }
      _ => Ok(Vec::new()),
    }
  }

  async fn owner_whitelist(
    &self,
    principal: &Principal,
  ) -> Result<Option<BTreeSet<Uuid>>> {
    match scope::owner_narrowing(principal) {
      Some((role, code)) => {
        let ids = self
          .store
          .user_ids_with_role_at(role, code.to_owned())
          .await
          .map_err(Into::into)?;
        Ok(Some(ids.into_iter().collect()))
      }
      None => Ok(None),
    }
  }

  /// List situations, restricted to the caller's scope. A caller-supplied
  /// structure filter narrows within the scope, never beyond it.
  pub async fn scoped_situations(
    &self,
    principal: &Principal,
    mut query: SituationQuery,
  ) -> Result<Vec<Situation>> {
    match self.visibility(principal).await? {
      Visibility::All => {}
      Visibility::Structures(visible) => {
        let structures = match query.structures.take() {
          Some(requested) => requested
            .into_iter()
            .filter(|c| visible.contains(c))
            .collect(),
          None => visible.into_iter().collect::<Vec<_>>(),
        };
        query.structures = Some(structures);
      }
    }

    let mut situations =
      self.store.list_situations(&query).await.map_err(Into::into)?;
    if let Some(ids) = self.owner_whitelist(principal).await? {
      situations.retain(|s| ids.contains(&s.owner_user_id));
    }
    situations.sort_by(|a, b| b.last_touched().cmp(&a.last_touched()));
    Ok(situations)
  }

  async fn load(&self, id: Uuid) -> Result<Situation> {
    self
      .store
      .get_situation(id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::SituationNotFound(id))
  }

  async fn require_visible(
    &self,
    principal: &Principal,
    situation: &Situation,
  ) -> Result<()> {
    let visibility = self.visibility(principal).await?;
    if visibility.permits(&situation.structure_code) {
      Ok(())
    } else {
      Err(Error::out_of_scope())
    }
  }

  // ── Lifecycle ─────────────────────────────────────────────────────────

  /// Create a situation in `Draft` for the caller's home structure. At most
  /// one situation exists per `(structure, month, year)`.
  pub async fn create_situation(
    &self,
    principal: &Principal,
    period: Period,
  ) -> Result<Situation> {
    let kind = ReportKind::for_role(principal.role).ok_or_else(|| {
      Error::Forbidden(format!("role {} does not submit reports", principal.role))
    })?;
    let structure_code = principal
      .home
      .code()
      .ok_or_else(|| Error::Forbidden("no home structure".into()))?
      .to_owned();

    let situation = self
      .store
      .create_situation(NewSituation {
        structure_code,
        period,
        kind,
        owner_user_id: principal.user_id,
      })
      .await
      .map_err(Into::into)?;

    Ok(situation)
  }

  /// Targets in force for a situation's family, structure and year.
  /// Missing rows read as 0.
  async fn targets_for(
    &self,
    situation: &Situation,
  ) -> Result<HashMap<String, f64>> {
    let year = situation.period.year.clone();
    let targets = match situation.kind {
      ReportKind::Operational => self
        .store
        .operational_catalog(situation.structure_code.clone(), year)
        .await
        .map_err(Into::into)?
        .into_iter()
        .map(|e| (e.indicator_id, e.target))
        .collect(),
      ReportKind::Strategic => self
        .store
        .strategic_catalog(year)
        .await
        .map_err(Into::into)?
        .into_iter()
        .map(|e| (e.indicator_id, e.target))
        .collect(),
      ReportKind::DriSelf => self
        .store
        .dri_catalog(situation.structure_code.clone(), year)
        .await
        .map_err(Into::into)?
        .into_iter()
        .map(|e| (e.indicator_id, e.target))
        .collect(),
    };
    Ok(targets)
  }

  fn compute_rows(
    inputs: &[DeclarationInput],
    targets: &HashMap<String, f64>,
  ) -> Vec<DeclarationRow> {
    inputs
      .iter()
      .map(|input| {
        let target = targets.get(&input.indicator_id).copied().unwrap_or(0.0);
        DeclarationRow::compute(input, target)
      })
      .collect()
  }

  /// Save the owner's work-in-progress. Replaces all draft rows; legal in
  /// every state except the terminal `Validated`.
  pub async fn save_draft(
    &self,
    principal: &Principal,
    id: Uuid,
    inputs: Vec<DeclarationInput>,
  ) -> Result<()> {
    let situation = self.load(id).await?;
    if !scope::can_mutate(principal, &situation) {
      return Err(Error::not_owner());
    }
    situation.status.ensure(!situation.status.is_terminal(), "edit")?;

    let targets = self.targets_for(&situation).await?;
    let rows = Self::compute_rows(&inputs, &targets);
    self.store.replace_draft(id, rows).await.map_err(Into::into)
  }

  /// Submit for approval, from `Draft` or `Rejected`.
  pub async fn confirm(
    &self,
    principal: &Principal,
    id: Uuid,
    inputs: Vec<DeclarationInput>,
  ) -> Result<Situation> {
    let situation = self.load(id).await?;
    if !scope::can_mutate(principal, &situation) {
      return Err(Error::not_owner());
    }
    situation.status.ensure(situation.status.is_editable(), "confirm")?;

    let targets = self.targets_for(&situation).await?;
    let rows = Self::compute_rows(&inputs, &targets);
    self
      .store
      .confirm_situation(id, rows)
      .await
      .map_err(Into::into)
  }

  async fn require_validator(
    &self,
    principal: &Principal,
    situation: &Situation,
  ) -> Result<ValidationAuthority> {
    let children = self.home_children(principal).await?;
    if !scope::can_validate(principal, situation, &children) {
      return Err(Error::Forbidden(
        "caller is not the validating authority for this situation".into(),
      ));
    }
    Ok(if situation.kind.validated_by_dri() {
      ValidationAuthority::Dri
    } else {
      ValidationAuthority::Admin
    })
  }

  /// Validate a submitted situation. Terminal; no inverse transition.
  pub async fn validate(
    &self,
    principal: &Principal,
    id: Uuid,
  ) -> Result<Situation> {
    let situation = self.load(id).await?;
    let authority = self.require_validator(principal, &situation).await?;
    situation
      .status
      .ensure(situation.status == Status::Submitted, "validate")?;
    self
      .store
      .validate_situation(id, authority)
      .await
      .map_err(Into::into)
  }

  /// Reject a submitted situation with a mandatory comment. Declarations
  /// bounce back to the draft shadow; the owner keeps full edit/resubmit
  /// ability afterwards.
  pub async fn reject(
    &self,
    principal: &Principal,
    id: Uuid,
    comment: String,
  ) -> Result<Situation> {
    if comment.trim().is_empty() {
      return Err(Error::EmptyRejectionComment);
    }
    let situation = self.load(id).await?;
    self.require_validator(principal, &situation).await?;
    situation
      .status
      .ensure(situation.status == Status::Submitted, "reject")?;
    self
      .store
      .reject_situation(id, comment, principal.user_id)
      .await
      .map_err(Into::into)
  }

  /// Delete a situation: owner only, `Draft` or `Rejected` only.
  pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<()> {
    let situation = self.load(id).await?;
    if !scope::can_mutate(principal, &situation) {
      return Err(Error::not_owner());
    }
    situation.status.ensure(situation.status.is_editable(), "delete")?;
    self.store.delete_situation(id).await.map_err(Into::into)
  }

  /// Full view of a situation for a scope member.
  pub async fn situation_view(
    &self,
    principal: &Principal,
    id: Uuid,
  ) -> Result<SituationView> {
    let situation = self.load(id).await?;
    self.require_visible(principal, &situation).await?;

    let live = self.store.live_declarations(id).await.map_err(Into::into)?;
    let draft = self.store.draft_declarations(id).await.map_err(Into::into)?;
    let rejections =
      self.store.rejection_history(id).await.map_err(Into::into)?;
    Ok(SituationView { situation, live, draft, rejections })
  }

  // ── Dashboards & analysis ─────────────────────────────────────────────

  /// The dashboard read model: status counters plus, per year, the
  /// latest-validated snapshot per structure aggregated by category.
  pub async fn dashboard(
    &self,
    principal: &Principal,
    kind: ReportKind,
  ) -> Result<Dashboard> {
    let all = self
      .scoped_situations(principal, SituationQuery::default())
      .await?;
    let scope_counts = metrics::status_counts(&all);
    let own = metrics::status_counts(
      all.iter().filter(|s| s.owner_user_id == principal.user_id),
    );

    let names = self.name_index(kind).await?;
    let of_kind: Vec<Situation> =
      all.into_iter().filter(|s| s.kind == kind).collect();

    let mut years: Vec<String> = of_kind
      .iter()
      .map(|s| s.period.year.clone())
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect();
    years.reverse();

    let mut snapshots = Vec::new();
    for year in years {
      let in_year: Vec<Situation> = of_kind
        .iter()
        .filter(|s| s.period.year == year)
        .cloned()
        .collect();
      let counts = metrics::status_counts(&in_year);
      let latest =
        metrics::latest_validated_per_structure(&in_year, Some(year.as_str()));
      let ids: Vec<Uuid> = latest.iter().map(|s| s.situation_id).collect();

      let rows = self
        .store
        .declarations_for_situations(kind, ids)
        .await
        .map_err(Into::into)?;
      let categories = Self::categorize(&rows, &names);

      snapshots.push(YearSnapshot { year, counts, categories });
    }

    Ok(Dashboard { own, scope: scope_counts, years: snapshots })
  }

  /// Group analysis rows into category blocks of indicator aggregates.
  fn categorize(
    rows: &[crate::declaration::AnalysisRow],
    names: &NameIndex,
  ) -> Vec<CategorySnapshot> {
    let mut by_category: std::collections::BTreeMap<&str, Vec<&DeclarationRow>> =
      Default::default();
    for r in rows {
      by_category.entry(&r.category_id).or_default().push(&r.row);
    }

    by_category
      .into_iter()
      .map(|(category_id, group)| {
        let aggregates = metrics::aggregate_by_indicator(group);
        CategorySnapshot {
          category_id:    category_id.to_owned(),
          category_label: names
            .categories
            .get(category_id)
            .cloned()
            .unwrap_or_else(|| category_id.to_owned()),
          indicators: aggregates
            .into_iter()
            .map(|aggregate| IndicatorSnapshot {
              label: names
                .indicators
                .get(&aggregate.indicator_id)
                .cloned()
                .unwrap_or_else(|| aggregate.indicator_id.clone()),
              aggregate,
            })
            .collect(),
        }
      })
      .collect()
  }

  /// Per-DIW completion table for a DRI (or a Director resolved to one).
  pub async fn diw_comparison(
    &self,
    principal: &Principal,
    current_month: u32,
    current_year: &str,
  ) -> Result<Vec<DiwComparisonRow>> {
    let dri_code = match &principal.home {
      HomeAssignment::Dri(code) => code.clone(),
      _ => {
        return Err(Error::Forbidden(
          "only DRI principals compare their DIWs".into(),
        ));
      }
    };

    let diws: Vec<_> = self
      .store
      .list_structures(Some(StructureKind::Diw))
      .await
      .map_err(Into::into)?
      .into_iter()
      .filter(|s| s.parent_dri() == Some(dri_code.as_str()))
      .collect();

    let query = SituationQuery {
      structures: Some(diws.iter().map(|d| d.code().to_owned()).collect()),
      year: Some(current_year.to_owned()),
      ..Default::default()
    };
    let situations =
      self.store.list_situations(&query).await.map_err(Into::into)?;

    let expected = expected_periods(current_month);
    let mut rows: Vec<DiwComparisonRow> = diws
      .into_iter()
      .map(|diw| {
        let counts = metrics::status_counts(
          situations.iter().filter(|s| s.structure_code == diw.code()),
        );
        DiwComparisonRow {
          code:       diw.code().to_owned(),
          label:      diw.display_name().to_owned(),
          counts,
          expected,
          missing:    (expected as i64 - counts.total as i64).max(0) as u32,
          completion: completion_rate(counts.total, expected),
        }
      })
      .collect();
    rows.sort_by(|a, b| a.label.cmp(&b.label));
    Ok(rows)
  }

  /// Weighted per-indicator aggregation of scoped declarations under the
  /// given filters.
  pub async fn analysis(
    &self,
    principal: &Principal,
    kind: ReportKind,
    context: &FilterContext,
  ) -> Result<Vec<AggregatedRow>> {
    let structures = match self.visibility(principal).await? {
      Visibility::All => None,
      Visibility::Structures(set) => Some(set.into_iter().collect()),
    };
    let filter = AnalysisFilter {
      kind,
      structures,
      year: context.year.clone(),
      category_id: context.category_id.clone(),
      indicator_id: context.indicator_id.clone(),
      months: context
        .month_names()
        .map(|names| names.into_iter().map(str::to_owned).collect()),
    };
    let rows = self.store.analysis_rows(&filter).await.map_err(Into::into)?;

    let mut category_of: HashMap<String, String> = HashMap::new();
    for r in &rows {
      category_of
        .insert(r.row.indicator_id.clone(), r.category_id.clone());
    }
    let declarations: Vec<DeclarationRow> =
      rows.into_iter().map(|r| r.row).collect();

    Ok(
      metrics::aggregate_by_indicator(&declarations)
        .into_iter()
        .map(|aggregate| AggregatedRow {
          category_id: category_of
            .get(&aggregate.indicator_id)
            .cloned()
            .unwrap_or_default(),
          aggregate,
        })
        .collect(),
    )
  }

  /// Assemble an export for the analysis under `context` and render it with
  /// `generator`.
  pub async fn export(
    &self,
    principal: &Principal,
    kind: ReportKind,
    context: &FilterContext,
    generator: &dyn ReportGenerator,
    format: ReportFormat,
  ) -> Result<Vec<u8>> {
    let aggregated = self.analysis(principal, kind, context).await?;
    let names = self.name_index(kind).await?;
    let rows: Vec<FlatExportRow> = assemble(&aggregated, &names);
    let category_label = context
      .category_id
      .as_deref()
      .and_then(|id| names.categories.get(id).map(String::as_str));
    generator.generate(&rows, &context.summary(category_label), format)
  }

  async fn name_index(&self, kind: ReportKind) -> Result<NameIndex> {
    let categories = self
      .store
      .list_categories()
      .await
      .map_err(Into::into)?
      .into_iter()
      .map(|c| (c.category_id, c.label))
      .collect();
    let indicators = self
      .store
      .indicator_labels(kind)
      .await
      .map_err(Into::into)?
      .into_iter()
      .collect();
    let structures = self
      .store
      .list_structures(None)
      .await
      .map_err(Into::into)?
      .into_iter()
      .map(|s| (s.code().to_owned(), s.display_name().to_owned()))
      .collect();
    Ok(NameIndex { indicators, categories, structures })
  }

  // ── Notification feed queries ─────────────────────────────────────────

  /// Submitted situations awaiting this principal's validation.
  pub async fn pending_validation(
    &self,
    principal: &Principal,
  ) -> Result<Vec<Situation>> {
    match principal.role {
      Role::Dri => {
        let children = self.home_children(principal).await?;
        if children.is_empty() {
          return Ok(Vec::new());
        }
        let query = SituationQuery {
          structures: Some(children),
          status: Some(Status::Submitted),
          kind: Some(ReportKind::Operational),
          ..Default::default()
        };
        self.store.list_situations(&query).await.map_err(Into::into)
      }
      _ if principal.is_unrestricted() => {
        let query = SituationQuery {
          status: Some(Status::Submitted),
          ..Default::default()
        };
        let situations =
          self.store.list_situations(&query).await.map_err(Into::into)?;
        Ok(
          situations
            .into_iter()
            .filter(|s| !s.kind.validated_by_dri())
            .collect(),
        )
      }
      _ => Ok(Vec::new()),
    }
  }

  /// Rejected situations the caller owns — their attention queue.
  pub async fn my_rejected(
    &self,
    principal: &Principal,
  ) -> Result<Vec<Situation>> {
    let query = SituationQuery {
      owner: Some(principal.user_id),
      status: Some(Status::Rejected),
      ..Default::default()
    };
    self.store.list_situations(&query).await.map_err(Into::into)
  }

  /// Situations the caller owns that were validated after `since`.
  pub async fn my_recently_validated(
    &self,
    principal: &Principal,
    since: DateTime<Utc>,
  ) -> Result<Vec<Situation>> {
    let query = SituationQuery {
      owner: Some(principal.user_id),
      status: Some(Status::Validated),
      ..Default::default()
    };
    let situations =
      self.store.list_situations(&query).await.map_err(Into::into)?;
    Ok(
      situations
        .into_iter()
        .filter(|s| {
          s.dri_validated_at.is_some_and(|t| t > since)
            || s.admin_validated_at.is_some_and(|t| t > since)
        })
        .collect(),
    )
  }

  /// Periods between `from` and `until` (inclusive) with no situation filed
  /// for the caller's home structure.
  pub async fn missing_periods(
    &self,
    principal: &Principal,
    from: Period,
    until: Period,
  ) -> Result<Vec<Period>> {
    let code = principal
      .home
      .code()
      .ok_or_else(|| Error::Forbidden("no home structure".into()))?
      .to_owned();
    let filed = self.store.filed_periods(code).await.map_err(Into::into)?;
    let filed_keys: BTreeSet<(String, String)> = filed
      .into_iter()
      .map(|p| (p.month.to_lowercase(), p.year))
      .collect();

    let mut missing = Vec::new();
    let mut cursor = Some(from);
    while let Some(period) = cursor {
      if period.sort_key() > until.sort_key() {
        break;
      }
      if !filed_keys.contains(&(period.month.to_lowercase(), period.year.clone()))
      {
        missing.push(period.clone());
      }
      cursor = period.next();
    }
    Ok(missing)
  }
}
