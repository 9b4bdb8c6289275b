//! Integration tests for `SqliteStore` driven through the `Reporting`
//! engine against an in-memory database.

use sitrep_core::{
  Error as CoreError,
  catalog::{Category, DriIndicator},
  declaration::DeclarationInput,
  engine::Reporting,
  period::Period,
  principal::{Principal, Role},
  situation::{ReportKind, Status},
  store::{SituationQuery, SituationStore as _},
  structure::{HomeAssignment, Structure},
  user::NewUser,
};
use uuid::Uuid;

use crate::SqliteStore;

// ─── Fixture ─────────────────────────────────────────────────────────────────

struct Fixture {
  eng:    Reporting<SqliteStore>,
  /// DIW agent at D1 (child of R1).
  diw1:   Principal,
  /// A colleague of `diw1`, same structure.
  diw1b:  Principal,
  /// DIW agent at D9 (child of R2).
  diw9:   Principal,
  /// DRI agent at R1.
  dri1:   Principal,
  /// DRI agent at R2, sibling of R1.
  dri2:   Principal,
  /// DC agent at C1.
  dc:     Principal,
  admin:  Principal,
}

async fn user(
  store: &SqliteStore,
  name: &str,
  role: Role,
  code: Option<&str>,
) -> Principal {
  let mut input = NewUser::new(name, role);
  if let Some(code) = code {
    input = input.at_structure(code);
  }
  let user = store.create_user(input).await.unwrap();
  let home = match (role, code) {
    (Role::Diw, Some(c)) => HomeAssignment::Diw(c.to_owned()),
    (Role::Dri, Some(c)) => HomeAssignment::Dri(c.to_owned()),
    (Role::Dc, Some(c)) => HomeAssignment::Dc(c.to_owned()),
    _ => HomeAssignment::Global,
  };
  Principal {
    user_id: user.user_id,
    role,
    home,
    is_super_admin: false,
  }
}

async fn fixture() -> Fixture {
  let store = SqliteStore::open_in_memory().await.unwrap();

  for structure in [
    Structure::Dri { code: "R1".into(), label: Some("Région Ouest".into()) },
    Structure::Dri { code: "R2".into(), label: Some("Région Est".into()) },
    Structure::Diw {
      code:       "D1".into(),
      label:      Some("Wilaya 1".into()),
      parent_dri: "R1".into(),
    },
    Structure::Diw {
      code:       "D2".into(),
      label:      Some("Wilaya 2".into()),
      parent_dri: "R1".into(),
    },
    Structure::Diw {
      code:       "D9".into(),
      label:      Some("Wilaya 9".into()),
      parent_dri: "R2".into(),
    },
    Structure::Dc {
      code:        "C1".into(),
      label:       Some("Direction Centrale".into()),
      description: None,
    },
  ] {
    store.create_structure(structure).await.unwrap();
  }

  // Operational catalog: category A with two indicators, one targeted.
  store
    .create_category(Category { category_id: "A".into(), label: "Qualité".into() })
    .await
    .unwrap();
  let a1 = store
    .create_indicator("A".into(), "Taux de traitement".into())
    .await
    .unwrap();
  assert_eq!(a1.indicator_id, "A.1");
  let a2 = store
    .create_indicator("A".into(), "Taux de couverture".into())
    .await
    .unwrap();
  assert_eq!(a2.indicator_id, "A.2");

  store
    .set_operational_target("A.1".into(), "D1".into(), "2025".into(), 50.0)
    .await
    .unwrap();
  store
    .set_operational_target("A.1".into(), "D2".into(), "2025".into(), 50.0)
    .await
    .unwrap();

  // DRI self-report catalog.
  for (id, label) in [(5, "Disponibilité"), (6, "Conformité"), (7, "Délais")] {
    store
      .upsert_dri_indicator(DriIndicator { indicator_id: id, label: label.into() })
      .await
      .unwrap();
  }
  store
    .set_dri_target(5, "R1".into(), "2025".into(), 80.0)
    .await
    .unwrap();

  let diw1 = user(&store, "a.meriem", Role::Diw, Some("D1")).await;
  let diw1b = user(&store, "c.aymen", Role::Diw, Some("D1")).await;
  let diw9 = user(&store, "f.karim", Role::Diw, Some("D9")).await;
  let dri1 = user(&store, "r.fafi", Role::Dri, Some("R1")).await;
  let dri2 = user(&store, "b.samir", Role::Dri, Some("R2")).await;
  let dc = user(&store, "l.nadia", Role::Dc, Some("C1")).await;
  let admin = user(&store, "admin", Role::Admin, None).await;

  Fixture {
    eng: Reporting::new(store),
    diw1,
    diw1b,
    diw9,
    dri1,
    dri2,
    dc,
    admin,
  }
}

fn reading(id: &str, num: f64, den: f64) -> DeclarationInput {
  DeclarationInput { indicator_id: id.into(), numerator: num, denominator: den }
}

// ─── Creation ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_starts_in_draft_at_home_structure() {
  let f = fixture().await;
  let s = f
    .eng
    .create_situation(&f.diw1, Period::new("Mars", "2025"))
    .await
    .unwrap();
  assert_eq!(s.status, Status::Draft);
  assert_eq!(s.structure_code, "D1");
  assert_eq!(s.kind, ReportKind::Operational);
  assert_eq!(s.owner_user_id, f.diw1.user_id);
}

#[tokio::test]
async fn duplicate_period_is_rejected_case_insensitively() {
  let f = fixture().await;
  f.eng
    .create_situation(&f.diw1, Period::new("Janvier", "2025"))
    .await
    .unwrap();

  // Same period, same structure — even from a colleague, even with
  // different month casing.
  let err = f
    .eng
    .create_situation(&f.diw1b, Period::new("janvier", "2025"))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::DuplicatePeriod { .. }), "got {err:?}");

  // A different month or a different structure is fine.
  f.eng
    .create_situation(&f.diw1b, Period::new("Février", "2025"))
    .await
    .unwrap();
  f.eng
    .create_situation(&f.diw9, Period::new("Janvier", "2025"))
    .await
    .unwrap();
}

#[tokio::test]
async fn reviewing_roles_cannot_create() {
  let f = fixture().await;
  let err = f
    .eng
    .create_situation(&f.admin, Period::new("Mars", "2025"))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Forbidden(_)));
}

// ─── Draft editing ───────────────────────────────────────────────────────────

#[tokio::test]
async fn save_draft_computes_rates_against_catalog_targets() {
  let f = fixture().await;
  let s = f
    .eng
    .create_situation(&f.diw1, Period::new("Mars", "2025"))
    .await
    .unwrap();

  f.eng
    .save_draft(&f.diw1, s.situation_id, vec![reading("A.1", 50.0, 100.0)])
    .await
    .unwrap();

  let draft = f
    .eng
    .store()
    .draft_declarations(s.situation_id)
    .await
    .unwrap();
  assert_eq!(draft.len(), 1);
  assert_eq!(draft[0].rate, 50.0);
  assert_eq!(draft[0].target, 50.0);
  assert_eq!(draft[0].gap, 0.0);

  // Still a draft, but the edit is stamped.
  let reloaded = f
    .eng
    .store()
    .get_situation(s.situation_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(reloaded.status, Status::Draft);
  assert!(reloaded.edited_at.is_some());
}

#[tokio::test]
async fn save_draft_replaces_rather_than_appends() {
  let f = fixture().await;
  let s = f
    .eng
    .create_situation(&f.diw1, Period::new("Mars", "2025"))
    .await
    .unwrap();

  f.eng
    .save_draft(
      &f.diw1,
      s.situation_id,
      vec![reading("A.1", 1.0, 2.0), reading("A.2", 3.0, 4.0)],
    )
    .await
    .unwrap();
  f.eng
    .save_draft(&f.diw1, s.situation_id, vec![reading("A.1", 9.0, 10.0)])
    .await
    .unwrap();

  let draft = f
    .eng
    .store()
    .draft_declarations(s.situation_id)
    .await
    .unwrap();
  assert_eq!(draft.len(), 1);
  assert_eq!(draft[0].numerator, 9.0);
}

#[tokio::test]
async fn missing_target_defaults_to_zero() {
  let f = fixture().await;
  let s = f
    .eng
    .create_situation(&f.diw1, Period::new("Mars", "2025"))
    .await
    .unwrap();

  // A.2 has no target row for (D1, 2025).
  f.eng
    .save_draft(&f.diw1, s.situation_id, vec![reading("A.2", 30.0, 100.0)])
    .await
    .unwrap();
  let draft = f
    .eng
    .store()
    .draft_declarations(s.situation_id)
    .await
    .unwrap();
  assert_eq!(draft[0].target, 0.0);
  assert_eq!(draft[0].gap, 30.0);
}

// ─── Ownership gate ──────────────────────────────────────────────────────────

#[tokio::test]
async fn mutations_require_ownership_even_within_scope() {
  let f = fixture().await;
  let s = f
    .eng
    .create_situation(&f.diw1, Period::new("Mars", "2025"))
    .await
    .unwrap();

  // diw1b shares the structure, so the situation is in scope — but every
  // mutation still requires ownership.
  let err = f
    .eng
    .save_draft(&f.diw1b, s.situation_id, vec![reading("A.1", 1.0, 2.0)])
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Forbidden(_)));

  let err = f
    .eng
    .confirm(&f.diw1b, s.situation_id, vec![reading("A.1", 1.0, 2.0)])
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Forbidden(_)));

  let err = f.eng.delete(&f.diw1b, s.situation_id).await.unwrap_err();
  assert!(matches!(err, CoreError::Forbidden(_)));
}

// ─── Confirm / validate ──────────────────────────────────────────────────────

#[tokio::test]
async fn lifecycle_draft_submit_validate_end_to_end() {
  let f = fixture().await;
  let s = f
    .eng
    .create_situation(&f.diw1, Period::new("Mars", "2025"))
    .await
    .unwrap();

  f.eng
    .save_draft(&f.diw1, s.situation_id, vec![reading("A.1", 50.0, 100.0)])
    .await
    .unwrap();

  let submitted = f
    .eng
    .confirm(&f.diw1, s.situation_id, vec![reading("A.1", 50.0, 100.0)])
    .await
    .unwrap();
  assert_eq!(submitted.status, Status::Submitted);
  assert!(submitted.confirmed_at.is_some());

  // Live rows match the draft values; the draft shadow is empty.
  let live = f
    .eng
    .store()
    .live_declarations(s.situation_id)
    .await
    .unwrap();
  assert_eq!(live.len(), 1);
  assert_eq!(live[0].rate, 50.0);
  assert_eq!(live[0].gap, 0.0);
  assert!(
    f.eng
      .store()
      .draft_declarations(s.situation_id)
      .await
      .unwrap()
      .is_empty()
  );

  // The parent DRI validates; the DRI timestamp is set.
  let validated = f.eng.validate(&f.dri1, s.situation_id).await.unwrap();
  assert_eq!(validated.status, Status::Validated);
  assert!(validated.dri_validated_at.is_some());
  assert!(validated.admin_validated_at.is_none());

  // Validated is terminal: rejection and re-confirmation both fail.
  let err = f
    .eng
    .reject(&f.dri1, s.situation_id, "trop tard".into())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    CoreError::InvalidTransition { from: Status::Validated, action: "reject" }
  ));
  let err = f
    .eng
    .confirm(&f.diw1, s.situation_id, vec![reading("A.1", 1.0, 2.0)])
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    CoreError::InvalidTransition { from: Status::Validated, action: "confirm" }
  ));
}

#[tokio::test]
async fn validate_requires_submitted() {
  let f = fixture().await;
  let s = f
    .eng
    .create_situation(&f.diw1, Period::new("Mars", "2025"))
    .await
    .unwrap();
  let err = f.eng.validate(&f.dri1, s.situation_id).await.unwrap_err();
  assert!(matches!(
    err,
    CoreError::InvalidTransition { from: Status::Draft, action: "validate" }
  ));
}

#[tokio::test]
async fn only_the_parent_dri_validates_operational_reports() {
  let f = fixture().await;
  let s = f
    .eng
    .create_situation(&f.diw1, Period::new("Mars", "2025"))
    .await
    .unwrap();
  f.eng
    .confirm(&f.diw1, s.situation_id, vec![reading("A.1", 50.0, 100.0)])
    .await
    .unwrap();

  // A sibling DRI is out of scope.
  let err = f.eng.validate(&f.dri2, s.situation_id).await.unwrap_err();
  assert!(matches!(err, CoreError::Forbidden(_)));

  // Admins validate DRI-self and DC reports, not DIW ones.
  let err = f.eng.validate(&f.admin, s.situation_id).await.unwrap_err();
  assert!(matches!(err, CoreError::Forbidden(_)));

  f.eng.validate(&f.dri1, s.situation_id).await.unwrap();
}

// ─── Reject ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn reject_round_trips_declarations_to_draft() {
  let f = fixture().await;
  let s = f
    .eng
    .create_situation(&f.diw1, Period::new("Mars", "2025"))
    .await
    .unwrap();
  f.eng
    .confirm(
      &f.diw1,
      s.situation_id,
      vec![reading("A.1", 42.0, 84.0), reading("A.2", 7.0, 0.0)],
    )
    .await
    .unwrap();
  let live_before = f
    .eng
    .store()
    .live_declarations(s.situation_id)
    .await
    .unwrap();

  let rejected = f
    .eng
    .reject(&f.dri1, s.situation_id, "motif manquant".into())
    .await
    .unwrap();
  assert_eq!(rejected.status, Status::Rejected);

  // Draft rows are numerically identical to the previously live ones, and
  // the live table is empty.
  let draft = f
    .eng
    .store()
    .draft_declarations(s.situation_id)
    .await
    .unwrap();
  assert_eq!(draft, live_before);
  assert!(
    f.eng
      .store()
      .live_declarations(s.situation_id)
      .await
      .unwrap()
      .is_empty()
  );

  // The rejection is logged.
  let history = f
    .eng
    .store()
    .rejection_history(s.situation_id)
    .await
    .unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].comment, "motif manquant");
  assert_eq!(history[0].rejected_by, f.dri1.user_id);

  // The owner can rework and resubmit.
  let resubmitted = f
    .eng
    .confirm(&f.diw1, s.situation_id, vec![reading("A.1", 50.0, 100.0)])
    .await
    .unwrap();
  assert_eq!(resubmitted.status, Status::Submitted);
}

#[tokio::test]
async fn reject_with_blank_comment_changes_nothing() {
  let f = fixture().await;
  let s = f
    .eng
    .create_situation(&f.diw1, Period::new("Mars", "2025"))
    .await
    .unwrap();
  f.eng
    .confirm(&f.diw1, s.situation_id, vec![reading("A.1", 42.0, 84.0)])
    .await
    .unwrap();

  let err = f
    .eng
    .reject(&f.dri1, s.situation_id, "   ".into())
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::EmptyRejectionComment));

  // No state was touched: still submitted, live intact, draft empty,
  // nothing logged.
  let reloaded = f
    .eng
    .store()
    .get_situation(s.situation_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(reloaded.status, Status::Submitted);
  assert_eq!(
    f.eng
      .store()
      .live_declarations(s.situation_id)
      .await
      .unwrap()
      .len(),
    1
  );
  assert!(
    f.eng
      .store()
      .draft_declarations(s.situation_id)
      .await
      .unwrap()
      .is_empty()
  );
  assert!(
    f.eng
      .store()
      .rejection_history(s.situation_id)
      .await
      .unwrap()
      .is_empty()
  );
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_is_owner_only_and_draft_or_rejected_only() {
  let f = fixture().await;
  let s = f
    .eng
    .create_situation(&f.diw1, Period::new("Mars", "2025"))
    .await
    .unwrap();
  f.eng
    .confirm(&f.diw1, s.situation_id, vec![reading("A.1", 1.0, 2.0)])
    .await
    .unwrap();

  // Submitted situations cannot be deleted, even by the owner.
  let err = f.eng.delete(&f.diw1, s.situation_id).await.unwrap_err();
  assert!(matches!(
    err,
    CoreError::InvalidTransition { from: Status::Submitted, action: "delete" }
  ));

  // After a rejection the owner may delete.
  f.eng
    .reject(&f.dri1, s.situation_id, "à refaire".into())
    .await
    .unwrap();
  f.eng.delete(&f.diw1, s.situation_id).await.unwrap();
  assert!(
    f.eng
      .store()
      .get_situation(s.situation_id)
      .await
      .unwrap()
      .is_none()
  );

  // The rejection log survives the deletion.
  assert_eq!(
    f.eng
      .store()
      .rejection_history(s.situation_id)
      .await
      .unwrap()
      .len(),
    1
  );
}

// ─── Scope ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn dri_scope_covers_own_children_and_nothing_else() {
  let f = fixture().await;
  f.eng
    .create_situation(&f.diw1, Period::new("Mars", "2025"))
    .await
    .unwrap();
  f.eng
    .create_situation(&f.diw9, Period::new("Mars", "2025"))
    .await
    .unwrap();
  f.eng
    .create_situation(&f.dri1, Period::new("Mars", "2025"))
    .await
    .unwrap();

  let seen = f
    .eng
    .scoped_situations(&f.dri1, SituationQuery::default())
    .await
    .unwrap();
  let codes: Vec<&str> =
    seen.iter().map(|s| s.structure_code.as_str()).collect();
  assert!(codes.contains(&"D1"));
  assert!(codes.contains(&"R1"));
  assert!(!codes.contains(&"D9"), "sibling DRI's DIW leaked into scope");

  // The sibling sees its own child only.
  let seen = f
    .eng
    .scoped_situations(&f.dri2, SituationQuery::default())
    .await
    .unwrap();
  assert!(seen.iter().all(|s| s.structure_code == "D9"));

  // Admin sees everything.
  let seen = f
    .eng
    .scoped_situations(&f.admin, SituationQuery::default())
    .await
    .unwrap();
  assert_eq!(seen.len(), 3);

  // A caller-supplied filter cannot widen the scope.
  let seen = f
    .eng
    .scoped_situations(
      &f.diw1,
      SituationQuery { structures: Some(vec!["D9".into()]), ..Default::default() },
    )
    .await
    .unwrap();
  assert!(seen.is_empty());
}

// ─── Strategic and DRI-self families ─────────────────────────────────────────

#[tokio::test]
async fn dc_reports_strategically_and_admin_validates() {
  let f = fixture().await;
  let store = f.eng.store();

  store
    .create_category(Category { category_id: "S".into(), label: "Stratégie".into() })
    .await
    .unwrap();
  let objective = store
    .create_objective("S".into(), "Modernisation".into())
    .await
    .unwrap();
  let indicator = store
    .create_strategic_indicator(
      "S".into(),
      objective.objective_id,
      "Numérisation des dossiers".into(),
    )
    .await
    .unwrap();
  assert_eq!(indicator.indicator_id, "S.1");
  store
    .set_strategic_target(indicator.indicator_id.clone(), "2025".into(), 60.0)
    .await
    .unwrap();

  let s = f
    .eng
    .create_situation(&f.dc, Period::new("Juin", "2025"))
    .await
    .unwrap();
  assert_eq!(s.kind, ReportKind::Strategic);

  f.eng
    .confirm(&f.dc, s.situation_id, vec![reading("S.1", 45.0, 100.0)])
    .await
    .unwrap();

  // The parent-DRI rule does not apply; only an admin validates.
  let err = f.eng.validate(&f.dri1, s.situation_id).await.unwrap_err();
  assert!(matches!(err, CoreError::Forbidden(_)));

  let validated = f.eng.validate(&f.admin, s.situation_id).await.unwrap();
  assert!(validated.admin_validated_at.is_some());
  assert!(validated.dri_validated_at.is_none());

  let live = store.live_declarations(s.situation_id).await.unwrap();
  assert_eq!(live[0].target, 60.0);
  assert_eq!(live[0].gap, -15.0);
}

#[tokio::test]
async fn dri_self_report_uses_fixed_indicator_set() {
  let f = fixture().await;
  let s = f
    .eng
    .create_situation(&f.dri1, Period::new("Mai", "2025"))
    .await
    .unwrap();
  assert_eq!(s.kind, ReportKind::DriSelf);
  assert_eq!(s.structure_code, "R1");

  f.eng
    .confirm(&f.dri1, s.situation_id, vec![reading("5", 90.0, 100.0)])
    .await
    .unwrap();

  let live = f.eng.store().live_declarations(s.situation_id).await.unwrap();
  assert_eq!(live[0].target, 80.0);
  assert_eq!(live[0].rate, 90.0);
  assert_eq!(live[0].gap, 10.0);

  // A DRI never validates its own report; an admin does.
  let err = f.eng.validate(&f.dri1, s.situation_id).await.unwrap_err();
  assert!(matches!(err, CoreError::Forbidden(_)));
  let validated = f.eng.validate(&f.admin, s.situation_id).await.unwrap();
  assert!(validated.admin_validated_at.is_some());
}

// ─── Aggregation paths ───────────────────────────────────────────────────────

#[tokio::test]
async fn analysis_aggregates_weighted_across_structures() {
  let f = fixture().await;
  let diw2 = {
    let store = f.eng.store();
    let u = store
      .create_user(NewUser::new("d2.agent", Role::Diw).at_structure("D2"))
      .await
      .unwrap();
    Principal {
      user_id:        u.user_id,
      role:           Role::Diw,
      home:           HomeAssignment::Diw("D2".into()),
      is_super_admin: false,
    }
  };

  // D1 reports 10/10, D2 reports 0/100 on the same indicator.
  let s1 = f
    .eng
    .create_situation(&f.diw1, Period::new("Mars", "2025"))
    .await
    .unwrap();
  f.eng
    .confirm(&f.diw1, s1.situation_id, vec![reading("A.1", 10.0, 10.0)])
    .await
    .unwrap();
  let s2 = f
    .eng
    .create_situation(&diw2, Period::new("Mars", "2025"))
    .await
    .unwrap();
  f.eng
    .confirm(&diw2, s2.situation_id, vec![reading("A.1", 0.0, 100.0)])
    .await
    .unwrap();

  let results = f
    .eng
    .analysis(
      &f.dri1,
      ReportKind::Operational,
      &sitrep_core::report::FilterContext {
        year: Some("2025".into()),
        ..Default::default()
      },
    )
    .await
    .unwrap();

  assert_eq!(results.len(), 1);
  let agg = &results[0].aggregate;
  // Weighted: 10/110 = 9.09%, not the 50% a mean of rates would give.
  assert_eq!(agg.rate, 9.09);
  assert_eq!(agg.numerator, 10.0);
  assert_eq!(agg.denominator, 110.0);
}

#[tokio::test]
async fn dashboard_snapshots_latest_validated_period_only() {
  let f = fixture().await;

  // March validated at 30%, October validated at 80%: the dashboard must
  // show October, not a blend.
  for (month, num) in [("Mars", 30.0), ("Octobre", 80.0)] {
    let s = f
      .eng
      .create_situation(&f.diw1, Period::new(month, "2025"))
      .await
      .unwrap();
    f.eng
      .confirm(&f.diw1, s.situation_id, vec![reading("A.1", num, 100.0)])
      .await
      .unwrap();
    f.eng.validate(&f.dri1, s.situation_id).await.unwrap();
  }
  // A newer month still submitted must not displace the snapshot.
  let pending = f
    .eng
    .create_situation(&f.diw1, Period::new("Novembre", "2025"))
    .await
    .unwrap();
  f.eng
    .confirm(&f.diw1, pending.situation_id, vec![reading("A.1", 1.0, 100.0)])
    .await
    .unwrap();

  let dash = f
    .eng
    .dashboard(&f.diw1, ReportKind::Operational)
    .await
    .unwrap();
  assert_eq!(dash.scope.validated, 2);
  assert_eq!(dash.scope.pending, 1);
  assert_eq!(dash.years.len(), 1);

  let year = &dash.years[0];
  assert_eq!(year.year, "2025");
  assert_eq!(year.categories.len(), 1);
  let indicator = &year.categories[0].indicators[0];
  assert_eq!(indicator.label, "Taux de traitement");
  assert_eq!(indicator.aggregate.rate, 80.0);
}

#[tokio::test]
async fn diw_comparison_counts_against_expected_periods() {
  let f = fixture().await;
  // D1 files two months of 2025; D2 files nothing.
  for month in ["Janvier", "Février"] {
    let s = f
      .eng
      .create_situation(&f.diw1, Period::new(month, "2025"))
      .await
      .unwrap();
    f.eng
      .confirm(&f.diw1, s.situation_id, vec![reading("A.1", 1.0, 2.0)])
      .await
      .unwrap();
  }

  // As of May 2025, four periods are expected.
  let rows = f.eng.diw_comparison(&f.dri1, 5, "2025").await.unwrap();
  assert_eq!(rows.len(), 2);
  let d1 = rows.iter().find(|r| r.code == "D1").unwrap();
  assert_eq!(d1.expected, 4);
  assert_eq!(d1.counts.total, 2);
  assert_eq!(d1.missing, 2);
  assert_eq!(d1.completion, 50.0);
  let d2 = rows.iter().find(|r| r.code == "D2").unwrap();
  assert_eq!(d2.counts.total, 0);
  assert_eq!(d2.missing, 4);
}

// ─── Notification feed queries ───────────────────────────────────────────────

#[tokio::test]
async fn pending_validation_feeds_the_right_reviewer() {
  let f = fixture().await;

  let op = f
    .eng
    .create_situation(&f.diw1, Period::new("Mars", "2025"))
    .await
    .unwrap();
  f.eng
    .confirm(&f.diw1, op.situation_id, vec![reading("A.1", 1.0, 2.0)])
    .await
    .unwrap();
  let own = f
    .eng
    .create_situation(&f.dri1, Period::new("Mars", "2025"))
    .await
    .unwrap();
  f.eng
    .confirm(&f.dri1, own.situation_id, vec![reading("5", 1.0, 2.0)])
    .await
    .unwrap();

  // The DRI sees its child's operational report, not its own self-report.
  let pending = f.eng.pending_validation(&f.dri1).await.unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].situation_id, op.situation_id);

  // The admin sees the DRI self-report, not the operational one.
  let pending = f.eng.pending_validation(&f.admin).await.unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].situation_id, own.situation_id);

  // Submitters see nothing.
  assert!(f.eng.pending_validation(&f.diw1).await.unwrap().is_empty());
}

#[tokio::test]
async fn rejected_situations_land_in_the_owners_queue() {
  let f = fixture().await;
  let s = f
    .eng
    .create_situation(&f.diw1, Period::new("Mars", "2025"))
    .await
    .unwrap();
  f.eng
    .confirm(&f.diw1, s.situation_id, vec![reading("A.1", 1.0, 2.0)])
    .await
    .unwrap();
  f.eng
    .reject(&f.dri1, s.situation_id, "incomplet".into())
    .await
    .unwrap();

  let mine = f.eng.my_rejected(&f.diw1).await.unwrap();
  assert_eq!(mine.len(), 1);
  assert!(f.eng.my_rejected(&f.diw1b).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_periods_walks_the_gap() {
  let f = fixture().await;
  for month in ["Janvier", "Mars"] {
    f.eng
      .create_situation(&f.diw1, Period::new(month, "2025"))
      .await
      .unwrap();
  }

  let missing = f
    .eng
    .missing_periods(
      &f.diw1,
      Period::new("janvier", "2025"),
      Period::new("avril", "2025"),
    )
    .await
    .unwrap();
  assert_eq!(
    missing,
    vec![Period::new("février", "2025"), Period::new("avril", "2025")]
  );
}

// ─── Catalog & user administration ───────────────────────────────────────────

#[tokio::test]
async fn materialize_default_targets_is_explicit_and_idempotent() {
  let f = fixture().await;
  let store = f.eng.store();

  // A.1 already has a (D1, 2025) target; A.2 does not.
  let inserted = store
    .materialize_default_targets("D1".into(), "2025".into())
    .await
    .unwrap();
  assert_eq!(inserted, 1);
  let again = store
    .materialize_default_targets("D1".into(), "2025".into())
    .await
    .unwrap();
  assert_eq!(again, 0);

  let catalog = store
    .operational_catalog("D1".into(), "2025".into())
    .await
    .unwrap();
  assert!(catalog.iter().all(|e| e.indicator_id == "A.2" || e.target == 50.0));
}

#[tokio::test]
async fn catalog_reads_never_materialize_rows() {
  let f = fixture().await;
  let store = f.eng.store();

  let before = store
    .operational_catalog("D2".into(), "2030".into())
    .await
    .unwrap();
  assert!(before.iter().all(|e| e.target == 0.0));

  // Reading twice must not have created target rows: materialization still
  // finds every indicator missing.
  let inserted = store
    .materialize_default_targets("D2".into(), "2030".into())
    .await
    .unwrap();
  assert_eq!(inserted, before.len());
}

#[tokio::test]
async fn deleting_a_user_is_blocked_while_they_own_situations() {
  let f = fixture().await;
  let s = f
    .eng
    .create_situation(&f.diw1, Period::new("Mars", "2025"))
    .await
    .unwrap();

  let err = f.eng.store().delete_user(f.diw1.user_id).await.unwrap_err();
  assert!(matches!(
    sitrep_core::Error::from(err),
    CoreError::OwnedSituationsExist(_)
  ));

  f.eng.delete(&f.diw1, s.situation_id).await.unwrap();
  f.eng.store().delete_user(f.diw1.user_id).await.unwrap();
}

#[tokio::test]
async fn structure_resolution_prefers_dc_then_dri_then_diw() {
  let f = fixture().await;
  let store = f.eng.store();

  let dc = store.resolve_structure("C1".into()).await.unwrap().unwrap();
  assert!(matches!(dc, Structure::Dc { .. }));
  let dri = store.resolve_structure("R1".into()).await.unwrap().unwrap();
  assert!(matches!(dri, Structure::Dri { .. }));
  let diw = store.resolve_structure("D1".into()).await.unwrap().unwrap();
  assert_eq!(diw.parent_dri(), Some("R1"));
  assert!(store.resolve_structure("ZZ".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_situation_ids_surface_not_found() {
  let f = fixture().await;
  let missing = Uuid::new_v4();
  let err = f.eng.validate(&f.dri1, missing).await.unwrap_err();
  assert!(matches!(err, CoreError::SituationNotFound(id) if id == missing));
  let err = f
    .eng
    .save_draft(&f.diw1, missing, vec![reading("A.1", 1.0, 2.0)])
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::SituationNotFound(_)));
}
