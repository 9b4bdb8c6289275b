//! Role-scoped visibility across the organizational hierarchy.
//!
//! Structure-level visibility gates every read. Mutations additionally
//! require ownership; validation/rejection requires scope membership but
//! never ownership (the validator is never the owner).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  principal::{Principal, Role},
  situation::Situation,
  structure::HomeAssignment,
};

/// The set of structure codes a principal may see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
  /// Admins and super-admins: every structure.
  All,
  Structures(BTreeSet<String>),
}

impl Visibility {
  pub fn permits(&self, code: &str) -> bool {
    match self {
      Self::All => true,
      Self::Structures(set) => set.contains(code),
    }
  }

  /// The explicit code set, or `None` when unrestricted.
  pub fn codes(&self) -> Option<&BTreeSet<String>> {
    match self {
      Self::All => None,
      Self::Structures(set) => Some(set),
    }
  }
}

fn one(code: &str) -> Visibility {
  Visibility::Structures(BTreeSet::from([code.to_owned()]))
}

fn with_children(code: &str, children: &[String]) -> Visibility {
  let mut set: BTreeSet<String> = children.iter().cloned().collect();
  set.insert(code.to_owned());
  Visibility::Structures(set)
}

/// Compute the visible structure set for a principal.
///
/// `dri_children` must hold the child DIW codes when the principal's home is
/// a DRI (including a Director whose home resolves to a DRI); it is ignored
/// otherwise. Directors take the scope of whatever kind their home resolves
/// to, which the caller has already established by building the
/// [`HomeAssignment`].
pub fn visible_structures(
  principal:    &Principal,
  dri_children: &[String],
) -> Visibility {
  if principal.is_unrestricted() {
    return Visibility::All;
  }
  match &principal.home {
    HomeAssignment::Diw(code) | HomeAssignment::Dc(code) => one(code),
    HomeAssignment::Dri(code) => with_children(code, dri_children),
    // A restricted principal without a resolvable home sees nothing.
    HomeAssignment::Global => Visibility::Structures(BTreeSet::new()),
  }
}

/// DC structures host co-located Director/Admin accounts under the same
/// code, so a DC agent's scope narrows further to situations owned by DC
/// users at that code. Returns the owner-id whitelist to apply, or `None`
/// when no narrowing applies.
pub fn owner_narrowing(principal: &Principal) -> Option<(Role, &str)> {
  match (&principal.role, &principal.home) {
    (Role::Dc, HomeAssignment::Dc(code))
    | (Role::Director, HomeAssignment::Dc(code)) => {
      Some((Role::Dc, code.as_str()))
    }
    _ => None,
  }
}

/// Structure-level visibility is necessary but not sufficient for mutation:
/// `save_draft`, `confirm`, and `delete` always require ownership.
pub fn can_mutate(principal: &Principal, situation: &Situation) -> bool {
  situation.owner_user_id == principal.user_id
}

/// Whether the principal is the validating authority for a situation.
/// Operational reports are validated by the parent DRI agent; strategic and
/// DRI-self reports by an admin. `dri_children` is the validator's child DIW
/// set, as in [`visible_structures`].
pub fn can_validate(
  principal:    &Principal,
  situation:    &Situation,
  dri_children: &[String],
) -> bool {
  if situation.kind.validated_by_dri() {
    principal.role == Role::Dri
      && matches!(&principal.home, HomeAssignment::Dri(_))
      && dri_children.contains(&situation.structure_code)
  } else {
    principal.is_unrestricted()
  }
}

/// Apply visibility and owner narrowing to an already-loaded situation list.
pub fn filter_situations<'a>(
  situations: &'a [Situation],
  visibility: &Visibility,
  owner_whitelist: Option<&BTreeSet<Uuid>>,
) -> Vec<&'a Situation> {
  situations
    .iter()
    .filter(|s| visibility.permits(&s.structure_code))
    .filter(|s| owner_whitelist.is_none_or(|ids| ids.contains(&s.owner_user_id)))
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::{
    period::Period,
    situation::{ReportKind, Status},
  };

  fn principal(role: Role, home: HomeAssignment) -> Principal {
    Principal { user_id: Uuid::new_v4(), role, home, is_super_admin: false }
  }

  fn situation(structure: &str, kind: ReportKind, owner: Uuid) -> Situation {
    Situation {
      situation_id:       Uuid::new_v4(),
      structure_code:     structure.into(),
      period:             Period::new("mars", "2025"),
      kind,
      status:             Status::Submitted,
      owner_user_id:      owner,
      created_at:         Utc::now(),
      edited_at:          None,
      confirmed_at:       None,
      dri_validated_at:   None,
      admin_validated_at: None,
    }
  }

  #[test]
  fn diw_sees_only_itself() {
    let p = principal(Role::Diw, HomeAssignment::Diw("D1".into()));
    let v = visible_structures(&p, &[]);
    assert!(v.permits("D1"));
    assert!(!v.permits("D2"));
    assert!(!v.permits("R1"));
  }

  #[test]
  fn dri_sees_itself_and_children_but_not_siblings() {
    let p = principal(Role::Dri, HomeAssignment::Dri("R1".into()));
    let v = visible_structures(&p, &["D1".into(), "D2".into()]);
    for code in ["R1", "D1", "D2"] {
      assert!(v.permits(code), "expected {code} visible");
    }
    // A sibling DRI and its children never appear.
    assert!(!v.permits("R2"));
    assert!(!v.permits("D9"));
  }

  #[test]
  fn dc_is_a_leaf() {
    let p = principal(Role::Dc, HomeAssignment::Dc("C1".into()));
    let v = visible_structures(&p, &[]);
    assert_eq!(v.codes().unwrap().len(), 1);
    assert!(v.permits("C1"));
  }

  #[test]
  fn director_takes_the_scope_of_its_resolved_home() {
    let as_dri = principal(Role::Director, HomeAssignment::Dri("R1".into()));
    let v = visible_structures(&as_dri, &["D1".into()]);
    assert!(v.permits("R1") && v.permits("D1"));

    let as_dc = principal(Role::Director, HomeAssignment::Dc("C1".into()));
    assert_eq!(visible_structures(&as_dc, &[]), Visibility::Structures(BTreeSet::from(["C1".to_owned()])));
  }

  #[test]
  fn admin_is_unrestricted() {
    let p = principal(Role::Admin, HomeAssignment::Global);
    assert_eq!(visible_structures(&p, &[]), Visibility::All);

    let mut sup = principal(Role::Diw, HomeAssignment::Diw("D1".into()));
    sup.is_super_admin = true;
    assert_eq!(visible_structures(&sup, &[]), Visibility::All);
  }

  #[test]
  fn dc_agents_narrow_to_dc_owned_situations() {
    let p = principal(Role::Dc, HomeAssignment::Dc("C1".into()));
    assert_eq!(owner_narrowing(&p), Some((Role::Dc, "C1")));

    let diw = principal(Role::Diw, HomeAssignment::Diw("D1".into()));
    assert_eq!(owner_narrowing(&diw), None);
  }

  #[test]
  fn mutation_requires_ownership_even_inside_scope() {
    let p = principal(Role::Diw, HomeAssignment::Diw("D1".into()));
    let owned = situation("D1", ReportKind::Operational, p.user_id);
    let colleague = situation("D1", ReportKind::Operational, Uuid::new_v4());
    assert!(can_mutate(&p, &owned));
    assert!(!can_mutate(&p, &colleague));
  }

  #[test]
  fn operational_validation_is_the_parent_dris() {
    let dri = principal(Role::Dri, HomeAssignment::Dri("R1".into()));
    let children = vec!["D1".to_owned(), "D2".to_owned()];
    let child = situation("D1", ReportKind::Operational, Uuid::new_v4());
    let foreign = situation("D9", ReportKind::Operational, Uuid::new_v4());
    assert!(can_validate(&dri, &child, &children));
    assert!(!can_validate(&dri, &foreign, &children));

    // An admin does not validate operational reports...
    let admin = principal(Role::Admin, HomeAssignment::Global);
    assert!(!can_validate(&admin, &child, &[]));

    // ...but does validate DRI-self and strategic ones.
    let self_report = situation("R1", ReportKind::DriSelf, Uuid::new_v4());
    let strategic = situation("C1", ReportKind::Strategic, Uuid::new_v4());
    assert!(can_validate(&admin, &self_report, &[]));
    assert!(can_validate(&admin, &strategic, &[]));
    assert!(!can_validate(&dri, &self_report, &children));
  }

  #[test]
  fn filtering_applies_owner_whitelist() {
    let dc_owner = Uuid::new_v4();
    let sits = vec![
      situation("C1", ReportKind::Strategic, dc_owner),
      situation("C1", ReportKind::Strategic, Uuid::new_v4()),
      situation("C2", ReportKind::Strategic, dc_owner),
    ];
    let vis = Visibility::Structures(BTreeSet::from(["C1".to_owned()]));
    let whitelist = BTreeSet::from([dc_owner]);
    let filtered = filter_situations(&sits, &vis, Some(&whitelist));
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].structure_code, "C1");
    assert_eq!(filtered[0].owner_user_id, dc_owner);
  }
}
