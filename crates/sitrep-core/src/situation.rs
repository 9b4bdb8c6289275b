//! Situations — one period's reporting instance for a structure — and the
//! lifecycle state machine that governs them.
//!
//! ```text
//! Draft --confirm--> Submitted --validate--> Validated (terminal)
//! Draft --delete--> (removed)
//! Submitted --reject--> Rejected --confirm--> Submitted
//! Rejected --delete--> (removed)
//! ```
//!
//! Rejection moves the live declarations back into the draft shadow table,
//! so `Rejected` is re-editable exactly like `Draft`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result, period::Period, principal::Role};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle status. The discriminant is the storage encoding (historical
/// integer codes).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Status {
  Draft     = 0,
  Submitted = 1,
  Rejected  = 2,
  Validated = 3,
}

impl Status {
  pub fn code(self) -> i64 { self as i64 }

  pub fn from_code(code: i64) -> Option<Self> {
    match code {
      0 => Some(Self::Draft),
      1 => Some(Self::Submitted),
      2 => Some(Self::Rejected),
      3 => Some(Self::Validated),
      _ => None,
    }
  }

  /// Draft and Rejected situations belong to their owner for editing.
  pub fn is_editable(self) -> bool { matches!(self, Self::Draft | Self::Rejected) }

  /// Validated is terminal: no further mutation of the situation or its
  /// declarations is ever permitted.
  pub fn is_terminal(self) -> bool { matches!(self, Self::Validated) }

  /// Guard for a transition; `action` names the operation for the error.
  pub fn ensure(self, allowed: bool, action: &'static str) -> Result<()> {
    if allowed {
      Ok(())
    } else {
      Err(Error::InvalidTransition { from: self, action })
    }
  }
}

// ─── Report kind ─────────────────────────────────────────────────────────────

/// Which declaration family a situation reports against. Fixed at creation
/// from the creating principal's role, so downstream code never has to probe
/// declaration tables to classify a situation.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportKind {
  /// DIW monthly report against the operational indicator catalog.
  Operational,
  /// DC report against the strategic (objective-structured) catalog.
  Strategic,
  /// A DRI's own report against the fixed DRI performance indicator set.
  DriSelf,
}

impl ReportKind {
  /// The family a given submitting role reports against.
  pub fn for_role(role: Role) -> Option<Self> {
    match role {
      Role::Diw => Some(Self::Operational),
      Role::Dc => Some(Self::Strategic),
      Role::Dri => Some(Self::DriSelf),
      Role::Admin | Role::Director => None,
    }
  }

  /// Operational reports are validated by the parent DRI; everything else
  /// by an admin.
  pub fn validated_by_dri(self) -> bool { matches!(self, Self::Operational) }
}

// ─── Situation ───────────────────────────────────────────────────────────────

/// The central entity: one `(structure, month, year)` reporting instance.
/// At most one exists per tuple; the store enforces this at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Situation {
  pub situation_id:       Uuid,
  pub structure_code:     String,
  pub period:             Period,
  pub kind:               ReportKind,
  pub status:             Status,
  pub owner_user_id:      Uuid,
  pub created_at:         DateTime<Utc>,
  /// Last draft save or rejection bounce.
  pub edited_at:          Option<DateTime<Utc>>,
  pub confirmed_at:       Option<DateTime<Utc>>,
  pub dri_validated_at:   Option<DateTime<Utc>>,
  pub admin_validated_at: Option<DateTime<Utc>>,
}

impl Situation {
  /// Timestamp used for recency ordering in listings.
  pub fn last_touched(&self) -> DateTime<Utc> {
    self.edited_at.unwrap_or(self.created_at)
  }
}

/// Input to [`crate::store::SituationStore::create_situation`].
/// `situation_id` and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewSituation {
  pub structure_code: String,
  pub period:         Period,
  pub kind:           ReportKind,
  pub owner_user_id:  Uuid,
}

/// A rejection event; the history is append-only and never pruned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionEvent {
  pub situation_id: Uuid,
  pub comment:      String,
  pub rejected_by:  Uuid,
  pub rejected_at:  DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_codes_round_trip() {
    for s in [Status::Draft, Status::Submitted, Status::Rejected, Status::Validated]
    {
      assert_eq!(Status::from_code(s.code()), Some(s));
    }
    assert_eq!(Status::from_code(9), None);
  }

  #[test]
  fn editable_and_terminal_states() {
    assert!(Status::Draft.is_editable());
    assert!(Status::Rejected.is_editable());
    assert!(!Status::Submitted.is_editable());
    assert!(!Status::Validated.is_editable());
    assert!(Status::Validated.is_terminal());
  }

  #[test]
  fn ensure_names_the_offending_state() {
    let err = Status::Draft.ensure(false, "validate").unwrap_err();
    assert!(matches!(
      err,
      Error::InvalidTransition { from: Status::Draft, action: "validate" }
    ));
  }

  #[test]
  fn report_kind_follows_role() {
    assert_eq!(ReportKind::for_role(Role::Diw), Some(ReportKind::Operational));
    assert_eq!(ReportKind::for_role(Role::Dc), Some(ReportKind::Strategic));
    assert_eq!(ReportKind::for_role(Role::Dri), Some(ReportKind::DriSelf));
    assert_eq!(ReportKind::for_role(Role::Admin), None);
  }
}
