//! The authenticated caller.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::structure::HomeAssignment;

/// The functional role of a user. The discriminant doubles as the storage
/// encoding, matching the historical integer codes.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Role {
  Diw      = 1,
  Dri      = 2,
  Dc       = 3,
  Admin    = 4,
  Director = 5,
}

impl Role {
  pub fn code(self) -> i64 { self as i64 }

  pub fn from_code(code: i64) -> Option<Self> {
    match code {
      1 => Some(Self::Diw),
      2 => Some(Self::Dri),
      3 => Some(Self::Dc),
      4 => Some(Self::Admin),
      5 => Some(Self::Director),
      _ => None,
    }
  }

  /// Roles that author situations (as opposed to only reviewing them).
  pub fn submits_reports(self) -> bool {
    matches!(self, Self::Diw | Self::Dri | Self::Dc)
  }
}

/// An already-authenticated caller. Session mechanics (token issuance,
/// single-session enforcement, password handling) happen upstream; the core
/// only consumes the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub user_id:        Uuid,
  pub role:           Role,
  /// Resolved once at authentication time; see [`HomeAssignment`].
  pub home:           HomeAssignment,
  /// Orthogonal to `role`: grants unrestricted scope like `Admin`.
  pub is_super_admin: bool,
}

impl Principal {
  /// Unrestricted principals see every structure.
  pub fn is_unrestricted(&self) -> bool {
    self.is_super_admin || self.role == Role::Admin
  }
}
