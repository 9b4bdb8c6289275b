//! Organizational structures.
//!
//! Three disjoint kinds: DIW (child of exactly one DRI), DRI, and DC.
//! The hierarchy is two levels deep at most — a DRI and its DIWs. DC and
//! DRI are independent roots.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Maximum length of a structure code.
pub const CODE_MAX_LEN: usize = 7;

/// The kind of organizational structure a code denotes.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StructureKind {
  Dc,
  Dri,
  Diw,
}

/// One organizational structure. The variant carries the fields specific to
/// its kind; `Diw` records its parent DRI code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Structure {
  Diw {
    code:       String,
    label:      Option<String>,
    parent_dri: String,
  },
  Dri {
    code:  String,
    label: Option<String>,
  },
  Dc {
    code:        String,
    label:       Option<String>,
    description: Option<String>,
  },
}

impl Structure {
  pub fn code(&self) -> &str {
    match self {
      Self::Diw { code, .. } | Self::Dri { code, .. } | Self::Dc { code, .. } => {
        code
      }
    }
  }

  pub fn kind(&self) -> StructureKind {
    match self {
      Self::Diw { .. } => StructureKind::Diw,
      Self::Dri { .. } => StructureKind::Dri,
      Self::Dc { .. } => StructureKind::Dc,
    }
  }

  pub fn label(&self) -> Option<&str> {
    match self {
      Self::Diw { label, .. }
      | Self::Dri { label, .. }
      | Self::Dc { label, .. } => label.as_deref(),
    }
  }

  /// Display name: the label when present, otherwise the code.
  pub fn display_name(&self) -> &str { self.label().unwrap_or(self.code()) }

  /// Parent DRI code; only DIWs have one.
  pub fn parent_dri(&self) -> Option<&str> {
    match self {
      Self::Diw { parent_dri, .. } => Some(parent_dri),
      _ => None,
    }
  }
}

// ─── Home assignment ─────────────────────────────────────────────────────────

/// Where a principal belongs in the hierarchy, resolved once at
/// authentication time from the user's structure code. Replaces the
/// overloaded free-form code field with a tagged assignment, so request
/// handling never has to re-classify the code by cross-table probing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "code", rename_all = "lowercase")]
pub enum HomeAssignment {
  Diw(String),
  Dri(String),
  Dc(String),
  /// Admins and super-admins; no home structure.
  Global,
}

impl HomeAssignment {
  pub fn code(&self) -> Option<&str> {
    match self {
      Self::Diw(c) | Self::Dri(c) | Self::Dc(c) => Some(c),
      Self::Global => None,
    }
  }

  pub fn kind(&self) -> Option<StructureKind> {
    match self {
      Self::Diw(_) => Some(StructureKind::Diw),
      Self::Dri(_) => Some(StructureKind::Dri),
      Self::Dc(_) => Some(StructureKind::Dc),
      Self::Global => None,
    }
  }
}
