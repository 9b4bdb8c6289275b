//! The indicator and target catalog.
//!
//! Read-mostly reference data: indicators grouped into categories (axes),
//! strategic indicators additionally grouped under objectives, and yearly
//! numeric targets. Target scope differs per family:
//!
//! - operational targets are per `(indicator, structure, year)`;
//! - strategic targets are per `(indicator, year)` — global, not
//!   per-structure;
//! - DRI-self targets are per `(indicator, DRI, year)`.
//!
//! A missing target row always reads as 0, never as an error.

use serde::{Deserialize, Serialize};

/// The fixed indicator subset a DRI reports on for itself, regardless of
/// category.
pub const DRI_SELF_INDICATORS: [i64; 3] = [5, 6, 7];

/// An indicator category (axis).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
  pub category_id: String,
  pub label:       String,
}

/// A strategic objective beneath a category; strategic indicators only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
  pub objective_id: i64,
  pub label:        String,
  pub category_id:  String,
}

/// An operational indicator. Its id encodes its category:
/// `"{category_id}.{sequence}"`, allocated by [`indicator_id`] and never
/// reused even after deletion of siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
  pub indicator_id: String,
  pub label:        String,
  pub category_id:  String,
}

/// A strategic indicator; same natural-key scheme, plus its objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategicIndicator {
  pub indicator_id: String,
  pub label:        String,
  pub category_id:  String,
  pub objective_id: i64,
}

/// One of the fixed DRI performance indicators, keyed by integer id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriIndicator {
  pub indicator_id: i64,
  pub label:        String,
}

/// Allocate the natural key for the next indicator in a category.
/// `last_sequence` is the highest sequence ever issued in the category,
/// deleted siblings included.
pub fn indicator_id(category_id: &str, last_sequence: u32) -> String {
  format!("{category_id}.{}", last_sequence + 1)
}

// ─── Catalog rows ────────────────────────────────────────────────────────────

/// An indicator joined with its target for one `(structure, year)` — the row
/// a data-entry screen is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
  pub indicator_id: String,
  pub label:        String,
  pub category_id:  String,
  /// 0 when no target row exists for the scope.
  pub target:       f64,
}

/// A strategic catalog entry carries the objective level as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategicCatalogEntry {
  pub indicator_id:    String,
  pub label:           String,
  pub category_id:     String,
  pub category_label:  String,
  pub objective_id:    i64,
  pub objective_label: String,
  /// 0 when no target row exists for the year.
  pub target:          f64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn indicator_ids_encode_category_and_advance() {
    assert_eq!(indicator_id("A", 0), "A.1");
    assert_eq!(indicator_id("A", 3), "A.4");
    // Sequences advance past deleted siblings: deleting A.4 then allocating
    // again must not reissue it.
    assert_eq!(indicator_id("A", 4), "A.5");
  }
}
