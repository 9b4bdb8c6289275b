//! Declarations — one indicator's numerator/denominator reading within a
//! situation, with its computed rate (`taux`), the target in force when it
//! was declared (`cible`), and the gap between them (`ecart`).
//!
//! Each declaration family (operational, strategic, DRI-self) stores rows of
//! this one shape in its own live table and draft shadow table; the
//! computation exists only here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::{compute_gap, compute_rate};

/// Round to two decimal places, the precision declarations are stored at.
pub fn round2(value: f64) -> f64 { (value * 100.0).round() / 100.0 }

/// Caller-supplied reading for one indicator. Targets are never accepted
/// from callers; they are looked up from the catalog at computation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclarationInput {
  pub indicator_id: String,
  pub numerator:    f64,
  pub denominator:  f64,
}

/// A fully computed declaration row, as persisted in either a live table or
/// its draft shadow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclarationRow {
  pub indicator_id: String,
  pub numerator:    f64,
  pub denominator:  f64,
  /// `numerator / denominator × 100`, 0 when the denominator is 0.
  pub rate:         f64,
  /// Target in force when the row was computed.
  pub target:       f64,
  /// `rate − target`; `−target` when the denominator is 0.
  pub gap:          f64,
}

impl DeclarationRow {
  /// Compute a row from a reading and the target in force.
  pub fn compute(input: &DeclarationInput, target: f64) -> Self {
    let rate = round2(compute_rate(input.numerator, input.denominator));
    let gap = round2(compute_gap(rate, target));
    Self {
      indicator_id: input.indicator_id.clone(),
      numerator: input.numerator,
      denominator: input.denominator,
      rate,
      target,
      gap,
    }
  }
}

/// A declaration row joined with the situation it belongs to, as returned by
/// analysis queries that span many situations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRow {
  pub situation_id:   Uuid,
  pub structure_code: String,
  pub month:          String,
  pub year:           String,
  pub category_id:    String,
  pub row:            DeclarationRow,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn input(id: &str, num: f64, den: f64) -> DeclarationInput {
    DeclarationInput { indicator_id: id.into(), numerator: num, denominator: den }
  }

  #[test]
  fn compute_rounds_to_two_decimals() {
    let row = DeclarationRow::compute(&input("A.1", 1.0, 3.0), 30.0);
    assert_eq!(row.rate, 33.33);
    assert_eq!(row.gap, 3.33);
  }

  #[test]
  fn zero_denominator_yields_zero_rate_and_negative_target_gap() {
    let row = DeclarationRow::compute(&input("A.1", 42.0, 0.0), 25.0);
    assert_eq!(row.rate, 0.0);
    assert_eq!(row.gap, -25.0);
  }

  #[test]
  fn absent_target_defaults_leave_gap_equal_to_rate() {
    let row = DeclarationRow::compute(&input("A.1", 50.0, 100.0), 0.0);
    assert_eq!(row.rate, 50.0);
    assert_eq!(row.gap, 50.0);
  }
}
