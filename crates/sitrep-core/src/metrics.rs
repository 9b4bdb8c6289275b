//! The declaration aggregator.
//!
//! Every dashboard and export computes its numbers through this module, so
//! subtly-different aggregation never reappears per role. Two rules matter:
//!
//! - Rates aggregate **weighted**: sum numerators and denominators first,
//!   then divide once. Never average individual rates.
//! - Year-level views are a **snapshot of the latest validated period** per
//!   structure, not a sum across periods.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
  declaration::{DeclarationRow, round2},
  situation::{Situation, Status},
};

// ─── Scalar computations ─────────────────────────────────────────────────────

/// `taux`: `numerator / denominator × 100`; 0 when the denominator is 0.
/// Never raises on division by zero.
pub fn compute_rate(numerator: f64, denominator: f64) -> f64 {
  if denominator == 0.0 {
    0.0
  } else {
    (numerator / denominator) * 100.0
  }
}

/// `ecart`: `rate − target`.
pub fn compute_gap(rate: f64, target: f64) -> f64 { rate - target }

// ─── Indicator aggregates ────────────────────────────────────────────────────

/// The weighted aggregate of a group of declarations for one indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorAggregate {
  pub indicator_id: String,
  pub numerator:    f64,
  pub denominator:  f64,
  /// Weighted rate: `ComputeRate(Σ numerators, Σ denominators)`.
  pub rate:         f64,
  /// Arithmetic mean of the per-row targets. Targets are constant within a
  /// group in practice, but the aggregator does not assume it.
  pub target:       f64,
  pub gap:          f64,
  /// `min(rate, target)` — the portion of the target actually reached.
  pub performance_to_target: f64,
  /// `max(0, target − rate)`.
  pub shortfall:    f64,
  /// `max(0, rate − target)`.
  pub overshoot:    f64,
}

impl IndicatorAggregate {
  fn from_group(indicator_id: String, rows: &[&DeclarationRow]) -> Self {
    let numerator: f64 = rows.iter().map(|r| r.numerator).sum();
    let denominator: f64 = rows.iter().map(|r| r.denominator).sum();
    let rate = round2(compute_rate(numerator, denominator));
    let target =
      round2(rows.iter().map(|r| r.target).sum::<f64>() / rows.len() as f64);
    let gap = round2(compute_gap(rate, target));
    Self {
      indicator_id,
      numerator,
      denominator,
      rate,
      target,
      gap,
      performance_to_target: rate.min(target),
      shortfall: (target - rate).max(0.0),
      overshoot: (rate - target).max(0.0),
    }
  }
}

/// Aggregate declarations per indicator, weighted. Output is ordered by
/// indicator id.
pub fn aggregate_by_indicator<'a>(
  rows: impl IntoIterator<Item = &'a DeclarationRow>,
) -> Vec<IndicatorAggregate> {
  let mut groups: BTreeMap<&str, Vec<&DeclarationRow>> = BTreeMap::new();
  for row in rows {
    groups.entry(&row.indicator_id).or_default().push(row);
  }
  groups
    .into_iter()
    .map(|(id, group)| IndicatorAggregate::from_group(id.to_owned(), &group))
    .collect()
}

// ─── Snapshot selection ──────────────────────────────────────────────────────

/// Among a structure's validated situations (optionally within one year),
/// the one whose month is numerically latest. This single-period snapshot is
/// what feeds every dashboard and export.
pub fn latest_validated<'a>(
  situations: impl IntoIterator<Item = &'a Situation>,
  year: Option<&str>,
) -> Option<&'a Situation> {
  situations
    .into_iter()
    .filter(|s| s.status == Status::Validated)
    .filter(|s| year.is_none_or(|y| s.period.year == y))
    .max_by_key(|s| (s.period.sort_key(), s.situation_id))
}

/// The latest-validated snapshot per structure. Ordered by structure code.
pub fn latest_validated_per_structure<'a>(
  situations: &'a [Situation],
  year: Option<&str>,
) -> Vec<&'a Situation> {
  let mut by_structure: BTreeMap<&str, Vec<&Situation>> = BTreeMap::new();
  for s in situations {
    by_structure.entry(&s.structure_code).or_default().push(s);
  }
  by_structure
    .into_values()
    .filter_map(|group| latest_validated(group, year))
    .collect()
}

// ─── Status counts ───────────────────────────────────────────────────────────

/// Dashboard card counters over a set of situations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
  pub total:       usize,
  /// Draft + Rejected: still with the submitting structure.
  pub in_progress: usize,
  /// Submitted, awaiting validation.
  pub pending:     usize,
  pub validated:   usize,
}

pub fn status_counts<'a>(
  situations: impl IntoIterator<Item = &'a Situation>,
) -> StatusCounts {
  let mut counts = StatusCounts::default();
  for s in situations {
    counts.total += 1;
    match s.status {
      Status::Draft | Status::Rejected => counts.in_progress += 1,
      Status::Submitted => counts.pending += 1,
      Status::Validated => counts.validated += 1,
    }
  }
  counts
}

/// How many monthly situations a structure is expected to have filed by
/// `current_month` of the running year: every completed month, and a full
/// twelve when January (reporting on the whole previous year).
pub fn expected_periods(current_month: u32) -> u32 {
  if current_month == 1 { 12 } else { current_month - 1 }
}

/// Completion of a structure against [`expected_periods`], as a percentage.
pub fn completion_rate(filed: usize, expected: u32) -> f64 {
  if expected == 0 {
    0.0
  } else {
    (filed as f64 / expected as f64) * 100.0
  }
}
