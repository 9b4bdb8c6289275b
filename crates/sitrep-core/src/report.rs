//! The report data assembler.
//!
//! A pure mapping from aggregated results plus filter context to flat export
//! rows, with codes replaced by display names. Actual file bytes are a
//! collaborator's problem; a minimal CSV generator ships for wiring and
//! tests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
  Result,
  metrics::IndicatorAggregate,
  period::{semester_months, trimester_months},
};

// ─── Filter context ──────────────────────────────────────────────────────────

/// Filters applied to an analysis or export query. Month-granularity filters
/// are mutually narrowing: an explicit month wins over a trimester, which
/// wins over a semester.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterContext {
  pub year:         Option<String>,
  /// Calendar month 1–12.
  pub month:        Option<u8>,
  /// Trimester 1–4.
  pub trimester:    Option<u8>,
  /// Semester 1–2.
  pub semester:     Option<u8>,
  pub category_id:  Option<String>,
  pub indicator_id: Option<String>,
}

impl FilterContext {
  /// The month-name set this context narrows to, or `None` for all months.
  pub fn month_names(&self) -> Option<Vec<&'static str>> {
    if let Some(m) = self.month {
      return crate::period::month_name(m as u32).map(|n| vec![n]);
    }
    if let Some(t) = self.trimester {
      return trimester_months(t).map(|m| m.to_vec());
    }
    if let Some(s) = self.semester {
      return semester_months(s).map(|m| m.to_vec());
    }
    None
  }

  /// Human-readable summary for report headers, e.g.
  /// `"Année 2025 · Trimestre 2 · Axe Qualité"`.
  pub fn summary(&self, category_label: Option<&str>) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(year) = &self.year {
      parts.push(format!("Année {year}"));
    }
    if let Some(m) = self.month {
      if let Some(name) = crate::period::month_name(m as u32) {
        parts.push(format!("Mois {name}"));
      }
    } else if let Some(t) = self.trimester {
      parts.push(format!("Trimestre {t}"));
    } else if let Some(s) = self.semester {
      parts.push(format!("Semestre {s}"));
    }
    if let Some(axis) = category_label.or(self.category_id.as_deref()) {
      parts.push(format!("Axe {axis}"));
    }
    if parts.is_empty() {
      "Toutes périodes".to_owned()
    } else {
      parts.join(" · ")
    }
  }
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// Display-name lookup tables used to annotate export rows.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
  pub indicators: HashMap<String, String>,
  pub categories: HashMap<String, String>,
  pub structures: HashMap<String, String>,
}

impl NameIndex {
  fn indicator(&self, id: &str) -> String {
    self.indicators.get(id).cloned().unwrap_or_else(|| id.to_owned())
  }

  fn category(&self, id: &str) -> String {
    self.categories.get(id).cloned().unwrap_or_else(|| id.to_owned())
  }
}

/// An aggregate annotated with its grouping context, ready for assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedRow {
  pub category_id: String,
  pub aggregate:   IndicatorAggregate,
}

/// One flat row handed to the [`ReportGenerator`] collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatExportRow {
  pub axis:        String,
  pub indicator:   String,
  pub numerator:   f64,
  pub denominator: f64,
  pub rate:        f64,
  pub target:      f64,
  pub gap:         f64,
}

/// Turn aggregated rows into export rows with resolved display names.
/// Output is ordered by axis name, then indicator name.
pub fn assemble(rows: &[AggregatedRow], names: &NameIndex) -> Vec<FlatExportRow> {
  let mut out: Vec<FlatExportRow> = rows
    .iter()
    .map(|r| FlatExportRow {
      axis:        names.category(&r.category_id),
      indicator:   names.indicator(&r.aggregate.indicator_id),
      numerator:   r.aggregate.numerator,
      denominator: r.aggregate.denominator,
      rate:        r.aggregate.rate,
      target:      r.aggregate.target,
      gap:         r.aggregate.gap,
    })
    .collect();
  out.sort_by(|a, b| (&a.axis, &a.indicator).cmp(&(&b.axis, &b.indicator)));
  out
}

// ─── Generator collaborator ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
  Csv,
  Xlsx,
  Pdf,
}

/// Produces the actual file bytes from assembled rows. Excel/PDF renderers
/// are external collaborators; only the CSV wiring implementation lives in
/// this repository.
pub trait ReportGenerator: Send + Sync {
  fn generate(
    &self,
    rows: &[FlatExportRow],
    title: &str,
    format: ReportFormat,
  ) -> Result<Vec<u8>>;
}

/// Semicolon-separated CSV, the wiring/test implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvReportGenerator;

impl ReportGenerator for CsvReportGenerator {
  fn generate(
    &self,
    rows: &[FlatExportRow],
    title: &str,
    format: ReportFormat,
  ) -> Result<Vec<u8>> {
    if format != ReportFormat::Csv {
      return Err(crate::Error::Storage(format!(
        "format {format:?} requires an external generator"
      )));
    }
    let mut out = String::new();
    out.push_str(&format!("# {title}\n"));
    out.push_str("axe;indicateur;numerateur;denominateur;taux;cible;ecart\n");
    for r in rows {
      out.push_str(&format!(
        "{};{};{};{};{};{};{}\n",
        r.axis, r.indicator, r.numerator, r.denominator, r.rate, r.target, r.gap
      ));
    }
    Ok(out.into_bytes())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    declaration::{DeclarationInput, DeclarationRow},
    metrics::aggregate_by_indicator,
  };

  fn aggregated(category: &str, id: &str, num: f64, den: f64) -> AggregatedRow {
    let row = DeclarationRow::compute(
      &DeclarationInput { indicator_id: id.into(), numerator: num, denominator: den },
      40.0,
    );
    AggregatedRow {
      category_id: category.into(),
      aggregate:   aggregate_by_indicator(&[row]).remove(0),
    }
  }

  fn names() -> NameIndex {
    NameIndex {
      indicators: HashMap::from([("A.1".to_owned(), "Délai moyen".to_owned())]),
      categories: HashMap::from([("A".to_owned(), "Qualité".to_owned())]),
      structures: HashMap::new(),
    }
  }

  #[test]
  fn assemble_substitutes_display_names_and_sorts() {
    let rows = vec![aggregated("Z", "Z.9", 1.0, 2.0), aggregated("A", "A.1", 30.0, 100.0)];
    let flat = assemble(&rows, &names());
    assert_eq!(flat[0].axis, "Qualité");
    assert_eq!(flat[0].indicator, "Délai moyen");
    assert_eq!(flat[0].rate, 30.0);
    // Unknown codes fall back to the code itself.
    assert_eq!(flat[1].axis, "Z");
    assert_eq!(flat[1].indicator, "Z.9");
  }

  #[test]
  fn filter_summary_reads_naturally() {
    let ctx = FilterContext {
      year: Some("2025".into()),
      trimester: Some(2),
      category_id: Some("A".into()),
      ..Default::default()
    };
    assert_eq!(ctx.summary(Some("Qualité")), "Année 2025 · Trimestre 2 · Axe Qualité");
    assert_eq!(FilterContext::default().summary(None), "Toutes périodes");
  }

  #[test]
  fn month_filters_narrow_in_precedence_order() {
    let mut ctx = FilterContext { semester: Some(1), ..Default::default() };
    assert_eq!(ctx.month_names().unwrap().len(), 6);
    ctx.trimester = Some(4);
    assert_eq!(ctx.month_names().unwrap(), vec!["octobre", "novembre", "décembre"]);
    ctx.month = Some(2);
    assert_eq!(ctx.month_names().unwrap(), vec!["février"]);
  }

  #[test]
  fn csv_generator_emits_header_and_rows() {
    let flat = assemble(&[aggregated("A", "A.1", 30.0, 100.0)], &names());
    let bytes = CsvReportGenerator
      .generate(&flat, "Analyse opérationnelle", ReportFormat::Csv)
      .unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with("# Analyse opérationnelle\n"));
    assert!(text.contains("Qualité;Délai moyen;30;100;30;40;-10"));
  }
}
