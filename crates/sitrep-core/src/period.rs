//! Reporting periods.
//!
//! A period is a `(month name, year string)` pair, not a calendar date.
//! Month names are French and compared case-insensitively; this is a legacy
//! wire contract that callers must preserve.

use serde::{Deserialize, Serialize};

/// French month names, in calendar order. `month_number` is the 1-based
/// index into this table.
pub const MONTH_NAMES: [&str; 12] = [
  "janvier",
  "février",
  "mars",
  "avril",
  "mai",
  "juin",
  "juillet",
  "août",
  "septembre",
  "octobre",
  "novembre",
  "décembre",
];

/// Map a French month name to its calendar number (1–12).
/// Unknown or empty names map to 0, which sorts before every real month.
pub fn month_number(name: &str) -> u32 {
  let lower = name.to_lowercase();
  MONTH_NAMES
    .iter()
    .position(|m| *m == lower)
    .map(|i| i as u32 + 1)
    .unwrap_or(0)
}

/// The name for a calendar month number (1–12).
pub fn month_name(number: u32) -> Option<&'static str> {
  match number {
    1..=12 => Some(MONTH_NAMES[number as usize - 1]),
    _ => None,
  }
}

// ─── Period ──────────────────────────────────────────────────────────────────

/// One reporting period for a structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
  pub month: String,
  pub year:  String,
}

impl Period {
  pub fn new(month: impl Into<String>, year: impl Into<String>) -> Self {
    Self { month: month.into(), year: year.into() }
  }

  /// Calendar number of this period's month; 0 if the name is unknown.
  pub fn month_number(&self) -> u32 { month_number(&self.month) }

  /// Period equality per the legacy contract: month compared lowercased,
  /// year compared verbatim.
  pub fn matches(&self, month: &str, year: &str) -> bool {
    self.month.to_lowercase() == month.to_lowercase() && self.year == year
  }

  /// The period immediately after this one; `None` when the month name is
  /// not a real month.
  pub fn next(&self) -> Option<Period> {
    let n = self.month_number();
    if n == 0 {
      return None;
    }
    let year: i32 = self.year.parse().ok()?;
    Some(if n == 12 {
      Period::new(MONTH_NAMES[0], (year + 1).to_string())
    } else {
      Period::new(MONTH_NAMES[n as usize], self.year.clone())
    })
  }

  /// Sort key `(year, month number)`; unparseable years sort first.
  pub fn sort_key(&self) -> (i32, u32) {
    (self.year.parse().unwrap_or(i32::MIN), self.month_number())
  }
}

impl std::fmt::Display for Period {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {}", self.month, self.year)
  }
}

/// Month names for a trimester (1–4).
pub fn trimester_months(trimester: u8) -> Option<[&'static str; 3]> {
  if !(1..=4).contains(&trimester) {
    return None;
  }
  let start = (trimester as usize - 1) * 3;
  Some([
    MONTH_NAMES[start],
    MONTH_NAMES[start + 1],
    MONTH_NAMES[start + 2],
  ])
}

/// Month names for a semester (1–2).
pub fn semester_months(semester: u8) -> Option<[&'static str; 6]> {
  if !(1..=2).contains(&semester) {
    return None;
  }
  let start = (semester as usize - 1) * 6;
  let mut out = [""; 6];
  out.copy_from_slice(&MONTH_NAMES[start..start + 6]);
  Some(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn month_numbers_cover_the_year() {
    assert_eq!(month_number("janvier"), 1);
    assert_eq!(month_number("Décembre"), 12);
    assert_eq!(month_number("AOÛT"), 8);
    assert_eq!(month_number("smarch"), 0);
    assert_eq!(month_number(""), 0);
  }

  #[test]
  fn period_matching_is_month_case_insensitive() {
    let p = Period::new("Mars", "2025");
    assert!(p.matches("mars", "2025"));
    assert!(!p.matches("mars", "2024"));
    assert!(!p.matches("avril", "2025"));
  }

  #[test]
  fn next_rolls_over_december() {
    let p = Period::new("décembre", "2024");
    assert_eq!(p.next(), Some(Period::new("janvier", "2025")));
    let q = Period::new("mars", "2025");
    assert_eq!(q.next(), Some(Period::new("avril", "2025")));
    assert_eq!(Period::new("smarch", "2025").next(), None);
  }

  #[test]
  fn trimester_and_semester_expansion() {
    assert_eq!(trimester_months(2), Some(["avril", "mai", "juin"]));
    assert_eq!(trimester_months(5), None);
    let s2 = semester_months(2).unwrap();
    assert_eq!(s2[0], "juillet");
    assert_eq!(s2[5], "décembre");
  }
}
