//! Periodic digests: case counts for the recipient's district, province or
//! the whole country.

use std::collections::{BTreeMap, HashMap};

use malaria24_core::{
  actor::{Actor, DigestKind},
  case::Case,
  facility::Facility,
  mail::Email,
};

const UNKNOWN: &str = "Unknown";

/// Case counts for one recipient's scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestTable {
  pub kind:  DigestKind,
  /// `"District Vhembe"`, `"Province Limpopo"` or `"South Africa"`.
  pub scope: String,
  /// Counts grouped by subdistrict, district or province respectively.
  pub rows:  BTreeMap<String, usize>,
}

impl DigestTable {
  pub fn total(&self) -> usize { self.rows.values().sum() }

  pub fn subject(&self) -> String {
    format!("Malaria24 {} Digest", self.kind.title())
  }

  pub fn render_text(&self, period_days: i64) -> String {
    let group = match self.kind {
      DigestKind::District => "Subdistrict",
      DigestKind::Provincial => "District",
      DigestKind::National => "Province",
    };

    let mut out = format!(
      "{}\n\nMalaria cases reported in the last {period_days} days, {}.\n\n",
      self.subject(),
      self.scope,
    );
    for (name, count) in &self.rows {
      out.push_str(&format!("{group} {name}: {count}\n"));
    }
    out.push_str(&format!("Total: {}\n", self.total()));
    out
  }

  pub fn into_email(self, to: &Actor, period_days: i64) -> Email {
    Email::new(vec![to.email.clone()], self.subject(), self.render_text(period_days))
  }
}

/// Tally `cases` for `recipient`'s scope.
///
/// Returns `None` for district and provincial digests whose recipient has no
/// district or province on record; those digests have no scope to report on.
pub fn tally(
  kind: DigestKind,
  recipient: &Actor,
  cases: &[Case],
  facilities: &HashMap<String, Facility>,
) -> Option<DigestTable> {
  let scope = match kind {
    DigestKind::District if recipient.district.is_empty() => return None,
    DigestKind::Provincial if recipient.province.is_empty() => return None,
    DigestKind::District => format!("District {}", recipient.district),
    DigestKind::Provincial => format!("Province {}", recipient.province),
    DigestKind::National => "South Africa".to_owned(),
  };

  let mut rows = BTreeMap::new();
  for case in cases {
    let facility = facilities.get(&case.facility_code);
    let group = match (kind, facility) {
      (DigestKind::District, Some(f)) if f.district == recipient.district => f.subdistrict.as_str(),
      (DigestKind::Provincial, Some(f)) if f.province == recipient.province => f.district.as_str(),
      (DigestKind::National, Some(f)) => f.province.as_str(),
      (DigestKind::National, None) => UNKNOWN,
      _ => continue,
    };
    let group = if group.is_empty() { UNKNOWN } else { group };
    *rows.entry(group.to_owned()).or_insert(0) += 1;
  }

  Some(DigestTable { kind, scope, rows })
}
