//! The case report: one email per new case, with HTML and plain-text bodies.

use malaria24_core::{case::Case, facility::Facility};

/// A case together with the facility that reported it, if that facility
/// has been imported.
#[derive(Debug, Clone, Copy)]
pub struct CaseReport<'a> {
  pub case:     &'a Case,
  pub facility: Option<&'a Facility>,
}

impl<'a> CaseReport<'a> {
  pub fn new(case: &'a Case, facility: Option<&'a Facility>) -> Self { Self { case, facility } }

  /// Facility name when known, otherwise the bare code.
  pub fn facility_label(&self) -> &str {
    match self.facility {
      Some(f) if !f.facility_name.is_empty() => &f.facility_name,
      _ => &self.case.facility_code,
    }
  }

  pub fn subject(&self) -> String {
    format!("Malaria case report: {}", self.facility_label())
  }

  /// `(label, value)` pairs shown in every rendering of the report.
  pub fn rows(&self) -> Vec<(&'static str, String)> {
    let case = self.case;
    let mut rows = vec![
      ("Case number", case.id.to_string()),
      ("Reported at", case.created_at.format("%Y-%m-%d %H:%M UTC").to_string()),
      ("Patient", case.patient_name()),
      ("Gender", case.gender.clone()),
      ("Date of birth", case.date_of_birth.clone()),
      ("SA ID number", case.sa_id_number.clone()),
      ("Mobile number", case.msisdn.clone()),
      ("Locality", case.locality.clone()),
      ("Facility code", case.facility_code.clone()),
    ];

    if let Some(f) = self.facility {
      rows.extend([
        ("Facility", f.facility_name.clone()),
        ("Subdistrict", f.subdistrict.clone()),
        ("District", f.district.clone()),
        ("Province", f.province.clone()),
      ]);
    }

    rows.push(("Reported by", case.reported_by.clone()));
    rows.retain(|(_, value)| !value.is_empty());
    rows
  }

  pub fn render_text(&self) -> String {
    let mut out = format!("{}\n\n", self.subject());
    for (label, value) in self.rows() {
      out.push_str(&format!("{label}: {value}\n"));
    }
    out
  }

  /// The HTML email body. Also served by the admin preview endpoint.
  pub fn render_html(&self) -> String {
    let mut rows = String::new();
    for (label, value) in self.rows() {
      rows.push_str(&format!(
        "      <tr><th align=\"left\">{}</th><td>{}</td></tr>\n",
        escape_html(label),
        escape_html(&value),
      ));
    }

    format!(
      "<!DOCTYPE html>\n\
       <html>\n\
       <head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
       <body>\n\
       \x20 <h1>{title}</h1>\n\
       \x20 <p>A new malaria case has been reported. Please follow up within 72 hours.</p>\n\
       \x20 <table cellpadding=\"4\">\n\
       {rows}\
       \x20 </table>\n\
       </body>\n\
       </html>\n",
      title = escape_html(&self.subject()),
    )
  }
}

pub fn escape_html(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#x27;"),
      c => out.push(c),
    }
  }
  out
}
