//! Report rendering into an email attachment.
//!
//! [`ReportRenderer`] is the seam for a real layout engine. [`PdfRenderer`]
//! writes a single A4 page of Helvetica text, which every PDF reader can
//! open without embedded fonts.

use std::fmt::Write as _;

use malaria24_core::mail::Attachment;

use crate::{report::CaseReport, Result};

/// Turns a case report into an attachment.
pub trait ReportRenderer: Send + Sync {
  fn render(&self, report: &CaseReport<'_>) -> Result<Attachment>;
}

/// Renders the report rows as a one-page PDF.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl ReportRenderer for PdfRenderer {
  fn render(&self, report: &CaseReport<'_>) -> Result<Attachment> {
    let mut lines = vec![report.subject(), String::new()];
    lines.extend(
      report
        .rows()
        .into_iter()
        .map(|(label, value)| format!("{label}: {value}")),
    );

    Ok(Attachment {
      filename:     format!("case-{}.pdf", report.case.id),
      content_type: "application/pdf".to_owned(),
      data:         text_pdf(&lines),
    })
  }
}

const PAGE_WIDTH: u32 = 595;
const PAGE_HEIGHT: u32 = 842;
const MARGIN: u32 = 50;
const FONT_SIZE: u32 = 11;
const LEADING: u32 = 14;
const WRAP_AT: usize = 90;
const MAX_LINES: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;

/// Lay `lines` out top-to-bottom on a single page. Long lines are wrapped;
/// anything past the bottom margin is dropped.
pub fn text_pdf(lines: &[String]) -> Vec<u8> {
  let mut content = String::new();
  let _ = write!(
    content,
    "BT\n/F1 {FONT_SIZE} Tf\n{LEADING} TL\n{MARGIN} {} Td\n",
    PAGE_HEIGHT - MARGIN
  );
  for line in lines.iter().flat_map(|l| wrap(l)).take(MAX_LINES) {
    let _ = writeln!(content, "({}) Tj T*", escape_pdf_text(&line));
  }
  content.push_str("ET\n");

  let objects = [
    "<< /Type /Catalog /Pages 2 0 R >>".to_owned(),
    "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_owned(),
    format!(
      "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
       /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
    ),
    "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
      .to_owned(),
    format!("<< /Length {} >>\nstream\n{content}endstream", content.len()),
  ];

  let mut out = String::from("%PDF-1.4\n");
  let mut offsets = Vec::with_capacity(objects.len());
  for (i, body) in objects.iter().enumerate() {
    offsets.push(out.len());
    let _ = write!(out, "{} 0 obj\n{body}\nendobj\n", i + 1);
  }

  let xref_at = out.len();
  let _ = write!(out, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
  for offset in offsets {
    let _ = write!(out, "{offset:010} 00000 n \n");
  }
  let _ = write!(
    out,
    "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
    objects.len() + 1
  );

  out.into_bytes()
}

fn wrap(line: &str) -> Vec<String> {
  if line.is_empty() {
    return vec![String::new()];
  }
  let chars: Vec<char> = line.chars().collect();
  chars.chunks(WRAP_AT).map(|chunk| chunk.iter().collect()).collect()
}

/// Escape a PDF literal string. Only printable ASCII is kept, so byte
/// offsets in the file equal string lengths.
fn escape_pdf_text(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    match c {
      '(' | ')' | '\\' => {
        out.push('\\');
        out.push(c);
      }
      ' '..='~' => out.push(c),
      _ => out.push('?'),
    }
  }
  out
}
