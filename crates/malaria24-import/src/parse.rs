//! Upload decoding: a JSON array of objects, or CSV with a header row.

use std::collections::HashMap;

use malaria24_core::facility::NewFacility;
use serde_json::Value;

use crate::{Error, Result};

const CODE: &str = "FacCode";
const NAME: &str = "Facility";
const DISTRICT: &str = "District";
const PROVINCE: &str = "Province";
const PHASE: &str = "Phase";
const SUBDISTRICT: [&str; 2] = ["Sub-District (Locality)", "Sub-District"];

/// Decode every row of `upload`. Fails on the first bad row, before the
/// caller has written anything.
pub fn parse_upload(upload: &[u8]) -> Result<Vec<NewFacility>> {
  let text = std::str::from_utf8(upload).map_err(|_| Error::NotUtf8)?;
  let text = text.trim_start_matches('\u{feff}').trim();

  if text.is_empty() {
    return Err(Error::EmptyUpload);
  }

  let rows = if text.starts_with('[') { json_rows(text)? } else { csv_rows(text)? };

  rows
    .into_iter()
    .enumerate()
    .map(|(i, row)| into_facility(i + 1, &row))
    .collect()
}

fn json_rows(text: &str) -> Result<Vec<HashMap<String, String>>> {
  let values: Vec<Value> = serde_json::from_str(text)?;

  values
    .into_iter()
    .enumerate()
    .map(|(i, value)| match value {
      Value::Object(map) => Ok(
        map
          .into_iter()
          .map(|(key, value)| (key.trim().to_owned(), json_text(value)))
          .collect(),
      ),
      _ => Err(Error::NotAnObject { row: i + 1 }),
    })
    .collect()
}

fn json_text(value: Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => s,
    other => other.to_string(),
  }
}

fn csv_rows(text: &str) -> Result<Vec<HashMap<String, String>>> {
  let mut reader = csv::ReaderBuilder::new()
    .trim(csv::Trim::All)
    .flexible(true)
    .from_reader(text.as_bytes());

  let mut rows = Vec::new();
  for record in reader.deserialize::<HashMap<String, String>>() {
    rows.push(record?);
  }
  Ok(rows)
}

fn into_facility(row_number: usize, row: &HashMap<String, String>) -> Result<NewFacility> {
  let field = |name: &str| row.get(name).map(|v| v.trim().to_owned()).unwrap_or_default();

  let facility_code = field(CODE);
  if facility_code.is_empty() {
    return Err(Error::MissingCode { row: row_number });
  }

  let subdistrict = SUBDISTRICT
    .iter()
    .map(|name| field(name))
    .find(|v| !v.is_empty())
    .unwrap_or_default();

  Ok(NewFacility {
    facility_code,
    facility_name: field(NAME),
    district: field(DISTRICT),
    subdistrict,
    province: field(PROVINCE),
    phase: field(PHASE),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  const JSON_UPLOAD: &str = r#"[{
    "District": "District",
    "FacCode": "123456",
    "Facility": "Facility Name",
    "Phase": "D",
    "Province": "Province",
    "Sub-District (Locality)": "Sub-District"
  }]"#;

  #[test]
  fn parses_json_rows() {
    let rows = parse_upload(JSON_UPLOAD.as_bytes()).unwrap();
    assert_eq!(rows, [NewFacility {
      facility_code: "123456".into(),
      facility_name: "Facility Name".into(),
      district:      "District".into(),
      subdistrict:   "Sub-District".into(),
      province:      "Province".into(),
      phase:         "D".into(),
    }]);
  }

  #[test]
  fn numeric_json_codes_become_text() {
    let rows = parse_upload(br#"[{"FacCode": 123456, "Facility": "A"}]"#).unwrap();
    assert_eq!(rows[0].facility_code, "123456");
    assert_eq!(rows[0].district, "");
  }

  #[test]
  fn parses_csv_with_short_subdistrict_header() {
    let upload = "\u{feff}FacCode,Facility,District,Sub-District,Province,Phase\n\
                  000123, Clinic A ,Vhembe,Thulamela,Limpopo,1\n\
                  000124,Clinic B,Vhembe,Makhado,Limpopo,2\n";
    let rows = parse_upload(upload.as_bytes()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].facility_code, "000123");
    assert_eq!(rows[0].facility_name, "Clinic A");
    assert_eq!(rows[1].subdistrict, "Makhado");
  }

  #[test]
  fn missing_code_names_the_row() {
    let upload = br#"[{"FacCode": "1"}, {"Facility": "No code"}]"#;
    let err = parse_upload(upload).unwrap_err();
    assert!(matches!(err, Error::MissingCode { row: 2 }));
  }

  #[test]
  fn malformed_uploads_are_rejected() {
    assert!(matches!(parse_upload(b"   "), Err(Error::EmptyUpload)));
    assert!(matches!(parse_upload(b"[{\"FacCode\": "), Err(Error::Json(_))));
    assert!(matches!(parse_upload(b"[1, 2]"), Err(Error::NotAnObject { row: 1 })));
    assert!(matches!(parse_upload(&[0xff, 0xfe, 0x00]), Err(Error::NotUtf8)));
  }
}
