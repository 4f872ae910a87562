//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use malaria24_core::{
  actor::{NewActor, Role},
  case::NewCase,
  facility::NewFacility,
  mail::MemoryOutbox,
  store::MalariaStore,
  user::NewUser,
};
use malaria24_notify::{NotifyContext, spawn_notifier};
use malaria24_store_sqlite::SqliteStore;
use rand_core::OsRng;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tower::ServiceExt as _;

use crate::{
  AppState,
  error::{NOT_AUTHENTICATED, PERMISSION_DENIED},
  router,
};

type TestState = AppState<SqliteStore, MemoryOutbox>;

struct Harness {
  state:  TestState,
  outbox: MemoryOutbox,
  pool:   JoinHandle<()>,
}

impl Harness {
  async fn new() -> Self {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let outbox = MemoryOutbox::new();
    let mailer = Arc::new(outbox.clone());

    let ctx = NotifyContext::new(Arc::clone(&store), Arc::clone(&mailer));
    let (notifier, pool) = spawn_notifier(Arc::new(ctx), 1, 16);

    add_user(&store, "user", true).await;
    add_user(&store, "plain", false).await;

    Self { state: AppState { store, mailer, notifier }, outbox, pool }
  }

  fn store(&self) -> &SqliteStore { &self.state.store }

  async fn send(&self, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = router(self.state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
  }

  async fn send_json(&self, req: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = self.send(req).await;
    (status, serde_json::from_slice(&body).unwrap())
  }

  /// Drop every notifier handle and wait for queued jobs to finish.
  async fn drain(self) -> MemoryOutbox {
    let Self { state, outbox, pool } = self;
    drop(state);
    pool.await.unwrap();
    outbox
  }
}

async fn add_user(store: &SqliteStore, username: &str, is_staff: bool) {
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(b"pass", &salt)
    .unwrap()
    .to_string();
  store
    .add_user(NewUser {
      username:      username.into(),
      email:         format!("{username}@example.org"),
      password_hash: hash,
      is_staff,
    })
    .await
    .unwrap();
}

fn basic(user: &str, pass: &str) -> String {
  format!("Basic {}", B64.encode(format!("{user}:{pass}")))
}

fn post_json(uri: &str, auth: Option<&str>, body: &str) -> Request<Body> {
  let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
  if let Some(auth) = auth {
    builder = builder.header(header::AUTHORIZATION, auth);
  }
  builder.body(Body::from(body.to_owned())).unwrap()
}

fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
  let mut builder = Request::get(uri);
  if let Some(auth) = auth {
    builder = builder.header(header::AUTHORIZATION, auth);
  }
  builder.body(Body::empty()).unwrap()
}

const BOUNDARY: &str = "malaria24-test-boundary";

fn upload_request(auth: Option<&str>, file: Option<&str>, wipe: &str) -> Request<Body> {
  let file = file.map(|body| ("facilities.json", "application/json", body));
  upload_file_request(auth, file, wipe)
}

/// `file` is `(filename, content type, body)`.
fn upload_file_request(
  auth: Option<&str>,
  file: Option<(&str, &str, &str)>,
  wipe: &str,
) -> Request<Body> {
  let mut body = String::new();
  if let Some((filename, content_type, file)) = file {
    body.push_str(&format!(
      "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"upload\"; \
       filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n{file}\r\n"
    ));
  }
  body.push_str(&format!(
    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"wipe\"\r\n\r\n{wipe}\r\n--{BOUNDARY}--\r\n"
  ));

  let mut builder = Request::post("/admin/facilities/upload").header(
    header::CONTENT_TYPE,
    format!("multipart/form-data; boundary={BOUNDARY}"),
  );
  if let Some(auth) = auth {
    builder = builder.header(header::AUTHORIZATION, auth);
  }
  builder.body(Body::from(body)).unwrap()
}

const FACILITIES: &str = r#"[{
  "District": "District",
  "FacCode": "123456",
  "Facility": "Facility Name",
  "Phase": "D",
  "Province": "Province",
  "Sub-District (Locality)": "Sub-District"
}]"#;

fn facility(code: &str, subdistrict: &str) -> NewFacility {
  NewFacility {
    facility_code: code.into(),
    facility_name: "Facility".into(),
    district:      "District".into(),
    subdistrict:   subdistrict.into(),
    province:      "Province".into(),
    phase:         "Phase".into(),
  }
}

// ─── Inbound SMS ─────────────────────────────────────────────────────────────

const INBOUND: &str = r#"{
  "message_id": "c2c5a129da554bd2b799e391883d893d",
  "from": "+27111111111",
  "to": "+27222222222",
  "channel_id": "test_channel",
  "timestamp": "2016-04-26 10:28:02.123456",
  "content": "test message"
}"#;

#[tokio::test]
async fn inbound_requires_authentication() {
  let h = Harness::new().await;
  let (status, body) = h.send_json(post_json("/api/v1/inbound/", None, INBOUND)).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body, json!({ "detail": NOT_AUTHENTICATED }));
  assert!(h.store().list_inbound().await.unwrap().is_empty());
}

#[tokio::test]
async fn inbound_rejects_wrong_password() {
  let h = Harness::new().await;
  let req = post_json("/api/v1/inbound/", Some(&basic("user", "nope")), INBOUND);
  let (status, _) = h.send(req).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn inbound_is_recorded() {
  let h = Harness::new().await;
  let req = post_json("/api/v1/inbound/", Some(&basic("plain", "pass")), INBOUND);
  let (status, body) = h.send_json(req).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["message_id"], "c2c5a129da554bd2b799e391883d893d");
  assert_eq!(body["from"], "+27111111111");
  assert_eq!(body["to"], "+27222222222");

  let stored = h.store().list_inbound().await.unwrap();
  assert_eq!(stored.len(), 1);
  assert_eq!(stored[0].content, "test message");
  assert_eq!(stored[0].channel_id, "test_channel");
  assert!(stored[0].timestamp.is_some());
}

#[tokio::test]
async fn inbound_accepts_blank_content() {
  let h = Harness::new().await;
  let body = r#"{"message_id": "abc", "from": "+27111111111", "content": ""}"#;
  let req = post_json("/api/v1/inbound/", Some(&basic("user", "pass")), body);
  let (status, _) = h.send(req).await;
  assert_eq!(status, StatusCode::CREATED);

  let stored = h.store().list_inbound().await.unwrap();
  assert_eq!(stored.len(), 1);
  assert_eq!(stored[0].content, "");
}

#[tokio::test]
async fn inbound_without_message_id_is_rejected() {
  let h = Harness::new().await;
  let body = r#"{"from": "+27111111111", "content": "hello"}"#;
  let req = post_json("/api/v1/inbound/", Some(&basic("user", "pass")), body);
  let (status, body) = h.send_json(req).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body, json!({ "message_id": ["This field is required."] }));
  assert!(h.store().list_inbound().await.unwrap().is_empty());
}

#[tokio::test]
async fn inbound_bad_timestamp_is_rejected() {
  let h = Harness::new().await;
  let body = r#"{"message_id": "abc", "timestamp": "26/04/2016 10:28"}"#;
  let req = post_json("/api/v1/inbound/", Some(&basic("user", "pass")), body);
  let (status, body) = h.send_json(req).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body, json!({ "timestamp": ["Datetime has wrong format."] }));
  assert!(h.store().list_inbound().await.unwrap().is_empty());
}

#[tokio::test]
async fn inbound_keeps_long_optional_fields() {
  let h = Harness::new().await;
  let content = "x".repeat(1500);
  let body = json!({ "message_id": "abc", "from": "y".repeat(300), "content": content }).to_string();
  let req = post_json("/api/v1/inbound/", Some(&basic("user", "pass")), &body);
  let (status, _) = h.send(req).await;
  assert_eq!(status, StatusCode::CREATED);

  let stored = h.store().list_inbound().await.unwrap();
  assert_eq!(stored[0].content, content);
  assert_eq!(stored[0].sender.len(), 300);
}

#[tokio::test]
async fn inbound_malformed_json_is_a_bad_request() {
  let h = Harness::new().await;
  let req = post_json("/api/v1/inbound/", Some(&basic("user", "pass")), "{not json");
  let (status, body) = h.send_json(req).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["detail"].as_str().unwrap().starts_with("JSON parse error - "));
}

// ─── Read API ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn facility_lookup_returns_the_record() {
  let h = Harness::new().await;
  h.store().upsert_facility(facility("123456", "Subdistrict")).await.unwrap();

  let (status, body) = h.send_json(get("/api/v1/facility/123456/", None)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(
    body,
    json!({
      "facility_code": "123456",
      "facility_name": "Facility",
      "district": "District",
      "subdistrict": "Subdistrict",
      "province": "Province",
      "phase": "Phase",
    })
  );
}

#[tokio::test]
async fn unknown_facility_is_not_found() {
  let h = Harness::new().await;
  let (status, body) = h.send_json(get("/api/v1/facility/foo/", None)).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body, json!({ "detail": "Not found." }));
}

#[tokio::test]
async fn localities_lists_subdistricts_of_the_district() {
  let h = Harness::new().await;
  h.store().upsert_facility(facility("123456", "Subdistrict 1")).await.unwrap();
  h.store().upsert_facility(facility("654321", "Subdistrict 2")).await.unwrap();
  h.store().upsert_facility(facility("000000", "Subdistrict 2")).await.unwrap();

  let (status, body) = h.send_json(get("/api/v1/localities/123456/", None)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!(["Subdistrict 1", "Subdistrict 2"]));

  let (status, _) = h.send(get("/api/v1/localities/foo/", None)).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Facility upload ─────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_imports_and_emails_the_uploader() {
  let h = Harness::new().await;
  let req = upload_request(Some(&basic("user", "pass")), Some(FACILITIES), "false");
  let (status, body) = h.send_json(req).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "created": 1, "updated": 0, "wiped": 0 }));

  let stored = h.store().get_facility("123456").await.unwrap().unwrap();
  assert_eq!(stored.facility_name, "Facility Name");
  assert_eq!(stored.subdistrict, "Sub-District");

  let sent = h.outbox.sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].subject, "Facilities import complete.");
  assert_eq!(sent[0].to, ["user@example.org"]);
}

#[tokio::test]
async fn reupload_keeps_the_key_unless_wiped() {
  let h = Harness::new().await;
  let (original, _) = h.store().upsert_facility(facility("123456", "Old")).await.unwrap();
  let auth = basic("user", "pass");

  let (status, _) = h.send(upload_request(Some(&auth), Some(FACILITIES), "false")).await;
  assert_eq!(status, StatusCode::OK);
  let updated = h.store().get_facility("123456").await.unwrap().unwrap();
  assert_eq!(updated.id, original.id);
  assert_eq!(updated.facility_name, "Facility Name");

  let (status, body) = h.send_json(upload_request(Some(&auth), Some(FACILITIES), "on")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["wiped"], 1);
  let replaced = h.store().get_facility("123456").await.unwrap().unwrap();
  assert_ne!(replaced.id, original.id);
  assert_eq!(h.outbox.len(), 2);
}

#[tokio::test]
async fn upload_requires_staff() {
  let h = Harness::new().await;

  let (status, body) = h.send_json(upload_request(None, Some(FACILITIES), "false")).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["detail"], NOT_AUTHENTICATED);

  let req = upload_request(Some(&basic("plain", "pass")), Some(FACILITIES), "false");
  let (status, body) = h.send_json(req).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["detail"], PERMISSION_DENIED);

  assert!(h.store().list_facilities().await.unwrap().is_empty());
  assert!(h.outbox.is_empty());
}

#[tokio::test]
async fn malformed_upload_is_rejected_without_writes() {
  let h = Harness::new().await;
  h.store().upsert_facility(facility("123456", "Old")).await.unwrap();

  let req = upload_request(Some(&basic("user", "pass")), Some("[{\"Facility\": \"x\"}"), "true");
  let (status, body) = h.send_json(req).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["upload"].is_array());

  assert_eq!(h.store().list_facilities().await.unwrap().len(), 1);
  assert!(h.outbox.is_empty());
}

#[tokio::test]
async fn csv_upload_is_imported() {
  let h = Harness::new().await;
  let csv = "FacCode,Facility,District,Sub-District,Province,Phase\r\n\
             123456,Facility Name,District,Sub-District,Province,D\r\n\
             654321,Other,District,,Province,D\r\n";
  let file = Some(("facilities.csv", "text/csv", csv));
  let (status, body) = h.send_json(upload_file_request(Some(&basic("user", "pass")), file, "no")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "created": 2, "updated": 0, "wiped": 0 }));

  let stored = h.store().get_facility("123456").await.unwrap().unwrap();
  assert_eq!(stored.subdistrict, "Sub-District");
  assert_eq!(stored.phase, "D");
  assert_eq!(h.outbox.len(), 1);
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
  let h = Harness::new().await;
  let (status, body) = h.send_json(upload_request(Some(&basic("user", "pass")), None, "false")).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body, json!({ "upload": ["No file was submitted."] }));
}

// ─── Cases ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn new_case_is_stored_and_reported() {
  let h = Harness::new().await;
  h.store().upsert_facility(facility("123456", "Subdistrict")).await.unwrap();
  h.store()
    .upsert_actor(NewActor {
      name:          "EHP".into(),
      email:         "ehp@example.org".into(),
      phone_number:  "+27000000000".into(),
      role:          Role::Ehp,
      district:      "District".into(),
      province:      "Province".into(),
      facility_code: Some("123456".into()),
    })
    .await
    .unwrap();

  let body = r#"{"facility_code": "123456", "first_name": "Sam", "msisdn": "+27111111111"}"#;
  let req = post_json("/api/v1/cases/", Some(&basic("plain", "pass")), body);
  let (status, body) = h.send_json(req).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["facility_code"], "123456");
  assert_eq!(body["reported_by"], "plain");

  let outbox = h.drain().await;
  let sent = outbox.sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].to, ["ehp@example.org"]);
  assert_eq!(sent[0].subject, "Malaria case report: Facility");
  assert_eq!(sent[0].attachments.len(), 1);
}

#[tokio::test]
async fn case_without_facility_code_is_rejected() {
  let h = Harness::new().await;
  let req = post_json("/api/v1/cases/", Some(&basic("user", "pass")), r#"{"first_name": "Sam"}"#);
  let (status, body) = h.send_json(req).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body, json!({ "facility_code": ["This field is required."] }));
}

// ─── EHP report preview ──────────────────────────────────────────────────────

#[tokio::test]
async fn ehp_report_renders_html_for_staff() {
  let h = Harness::new().await;
  h.store().upsert_facility(facility("123456", "Subdistrict")).await.unwrap();
  let mut input = NewCase::new("123456");
  input.first_name = "Sam".into();
  let case = h.store().create_case(input).await.unwrap();

  let uri = format!("/admin/ehp_report/{}/", case.id);
  let (status, body) = h.send(get(&uri, Some(&basic("user", "pass")))).await;
  assert_eq!(status, StatusCode::OK);
  let html = String::from_utf8(body).unwrap();
  assert!(html.contains("Malaria case report: Facility"));
  assert!(html.contains("<td>Sam</td>"));

  let (status, _) = h.send(get(&uri, Some(&basic("plain", "pass")))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let missing = format!("/admin/ehp_report/{}/", case.id + 1);
  let (status, _) = h.send(get(&missing, Some(&basic("user", "pass")))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ehp_report_with_non_numeric_key_is_not_found() {
  let h = Harness::new().await;
  let (status, body) = h.send_json(get("/admin/ehp_report/abc/", Some(&basic("user", "pass")))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body, json!({ "detail": "Not found." }));

  let (status, _) = h.send(get("/admin/ehp_report/abc/", None)).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}
