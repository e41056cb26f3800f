//! Router tests against an in-memory SQLite store with stub collaborators.

use std::sync::{
  Arc, Mutex,
  atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use smartgate_core::{
  identity::{Identity, NewIdentity, Role},
  store::RecordStore,
};
use smartgate_store_sqlite::SqliteStore;
use tower::ServiceExt as _;
use uuid::Uuid;

use super::*;
use crate::{
  auth::hash_password,
  notify::{EmailMessage, NotifyError},
  recognition::RecognitionError,
};

const PASSWORD: &str = "secret123";

// ─── Stubs ────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct StubRecognizer {
  matched: Mutex<Option<Uuid>>,
  down:    AtomicBool,
}

impl StubRecognizer {
  fn will_match(&self, id: Option<Uuid>) { *self.matched.lock().unwrap() = id; }
}

#[async_trait]
impl FaceRecognizer for StubRecognizer {
  async fn recognize(&self, _image: &str) -> Result<Option<Uuid>, RecognitionError> {
    if self.down.load(Ordering::SeqCst) {
      return Err(RecognitionError::Timeout);
    }
    let matched = *self.matched.lock().unwrap();
    Ok(matched)
  }

  async fn encode(
    &self,
    image: &str,
    subject_id: Uuid,
  ) -> Result<Option<String>, RecognitionError> {
    if self.down.load(Ordering::SeqCst) {
      return Err(RecognitionError::Timeout);
    }
    if image == "no-face" {
      return Ok(None);
    }
    Ok(Some(format!("enc-{subject_id}")))
  }
}

#[derive(Default)]
struct StubNotifier {
  sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl Notifier for StubNotifier {
  async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
    self.sent.lock().unwrap().push(message.clone());
    Ok(())
  }
}

// ─── Fixture ──────────────────────────────────────────────────────────────────

async fn seed(store: &SqliteStore, name: &str, email: &str, role: Role, hash: &str) -> Identity {
  store
    .add_identity(NewIdentity::new(name, email, role, hash))
    .await
    .unwrap()
    .unwrap()
}

struct Fixture {
  state:      AppState<SqliteStore>,
  recognizer: Arc<StubRecognizer>,
  notifier:   Arc<StubNotifier>,
  admin:      Identity,
  john:       Identity,
  jane:       Identity,
}

impl Fixture {
  async fn new() -> Self {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let hash = hash_password(PASSWORD).unwrap();

    let admin = seed(&store, "System Administrator", "admin@company.com", Role::Admin, &hash).await;
    let john = seed(&store, "John Doe", "john.doe@company.com", Role::Staff, &hash).await;
    let jane = seed(&store, "Jane Smith", "jane.smith@company.com", Role::Staff, &hash).await;

    let recognizer = Arc::new(StubRecognizer::default());
    let notifier = Arc::new(StubNotifier::default());
    let state = AppState::new(
      store,
      TokenIssuer::new("test-secret", Duration::hours(24)),
      recognizer.clone(),
      notifier.clone(),
      ApiSettings { email_domain: "company.com".into() },
    );

    Self { state, recognizer, notifier, admin, john, jane }
  }

  fn token(&self, who: &Identity) -> String { self.state.tokens.issue(who, Utc::now()).unwrap() }

  async fn send(
    &self,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    router(self.state.clone())
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap()
  }

  async fn json(
    &self,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let resp = self.send(method, uri, token, body).await;
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
  }
}

// ─── Auth ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_returns_token_and_user() {
  let fx = Fixture::new().await;
  let (status, body) = fx
    .json(
      "POST",
      "/api/auth/login",
      None,
      Some(json!({ "email": " Admin@Company.com ", "password": PASSWORD })),
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["user"]["email"], "admin@company.com");
  assert_eq!(body["user"]["role"], "admin");
  assert_eq!(body["user"]["id"], fx.admin.subject_id.to_string());
  assert!(body["user"]["createdAt"].is_string());
  assert!(body["user"].get("password_hash").is_none());

  let token = body["token"].as_str().unwrap();
  let claims = fx.state.tokens.verify(token, Utc::now()).unwrap();
  assert_eq!(claims.sub, fx.admin.subject_id);
}

#[tokio::test]
async fn login_with_bad_credentials_is_401() {
  let fx = Fixture::new().await;
  let (status, body) = fx
    .json(
      "POST",
      "/api/auth/login",
      None,
      Some(json!({ "email": "admin@company.com", "password": "wrong" })),
    )
    .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert!(body["error"].is_string());

  let (status, _) = fx
    .json(
      "POST",
      "/api/auth/login",
      None,
      Some(json!({ "email": "nobody@company.com", "password": PASSWORD })),
    )
    .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn validate_requires_a_valid_token() {
  let fx = Fixture::new().await;
  let (status, _) = fx.json("GET", "/api/auth/validate", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _) = fx.json("GET", "/api/auth/validate", Some("a.b.c"), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let token = fx.token(&fx.john);
  let (status, body) = fx.json("GET", "/api/auth/validate", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["user"]["name"], "John Doe");
}

// ─── Recognition ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn recognize_without_image_is_400() {
  let fx = Fixture::new().await;
  let (status, _) = fx.json("POST", "/api/auth/recognize", None, Some(json!({}))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unrecognized_face_records_nothing() {
  let fx = Fixture::new().await;
  fx.recognizer.will_match(None);
  let (status, body) = fx
    .json("POST", "/api/auth/recognize", None, Some(json!({ "image": "data:image/png;base64,AAAA" })))
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["recognized"], false);
  assert_eq!(body["message"], "Face not recognized");
  assert!(body.get("token").is_none());
}

#[tokio::test]
async fn recognized_face_checks_in_then_out() {
  let fx = Fixture::new().await;
  fx.recognizer.will_match(Some(fx.jane.subject_id));

  let (status, first) = fx
    .json("POST", "/api/auth/recognize", None, Some(json!({ "image": "AAAA" })))
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(first["recognized"], true);
  assert_eq!(first["message"], "Welcome, Jane Smith!");
  assert!(first["token"].is_string());
  assert_eq!(first["attendance"]["status"], "present");
  assert_eq!(first["attendance"]["method"], "face-recognition");
  assert!(first["attendance"]["checkOut"].is_null());

  let (_, second) = fx
    .json("POST", "/api/auth/recognize", None, Some(json!({ "image": "AAAA" })))
    .await;
  assert_eq!(second["attendance"]["id"], first["attendance"]["id"]);
  assert_eq!(second["attendance"]["checkIn"], first["attendance"]["checkIn"]);
  assert!(second["attendance"]["checkOut"].is_string());

  let (_, third) = fx
    .json("POST", "/api/auth/recognize", None, Some(json!({ "image": "AAAA" })))
    .await;
  assert_eq!(third["attendance"], second["attendance"]);
}

#[tokio::test]
async fn recognition_outage_is_503() {
  let fx = Fixture::new().await;
  fx.recognizer.down.store(true, Ordering::SeqCst);
  let (status, _) = fx
    .json("POST", "/api/auth/recognize", None, Some(json!({ "image": "AAAA" })))
    .await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn match_for_unknown_subject_is_not_recognized() {
  let fx = Fixture::new().await;
  fx.recognizer.will_match(Some(Uuid::new_v4()));
  let (status, body) = fx
    .json("POST", "/api/auth/recognize", None, Some(json!({ "image": "AAAA" })))
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["recognized"], false);
}

// ─── Staff ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn staff_endpoints_require_admin() {
  let fx = Fixture::new().await;
  let token = fx.token(&fx.john);
  let (status, _) = fx.json("GET", "/api/users/staff", Some(&token), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = fx
    .json("POST", "/api/users/staff", Some(&token), Some(json!({ "name": "Eve" })))
    .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn list_staff_excludes_admins() {
  let fx = Fixture::new().await;
  let token = fx.token(&fx.admin);
  let (status, body) = fx.json("GET", "/api/users/staff", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  let names: Vec<&str> = body.as_array().unwrap().iter().map(|u| u["name"].as_str().unwrap()).collect();
  assert_eq!(names.len(), 2);
  assert!(names.contains(&"John Doe") && names.contains(&"Jane Smith"));
}

#[tokio::test]
async fn registered_staff_can_log_in_with_generated_password() {
  let fx = Fixture::new().await;
  let token = fx.token(&fx.admin);
  let (status, body) = fx
    .json(
      "POST",
      "/api/users/staff",
      Some(&token),
      Some(json!({ "name": "Ada Lovelace", "email": "Ada@Company.com", "department": "R&D" })),
    )
    .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["credentials"]["email"], "ada@company.com");
  assert_eq!(body["user"]["role"], "staff");
  assert_eq!(body["user"]["department"], "R&D");

  let password = body["credentials"]["password"].as_str().unwrap().to_string();
  assert_eq!(password.len(), 10);

  let (status, _) = fx
    .json(
      "POST",
      "/api/auth/login",
      None,
      Some(json!({ "email": "ada@company.com", "password": password })),
    )
    .await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn registering_taken_email_is_409() {
  let fx = Fixture::new().await;
  let token = fx.token(&fx.admin);
  let (status, _) = fx
    .json(
      "POST",
      "/api/users/staff",
      Some(&token),
      Some(json!({ "name": "Another John", "email": "john.doe@company.com" })),
    )
    .await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn registering_without_email_generates_one() {
  let fx = Fixture::new().await;
  let token = fx.token(&fx.admin);
  let (status, body) = fx
    .json("POST", "/api/users/staff", Some(&token), Some(json!({ "name": "Grace Hopper" })))
    .await;
  assert_eq!(status, StatusCode::CREATED);
  let email = body["credentials"]["email"].as_str().unwrap();
  assert!(email.starts_with("grace.hopper"), "{email}");
  assert!(email.ends_with("@company.com"), "{email}");
}

#[tokio::test]
async fn send_credentials_hands_message_to_notifier() {
  let fx = Fixture::new().await;
  let token = fx.token(&fx.admin);
  let (status, _) = fx
    .json(
      "POST",
      "/api/users/staff/send-email",
      Some(&token),
      Some(json!({ "email": "john.doe@company.com", "name": "John Doe", "password": "Xy7#pQ2!ab" })),
    )
    .await;
  assert_eq!(status, StatusCode::OK);

  let sent = fx.notifier.sent.lock().unwrap().clone();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].to, "john.doe@company.com");
  assert!(sent[0].text.contains("Xy7#pQ2!ab"));

  let (status, _) = fx
    .json(
      "POST",
      "/api/users/staff/send-email",
      Some(&token),
      Some(json!({ "email": "john.doe@company.com", "name": "John Doe" })),
    )
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn face_encoding_is_stored_on_caller() {
  let fx = Fixture::new().await;
  let token = fx.token(&fx.john);
  let (status, body) = fx
    .json("POST", "/api/users/face-encoding", Some(&token), Some(json!({ "image": "AAAA" })))
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["user"]["faceEncoding"], format!("enc-{}", fx.john.subject_id));

  let (status, _) = fx
    .json("POST", "/api/users/face-encoding", Some(&token), Some(json!({ "image": "no-face" })))
    .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ─── Attendance ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn manual_marks_follow_lifecycle() {
  let fx = Fixture::new().await;
  let token = fx.token(&fx.admin);
  let id = fx.john.subject_id;

  let (status, first) = fx
    .json(
      "POST",
      "/api/attendance/mark",
      Some(&token),
      Some(json!({ "subjectId": id, "at": "2024-05-01T09:00:00Z" })),
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(first["method"], "manual");
  assert_eq!(first["userName"], "John Doe");

  let (_, second) = fx
    .json(
      "POST",
      "/api/attendance/mark",
      Some(&token),
      Some(json!({ "subjectId": id, "at": "2024-05-01T17:30:00Z" })),
    )
    .await;
  assert_eq!(second["workingHours"], 8.5);

  let (_, third) = fx
    .json(
      "POST",
      "/api/attendance/mark",
      Some(&token),
      Some(json!({ "subjectId": id, "at": "2024-05-01T18:00:00Z" })),
    )
    .await;
  assert_eq!(third, second);
}

#[tokio::test]
async fn mark_rejects_bad_input() {
  let fx = Fixture::new().await;
  let token = fx.token(&fx.admin);

  let (status, _) = fx
    .json(
      "POST",
      "/api/attendance/mark",
      Some(&token),
      Some(json!({ "subjectId": fx.john.subject_id, "at": "yesterday" })),
    )
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = fx
    .json("POST", "/api/attendance/mark", Some(&token), Some(json!({ "subjectId": Uuid::new_v4() })))
    .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let staff = fx.token(&fx.jane);
  let (status, _) = fx
    .json("POST", "/api/attendance/mark", Some(&staff), Some(json!({ "subjectId": fx.jane.subject_id })))
    .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn user_attendance_is_self_or_admin() {
  let fx = Fixture::new().await;
  let admin = fx.token(&fx.admin);
  fx.json(
    "POST",
    "/api/attendance/mark",
    Some(&admin),
    Some(json!({ "subjectId": fx.john.subject_id })),
  )
  .await;

  let uri = format!("/api/attendance/user/{}", fx.john.subject_id);
  let john = fx.token(&fx.john);
  let (status, body) = fx.json("GET", &uri, Some(&john), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["attendance"].as_array().unwrap().len(), 1);
  assert_eq!(body["todayStatus"], "present");
  assert_eq!(body["todayAttendance"]["userName"], "John Doe");

  let jane = fx.token(&fx.jane);
  let (status, _) = fx.json("GET", &uri, Some(&jane), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let jane_uri = format!("/api/attendance/user/{}", fx.jane.subject_id);
  let (status, body) = fx.json("GET", &jane_uri, Some(&admin), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["todayStatus"], "absent");
  assert!(body["todayAttendance"].is_null());
}

#[tokio::test]
async fn summary_and_all_filter_by_day() {
  let fx = Fixture::new().await;
  let token = fx.token(&fx.admin);
  for at in ["2024-05-01T09:00:00Z", "2024-05-01T17:00:00Z"] {
    fx.json(
      "POST",
      "/api/attendance/mark",
      Some(&token),
      Some(json!({ "subjectId": fx.john.subject_id, "at": at })),
    )
    .await;
  }
  fx.json(
    "POST",
    "/api/attendance/mark",
    Some(&token),
    Some(json!({ "subjectId": fx.jane.subject_id, "at": "2024-05-02T09:00:00Z" })),
  )
  .await;

  let (status, summary) = fx
    .json("GET", "/api/attendance/summary?date=2024-05-01", Some(&token), None)
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(summary, json!({ "date": "2024-05-01", "totalStaff": 2, "present": 1, "absent": 1 }));

  let (_, day) = fx.json("GET", "/api/attendance/all?date=2024-05-02", Some(&token), None).await;
  assert_eq!(day.as_array().unwrap().len(), 1);
  assert_eq!(day[0]["userName"], "Jane Smith");

  let (_, all) = fx.json("GET", "/api/attendance/all", Some(&token), None).await;
  assert_eq!(all.as_array().unwrap().len(), 2);
  assert_eq!(all[0]["date"], "2024-05-02");
}

#[tokio::test]
async fn export_serves_csv() {
  let fx = Fixture::new().await;
  let token = fx.token(&fx.admin);
  fx.json(
    "POST",
    "/api/attendance/mark",
    Some(&token),
    Some(json!({ "subjectId": fx.john.subject_id, "at": "2024-05-01T09:00:00Z" })),
  )
  .await;

  let resp = fx
    .send("GET", "/api/attendance/export?date=2024-05-01", Some(&token), None)
    .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let ct = resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
  assert!(ct.starts_with("text/csv"), "{ct}");
  let cd = resp.headers().get(header::CONTENT_DISPOSITION).unwrap().to_str().unwrap();
  assert!(cd.contains("attendance-2024-05-01.csv"), "{cd}");

  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let text = String::from_utf8(bytes.to_vec()).unwrap();
  let lines: Vec<&str> = text.lines().collect();
  assert_eq!(lines, vec![
    "Name,Date,Check In,Check Out,Working Hours,Status",
    "John Doe,2024-05-01,09:00,,,present",
  ]);
}
