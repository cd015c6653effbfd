//! Shared harness for the HTTP integration tests: an in-memory database, a
//! temporary upload directory, a recording mailer and request helpers that
//! drive the router with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use dossier_api::auth::hash_password;
use dossier_api::config::Config;
use dossier_api::mailer::{Mailer, OutgoingEmail};
use dossier_api::state::{AppState, AppStateInner};
use dossier_api::storage::Storage;
use dossier_db::{Database, NewUser};
use dossier_types::Role;

pub const PASSWORD: &str = "password123";
pub const PDF: &str = "application/pdf";

pub const ALL_TYPES: [&str; 7] = [
    "businessLicense",
    "taxCertificate",
    "bankStatement",
    "identityDocument",
    "complianceCertificate",
    "insuranceCertificate",
    "financialStatement",
];

/// Keeps every message instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Token from the most recent message sent to `to`.
    pub fn last_token_for(&self, to: &str) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let email = sent.iter().rev().find(|e| e.to == to)?;
        let start = email.html.find("token=")? + "token=".len();
        Some(
            email.html[start..]
                .chars()
                .take_while(|c| c.is_ascii_hexdigit())
                .collect(),
        )
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, email: OutgoingEmail) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    _tmp: TempDir,
}

pub fn test_config(upload_dir: PathBuf) -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        db_path: ":memory:".into(),
        upload_dir,
        jwt_secret: "integration-test-secret".into(),
        token_ttl_days: 7,
        max_upload_bytes: 10 * 1024 * 1024,
        cors_origin: "http://localhost:3000".into(),
        public_url: "http://localhost:5000".into(),
        frontend_url: "http://localhost:3000".into(),
        environment: "test".into(),
        bootstrap_admin: None,
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path().join("uploads"));
        let db = Database::open_in_memory().unwrap();
        let storage = Storage::new(config.upload_dir.clone()).await.unwrap();
        let mailer = Arc::new(RecordingMailer::default());

        let state = AppStateInner::new(db, storage, config, mailer.clone());
        let router = dossier_api::router(state.clone());

        Self {
            router,
            state,
            mailer,
            _tmp: tmp,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let req = request(Method::GET, uri, token)
            .body(Body::empty())
            .unwrap();
        into_json(self.send(req).await).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let req = request(Method::POST, uri, token)
            .body(Body::empty())
            .unwrap();
        into_json(self.send(req).await).await
    }

    pub async fn post_json(&self, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        self.json(Method::POST, uri, body, token).await
    }

    pub async fn put_json(&self, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        self.json(Method::PUT, uri, body, token).await
    }

    async fn json(&self, method: Method, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        let req = request(method, uri, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        into_json(self.send(req).await).await
    }

    /// Multipart upload of one document.
    pub async fn upload(
        &self,
        token: &str,
        document_type: &str,
        file_name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> (StatusCode, Value) {
        let req = request(Method::POST, "/api/onboarding/upload", Some(token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(document_type, file_name, mime_type, bytes)))
            .unwrap();
        into_json(self.send(req).await).await
    }

    /// Creates an active user directly in the database and logs in through
    /// the API. Returns the session token and user id.
    pub async fn login_as(&self, email: &str, role: Role) -> (String, Uuid) {
        let id = Uuid::new_v4();
        let hash = hash_password(PASSWORD).unwrap();
        self.state
            .db
            .create_user(&NewUser {
                id,
                email,
                password_hash: &hash,
                first_name: "Test",
                last_name: "User",
                company: Some("Acme"),
                role,
                is_email_verified: true,
                verification_token: None,
            })
            .unwrap();

        let (status, body) = self
            .post_json(
                "/api/auth/login",
                serde_json::json!({ "email": email, "password": PASSWORD }),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        (body["token"].as_str().unwrap().to_string(), id)
    }

    /// Uploads one small PDF for every requirement.
    pub async fn upload_all(&self, token: &str) {
        for ty in ALL_TYPES {
            let (status, body) = self
                .upload(token, ty, &format!("{ty}.pdf"), PDF, b"%PDF-1.4 test")
                .await;
            assert_eq!(status, StatusCode::OK, "upload {ty} failed: {body}");
        }
    }

    pub fn stored_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.state.storage.dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }
}

const BOUNDARY: &str = "dossier-test-boundary";

fn multipart_body(document_type: &str, file_name: &str, mime_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"documentType\"\r\n\r\n{document_type}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"document\"; filename=\"{file_name}\"\r\nContent-Type: {mime_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn request(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn into_json(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = body_bytes(response).await;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Asserts the standard error envelope and returns the `error` object.
pub fn assert_error(body: &Value, code: &str) -> Value {
    assert_eq!(body["success"], false, "not an error envelope: {body}");
    assert_eq!(body["error"]["code"], code, "unexpected error: {body}");
    assert!(body["timestamp"].is_string());
    body["error"].clone()
}
