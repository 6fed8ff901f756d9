//! Fixtures for driving the assembled application router in tests.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Extensions, HeaderMap, HeaderValue, Request, StatusCode,
        header::{LOCATION, SET_COOKIE},
    },
    response::IntoResponse,
};
use axum_extra::extract::SignedCookieJar;
use goodtables_core::{
    Server,
    session::{DatabaseSession, SessionFactory},
};
use hmac::{Hmac, KeyInit, Mac};
use sea_orm::{DatabaseBackend, DatabaseConnection, DbErr, MockDatabase};
use serde_json::json;
use sha2::Sha256;
use tower::ServiceExt;

use super::{
    Dependencies,
    auth::{LoginManager, OAuth, ProviderConfig},
    create_app,
    database::Database,
    reporting::ReporterFactory,
    views,
};
use crate::config::Settings;

pub const SECRET_KEY: &str = "test-secret";
pub const HOOK_SECRET: &str = "hook-secret";

pub fn settings(sentry_dsn: Option<&str>) -> Settings {
    Settings {
        port: 3000,
        database_url: "postgres://localhost/goodtables".into(),
        secret_key: SECRET_KEY.into(),
        base_url: "https://goodtables.example.org".into(),
        sentry_dsn: sentry_dsn.map(str::to_owned),
        github_client_id: "client-id".into(),
        github_client_secret: "client-secret".into(),
        github_hook_secret: HOOK_SECRET.into(),
    }
}

/// Records `(dsn, server_name)` for every `connect` call.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    pub calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl ReporterFactory for RecordingReporter {
    fn connect(&self, server: &mut Server, dsn: &str) {
        self.calls
            .lock()
            .unwrap()
            .push((dsn.to_owned(), server.config.server_name.clone()));
    }
}

#[derive(Default)]
pub struct CountingSession {
    pub commits: AtomicUsize,
    pub rollbacks: AtomicUsize,
}

impl CountingSession {
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DatabaseSession for CountingSession {
    async fn commit(&self) -> Result<(), DbErr> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DbErr> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct SharedFactory(Arc<CountingSession>);

impl SessionFactory for SharedFactory {
    fn open(&self, _extensions: &mut Extensions) -> Arc<dyn DatabaseSession> {
        self.0.clone()
    }
}

pub fn counting_sessions(session: Arc<CountingSession>) -> Arc<dyn SessionFactory> {
    Arc::new(SharedFactory(session))
}

pub fn deps(reporter: RecordingReporter, sessions: Arc<dyn SessionFactory>) -> Dependencies {
    Dependencies {
        oauth: Box::new(OAuth::new([ProviderConfig::github("client-id", "client-secret")])),
        login: Box::new(LoginManager),
        reporter: Box::new(reporter),
        sessions: Some(sessions),
    }
}

pub fn server(sessions: Arc<dyn SessionFactory>) -> Server {
    create_app(&settings(None), deps(RecordingReporter::default(), sessions))
}

/// Mock connection with no prepared results. Any query made against it fails.
pub fn empty_database() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

/// Application router whose request sessions run on `conn`.
pub fn app(conn: DatabaseConnection) -> Router {
    server(Database::new(conn).sessions()).into_router()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|value| value.to_str().ok())
    }

    pub fn set_cookies(&self) -> Vec<&str> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

pub async fn send(router: Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    TestResponse {
        status,
        headers,
        body: String::from_utf8(body.to_vec()).unwrap(),
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// The page the error and site handlers render for `component` without props.
pub fn page(component: &str) -> String {
    views::render_component(component, json!({})).unwrap().0
}

/// `Cookie` request header carrying everything `jar` would set.
pub fn cookie_header(jar: SignedCookieJar) -> HeaderValue {
    let response = (jar, ()).into_response();
    let pairs: Vec<&str> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .collect();
    pairs.join("; ").parse().unwrap()
}

/// `X-Hub-Signature-256` value GitHub would send for `body`.
pub fn github_signature(secret: &str, body: &[u8]) -> String {
    let mut mac = <Hmac<Sha256> as KeyInit>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
