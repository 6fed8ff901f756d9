pub mod auth;
pub mod controller;
pub mod database;
pub mod entity;
pub mod errors;
pub mod integrations;
pub mod reporting;
pub mod response;
pub mod views;

#[cfg(test)]
pub mod testing;

use std::{path::PathBuf, sync::Arc};

use axum::http::{HeaderValue, Uri};
use goodtables_core::{Integration, Server, session::SessionFactory};

use crate::config::Settings;
use auth::{LoginManager, OAuth, ProviderConfig};
use database::Database;
use integrations::GithubWebhook;
use reporting::{ErrorReporting, ReporterFactory, SentryReporter};

pub const JSON_MIMETYPE: &str = "application/json; charset=utf-8";

/// Services the server is wired with.
pub struct Dependencies {
    pub oauth: Box<dyn Integration>,
    pub login: Box<dyn Integration>,
    pub reporter: Box<dyn ReporterFactory>,
    pub sessions: Option<Arc<dyn SessionFactory>>,
}

impl Dependencies {
    pub fn production(settings: &Settings, database: &Database) -> Self {
        Dependencies {
            oauth: Box::new(OAuth::new([ProviderConfig::github(
                settings.github_client_id.clone(),
                settings.github_client_secret.clone(),
            )])),
            login: Box::new(LoginManager),
            reporter: Box::new(SentryReporter),
            sessions: Some(database.sessions()),
        }
    }
}

/// Directory holding the front-end build and the page templates.
pub fn public_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("public")
}

/// Network location of `base_url` exactly as written, port included; empty
/// when it has none.
pub fn server_name_from(base_url: &str) -> String {
    let parsed = match base_url.strip_prefix("//") {
        Some(rest) => format!("http://{rest}").parse::<Uri>(),
        None => base_url.parse::<Uri>(),
    };

    parsed
        .ok()
        .and_then(|uri| uri.authority().map(|authority| authority.as_str().to_owned()))
        .unwrap_or_default()
}

fn url_scheme_from(base_url: &str) -> String {
    base_url
        .parse::<Uri>()
        .ok()
        .and_then(|uri| uri.scheme_str().map(str::to_owned))
        .unwrap_or_else(|| "http".to_owned())
}

/// Builds the fully wired server. Runs once at startup; calling it again on
/// the same dependencies registers everything a second time.
pub fn create_app(settings: &Settings, deps: Dependencies) -> Server {
    let public = public_dir();
    let mut server = Server::new(public.clone(), public);

    server.config.secret_key = settings.secret_key.clone();
    server.config.server_name = server_name_from(&settings.base_url);
    server.config.url_scheme = url_scheme_from(&settings.base_url);
    server.config.json_mimetype = HeaderValue::from_static(JSON_MIMETYPE);

    if let Some(sessions) = deps.sessions {
        server.set_session_factory(sessions);
    }

    deps.oauth.init_app(&mut server);
    deps.login.init_app(&mut server);
    GithubWebhook::new(settings.github_hook_secret.as_str()).init_app(&mut server);
    ErrorReporting::from_dsn(settings.sentry_dsn.as_deref()).apply(&mut server, deps.reporter.as_ref());

    for group in crate::routes::route_groups() {
        server.register(group);
    }

    errors::install_error_handlers(&mut server);

    tracing::info!(
        server_name = %server.config.server_name,
        groups = server.route_groups().len(),
        "application configured"
    );
    server
}
