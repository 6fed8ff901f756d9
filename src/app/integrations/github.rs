use std::sync::Arc;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::Query,
    http::HeaderMap,
    response::Redirect,
};
use axum_extra::extract::{
    SignedCookieJar,
    cookie::{Cookie, SameSite},
};
use goodtables_core::{AppError, Integration, Server};
use hmac::{Hmac, KeyInit, Mac};
use serde::Deserialize;
use sha2::Sha256;
use uuid::Uuid;

use crate::app::{
    auth::{GITHUB, LoginSessions, OAuth},
    database::SeaSession,
    entity::job,
    response::HookAccepted,
};

const STATE_COOKIE: &str = "oauth_state";
const EVENT_HEADER: &str = "x-github-event";
const SIGNATURE_HEADER: &str = "x-hub-signature-256";

// Alias keeps utoipa from treating the raw body as a `ToSchema` request body.
type RawBody = Bytes;

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthorizedQuery {
    pub code: String,
    pub state: String,
}

#[derive(Deserialize)]
pub struct PushEvent {
    pub after: String,
    pub repository: Repository,
}

#[derive(Deserialize)]
pub struct Repository {
    pub full_name: String,
}

/// Checks webhook deliveries against the secret configured on the GitHub
/// side. Attached to the server as a request extension.
#[derive(Clone)]
pub struct GithubWebhook {
    secret: Arc<str>,
}

impl GithubWebhook {
    pub fn new(secret: &str) -> Self {
        GithubWebhook {
            secret: Arc::from(secret),
        }
    }

    /// Verifies the `X-Hub-Signature-256` HMAC of the raw request body.
    pub fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), AppError> {
        if self.secret.is_empty() {
            return Err(AppError::Forbidden("github webhook secret is not configured".into()));
        }

        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("sha256="))
            .ok_or_else(|| AppError::Forbidden("missing github webhook signature".into()))?;
        let signature = hex::decode(signature)
            .map_err(|_| AppError::Forbidden("malformed github webhook signature".into()))?;

        let mut mac = <Hmac<Sha256> as KeyInit>::new_from_slice(self.secret.as_bytes())
            .map_err(|err| AppError::internal(format!("cannot key webhook HMAC: {err}")))?;
        mac.update(body);
        mac.verify_slice(&signature)
            .map_err(|_| AppError::Forbidden("github webhook signature mismatch".into()))
    }
}

impl Integration for GithubWebhook {
    fn init_app(&self, server: &mut Server) {
        if self.secret.is_empty() {
            tracing::warn!("github webhook secret is empty, every delivery will be rejected");
        }
        let webhook = self.clone();
        server.layer_with(move |router| router.layer(Extension(webhook)));
    }
}

pub struct GithubController;

#[goodtables_macros::controller(name = "github", prefix = "/github")]
impl GithubController {
    #[goodtables_macros::get("/login")]
    pub async fn login(
        Extension(oauth): Extension<OAuth>,
        Extension(sessions): Extension<LoginSessions>,
        headers: HeaderMap,
    ) -> Result<(SignedCookieJar, Redirect), AppError> {
        let state = Uuid::new_v4().to_string();
        let url = oauth.authorize_url(GITHUB, &state)?;

        let jar = sessions.jar(&headers).add(
            Cookie::build((STATE_COOKIE, state))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax),
        );
        Ok((jar, Redirect::to(url.as_str())))
    }

    #[goodtables_macros::get("/authorized")]
    pub async fn authorized(
        Extension(oauth): Extension<OAuth>,
        Extension(sessions): Extension<LoginSessions>,
        headers: HeaderMap,
        Query(query): Query<AuthorizedQuery>,
    ) -> Result<(SignedCookieJar, Redirect), AppError> {
        let jar = sessions.jar(&headers);
        let expected = jar.get(STATE_COOKIE).map(|cookie| cookie.value().to_owned());
        let jar = jar.remove(Cookie::build(STATE_COOKIE).path("/"));

        if expected.as_deref() != Some(query.state.as_str()) {
            tracing::warn!("github login rejected: OAuth state mismatch");
            return Ok((jar, Redirect::to("/user/login")));
        }

        let token = oauth.exchange_code(GITHUB, &query.code).await?;
        let user = oauth.fetch_login(GITHUB, &token).await?;
        tracing::info!(user = %user, "logged in through github");

        Ok((sessions.login_user(jar, &user), Redirect::to("/")))
    }

    #[goodtables_macros::post("/hook")]
    #[goodtables_macros::utoipa_response(status = 200, body = HookAccepted, description = "Jobs queued for the event")]
    pub async fn hook(
        Extension(session): Extension<Arc<SeaSession>>,
        Extension(webhook): Extension<GithubWebhook>,
        headers: HeaderMap,
        body: RawBody,
    ) -> Result<Json<HookAccepted>, AppError> {
        if let Err(err) = webhook.verify(&headers, &body) {
            tracing::warn!(error = %err, "rejected github webhook delivery");
            return Err(err);
        }

        let kind = headers
            .get(EVENT_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("push");

        if kind != "push" {
            tracing::debug!(event = kind, "ignoring github event");
            return Ok(Json(HookAccepted { jobs: Vec::new() }));
        }

        let event: PushEvent = serde_json::from_slice(&body)
            .map_err(|err| AppError::BadRequest(format!("invalid push event: {err}")))?;
        let source = format!("{}@{}", event.repository.full_name, event.after);
        let txn = session.transaction().await?;
        let job = job::create(&*txn, GITHUB, &source).await?;
        tracing::info!(job = %job.id, source = %source, "queued github job");

        Ok(Json(HookAccepted { jobs: vec![job.id] }))
    }
}
