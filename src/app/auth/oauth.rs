use std::{collections::HashMap, sync::Arc};

use axum::Extension;
use goodtables_core::{AppError, Integration, Server};
use serde::Deserialize;
use url::Url;

pub const GITHUB: &str = "github";

#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub name: &'static str,
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: &'static str,
    pub token_url: &'static str,
    pub user_url: &'static str,
    pub scope: &'static str,
}

impl ProviderConfig {
    pub fn github(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        ProviderConfig {
            name: GITHUB,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authorize_url: "https://github.com/login/oauth/authorize",
            token_url: "https://github.com/login/oauth/access_token",
            user_url: "https://api.github.com/user",
            scope: "user:email,repo,admin:repo_hook,read:org",
        }
    }
}

/// OAuth client manager. Attached to the server as a request extension;
/// callback URLs are built from the server name at attach time.
#[derive(Clone)]
pub struct OAuth {
    providers: Arc<HashMap<&'static str, ProviderConfig>>,
    http: reqwest::Client,
    external_base: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct ProviderUser {
    login: String,
}

impl OAuth {
    pub fn new(providers: impl IntoIterator<Item = ProviderConfig>) -> Self {
        let providers = providers
            .into_iter()
            .map(|provider| (provider.name, provider))
            .collect();

        OAuth {
            providers: Arc::new(providers),
            http: reqwest::Client::new(),
            external_base: String::new(),
        }
    }

    fn provider(&self, name: &str) -> Result<&ProviderConfig, AppError> {
        self.providers
            .get(name)
            .ok_or_else(|| AppError::internal(format!("unknown OAuth provider `{name}`")))
    }

    pub fn redirect_uri(&self, provider: &str) -> String {
        format!("{}/{provider}/authorized", self.external_base)
    }

    pub fn authorize_url(&self, provider: &str, state: &str) -> Result<Url, AppError> {
        let config = self.provider(provider)?;
        Url::parse_with_params(
            config.authorize_url,
            [
                ("client_id", config.client_id.as_str()),
                ("redirect_uri", self.redirect_uri(provider).as_str()),
                ("scope", config.scope),
                ("state", state),
            ],
        )
        .map_err(|err| AppError::internal(format!("bad authorize URL for `{provider}`: {err}")))
    }

    /// Trades an authorization code for an access token.
    pub async fn exchange_code(&self, provider: &str, code: &str) -> Result<String, AppError> {
        let config = self.provider(provider)?;
        let redirect_uri = self.redirect_uri(provider);

        let token: TokenResponse = self
            .http
            .post(config.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(upstream)?
            .json()
            .await
            .map_err(upstream)?;

        Ok(token.access_token)
    }

    /// Login name of the user the access token belongs to.
    pub async fn fetch_login(&self, provider: &str, access_token: &str) -> Result<String, AppError> {
        let config = self.provider(provider)?;

        let user: ProviderUser = self
            .http
            .get(config.user_url)
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, "goodtables.io")
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(upstream)?
            .json()
            .await
            .map_err(upstream)?;

        Ok(user.login)
    }
}

fn upstream(err: reqwest::Error) -> AppError {
    AppError::Internal(anyhow::Error::new(err).context("OAuth provider request failed"))
}

impl Integration for OAuth {
    fn init_app(&self, server: &mut Server) {
        let mut oauth = self.clone();
        oauth.external_base = server.external_url("");
        tracing::debug!(providers = oauth.providers.len(), "attaching OAuth client manager");
        server.layer_with(move |router| router.layer(Extension(oauth)));
    }
}
