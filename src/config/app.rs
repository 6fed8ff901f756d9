use goodtables_core::config::ConfigBuilder;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Process settings, read once at startup.
#[derive(Clone, Debug)]
pub struct Settings {
    pub port: u16,
    pub database_url: String,
    pub secret_key: String,
    pub base_url: String,
    /// `None` when `SENTRY_DSN` is unset or blank.
    pub sentry_dsn: Option<String>,
    pub github_client_id: String,
    pub github_client_secret: String,
    /// Shared secret GitHub signs webhook deliveries with. Empty rejects
    /// every delivery.
    pub github_hook_secret: String,
}

impl Settings {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = match lookup("SERVER_PORT") {
            None => {
                tracing::warn!("cannot read `SERVER_PORT` defaulting to `{DEFAULT_PORT}`");
                DEFAULT_PORT
            }
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                tracing::error!("cannot parse `SERVER_PORT`. defaulting to {DEFAULT_PORT} {:?}", err);
                DEFAULT_PORT
            }),
        };

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("cannot read `DATABASE_URL`"))?;

        let secret_key = lookup("FLASK_SECRET_KEY").unwrap_or_else(|| {
            tracing::warn!("`FLASK_SECRET_KEY` is not set, cookies are signed with an empty secret");
            String::new()
        });

        let base_url = lookup("BASE_URL").unwrap_or_else(|| {
            tracing::warn!("cannot read `BASE_URL` defaulting to `{DEFAULT_BASE_URL}`");
            DEFAULT_BASE_URL.into()
        });

        let github_hook_secret = lookup("GITHUB_HOOK_SECRET").unwrap_or_else(|| {
            tracing::warn!("`GITHUB_HOOK_SECRET` is not set, github webhooks will be rejected");
            String::new()
        });

        let sentry_dsn = lookup("SENTRY_DSN").filter(|dsn| !dsn.trim().is_empty());

        Ok(Settings {
            port,
            database_url,
            secret_key,
            base_url,
            sentry_dsn,
            github_client_id: lookup("GITHUB_CLIENT_ID").unwrap_or_default(),
            github_client_secret: lookup("GITHUB_CLIENT_SECRET").unwrap_or_default(),
            github_hook_secret,
        })
    }
}

impl ConfigBuilder for Settings {
    fn build() -> anyhow::Result<Self> {
        Settings::from_lookup(|key| std::env::var(key).ok())
    }
}
