use std::sync::Arc;

use goodtables_core::Server;

/// Whether unhandled errors are forwarded to an error-reporting service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorReporting {
    Disabled,
    Enabled(String),
}

impl ErrorReporting {
    pub fn from_dsn(dsn: Option<&str>) -> Self {
        match dsn.map(str::trim) {
            Some(dsn) if !dsn.is_empty() => ErrorReporting::Enabled(dsn.to_owned()),
            _ => ErrorReporting::Disabled,
        }
    }

    pub fn apply(&self, server: &mut Server, reporter: &dyn ReporterFactory) {
        match self {
            ErrorReporting::Disabled => tracing::debug!("error reporting disabled"),
            ErrorReporting::Enabled(dsn) => reporter.connect(server, dsn),
        }
    }
}

/// Builds an error-reporting client for a server.
pub trait ReporterFactory {
    fn connect(&self, server: &mut Server, dsn: &str);
}

/// Reports errors that reach the server-error handler to Sentry. Handler
/// panics arrive there as internal errors, so the client installs no panic
/// hook of its own.
pub struct SentryReporter;

impl ReporterFactory for SentryReporter {
    fn connect(&self, server: &mut Server, dsn: &str) {
        let dsn: sentry::types::Dsn = match dsn.parse() {
            Ok(dsn) => dsn,
            Err(err) => {
                tracing::error!(error = %err, "invalid `SENTRY_DSN`, error reporting disabled");
                return;
            }
        };

        let guard = sentry::init(sentry::ClientOptions {
            dsn: Some(dsn),
            release: sentry::release_name!(),
            server_name: Some(server.config.server_name.clone().into()),
            ..Default::default()
        });

        // Keeps the client alive for as long as the server's handler table.
        let guard = Arc::new(guard);
        server.error_handlers_mut().observe(move |err| {
            if guard.is_enabled() {
                sentry::capture_error(err);
            }
        });

        tracing::info!("error reporting enabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_or_missing_dsn_disables_reporting() {
        assert_eq!(ErrorReporting::from_dsn(None), ErrorReporting::Disabled);
        assert_eq!(ErrorReporting::from_dsn(Some("")), ErrorReporting::Disabled);
        assert_eq!(ErrorReporting::from_dsn(Some("   ")), ErrorReporting::Disabled);
    }

    #[test]
    fn dsn_enables_reporting() {
        assert_eq!(
            ErrorReporting::from_dsn(Some("https://key@sentry.example.org/42")),
            ErrorReporting::Enabled("https://key@sentry.example.org/42".into())
        );
    }
}
