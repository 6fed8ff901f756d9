use std::{any::Any, path::PathBuf, sync::Arc};

use axum::{
    Router,
    extract::{Request, State},
    handler::HandlerWithoutStateExt,
    http::HeaderValue,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    AppError,
    controller::RouteGroup,
    error::RaisedError,
    handlers::{ErrorContext, ErrorHandlers},
    response::{JSON_MIMETYPE, rewrite_json_mimetype},
    session::SessionFactory,
};

/// Something that plugs itself into a server before it starts serving.
pub trait Integration {
    fn init_app(&self, server: &mut Server);
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub static_dir: PathBuf,
    pub template_dir: PathBuf,
    pub secret_key: String,
    /// Host and optional port the server is reachable under.
    pub server_name: String,
    pub url_scheme: String,
    pub json_mimetype: HeaderValue,
}

type Layering = Box<dyn FnOnce(Router) -> Router + Send>;

/// Server instance under construction.
///
/// Everything registered here is applied in `into_router`, so layers added
/// by integrations wrap every route group regardless of registration order.
/// Nothing is deduplicated: registering a group twice mounts it twice.
pub struct Server {
    pub config: ServerConfig,
    groups: Vec<RouteGroup>,
    layers: Vec<Layering>,
    sessions: Option<Arc<dyn SessionFactory>>,
    error_handlers: ErrorHandlers,
}

impl Server {
    pub fn new(static_dir: impl Into<PathBuf>, template_dir: impl Into<PathBuf>) -> Self {
        Server {
            config: ServerConfig {
                static_dir: static_dir.into(),
                template_dir: template_dir.into(),
                secret_key: String::new(),
                server_name: String::new(),
                url_scheme: "http".into(),
                json_mimetype: HeaderValue::from_static(JSON_MIMETYPE),
            },
            groups: Vec::new(),
            layers: Vec::new(),
            sessions: None,
            error_handlers: ErrorHandlers::default(),
        }
    }

    pub fn register(&mut self, group: RouteGroup) {
        tracing::debug!(name = group.name, prefix = group.prefix, "registering route group");
        self.groups.push(group);
    }

    /// `(name, prefix)` of the registered groups, in registration order.
    pub fn route_groups(&self) -> Vec<(&'static str, &'static str)> {
        self.groups.iter().map(|g| (g.name, g.prefix)).collect()
    }

    pub fn layer_with<F>(&mut self, apply: F)
    where
        F: FnOnce(Router) -> Router + Send + 'static,
    {
        self.layers.push(Box::new(apply));
    }

    pub fn set_session_factory(&mut self, factory: Arc<dyn SessionFactory>) {
        self.sessions = Some(factory);
    }

    pub fn error_handlers_mut(&mut self) -> &mut ErrorHandlers {
        &mut self.error_handlers
    }

    /// Absolute URL for `path` under the configured server name.
    pub fn external_url(&self, path: &str) -> String {
        format!(
            "{}://{}{}",
            self.config.url_scheme, self.config.server_name, path
        )
    }

    pub fn into_router(self) -> Router {
        let Server {
            config,
            groups,
            layers,
            sessions,
            error_handlers,
        } = self;

        let mut router = Router::new();
        for group in groups {
            router = if group.is_root() {
                router.merge(group.router)
            } else {
                router.nest(group.prefix, group.router)
            };
        }

        let assets = ServeDir::new(&config.static_dir).not_found_service(not_found.into_service());
        router = router.nest_service("/static", assets).fallback(not_found);

        for apply in layers {
            router = apply(router);
        }

        let scope = RequestScope {
            sessions,
            handlers: Arc::new(error_handlers),
        };

        router
            .layer(middleware::from_fn_with_state(
                config.json_mimetype,
                rewrite_json_mimetype,
            ))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(middleware::from_fn_with_state(scope, request_scope))
            .layer(TraceLayer::new_for_http())
    }
}

async fn not_found() -> AppError {
    AppError::NotFound
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    };

    AppError::internal(format!("handler panicked: {detail}")).into_response()
}

#[derive(Clone)]
struct RequestScope {
    sessions: Option<Arc<dyn SessionFactory>>,
    handlers: Arc<ErrorHandlers>,
}

/// Opens the request's session, commits it when the handler succeeds and
/// otherwise hands the raised error and the session to the handler table.
/// A session that is neither committed nor rolled back is dropped unfinished.
async fn request_scope(
    State(scope): State<RequestScope>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = scope
        .sessions
        .as_ref()
        .map(|factory| factory.open(request.extensions_mut()));

    let mut response = next.run(request).await;

    let raised = match response.extensions_mut().remove::<RaisedError>() {
        Some(raised) => raised,
        None => {
            let Some(open) = &session else {
                return response;
            };
            match open.commit().await {
                Ok(()) => return response,
                Err(err) => RaisedError(Arc::new(AppError::Database(err))),
            }
        }
    };

    tracing::debug!(kind = ?raised.0.kind(), error = %raised.0, "dispatching raised error");

    scope
        .handlers
        .dispatch(ErrorContext {
            error: raised.0,
            session,
        })
        .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{
        body::{Body, to_bytes},
        http::{Extensions, StatusCode},
        routing::get,
    };
    use sea_orm::DbErr;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        ErrorKind,
        handlers::Outcome,
        session::DatabaseSession,
    };

    #[derive(Default)]
    struct CountingSession {
        commits: AtomicUsize,
        rollbacks: AtomicUsize,
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

    async fn explode() -> &'static str {
        panic!("unexpected")
    }

    fn server_with(session: Arc<CountingSession>) -> Server {
        let mut server = Server::new("public", "public");
        server.set_session_factory(Arc::new(SharedFactory(session)));

        let api = Router::new()
            .route("/ok", get(|| async { "fine" }))
            .route(
                "/broken",
                get(|| async { Err::<&str, _>(AppError::from(DbErr::Custom("broken".into()))) }),
            )
            .route("/panic", get(explode));
        server.register(RouteGroup::new("api", "/api", api));
        server.register(RouteGroup::new(
            "site",
            "/",
            Router::new().route("/", get(|| async { "home" })),
        ));

        let handlers = server.error_handlers_mut();
        handlers.register(ErrorKind::NotFound, |_ctx: ErrorContext| async {
            Outcome::Respond((StatusCode::NOT_FOUND, "missing").into_response())
        });
        handlers.register(ErrorKind::Internal, |_ctx: ErrorContext| async {
            Outcome::Respond((StatusCode::INTERNAL_SERVER_ERROR, "failed").into_response())
        });
        handlers.register(ErrorKind::Database, |ctx: ErrorContext| async move {
            if let Some(session) = &ctx.session {
                let _ = session.rollback().await;
            }
            Outcome::Reraise(ctx.error)
        });
        server
    }

    async fn get_path(router: Router, path: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn successful_requests_commit_the_session() {
        let session = Arc::new(CountingSession::default());
        let router = server_with(session.clone()).into_router();

        let (status, body) = get_path(router, "/api/ok").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "fine");
        assert_eq!(session.commits.load(Ordering::SeqCst), 1);
        assert_eq!(session.rollbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn root_groups_are_merged() {
        let router = server_with(Arc::default()).into_router();
        let (status, body) = get_path(router, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "home");
    }

    #[tokio::test]
    async fn unmatched_paths_go_through_the_not_found_handler() {
        let session = Arc::new(CountingSession::default());
        let router = server_with(session.clone()).into_router();

        let (status, body) = get_path(router, "/api/nothing-here").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "missing");
        assert_eq!(session.commits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_static_files_are_not_found() {
        let router = server_with(Arc::default()).into_router();
        let (status, body) = get_path(router, "/static/no-such-asset.js").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "missing");
    }

    #[tokio::test]
    async fn database_errors_roll_back_then_reach_internal_handler() {
        let session = Arc::new(CountingSession::default());
        let router = server_with(session.clone()).into_router();

        let (status, body) = get_path(router, "/api/broken").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "failed");
        assert_eq!(session.rollbacks.load(Ordering::SeqCst), 1);
        assert_eq!(session.commits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn panics_are_internal_errors() {
        let router = server_with(Arc::default()).into_router();
        let (status, body) = get_path(router, "/api/panic").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "failed");
    }

    #[test]
    fn registration_is_not_deduplicated() {
        let mut server = Server::new("public", "public");
        server.register(RouteGroup::new("user", "/user", Router::new()));
        server.register(RouteGroup::new("user", "/user", Router::new()));
        assert_eq!(server.route_groups(), vec![("user", "/user"), ("user", "/user")]);
    }

    #[test]
    fn external_url_uses_server_name() {
        let mut server = Server::new("public", "public");
        server.config.server_name = "goodtables.io".into();
        server.config.url_scheme = "https".into();
        assert_eq!(
            server.external_url("/github/authorized"),
            "https://goodtables.io/github/authorized"
        );
    }
}
