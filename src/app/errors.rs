use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use goodtables_core::{
    ErrorKind, Server,
    handlers::{ErrorContext, Outcome},
};
use serde_json::json;

use super::views::render_component;

pub fn install_error_handlers(server: &mut Server) {
    let handlers = server.error_handlers_mut();
    handlers.register(ErrorKind::NotFound, not_found_error);
    handlers.register(ErrorKind::Internal, server_error);
    handlers.register(ErrorKind::Database, rollback_session);
}

async fn not_found_error(_ctx: ErrorContext) -> Outcome {
    Outcome::Respond(render_error("Error404", StatusCode::NOT_FOUND))
}

async fn server_error(ctx: ErrorContext) -> Outcome {
    tracing::error!(error = %ctx.error, kind = ?ctx.error.kind(), "unhandled server error");
    Outcome::Respond(render_error("Error500", StatusCode::INTERNAL_SERVER_ERROR))
}

/// Rolls back the failed request's session, then re-raises the error
/// unchanged for the generic handler.
pub async fn rollback_session(ctx: ErrorContext) -> Outcome {
    tracing::info!("Database session rollback by server error handler");
    if let Some(session) = &ctx.session {
        if let Err(err) = session.rollback().await {
            tracing::warn!(error = %err, "database session rollback failed");
        }
    }
    Outcome::Reraise(ctx.error)
}

fn render_error(component: &str, status: StatusCode) -> Response {
    match render_component(component, json!({})) {
        Ok(page) => (status, page).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "cannot render error page");
            status.into_response()
        }
    }
}
