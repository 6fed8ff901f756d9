use std::sync::Arc;

use axum::http::Extensions;
use sea_orm::DbErr;

/// Unit of work for a single request.
///
/// Opened by a [`SessionFactory`] when the request enters the server and
/// finished on every exit path: committed when the handler succeeds, rolled
/// back by the database error handler otherwise.
#[async_trait::async_trait]
pub trait DatabaseSession: Send + Sync {
    async fn commit(&self) -> Result<(), DbErr>;
    async fn rollback(&self) -> Result<(), DbErr>;
}

pub trait SessionFactory: Send + Sync {
    /// Opens the session for one request. Implementations may also place a
    /// typed handle in the request extensions for their own extractors.
    fn open(&self, extensions: &mut Extensions) -> Arc<dyn DatabaseSession>;
}
