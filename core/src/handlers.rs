use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use axum::response::{IntoResponse, Response};

use crate::{AppError, ErrorKind, session::DatabaseSession};

/// What an error handler decided to do with the error it was given.
pub enum Outcome {
    Respond(Response),
    /// Hand the error on to the generic internal-error handler.
    Reraise(Arc<AppError>),
}

#[derive(Clone)]
pub struct ErrorContext {
    pub error: Arc<AppError>,
    /// Session of the failed request, if the server opens sessions.
    pub session: Option<Arc<dyn DatabaseSession>>,
}

type HandlerFuture = Pin<Box<dyn Future<Output = Outcome> + Send>>;
type Handler = Arc<dyn Fn(ErrorContext) -> HandlerFuture + Send + Sync>;
type Observer = Arc<dyn Fn(&AppError) + Send + Sync>;

/// Table mapping an error kind to the handler that turns it into a response.
///
/// Built once at startup. Registering a second handler for the same kind
/// replaces the first one.
#[derive(Clone, Default)]
pub struct ErrorHandlers {
    handlers: HashMap<ErrorKind, Handler>,
    observers: Vec<Observer>,
}

impl ErrorHandlers {
    pub fn register<F, Fut>(&mut self, kind: ErrorKind, handler: F)
    where
        F: Fn(ErrorContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |ctx| Box::pin(handler(ctx)));
        self.handlers.insert(kind, handler);
    }

    /// Observers see each error that ends up at the `Internal` handler, once,
    /// before that handler runs. They cannot change the response.
    pub fn observe<F>(&mut self, observer: F)
    where
        F: Fn(&AppError) + Send + Sync + 'static,
    {
        self.observers.push(Arc::new(observer));
    }

    pub fn is_registered(&self, kind: ErrorKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Resolves a raised error into the response sent to the client.
    ///
    /// A re-raised error continues to the `Internal` handler. A database error
    /// with no handler of its own goes there directly. Without a matching
    /// handler the response is the bare status of the kind. Errors answered
    /// before reaching `Internal` (not-found, rejected requests) are never
    /// passed to observers.
    pub async fn dispatch(&self, mut ctx: ErrorContext) -> Response {
        let mut kind = ctx.error.kind();
        loop {
            if kind == ErrorKind::Internal {
                for observer in &self.observers {
                    observer(&ctx.error);
                }
            }

            match self.handlers.get(&kind) {
                Some(handler) => match handler(ctx.clone()).await {
                    Outcome::Respond(response) => return response,
                    Outcome::Reraise(error) => ctx.error = error,
                },
                None if kind == ErrorKind::Database => {}
                None => break,
            }

            if kind == ErrorKind::Internal {
                break;
            }
            kind = ErrorKind::Internal;
        }

        kind.status().into_response()
    }
}
