use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::CONTENT_TYPE},
    middleware::Next,
    response::Response,
};

pub const JSON_MIMETYPE: &str = "application/json";

/// Replaces the plain JSON content type set by `axum::Json` with the
/// server's configured one.
pub async fn rewrite_json_mimetype(
    State(mimetype): State<HeaderValue>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    let is_plain_json = response
        .headers()
        .get(CONTENT_TYPE)
        .is_some_and(|value| value.as_bytes() == JSON_MIMETYPE.as_bytes());

    if is_plain_json {
        response.headers_mut().insert(CONTENT_TYPE, mimetype);
    }

    response
}

#[cfg(test)]
mod tests {
    use axum::{Json, Router, body::Body, http::Request, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn app(mimetype: &'static str) -> Router {
        Router::new()
            .route("/json", get(|| async { Json(serde_json::json!({"ok": true})) }))
            .route("/text", get(|| async { "plain" }))
            .layer(middleware::from_fn_with_state(
                HeaderValue::from_static(mimetype),
                rewrite_json_mimetype,
            ))
    }

    #[tokio::test]
    async fn json_responses_get_the_configured_mimetype() {
        let response = app("application/json; charset=utf-8")
            .oneshot(Request::builder().uri("/json").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn other_content_types_are_untouched() {
        let response = app("application/json; charset=utf-8")
            .oneshot(Request::builder().uri("/text").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
    }
}
