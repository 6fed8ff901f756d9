use axum::{
    Extension, Json,
    http::HeaderMap,
    response::{Html, Redirect},
};
use axum_extra::extract::SignedCookieJar;
use goodtables_core::AppError;
use serde_json::json;

use crate::app::{
    auth::{CurrentUser, LoginSessions},
    response::UserView,
    views::render_component,
};

pub struct UserController;

#[goodtables_macros::controller(name = "user", prefix = "/user")]
impl UserController {
    #[goodtables_macros::get("/login")]
    pub async fn login() -> Result<Html<String>, AppError> {
        render_component("Login", json!({ "githubLoginUrl": "/github/login" }))
    }

    #[goodtables_macros::get("/logout")]
    pub async fn logout(
        Extension(sessions): Extension<LoginSessions>,
        headers: HeaderMap,
    ) -> (SignedCookieJar, Redirect) {
        let jar = sessions.logout_user(sessions.jar(&headers));
        (jar, Redirect::to("/"))
    }

    #[goodtables_macros::get("/me")]
    #[goodtables_macros::utoipa_response(UserView)]
    pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserView> {
        Json(UserView { user })
    }
}
