use axum::{Extension, extract::FromRequestParts, http::HeaderMap, http::request::Parts};
use axum_extra::extract::{
    SignedCookieJar,
    cookie::{Cookie, Key, SameSite},
};
use goodtables_core::{AppError, Integration, Server};

const SESSION_COOKIE: &str = "session";

/// Attaches cookie-backed login sessions to a server.
///
/// The signing key is derived from the server's secret key when attached,
/// so the secret has to be set before `init_app` runs.
pub struct LoginManager;

impl Integration for LoginManager {
    fn init_app(&self, server: &mut Server) {
        let sessions = LoginSessions::new(&server.config.secret_key);
        server.layer_with(move |router| router.layer(Extension(sessions)));
    }
}

/// Request extension for reading and changing who is logged in.
#[derive(Clone)]
pub struct LoginSessions {
    key: Key,
}

impl LoginSessions {
    pub fn new(secret: &str) -> Self {
        LoginSessions {
            key: super::signing_key(secret),
        }
    }

    pub fn jar(&self, headers: &HeaderMap) -> SignedCookieJar {
        SignedCookieJar::from_headers(headers, self.key.clone())
    }

    pub fn login_user(&self, jar: SignedCookieJar, user: &str) -> SignedCookieJar {
        jar.add(
            Cookie::build((SESSION_COOKIE, user.to_owned()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax),
        )
    }

    pub fn logout_user(&self, jar: SignedCookieJar) -> SignedCookieJar {
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    }

    pub fn current_user(&self, headers: &HeaderMap) -> Option<String> {
        self.jar(headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_owned())
    }
}

/// The logged-in user's name, if any.
pub struct CurrentUser(pub Option<String>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(sessions) = parts.extensions.get::<LoginSessions>() else {
            tracing::error!("no LoginSessions Extension available");
            return Err(AppError::internal("login manager is not attached"));
        };

        Ok(CurrentUser(sessions.current_user(&parts.headers)))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::header::{COOKIE, SET_COOKIE};
    use axum::response::{IntoResponse, Response};

    use super::*;

    fn cookie_header(jar: SignedCookieJar) -> HeaderMap {
        let response: Response = (jar, ()).into_response();
        let mut headers = HeaderMap::new();
        for value in response.headers().get_all(SET_COOKIE) {
            let pair = value.to_str().unwrap().split(';').next().unwrap().to_owned();
            headers.append(COOKIE, pair.parse().unwrap());
        }
        headers
    }

    #[test]
    fn logged_in_user_round_trips_through_signed_cookie() {
        let sessions = LoginSessions::new("s3cret");
        let jar = sessions.login_user(sessions.jar(&HeaderMap::new()), "octocat");

        let headers = cookie_header(jar);

        assert_eq!(sessions.current_user(&headers).as_deref(), Some("octocat"));
    }

    #[test]
    fn cookies_signed_with_another_secret_are_ignored() {
        let signer = LoginSessions::new("s3cret");
        let jar = signer.login_user(signer.jar(&HeaderMap::new()), "octocat");
        let headers = cookie_header(jar);

        assert_eq!(LoginSessions::new("different").current_user(&headers), None);
    }

    #[test]
    fn nobody_is_logged_in_without_a_cookie() {
        assert_eq!(LoginSessions::new("s3cret").current_user(&HeaderMap::new()), None);
    }
}
