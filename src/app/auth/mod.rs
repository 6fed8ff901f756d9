mod login;
mod oauth;

pub use login::{CurrentUser, LoginManager, LoginSessions};
pub use oauth::{GITHUB, OAuth, ProviderConfig};

use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

/// Cookie signing key derived from the server's secret.
fn signing_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(&digest[..])
}
