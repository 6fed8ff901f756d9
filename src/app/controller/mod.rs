mod api;
mod site;
mod user;

pub use api::{ApiController, ApiControllerApi};
pub use site::{SiteController, SiteControllerApi};
pub use user::{UserController, UserControllerApi};
