use goodtables_core::controller::{Controller, RouteGroup};

use crate::app::controller::{ApiController, SiteController, UserController};
use crate::app::integrations::{GithubController, S3Controller};

/// Route groups in registration order.
pub fn route_groups() -> Vec<RouteGroup> {
    vec![
        ApiController::group(),
        SiteController::group(),
        UserController::group(),
        GithubController::group(),
        S3Controller::group(),
    ]
}
