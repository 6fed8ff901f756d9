use std::sync::Arc;

use axum::{Extension, extract::Path, response::Html};
use goodtables_core::AppError;
use sea_orm::EntityTrait;
use serde_json::json;
use uuid::Uuid;

use crate::app::{
    auth::CurrentUser, database::SeaSession, entity::job, response::JobView, views::render_component,
};

pub struct SiteController;

#[goodtables_macros::controller(name = "site", prefix = "/")]
impl SiteController {
    #[goodtables_macros::get("/")]
    pub async fn home(CurrentUser(user): CurrentUser) -> Result<Html<String>, AppError> {
        render_component("Home", json!({ "userName": user }))
    }

    #[goodtables_macros::get("/job/{job_id}")]
    pub async fn job(
        Extension(session): Extension<Arc<SeaSession>>,
        Path(job_id): Path<Uuid>,
    ) -> Result<Html<String>, AppError> {
        let txn = session.transaction().await?;
        let job = job::Entity::find_by_id(job_id)
            .one(&*txn)
            .await?
            .ok_or(AppError::NotFound)?;

        render_component("Job", json!({ "job": JobView::from(job) }))
    }
}
