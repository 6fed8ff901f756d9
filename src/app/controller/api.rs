use std::sync::Arc;

use axum::{Extension, Json, extract::Path};
use goodtables_core::AppError;
use sea_orm::{EntityTrait, QueryOrder, QuerySelect};
use uuid::Uuid;

use crate::app::{database::SeaSession, entity::job, response::JobView};

const JOB_LIST_LIMIT: u64 = 50;

pub struct ApiController;

#[goodtables_macros::controller(name = "api", prefix = "/api")]
impl ApiController {
    #[goodtables_macros::get("/job")]
    #[goodtables_macros::utoipa_response(status = 200, body = Vec<JobView>, description = "Most recent jobs first")]
    pub async fn list_jobs(
        Extension(session): Extension<Arc<SeaSession>>,
    ) -> Result<Json<Vec<JobView>>, AppError> {
        let txn = session.transaction().await?;
        let jobs = job::Entity::find()
            .order_by_desc(job::Column::Created)
            .limit(JOB_LIST_LIMIT)
            .all(&*txn)
            .await?;

        Ok(Json(jobs.into_iter().map(JobView::from).collect()))
    }

    #[goodtables_macros::get("/job/{job_id}")]
    #[goodtables_macros::utoipa_response(status = 200, body = JobView, description = "Job found")]
    #[goodtables_macros::utoipa_response(status = 404, description = "No such job")]
    pub async fn get_job(
        Extension(session): Extension<Arc<SeaSession>>,
        Path(job_id): Path<Uuid>,
    ) -> Result<Json<JobView>, AppError> {
        let txn = session.transaction().await?;
        let job = job::Entity::find_by_id(job_id)
            .one(&*txn)
            .await?
            .ok_or(AppError::NotFound)?;

        Ok(Json(job.into()))
    }

    #[goodtables_macros::get("/openapi.json")]
    pub async fn openapi() -> Json<utoipa::openapi::OpenApi> {
        Json(crate::docs::api_doc())
    }
}
