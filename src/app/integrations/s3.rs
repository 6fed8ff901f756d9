use std::sync::Arc;

use axum::{Extension, Json};
use goodtables_core::AppError;
use serde::Deserialize;

use crate::app::{database::SeaSession, entity::job, response::HookAccepted};

const INTEGRATION: &str = "s3";

/// Bucket event notification as delivered by S3.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct BucketEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<BucketRecord>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct BucketRecord {
    pub s3: BucketEntity,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct BucketEntity {
    pub bucket: Bucket,
    pub object: BucketObject,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct Bucket {
    pub name: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct BucketObject {
    pub key: String,
}

impl BucketRecord {
    fn source(&self) -> String {
        format!("s3://{}/{}", self.s3.bucket.name, self.s3.object.key)
    }
}

pub struct S3Controller;

#[goodtables_macros::controller(name = "s3", prefix = "/s3")]
impl S3Controller {
    /// Queues one job per record of a bucket notification.
    ///
    /// Requests carry no credentials. The route is meant to be reachable only
    /// from the notification relay (SNS or a Lambda forwarder inside the
    /// deployment's network) and must not be exposed publicly.
    #[goodtables_macros::post("/hook")]
    #[goodtables_macros::utoipa_response(status = 200, body = HookAccepted, description = "One job per object in the event")]
    pub async fn hook(
        Extension(session): Extension<Arc<SeaSession>>,
        Json(event): Json<BucketEvent>,
    ) -> Result<Json<HookAccepted>, AppError> {
        let mut jobs = Vec::with_capacity(event.records.len());
        if event.records.is_empty() {
            return Ok(Json(HookAccepted { jobs }));
        }

        let txn = session.transaction().await?;
        for record in &event.records {
            let source = record.source();
            let job = job::create(&*txn, INTEGRATION, &source).await?;
            tracing::info!(job = %job.id, source = %source, "queued s3 job");
            jobs.push(job.id);
        }

        Ok(Json(HookAccepted { jobs }))
    }
}
