use uuid::Uuid;

use crate::app::entity::job;

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct JobView {
    pub id: Uuid,
    pub integration: String,
    pub source: String,
    pub status: String,
    pub created: chrono::DateTime<chrono::Utc>,
    pub finished: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<job::Model> for JobView {
    fn from(model: job::Model) -> Self {
        JobView {
            id: model.id,
            integration: model.integration,
            source: model.source,
            status: model.status,
            created: model.created,
            finished: model.finished,
        }
    }
}

/// Jobs queued in response to an integration webhook.
#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct HookAccepted {
    pub jobs: Vec<Uuid>,
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct UserView {
    pub user: Option<String>,
}
