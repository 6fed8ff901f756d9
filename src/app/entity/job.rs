use sea_orm::{ActiveValue::Set, entity::prelude::*};

pub const STATUS_CREATED: &str = "created";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "job")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub integration: String,
    pub source: String,
    pub status: String,
    pub created: DateTimeUtc,
    pub finished: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Queues a validation job for `source`, e.g. `owner/repo@sha` or `s3://bucket/key`.
pub async fn create<C>(db: &C, integration: &str, source: &str) -> Result<Model, DbErr>
where
    C: ConnectionTrait,
{
    ActiveModel {
        id: Set(Uuid::new_v4()),
        integration: Set(integration.to_owned()),
        source: Set(source.to_owned()),
        status: Set(STATUS_CREATED.to_owned()),
        created: Set(chrono::Utc::now()),
        finished: Set(None),
    }
    .insert(db)
    .await
}
