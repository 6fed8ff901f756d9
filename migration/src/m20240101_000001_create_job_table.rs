use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table("job")
                    .if_not_exists()
                    .col(pk_uuid("id"))
                    .col(string("integration").not_null())
                    .col(string("source").not_null())
                    .col(string("status").not_null())
                    .col(timestamp_with_time_zone("created").default(Expr::current_timestamp()).not_null())
                    .col(timestamp_with_time_zone_null("finished"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_job_created")
                    .table("job")
                    .col("created")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table("job").to_owned())
            .await
    }
}
