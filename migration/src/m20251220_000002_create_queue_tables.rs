use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create queued_jobs table
        manager
            .create_table(
                Table::create()
                    .table(QueuedJobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QueuedJobs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(QueuedJobs::ProviderJobId).string())
                    .col(ColumnDef::new(QueuedJobs::Queue).string().not_null())
                    .col(ColumnDef::new(QueuedJobs::JobClass).string().not_null())
                    .col(ColumnDef::new(QueuedJobs::Arguments).json().not_null())
                    .col(ColumnDef::new(QueuedJobs::State).string().not_null())
                    .col(ColumnDef::new(QueuedJobs::ScheduledAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(QueuedJobs::EnqueuedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(QueuedJobs::WorkerId).uuid())
                    .to_owned(),
            )
            .await?;

        // Create queue_workers table
        manager
            .create_table(
                Table::create()
                    .table(QueueWorkers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QueueWorkers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(QueueWorkers::Hostname).string().not_null())
                    .col(
                        ColumnDef::new(QueueWorkers::Concurrency)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(QueueWorkers::Queues).json().not_null())
                    .col(
                        ColumnDef::new(QueueWorkers::LastHeartbeatAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QueueWorkers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(QueuedJobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum QueuedJobs {
    Table,
    Id,
    ProviderJobId,
    Queue,
    JobClass,
    Arguments,
    State,
    ScheduledAt,
    EnqueuedAt,
    WorkerId,
}

#[derive(DeriveIden)]
enum QueueWorkers {
    Table,
    Id,
    Hostname,
    Concurrency,
    Queues,
    LastHeartbeatAt,
}
