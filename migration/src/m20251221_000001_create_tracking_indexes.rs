use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_job_lifecycles_job_id")
                    .table(JobLifecycles::Table)
                    .col(JobLifecycles::JobId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_job_lifecycles_provider_job_id")
                    .table(JobLifecycles::Table)
                    .col(JobLifecycles::ProviderJobId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_execution_metrics_queue_recorded_at")
                    .table(ExecutionMetrics::Table)
                    .col(ExecutionMetrics::Queue)
                    .col(ExecutionMetrics::RecordedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_job_failures_failed_at")
                    .table(JobFailures::Table)
                    .col(JobFailures::FailedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_queued_jobs_queue_state")
                    .table(QueuedJobs::Table)
                    .col(QueuedJobs::Queue)
                    .col(QueuedJobs::State)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_queued_jobs_queue_state").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_job_failures_failed_at").to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_execution_metrics_queue_recorded_at")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_job_lifecycles_provider_job_id")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(Index::drop().name("idx_job_lifecycles_job_id").to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum JobLifecycles {
    Table,
    JobId,
    ProviderJobId,
}

#[derive(DeriveIden)]
enum ExecutionMetrics {
    Table,
    Queue,
    RecordedAt,
}

#[derive(DeriveIden)]
enum JobFailures {
    Table,
    FailedAt,
}

#[derive(DeriveIden)]
enum QueuedJobs {
    Table,
    Queue,
    State,
}
