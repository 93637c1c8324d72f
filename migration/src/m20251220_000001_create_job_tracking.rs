use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create job_lifecycles table
        manager
            .create_table(
                Table::create()
                    .table(JobLifecycles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(JobLifecycles::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(JobLifecycles::JobId).uuid().not_null())
                    .col(ColumnDef::new(JobLifecycles::ProviderJobId).string())
                    .col(ColumnDef::new(JobLifecycles::JobClass).string().not_null())
                    .col(ColumnDef::new(JobLifecycles::Queue).string().not_null())
                    .col(ColumnDef::new(JobLifecycles::Status).string().not_null())
                    .col(
                        ColumnDef::new(JobLifecycles::LastTransitionAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(JobLifecycles::QueuedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(JobLifecycles::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(JobLifecycles::CompletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(JobLifecycles::FailedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(JobLifecycles::DiscardedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(JobLifecycles::RemovedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(JobLifecycles::ErrorClass).string())
                    .col(ColumnDef::new(JobLifecycles::ErrorMessage).text())
                    .col(ColumnDef::new(JobLifecycles::AccountId).uuid())
                    .col(ColumnDef::new(JobLifecycles::EntityId).uuid())
                    .col(ColumnDef::new(JobLifecycles::RelatedType).string())
                    .col(ColumnDef::new(JobLifecycles::RelatedId).uuid())
                    .col(ColumnDef::new(JobLifecycles::Metadata).json().not_null())
                    .col(
                        ColumnDef::new(JobLifecycles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(JobLifecycles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create execution_metrics table (append-only)
        manager
            .create_table(
                Table::create()
                    .table(ExecutionMetrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExecutionMetrics::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ExecutionMetrics::Queue).string().not_null())
                    .col(
                        ColumnDef::new(ExecutionMetrics::JobClass)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ExecutionMetrics::Status).string().not_null())
                    .col(ColumnDef::new(ExecutionMetrics::QueueWaitMs).big_integer())
                    .col(ColumnDef::new(ExecutionMetrics::ProcessingDurationMs).big_integer())
                    .col(ColumnDef::new(ExecutionMetrics::TotalTimeMs).big_integer())
                    .col(
                        ColumnDef::new(ExecutionMetrics::RetryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ExecutionMetrics::AccountId).uuid())
                    .col(ColumnDef::new(ExecutionMetrics::EntityId).uuid())
                    .col(
                        ColumnDef::new(ExecutionMetrics::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create issues table
        manager
            .create_table(
                Table::create()
                    .table(Issues::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Issues::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Issues::Fingerprint)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Issues::IssueType).string().not_null())
                    .col(ColumnDef::new(Issues::Source).string().not_null())
                    .col(ColumnDef::new(Issues::Severity).string().not_null())
                    .col(ColumnDef::new(Issues::Status).string().not_null())
                    .col(ColumnDef::new(Issues::Title).string().not_null())
                    .col(ColumnDef::new(Issues::Details).text())
                    .col(
                        ColumnDef::new(Issues::Occurrences)
                            .big_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Issues::FirstSeenAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Issues::LastSeenAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Issues::ResolvedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Issues::ResolutionNotes).text())
                    .col(ColumnDef::new(Issues::AccountId).uuid())
                    .col(ColumnDef::new(Issues::EntityId).uuid())
                    .col(ColumnDef::new(Issues::Metadata).json().not_null())
                    .to_owned(),
            )
            .await?;

        // Create job_failures table
        manager
            .create_table(
                Table::create()
                    .table(JobFailures::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(JobFailures::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(JobFailures::JobId).uuid().not_null())
                    .col(ColumnDef::new(JobFailures::ProviderJobId).string())
                    .col(ColumnDef::new(JobFailures::JobClass).string().not_null())
                    .col(ColumnDef::new(JobFailures::Queue).string().not_null())
                    .col(ColumnDef::new(JobFailures::FailureKind).string().not_null())
                    .col(ColumnDef::new(JobFailures::ErrorClass).string().not_null())
                    .col(ColumnDef::new(JobFailures::ErrorMessage).text().not_null())
                    .col(
                        ColumnDef::new(JobFailures::Retryable)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(JobFailures::Arguments).json().not_null())
                    .col(ColumnDef::new(JobFailures::AccountId).uuid())
                    .col(ColumnDef::new(JobFailures::EntityId).uuid())
                    .col(ColumnDef::new(JobFailures::RelatedType).string())
                    .col(ColumnDef::new(JobFailures::RelatedId).uuid())
                    .col(ColumnDef::new(JobFailures::PipelineRunId).uuid())
                    .col(
                        ColumnDef::new(JobFailures::FailedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(JobFailures::RetryState).json().not_null())
                    .col(
                        ColumnDef::new(JobFailures::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(JobFailures::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(JobFailures::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Issues::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExecutionMetrics::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(JobLifecycles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum JobLifecycles {
    Table,
    Id,
    JobId,
    ProviderJobId,
    JobClass,
    Queue,
    Status,
    LastTransitionAt,
    QueuedAt,
    StartedAt,
    CompletedAt,
    FailedAt,
    DiscardedAt,
    RemovedAt,
    ErrorClass,
    ErrorMessage,
    AccountId,
    EntityId,
    RelatedType,
    RelatedId,
    Metadata,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ExecutionMetrics {
    Table,
    Id,
    Queue,
    JobClass,
    Status,
    QueueWaitMs,
    ProcessingDurationMs,
    TotalTimeMs,
    RetryCount,
    AccountId,
    EntityId,
    RecordedAt,
}

#[derive(DeriveIden)]
enum Issues {
    Table,
    Id,
    Fingerprint,
    IssueType,
    Source,
    Severity,
    Status,
    Title,
    Details,
    Occurrences,
    FirstSeenAt,
    LastSeenAt,
    ResolvedAt,
    ResolutionNotes,
    AccountId,
    EntityId,
    Metadata,
}

#[derive(DeriveIden)]
enum JobFailures {
    Table,
    Id,
    JobId,
    ProviderJobId,
    JobClass,
    Queue,
    FailureKind,
    ErrorClass,
    ErrorMessage,
    Retryable,
    Arguments,
    AccountId,
    EntityId,
    RelatedType,
    RelatedId,
    PipelineRunId,
    FailedAt,
    RetryState,
    CreatedAt,
    UpdatedAt,
}
