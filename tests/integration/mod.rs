mod helpers;

mod issue_repository_test;
mod lifecycle_repository_test;
mod metric_repository_test;
mod queue_backend_test;
