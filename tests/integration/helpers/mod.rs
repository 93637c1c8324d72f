use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;

/// 内存SQLite测试库，跑完整迁移
///
/// 单连接池：内存库按连接隔离，多连接会看到不同的空库
pub async fn test_db() -> Arc<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options.max_connections(1).sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("sqlite in-memory connection");
    Migrator::up(&db, None).await.expect("migrations apply");
    Arc::new(db)
}
