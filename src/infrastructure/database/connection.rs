// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::config::settings::DatabaseSettings;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;
use tracing::debug;

/// 配置缺省时的连接池参数
const DEFAULT_MAX_CONNECTIONS: u32 = 50;
const DEFAULT_MIN_CONNECTIONS: u32 = 5;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_IDLE_SECS: u64 = 300;

/// 创建数据库连接池并验证连通性
///
/// # 参数
///
/// * `settings` - 数据库配置
///
/// # 返回值
///
/// * `Ok(DatabaseConnection)` - 已通过ping验证的连接池
/// * `Err(DbErr)` - 连接或验证失败
pub async fn create_pool(settings: &DatabaseSettings) -> Result<DatabaseConnection, DbErr> {
    let connect_timeout = settings.connect_timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);

    let mut options = ConnectOptions::new(settings.url.to_owned());
    options
        .max_connections(settings.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS))
        .min_connections(settings.min_connections.unwrap_or(DEFAULT_MIN_CONNECTIONS))
        .connect_timeout(Duration::from_secs(connect_timeout))
        .acquire_timeout(Duration::from_secs(connect_timeout))
        .idle_timeout(Duration::from_secs(
            settings.idle_timeout.unwrap_or(DEFAULT_IDLE_SECS),
        ))
        .max_lifetime(Duration::from_secs(3600))
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    db.ping().await?;
    debug!("Database pool ready");
    Ok(db)
}
