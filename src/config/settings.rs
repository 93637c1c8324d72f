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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含数据库、服务器、队列监控、资源准入、预测与重试等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 服务器配置
    pub server: ServerSettings,
    /// 队列监控配置
    pub queues: QueueSettings,
    /// 资源准入配置
    pub admission: AdmissionSettings,
    /// 队列预测配置
    pub forecast: ForecastSettings,
    /// 自动重试配置
    pub retry: RetrySettings,
    /// 健康巡检配置
    pub health: HealthSettings,
}

/// 数据库配置设置
#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 服务器配置设置
#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 队列监控配置设置
#[derive(Debug, Deserialize, Clone)]
pub struct QueueSettings {
    /// 纳入仪表盘与巡检的队列名称
    pub monitored: Vec<String>,
}

/// 资源准入配置设置
///
/// 三个阈值相互独立，任一超限即判定系统过载
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct AdmissionSettings {
    /// 单核负载上限（1分钟平均负载 / CPU核数）
    pub max_load_per_core: f64,
    /// 最小可用内存（MB）
    pub min_available_memory_mb: u64,
    /// 队列深度上限
    pub max_queue_depth: u64,
}

/// 队列预测配置设置
#[derive(Debug, Deserialize, Clone)]
pub struct ForecastSettings {
    /// 历史样本回看窗口（小时）
    pub lookback_hours: i64,
    /// 参与统计的样本条数上限
    pub sample_limit: u64,
    /// 快照缓存TTL（秒）
    pub cache_ttl_seconds: u64,
    /// 无样本时的单项处理耗时兜底值（毫秒）
    pub default_per_item_ms: i64,
    /// 使用中位数所需的最小样本量
    pub min_samples: usize,
    /// 高置信度所需样本量
    pub high_confidence_samples: usize,
    /// 高置信度所需每小时完成量
    pub high_confidence_hourly: u64,
    /// 中置信度所需每小时完成量
    pub medium_confidence_hourly: u64,
}

/// 自动重试配置设置
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct RetrySettings {
    /// 单批最多入队的重试数
    pub batch_limit: usize,
    /// 每条失败记录的自动重试次数上限
    pub max_attempts: u32,
    /// 两次自动重试之间的冷却时间（分钟）
    pub cooldown_minutes: i64,
    /// 候选失败记录的回看窗口（小时）
    pub scan_window_hours: i64,
    /// 批处理循环间隔（秒）
    pub interval_seconds: u64,
}

/// 健康巡检配置设置
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct HealthSettings {
    /// 巡检循环间隔（秒）
    pub interval_seconds: u64,
    /// 运行中任务多久无状态转移视为卡住（分钟）
    pub stuck_after_minutes: i64,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从配置文件与环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Start with default settings
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            // Default DB pool settings
            .set_default("database.url", "postgres://localhost/jobpulse")?
            .set_default("database.max_connections", 50)?
            .set_default("database.min_connections", 5)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Default monitored queues
            .set_default("queues.monitored", vec!["default".to_string()])?
            // Default admission thresholds
            .set_default("admission.max_load_per_core", 1.5)?
            .set_default("admission.min_available_memory_mb", 512)?
            .set_default("admission.max_queue_depth", 220)?
            // Default forecast settings
            .set_default("forecast.lookback_hours", 24)?
            .set_default("forecast.sample_limit", 500)?
            .set_default("forecast.cache_ttl_seconds", 20)?
            .set_default("forecast.default_per_item_ms", 30_000)?
            .set_default("forecast.min_samples", 8)?
            .set_default("forecast.high_confidence_samples", 60)?
            .set_default("forecast.high_confidence_hourly", 12)?
            .set_default("forecast.medium_confidence_hourly", 3)?
            // Default retry settings
            .set_default("retry.batch_limit", 20)?
            .set_default("retry.max_attempts", 3)?
            .set_default("retry.cooldown_minutes", 30)?
            .set_default("retry.scan_window_hours", 24)?
            .set_default("retry.interval_seconds", 300)?
            // Default health check settings
            .set_default("health.interval_seconds", 60)?
            .set_default("health.stuck_after_minutes", 30)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("JOBPULSE").separator("__"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load_without_files() {
        let settings = Settings::new().expect("defaults should load");
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.admission.max_queue_depth, 220);
        assert_eq!(settings.forecast.sample_limit, 500);
        assert_eq!(settings.retry.max_attempts, 3);
    }
}
