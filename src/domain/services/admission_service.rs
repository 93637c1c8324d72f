// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::AdmissionSettings;
use crate::infrastructure::system::resources::ResourceProbe;
use crate::queue::backend::QueueBackend;
use metrics::counter;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// 压力快照
///
/// 决策时刻的三个独立信号
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PressureSnapshot {
    /// 单核负载
    pub load_per_core: f64,
    /// 可用内存（MB）
    pub available_memory_mb: u64,
    /// 目标队列深度
    pub queue_depth: u64,
}

/// 延迟原因编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferReason {
    /// CPU负载过高
    HighCpuLoad,
    /// 可用内存不足
    LowMemory,
    /// 队列深度过高
    HighQueueDepth,
}

impl fmt::Display for DeferReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeferReason::HighCpuLoad => write!(f, "high_cpu_load"),
            DeferReason::LowMemory => write!(f, "low_memory"),
            DeferReason::HighQueueDepth => write!(f, "high_queue_depth"),
        }
    }
}

impl DeferReason {
    /// 建议的重试等待（秒）
    ///
    /// 按压力消退速度排序：队列深度消退最快，内存压力最慢
    pub fn retry_in_seconds(&self) -> u64 {
        match self {
            DeferReason::HighQueueDepth => 20,
            DeferReason::HighCpuLoad => 45,
            DeferReason::LowMemory => 90,
        }
    }
}

/// 准入决策
///
/// 过载是预期分支，用变体而非异常表达
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AdmissionDecision {
    /// 放行
    Admit {
        /// 决策时刻的压力快照
        snapshot: PressureSnapshot,
    },
    /// 延迟
    Defer {
        /// 第一个命中的阈值
        reason: DeferReason,
        /// 建议的重试等待（秒）
        retry_in_seconds: u64,
        /// 决策时刻的压力快照
        snapshot: PressureSnapshot,
    },
}

impl AdmissionDecision {
    /// 是否放行
    pub fn allowed(&self) -> bool {
        matches!(self, AdmissionDecision::Admit { .. })
    }
}

/// 资源准入服务
///
/// 新的昂贵任务在派发前先过这道闸：取一次实时压力快照，
/// 三个阈值任一超限即延迟。标记为关键的任务无条件放行——
/// 正确性关键的任务不允许被背压无限饿死。
/// 快照计算中的任何内部错误都失败放行：背压不能成为新的故障源。
pub struct AdmissionService<P: ResourceProbe, B: QueueBackend> {
    /// 资源探测
    probe: Arc<P>,
    /// 队列后端
    backend: Arc<B>,
    /// 阈值配置
    settings: AdmissionSettings,
}

impl<P: ResourceProbe, B: QueueBackend> AdmissionService<P, B> {
    /// 创建新的资源准入服务实例
    pub fn new(probe: Arc<P>, backend: Arc<B>, settings: AdmissionSettings) -> Self {
        Self {
            probe,
            backend,
            settings,
        }
    }

    /// 任务准入判定
    ///
    /// # 参数
    ///
    /// * `task_name` - 任务名，仅用于日志
    /// * `queue` - 目标队列
    /// * `critical` - 关键任务绕过背压
    ///
    /// # 返回值
    ///
    /// 放行或带原因与重试建议的延迟
    pub async fn allow_task(
        &self,
        task_name: &str,
        queue: &str,
        critical: bool,
    ) -> AdmissionDecision {
        let snapshot = self.pressure_snapshot(queue).await;

        if critical {
            return AdmissionDecision::Admit { snapshot };
        }

        let reason = self.first_exceeded_threshold(&snapshot);
        match reason {
            None => AdmissionDecision::Admit { snapshot },
            Some(reason) => {
                warn!(
                    task = %task_name,
                    queue = %queue,
                    reason = %reason,
                    load_per_core = snapshot.load_per_core,
                    available_memory_mb = snapshot.available_memory_mb,
                    queue_depth = snapshot.queue_depth,
                    "Deferring task under resource pressure"
                );
                counter!("admission_deferred_total").increment(1);
                AdmissionDecision::Defer {
                    reason,
                    retry_in_seconds: reason.retry_in_seconds(),
                    snapshot,
                }
            }
        }
    }

    /// 取压力快照
    ///
    /// 探测失败时各信号退回零值——零压力意味着放行（失败放行）
    async fn pressure_snapshot(&self, queue: &str) -> PressureSnapshot {
        let (load_per_core, available_memory_mb) = match self.probe.snapshot() {
            Ok(resources) => (resources.load_per_core(), resources.available_memory_mb),
            Err(e) => {
                warn!("Resource probe failed, admitting by default: {}", e);
                (0.0, u64::MAX)
            }
        };

        let queue_depth = match self.backend.queue_depth(queue).await {
            Ok(depth) => depth,
            Err(e) => {
                warn!(queue = %queue, "Queue depth probe failed, assuming empty: {}", e);
                0
            }
        };

        PressureSnapshot {
            load_per_core,
            available_memory_mb,
            queue_depth,
        }
    }

    /// 按固定顺序返回第一个命中的阈值
    fn first_exceeded_threshold(&self, snapshot: &PressureSnapshot) -> Option<DeferReason> {
        if snapshot.load_per_core > self.settings.max_load_per_core {
            return Some(DeferReason::HighCpuLoad);
        }
        if snapshot.available_memory_mb < self.settings.min_available_memory_mb {
            return Some(DeferReason::LowMemory);
        }
        if snapshot.queue_depth > self.settings.max_queue_depth {
            return Some(DeferReason::HighQueueDepth);
        }
        None
    }
}
