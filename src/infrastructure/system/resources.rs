// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

static SYSTEM: Lazy<Arc<Mutex<System>>> = Lazy::new(|| {
    let mut sys = System::new_with_specifics(
        RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::everything())
            .with_memory(MemoryRefreshKind::everything()),
    );
    sys.refresh_all();
    Arc::new(Mutex::new(sys))
});

/// 系统资源快照
#[derive(Debug, Clone, Copy)]
pub struct ResourceSnapshot {
    /// 1分钟平均负载
    pub load_one: f64,
    /// CPU核数
    pub cpu_cores: usize,
    /// 可用内存（MB）
    pub available_memory_mb: u64,
}

impl ResourceSnapshot {
    /// 单核负载
    pub fn load_per_core(&self) -> f64 {
        self.load_one / self.cpu_cores.max(1) as f64
    }
}

/// 资源探测特质
///
/// 读取失败由调用方决定兜底策略（准入侧失败放行）
pub trait ResourceProbe: Send + Sync {
    /// 取当前资源快照
    fn snapshot(&self) -> anyhow::Result<ResourceSnapshot>;
}

/// 基于sysinfo的资源探测实现
#[derive(Default)]
pub struct SysinfoResourceProbe;

impl ResourceProbe for SysinfoResourceProbe {
    fn snapshot(&self) -> anyhow::Result<ResourceSnapshot> {
        let load_one = System::load_average().one;

        let mut sys = SYSTEM.lock();
        sys.refresh_memory();
        let cpu_cores = sys.cpus().len().max(1);
        let available_memory_mb = sys.available_memory() / 1024 / 1024;

        Ok(ResourceSnapshot {
            load_one,
            cpu_cores,
            available_memory_mb,
        })
    }
}
