// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 工作器管理器
///
/// 收集后台循环的句柄，在收到关闭信号时统一终止
pub struct WorkerManager {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerManager {
    /// 创建新的工作器管理器实例
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    /// 纳管一个后台任务
    pub fn register(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    /// 等待关闭信号并关闭工作器
    ///
    /// 监听关闭信号并终止所有纳管的后台任务
    pub async fn wait_for_shutdown(&mut self) {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }

        info!("Shutting down workers...");
        for handle in &self.handles {
            handle.abort();
        }

        info!("Workers shut down successfully");
    }
}

impl Default for WorkerManager {
    fn default() -> Self {
        Self::new()
    }
}
