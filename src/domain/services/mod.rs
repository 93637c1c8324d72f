// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 该模块包含子系统的核心业务逻辑服务：
/// - 生命周期服务（lifecycle_service）：收敛并发转移到单条权威记录
/// - 执行指标服务（metrics_service）：终态样本的追加与统计读取
/// - 队列预测服务（forecast_service）：基于百分位模型的ETA与清空时间
/// - 资源准入服务（admission_service）：系统压力下的任务准入决策
/// - 重试编排服务（retry_service）：幂等且感知流水线的失败重试
/// - 问题去重服务（issue_service）：指纹化的运维问题聚合
pub mod admission_service;
pub mod forecast_service;
pub mod issue_service;
pub mod lifecycle_service;
pub mod metrics_service;
pub mod pipeline;
pub mod retry_service;

#[cfg(test)]
mod lifecycle_service_test;
