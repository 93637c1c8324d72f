// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 失败记录模型
pub mod failure;
/// 队列预测模型
pub mod forecast;
/// 运维问题模型
pub mod issue;
/// 任务生命周期模型
pub mod job;
/// 执行指标样本模型
pub mod metric;
