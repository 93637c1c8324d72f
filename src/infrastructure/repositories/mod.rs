// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 失败记录仓库实现
pub mod failure_repo_impl;
/// 问题记录仓库实现
pub mod issue_repo_impl;
/// 生命周期记录仓库实现
pub mod lifecycle_repo_impl;
/// 执行指标仓库实现
pub mod metric_repo_impl;
