// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::DbErr;
use thiserror::Error;

/// 失败记录仓库接口
pub mod failure_repository;
/// 问题记录仓库接口
pub mod issue_repository;
/// 生命周期记录仓库接口
pub mod lifecycle_repository;
/// 执行指标仓库接口
pub mod metric_repository;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
}
