// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 有序回退取值工具
pub mod fallback;
/// 日志与追踪初始化
pub mod telemetry;
