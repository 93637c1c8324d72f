// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 按顺序返回第一个存在的值
///
/// 多个可选来源按可信度排序时，取第一个 `Some`。
///
/// # 参数
///
/// * `candidates` - 按优先级排列的候选值
///
/// # 返回值
///
/// 第一个存在的值，全部缺失时返回 `None`
pub fn first_present<T>(candidates: impl IntoIterator<Item = Option<T>>) -> Option<T> {
    candidates.into_iter().flatten().next()
}
