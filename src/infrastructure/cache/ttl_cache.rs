// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// 时钟特质
///
/// 缓存通过注入的时钟取当前时间，测试可用手动时钟推进
pub trait Clock: Send + Sync {
    /// 当前时间
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 手动时钟
///
/// 测试中显式推进时间
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// 以指定时间创建手动时钟
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// 推进时钟
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock();
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// 带TTL的进程内缓存
///
/// 键到值加过期时间的显式缓存抽象，由使用方注入而非进程级全局状态
pub struct TtlCache<V: Clone> {
    entries: DashMap<String, Entry<V>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    /// 创建新的缓存实例
    ///
    /// # 参数
    ///
    /// * `ttl` - 条目存活时间
    /// * `clock` - 时钟来源
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    /// 读取未过期的条目
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
        }
        // Expired entries are dropped on the next read
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }

    /// 写入条目
    pub fn insert(&self, key: &str, value: V) {
        let expires_at = self.clock.now() + self.ttl;
        self.entries.insert(key.to_string(), Entry { value, expires_at });
    }

    /// 删除条目
    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    /// 清空缓存
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_fresh_value() {
        let clock = Arc::new(ManualClock::starting_at(Utc::now()));
        let cache: TtlCache<i64> = TtlCache::new(Duration::seconds(20), clock.clone());

        cache.insert("queue:default", 7);
        assert_eq!(cache.get("queue:default"), Some(7));
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let clock = Arc::new(ManualClock::starting_at(Utc::now()));
        let cache: TtlCache<i64> = TtlCache::new(Duration::seconds(20), clock.clone());

        cache.insert("queue:default", 7);
        clock.advance(Duration::seconds(21));
        assert_eq!(cache.get("queue:default"), None);
    }

    #[test]
    fn test_invalidate_removes_entry() {
        let clock = Arc::new(ManualClock::starting_at(Utc::now()));
        let cache: TtlCache<i64> = TtlCache::new(Duration::seconds(20), clock);

        cache.insert("k", 1);
        cache.invalidate("k");
        assert_eq!(cache.get("k"), None);
    }
}
