use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 一次缓存访问的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    Hit,
    Miss,
    Write,
    Error,
}

#[derive(Default)]
struct Counters {
    hits: AtomicUsize,
    misses: AtomicUsize,
    writes: AtomicUsize,
    errors: AtomicUsize,
}

/// prompt缓存的命中统计，可在多个客户端副本之间共享
#[derive(Clone, Default)]
pub struct CacheStats {
    counters: Arc<Counters>,
}

/// 某一时刻的统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: usize,
    pub misses: usize,
    pub writes: usize,
    pub errors: usize,
}

impl CacheStats {
    pub fn record(&self, category: &str, event: CacheEvent) {
        let counter = match event {
            CacheEvent::Hit => &self.counters.hits,
            CacheEvent::Miss => &self.counters.misses,
            CacheEvent::Write => &self.counters.writes,
            CacheEvent::Error => &self.counters.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        match event {
            CacheEvent::Hit => tracing::debug!(category, "💰 缓存命中"),
            CacheEvent::Miss => tracing::debug!(category, "⌛ 缓存未命中，需要调用模型"),
            CacheEvent::Write => tracing::debug!(category, "💾 缓存写入"),
            CacheEvent::Error => tracing::warn!(category, "❌ 缓存读写失败"),
        }
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }
}

impl CacheStatsSnapshot {
    pub fn lookups(&self) -> usize {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            n => self.hits as f64 / n as f64,
        }
    }
}

impl fmt::Display for CacheStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "缓存命中率: {:.1}% (命中 {} / 查询 {}，写入 {}，错误 {})",
            self.hit_rate() * 100.0,
            self.hits,
            self.lookups(),
            self.writes,
            self.errors
        )
    }
}
