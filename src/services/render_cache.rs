//! 渲染缓存服务 - 业务能力层
//!
//! 公式源码 → 渲染结果 的 LRU 缓存。行内和块级公式各有一个独立实例。
//! 渲染是确定性的，条目只会因容量被淘汰，不会过期。

use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::models::MathSpan;

/// 默认容量
pub const DEFAULT_CAPACITY: usize = 512;

/// 缓存统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

/// 单个 LRU 渲染缓存
///
/// 所有状态在一把锁内修改，多个渲染任务并发 get/set 不会打乱 LRU 顺序。
pub struct RenderCache {
    label: &'static str,
    entries: Mutex<LruCache<String, String>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RenderCache {
    pub fn new(label: &'static str, capacity: NonZeroUsize) -> Self {
        Self {
            label,
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// 查询缓存，命中时该条目变为最近使用
    pub fn get(&self, key: &str) -> Option<String> {
        let found = self.lock().get(key).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// 写入缓存，满了先淘汰最久未使用的条目
    pub fn set(&self, key: impl Into<String>, markup: impl Into<String>) {
        let key = key.into();
        let evicted = self.lock().push(key.clone(), markup.into());
        // 同一个 key 被覆盖时 push 也会返回旧值
        if let Some((old_key, _)) = evicted.filter(|(old_key, _)| *old_key != key) {
            debug!("[{} 缓存] 淘汰: {}", self.label, old_key);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: entries.len(),
            capacity: entries.cap().get(),
        }
    }

    // 持锁期间不会 panic，中毒时直接取回数据继续用
    fn lock(&self) -> MutexGuard<'_, LruCache<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// 行内 + 块级 两个缓存
pub struct MathCache {
    inline: RenderCache,
    display: RenderCache,
}

impl MathCache {
    /// 创建缓存对，容量为 0 时退回默认容量
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or_else(|| {
            warn!("缓存容量不能为 0，使用默认值 {}", DEFAULT_CAPACITY);
            NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN)
        });

        Self {
            inline: RenderCache::new("inline", capacity),
            display: RenderCache::new("display", capacity),
        }
    }

    /// 按显示模式选择缓存
    pub fn for_mode(&self, display: bool) -> &RenderCache {
        if display {
            &self.display
        } else {
            &self.inline
        }
    }

    pub fn get(&self, span: &MathSpan) -> Option<String> {
        self.for_mode(span.display).get(&span.content)
    }

    pub fn set(&self, span: &MathSpan, markup: impl Into<String>) {
        self.for_mode(span.display).set(span.content.clone(), markup);
    }

    pub fn inline(&self) -> &RenderCache {
        &self.inline
    }

    pub fn display(&self) -> &RenderCache {
        &self.display
    }

    /// (行内, 块级) 统计
    pub fn stats(&self) -> (CacheStats, CacheStats) {
        (self.inline.stats(), self.display.stats())
    }
}

impl Default for MathCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
