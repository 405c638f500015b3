//! 模型回复的磁盘缓存，以prompt的MD5为键

use anyhow::{Context, Result};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;

use crate::config::CacheConfig;

pub mod stats;
pub use stats::{CacheEvent, CacheStats, CacheStatsSnapshot};

/// 缓存条目
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: u64,
    pub prompt_hash: String,
    pub model_name: Option<String>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub fn hash_prompt(prompt: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(prompt.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct PromptCache {
    config: CacheConfig,
    stats: CacheStats,
}

impl PromptCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            stats: CacheStats::default(),
        }
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    fn entry_path(&self, category: &str, hash: &str) -> PathBuf {
        self.config
            .cache_dir
            .join(category)
            .join(format!("{}.json", hash))
    }

    fn is_expired(&self, timestamp: u64) -> bool {
        now_secs().saturating_sub(timestamp) > self.config.expire_hours * 3600
    }

    /// 读取缓存；损坏的条目按未命中处理，过期的条目会被删除
    pub async fn get<T>(&self, category: &str, prompt: &str) -> Option<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        if !self.config.enabled {
            return None;
        }

        let path = self.entry_path(category, &hash_prompt(prompt));
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.stats.record(category, CacheEvent::Miss);
                return None;
            }
            Err(e) => {
                tracing::debug!("读取缓存失败 {}: {}", path.display(), e);
                self.stats.record(category, CacheEvent::Error);
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry<T>>(&content) {
            Ok(entry) if self.is_expired(entry.timestamp) => {
                let _ = fs::remove_file(&path).await;
                self.stats.record(category, CacheEvent::Miss);
                None
            }
            Ok(entry) => {
                self.stats.record(category, CacheEvent::Hit);
                Some(entry.data)
            }
            Err(e) => {
                tracing::debug!("缓存条目无法解析 {}: {}", path.display(), e);
                self.stats.record(category, CacheEvent::Error);
                None
            }
        }
    }

    pub async fn set<T>(
        &self,
        category: &str,
        prompt: &str,
        data: T,
        model_name: Option<String>,
    ) -> Result<()>
    where
        T: Serialize,
    {
        if !self.config.enabled {
            return Ok(());
        }

        let hash = hash_prompt(prompt);
        let path = self.entry_path(category, &hash);
        let entry = CacheEntry {
            data,
            timestamp: now_secs(),
            prompt_hash: hash,
            model_name,
        };

        let written: Result<()> = async {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            let content = serde_json::to_string_pretty(&entry)?;
            fs::write(&path, content)
                .await
                .with_context(|| format!("写入缓存失败: {}", path.display()))
        }
        .await;

        match written {
            Ok(()) => self.stats.record(category, CacheEvent::Write),
            Err(_) => self.stats.record(category, CacheEvent::Error),
        }
        written
    }
}
