//! LLM客户端 - 提供统一的LLM服务接口

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheStatsSnapshot, PromptCache};
use crate::config::Config;
use crate::llm::client::utils::evaluate_befitting_model;

mod providers;
pub mod utils;

use providers::{PromptRequest, ProviderClient};

/// 默认的系统提示词
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are InnoScope, an assistant that analyses research documents and project ideas. Follow the output format requested in each prompt exactly.";

/// prompt缓存的键，包含应答模型的名称
pub(crate) fn cache_key(model: &str, system_prompt: &str, user_prompt: &str) -> String {
    format!("{}\n{}\n{}", model, system_prompt, user_prompt)
}

/// 语言模型的抽象，流水线各节点只依赖该trait
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// 单轮补全
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// 模型名称，仅用于日志
    fn model_name(&self) -> String {
        "unknown".to_string()
    }

    /// 调用统计，verbose模式下输出
    fn usage_report(&self) -> Option<String> {
        None
    }
}

/// LLM客户端 - 提供统一的LLM服务接口
#[derive(Clone)]
pub struct LLMClient {
    config: Config,
    client: ProviderClient,
    cache: Arc<PromptCache>,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: Config) -> Result<Self> {
        let client = ProviderClient::new(&config.llm)?;
        let cache = Arc::new(PromptCache::new(config.cache.clone()));
        Ok(Self {
            client,
            config,
            cache,
        })
    }

    /// 检查模型连接和功能是否正常
    pub async fn check_connection(&self) -> Result<()> {
        println!("🔄 正在检查模型连接...");
        // 使用一个简单的prompt来测试连接
        match self
            .prompt_uncached("You are a helpful assistant.", "Hello", false)
            .await
        {
            Ok(_) => {
                println!("✅ 模型连接正常");
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ 模型连接失败: {}", e);
                Err(e)
            }
        }
    }

    /// 通用重试逻辑，用于处理异步操作的重试机制
    async fn retry_with_backoff<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, anyhow::Error>>,
    {
        let llm_config = &self.config.llm;
        let max_retries = llm_config.retry_attempts.max(1);
        let retry_delay_ms = llm_config.retry_delay_ms;
        let timeout = Duration::from_secs(llm_config.timeout_seconds.max(1));
        let mut retries = 0;

        loop {
            let outcome = match tokio::time::timeout(timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(anyhow!("模型调用超时 ({}秒)", timeout.as_secs())),
            };
            match outcome {
                Ok(result) => return Ok(result),
                Err(err) => {
                    retries += 1;
                    tracing::warn!(
                        "❌ 调用模型服务出错，重试中 (第 {} / {}次尝试): {}",
                        retries,
                        max_retries,
                        err
                    );
                    if retries >= max_retries {
                        return Err(err);
                    }
                    tokio::time::sleep(Duration::from_millis(retry_delay_ms)).await;
                }
            }
        }
    }

    /// 单轮对话，命中缓存时直接返回
    pub async fn prompt(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let (befitting_model, fallover_model) =
            evaluate_befitting_model(&self.config.llm, system_prompt, user_prompt);
        self.prompt_inner(system_prompt, user_prompt, befitting_model, fallover_model, true)
            .await
    }

    async fn prompt_uncached(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        allow_fallover: bool,
    ) -> Result<String> {
        let (befitting_model, fallover_model) =
            evaluate_befitting_model(&self.config.llm, system_prompt, user_prompt);
        let fallover_model = fallover_model.filter(|_| allow_fallover);

        self.prompt_inner(system_prompt, user_prompt, befitting_model, fallover_model, false)
            .await
    }

    /// 依次尝试首选与备选模型；缓存按实际应答的模型区分
    async fn prompt_inner(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        befitting_model: String,
        fallover_model: Option<String>,
        use_cache: bool,
    ) -> Result<String> {
        let llm_config = &self.config.llm;
        let candidates: Vec<String> = std::iter::once(befitting_model)
            .chain(fallover_model)
            .collect();
        let mut last_error = None;

        for (idx, model) in candidates.iter().enumerate() {
            let key = cache_key(model, system_prompt, user_prompt);
            if use_cache {
                if let Some(cached) = self.cache.get::<String>("prompt", &key).await {
                    return Ok(cached);
                }
            }

            let request = PromptRequest {
                model,
                system_prompt,
                user_prompt,
            };
            tracing::debug!(model = %model, prompt_chars = user_prompt.len(), "调用模型");

            match self
                .retry_with_backoff(|| self.client.complete(&request, llm_config))
                .await
            {
                Ok(response) => {
                    if use_cache {
                        if let Err(e) = self
                            .cache
                            .set("prompt", &key, response.clone(), Some(model.clone()))
                            .await
                        {
                            tracing::warn!("⚠️ 写入缓存失败: {}", e);
                        }
                    }
                    return Ok(response);
                }
                Err(e) => {
                    if let Some(next) = candidates.get(idx + 1) {
                        tracing::warn!(
                            "❌ 调用模型服务出错，尝试 {} 次均失败，尝试使用备选模型{}...{}",
                            llm_config.retry_attempts,
                            next,
                            e
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("没有可用的模型")))
    }

    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats()
    }
}

#[async_trait]
impl LanguageModel for LLMClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompt(DEFAULT_SYSTEM_PROMPT, prompt).await
    }

    fn model_name(&self) -> String {
        self.config.llm.model_efficient.clone()
    }

    fn usage_report(&self) -> Option<String> {
        Some(self.cache_stats().to_string())
    }
}

#[cfg(test)]
mod tests;
