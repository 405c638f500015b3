#[cfg(test)]
mod tests {
    use crate::cache::PromptCache;
    use crate::config::{Config, LLMProvider};
    use crate::llm::client::{LLMClient, cache_key};
    use tempfile::TempDir;

    fn offline_config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.relocate_internal(dir.path().join(".innoscope"));
        config.llm.provider = LLMProvider::OpenAI;
        config.llm.api_key = "test-key".to_string();
        config.llm.api_base_url = "http://127.0.0.1:9".to_string();
        config.llm.model_efficient = "small-model".to_string();
        config.llm.model_powerful = "large-model".to_string();
        config.llm.retry_attempts = 1;
        config.llm.timeout_seconds = 2;
        config
    }

    #[test]
    fn test_cache_key_includes_model() {
        assert_ne!(
            cache_key("small-model", "sys", "user"),
            cache_key("large-model", "sys", "user")
        );
        assert_eq!(cache_key("m", "sys", "user"), "m\nsys\nuser");
    }

    #[tokio::test]
    async fn test_long_prompt_reads_cache_of_powerful_model() {
        let dir = TempDir::new().unwrap();
        let config = offline_config(&dir);
        let long_prompt = "x".repeat(40 * 1024);

        // 长prompt路由到高质量模型，缓存必须按该模型命中
        let seeded = PromptCache::new(config.cache.clone());
        seeded
            .set(
                "prompt",
                &cache_key("large-model", "sys", &long_prompt),
                "from large model".to_string(),
                Some("large-model".to_string()),
            )
            .await
            .unwrap();
        seeded
            .set(
                "prompt",
                &cache_key("small-model", "sys", &long_prompt),
                "from small model".to_string(),
                Some("small-model".to_string()),
            )
            .await
            .unwrap();

        let client = LLMClient::new(config).unwrap();
        let reply = client.prompt("sys", &long_prompt).await.unwrap();
        assert_eq!(reply, "from large model");
        assert_eq!(client.cache_stats().hits, 1);
    }
}
