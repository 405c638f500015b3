use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::generator::enrichment::{DuckDuckGoSource, KnowledgeSource, WikipediaSource};
use crate::llm::{LLMClient, LanguageModel};
use crate::types::research::KnowledgeSourceKind;

/// 两类外部知识来源
#[derive(Clone)]
pub struct KnowledgeSources {
    pub encyclopedia: Arc<dyn KnowledgeSource>,
    pub web: Arc<dyn KnowledgeSource>,
}

impl KnowledgeSources {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            encyclopedia: Arc::new(WikipediaSource::new(&config.enrichment)?),
            web: Arc::new(DuckDuckGoSource::new(&config.enrichment)?),
        })
    }

    pub fn get(&self, kind: KnowledgeSourceKind) -> &Arc<dyn KnowledgeSource> {
        match kind {
            KnowledgeSourceKind::Encyclopedia => &self.encyclopedia,
            KnowledgeSourceKind::WebSearch => &self.web,
        }
    }
}

#[derive(Clone)]
pub struct GeneratorContext {
    /// LLM调用器，用于与AI通信。
    pub llm: Arc<dyn LanguageModel>,
    /// 配置
    pub config: Config,
    /// 外部知识来源
    pub knowledge: KnowledgeSources,
}

impl GeneratorContext {
    /// 创建新的生成器上下文
    pub fn new(config: Config) -> Result<Self> {
        let llm_client = LLMClient::new(config.clone())?;
        let knowledge = KnowledgeSources::from_config(&config)?;
        Ok(Self::with_components(config, Arc::new(llm_client), knowledge))
    }

    /// 创建上下文并在启动时检查模型连接
    pub async fn connect(config: Config) -> Result<Self> {
        let llm_client = LLMClient::new(config.clone())?;
        llm_client.check_connection().await?;
        let knowledge = KnowledgeSources::from_config(&config)?;
        Ok(Self::with_components(config, Arc::new(llm_client), knowledge))
    }

    /// 使用指定的模型与知识来源构造上下文
    pub fn with_components(
        config: Config,
        llm: Arc<dyn LanguageModel>,
        knowledge: KnowledgeSources,
    ) -> Self {
        Self {
            llm,
            config,
            knowledge,
        }
    }
}
