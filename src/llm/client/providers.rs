//! 各家模型服务的统一封装，只提供单轮补全

use anyhow::Result;
use rig::{
    client::CompletionClient,
    completion::Prompt,
    providers::gemini::completion::gemini_api_types::{AdditionalParameters, GenerationConfig},
};

use crate::config::{LLMConfig, LLMProvider};

/// 一次单轮补全请求
pub struct PromptRequest<'a> {
    pub model: &'a str,
    pub system_prompt: &'a str,
    pub user_prompt: &'a str,
}

/// 兼容OpenAI协议、支持自定义基地址的客户端
macro_rules! client_with_base_url {
    ($provider:ident, $config:expr) => {
        rig::providers::$provider::Client::builder(&$config.api_key)
            .base_url(&$config.api_base_url)
            .build()
    };
}

/// 补全agent的公共参数后执行prompt
macro_rules! prompt_once {
    ($builder:expr, $request:expr, $config:expr) => {{
        let agent = $builder
            .preamble($request.system_prompt)
            .temperature($config.temperature)
            .build();
        agent
            .prompt($request.user_prompt)
            .await
            .map_err(anyhow::Error::from)
    }};
}

#[derive(Clone)]
pub enum ProviderClient {
    OpenAI(rig::providers::openai::Client),
    Moonshot(rig::providers::moonshot::Client),
    DeepSeek(rig::providers::deepseek::Client),
    Mistral(rig::providers::mistral::Client),
    OpenRouter(rig::providers::openrouter::Client),
    Anthropic(rig::providers::anthropic::Client),
    Gemini(rig::providers::gemini::Client),
    Ollama(rig::providers::ollama::Client),
}

impl ProviderClient {
    pub fn new(config: &LLMConfig) -> Result<Self> {
        let client = match config.provider {
            LLMProvider::OpenAI => Self::OpenAI(client_with_base_url!(openai, config)),
            LLMProvider::Moonshot => Self::Moonshot(client_with_base_url!(moonshot, config)),
            LLMProvider::DeepSeek => Self::DeepSeek(client_with_base_url!(deepseek, config)),
            LLMProvider::Mistral => {
                Self::Mistral(rig::providers::mistral::Client::builder(&config.api_key).build())
            }
            LLMProvider::OpenRouter => Self::OpenRouter(
                rig::providers::openrouter::Client::builder(&config.api_key).build(),
            ),
            LLMProvider::Anthropic => Self::Anthropic(
                rig::providers::anthropic::ClientBuilder::new(&config.api_key).build()?,
            ),
            LLMProvider::Gemini => {
                Self::Gemini(rig::providers::gemini::Client::builder(&config.api_key).build()?)
            }
            LLMProvider::Ollama => Self::Ollama(rig::providers::ollama::Client::builder().build()),
        };
        Ok(client)
    }

    /// 按请求的模型构建agent并执行一次补全
    pub async fn complete(&self, request: &PromptRequest<'_>, config: &LLMConfig) -> Result<String> {
        let max_tokens: u64 = config.max_tokens.into();
        let model = request.model;
        match self {
            Self::OpenAI(client) => prompt_once!(
                client
                    .completion_model(model)
                    .completions_api()
                    .into_agent_builder()
                    .max_tokens(max_tokens),
                request,
                config
            ),
            Self::Moonshot(client) => prompt_once!(client.agent(model), request, config),
            Self::DeepSeek(client) => prompt_once!(client.agent(model), request, config),
            Self::Mistral(client) => prompt_once!(client.agent(model), request, config),
            Self::OpenRouter(client) => prompt_once!(client.agent(model), request, config),
            Self::Anthropic(client) => {
                prompt_once!(client.agent(model).max_tokens(max_tokens), request, config)
            }
            Self::Gemini(client) => {
                let params = AdditionalParameters::default().with_config(GenerationConfig::default());
                prompt_once!(
                    client
                        .agent(model)
                        .max_tokens(max_tokens)
                        .additional_params(serde_json::to_value(params)?),
                    request,
                    config
                )
            }
            Self::Ollama(client) => {
                prompt_once!(client.agent(model).max_tokens(max_tokens), request, config)
            }
        }
    }
}
