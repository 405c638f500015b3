use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "moonshot")]
    Moonshot,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "mistral")]
    Mistral,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "gemini")]
    #[default]
    Gemini,
    #[serde(rename = "ollama")]
    Ollama,
}

impl LLMProvider {
    const NAMES: [(LLMProvider, &'static str); 8] = [
        (LLMProvider::OpenAI, "openai"),
        (LLMProvider::Moonshot, "moonshot"),
        (LLMProvider::DeepSeek, "deepseek"),
        (LLMProvider::Mistral, "mistral"),
        (LLMProvider::OpenRouter, "openrouter"),
        (LLMProvider::Anthropic, "anthropic"),
        (LLMProvider::Gemini, "gemini"),
        (LLMProvider::Ollama, "ollama"),
    ];

    pub fn as_str(&self) -> &'static str {
        Self::NAMES
            .iter()
            .find(|(provider, _)| provider == self)
            .map(|(_, name)| *name)
            .unwrap_or("unknown")
    }
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::NAMES
            .iter()
            .find(|(_, name)| *name == wanted)
            .map(|(provider, _)| *provider)
            .ok_or_else(|| format!("Unknown provider: {}", s))
    }
}

/// 知识补充来源的路由方式
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RouterMode {
    /// 基于领域关键词的确定性路由
    #[default]
    Heuristic,
    /// 由模型决定使用百科还是网络搜索
    Llm,
}

impl std::str::FromStr for RouterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "heuristic" => Ok(RouterMode::Heuristic),
            "llm" => Ok(RouterMode::Llm),
            _ => Err(format!("Unknown router mode: {}", s)),
        }
    }
}

/// 可行性报告的生成方式
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    #[default]
    Llm,
    Deterministic,
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 输出路径
    pub output_path: PathBuf,

    /// 内部工作目录路径 (.innoscope)
    pub internal_path: PathBuf,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 缓存配置
    pub cache: CacheConfig,

    /// 知识补充配置
    pub enrichment: EnrichmentConfig,

    /// 可行性评估配置
    pub feasibility: FeasibilityConfig,

    /// 对话配置
    pub chat: ChatConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 高能效模型，用于常规推理任务
    pub model_efficient: String,

    /// 高质量模型，作为efficient失效情况下的兜底
    pub model_powerful: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 超时时间（秒）
    pub timeout_seconds: u64,
}

/// 缓存配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// 是否启用缓存
    pub enabled: bool,

    /// 缓存目录
    pub cache_dir: PathBuf,

    /// 缓存过期时间（小时）
    pub expire_hours: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// 路由方式
    pub router_mode: RouterMode,

    /// 百科API地址
    pub wiki_api_url: String,

    /// 网络搜索API地址
    pub web_search_api_url: String,

    /// 请求使用的User-Agent
    pub user_agent: String,

    /// 请求超时（秒）
    pub timeout_seconds: u64,

    /// 主题页面的最大查询数
    pub max_topic_pages: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FeasibilityConfig {
    /// 报告生成方式
    pub report_mode: ReportMode,

    /// 五个维度是否并发评估
    pub parallel: bool,

    /// 评估失败时使用的中性分数
    pub neutral_score: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    /// 会话快照目录
    pub sessions_dir: PathBuf,

    /// 作为上下文的最近消息数
    pub recent_window: usize,

    /// 用于更新长期记忆的消息数
    pub memory_window: usize,

    /// 超过该行数时对记忆做摘要
    pub memory_summarize_threshold: usize,

    /// 追问的最大次数
    pub max_followups: u32,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let mut config: Config =
            toml::from_str(&content).context("Failed to parse config file")?;
        config.resolve_internal_dirs();
        Ok(config)
    }

    /// 未显式配置的缓存与会话目录跟随 `internal_path`
    pub fn resolve_internal_dirs(&mut self) {
        if self.cache.cache_dir == CacheConfig::default().cache_dir {
            self.cache.cache_dir = self.internal_path.join("cache");
        }
        if self.chat.sessions_dir == ChatConfig::default().sessions_dir {
            self.chat.sessions_dir = self.internal_path.join("sessions");
        }
    }

    /// 将内部目录下的相对路径整体迁移到新的内部目录
    pub fn relocate_internal(&mut self, internal_path: PathBuf) {
        self.cache.cache_dir = internal_path.join("cache");
        self.chat.sessions_dir = internal_path.join("sessions");
        self.internal_path = internal_path;
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("./innoscope.out"),
            internal_path: PathBuf::from("./.innoscope"),
            llm: LLMConfig::default(),
            cache: CacheConfig::default(),
            enrichment: EnrichmentConfig::default(),
            feasibility: FeasibilityConfig::default(),
            chat: ChatConfig::default(),
            verbose: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        let api_key = std::env::var("INNOSCOPE_LLM_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .unwrap_or_default();
        Self {
            provider: LLMProvider::default(),
            api_key,
            api_base_url: String::from("https://generativelanguage.googleapis.com"),
            model_efficient: String::from("gemini-2.5-flash"),
            model_powerful: String::from("gemini-2.5-pro"),
            max_tokens: 8192,
            temperature: 0.2,
            retry_attempts: 3,
            retry_delay_ms: 2000,
            timeout_seconds: 120,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: PathBuf::from(".innoscope/cache"),
            expire_hours: 168,
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            router_mode: RouterMode::default(),
            wiki_api_url: String::from("https://en.wikipedia.org/w/api.php"),
            web_search_api_url: String::from("https://api.duckduckgo.com/"),
            user_agent: format!(
                "innoscope-rs/{} (research scoping assistant)",
                env!("CARGO_PKG_VERSION")
            ),
            timeout_seconds: 20,
            max_topic_pages: 5,
        }
    }
}

impl Default for FeasibilityConfig {
    fn default() -> Self {
        Self {
            report_mode: ReportMode::default(),
            parallel: false,
            neutral_score: 50,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            sessions_dir: PathBuf::from(".innoscope/sessions"),
            recent_window: 6,
            memory_window: 12,
            memory_summarize_threshold: 10,
            max_followups: 2,
        }
    }
}
