use crate::config::{Config, LLMProvider, ReportMode, RouterMode};
use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

/// InnoScope-RS - 由Rust与AI驱动的研究项目范围界定与路线图生成引擎
#[derive(Parser, Debug)]
#[command(name = "InnoScope (innoscope-rs)")]
#[command(
    about = "AI-based orchestration engine that turns research documents and project conversations into structured scopes, feasibility assessments and implementation roadmaps."
)]
#[command(version)]
pub struct Args {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 输出路径
    #[arg(short, long, global = true)]
    pub output_path: Option<PathBuf>,

    /// 是否启用详细日志
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// 只输出错误日志
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// 以SSE帧的形式输出进度与结果
    #[arg(long, global = true)]
    pub stream: bool,

    /// 高能效模型，用于常规推理任务
    #[arg(long, global = true)]
    pub model_efficient: Option<String>,

    /// 高质量模型，作为efficient失效情况下的兜底
    #[arg(long, global = true)]
    pub model_powerful: Option<String>,

    /// LLM API基地址
    #[arg(long, global = true)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long, global = true)]
    pub llm_api_key: Option<String>,

    /// 最大tokens数
    #[arg(long, global = true)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long, global = true)]
    pub temperature: Option<f64>,

    /// LLM Provider (openai, moonshot, deepseek, mistral, openrouter, anthropic, gemini, ollama)
    #[arg(long, global = true)]
    pub llm_provider: Option<String>,

    /// 知识补充路由方式 (heuristic, llm)
    #[arg(long, global = true)]
    pub router: Option<String>,

    /// 并发评估五个可行性维度
    #[arg(long, global = true)]
    pub parallel: bool,

    /// 不调用模型，直接生成确定性的可行性报告
    #[arg(long, global = true)]
    pub deterministic_report: bool,

    /// 是否禁用缓存
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// 从PDF/DOCX文档生成实施路线图
    Roadmap {
        file: PathBuf,
    },

    /// 从已有摘要生成实施路线图
    #[command(group(ArgGroup::new("source").required(true).args(["text", "file"])))]
    RoadmapSummary {
        text: Option<String>,

        /// 从文本文件读取摘要
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// 可行性评估
    #[command(group(ArgGroup::new("source").required(true).args(["summary", "document"])))]
    Feasibility {
        #[arg(long)]
        summary: Option<String>,

        #[arg(long)]
        document: Option<PathBuf>,
    },

    /// 生成研究摘要
    #[command(group(ArgGroup::new("source").required(true).args(["text", "file"])))]
    Summarize {
        #[arg(long)]
        text: Option<String>,

        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// 文档范围界定，可交互补充缺失字段
    Scope {
        file: PathBuf,

        #[arg(short, long)]
        interactive: bool,
    },

    /// 对话式范围界定
    Chat {
        #[command(subcommand)]
        action: ChatCommand,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// 发送一条消息
    Send {
        #[arg(short, long)]
        message: String,

        #[arg(short, long)]
        session: Option<String>,

        #[arg(short, long)]
        topic: Option<String>,
    },

    /// 根据会话内容生成路线图
    Roadmap {
        #[arg(short, long)]
        session: String,
    },

    /// 列出全部会话
    List,
}

impl Args {
    /// 将CLI参数转换为配置
    pub fn into_config(self) -> Result<Config> {
        let mut config = if let Some(config_path) = &self.config {
            // 显式指定的配置文件必须可读
            Config::from_file(config_path)
                .with_context(|| format!("无法读取配置文件 {:?}", config_path))?
        } else {
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("innoscope.toml");

            if default_config_path.exists() {
                Config::from_file(&default_config_path)
                    .with_context(|| format!("无法读取默认配置文件 {:?}", default_config_path))?
            } else {
                Config::default()
            }
        };

        if let Some(output_path) = self.output_path {
            config.output_path = output_path;
        }

        // 覆盖LLM配置
        if let Some(provider_str) = self.llm_provider {
            if let Ok(provider) = provider_str.parse::<LLMProvider>() {
                config.llm.provider = provider;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的provider: {}，使用默认provider",
                    provider_str
                );
            }
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(model_efficient) = self.model_efficient {
            config.llm.model_efficient = model_efficient;
        }
        if let Some(model_powerful) = self.model_powerful {
            config.llm.model_powerful = model_powerful;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }

        // 知识补充与评估配置
        if let Some(router_str) = self.router {
            match router_str.parse::<RouterMode>() {
                Ok(mode) => config.enrichment.router_mode = mode,
                Err(_) => eprintln!(
                    "⚠️ 警告: 未知的路由方式: {}，使用 {:?}",
                    router_str, config.enrichment.router_mode
                ),
            }
        }
        if self.parallel {
            config.feasibility.parallel = true;
        }
        if self.deterministic_report {
            config.feasibility.report_mode = ReportMode::Deterministic;
        }

        // 缓存配置
        if self.no_cache {
            config.cache.enabled = false;
        }

        config.verbose = self.verbose;

        Ok(config)
    }
}

// Include tests
#[cfg(test)]
mod tests;
