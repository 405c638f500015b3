//! 项目字段提取与缺失检测

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::generator::context::GeneratorContext;
use crate::generator::graph::Node;
use crate::llm::LanguageModel;
use crate::types::scoping::ScopingFields;
use crate::types::state::PipelineState;
use crate::utils::{coerce_list, coerce_text, parse_llm_json, truncate_chars};

/// 把模型返回的任意JSON对象规整为固定结构
pub fn normalize_fields(map: &Map<String, Value>) -> ScopingFields {
    let text = |key: &str| map.get(key).and_then(coerce_text);
    let list = |key: &str| map.get(key).map(coerce_list).unwrap_or_default();
    ScopingFields {
        problem_statement: text("problem_statement"),
        domain: text("domain"),
        goals: list("goals"),
        prerequisites: list("prerequisites"),
        key_topics: list("key_topics"),
    }
}

pub fn summary_fields_prompt(summary: &str) -> String {
    format!(
        r#"Extract the following from this summary:

Fields:
- problem_statement
- domain
- goals
- key_topics
- prerequisites

Summary:
{}

Return strict JSON only."#,
        summary
    )
}

pub fn transcript_fields_prompt(transcript: &str) -> String {
    format!(
        r#"You are extracting project scoping fields from a conversation transcript.
Return STRICT JSON with exactly these keys:
- problem_statement: string or null
- domain: string or null
- goals: array of strings or []
- prerequisites: array of strings or []
- key_topics: array of strings or []

Transcript:
{}

JSON only:"#,
        transcript
    )
}

/// 调用模型提取字段；任何失败都返回空结构
pub async fn extract_fields(llm: &dyn LanguageModel, prompt: &str) -> ScopingFields {
    match llm.complete(prompt).await {
        Ok(raw) => normalize_fields(&parse_llm_json(&raw)),
        Err(e) => {
            tracing::warn!("⚠️ 字段提取失败，返回空字段: {}", e);
            ScopingFields::default()
        }
    }
}

/// 从摘要（没有摘要时从原文）提取字段并合并到状态
pub struct FillFieldsNode;

#[async_trait]
impl Node for FillFieldsNode {
    fn name(&self) -> &'static str {
        "fill_fields"
    }

    async fn run(&self, ctx: &GeneratorContext, state: &mut PipelineState) -> Result<()> {
        let source = if state.summary_text().trim().is_empty() {
            truncate_chars(state.raw_text(), 5000)
        } else {
            state.summary_text()
        };
        if source.trim().is_empty() {
            tracing::debug!("没有可提取字段的文本，跳过");
            return Ok(());
        }
        let fields = extract_fields(ctx.llm.as_ref(), &summary_fields_prompt(source)).await;
        state.fields.merge(fields);
        Ok(())
    }
}

/// 从对话记忆中提取字段
pub struct ChatExtractNode;

#[async_trait]
impl Node for ChatExtractNode {
    fn name(&self) -> &'static str {
        "chat_extract"
    }

    async fn run(&self, ctx: &GeneratorContext, state: &mut PipelineState) -> Result<()> {
        let transcript = state
            .conversation
            .memory_text
            .clone()
            .unwrap_or_default();
        let fields = extract_fields(ctx.llm.as_ref(), &transcript_fields_prompt(&transcript)).await;
        state.fields.merge(fields);
        Ok(())
    }
}

pub struct DetectMissingNode;

#[async_trait]
impl Node for DetectMissingNode {
    fn name(&self) -> &'static str {
        "detect_missing"
    }

    async fn run(&self, _ctx: &GeneratorContext, state: &mut PipelineState) -> Result<()> {
        state.refresh_missing();
        if !state.missing_fields.is_empty() {
            tracing::debug!(missing = ?state.missing_fields, "字段缺失");
        }
        Ok(())
    }
}
