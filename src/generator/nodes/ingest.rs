use anyhow::Result;
use async_trait::async_trait;

use crate::error::PipelineError;
use crate::generator::context::GeneratorContext;
use crate::generator::graph::Node;
use crate::generator::preprocess::document;
use crate::types::state::PipelineState;
use crate::utils::truncate_chars;

/// 读取文件文本；状态中已有文本时直接沿用
pub struct ExtractTextNode;

#[async_trait]
impl Node for ExtractTextNode {
    fn name(&self) -> &'static str {
        "extract_text"
    }

    async fn run(&self, _ctx: &GeneratorContext, state: &mut PipelineState) -> Result<()> {
        if !state.raw_text().trim().is_empty() {
            return Ok(());
        }
        let path = state.file_path.clone().ok_or(PipelineError::EmptyInput)?;
        let text = document::extract_text(&path).await?;
        tracing::info!("📄 已提取文档文本 {} 字符", text.chars().count());
        state.raw_text = Some(text);
        Ok(())
    }
}

/// 判断文本是否为研究类文档
pub struct CheckResearchNode;

fn research_check_prompt(text: &str) -> String {
    format!(
        r#"You are an expert assistant. Determine if the following text appears to be a research paper
(academic tone, abstract, methodology, experiments, results, references).
Respond with ONLY 'Yes' or 'No'.

Text: {}"#,
        truncate_chars(text, 2000)
    )
}

/// 回答以 yes 开头（忽略大小写和前导标点）即视为肯定
pub fn parse_yes_no(answer: &str) -> bool {
    answer
        .trim()
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
        .starts_with("yes")
}

#[async_trait]
impl Node for CheckResearchNode {
    fn name(&self) -> &'static str {
        "check_research"
    }

    async fn run(&self, ctx: &GeneratorContext, state: &mut PipelineState) -> Result<()> {
        let text = state.raw_text();
        if text.trim().is_empty() {
            return Err(PipelineError::EmptyInput.into());
        }
        let answer = ctx.llm.complete(&research_check_prompt(text)).await?;
        let is_research = parse_yes_no(&answer);
        if !is_research {
            tracing::warn!("⚠️ 文档不是研究类内容，回答: {}", answer.trim());
        }
        state.is_research_like = Some(is_research);
        Ok(())
    }
}
