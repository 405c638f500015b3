//! 摘要生成与细化

use anyhow::Result;
use async_trait::async_trait;

use crate::error::PipelineError;
use crate::generator::context::GeneratorContext;
use crate::generator::graph::Node;
use crate::types::scoping::ScopingFields;
use crate::types::state::PipelineState;
use crate::utils::{strip_code_fences, truncate_chars};

/// 细化后摘要固定使用的章节标题
pub const REFINED_HEADINGS: [&str; 7] = [
    "Overview",
    "Problem Statement",
    "Domain",
    "Goals",
    "Prerequisites",
    "Key Topics",
    "Research Context",
];

const OVERVIEW_MAX_CHARS: usize = 600;
const RESEARCH_CONTEXT_MAX_CHARS: usize = 2500;

pub fn summarize_prompt(text: &str) -> String {
    format!(
        r#"Summarize the following research while keeping as much detail as possible.
Organize the summary with headings like Abstract, Introduction, Methodology, Results, Conclusion.

Text: {}"#,
        truncate_chars(text, 5000)
    )
}

/// 生成首版摘要
pub struct SummarizeNode;

#[async_trait]
impl Node for SummarizeNode {
    fn name(&self) -> &'static str {
        "summarize"
    }

    async fn run(&self, ctx: &GeneratorContext, state: &mut PipelineState) -> Result<()> {
        let text = state.raw_text();
        if text.trim().is_empty() {
            return Err(PipelineError::EmptyInput.into());
        }
        let summary = ctx.llm.complete(&summarize_prompt(text)).await?;
        state.record_summary(&strip_code_fences(&summary));
        Ok(())
    }
}

fn heading_line(line: &str) -> Option<&'static str> {
    let cleaned = line
        .trim()
        .trim_start_matches('#')
        .trim()
        .trim_matches('*')
        .trim()
        .trim_end_matches(':')
        .trim();
    REFINED_HEADINGS
        .into_iter()
        .find(|h| h.eq_ignore_ascii_case(cleaned))
}

/// 文本中出现的固定章节标题，按首次出现的顺序
pub fn refined_headings(text: &str) -> Vec<&'static str> {
    let mut found = Vec::new();
    for heading in text.lines().filter_map(heading_line) {
        if !found.contains(&heading) {
            found.push(heading);
        }
    }
    found
}

pub fn has_all_refined_headings(text: &str) -> bool {
    refined_headings(text).len() == REFINED_HEADINGS.len()
}

/// 摘要的第一段正文
fn overview_text(summary: &str) -> String {
    let paragraph = summary
        .split("\n\n")
        .map(|block| {
            block
                .lines()
                .filter(|l| !l.trim_start().starts_with('#') && heading_line(l).is_none())
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .find(|p| !p.is_empty())
        .unwrap_or_default();
    truncate_chars(&paragraph, OVERVIEW_MAX_CHARS).to_string()
}

fn bullet_list(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items
            .iter()
            .map(|i| format!("- {}", i))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// 不依赖模型、直接由状态拼出的细化摘要
pub fn structured_summary(state: &PipelineState) -> String {
    let overview = overview_text(state.summary_text());
    let fields = &state.fields;
    let research = state
        .primary_context()
        .filter(|_| state.research.has_context())
        .map(|c| truncate_chars(c, RESEARCH_CONTEXT_MAX_CHARS).to_string());

    let sections = [
        (
            "Overview",
            if overview.is_empty() {
                "Project scope details summarized.".to_string()
            } else {
                overview
            },
        ),
        (
            "Problem Statement",
            fields
                .problem_statement
                .clone()
                .unwrap_or_else(|| "Not specified.".to_string()),
        ),
        (
            "Domain",
            fields
                .domain
                .clone()
                .unwrap_or_else(|| "Not specified.".to_string()),
        ),
        ("Goals", bullet_list(&fields.goals, "Not specified.")),
        (
            "Prerequisites",
            bullet_list(&fields.prerequisites, "Not specified."),
        ),
        ("Key Topics", bullet_list(&fields.key_topics, "Not specified.")),
        (
            "Research Context",
            research.unwrap_or_else(|| "No external research gathered yet.".to_string()),
        ),
    ];

    sections
        .iter()
        .map(|(heading, body)| format!("## {}\n{}", heading, body.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn fields_block(fields: &ScopingFields) -> String {
    format!(
        "Problem Statement: {}\nDomain: {}\nGoals: {}\nPrerequisites: {}\nKey Topics: {}",
        fields.problem_statement.as_deref().unwrap_or("(none)"),
        fields.domain.as_deref().unwrap_or("(none)"),
        fields.goals.join("; "),
        fields.prerequisites.join("; "),
        fields.key_topics.join("; "),
    )
}

pub fn refine_prompt(state: &PipelineState) -> String {
    let research = if state.research.has_context() {
        state
            .primary_context()
            .map(|c| truncate_chars(c, RESEARCH_CONTEXT_MAX_CHARS))
            .unwrap_or("(none)")
    } else {
        "(none)"
    };
    let headings = REFINED_HEADINGS
        .iter()
        .map(|h| format!("## {}", h))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"You are refining a project summary for research and roadmap planning.
Rewrite the summary below so it integrates the structured fields and the research context.

Use EXACTLY these markdown headings, in this order, each on its own line, and no other headings:
{headings}

Current summary:
{summary}

Structured fields:
{fields}

Research context:
{research}

Return ONLY the refined summary."#,
        headings = headings,
        summary = state.summary_text(),
        fields = fields_block(&state.fields),
        research = research,
    )
}

/// 结合字段与调研内容细化摘要，回复缺少标题时使用确定性版本
pub struct RefineNode;

#[async_trait]
impl Node for RefineNode {
    fn name(&self) -> &'static str {
        "refine"
    }

    async fn run(&self, ctx: &GeneratorContext, state: &mut PipelineState) -> Result<()> {
        let refined = match ctx.llm.complete(&refine_prompt(state)).await {
            Ok(reply) => {
                let reply = strip_code_fences(&reply);
                if has_all_refined_headings(&reply) {
                    reply
                } else {
                    tracing::warn!("⚠️ 细化摘要缺少固定章节，使用确定性摘要");
                    structured_summary(state)
                }
            }
            Err(e) => {
                tracing::warn!("⚠️ 摘要细化失败，使用确定性摘要: {}", e);
                structured_summary(state)
            }
        };
        if state.initial_summary.is_none() {
            state.initial_summary = state.summary.clone();
        }
        state.record_summary(&refined);
        Ok(())
    }
}
