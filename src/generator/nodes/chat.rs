//! 对话流程节点：追问、基线摘要、研究风格细化与收尾

use anyhow::Result;
use async_trait::async_trait;

use crate::generator::context::GeneratorContext;
use crate::generator::graph::Node;
use crate::types::scoping::{ScopingField, ScopingFields};
use crate::types::state::PipelineState;
use crate::utils::strip_code_fences;

fn question_guide(field: Option<ScopingField>) -> &'static str {
    match field {
        Some(ScopingField::ProblemStatement) => "Ask for a crisp 1–2 sentence problem statement.",
        Some(ScopingField::Domain) => "Ask which domain/industry best describes the project.",
        Some(ScopingField::Goals) => "Ask the user to list 3–5 concrete goals (bullets are fine).",
        Some(ScopingField::Prerequisites) => {
            "Ask for prerequisites/dependencies like data, tools, approvals, or constraints."
        }
        Some(ScopingField::KeyTopics) => {
            "Ask for key topics/technologies (e.g., NLP, IoT, Blockchain)."
        }
        None => "Ask for the most relevant missing detail.",
    }
}

pub fn question_prompt(state: &PipelineState) -> String {
    let field = state.missing_fields.first().copied();
    let partial = serde_json::to_string_pretty(&state.fields).unwrap_or_default();
    format!(
        r#"You are a helpful scoping assistant.
Given the conversation transcript and the current partial state, ask EXACTLY ONE concise, direct question to elicit the missing field.

Missing field: {field}
Guidance: {guide}

Partial structured state (JSON):
{partial}

Conversation transcript:
{transcript}

Rules:
- Output ONLY the question text, no preface or extra lines.
- Keep it under 25 words.
- Do not ask multiple questions; no numbered lists.
- Be specific based on context; avoid generic phrasing."#,
        field = field.map(|f| f.key()).unwrap_or("(none)"),
        guide = question_guide(field),
        partial = partial,
        transcript = state.conversation.memory_text.as_deref().unwrap_or_default(),
    )
}

/// 针对第一个缺失字段生成一个追问
pub struct GenerateQuestionNode;

#[async_trait]
impl Node for GenerateQuestionNode {
    fn name(&self) -> &'static str {
        "generate_question"
    }

    async fn run(&self, ctx: &GeneratorContext, state: &mut PipelineState) -> Result<()> {
        let field = state.missing_fields.first().copied();
        let question = match ctx.llm.complete(&question_prompt(state)).await {
            Ok(reply) => strip_code_fences(&reply),
            Err(e) => {
                tracing::warn!("⚠️ 追问生成失败，使用固定问题: {}", e);
                String::new()
            }
        };
        let question = if question.trim().is_empty() {
            field
                .map(|f| f.fallback_question())
                .unwrap_or("Could you share the next key detail?")
                .to_string()
        } else {
            question.trim().to_string()
        };

        state.conversation.last_question = Some(question.clone());
        state.conversation.reply_text = Some(question);
        state.conversation.completed = false;
        Ok(())
    }
}

/// 由字段直接拼出的基线摘要
pub fn compose_baseline(fields: &ScopingFields) -> String {
    let mut lines = Vec::new();
    if let Some(problem) = &fields.problem_statement {
        lines.push(format!("Problem Statement: {}", problem));
    }
    if let Some(domain) = &fields.domain {
        lines.push(format!("Domain: {}", domain));
    }
    for (label, items) in [
        ("Goals", &fields.goals),
        ("Prerequisites", &fields.prerequisites),
        ("Key Topics", &fields.key_topics),
    ] {
        if !items.is_empty() {
            lines.push(format!("{}:\n- {}", label, items.join("\n- ")));
        }
    }
    if lines.is_empty() {
        "Project scope details summarized.".to_string()
    } else {
        lines.join("\n\n")
    }
}

pub struct ComposeBaselineNode;

#[async_trait]
impl Node for ComposeBaselineNode {
    fn name(&self) -> &'static str {
        "compose_baseline"
    }

    async fn run(&self, _ctx: &GeneratorContext, state: &mut PipelineState) -> Result<()> {
        let baseline = compose_baseline(&state.fields);
        state.record_summary(&baseline);
        Ok(())
    }
}

pub fn research_style_prompt(baseline: &str, fields: &ScopingFields) -> String {
    format!(
        r#"You are a research writer. Expand the project baseline below into a long-form, research-style summary.
Cover the background and motivation, the problem, objectives, the technical approach implied by the key topics,
dependencies and prerequisites, and open questions worth investigating. Write in clear paragraphs with short headings.
Do not invent specific numbers, names or results that are not implied by the input.

Baseline:
{baseline}

Domain: {domain}
Key topics: {topics}

Return ONLY the summary text."#,
        baseline = baseline,
        domain = fields.domain.as_deref().unwrap_or("(none)"),
        topics = fields.key_topics.join(", "),
    )
}

/// 将基线摘要扩写为研究风格的长摘要，失败时保留基线
pub struct RefineResearchStyleNode;

#[async_trait]
impl Node for RefineResearchStyleNode {
    fn name(&self) -> &'static str {
        "refine_research_style"
    }

    async fn run(&self, ctx: &GeneratorContext, state: &mut PipelineState) -> Result<()> {
        let prompt = research_style_prompt(state.summary_text(), &state.fields);
        match ctx.llm.complete(&prompt).await {
            Ok(reply) => state.refine_summary(&strip_code_fences(&reply)),
            Err(e) => tracing::warn!("⚠️ 研究风格摘要生成失败，保留基线摘要: {}", e),
        }
        Ok(())
    }
}

pub struct FinalizeNode;

#[async_trait]
impl Node for FinalizeNode {
    fn name(&self) -> &'static str {
        "finalize"
    }

    async fn run(&self, _ctx: &GeneratorContext, state: &mut PipelineState) -> Result<()> {
        if state.conversation.reply_text.is_none() {
            state.conversation.reply_text = state.summary.clone();
        }
        state.conversation.completed = true;
        Ok(())
    }
}
