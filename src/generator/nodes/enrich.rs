use anyhow::Result;
use async_trait::async_trait;

use crate::generator::context::GeneratorContext;
use crate::generator::enrichment::{render_block, route};
use crate::generator::graph::Node;
use crate::types::research::RouteDecision;
use crate::types::state::PipelineState;
use crate::utils::{strip_code_fences, truncate_chars};

/// 累积调研文本中综合报告前的分隔行
pub const SYNTHESIS_SEPARATOR: &str = "--- LLM Synthesized Report ---";

const ENRICHMENT_BLOCK_MAX_CHARS: usize = 2500;

pub fn synthesis_prompt(state: &PipelineState, decision: &RouteDecision, enrichment: &str) -> String {
    let fields = &state.fields;
    format!(
        r#"You are a research arranger. Given required fields and enrichment data, produce a
concise but rich synthesis for product/roadmap planning.

Output format:
1. Executive Overview (2-3 sentences)
2. Problem & Context (bullet-like compact sentences)
3. Goals Elaboration (comma-separated refinement)
4. Key Topics & Their Roles (short list)
5. Prerequisites & Dependencies (short list)
6. Strategic Considerations (1 paragraph)

Return ONLY the arranged text (no JSON, no extra commentary).

Source Chosen: {source}
Reason: {reason}

Domain: {domain}
Problem Statement: {problem}
Goals: {goals}
Key Topics: {topics}
Prerequisites: {prerequisites}
Enrichment Data:
{enrichment}"#,
        source = decision.source,
        reason = decision.reason,
        domain = fields.domain.as_deref().unwrap_or("(none)"),
        problem = fields.problem_statement.as_deref().unwrap_or("(none)"),
        goals = fields.goals.join(", "),
        topics = fields.key_topics.join(", "),
        prerequisites = fields.prerequisites.join(", "),
        enrichment = truncate_chars(enrichment, ENRICHMENT_BLOCK_MAX_CHARS),
    )
}

/// 路由到一个知识来源、补充资料并生成综合报告
///
/// 只追加内容：已经采集过的来源不会重复请求，报告和累积文本都只增不减。
pub struct EnrichNode;

#[async_trait]
impl Node for EnrichNode {
    fn name(&self) -> &'static str {
        "enrich"
    }

    async fn run(&self, ctx: &GeneratorContext, state: &mut PipelineState) -> Result<()> {
        let decision = route(
            ctx.llm.as_ref(),
            ctx.config.enrichment.router_mode,
            &state.fields,
        )
        .await;
        let kind = decision.source;
        tracing::info!("🧭 选择知识来源 {}: {}", kind, decision.reason);

        if state.research.has_findings(kind) {
            tracing::debug!("知识来源 {} 已采集，跳过请求", kind);
        } else {
            match ctx.knowledge.get(kind).gather(&state.fields).await {
                Ok(findings) if findings.is_empty() => {
                    tracing::warn!("⚠️ 知识来源 {} 没有返回任何资料", kind)
                }
                Ok(findings) => {
                    let block = render_block(kind, &findings);
                    state.research.record_findings(kind, findings);
                    state.research.append_consolidated(&block);
                }
                Err(e) => tracing::warn!("⚠️ 知识来源 {} 请求失败，跳过补充: {}", kind, e),
            }
        }

        let enrichment = state
            .research
            .findings(kind)
            .map(|f| render_block(kind, f))
            .unwrap_or_default();
        match ctx
            .llm
            .complete(&synthesis_prompt(state, &decision, &enrichment))
            .await
        {
            Ok(reply) => {
                let report = strip_code_fences(&reply);
                if report.trim().is_empty() {
                    tracing::warn!("⚠️ 综合报告为空");
                } else {
                    let research = &mut state.research;
                    research.research_report = Some(match research.research_report.take() {
                        Some(previous) if !previous.trim().is_empty() => {
                            format!("{}\n\n{}", previous, report)
                        }
                        _ => report.clone(),
                    });
                    if research.consolidated.trim().is_empty() {
                        research.append_consolidated(&report);
                    } else {
                        research.append_consolidated(&format!("{}\n{}", SYNTHESIS_SEPARATOR, report));
                    }
                }
            }
            Err(e) => tracing::warn!("⚠️ 综合报告生成失败: {}", e),
        }

        state.research.route = Some(decision);
        Ok(())
    }
}
