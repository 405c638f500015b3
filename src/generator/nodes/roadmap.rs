use anyhow::Result;
use async_trait::async_trait;

use crate::generator::context::GeneratorContext;
use crate::generator::graph::Node;
use crate::types::state::PipelineState;
use crate::utils::strip_code_fences;

/// 路线图的八个固定章节
pub const ROADMAP_HEADINGS: [&str; 8] = [
    "1. Prototype Development",
    "2. Testing & Validation",
    "3. Funding & Grants",
    "4. Manufacturing / Implementation",
    "5. Marketing & Promotion",
    "6. Launch / Deployment",
    "7. Maintenance & Iteration",
    "8. Scaling & Expansion",
];

pub fn roadmap_prompt(primary: &str) -> String {
    format!(
        r#"You are an expert product strategist.
Create a structured, actionable roadmap based on the research below.

STRICT REQUIREMENTS:
- Preserve EXACT headings (do not rename, reorder, add or remove):
{headings}

For each heading include EXACT subsections in this order:
  Objective: one concise sentence
  Key Actions:
    - 3–6 bullets starting with strong verbs
  Metrics:
    - 2–4 measurable indicators
  Risks & Mitigations:
    - 1–3 bullets formatted "Risk: ... | Mitigation: ..."

RESEARCH CONTENT:
{primary}

Return ONLY the roadmap with the exact headings and subsections."#,
        headings = ROADMAP_HEADINGS.join("\n"),
        primary = primary,
    )
}

/// 八个固定章节是否全部出现且顺序正确
pub fn roadmap_headings_in_order(text: &str) -> bool {
    let mut cursor = 0;
    for heading in ROADMAP_HEADINGS {
        match text[cursor..].find(heading) {
            Some(pos) => cursor += pos + heading.len(),
            None => return false,
        }
    }
    true
}

/// 基于最完整的调研上下文生成路线图
pub struct RoadmapNode;

#[async_trait]
impl Node for RoadmapNode {
    fn name(&self) -> &'static str {
        "roadmap"
    }

    async fn run(&self, ctx: &GeneratorContext, state: &mut PipelineState) -> Result<()> {
        let primary = state.primary_context().unwrap_or("(no context)");
        let reply = ctx.llm.complete(&roadmap_prompt(primary)).await?;
        let roadmap = strip_code_fences(&reply);
        if !roadmap_headings_in_order(&roadmap) {
            tracing::warn!("⚠️ 路线图缺少固定章节或顺序不正确");
        }
        state.set_roadmap(&roadmap);
        Ok(())
    }
}
