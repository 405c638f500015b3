//! 五个维度的可行性评估与最终报告

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::ReportMode;
use crate::generator::context::GeneratorContext;
use crate::generator::graph::Node;
use crate::types::feasibility::{FeasibilityDimension, FeasibilitySubScore, SubScoreDraft};
use crate::types::state::PipelineState;
use crate::utils::{coerce_text, extract_json_object, strip_code_fences, truncate_chars};

struct DimensionBrief {
    role: &'static str,
    context_label: &'static str,
    criteria: &'static str,
}

fn brief(dimension: FeasibilityDimension) -> DimensionBrief {
    match dimension {
        FeasibilityDimension::Technical => DimensionBrief {
            role: "technical expert",
            context_label: "Topics",
            criteria: "Tech stack maturity, integration complexity, data needs.",
        },
        FeasibilityDimension::Resource => DimensionBrief {
            role: "resource planner",
            context_label: "Domain",
            criteria: "Budget needs, infrastructure, licenses, tools availability.",
        },
        FeasibilityDimension::Skills => DimensionBrief {
            role: "talent manager",
            context_label: "Topics",
            criteria: "Required expertise, learning curve, team gaps.",
        },
        FeasibilityDimension::Scope => DimensionBrief {
            role: "project manager",
            context_label: "Problem",
            criteria: "Scope clarity, complexity, timeline realism, scope creep risk.",
        },
        FeasibilityDimension::Risk => DimensionBrief {
            role: "risk analyst",
            context_label: "Topics",
            criteria: "Identified risks, dependencies, external volatility, mitigation strategies.",
        },
    }
}

fn dimension_context(dimension: FeasibilityDimension, state: &PipelineState) -> String {
    let fields = &state.fields;
    let value = match dimension {
        FeasibilityDimension::Resource => fields.domain.clone().unwrap_or_default(),
        FeasibilityDimension::Scope => fields.problem_statement.clone().unwrap_or_default(),
        _ => fields.key_topics.join(", "),
    };
    if value.trim().is_empty() {
        "N/A".to_string()
    } else {
        value
    }
}

pub fn dimension_prompt(dimension: FeasibilityDimension, state: &PipelineState) -> String {
    let brief = brief(dimension);
    let schema = serde_json::to_string(&schemars::schema_for!(SubScoreDraft)).unwrap_or_default();
    format!(
        r#"You are a {role}. Quickly assess {key} feasibility (0-100).

Project: {project}
{context_label}: {context}
Rate: {criteria}

JSON:
{{"score": <0-100>, "explanation": "<1-2 sentences>", "recommendation": "<1 sentence>"}}

The JSON must satisfy this schema:
{schema}"#,
        role = brief.role,
        key = dimension.key(),
        project = truncate_chars(state.summary_text(), 300),
        context_label = brief.context_label,
        context = dimension_context(dimension, state),
        criteria = brief.criteria,
        schema = schema,
    )
}

/// 解析模型回复；缺少可用分数时返回 None
pub fn parse_sub_score(raw: &str) -> Option<FeasibilitySubScore> {
    let map = extract_json_object(&strip_code_fences(raw))?;
    let score = match map.get("score")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches("/100").trim().parse::<f64>().ok()?,
        _ => return None,
    };
    // "NaN" 与 "inf" 能被解析为 f64，但不是可用的分数
    if !score.is_finite() {
        return None;
    }
    let text = |key: &str| map.get(key).and_then(coerce_text);
    Some(FeasibilitySubScore::from_draft(SubScoreDraft {
        score,
        explanation: text("explanation").unwrap_or_else(|| "Unable to assess".to_string()),
        recommendation: text("recommendation").unwrap_or_default(),
    }))
}

/// 评估单个维度；调用或解析失败时返回中性分数
pub async fn assess_dimension(
    ctx: &GeneratorContext,
    state: &PipelineState,
    dimension: FeasibilityDimension,
) -> FeasibilitySubScore {
    let neutral = ctx.config.feasibility.neutral_score;
    match ctx.llm.complete(&dimension_prompt(dimension, state)).await {
        Ok(raw) => parse_sub_score(&raw).unwrap_or_else(|| {
            tracing::warn!("⚠️ {} 维度评估结果无法解析，使用中性分数 {}", dimension, neutral);
            FeasibilitySubScore::neutral(neutral)
        }),
        Err(e) => {
            tracing::warn!("⚠️ {} 维度评估失败，使用中性分数 {}: {}", dimension, neutral, e);
            FeasibilitySubScore::neutral(neutral)
        }
    }
}

/// 单个维度的评估节点
pub struct AssessDimensionNode(pub FeasibilityDimension);

impl AssessDimensionNode {
    pub fn node_name(dimension: FeasibilityDimension) -> &'static str {
        match dimension {
            FeasibilityDimension::Technical => "assess_technical",
            FeasibilityDimension::Resource => "assess_resources",
            FeasibilityDimension::Skills => "assess_skills",
            FeasibilityDimension::Scope => "assess_scope",
            FeasibilityDimension::Risk => "assess_risk",
        }
    }
}

#[async_trait]
impl Node for AssessDimensionNode {
    fn name(&self) -> &'static str {
        Self::node_name(self.0)
    }

    async fn run(&self, ctx: &GeneratorContext, state: &mut PipelineState) -> Result<()> {
        let sub_score = assess_dimension(ctx, state, self.0).await;
        state.feasibility.sub_scores.insert(self.0, sub_score);
        Ok(())
    }
}

/// 并发评估全部五个维度
pub struct AssessAllNode;

#[async_trait]
impl Node for AssessAllNode {
    fn name(&self) -> &'static str {
        "assess_all"
    }

    async fn run(&self, ctx: &GeneratorContext, state: &mut PipelineState) -> Result<()> {
        let snapshot: &PipelineState = state;
        let results = join_all(
            FeasibilityDimension::ALL
                .into_iter()
                .map(|dim| async move { (dim, assess_dimension(ctx, snapshot, dim).await) }),
        )
        .await;
        state.feasibility.sub_scores.extend(results);
        Ok(())
    }
}

/// 仅对成功的维度取平均并四舍五入；全部失败时返回中性分数
pub fn aggregate_score(
    sub_scores: &BTreeMap<FeasibilityDimension, FeasibilitySubScore>,
    neutral: u8,
) -> u8 {
    let succeeded: Vec<f64> = sub_scores
        .values()
        .filter(|s| !s.degraded)
        .map(|s| f64::from(s.score))
        .collect();
    if succeeded.is_empty() {
        return neutral;
    }
    let mean = succeeded.iter().sum::<f64>() / succeeded.len() as f64;
    mean.round().clamp(0.0, 100.0) as u8
}

fn scores_text(sub_scores: &BTreeMap<FeasibilityDimension, FeasibilitySubScore>) -> String {
    sub_scores
        .iter()
        .map(|(dim, s)| format!("- {}: {}/100", dim.label(), s.score))
        .collect::<Vec<_>>()
        .join("\n")
}

fn assessments_text(sub_scores: &BTreeMap<FeasibilityDimension, FeasibilitySubScore>) -> String {
    sub_scores
        .iter()
        .map(|(dim, s)| {
            format!(
                "{}: {}\nRecommendation: {}",
                dim.label(),
                s.explanation,
                s.recommendation
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 不依赖模型的报告
pub fn deterministic_report(
    final_score: u8,
    sub_scores: &BTreeMap<FeasibilityDimension, FeasibilitySubScore>,
) -> String {
    format!(
        r#"FEASIBILITY ASSESSMENT REPORT
Overall Score: {score}/100

Sub-Scores:
{scores}

Executive Summary:
Based on the multi-dimensional assessment, this project presents a feasibility score of {score}/100.

Detailed Findings:
{assessments}

Recommendations:
- Review all recommendations from individual assessments above
- Address critical gaps identified in lower-scoring dimensions
- Proceed with caution if overall score is below 60"#,
        score = final_score,
        scores = scores_text(sub_scores),
        assessments = assessments_text(sub_scores),
    )
}

pub fn report_prompt(state: &PipelineState, final_score: u8) -> String {
    let sub_scores = &state.feasibility.sub_scores;
    format!(
        r#"You are an executive summary expert. Create a comprehensive feasibility report.

Project:
{project}

Sub-Scores:
{scores}

Detailed Assessments:
{assessments}

Average Score: {score}/100

Create a professional report with:
1. Executive Summary (2-3 sentences on overall viability)
2. Detailed Findings (synthesize all assessment insights)
3. Key Recommendations (3-5 specific next steps)

Use clear sections and maintain professional tone."#,
        project = state.summary_text(),
        scores = scores_text(sub_scores),
        assessments = assessments_text(sub_scores),
        score = final_score,
    )
}

/// 汇总分数并生成报告
pub struct FeasibilityReportNode;

#[async_trait]
impl Node for FeasibilityReportNode {
    fn name(&self) -> &'static str {
        "feasibility_report"
    }

    async fn run(&self, ctx: &GeneratorContext, state: &mut PipelineState) -> Result<()> {
        let neutral = ctx.config.feasibility.neutral_score;
        if !state.feasibility.is_assessed() {
            for dimension in FeasibilityDimension::ALL {
                state.feasibility.sub_scores.entry(dimension).or_insert_with(|| {
                    tracing::warn!("⚠️ 维度 {} 没有评分，使用中性分数", dimension);
                    FeasibilitySubScore::neutral(neutral)
                });
            }
        }
        let final_score = aggregate_score(&state.feasibility.sub_scores, neutral);

        let report = match ctx.config.feasibility.report_mode {
            ReportMode::Deterministic => None,
            ReportMode::Llm => match ctx.llm.complete(&report_prompt(state, final_score)).await {
                Ok(reply) => Some(strip_code_fences(&reply)).filter(|r| !r.trim().is_empty()),
                Err(e) => {
                    tracing::warn!("⚠️ 可行性报告生成失败，使用确定性报告: {}", e);
                    None
                }
            },
        };
        let report = report
            .unwrap_or_else(|| deterministic_report(final_score, &state.feasibility.sub_scores));

        let feasibility = &mut state.feasibility;
        feasibility.final_score = Some(final_score);
        feasibility.final_report = Some(report);
        feasibility.overall_explanation = Some(format!(
            "Overall feasibility score: {}/100. See detailed report for breakdown.",
            final_score
        ));
        tracing::info!("📊 可行性评估完成，总分 {}/100", final_score);
        Ok(())
    }
}
