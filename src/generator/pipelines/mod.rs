//! 面向调用方的流水线入口
//!
//! 每个入口都构造对应的图、注入初始状态并执行；进度通过 [`ProgressReporter`] 上报，
//! 非流式调用传入 [`ProgressReporter::silent`] 即可。

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::PipelineError;
use crate::generator::context::GeneratorContext;
use crate::generator::graph::CompiledGraph;
use crate::generator::nodes::followup::{apply_user_response, followup_question};
use crate::generator::progress::ProgressReporter;
use crate::types::feasibility::FeasibilityReport;
use crate::types::scoping::ScopingFields;
use crate::types::state::PipelineState;

pub mod graphs;

/// 基于摘要的可行性评估请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeasibilityRequest {
    pub summary: String,
    /// 调用方已掌握的字段；完整时跳过字段提取
    pub fields: Option<ScopingFields>,
}

async fn run_graph(
    ctx: &GeneratorContext,
    graph: CompiledGraph,
    state: PipelineState,
    reporter: &ProgressReporter,
) -> Result<PipelineState> {
    let run = graph.invoke(ctx, state, reporter).await?;
    tracing::debug!("流水线经过节点: {}", run.visited.join(" → "));
    Ok(run.state)
}

fn report_roadmap_done(state: &PipelineState, reporter: &ProgressReporter) {
    if state.is_research_like == Some(false) {
        tracing::warn!("⚠️ 输入不是研究类文档，已跳过路线图生成");
        reporter.status("complete", PipelineError::NotResearchPaper.to_string(), 100);
    } else if state.roadmap.is_some() {
        reporter.status("complete", "Roadmap generated successfully!", 100);
    } else {
        tracing::warn!("⚠️ 流程结束但没有生成路线图");
        reporter.status("complete", "Roadmap generation completed with warnings", 100);
    }
}

/// 文档范围界定：提取、研究判定、摘要、字段与缺失检测
pub async fn run_scoping(
    ctx: &GeneratorContext,
    path: &Path,
    reporter: &ProgressReporter,
) -> Result<PipelineState> {
    reporter.status("init", "Starting document scoping...", 0);
    let state = run_graph(
        ctx,
        graphs::scoping_graph()?,
        PipelineState::from_file(path),
        reporter,
    )
    .await?;
    reporter.status("complete", "Scoping complete", 100);
    Ok(state)
}

/// 范围界定后按缺失字段向用户追问，最多 `chat.max_followups` 次
///
/// `ask` 返回 `None` 表示用户放弃补充。
pub async fn scope_with_followups<F>(
    ctx: &GeneratorContext,
    path: &Path,
    reporter: &ProgressReporter,
    mut ask: F,
) -> Result<PipelineState>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut state = run_scoping(ctx, path, reporter).await?;
    if state.is_research_like == Some(false) {
        return Ok(state);
    }

    while state.conversation.followup_attempts < ctx.config.chat.max_followups {
        let Some(question) = followup_question(&state.missing_fields) else {
            break;
        };
        state.conversation.followup_attempts += 1;
        state.conversation.last_question = Some(question.clone());

        let Some(answer) = ask(&question) else {
            break;
        };
        state.conversation.user_input = Some(answer.clone());
        apply_user_response(ctx.llm.as_ref(), &mut state, &answer).await;
    }

    if !state.missing_fields.is_empty() {
        tracing::warn!(
            "⚠️ 追问结束后仍有缺失字段: {}",
            state
                .missing_fields
                .iter()
                .map(|f| f.key())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(state)
}

/// 文档 → 路线图
pub async fn roadmap_from_document(
    ctx: &GeneratorContext,
    path: &Path,
    reporter: &ProgressReporter,
) -> Result<PipelineState> {
    reporter.status("init", "Starting roadmap generation pipeline...", 0);
    let state = run_graph(
        ctx,
        graphs::document_roadmap_graph()?,
        PipelineState::from_file(path),
        reporter,
    )
    .await?;
    report_roadmap_done(&state, reporter);
    Ok(state)
}

/// 已有摘要 → 路线图
pub async fn roadmap_from_summary(
    ctx: &GeneratorContext,
    summary: &str,
    reporter: &ProgressReporter,
) -> Result<PipelineState> {
    if summary.trim().is_empty() {
        return Err(PipelineError::EmptyInput.into());
    }
    reporter.status("init", "Starting roadmap generation pipeline...", 0);
    let state = run_graph(
        ctx,
        graphs::summary_roadmap_graph()?,
        PipelineState::from_summary(summary),
        reporter,
    )
    .await?;
    report_roadmap_done(&state, reporter);
    Ok(state)
}

/// 对话记录 → 路线图
pub async fn roadmap_from_transcript(
    ctx: &GeneratorContext,
    transcript: &str,
    reporter: &ProgressReporter,
) -> Result<PipelineState> {
    if transcript.trim().is_empty() {
        return Err(PipelineError::EmptyInput.into());
    }
    reporter.status("init", "Starting roadmap generation pipeline...", 0);
    let state = run_graph(
        ctx,
        graphs::chat_roadmap_graph()?,
        PipelineState::from_transcript(transcript),
        reporter,
    )
    .await?;
    report_roadmap_done(&state, reporter);
    Ok(state)
}

/// 摘要 → 可行性评估
pub async fn feasibility_from_summary(
    ctx: &GeneratorContext,
    request: FeasibilityRequest,
    reporter: &ProgressReporter,
) -> Result<PipelineState> {
    if request.summary.trim().is_empty() {
        return Err(PipelineError::EmptyInput.into());
    }
    reporter.status("init", "Starting feasibility assessment pipeline...", 0);

    let mut state = PipelineState::from_summary(&request.summary);
    if let Some(fields) = request.fields {
        state.fields.merge(fields);
    }
    let graph = graphs::summary_feasibility_graph(ctx.config.feasibility.parallel)?;
    let state = run_graph(ctx, graph, state, reporter).await?;

    reporter.status("complete", "Assessment complete", 100);
    Ok(state)
}

/// 文档 → 可行性评估；非研究类文档返回校验错误
pub async fn feasibility_from_document(
    ctx: &GeneratorContext,
    path: &Path,
    reporter: &ProgressReporter,
) -> Result<PipelineState> {
    reporter.status("init", "Starting feasibility assessment pipeline...", 0);
    let graph = graphs::document_feasibility_graph(ctx.config.feasibility.parallel)?;
    let state = run_graph(ctx, graph, PipelineState::from_file(path), reporter).await?;

    if state.is_research_like == Some(false) {
        return Err(PipelineError::NotResearchPaper.into());
    }
    reporter.status("complete", "Assessment complete", 100);
    Ok(state)
}

/// 提取评估结果
pub fn feasibility_output(state: &PipelineState) -> Result<FeasibilityReport> {
    if state.is_research_like == Some(false) {
        return Err(PipelineError::NotResearchPaper.into());
    }
    state
        .feasibility
        .to_report()
        .ok_or_else(|| anyhow::anyhow!("feasibility assessment produced no final score"))
}

pub async fn summarize_text(ctx: &GeneratorContext, text: &str) -> Result<PipelineState> {
    run_graph(
        ctx,
        graphs::summarize_text_graph()?,
        PipelineState::from_text(text),
        &ProgressReporter::silent(),
    )
    .await
}

pub async fn summarize_file(ctx: &GeneratorContext, path: &Path) -> Result<PipelineState> {
    run_graph(
        ctx,
        graphs::summarize_file_graph()?,
        PipelineState::from_file(path),
        &ProgressReporter::silent(),
    )
    .await
}

/// 执行一轮对话图：字段齐全时给出研究风格摘要，否则给出下一个追问
pub async fn chat_turn(ctx: &GeneratorContext, transcript: &str) -> Result<PipelineState> {
    run_graph(
        ctx,
        graphs::chat_graph()?,
        PipelineState::from_transcript(transcript),
        &ProgressReporter::silent(),
    )
    .await
}
