//! 各条流水线的图结构与进度标记

use anyhow::Result;

use crate::generator::graph::{CompiledGraph, END, ProgressMarker, StateGraph};
use crate::generator::nodes::*;
use crate::types::feasibility::FeasibilityDimension;
use crate::types::state::PipelineState;

fn research_gate(state: &PipelineState) -> &'static str {
    if state.is_research_like == Some(true) {
        "research"
    } else {
        "not_research"
    }
}

fn summary_gate(state: &PipelineState) -> &'static str {
    if state.summary_text().trim().is_empty() {
        "skip_research"
    } else {
        "research"
    }
}

fn missing_gate(state: &PipelineState) -> &'static str {
    if state.missing_fields.is_empty() {
        "refine"
    } else {
        "ask"
    }
}

fn fields_gate(state: &PipelineState) -> &'static str {
    if state.fields.is_complete() {
        "assess"
    } else {
        "extract"
    }
}

/// 文档 → 研究判定 → 摘要 → 字段 → 缺失检测
fn scoping_stage(graph: StateGraph) -> StateGraph {
    graph
        .add_node(ExtractTextNode)
        .add_node(CheckResearchNode)
        .add_node(SummarizeNode)
        .add_node(FillFieldsNode)
        .add_node(DetectMissingNode)
        .set_entry_point("extract_text")
        .add_edge("extract_text", "check_research")
        .add_conditional_edges(
            "check_research",
            research_gate,
            &[("research", "summarize"), ("not_research", END)],
        )
        .add_edge("summarize", "fill_fields")
        .add_edge("fill_fields", "detect_missing")
}

pub fn scoping_graph() -> Result<CompiledGraph> {
    scoping_stage(StateGraph::new())
        .add_edge("detect_missing", END)
        .on_enter(
            "extract_text",
            ProgressMarker::new("scoping", "Analyzing document and extracting key information...", 15),
        )
        .on_exit(
            "detect_missing",
            ProgressMarker::new("scoping", "Document analysis complete", 35),
        )
        .compile()
}

fn research_markers(graph: StateGraph, last: &str) -> StateGraph {
    graph
        .on_enter(
            "enrich",
            ProgressMarker::new("research", "Gathering additional research and context...", 55),
        )
        .on_exit(
            last,
            ProgressMarker::new("research", "Research gathering complete", 75),
        )
        .on_enter(
            "roadmap",
            ProgressMarker::new("roadmap", "Generating implementation roadmap...", 90),
        )
}

pub fn document_roadmap_graph() -> Result<CompiledGraph> {
    let graph = scoping_stage(StateGraph::new())
        .add_node(EnrichNode)
        .add_node(RefineNode)
        .add_node(RoadmapNode)
        .add_conditional_edges(
            "detect_missing",
            summary_gate,
            &[("research", "enrich"), ("skip_research", "roadmap")],
        )
        .add_edge("enrich", "refine")
        .add_edge("refine", "roadmap")
        .add_edge("roadmap", END)
        .on_enter(
            "extract_text",
            ProgressMarker::new("scoping", "Analyzing document and extracting key information...", 15),
        )
        .on_exit(
            "detect_missing",
            ProgressMarker::new("scoping", "Document analysis complete", 35),
        );
    research_markers(graph, "refine").compile()
}

pub fn summary_roadmap_graph() -> Result<CompiledGraph> {
    let graph = StateGraph::new()
        .add_node(FillFieldsNode)
        .add_node(DetectMissingNode)
        .add_node(EnrichNode)
        .add_node(RoadmapNode)
        .set_entry_point("fill_fields")
        .add_edge("fill_fields", "detect_missing")
        .add_conditional_edges(
            "detect_missing",
            summary_gate,
            &[("research", "enrich"), ("skip_research", "roadmap")],
        )
        .add_edge("enrich", "roadmap")
        .add_edge("roadmap", END)
        .on_enter(
            "fill_fields",
            ProgressMarker::new(
                "extract_fields",
                "Extracting structured information from summary...",
                15,
            ),
        )
        .on_exit(
            "detect_missing",
            ProgressMarker::new("extract_fields", "Document analysis complete", 35),
        );
    research_markers(graph, "enrich").compile()
}

/// 对话：提取 → 缺失检测 ⇒ 追问 | 基线摘要 → 研究风格细化 → 收尾
fn chat_stage(graph: StateGraph) -> StateGraph {
    graph
        .add_node(ChatExtractNode)
        .add_node(DetectMissingNode)
        .add_node(GenerateQuestionNode)
        .add_node(ComposeBaselineNode)
        .add_node(RefineResearchStyleNode)
        .add_node(FinalizeNode)
        .set_entry_point("chat_extract")
        .add_edge("chat_extract", "detect_missing")
        .add_conditional_edges(
            "detect_missing",
            missing_gate,
            &[("ask", "generate_question"), ("refine", "compose_baseline")],
        )
        .add_edge("generate_question", END)
        .add_edge("compose_baseline", "refine_research_style")
        .add_edge("refine_research_style", "finalize")
}

pub fn chat_graph() -> Result<CompiledGraph> {
    chat_stage(StateGraph::new())
        .add_edge("finalize", END)
        .compile()
}

pub fn chat_roadmap_graph() -> Result<CompiledGraph> {
    let graph = chat_stage(StateGraph::new())
        .add_node(EnrichNode)
        .add_node(RoadmapNode)
        .add_edge("finalize", "enrich")
        .add_edge("enrich", "roadmap")
        .add_edge("roadmap", END)
        .on_enter(
            "chat_extract",
            ProgressMarker::new("scoping", "Analyzing conversation and extracting key information...", 15),
        )
        .on_exit(
            "detect_missing",
            ProgressMarker::new("scoping", "Conversation analysis complete", 35),
        );
    research_markers(graph, "enrich").compile()
}

fn dimension_stage(dimension: FeasibilityDimension) -> (&'static str, &'static str, u8, u8) {
    match dimension {
        FeasibilityDimension::Technical => ("technical", "Assessing technical feasibility...", 30, 40),
        FeasibilityDimension::Resource => ("resource", "Assessing resource feasibility...", 50, 60),
        FeasibilityDimension::Skills => ("skills", "Assessing skills feasibility...", 70, 80),
        FeasibilityDimension::Scope => ("scope", "Assessing scope feasibility...", 85, 90),
        FeasibilityDimension::Risk => ("risk", "Assessing risk feasibility...", 95, 96),
    }
}

fn dimension_done_stage(dimension: FeasibilityDimension) -> &'static str {
    match dimension {
        FeasibilityDimension::Technical => "technical_complete",
        FeasibilityDimension::Resource => "resource_complete",
        FeasibilityDimension::Skills => "skills_complete",
        FeasibilityDimension::Scope => "scope_complete",
        FeasibilityDimension::Risk => "risk_complete",
    }
}

fn first_assessment(parallel: bool) -> &'static str {
    if parallel {
        "assess_all"
    } else {
        AssessDimensionNode::node_name(FeasibilityDimension::ALL[0])
    }
}

/// 五个维度评估与最终报告；入口为 [`first_assessment`]
fn assessment_stage(mut graph: StateGraph, parallel: bool) -> StateGraph {
    if parallel {
        graph = graph
            .add_node(AssessAllNode)
            .add_edge("assess_all", "feasibility_report")
            .on_enter(
                "assess_all",
                ProgressMarker::new("assess", "Assessing all feasibility dimensions...", 30),
            )
            .on_exit(
                "assess_all",
                ProgressMarker::new("assess_complete", "Feasibility dimensions assessed", 96),
            );
    } else {
        let names = FeasibilityDimension::ALL.map(AssessDimensionNode::node_name);
        for (i, dimension) in FeasibilityDimension::ALL.into_iter().enumerate() {
            let name = names[i];
            let next = names.get(i + 1).copied().unwrap_or("feasibility_report");
            let (stage, message, start, done) = dimension_stage(dimension);
            graph = graph
                .add_node(AssessDimensionNode(dimension))
                .add_edge(name, next)
                .on_enter(name, ProgressMarker::new(stage, message, start))
                .on_exit(
                    name,
                    ProgressMarker::computed(dimension_done_stage(dimension), done, move |state| {
                        let score = state
                            .feasibility
                            .sub_scores
                            .get(&dimension)
                            .map(|s| s.score)
                            .unwrap_or_default();
                        format!("{}: {}/100", dimension.label(), score)
                    }),
                );
        }
    }

    graph
        .add_node(FeasibilityReportNode)
        .add_edge("feasibility_report", END)
        .on_enter(
            "feasibility_report",
            ProgressMarker::new("report", "Generating final report...", 98),
        )
}

/// 摘要 ⇒（字段不完整时）提取字段 → 五维评估 → 报告
pub fn summary_feasibility_graph(parallel: bool) -> Result<CompiledGraph> {
    let first = first_assessment(parallel);
    let graph = StateGraph::new()
        .add_node(DetectMissingNode)
        .add_node(FillFieldsNode)
        .set_entry_point("detect_missing")
        .add_conditional_edges(
            "detect_missing",
            fields_gate,
            &[("extract", "fill_fields"), ("assess", first)],
        )
        .add_edge("fill_fields", first)
        .on_enter(
            "fill_fields",
            ProgressMarker::new(
                "extract_fields",
                "Extracting structured information from summary...",
                10,
            ),
        )
        .on_exit(
            "fill_fields",
            ProgressMarker::new("extract_fields_complete", "Structured information extracted", 20),
        );
    assessment_stage(graph, parallel).compile()
}

/// 文档 → 范围界定 ⇒ 细化摘要 → 五维评估 → 报告
pub fn document_feasibility_graph(parallel: bool) -> Result<CompiledGraph> {
    let graph = scoping_stage(StateGraph::new())
        .add_node(RefineNode)
        .add_edge("detect_missing", "refine")
        .add_edge("refine", first_assessment(parallel))
        .on_enter(
            "extract_text",
            ProgressMarker::new("scoping", "Extracting and analyzing document...", 5),
        )
        .on_exit(
            "refine",
            ProgressMarker::new("scoping_complete", "Document analysis complete", 20),
        );
    assessment_stage(graph, parallel).compile()
}

pub fn summarize_text_graph() -> Result<CompiledGraph> {
    StateGraph::new()
        .add_node(SummarizeNode)
        .set_entry_point("summarize")
        .add_edge("summarize", END)
        .compile()
}

pub fn summarize_file_graph() -> Result<CompiledGraph> {
    StateGraph::new()
        .add_node(ExtractTextNode)
        .add_node(SummarizeNode)
        .set_entry_point("extract_text")
        .add_edge("extract_text", "summarize")
        .add_edge("summarize", END)
        .compile()
}
