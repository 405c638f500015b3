use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use crate::generator::context::GeneratorContext;
use crate::types::feasibility::FeasibilityReport;
use crate::types::state::PipelineState;

/// 保存一次流水线的结果
pub async fn save(context: &GeneratorContext, state: &PipelineState) -> Result<Vec<PathBuf>> {
    DiskOutlet::new(DocTree::default()).save(context, state).await
}

pub trait Outlet {
    async fn save(&self, context: &GeneratorContext, state: &PipelineState) -> Result<Vec<PathBuf>>;
}

type Render = fn(&PipelineState) -> Option<String>;

/// 输出文件名与对应的渲染函数
pub struct DocTree {
    structure: Vec<(String, Render)>,
}

impl DocTree {
    pub fn new() -> Self {
        Self {
            structure: vec![
                ("summary.md".to_string(), render_summary as Render),
                ("roadmap.md".to_string(), render_roadmap as Render),
                ("feasibility.md".to_string(), render_feasibility as Render),
                ("state.json".to_string(), render_state as Render),
            ],
        }
    }
}

impl Default for DocTree {
    fn default() -> Self {
        Self::new()
    }
}

fn render_summary(state: &PipelineState) -> Option<String> {
    let summary = state.summary.as_deref()?;
    let mut doc = format!("# Summary\n\n{}\n", summary);
    if let Some(initial) = state
        .initial_summary
        .as_deref()
        .filter(|initial| *initial != summary)
    {
        doc.push_str(&format!("\n# Initial Summary\n\n{}\n", initial));
    }
    Some(doc)
}

fn render_roadmap(state: &PipelineState) -> Option<String> {
    state
        .roadmap
        .as_deref()
        .map(|roadmap| format!("# Implementation Roadmap\n\n{}\n", roadmap))
}

fn render_feasibility(state: &PipelineState) -> Option<String> {
    state.feasibility.to_report().map(|r| feasibility_markdown(&r))
}

fn render_state(state: &PipelineState) -> Option<String> {
    serde_json::to_string_pretty(state).ok()
}

pub fn feasibility_markdown(report: &FeasibilityReport) -> String {
    let mut doc = format!(
        "# Feasibility Assessment\n\nOverall Score: **{}/100**\n\n| Dimension | Score |\n| --- | --- |\n",
        report.final_score
    );
    for (dimension, score) in &report.sub_scores {
        let marker = if report.degraded_dimensions.contains(dimension) {
            " (neutral)"
        } else {
            ""
        };
        doc.push_str(&format!("| {} | {}{} |\n", dimension.label(), score, marker));
    }
    if !report.recommendations.is_empty() {
        doc.push_str("\n## Recommendations\n\n");
        for recommendation in &report.recommendations {
            doc.push_str(&format!("- {}\n", recommendation));
        }
    }
    if !report.detailed_report.trim().is_empty() {
        doc.push_str(&format!("\n## Detailed Report\n\n{}\n", report.detailed_report));
    }
    doc
}

pub struct DiskOutlet {
    doc_tree: DocTree,
}

impl DiskOutlet {
    pub fn new(doc_tree: DocTree) -> Self {
        Self { doc_tree }
    }
}

impl Outlet for DiskOutlet {
    async fn save(&self, context: &GeneratorContext, state: &PipelineState) -> Result<Vec<PathBuf>> {
        println!("\n🖊️ 文档存储中...");
        let output_dir = &context.config.output_path;
        fs::create_dir_all(output_dir)?;

        let mut saved = Vec::new();
        for (relative_path, render) in &self.doc_tree.structure {
            let Some(content) = render(state) else {
                tracing::debug!("没有可写入 {} 的内容", relative_path);
                continue;
            };
            let output_file_path = output_dir.join(relative_path);
            if let Some(parent_dir) = output_file_path.parent() {
                if !parent_dir.exists() {
                    fs::create_dir_all(parent_dir)?;
                }
            }
            fs::write(&output_file_path, content)?;
            println!("💾 已保存文档: {}", output_file_path.display());
            saved.push(output_file_path);
        }

        println!("💾 文档保存完成，输出目录: {}", output_dir.display());
        Ok(saved)
    }
}
