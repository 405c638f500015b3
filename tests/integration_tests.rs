use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

use innoscope_rs::config::Config;
use innoscope_rs::generator::context::{GeneratorContext, KnowledgeSources};
use innoscope_rs::generator::enrichment::KnowledgeSource;
use innoscope_rs::generator::graph::Node;
use innoscope_rs::generator::nodes::roadmap::ROADMAP_HEADINGS;
use innoscope_rs::generator::nodes::summarize::refined_headings;
use innoscope_rs::generator::nodes::{EnrichNode, RefineNode};
use innoscope_rs::generator::pipelines::{self, FeasibilityRequest};
use innoscope_rs::generator::progress::ProgressReporter;
use innoscope_rs::llm::LanguageModel;
use innoscope_rs::types::output::{RoadmapOutput, RunStatus};
use innoscope_rs::types::research::{EnrichmentFindings, KnowledgeSourceKind};
use innoscope_rs::types::scoping::ScopingFields;
use innoscope_rs::types::state::PipelineState;
use innoscope_rs::types::FeasibilityDimension;

/// 按prompt关键字应答的模型
struct RuleModel {
    rules: Vec<(&'static str, Option<String>)>,
}

impl RuleModel {
    fn new() -> Self {
        Self { rules: Vec::new() }
    }

    fn on(mut self, needle: &'static str, reply: impl Into<String>) -> Self {
        self.rules.push((needle, Some(reply.into())));
        self
    }

    fn failing(mut self, needle: &'static str) -> Self {
        self.rules.push((needle, None));
        self
    }
}

#[async_trait]
impl LanguageModel for RuleModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle))
            .and_then(|(_, reply)| reply.clone())
            .ok_or_else(|| anyhow!("model unavailable"))
    }
}

struct CountingSource {
    kind: KnowledgeSourceKind,
    calls: AtomicUsize,
}

impl CountingSource {
    fn new(kind: KnowledgeSourceKind) -> Self {
        Self {
            kind,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl KnowledgeSource for CountingSource {
    async fn gather(&self, _fields: &ScopingFields) -> Result<EnrichmentFindings> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(EnrichmentFindings {
            domain_context: vec![format!("{} background on the domain.", self.kind)],
            problem_context: vec!["Irrigation is a major water consumer.".to_string()],
            goals_context: vec!["Precision agriculture improves yields.".to_string()],
            prerequisites_context: vec!["Requires calibrated sensors.".to_string()],
            key_topics_context: vec!["[IoT] Networks of connected devices.".to_string()],
        })
    }
}

struct Setup {
    context: GeneratorContext,
    encyclopedia: Arc<CountingSource>,
    web: Arc<CountingSource>,
    dir: TempDir,
}

fn setup(model: RuleModel) -> Setup {
    let dir = TempDir::new().unwrap();
    let mut config = Config {
        output_path: dir.path().join("out"),
        ..Default::default()
    };
    config.relocate_internal(dir.path().join(".innoscope"));
    config.cache.enabled = false;

    let encyclopedia = Arc::new(CountingSource::new(KnowledgeSourceKind::Encyclopedia));
    let web = Arc::new(CountingSource::new(KnowledgeSourceKind::WebSearch));
    let knowledge = KnowledgeSources {
        encyclopedia: encyclopedia.clone(),
        web: web.clone(),
    };
    let context = GeneratorContext::with_components(config, Arc::new(model), knowledge);
    Setup {
        context,
        encyclopedia,
        web,
        dir,
    }
}

fn write_docx(dir: &Path, name: &str, paragraphs: &[&str]) -> PathBuf {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(format!("<w:document><w:body>{}</w:body></w:document>", body).as_bytes())
            .unwrap();
        zip.finish().unwrap();
    }
    let path = dir.join(name);
    std::fs::write(&path, buf.into_inner()).unwrap();
    path
}

const FIELDS: &str = r#"```json
{"problem_statement": "Smallholder farms over-irrigate", "domain": "Agricultural science",
 "goals": ["Reduce water use"], "prerequisites": ["Soil sensors"], "key_topics": ["IoT", "Hydrology"]}
```"#;

fn roadmap_text() -> String {
    ROADMAP_HEADINGS
        .iter()
        .map(|h| format!("{}\nObjective: progress.\nKey Actions:\n  - Execute\nMetrics:\n  - Adoption", h))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn research_model() -> RuleModel {
    RuleModel::new()
        .on("expert product strategist", roadmap_text())
        .on("research arranger", "1. Executive Overview\nSensors cut irrigation.")
        .on("Extract the following", FIELDS)
        .on("Summarize the following research", "## Abstract\nSensors measure soil moisture.")
        .on("appears to be a research paper", "Yes")
}

#[tokio::test]
async fn non_research_document_short_circuits() {
    let s = setup(RuleModel::new().on("appears to be a research paper", "No."));
    let path = write_docx(s.dir.path(), "menu.docx", &["Lunch menu", "Soup of the day"]);

    let state = pipelines::roadmap_from_document(&s.context, &path, &ProgressReporter::silent())
        .await
        .unwrap();

    let output = RoadmapOutput::from_state(&state);
    assert_eq!(output.status, RunStatus::Warning);
    assert!(output.message.unwrap().contains("not a research paper"));
    assert!(output.roadmap.is_none());
    assert!(output.refined_summary.is_none());
    assert_eq!(s.encyclopedia.calls.load(Ordering::SeqCst), 0);
    assert_eq!(s.web.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn research_document_produces_summary_and_ordered_roadmap() {
    let s = setup(research_model());
    let path = write_docx(
        s.dir.path(),
        "paper.docx",
        &[
            "Abstract",
            "Low-cost sensors measure soil moisture &amp; guide irrigation.",
            "Results",
            "Water use fell in all trial plots.",
        ],
    );

    let state = pipelines::roadmap_from_document(&s.context, &path, &ProgressReporter::silent())
        .await
        .unwrap();

    assert!(state.raw_text().contains("moisture & guide"));
    assert!(!state.summary_text().is_empty());
    assert_eq!(state.fields.domain.as_deref(), Some("Agricultural science"));

    let roadmap = state.roadmap.as_deref().unwrap();
    let mut cursor = 0;
    for heading in ROADMAP_HEADINGS {
        let pos = roadmap[cursor..].find(heading).unwrap();
        cursor += pos + heading.len();
    }

    // "science" 属于百科类主题
    assert_eq!(s.encyclopedia.calls.load(Ordering::SeqCst), 1);
    assert_eq!(s.web.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn feasibility_partial_failure_averages_successful_dimensions() {
    let s = setup(
        RuleModel::new()
            .on("executive summary expert", "Executive Summary\nWorkable.")
            .on("technical expert", r#"{"score": 88, "explanation": "x", "recommendation": "y"}"#)
            .on("resource planner", r#"{"score": "61/100", "explanation": "x", "recommendation": "y"}"#)
            .failing("talent manager")
            .on("project manager", "The scope looks fine overall.")
            .on("risk analyst", r#"{"score": 70, "explanation": "x", "recommendation": "y"}"#),
    );
    let request = FeasibilityRequest {
        summary: "Sensors measure soil moisture.".to_string(),
        fields: Some(ScopingFields {
            problem_statement: Some("Over-irrigation".to_string()),
            domain: Some("Agriculture".to_string()),
            goals: vec!["Save water".to_string()],
            prerequisites: vec!["Sensors".to_string()],
            key_topics: vec!["IoT".to_string()],
        }),
    };

    let state = pipelines::feasibility_from_summary(&s.context, request, &ProgressReporter::silent())
        .await
        .unwrap();
    let report = pipelines::feasibility_output(&state).unwrap();

    // (88 + 61 + 70) / 3 = 73
    assert_eq!(report.final_score, 73);
    assert_eq!(report.sub_scores[&FeasibilityDimension::Skills], 50);
    assert_eq!(report.sub_scores[&FeasibilityDimension::Scope], 50);
    assert_eq!(report.degraded_dimensions.len(), 2);
}

#[tokio::test]
async fn malformed_extraction_keeps_declared_shape() {
    let s = setup(
        RuleModel::new()
            .on("expert product strategist", roadmap_text())
            .on("research arranger", "Synthesis")
            .on("Extract the following", "Sure! {\"domain\": [unterminated"),
    );

    let state = pipelines::roadmap_from_summary(
        &s.context,
        "A platform that routes delivery drones.",
        &ProgressReporter::silent(),
    )
    .await
    .unwrap();

    assert_eq!(state.fields, ScopingFields::default());
    assert_eq!(state.missing_fields.len(), 5);
    assert!(state.roadmap.is_some());
}

#[tokio::test]
async fn refining_twice_keeps_headings() {
    let s = setup(RuleModel::new());
    let mut state = PipelineState::from_summary("## Abstract\nSensors measure soil moisture.");
    state.fields.domain = Some("Agriculture".to_string());

    RefineNode.run(&s.context, &mut state).await.unwrap();
    let first = refined_headings(state.summary_text());
    RefineNode.run(&s.context, &mut state).await.unwrap();
    let second = refined_headings(state.summary_text());

    assert_eq!(first.len(), 7);
    assert_eq!(first, second);
    assert_eq!(
        state.initial_summary.as_deref(),
        Some("## Abstract\nSensors measure soil moisture.")
    );
}

#[tokio::test]
async fn enrichment_is_append_only() {
    let s = setup(RuleModel::new().on("research arranger", "Synthesis round."));
    let mut state = PipelineState::from_summary("Sensors measure soil moisture.");
    state.fields.domain = Some("Agricultural science".to_string());

    EnrichNode.run(&s.context, &mut state).await.unwrap();
    let consolidated_once = state.research.consolidated.clone();
    let findings_once = state.research.encyclopedia.clone();

    EnrichNode.run(&s.context, &mut state).await.unwrap();

    assert_eq!(s.encyclopedia.calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.research.encyclopedia, findings_once);
    assert!(state.research.consolidated.starts_with(&consolidated_once));
    assert!(state.research.consolidated.len() > consolidated_once.len());
    assert_eq!(
        state
            .research
            .research_report
            .as_deref()
            .unwrap()
            .matches("Synthesis round.")
            .count(),
        2
    );
}
