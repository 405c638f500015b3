//! 单元测试共用的替身实现

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::io::{Cursor, Write};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::Config;
use crate::generator::context::{GeneratorContext, KnowledgeSources};
use crate::generator::enrichment::KnowledgeSource;
use crate::llm::LanguageModel;
use crate::types::research::EnrichmentFindings;
use crate::types::scoping::ScopingFields;

/// 按prompt中的关键字返回预设回复的模型
#[derive(Default)]
pub struct ScriptedModel {
    rules: Vec<(String, Result<String, String>)>,
    default: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, needle: &str, response: &str) -> Self {
        self.rules
            .push((needle.to_string(), Ok(response.to_string())));
        self
    }

    pub fn fail(mut self, needle: &str) -> Self {
        self.rules
            .push((needle.to_string(), Err(format!("scripted failure for '{}'", needle))));
        self
    }

    pub fn otherwise(mut self, response: &str) -> Self {
        self.default = Some(response.to_string());
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn calls_containing(&self, needle: &str) -> usize {
        self.prompts().iter().filter(|p| p.contains(needle)).count()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        for (needle, response) in &self.rules {
            if prompt.contains(needle.as_str()) {
                return response.clone().map_err(|e| anyhow!(e));
            }
        }
        self.default
            .clone()
            .ok_or_else(|| anyhow!("no scripted reply for prompt"))
    }

    fn model_name(&self) -> String {
        "scripted".to_string()
    }
}

/// 返回固定结果的知识来源
pub struct StaticSource {
    findings: Option<EnrichmentFindings>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(findings: EnrichmentFindings) -> Self {
        Self {
            findings: Some(findings),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            findings: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeSource for StaticSource {
    async fn gather(&self, _fields: &ScopingFields) -> Result<EnrichmentFindings> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.findings
            .clone()
            .ok_or_else(|| anyhow!("source unavailable"))
    }
}

pub fn sample_findings(tag: &str) -> EnrichmentFindings {
    EnrichmentFindings {
        domain_context: vec![format!("{} domain background.", tag)],
        problem_context: vec![format!("{} problem context.", tag)],
        goals_context: vec![format!("{} goal context.", tag)],
        prerequisites_context: vec![format!("{} prerequisite context.", tag)],
        key_topics_context: vec![format!("[topic] {} topic context.", tag)],
    }
}

pub struct TestHarness {
    pub context: GeneratorContext,
    pub llm: Arc<ScriptedModel>,
    pub encyclopedia: Arc<StaticSource>,
    pub web: Arc<StaticSource>,
    pub temp_dir: tempfile::TempDir,
}

/// 使用临时目录与替身组件构造上下文
pub fn harness(llm: ScriptedModel) -> TestHarness {
    harness_with_config(llm, |_| {})
}

pub fn harness_with_config(llm: ScriptedModel, adjust: impl FnOnce(&mut Config)) -> TestHarness {
    let temp_dir = tempfile::TempDir::new().expect("temp dir");
    let mut config = Config {
        output_path: temp_dir.path().join("out"),
        ..Default::default()
    };
    config.relocate_internal(temp_dir.path().join(".innoscope"));
    config.cache.enabled = false;
    adjust(&mut config);

    let llm = Arc::new(llm);
    let encyclopedia = Arc::new(StaticSource::new(sample_findings("Encyclopedia")));
    let web = Arc::new(StaticSource::new(sample_findings("Web")));
    let knowledge = KnowledgeSources {
        encyclopedia: encyclopedia.clone(),
        web: web.clone(),
    };
    let context = GeneratorContext::with_components(config, llm.clone(), knowledge);

    TestHarness {
        context,
        llm,
        encyclopedia,
        web,
        temp_dir,
    }
}

/// 只包含 `word/document.xml` 的最小docx
pub fn docx_bytes(document_xml: &str) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("word/document.xml", options).expect("start docx entry");
        zip.write_all(document_xml.as_bytes()).expect("write docx entry");
        zip.finish().expect("finish docx");
    }
    buf.into_inner()
}

/// 每段一个 `<w:p>` 的docx
pub fn docx_from_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    let xml = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect::<String>();
    docx_bytes(&format!("<w:document><w:body>{}</w:body></w:document>", xml))
}
