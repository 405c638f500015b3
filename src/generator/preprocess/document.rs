//! 从上传的PDF/DOCX文件中提取纯文本

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use zip::ZipArchive;

use crate::error::PipelineError;

static DOCX_RUN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("valid regex")
});

/// 支持的文档类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => Ok(DocumentKind::Pdf),
            "docx" => Ok(DocumentKind::Docx),
            other => Err(PipelineError::UnsupportedFileType(if other.is_empty() {
                "(none)".to_string()
            } else {
                format!(".{}", other)
            })),
        }
    }
}

/// 读取文件并提取文本；结果为空白时报错
pub async fn extract_text(path: &Path) -> Result<String> {
    let kind = DocumentKind::from_path(path)?;
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(PipelineError::FileNotFound(path.to_path_buf()).into());
    }

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    tracing::debug!("📄 读取文档 {} ({} 字节)", path.display(), bytes.len());

    let text = tokio::task::spawn_blocking(move || match kind {
        DocumentKind::Pdf => pdf_text(&bytes),
        DocumentKind::Docx => docx_text(&bytes),
    })
    .await
    .context("document extraction task panicked")??;

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(PipelineError::EmptyDocument(PathBuf::from(path)).into());
    }
    Ok(text)
}

fn pdf_text(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| anyhow!("failed to parse pdf: {:?}", e))
}

/// 解压DOCX并读取 `word/document.xml` 中的段落文本
pub fn docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).context("docx is not a valid zip archive")?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("docx has no word/document.xml")?
        .read_to_string(&mut xml)?;
    Ok(document_xml_text(&xml))
}

/// 每个 `</w:p>` 结束一个段落，空段落被丢弃
pub fn document_xml_text(xml: &str) -> String {
    xml.split("</w:p>")
        .map(|paragraph| {
            DOCX_RUN_TEXT
                .captures_iter(paragraph)
                .filter_map(|c| c.get(1))
                .map(|m| unescape_xml(m.as_str()))
                .collect::<String>()
        })
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::docx_bytes;

    #[test]
    fn test_document_kind_from_path() {
        assert_eq!(
            DocumentKind::from_path(Path::new("a/paper.PDF")).unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("notes.docx")).unwrap(),
            DocumentKind::Docx
        );
        assert!(matches!(
            DocumentKind::from_path(Path::new("notes.txt")),
            Err(PipelineError::UnsupportedFileType(ext)) if ext == ".txt"
        ));
    }

    #[test]
    fn test_document_xml_text() {
        let xml = r#"<w:body><w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space="preserve"> world</w:t></w:r></w:p><w:p></w:p><w:p><w:r><w:tab/><w:t>R&amp;D &lt;2&gt;</w:t></w:r></w:p></w:body>"#;
        assert_eq!(document_xml_text(xml), "Hello world\nR&D <2>");
    }

    #[tokio::test]
    async fn test_extract_text_from_docx() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("paper.docx");
        std::fs::write(
            &path,
            docx_bytes("<w:p><w:r><w:t>Abstract</w:t></w:r></w:p><w:p><w:r><w:t>We study soils.</w:t></w:r></w:p>"),
        )
        .unwrap();

        let text = extract_text(&path).await.unwrap();
        assert_eq!(text, "Abstract\nWe study soils.");
    }

    #[tokio::test]
    async fn test_extract_text_errors() {
        let dir = tempfile::TempDir::new().unwrap();

        let missing = dir.path().join("missing.pdf");
        let err = extract_text(&missing).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::FileNotFound(_))
        ));

        let empty = dir.path().join("empty.docx");
        std::fs::write(&empty, docx_bytes("<w:p><w:r><w:t>  </w:t></w:r></w:p>")).unwrap();
        let err = extract_text(&empty).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::EmptyDocument(_))
        ));

        let other = dir.path().join("notes.txt");
        std::fs::write(&other, "hello").unwrap();
        assert!(extract_text(&other).await.is_err());
    }
}
