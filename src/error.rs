use std::path::PathBuf;

/// 流水线中可识别的错误
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("unsupported file type '{0}': only .pdf and .docx files are accepted")]
    UnsupportedFileType(String),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("could not extract text from file: {}", .0.display())]
    EmptyDocument(PathBuf),

    #[error("input text is empty")]
    EmptyInput,

    #[error("This is not a research paper. Please provide a research-oriented document.")]
    NotResearchPaper,

    #[error("chat session not found: {0}")]
    SessionNotFound(String),

    #[error("graph misconfigured: {0}")]
    GraphMisconfigured(String),

    #[error("graph run exceeded {0} steps")]
    StepLimitExceeded(usize),
}

/// 错误分层：校验类错误直接暴露给调用方，其余视为内部错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTier {
    Validation,
    Internal,
}

impl PipelineError {
    pub fn tier(&self) -> ErrorTier {
        match self {
            PipelineError::UnsupportedFileType(_)
            | PipelineError::FileNotFound(_)
            | PipelineError::EmptyDocument(_)
            | PipelineError::EmptyInput
            | PipelineError::NotResearchPaper
            | PipelineError::SessionNotFound(_) => ErrorTier::Validation,
            PipelineError::GraphMisconfigured(_) | PipelineError::StepLimitExceeded(_) => {
                ErrorTier::Internal
            }
        }
    }
}

/// 判定任意错误所属的层级
pub fn classify(err: &anyhow::Error) -> ErrorTier {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<PipelineError>())
        .map(PipelineError::tier)
        .unwrap_or(ErrorTier::Internal)
}

/// 面向调用方的错误描述，内部错误不暴露细节
pub fn public_message(err: &anyhow::Error) -> String {
    match classify(err) {
        ErrorTier::Validation => err.to_string(),
        ErrorTier::Internal => format!("Internal error: {}", err),
    }
}
