use serde::{Deserialize, Serialize};

/// 项目范围的五个必填字段，顺序即缺失检测的顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopingField {
    ProblemStatement,
    Domain,
    Goals,
    Prerequisites,
    KeyTopics,
}

impl ScopingField {
    pub const ALL: [ScopingField; 5] = [
        ScopingField::ProblemStatement,
        ScopingField::Domain,
        ScopingField::Goals,
        ScopingField::Prerequisites,
        ScopingField::KeyTopics,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ScopingField::ProblemStatement => "problem_statement",
            ScopingField::Domain => "domain",
            ScopingField::Goals => "goals",
            ScopingField::Prerequisites => "prerequisites",
            ScopingField::KeyTopics => "key_topics",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScopingField::ProblemStatement => "Problem Statement",
            ScopingField::Domain => "Domain",
            ScopingField::Goals => "Goals",
            ScopingField::Prerequisites => "Prerequisites",
            ScopingField::KeyTopics => "Key Topics",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    /// 模型未能给出追问时使用的固定问题
    pub fn fallback_question(&self) -> &'static str {
        match self {
            ScopingField::ProblemStatement => "What problem are you trying to solve?",
            ScopingField::Domain => "What is the project's domain or industry?",
            ScopingField::Goals => "What are 3–5 concrete goals for this project?",
            ScopingField::Prerequisites => "What prerequisites or constraints should we note?",
            ScopingField::KeyTopics => "Which key topics or technologies are central here?",
        }
    }
}

impl std::fmt::Display for ScopingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// 结构化的项目范围字段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopingFields {
    pub problem_statement: Option<String>,
    pub domain: Option<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub key_topics: Vec<String>,
}

impl ScopingFields {
    pub fn is_field_empty(&self, field: ScopingField) -> bool {
        match field {
            ScopingField::ProblemStatement => is_blank(&self.problem_statement),
            ScopingField::Domain => is_blank(&self.domain),
            ScopingField::Goals => self.goals.is_empty(),
            ScopingField::Prerequisites => self.prerequisites.is_empty(),
            ScopingField::KeyTopics => self.key_topics.is_empty(),
        }
    }

    /// 按固定顺序列出缺失字段
    pub fn missing(&self) -> Vec<ScopingField> {
        ScopingField::ALL
            .into_iter()
            .filter(|f| self.is_field_empty(*f))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.missing().len() == ScopingField::ALL.len()
    }

    /// 合并新提取的字段，只用非空值覆盖，从不清空已有值
    pub fn merge(&mut self, incoming: ScopingFields) {
        if !is_blank(&incoming.problem_statement) {
            self.problem_statement = incoming.problem_statement;
        }
        if !is_blank(&incoming.domain) {
            self.domain = incoming.domain;
        }
        if !incoming.goals.is_empty() {
            self.goals = incoming.goals;
        }
        if !incoming.prerequisites.is_empty() {
            self.prerequisites = incoming.prerequisites;
        }
        if !incoming.key_topics.is_empty() {
            self.key_topics = incoming.key_topics;
        }
    }

    /// 字段的可读文本形式，列表用逗号连接
    pub fn display_value(&self, field: ScopingField) -> String {
        match field {
            ScopingField::ProblemStatement => self.problem_statement.clone().unwrap_or_default(),
            ScopingField::Domain => self.domain.clone().unwrap_or_default(),
            ScopingField::Goals => self.goals.join(", "),
            ScopingField::Prerequisites => self.prerequisites.join(", "),
            ScopingField::KeyTopics => self.key_topics.join(", "),
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|s| s.trim().is_empty())
}
