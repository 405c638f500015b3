//! 流水线中的各个处理节点

pub mod chat;
pub mod enrich;
pub mod feasibility;
pub mod fields;
pub mod followup;
pub mod ingest;
pub mod roadmap;
pub mod summarize;

pub use chat::{ComposeBaselineNode, FinalizeNode, GenerateQuestionNode, RefineResearchStyleNode};
pub use enrich::EnrichNode;
pub use feasibility::{AssessAllNode, AssessDimensionNode, FeasibilityReportNode};
pub use fields::{ChatExtractNode, DetectMissingNode, FillFieldsNode};
pub use ingest::{CheckResearchNode, ExtractTextNode};
pub use roadmap::RoadmapNode;
pub use summarize::{RefineNode, SummarizeNode};

#[cfg(test)]
mod tests;
