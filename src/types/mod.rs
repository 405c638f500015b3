pub mod chat;
pub mod feasibility;
pub mod output;
pub mod research;
pub mod scoping;
pub mod state;

pub use feasibility::{FeasibilityDimension, FeasibilityReport, FeasibilitySubScore};
pub use research::{EnrichmentFindings, KnowledgeSourceKind};
pub use scoping::{ScopingField, ScopingFields};
pub use state::PipelineState;
