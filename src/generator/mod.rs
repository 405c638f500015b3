pub mod context;
pub mod enrichment;
pub mod graph;
pub mod nodes;
pub mod outlet;
pub mod pipelines;
pub mod preprocess;
pub mod progress;
pub mod workflow;
