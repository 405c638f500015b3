pub mod cache;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod llm;
pub mod types;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::Config;
pub use error::{ErrorTier, PipelineError};
pub use generator::workflow::launch;
