//! Core business logic modules
//!
//! Everything here works against the service traits; no direct I/O

pub mod gallery;
pub mod instructions;
pub mod likes;
pub mod preview;
pub mod publish;
pub mod relay;

// Re-export commonly used types
pub use instructions::{TargetLanguage, build_completion, contains_cjk};
pub use relay::{PromptOptimizer, RelayConfig, RelayPhase, RelayStream};
