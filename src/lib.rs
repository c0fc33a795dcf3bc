//! gomorph: multi-pass Go source-to-source transformer.
//!
//! - Bool fields of structs are packed into one unsigned flag word, and reads,
//!   writes and `if` tests of those fields become bit operations.
//! - String literals become byte-slice conversions.
//! - Equality `if`/`else if` ladders become map lookups.
//!
//! Parsing, printing and type facts live in `gomorph-syntax`; this crate holds
//! the passes, the scheduler and the project-level plumbing around them.

pub mod astutil;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod events;
pub mod manifest;
pub mod mapfile;
pub mod output;
pub mod pass;
pub mod passes;
pub mod pipeline;
pub mod registry;
pub mod stdlib;
pub mod walker;

// Re-exports for convenience
pub use config::{RunConfig, TransformOptions};
pub use context::{Context, SourceUnit, StructRecord};
pub use driver::{check, transform, transform_sources, RunSummary, SourceOutput};
pub use error::{Error, Result};
pub use events::{Metrics, SkipReason};
pub use pass::Pass;
pub use pipeline::parse_pipeline;
pub use registry::PassRegistry;
