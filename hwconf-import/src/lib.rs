//! # hwconf-import
//!
//! Merges a serialized project document into the session store:
//! - Document loading and feature-level validation
//! - Package resolution against installed packages
//! - Staged, dependency-ordered writes of session data
//!
//! The command-line front end lives in `main.rs`; everything it drives is
//! exposed here so other front ends can embed the pipeline.

pub mod dependencies;
pub mod document;
pub mod error;
mod fanout;
pub mod hierarchy;
pub mod orchestrator;
pub mod paths;
pub mod plan;
pub mod resolver;

#[cfg(test)]
mod test_support;

pub use document::{load_document_file, parse_document, NormalizedDocument, ProjectDocument};
pub use error::{ImportError, ImportResult, ResolutionStage};
pub use orchestrator::{ImportOrchestrator, ImportOutcome};
pub use resolver::{PackageResolver, ResolutionStrategy, ResolvedPackage};
