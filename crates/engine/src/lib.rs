#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`EngineError`)
//! - [`config`]: Engine configuration (`EngineConfig`, builder, `CheckToggles`)
//! - [`closure`]: Required module set and its complement
//! - [`excludes`]: Module link/unlink plan, excludes manifest, build output cleanup
//! - [`version_style`]: Version-style detection and convergence edits
//! - [`resolver`]: Artifact resolution (`ArtifactResolver` trait, local repository, in-memory)
//! - [`flatten`]: BOM flattening, serialization and drift detection
//! - [`banned`]: Banned-dependency rules and audit (report / fix)
//! - [`checks`]: Pairing, staleness, transitive diff and version alignment checks
//! - [`files`]: Write-on-change helpers
//! - [`engine`]: Main orchestrator (`ProdEngine`, `ProdEngineBuilder`)
//!
//! # Architecture
//!
//! ```text
//! prodtree.toml --> EngineConfig --> ProdEngine
//!                                        |
//!                  +---------------------+----------------------+
//!                  |                                            |
//!             tree phase                                   BOM phase
//!   closure -> links + version styles            resolver -> flatten -> audit
//!                  |                                            |
//!       descriptors, excludes.txt                  flattened BOMs, checks
//! ```

pub mod banned;
pub mod checks;
pub mod closure;
pub mod config;
pub mod engine;
pub mod error;
pub mod excludes;
pub mod files;
pub mod flatten;
pub mod resolver;
pub mod version_style;

// --- Public API Re-exports ---

// Orchestrator
pub use engine::{BomReport, ProdEngine, ProdEngineBuilder, ProdReport, TreeReport};

// Configuration
pub use config::{CheckToggles, EngineConfig, EngineConfigBuilder};

// Error
pub use error::EngineError;

// Closure
pub use closure::{complement, required_closure, select_roots};

// Version styles
pub use version_style::{StyleContext, VersionSpec, VersionStyle, VersionStyleClassifier};

// Resolution and flattening
pub use flatten::{Drift, DriftEntry, FlattenResult};
pub use resolver::{
    ArtifactResolver, CollectRequest, DependencyNode, DependencySpec, DependencyVisitor,
    LocalRepositoryResolver, ManagedConstraint, StaticResolver,
};

// Banned dependencies
pub use banned::{AuditMode, BannedRules};
