//! MTA Rust GoContext Core Library
//!
//! Extracts a filtered, cleaned, dependency-annotated view of a Go source
//! tree, suitable for feeding to downstream context writers.
//!
//! # Features
//!
//! - Walk a project with a fixed directory denylist, glob ignores and optional .gitignore
//! - Parse package clauses and import declarations with tree-sitter
//! - Strip non-essential comments and compact whitespace without touching literals
//! - Link internal imports back to the files they refer to
//! - Categorize imports and report `go.mod` requirements with versions
//! - Output results in JSON, YAML or a plain-text summary
//!
//! # Example
//!
//! ```no_run
//! use mta_rust_gocontext_core::{ContextScanner, ScanConfig, OutputFormat, format_output};
//! use std::path::PathBuf;
//!
//! let config = ScanConfig::new(PathBuf::from("."));
//! let scanner = ContextScanner::new(config).unwrap();
//! let result = scanner.scan().unwrap();
//!
//! let json = format_output(&result, OutputFormat::Json).unwrap();
//! println!("{}", json);
//! ```

pub mod categorizer;
pub mod config;
pub mod manifest;
pub mod models;
pub mod output;
pub mod parsers;
pub mod resolver;
pub mod sanitizer;
pub mod scanner;

// Re-exports for convenience
pub use config::{CancellationToken, ScanConfig, ScanPolicy, ScanSettings};
pub use models::*;
pub use output::{format_output, format_summary, FormatError, OutputFormat};
pub use parsers::{parse_file, parse_source, ParserError, UnitHeader};
pub use resolver::resolve_dependencies;
pub use sanitizer::{sanitize, ImportanceRules, Sanitizer};
pub use scanner::{ContextScanner, ScanError};
