use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Category of an import path literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// Package inside the scanned module
    Internal,
    /// Relative import (./foo, ../bar)
    Local,
    /// Standard library package
    Stdlib,
    /// Third-party module
    External,
}

/// One parsed source file and its derived metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Path as discovered by the walk (root joined with the relative path)
    pub path: PathBuf,
    /// Path relative to the scan root
    pub relative_path: PathBuf,
    pub file_name: String,
    pub package_name: String,
    /// Import path literals in declaration order
    pub imports: Vec<String>,
    /// Paths of other units this unit depends on, filled in by the resolver
    #[serde(default)]
    pub dependencies: BTreeSet<PathBuf>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sanitized_text: String,
    pub byte_size: u64,
    pub line_count: usize,
}

/// Where the module root came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "path")]
pub enum ModuleRootSource {
    /// `module` directive of a go.mod file
    Manifest(PathBuf),
    /// Base name of the scanned directory
    DirectoryName,
}

/// Import-path prefix identifying packages of the scanned project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRoot {
    pub path: String,
    pub source: ModuleRootSource,
}

impl ModuleRoot {
    /// Strip the module prefix from an import path.
    ///
    /// Returns the project-relative remainder (possibly empty) when the import
    /// is the module itself or one of its packages, `None` otherwise.
    pub fn strip<'a>(&self, import: &'a str) -> Option<&'a str> {
        if self.path.is_empty() {
            return None;
        }
        let rest = import.strip_prefix(self.path.as_str())?;
        if rest.is_empty() {
            Some(rest)
        } else {
            rest.strip_prefix('/')
        }
    }

    pub fn contains(&self, import: &str) -> bool {
        self.strip(import).is_some()
    }
}

/// Why a file was left out of the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Unreadable,
    Malformed,
    UnreadableDirectory,
}

/// A per-file failure recorded during the scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
    pub message: String,
}

/// A `require` entry of the project manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalDependency {
    pub version: String,
    #[serde(default)]
    pub indirect: bool,
    /// Number of imports across the scanned units that resolve to this module
    #[serde(default)]
    pub import_count: usize,
}

/// Aggregated scan results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Project root path
    pub root: PathBuf,
    pub module_root: ModuleRoot,
    /// `go` directive of the manifest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go_version: Option<String>,
    /// Parsed units in discovery order
    pub units: Vec<SourceUnit>,
    /// Files left out because they could not be read or parsed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedFile>,
    /// Modules required by the manifest, keyed by module path
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub external_dependencies: BTreeMap<String, ExternalDependency>,
    pub stats: ScanStats,
    pub metadata: ScanMetadata,
    /// Set when the scan stopped scheduling work before every file was parsed
    #[serde(default)]
    pub cancelled: bool,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Drop file contents, keeping identity, imports and dependency edges
    pub fn filter_to_graph(&self) -> Self {
        let units = self
            .units
            .iter()
            .map(|u| SourceUnit {
                raw_text: String::new(),
                sanitized_text: String::new(),
                ..u.clone()
            })
            .collect();

        ScanResult {
            units,
            ..self.clone()
        }
    }
}

/// Statistics about the scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStats {
    pub total_files: usize,
    pub skipped_files: usize,
    pub packages: usize,
    pub total_bytes: u64,
    pub sanitized_bytes: u64,
    pub total_lines: usize,
    pub total_imports: usize,
    pub internal_imports: usize,
    pub local_imports: usize,
    pub stdlib_imports: usize,
    pub external_imports: usize,
    pub dependency_edges: usize,
}

impl ScanStats {
    pub fn add_import(&mut self, kind: ImportKind) {
        self.total_imports += 1;
        match kind {
            ImportKind::Internal => self.internal_imports += 1,
            ImportKind::Local => self.local_imports += 1,
            ImportKind::Stdlib => self.stdlib_imports += 1,
            ImportKind::External => self.external_imports += 1,
        }
    }

    /// Fraction of bytes removed by sanitizing, in percent
    pub fn reduction_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        let saved = self.total_bytes.saturating_sub(self.sanitized_bytes);
        saved as f64 * 100.0 / self.total_bytes as f64
    }
}

/// Scan metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub scan_duration_ms: u64,
    pub files_per_second: f64,
    pub timestamp: String,
    pub tool_version: String,
}

impl Default for ScanMetadata {
    fn default() -> Self {
        Self {
            scan_duration_ms: 0,
            files_per_second: 0.0,
            timestamp: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
