mod json;
mod yaml;

pub use json::{to_json, to_json_compact};
pub use yaml::to_yaml;

use crate::models::ScanResult;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Summary,
}

/// Format a ScanResult according to the specified format
pub fn format_output(result: &ScanResult, format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::Json => to_json(result),
        OutputFormat::Yaml => to_yaml(result),
        OutputFormat::Summary => Ok(format_summary(result)),
    }
}

/// Generate a human-readable summary
pub fn format_summary(result: &ScanResult) -> String {
    let mut output = String::new();
    let stats = &result.stats;

    output.push_str(&format!(
        "Go Context Summary\n\
         ==================\n\
         Root: {}\n\
         Module: {}\n",
        result.root.display(),
        result.module_root.path
    ));
    if let Some(ref version) = result.go_version {
        output.push_str(&format!("Go Version: {}\n", version));
    }
    output.push('\n');

    output.push_str(&format!(
        "Files Scanned: {} ({} packages, {} skipped)\n\
         Lines: {}\n\
         Bytes: {} raw, {} sanitized ({:.1}% reduction)\n\n",
        stats.total_files,
        stats.packages,
        stats.skipped_files,
        stats.total_lines,
        stats.total_bytes,
        stats.sanitized_bytes,
        stats.reduction_percent()
    ));

    output.push_str(&format!(
        "Total Imports: {}\n\
         - Internal: {}\n\
         - Local: {}\n\
         - Stdlib: {}\n\
         - External: {}\n\n",
        stats.total_imports,
        stats.internal_imports,
        stats.local_imports,
        stats.stdlib_imports,
        stats.external_imports
    ));

    // Dependency edges
    let linked: Vec<_> = result
        .units
        .iter()
        .filter(|u| !u.dependencies.is_empty())
        .collect();
    if !linked.is_empty() {
        output.push_str(&format!("Dependencies ({} edges):\n", stats.dependency_edges));
        for unit in linked {
            output.push_str(&format!("  {}\n", unit.relative_path.display()));
            for dep in &unit.dependencies {
                let shown = dep.strip_prefix(&result.root).unwrap_or(dep);
                output.push_str(&format!("    -> {}\n", shown.display()));
            }
        }
        output.push('\n');
    }

    // External dependencies
    if !result.external_dependencies.is_empty() {
        output.push_str("External Dependencies:\n");
        for (name, info) in &result.external_dependencies {
            let indirect = if info.indirect { " (indirect)" } else { "" };
            output.push_str(&format!(
                "  {} @ {}{} [{} imports]\n",
                name, info.version, indirect, info.import_count
            ));
        }
        output.push('\n');
    }

    if !result.skipped.is_empty() {
        output.push_str("Skipped:\n");
        for skip in &result.skipped {
            output.push_str(&format!(
                "  {} ({:?}): {}\n",
                skip.path.display(),
                skip.reason,
                skip.message
            ));
        }
        output.push('\n');
    }

    if result.cancelled {
        output.push_str("Scan was cancelled; results are partial.\n\n");
    }

    // Metadata
    output.push_str(&format!(
        "Scan Duration: {}ms ({:.2} files/sec)\n\
         Timestamp: {}\n\
         Tool Version: {}\n",
        result.metadata.scan_duration_ms,
        result.metadata.files_per_second,
        result.metadata.timestamp,
        result.metadata.tool_version
    ));

    output
}

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("YAML serialization error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::{
        ExternalDependency, ModuleRoot, ModuleRootSource, ScanMetadata, ScanResult, ScanStats,
        SkipReason, SkippedFile, SourceUnit,
    };
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::PathBuf;

    fn unit(relative: &str, package: &str, imports: &[&str], deps: &[&str]) -> SourceUnit {
        let root = PathBuf::from("/work/app");
        SourceUnit {
            path: root.join(relative),
            relative_path: PathBuf::from(relative),
            file_name: relative.rsplit('/').next().unwrap_or(relative).to_string(),
            package_name: package.to_string(),
            imports: imports.iter().map(|s| s.to_string()).collect(),
            dependencies: deps.iter().map(|d| root.join(d)).collect::<BTreeSet<_>>(),
            raw_text: format!("package {package}\n\n// chatter\n"),
            sanitized_text: format!("package {package}"),
            byte_size: 24,
            line_count: 4,
        }
    }

    pub fn sample() -> ScanResult {
        let mut external_dependencies = BTreeMap::new();
        external_dependencies.insert(
            "github.com/spf13/cobra".to_string(),
            ExternalDependency {
                version: "v1.8.0".to_string(),
                indirect: false,
                import_count: 1,
            },
        );

        ScanResult {
            root: PathBuf::from("/work/app"),
            module_root: ModuleRoot {
                path: "example.com/app".to_string(),
                source: ModuleRootSource::Manifest(PathBuf::from("/work/app/go.mod")),
            },
            go_version: Some("1.22".to_string()),
            units: vec![
                unit(
                    "main.go",
                    "main",
                    &["fmt", "example.com/app/util", "github.com/spf13/cobra"],
                    &["util/helper.go"],
                ),
                unit("util/helper.go", "util", &[], &[]),
            ],
            skipped: vec![SkippedFile {
                path: PathBuf::from("/work/app/broken.go"),
                reason: SkipReason::Malformed,
                message: "syntax error at line 3, column 13".to_string(),
            }],
            external_dependencies,
            stats: ScanStats {
                total_files: 2,
                skipped_files: 1,
                packages: 2,
                total_bytes: 48,
                sanitized_bytes: 24,
                total_lines: 8,
                total_imports: 3,
                internal_imports: 1,
                stdlib_imports: 1,
                external_imports: 1,
                dependency_edges: 1,
                ..Default::default()
            },
            metadata: ScanMetadata::default(),
            cancelled: false,
        }
    }
}
