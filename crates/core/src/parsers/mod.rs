mod go;

pub use go::GoParser;

use crate::models::SourceUnit;
use crate::sanitizer::Sanitizer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to initialize parser: {0}")]
    InitError(String),
    #[error("Failed to parse source code: {0}")]
    Syntax(String),
    #[error("Failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed source {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Package identity and import paths of one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitHeader {
    pub package_name: String,
    /// Import path literals in declaration order
    pub imports: Vec<String>,
}

/// Create a parser for Go sources
pub fn create_parser() -> Result<GoParser, ParserError> {
    GoParser::new()
}

/// Parse the header of source text that does not come from a file
pub fn parse_source(source: &str) -> Result<UnitHeader, ParserError> {
    create_parser()?.parse(source)
}

/// Number of newline-separated segments.
///
/// A trailing newline counts as one more (empty) segment.
pub fn count_lines(content: &str) -> usize {
    content.split('\n').count()
}

/// Read and parse one file into a unit with empty dependencies
pub fn parse_file(path: &Path, root: &Path, sanitizer: &Sanitizer) -> Result<SourceUnit, ParserError> {
    let bytes = fs::read(path).map_err(|source| ParserError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let content = String::from_utf8(bytes).map_err(|e| ParserError::Malformed {
        path: path.to_path_buf(),
        reason: format!("invalid UTF-8: {}", e.utf8_error()),
    })?;

    let mut parser = create_parser()?;
    let header = parser.parse(&content).map_err(|e| match e {
        ParserError::Syntax(reason) => ParserError::Malformed {
            path: path.to_path_buf(),
            reason,
        },
        other => other,
    })?;

    let sanitized_text = sanitizer.sanitize(&content);

    let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(SourceUnit {
        path: path.to_path_buf(),
        relative_path,
        file_name,
        package_name: header.package_name,
        imports: header.imports,
        dependencies: BTreeSet::new(),
        byte_size: content.len() as u64,
        line_count: count_lines(&content),
        raw_text: content,
        sanitized_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanPolicy;
    use crate::sanitizer::ImportanceRules;

    fn sanitizer(policy: ScanPolicy) -> Sanitizer {
        Sanitizer::new(policy, ImportanceRules::default())
    }

    #[test]
    fn test_count_lines() {
        assert_eq!(count_lines(""), 1);
        assert_eq!(count_lines("a"), 1);
        assert_eq!(count_lines("a\n"), 2);
        assert_eq!(count_lines("a\nb\nc"), 3);
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.go");
        let source = "package main\n\nimport \"fmt\" // printing\n\nfunc main() { fmt.Println() }\n";
        fs::write(&path, source).unwrap();

        let unit = parse_file(&path, dir.path(), &sanitizer(ScanPolicy::default())).unwrap();

        assert_eq!(unit.path, path);
        assert_eq!(unit.relative_path, PathBuf::from("main.go"));
        assert_eq!(unit.file_name, "main.go");
        assert_eq!(unit.package_name, "main");
        assert_eq!(unit.imports, vec!["fmt"]);
        assert!(unit.dependencies.is_empty());
        assert_eq!(unit.byte_size, source.len() as u64);
        assert_eq!(unit.line_count, 6);
        assert_eq!(unit.raw_text, source);
        assert_eq!(
            unit.sanitized_text,
            "package main\n\nimport \"fmt\"\n\nfunc main() { fmt.Println() }"
        );
    }

    #[test]
    fn test_verbatim_policy_keeps_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.go");
        let source = "package a\n\n\n// chatter\n";
        fs::write(&path, source).unwrap();

        let unit = parse_file(&path, dir.path(), &sanitizer(ScanPolicy::verbatim())).unwrap();
        assert_eq!(unit.sanitized_text, unit.raw_text);
    }

    #[test]
    fn test_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.go");

        let err = parse_file(&path, dir.path(), &sanitizer(ScanPolicy::default())).unwrap_err();
        assert!(matches!(err, ParserError::Unreadable { .. }));
    }

    #[test]
    fn test_malformed_sources() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.go");
        fs::write(&broken, "package main\n\nfunc main( {\n").unwrap();
        let binary = dir.path().join("binary.go");
        fs::write(&binary, [0x70, 0x61, 0xff, 0xfe]).unwrap();

        for path in [broken, binary] {
            let err = parse_file(&path, dir.path(), &sanitizer(ScanPolicy::default())).unwrap_err();
            assert!(
                matches!(err, ParserError::Malformed { path: ref p, .. } if *p == path),
                "{err}"
            );
        }
    }

    #[test]
    fn test_parse_source() {
        let header = parse_source("package lib\nimport \"errors\"\n").unwrap();
        assert_eq!(header.package_name, "lib");
        assert_eq!(header.imports, vec!["errors"]);
    }
}
