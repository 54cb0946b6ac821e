//! Project manifest (`go.mod`) reading and module root detection.

use crate::models::{ExternalDependency, ModuleRoot, ModuleRootSource};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Well-known manifest file name at the project root
pub const MANIFEST_FILE: &str = "go.mod";

fn module_directive() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^module\s+"?([^\s"]+)"?$"#).expect("valid module regex"))
}

fn requirement_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^"?([^\s"()]+)"?\s+(v\S+)$"#).expect("valid requirement regex")
    })
}

/// A `require` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub path: String,
    pub version: String,
    pub indirect: bool,
}

/// The parts of a go.mod file the scanner uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoModule {
    /// Location of the manifest file
    pub path: PathBuf,
    pub module_path: String,
    pub go_version: Option<String>,
    pub requires: Vec<Requirement>,
}

impl GoModule {
    /// Parse manifest text. Returns `None` when there is no `module` directive.
    pub fn parse(content: &str, path: PathBuf) -> Option<Self> {
        let mut module_path = None;
        let mut go_version = None;
        let mut requires = Vec::new();
        let mut in_require_block = false;

        for raw_line in content.lines() {
            let (code, comment) = match raw_line.find("//") {
                Some(i) => (&raw_line[..i], raw_line[i + 2..].trim()),
                None => (raw_line, ""),
            };
            let line = code.trim();
            let indirect = comment == "indirect" || comment.starts_with("indirect;");

            if in_require_block {
                if line == ")" {
                    in_require_block = false;
                } else if let Some(req) = parse_requirement(line, indirect) {
                    requires.push(req);
                }
                continue;
            }

            if let Some(caps) = module_directive().captures(line) {
                module_path = Some(caps[1].to_string());
            } else if let Some(version) = line.strip_prefix("go ") {
                go_version = Some(version.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("require") {
                let rest = rest.trim();
                if rest == "(" {
                    in_require_block = true;
                } else if let Some(req) = parse_requirement(rest, indirect) {
                    requires.push(req);
                }
            }
        }

        Some(Self {
            path,
            module_path: module_path?,
            go_version,
            requires,
        })
    }

    /// Read the manifest in `dir`, if there is a usable one
    pub fn find(dir: &Path) -> Option<Self> {
        let path = dir.join(MANIFEST_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "no readable manifest");
                return None;
            }
        };

        let module = Self::parse(&content, path.clone());
        if module.is_none() {
            tracing::warn!(path = %path.display(), "manifest has no module directive");
        }
        module
    }

    /// Required modules keyed by module path
    pub fn external_dependencies(&self) -> BTreeMap<String, ExternalDependency> {
        self.requires
            .iter()
            .map(|req| {
                (
                    req.path.clone(),
                    ExternalDependency {
                        version: req.version.clone(),
                        indirect: req.indirect,
                        import_count: 0,
                    },
                )
            })
            .collect()
    }
}

fn parse_requirement(line: &str, indirect: bool) -> Option<Requirement> {
    let caps = requirement_line().captures(line)?;
    Some(Requirement {
        path: caps[1].to_string(),
        version: caps[2].to_string(),
        indirect,
    })
}

/// Derive the module root: the manifest's module path, or the directory name.
pub fn module_root(dir: &Path, manifest: Option<&GoModule>) -> ModuleRoot {
    if let Some(module) = manifest {
        return ModuleRoot {
            path: module.module_path.clone(),
            source: ModuleRootSource::Manifest(module.path.clone()),
        };
    }

    // Canonicalize so that "." and ".." resolve to a real directory name.
    let name = dir
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .or_else(|| dir.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_default();

    ModuleRoot {
        path: name,
        source: ModuleRootSource::DirectoryName,
    }
}
