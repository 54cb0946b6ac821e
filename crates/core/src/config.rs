use crate::sanitizer::ImportanceRules;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Extension of the source files the scanner collects
pub const SOURCE_EXTENSION: &str = "go";

/// File name suffix of test sources
pub const TEST_FILE_SUFFIX: &str = "_test.go";

/// Directories never descended into
const SKIP_DIRS: &[&str] = &[
    "vendor",
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    ".vscode",
    ".idea",
    "bin",
    "build",
    "dist",
    "target",
    "tmp",
    "temp",
    ".tmp",
    "__pycache__",
];

/// Documentation-only files
const SKIP_FILES: &[&str] = &["doc.go"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to build glob pattern: {0}")]
    GlobError(#[from] globset::Error),
    #[error("Failed to parse gitignore: {0}")]
    GitignoreError(#[from] ignore::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid settings file {path}: {source}")]
    SettingsError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// What the scan keeps and how it cleans file contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanPolicy {
    pub include_test_files: bool,
    pub strip_comments: bool,
    pub compact_whitespace: bool,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            include_test_files: false,
            strip_comments: true,
            compact_whitespace: true,
        }
    }
}

impl ScanPolicy {
    /// Policy that leaves file contents untouched
    pub fn verbatim() -> Self {
        Self {
            include_test_files: false,
            strip_comments: false,
            compact_whitespace: false,
        }
    }

    pub fn rewrites_text(&self) -> bool {
        self.strip_comments || self.compact_whitespace
    }
}

/// Shared flag that stops a running scan from scheduling more files
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Configuration for scanning
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Root directory to scan
    pub root: PathBuf,
    pub policy: ScanPolicy,
    /// Keywords and markers that protect comments from stripping
    pub importance: ImportanceRules,
    /// Additional ignore patterns (glob style, relative to root)
    pub ignore_patterns: Vec<String>,
    /// Honor the root's .gitignore
    pub respect_gitignore: bool,
    /// Number of threads (0 = auto)
    pub threads: usize,
    pub follow_symlinks: bool,
    pub cancellation: CancellationToken,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            policy: ScanPolicy::default(),
            importance: ImportanceRules::default(),
            ignore_patterns: vec![],
            respect_gitignore: false,
            threads: 0,
            follow_symlinks: false,
            cancellation: CancellationToken::default(),
        }
    }
}

impl ScanConfig {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ..Default::default()
        }
    }

    pub fn with_policy(mut self, policy: ScanPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    pub fn with_respect_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// Settings read from a TOML file.
///
/// Every field is optional; the file only overrides what it names.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub include_test_files: Option<bool>,
    pub strip_comments: Option<bool>,
    pub compact_whitespace: Option<bool>,
    pub threads: Option<usize>,
    pub respect_gitignore: Option<bool>,
    pub ignore: Vec<String>,
    pub importance: Option<ImportanceRules>,
}

impl ScanSettings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| ConfigError::SettingsError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Layer these settings over an existing config
    pub fn apply(self, mut config: ScanConfig) -> ScanConfig {
        if let Some(v) = self.include_test_files {
            config.policy.include_test_files = v;
        }
        if let Some(v) = self.strip_comments {
            config.policy.strip_comments = v;
        }
        if let Some(v) = self.compact_whitespace {
            config.policy.compact_whitespace = v;
        }
        if let Some(v) = self.threads {
            config.threads = v;
        }
        if let Some(v) = self.respect_gitignore {
            config.respect_gitignore = v;
        }
        if let Some(rules) = self.importance {
            config.importance = rules;
        }
        config.ignore_patterns.extend(self.ignore);
        config
    }
}

/// Returns true for files following the test naming convention
pub fn is_test_file(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().ends_with(TEST_FILE_SUFFIX))
        .unwrap_or(false)
}

/// Decides which directory entries take part in a scan
pub struct PathFilter {
    root: PathBuf,
    include_test_files: bool,
    gitignore: Option<Gitignore>,
    custom_globs: GlobSet,
}

impl PathFilter {
    pub fn new(config: &ScanConfig) -> Result<Self, ConfigError> {
        let gitignore = if config.respect_gitignore {
            let gitignore_path = config.root.join(".gitignore");
            if gitignore_path.exists() {
                let mut builder = GitignoreBuilder::new(&config.root);
                if let Some(err) = builder.add(&gitignore_path) {
                    return Err(err.into());
                }
                Some(builder.build()?)
            } else {
                None
            }
        } else {
            None
        };

        let mut custom_builder = GlobSetBuilder::new();
        for pattern in &config.ignore_patterns {
            custom_builder.add(Glob::new(pattern)?);
        }
        let custom_globs = custom_builder.build()?;

        Ok(Self {
            root: config.root.clone(),
            include_test_files: config.policy.include_test_files,
            gitignore,
            custom_globs,
        })
    }

    /// Check if an entry should be left out of the scan.
    ///
    /// A skipped directory must not be descended into.
    pub fn should_skip(&self, path: &Path, is_dir: bool) -> bool {
        if path == self.root {
            return false;
        }

        let name = match path.file_name() {
            Some(name) => name.to_string_lossy(),
            None => return false,
        };

        if is_dir {
            if SKIP_DIRS.contains(&name.as_ref()) || name.starts_with('.') {
                return true;
            }
        } else {
            let is_source = path
                .extension()
                .map(|ext| ext == SOURCE_EXTENSION)
                .unwrap_or(false);
            if !is_source {
                return true;
            }
            if !self.include_test_files && name.ends_with(TEST_FILE_SUFFIX) {
                return true;
            }
            if SKIP_FILES.contains(&name.as_ref()) {
                return true;
            }
        }

        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        if self.custom_globs.is_match(relative) {
            return true;
        }

        if let Some(ref gi) = self.gitignore {
            if gi.matched(path, is_dir).is_ignore() {
                return true;
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(config: ScanConfig) -> PathFilter {
        PathFilter::new(&config).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert_eq!(config.root, PathBuf::from("."));
        assert!(!config.policy.include_test_files);
        assert!(config.policy.strip_comments);
        assert!(config.policy.compact_whitespace);
        assert!(!config.cancellation.is_cancelled());
    }

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::new(PathBuf::from("/test"))
            .with_policy(ScanPolicy::verbatim())
            .with_ignore_patterns(vec!["**/*.pb.go".to_string()])
            .with_respect_gitignore(true)
            .with_threads(4);

        assert_eq!(config.root, PathBuf::from("/test"));
        assert!(!config.policy.rewrites_text());
        assert!(config.respect_gitignore);
        assert_eq!(config.threads, 4);
    }

    #[test]
    fn test_skip_directories() {
        let f = filter(ScanConfig::new(PathBuf::from("/proj")));

        for dir in ["vendor", ".git", "node_modules", "bin", "dist", ".cache", "tmp"] {
            assert!(f.should_skip(&Path::new("/proj").join(dir), true), "{dir}");
        }
        assert!(!f.should_skip(Path::new("/proj/internal"), true));
        assert!(!f.should_skip(Path::new("/proj/cmd/server"), true));
    }

    #[test]
    fn test_root_is_never_skipped() {
        let f = filter(ScanConfig::new(PathBuf::from("/work/.hidden")));
        assert!(!f.should_skip(Path::new("/work/.hidden"), true));

        let f = filter(ScanConfig::new(PathBuf::from(".")));
        assert!(!f.should_skip(Path::new("."), true));
    }

    #[test]
    fn test_skip_files() {
        let f = filter(ScanConfig::new(PathBuf::from("/proj")));

        assert!(!f.should_skip(Path::new("/proj/main.go"), false));
        assert!(f.should_skip(Path::new("/proj/README.md"), false));
        assert!(f.should_skip(Path::new("/proj/main_test.go"), false));
        assert!(f.should_skip(Path::new("/proj/pkg/doc.go"), false));
        assert!(f.should_skip(Path::new("/proj/Makefile"), false));
    }

    #[test]
    fn test_include_test_files() {
        let policy = ScanPolicy {
            include_test_files: true,
            ..Default::default()
        };
        let f = filter(ScanConfig::new(PathBuf::from("/proj")).with_policy(policy));
        assert!(!f.should_skip(Path::new("/proj/main_test.go"), false));
    }

    #[test]
    fn test_custom_ignore_patterns() {
        let config = ScanConfig::new(PathBuf::from("/proj"))
            .with_ignore_patterns(vec!["**/*.pb.go".to_string(), "gen/**".to_string()]);
        let f = filter(config);

        assert!(f.should_skip(Path::new("/proj/api/service.pb.go"), false));
        assert!(f.should_skip(Path::new("/proj/gen/model.go"), false));
        assert!(!f.should_skip(Path::new("/proj/api/service.go"), false));
    }

    #[test]
    fn test_invalid_glob_is_rejected() {
        let config = ScanConfig::new(PathBuf::from("/proj"))
            .with_ignore_patterns(vec!["a[".to_string()]);
        assert!(matches!(
            PathFilter::new(&config),
            Err(ConfigError::GlobError(_))
        ));
    }

    #[test]
    fn test_is_test_file() {
        assert!(is_test_file(Path::new("a/b/server_test.go")));
        assert!(!is_test_file(Path::new("a/b/server.go")));
        assert!(!is_test_file(Path::new("a/b/testdata")));
    }

    #[test]
    fn test_settings_apply() {
        let settings: ScanSettings = toml::from_str(
            r#"
            strip_comments = false
            threads = 2
            ignore = ["**/mocks/**"]

            [importance]
            keywords = ["keep"]
            "#,
        )
        .unwrap();

        let config = settings.apply(ScanConfig::new(PathBuf::from("/proj")));
        assert!(!config.policy.strip_comments);
        assert!(config.policy.compact_whitespace);
        assert_eq!(config.threads, 2);
        assert_eq!(config.ignore_patterns, vec!["**/mocks/**".to_string()]);
        assert_eq!(config.importance.keywords, vec!["keep".to_string()]);
        assert!(!config.importance.declaration_markers.is_empty());
    }

    #[test]
    fn test_settings_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gocontext.toml");
        fs::write(&path, "threads = \"many\"").unwrap();

        let err = ScanSettings::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::SettingsError { .. }));
        assert!(err.to_string().contains("gocontext.toml"));
    }

    #[test]
    fn test_cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let config = ScanConfig::default().with_cancellation(token.clone());
        token.cancel();
        assert!(config.cancellation.is_cancelled());
    }
}
