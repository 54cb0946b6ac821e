use crate::categorizer::ImportCategorizer;
use crate::config::{ConfigError, PathFilter, ScanConfig};
use crate::manifest::{module_root, GoModule};
use crate::models::{
    ExternalDependency, ScanMetadata, ScanResult, ScanStats, SkipReason, SkippedFile, SourceUnit,
};
use crate::parsers::{create_parser, parse_file, ParserError};
use crate::resolver::{resolve_dependencies, UnitIndex};
use crate::sanitizer::Sanitizer;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot access {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Parser error: {0}")]
    Parser(#[from] ParserError),
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(String),
}

/// Outcome of one candidate file. `None` when cancellation prevented the
/// parse from starting.
type FileOutcome = Option<Result<SourceUnit, SkippedFile>>;

/// Walks a project, parses every matching file and links the results
pub struct ContextScanner {
    config: ScanConfig,
    filter: PathFilter,
    sanitizer: Sanitizer,
}

impl ContextScanner {
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        let filter = PathFilter::new(&config)?;
        let sanitizer = Sanitizer::new(config.policy, config.importance.clone());
        Ok(Self {
            config,
            filter,
            sanitizer,
        })
    }

    /// Scan the project and return the annotated units
    pub fn scan(&self) -> Result<ScanResult, ScanError> {
        self.scan_with_progress(|_, _| {})
    }

    /// Scan the project, reporting `(current, total)` once per candidate file.
    ///
    /// Calls are serialized, so `current` never decreases and the last call
    /// has `current == total`.
    pub fn scan_with_progress<F>(&self, progress: F) -> Result<ScanResult, ScanError>
    where
        F: Fn(usize, usize) + Sync,
    {
        let start = Instant::now();
        let root = &self.config.root;

        // 1. Everything fatal happens before any file is parsed
        let meta = fs::metadata(root).map_err(|source| ScanError::Filesystem {
            path: root.clone(),
            source,
        })?;
        if !meta.is_dir() {
            return Err(ScanError::NotADirectory(root.clone()));
        }
        create_parser()?;
        let pool = self.build_pool()?;

        // 2. Discover candidate files
        let mut skipped = Vec::new();
        let candidates = self.discover(&mut skipped)?;
        debug!(root = %root.display(), candidates = candidates.len(), "discovered source files");

        // 3. Parse in parallel; ordered collect keeps discovery order
        let outcomes = self.parse_all(&candidates, pool.as_ref(), &progress);

        let mut units = Vec::with_capacity(outcomes.len());
        let mut cancelled = self.config.cancellation.is_cancelled();
        for outcome in outcomes {
            match outcome {
                Some(Ok(unit)) => units.push(unit),
                Some(Err(skip)) => {
                    warn!(path = %skip.path.display(), reason = ?skip.reason, "skipping file: {}", skip.message);
                    skipped.push(skip);
                }
                None => cancelled = true,
            }
        }

        // 4. Resolve once, over the complete set
        let manifest = GoModule::find(root);
        let module_root = module_root(root, manifest.as_ref());
        let edges = resolve_dependencies(&mut units, root, &module_root);

        // 5. Statistics and external dependency usage
        let categorizer = ImportCategorizer::new(&module_root, manifest.as_ref());
        let mut external_dependencies = manifest
            .as_ref()
            .map(GoModule::external_dependencies)
            .unwrap_or_default();
        let mut stats = calculate_stats(&units, &categorizer, &mut external_dependencies);
        stats.skipped_files = skipped.len();
        stats.dependency_edges = edges;

        let duration = start.elapsed();
        let metadata = ScanMetadata {
            scan_duration_ms: duration.as_millis() as u64,
            files_per_second: if duration.as_secs_f64() > 0.0 {
                units.len() as f64 / duration.as_secs_f64()
            } else {
                0.0
            },
            timestamp: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        };

        info!(
            root = %root.display(),
            module = %module_root.path,
            files = units.len(),
            skipped = skipped.len(),
            edges,
            cancelled,
            duration_ms = metadata.scan_duration_ms,
            "scan finished"
        );

        Ok(ScanResult {
            root: root.clone(),
            module_root,
            go_version: manifest.and_then(|m| m.go_version),
            units,
            skipped,
            external_dependencies,
            stats,
            metadata,
            cancelled,
        })
    }

    /// 0 uses rayon's global pool, 1 runs sequentially
    fn build_pool(&self) -> Result<Option<rayon::ThreadPool>, ScanError> {
        if self.config.threads <= 1 {
            return Ok(None);
        }
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map(Some)
            .map_err(|e| ScanError::ThreadPool(e.to_string()))
    }

    /// Walk the root in lexical order, pruning skipped directories.
    ///
    /// Failures below the root are recorded and the walk continues.
    fn discover(&self, skipped: &mut Vec<SkippedFile>) -> Result<Vec<PathBuf>, ScanError> {
        let root = &self.config.root;
        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0 || !e.file_type().is_dir() || !self.filter.should_skip(e.path(), true)
            });

        for entry in walker {
            if self.config.cancellation.is_cancelled() {
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    let message = err.to_string();
                    return Err(ScanError::Filesystem {
                        path: root.clone(),
                        source: err
                            .into_io_error()
                            .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, message)),
                    });
                }
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.clone());
                    warn!(path = %path.display(), error = %err, "skipping unreadable directory");
                    skipped.push(SkippedFile {
                        path,
                        reason: SkipReason::UnreadableDirectory,
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            if entry.file_type().is_dir() || self.filter.should_skip(entry.path(), false) {
                continue;
            }
            files.push(entry.into_path());
        }

        Ok(files)
    }

    fn parse_all<F>(
        &self,
        candidates: &[PathBuf],
        pool: Option<&rayon::ThreadPool>,
        progress: &F,
    ) -> Vec<FileOutcome>
    where
        F: Fn(usize, usize) + Sync,
    {
        let total = candidates.len();
        let done = Mutex::new(0usize);

        let task = |path: &PathBuf| -> FileOutcome {
            let outcome = if self.config.cancellation.is_cancelled() {
                None
            } else {
                Some(self.parse_one(path))
            };

            let mut count = done.lock().unwrap_or_else(|e| e.into_inner());
            *count += 1;
            progress(*count, total);
            outcome
        };

        if self.config.threads == 1 {
            return candidates.iter().map(&task).collect();
        }

        match pool {
            Some(pool) => pool.install(|| candidates.par_iter().map(&task).collect()),
            None => candidates.par_iter().map(&task).collect(),
        }
    }

    fn parse_one(&self, path: &Path) -> Result<SourceUnit, SkippedFile> {
        match parse_file(path, &self.config.root, &self.sanitizer) {
            Ok(unit) => {
                debug!(path = %path.display(), package = %unit.package_name, imports = unit.imports.len(), "parsed");
                Ok(unit)
            }
            Err(ParserError::Unreadable { path, source }) => Err(SkippedFile {
                path,
                reason: SkipReason::Unreadable,
                message: source.to_string(),
            }),
            Err(ParserError::Malformed { path, reason }) => Err(SkippedFile {
                path,
                reason: SkipReason::Malformed,
                message: reason,
            }),
            Err(other) => Err(SkippedFile {
                path: path.to_path_buf(),
                reason: SkipReason::Malformed,
                message: other.to_string(),
            }),
        }
    }
}

/// Count files, bytes and imports by category, and tally how often each
/// required module is imported
fn calculate_stats(
    units: &[SourceUnit],
    categorizer: &ImportCategorizer,
    external_dependencies: &mut BTreeMap<String, ExternalDependency>,
) -> ScanStats {
    let mut stats = ScanStats {
        total_files: units.len(),
        packages: UnitIndex::build(units).package_count(),
        ..Default::default()
    };

    for unit in units {
        stats.total_bytes += unit.byte_size;
        stats.sanitized_bytes += unit.sanitized_text.len() as u64;
        stats.total_lines += unit.line_count;

        for import in &unit.imports {
            stats.add_import(categorizer.categorize(import));
            if let Some(module) = categorizer.required_module(import) {
                if let Some(dep) = external_dependencies.get_mut(module) {
                    dep.import_count += 1;
                }
            }
        }
    }

    stats
}
