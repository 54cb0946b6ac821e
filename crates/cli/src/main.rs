use anyhow::Context;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use mta_rust_gocontext_core::{
    format_output, ContextScanner, OutputFormat, ScanConfig, ScanSettings,
};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter
const LOG_ENV: &str = "GOCONTEXT_LOG";

#[derive(Parser)]
#[command(name = "gocontext")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract a cleaned, dependency-annotated view of a Go project")]
#[command(long_about = "Scans a Go project, parses the package clause and imports of every \
    source file, strips non-essential comments and compacts whitespace, and links internal \
    imports back to the files they refer to.\n\n\
    Test files (*_test.go), doc.go, vendor/ and hidden directories are skipped by default. \
    Settings can also be read from a TOML file with --config; flags take precedence.")]
pub struct Args {
    /// Project root directory to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormatArg::Json)]
    pub format: OutputFormatArg,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Include *_test.go files
    #[arg(long)]
    pub include_tests: bool,

    /// Keep every comment
    #[arg(long)]
    pub keep_comments: bool,

    /// Leave whitespace untouched
    #[arg(long)]
    pub no_compact: bool,

    /// Additional ignore patterns (glob, relative to the root)
    #[arg(long, action = clap::ArgAction::Append)]
    pub ignore: Vec<String>,

    /// Honor the root's .gitignore
    #[arg(long)]
    pub gitignore: bool,

    /// Descend into symlinked directories
    #[arg(long)]
    pub follow_symlinks: bool,

    /// TOML settings file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Parallel threads (0 = auto, 1 = sequential)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Report only files, imports and dependency edges
    #[arg(long)]
    pub graph_only: bool,

    /// Show progress and info logs
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Summary,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Yaml => OutputFormat::Yaml,
            OutputFormatArg::Summary => OutputFormat::Summary,
        }
    }
}

impl Args {
    /// Defaults, then the settings file, then flags
    fn scan_config(&self) -> anyhow::Result<ScanConfig> {
        let mut config =
            ScanConfig::new(self.path.clone()).with_follow_symlinks(self.follow_symlinks);

        if let Some(ref path) = self.config {
            let settings = ScanSettings::load(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?;
            config = settings.apply(config);
        }

        if self.include_tests {
            config.policy.include_test_files = true;
        }
        if self.keep_comments {
            config.policy.strip_comments = false;
        }
        if self.no_compact {
            config.policy.compact_whitespace = false;
        }
        if self.gitignore {
            config.respect_gitignore = true;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        config.ignore_patterns.extend(self.ignore.iter().cloned());

        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = args.scan_config()?;
    let scanner = ContextScanner::new(config)?;

    // Show progress if verbose
    let progress = if args.verbose {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files ({elapsed})")?
                .progress_chars("=> "),
        );
        Some(pb)
    } else {
        None
    };

    let result = scanner
        .scan_with_progress(|current, total| {
            if let Some(ref pb) = progress {
                pb.set_length(total as u64);
                pb.set_position(current as u64);
            }
        })
        .with_context(|| format!("Failed to scan {}", args.path.display()))?;

    if let Some(ref pb) = progress {
        pb.finish_with_message(format!(
            "Scanned {} files in {}ms",
            result.stats.total_files, result.metadata.scan_duration_ms
        ));
    }

    if result.is_empty() {
        tracing::warn!(root = %result.root.display(), "no Go source files found");
    }

    let result = if args.graph_only {
        result.filter_to_graph()
    } else {
        result
    };

    let output = format_output(&result, args.format.clone().into())?;

    // Write output
    if let Some(ref path) = args.output {
        fs::write(path, &output)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "output written");
    } else {
        println!("{}", output);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let dir = tempfile::tempdir().unwrap();
        let settings = dir.path().join("gocontext.toml");
        fs::write(
            &settings,
            "include_test_files = false\nstrip_comments = true\nthreads = 2\nignore = [\"gen/**\"]\n",
        )
        .unwrap();

        let args = Args::parse_from([
            "gocontext",
            "proj",
            "--config",
            settings.to_str().unwrap(),
            "--include-tests",
            "--keep-comments",
            "--threads",
            "1",
            "--follow-symlinks",
            "--ignore",
            "mocks/**",
        ]);
        let config = args.scan_config().unwrap();

        assert_eq!(config.root, PathBuf::from("proj"));
        assert!(config.policy.include_test_files);
        assert!(!config.policy.strip_comments);
        assert!(config.policy.compact_whitespace);
        assert_eq!(config.threads, 1);
        assert!(config.follow_symlinks);
        assert_eq!(config.ignore_patterns, vec!["gen/**", "mocks/**"]);
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["gocontext"]);
        let config = args.scan_config().unwrap();

        assert_eq!(config.root, PathBuf::from("."));
        assert!(!config.policy.include_test_files);
        assert!(config.policy.strip_comments);
        assert_eq!(config.threads, 0);
        assert!(!config.respect_gitignore);
        assert!(!config.follow_symlinks);
    }

    #[test]
    fn test_missing_settings_file() {
        let args = Args::parse_from(["gocontext", "--config", "/nonexistent/gocontext.toml"]);
        assert!(args.scan_config().is_err());
    }
}
