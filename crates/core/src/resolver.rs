//! Cross-file dependency resolution.
//!
//! Runs once, after every unit has been parsed. Resolution only reads the
//! parsed units and produces a separate edge map; `apply` then writes the
//! edges into the units.

use crate::config::{is_test_file, SOURCE_EXTENSION};
use crate::models::{ModuleRoot, SourceUnit};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Dependency edges keyed by the depending unit's path
pub type DependencyEdges = HashMap<PathBuf, BTreeSet<PathBuf>>;

/// Lookup tables over a slice of parsed units
pub struct UnitIndex<'a> {
    units: &'a [SourceUnit],
    by_path: HashMap<&'a Path, usize>,
    by_package: BTreeMap<&'a str, Vec<usize>>,
}

impl<'a> UnitIndex<'a> {
    pub fn build(units: &'a [SourceUnit]) -> Self {
        let mut by_path = HashMap::with_capacity(units.len());
        let mut by_package: BTreeMap<&str, Vec<usize>> = BTreeMap::new();

        for (i, unit) in units.iter().enumerate() {
            by_path.insert(unit.path.as_path(), i);
            by_package.entry(unit.package_name.as_str()).or_default().push(i);
        }

        Self {
            units,
            by_path,
            by_package,
        }
    }

    pub fn get(&self, path: &Path) -> Option<&'a SourceUnit> {
        let units = self.units;
        self.by_path.get(path).map(|&i| &units[i])
    }

    pub fn package_count(&self) -> usize {
        self.by_package.len()
    }

    /// Units located anywhere below `dir`
    pub fn units_under<'d>(&self, dir: &'d Path) -> impl Iterator<Item = &'a SourceUnit> + 'd
    where
        'a: 'd,
    {
        let units = self.units;
        units.iter().filter(move |u| u.path.starts_with(dir))
    }
}

/// Maps internal import paths to the scanned files they refer to
pub struct DependencyResolver<'a> {
    root: &'a Path,
    module_root: &'a ModuleRoot,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(root: &'a Path, module_root: &'a ModuleRoot) -> Self {
        Self { root, module_root }
    }

    /// Compute the dependency edges of every unit
    pub fn resolve(&self, units: &[SourceUnit]) -> DependencyEdges {
        let index = UnitIndex::build(units);
        let mut edges = DependencyEdges::with_capacity(units.len());

        for unit in units {
            let mut dependencies = BTreeSet::new();

            for import in &unit.imports {
                // External and stdlib imports stay in `imports` only.
                let Some(relative) = self.module_root.strip(import) else {
                    continue;
                };

                let targets = self.targets(relative, &index);
                if targets.is_empty() {
                    tracing::debug!(
                        unit = %unit.path.display(),
                        import = %import,
                        "internal import matches no scanned file"
                    );
                }

                for target in targets {
                    if target != unit.path.as_path() {
                        dependencies.insert(target.to_path_buf());
                    }
                }
            }

            edges.insert(unit.path.clone(), dependencies);
        }

        edges
    }

    /// Files an internal import refers to.
    ///
    /// A directory import links every indexed non-test file below it; anything
    /// else is tried as a single file with the source extension appended.
    fn targets<'i>(&self, relative: &str, index: &UnitIndex<'i>) -> Vec<&'i Path> {
        let full = if relative.is_empty() {
            self.root.to_path_buf()
        } else {
            self.root.join(relative)
        };

        if full.is_dir() {
            index
                .units_under(&full)
                .filter(|u| !is_test_file(&u.path))
                .map(|u| u.path.as_path())
                .collect()
        } else {
            let mut file = full.into_os_string();
            file.push(".");
            file.push(SOURCE_EXTENSION);
            index
                .get(Path::new(&file))
                .map(|u| vec![u.path.as_path()])
                .unwrap_or_default()
        }
    }

    /// Write resolved edges into the units. Returns the number of edges.
    pub fn apply(units: &mut [SourceUnit], mut edges: DependencyEdges) -> usize {
        let mut count = 0;
        for unit in units.iter_mut() {
            unit.dependencies = edges.remove(&unit.path).unwrap_or_default();
            count += unit.dependencies.len();
        }
        count
    }
}

/// Resolve and apply dependencies in one step. Returns the number of edges.
pub fn resolve_dependencies(units: &mut [SourceUnit], root: &Path, module_root: &ModuleRoot) -> usize {
    let edges = DependencyResolver::new(root, module_root).resolve(units);
    DependencyResolver::apply(units, edges)
}
