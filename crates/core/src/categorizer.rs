use crate::manifest::GoModule;
use crate::models::{ImportKind, ModuleRoot};

/// Categorizes import paths as internal, local, stdlib or external
pub struct ImportCategorizer {
    module_root: ModuleRoot,
    /// Required module paths, longest first so nested modules win
    required: Vec<String>,
}

impl ImportCategorizer {
    pub fn new(module_root: &ModuleRoot, manifest: Option<&GoModule>) -> Self {
        let mut required: Vec<String> = manifest
            .map(|m| m.requires.iter().map(|r| r.path.clone()).collect())
            .unwrap_or_default();
        required.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        Self {
            module_root: module_root.clone(),
            required,
        }
    }

    /// Categorize an import path
    pub fn categorize(&self, import: &str) -> ImportKind {
        // 1. Relative imports
        if import == "." || import == ".." || import.starts_with("./") || import.starts_with("../")
        {
            return ImportKind::Local;
        }

        // 2. Packages of the scanned module. Checked before the stdlib rule
        //    because a directory-name module root has no dot either.
        if self.module_root.contains(import) {
            return ImportKind::Internal;
        }

        // 3. Modules listed in the manifest
        if self.required_module(import).is_some() {
            return ImportKind::External;
        }

        // 4. Standard library paths have no dot in their first element
        let first = import.split('/').next().unwrap_or(import);
        if first.contains('.') {
            ImportKind::External
        } else {
            ImportKind::Stdlib
        }
    }

    /// The required module an import belongs to, if any
    pub fn required_module(&self, import: &str) -> Option<&str> {
        self.required
            .iter()
            .find(|module| {
                import
                    .strip_prefix(module.as_str())
                    .map(|rest| rest.is_empty() || rest.starts_with('/'))
                    .unwrap_or(false)
            })
            .map(|s| s.as_str())
    }
}
