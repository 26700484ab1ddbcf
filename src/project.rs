//! Project model: the tracked file set and the flattened naming scheme.
//!
//! Categorization is purely path-based and computed once:
//!
//! - **Module** files live under the base-module directory (`baseUrl`). They
//!   are renamed, wrapped, and their output paths flattened.
//! - **Runtime** files live under the reserved `rtModules` / `rtScript`
//!   directories. The target runtime provides native imports there, so they
//!   are transpiled untouched.
//! - **Plain** files are everything else (event handlers, entry scripts).
//!   Import-site renaming still applies so they can call into modules.

use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{normalize, Config};
use crate::error::{BuildError, Result};

/// Reserved prefix for every generated global identifier. User identifiers
/// starting with it fail the build, which is what makes the generated names
/// collision-free.
pub const RESERVED_PREFIX: &str = "module_";

/// Join token replacing path separators in flattened names.
pub const FLATTEN_JOIN: &str = "__";

pub const RUNTIME_DIRS: &[&str] = &["rtModules", "rtScript"];

pub const SOURCE_EXT: &str = "ts";
pub const TARGET_EXT: &str = "js";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Module,
    Runtime,
    Plain,
}

#[derive(Debug)]
pub struct Project {
    pub root: PathBuf,
    pub out_dir: PathBuf,
    pub base_module_dir: PathBuf,
    /// Ordered set of tracked source files, absolute-ish (root-joined).
    pub files: Vec<PathBuf>,
    pub config: Config,
}

impl Project {
    /// Load the project whose configuration governs `dir`. Fails fast when
    /// no configuration is discoverable or the base-module directory is
    /// absent; the builder reports further diagnostics before building.
    pub fn load(dir: &Path) -> Result<Project> {
        let config = Config::load(dir)?;
        let root = normalize(&config.root);
        let base_module_dir = config.base_module_dir()?;
        let out_dir = config.out_dir();
        let files = discover_files(&root, &out_dir)?;

        tracing::debug!(
            root = %root.display(),
            files = files.len(),
            "project loaded"
        );

        Ok(Project {
            root,
            out_dir,
            base_module_dir,
            files,
            config,
        })
    }

    pub fn is_tracked(&self, file: &Path) -> bool {
        let file = normalize(file);
        self.files.iter().any(|f| *f == file)
    }

    pub fn tracked_file_names(&self) -> Vec<String> {
        self.files
            .iter()
            .map(|f| f.display().to_string())
            .collect()
    }

    pub fn categorize(&self, file: &Path) -> FileKind {
        let file = normalize(file);
        if file.starts_with(&self.base_module_dir) {
            return FileKind::Module;
        }
        for runtime in RUNTIME_DIRS {
            if file.starts_with(self.root.join(runtime)) {
                return FileKind::Runtime;
            }
        }
        FileKind::Plain
    }

    /// Flattened name segment for a module file: its path relative to the
    /// base-module directory with separators replaced by the join token and
    /// the source extension dropped. `modules/folder/a.ts` -> `folder__a`.
    pub fn flattened_module_name(&self, file: &Path) -> Option<String> {
        let file = normalize(file);
        let rel = file.strip_prefix(&self.base_module_dir).ok()?;
        Some(flatten_path(&rel.with_extension("")))
    }

    /// The single global identifier a module file is bound to.
    pub fn module_namespace(&self, file: &Path) -> Option<String> {
        self.flattened_module_name(file)
            .map(|name| format!("{}{}", RESERVED_PREFIX, name))
    }

    /// Namespace identifier for an import specifier. Specifier validation
    /// happens in the renaming engine; this is pure derivation.
    pub fn namespace_for_specifier(specifier: &str) -> String {
        format!("{}{}", RESERVED_PREFIX, replace_separator(specifier))
    }

    /// The module file an import specifier resolves to, if tracked.
    pub fn resolve_specifier(&self, specifier: &str) -> Option<&PathBuf> {
        let target = normalize(
            &self
                .base_module_dir
                .join(format!("{}.{}", specifier, SOURCE_EXT)),
        );
        self.files.iter().find(|f| **f == target)
    }

    /// Output path for a tracked file: relative to the project root, source
    /// extension swapped for the target extension, and the portion under the
    /// module/runtime boundary flattened so nested folders collapse into
    /// single filenames.
    pub fn output_path(&self, file: &Path) -> Result<PathBuf> {
        let file = normalize(file);
        let rel = file.strip_prefix(&self.root).map_err(|_| {
            BuildError::Config(format!(
                "{} is outside the project root {}",
                file.display(),
                self.root.display()
            ))
        })?;
        let rel = rel.with_extension(TARGET_EXT);

        let flattened = match self.categorize(&file) {
            FileKind::Module => {
                let boundary = self.base_module_dir.strip_prefix(&self.root).unwrap_or(Path::new(""));
                let under = rel.strip_prefix(boundary).unwrap_or(&rel);
                boundary.join(flatten_path(under))
            }
            FileKind::Runtime => {
                let boundary = rel.components().next();
                match boundary {
                    Some(Component::Normal(dir)) => {
                        let under = rel.strip_prefix(dir).unwrap_or(&rel);
                        Path::new(dir).join(flatten_path(under))
                    }
                    _ => rel.clone(),
                }
            }
            FileKind::Plain => rel.clone(),
        };

        Ok(self.out_dir.join(flattened))
    }
}

/// `folder/moduleA` -> `folder__moduleA`.
pub fn replace_separator(name: &str) -> String {
    name.replace(['/', '\\'], FLATTEN_JOIN)
}

/// Component-wise flattening, so the result is separator-free on every
/// platform. Idempotent: a name with no separators is returned unchanged.
pub fn flatten_path(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(FLATTEN_JOIN)
}

fn discover_files(root: &Path, out_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root).follow_links(true).into_iter();
    for entry in walker.filter_entry(|e| {
        if e.depth() == 0 {
            return true;
        }
        let name = e.file_name().to_string_lossy();
        if e.file_type().is_dir() {
            let path = normalize(e.path());
            return name != "node_modules" && !name.starts_with('.') && path != *out_dir;
        }
        true
    }) {
        let entry = entry.map_err(|e| BuildError::Config(e.to_string()))?;
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        if name.ends_with(&format!(".{}", SOURCE_EXT)) && !name.ends_with(".d.ts") {
            files.push(normalize(path));
        }
    }

    // Stable build order regardless of directory iteration order.
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompilerOptions, ToolOptions};

    fn test_project() -> Project {
        let config = Config {
            root: PathBuf::from("/proj"),
            options: CompilerOptions {
                target: Some("es5".to_string()),
                module: Some("commonjs".to_string()),
                base_url: Some("./modules/".to_string()),
                out_dir: Some("../dist/".to_string()),
                root_dir: Some("./".to_string()),
            },
            tool: ToolOptions::default(),
        };
        Project {
            root: PathBuf::from("/proj"),
            out_dir: PathBuf::from("/dist"),
            base_module_dir: PathBuf::from("/proj/modules"),
            files: vec![
                PathBuf::from("/proj/modules/moduleA.ts"),
                PathBuf::from("/proj/modules/folder/moduleB.ts"),
                PathBuf::from("/proj/rtModules/native.ts"),
                PathBuf::from("/proj/event/onMessage.ts"),
            ],
            config,
        }
    }

    #[test]
    fn categorize_by_path_containment() {
        let p = test_project();
        assert_eq!(
            p.categorize(Path::new("/proj/modules/moduleA.ts")),
            FileKind::Module
        );
        assert_eq!(
            p.categorize(Path::new("/proj/modules/folder/moduleB.ts")),
            FileKind::Module
        );
        assert_eq!(
            p.categorize(Path::new("/proj/rtModules/native.ts")),
            FileKind::Runtime
        );
        assert_eq!(
            p.categorize(Path::new("/proj/event/onMessage.ts")),
            FileKind::Plain
        );
    }

    #[test]
    fn flattened_names_replace_every_separator() {
        let p = test_project();
        assert_eq!(
            p.flattened_module_name(Path::new("/proj/modules/moduleA.ts")),
            Some("moduleA".to_string())
        );
        assert_eq!(
            p.flattened_module_name(Path::new("/proj/modules/folder/moduleB.ts")),
            Some("folder__moduleB".to_string())
        );
        assert_eq!(
            p.module_namespace(Path::new("/proj/modules/folder/moduleB.ts")),
            Some("module_folder__moduleB".to_string())
        );
    }

    #[test]
    fn flattening_is_idempotent() {
        let once = replace_separator("folder/sub/moduleA");
        let twice = replace_separator(&once);
        assert_eq!(once, "folder__sub__moduleA");
        assert_eq!(once, twice);
    }

    #[test]
    fn distinct_modules_get_distinct_namespaces() {
        let p = test_project();
        let a = p.module_namespace(Path::new("/proj/modules/moduleA.ts"));
        let b = p.module_namespace(Path::new("/proj/modules/folder/moduleB.ts"));
        assert_ne!(a, b);
    }

    #[test]
    fn output_paths_flatten_under_the_boundary() {
        let p = test_project();
        assert_eq!(
            p.output_path(Path::new("/proj/modules/folder/moduleB.ts")).unwrap(),
            PathBuf::from("/dist/modules/folder__moduleB.js")
        );
        assert_eq!(
            p.output_path(Path::new("/proj/rtModules/native.ts")).unwrap(),
            PathBuf::from("/dist/rtModules/native.js")
        );
        assert_eq!(
            p.output_path(Path::new("/proj/event/onMessage.ts")).unwrap(),
            PathBuf::from("/dist/event/onMessage.js")
        );
    }

    #[test]
    fn specifier_namespaces_use_the_reserved_prefix() {
        assert_eq!(
            Project::namespace_for_specifier("moduleA"),
            "module_moduleA"
        );
    }
}
