//! # cloudflat
//!
//! Flattens a tree of TypeScript modules into namespaced single-file scripts
//! for a cloud-code sandbox that has no module system, only one shared global
//! scope per script.
//!
//! ## Naming Invariants
//!
//! 1. **Reserved Prefix**: every generated global identifier starts with
//!    `module_`. User code owning an identifier under that prefix fails the
//!    build, which is what makes generated names collision-free.
//!
//! 2. **Flattened Namespaces**: a module file's namespace is its path under
//!    the base-module directory with separators replaced by `__`:
//!    `modules/folder/a.ts` becomes `module_folder__a`.
//!
//! 3. **Declaration Renaming**: every top-level declaration of a module file
//!    is renamed to `module_<ns>_<name>`, exported or not. Unexported
//!    declarations stay private by prefix, not by scope.
//!
//! 4. **Import Substitution**: a namespace import binding becomes the target
//!    namespace identifier; a named import binding becomes
//!    `module_<spec>_<originalExportedName>`. Aliases never survive.
//!
//! 5. **Single Surface**: a wrapped module exposes exactly one binding, the
//!    trailing aggregate `var module_<ns> = { exported: internal, ... };`.
//!
//! 6. **File Independence**: each file is transformed from its own text
//!    alone. Cross-file renames follow from invariants 2-4 agreeing on the
//!    name, never from reading another file's output.

mod builder;
mod config;
mod emit;
mod error;
mod init;
mod project;
mod renamer;
mod resolver;
mod wrapper;

pub use builder::Builder;
pub use config::{Config, CONFIG_FILE_NAME};
pub use error::{BuildError, Result};
pub use init::init;
pub use project::{FileKind, Project, FLATTEN_JOIN, RESERVED_PREFIX, RUNTIME_DIRS};
pub use renamer::{rewrite_references, RenamedFile};
pub use wrapper::wrap;

#[cfg(test)]
mod builder_tests;
