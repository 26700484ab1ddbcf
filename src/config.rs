//! Project configuration.
//!
//! A project is described by a `tsconfig.json` discovered from the build
//! root upward, the same way the host TypeScript tooling finds it. Only the
//! options the flattener acts on are modeled; everything else in the file is
//! ignored. The tool-specific knobs live under a top-level `"cloudflat"` key.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BuildError, Result};

pub const CONFIG_FILE_NAME: &str = "tsconfig.json";

/// Script targets the downlevel emitter recognizes.
const KNOWN_TARGETS: &[&str] = &[
    "es5", "es6", "es2015", "es2016", "es2017", "es2018", "es2019", "es2020",
    "es2021", "es2022", "esnext",
];

const KNOWN_MODULES: &[&str] = &["commonjs", "none"];

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    pub target: Option<String>,
    pub module: Option<String>,
    /// Base-module directory, relative to the config file. Files under it are
    /// flattened and wrapped. Must be set.
    pub base_url: Option<String>,
    pub out_dir: Option<String>,
    pub root_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ToolOptions {
    /// Emit `requireOnce("spec")` instead of `require("spec")` stubs.
    #[serde(default)]
    pub use_require_once: bool,
    /// Text encoding for source reads and emitted writes. Narrowed to UTF-8:
    /// reads and writes are always UTF-8, and any other configured value is
    /// rejected as a diagnostic instead of being honored.
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RawConfig {
    #[serde(rename = "compilerOptions", default)]
    compiler_options: CompilerOptions,
    #[serde(rename = "cloudflat", default)]
    cloudflat: ToolOptions,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing the discovered config file. All relative options
    /// resolve against it.
    pub root: PathBuf,
    pub options: CompilerOptions,
    pub tool: ToolOptions,
}

impl Config {
    /// Discover and load the configuration, searching `dir` and its
    /// ancestors for a config file (mirrors `ts.findConfigFile`).
    pub fn load(dir: &Path) -> Result<Config> {
        let file = find_config_file(dir).ok_or_else(|| {
            BuildError::Config(format!(
                "no {} found in {} or any parent directory",
                CONFIG_FILE_NAME,
                dir.display()
            ))
        })?;

        let text = fs::read_to_string(&file)?;
        let raw: RawConfig = serde_json::from_str(&text)
            .map_err(|e| BuildError::Config(format!("{}: {}", file.display(), e)))?;

        let root = file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Config {
            root,
            options: raw.compiler_options,
            tool: raw.cloudflat,
        })
    }

    /// All configuration diagnostics, in a stable order. An empty list means
    /// the configuration is buildable.
    pub fn diagnostics(&self) -> Vec<String> {
        let mut out = Vec::new();

        if self.options.base_url.as_deref().map_or(true, str::is_empty) {
            out.push(format!(
                "{}: compilerOptions.baseUrl must point at the module directory",
                CONFIG_FILE_NAME
            ));
        }

        if let Some(target) = &self.options.target {
            if !KNOWN_TARGETS.contains(&target.to_lowercase().as_str()) {
                out.push(format!("unknown compilerOptions.target \"{}\"", target));
            }
        }

        if let Some(module) = &self.options.module {
            if !KNOWN_MODULES.contains(&module.to_lowercase().as_str()) {
                out.push(format!(
                    "unsupported compilerOptions.module \"{}\" (the sandbox has no module system)",
                    module
                ));
            }
        }

        if let Some(encoding) = &self.tool.encoding {
            let normalized = encoding.to_lowercase().replace('-', "");
            if normalized != "utf8" {
                out.push(format!("unsupported encoding \"{}\"", encoding));
            }
        }

        out
    }

    /// Fails fast with the first diagnostic, per the builder contract.
    pub fn validate(&self) -> Result<()> {
        match self.diagnostics().into_iter().next() {
            Some(first) => Err(BuildError::Config(first)),
            None => Ok(()),
        }
    }

    /// Base-module directory, resolved against the project root.
    pub fn base_module_dir(&self) -> Result<PathBuf> {
        let base = self
            .options
            .base_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                BuildError::Config(format!("{}: baseUrl is not set", CONFIG_FILE_NAME))
            })?;
        Ok(normalize(&self.root.join(base)))
    }

    /// Output directory, resolved against the project root.
    pub fn out_dir(&self) -> PathBuf {
        let out = self.options.out_dir.as_deref().unwrap_or("dist");
        normalize(&self.root.join(out))
    }
}

fn find_config_file(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .map(|d| d.join(CONFIG_FILE_NAME))
        .find(|f| f.is_file())
}

/// Lexical path cleanup: drops `.` segments and folds `..` so that joined
/// config paths like `root/./modules/` and `root/../dist` compare stably.
pub fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
