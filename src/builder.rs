//! Build orchestration: the per-file pipeline and the whole-project loop.
//!
//! Pipeline for module and plain files:
//!
//! ```text
//! read -> rewrite references -> wrap -> transpile -> strip interop marker
//!      -> collapse self references -> write flattened output
//! ```
//!
//! Runtime files skip renaming and wrapping entirely; the target runtime
//! resolves imports natively there, so they only get the downlevel step.
//! Every file is processed independently; a build never consults another
//! file's output.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::normalize;
use crate::emit::{collapse_self_references, strip_interop_preamble, transpile, write_output};
use crate::error::{BuildError, Result};
use crate::project::{FileKind, Project};
use crate::renamer::rewrite_references;
use crate::wrapper::wrap;

#[derive(Debug)]
pub struct Builder {
    project: Project,
}

impl Builder {
    /// Load the project governing `dir` and fail fast on the first
    /// configuration diagnostic.
    pub fn new(dir: &Path) -> Result<Builder> {
        let project = Project::load(dir)?;
        project.config.validate()?;
        Ok(Builder { project })
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Build every tracked file. Stops at the first failing file.
    pub fn build_all(&self) -> Result<()> {
        for file in &self.project.files {
            self.build_file(file)?;
        }
        tracing::info!(files = self.project.files.len(), "build complete");
        Ok(())
    }

    /// Build a single file, given as tracked either verbatim or relative to
    /// the project root.
    pub fn build(&self, file: &Path) -> Result<()> {
        let file = self.resolve_tracked(file)?;
        self.build_file(&file)
    }

    /// Transform a single tracked file in memory, without touching the
    /// output directory.
    pub fn render(&self, file: &Path) -> Result<String> {
        let file = self.resolve_tracked(file)?;
        self.render_file(&file)
    }

    fn resolve_tracked(&self, file: &Path) -> Result<PathBuf> {
        let direct = normalize(file);
        if self.project.is_tracked(&direct) {
            return Ok(direct);
        }
        let joined = normalize(&self.project.root.join(file));
        if self.project.is_tracked(&joined) {
            return Ok(joined);
        }
        Err(BuildError::FileNotTracked {
            file: file.to_path_buf(),
            tracked: self.project.tracked_file_names(),
        })
    }

    fn render_file(&self, file: &Path) -> Result<String> {
        let kind = self.project.categorize(file);
        let source = fs::read_to_string(file)?;
        let target = self.project.config.options.target.as_deref();

        match kind {
            FileKind::Runtime => transpile(file, &source, target),
            FileKind::Module | FileKind::Plain => {
                let renamed = rewrite_references(&self.project, file, kind, &source)?;
                let wrapped = wrap(
                    &self.project,
                    file,
                    kind,
                    self.project.config.tool.use_require_once,
                    &renamed.text,
                )?;
                let js = transpile(file, &wrapped, target)?;
                let js = strip_interop_preamble(&js);
                Ok(collapse_self_references(&js, &renamed.import_targets))
            }
        }
    }

    fn build_file(&self, file: &Path) -> Result<()> {
        let text = self.render_file(file)?;
        let out_path = self.project.output_path(file)?;
        write_output(&out_path, &text)?;
        tracing::info!("{} => {}", file.display(), out_path.display());
        Ok(())
    }
}
