//! Renaming engine: computes and applies the per-file rename edit batch.
//!
//! Two passes over one file:
//!
//! - **Pass A** (module files only): every top-level declaration is renamed
//!   to its flattened, prefixed form `module_<ns>_<name>`. Unexported
//!   declarations are renamed too; the reserved prefix is what keeps them
//!   private once the file is flat.
//! - **Pass B** (module and plain files): namespace import bindings are
//!   renamed to the target module's namespace identifier `module_<spec>`,
//!   named import bindings to `module_<spec>_<originalExportedName>`, and
//!   the specifier text itself to its flattened form.
//!
//! Edits from both passes are merged, sorted by descending start offset and
//! spliced in one pass, so earlier offsets stay valid while later (higher)
//! offsets are replaced. The caller re-parses from the resulting text; spans
//! from the pre-edit tree are never reused after the splice.

use oxc_allocator::Allocator;
use oxc_ast::ast::{ImportDeclarationSpecifier, ModuleExportName, Program, Statement};
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::path::Path;

use crate::error::{BuildError, Result};
use crate::project::{replace_separator, FileKind, Project, RESERVED_PREFIX};
use crate::resolver::{top_level_declarations, FileIndex, Reference};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameEdit {
    pub start: u32,
    pub end: u32,
    pub text: String,
}

#[derive(Debug)]
pub struct RenamedFile {
    pub text: String,
    /// Flattened namespace identifiers of every import target encountered,
    /// in order, for the emit-time self-reference collapse.
    pub import_targets: Vec<String>,
}

pub fn source_type() -> SourceType {
    SourceType::default().with_typescript(true).with_module(true)
}

/// Run both rename passes over `source` and splice the edits.
pub fn rewrite_references(
    project: &Project,
    file: &Path,
    kind: FileKind,
    source: &str,
) -> Result<RenamedFile> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type()).parse();
    if !ret.errors.is_empty() {
        return Err(parse_error(file, &ret.errors));
    }
    let program = ret.program;
    let index = FileIndex::build(&program);

    check_reserved_prefix(file, &index)?;

    let mut edits: Vec<RenameEdit> = Vec::new();
    let mut import_targets: Vec<String> = Vec::new();

    if kind == FileKind::Module {
        collect_declaration_edits(project, file, &program, &index, &mut edits);
    }
    collect_import_edits(project, file, &program, &index, &mut edits, &mut import_targets)?;

    tracing::debug!(
        file = %file.display(),
        edits = edits.len(),
        "rename edit batch collected"
    );

    Ok(RenamedFile {
        text: apply_edits(source, edits),
        import_targets,
    })
}

/// Parse failure mapping shared by every stage that re-parses.
pub fn parse_error<D: std::fmt::Debug>(file: &Path, errors: &[D]) -> BuildError {
    BuildError::Parse {
        file: file.to_path_buf(),
        message: errors
            .first()
            .map(|e| format!("{:?}", e))
            .unwrap_or_else(|| "unknown parse error".to_string()),
    }
}

/// Build fails when user code already owns an identifier under the reserved
/// prefix; collision-freedom of the generated names depends on it.
fn check_reserved_prefix(file: &Path, index: &FileIndex) -> Result<()> {
    let mut offenders: Vec<&String> = index
        .identifiers()
        .iter()
        .filter(|name| name.starts_with(RESERVED_PREFIX))
        .collect();
    offenders.sort();

    match offenders.first() {
        Some(name) => Err(BuildError::ReservedIdentifier {
            file: file.to_path_buf(),
            identifier: (*name).clone(),
            prefix: RESERVED_PREFIX,
        }),
        None => Ok(()),
    }
}

/// Pass A.
fn collect_declaration_edits(
    project: &Project,
    file: &Path,
    program: &Program,
    index: &FileIndex,
    edits: &mut Vec<RenameEdit>,
) {
    let Some(flattened) = project.flattened_module_name(file) else {
        return;
    };

    for (name, span) in top_level_declarations(program) {
        let new_name = format!("{}{}_{}", RESERVED_PREFIX, flattened, name);
        push_reference_edits(index.find_references(span.start), &name, &new_name, edits);
    }
}

/// Pass B.
fn collect_import_edits(
    project: &Project,
    file: &Path,
    program: &Program,
    index: &FileIndex,
    edits: &mut Vec<RenameEdit>,
    import_targets: &mut Vec<String>,
) -> Result<()> {
    for stmt in &program.body {
        let Statement::ImportDeclaration(import) = stmt else {
            continue;
        };

        let specifier_text = import.source.value.to_string();
        validate_specifier(project, file, &specifier_text)?;

        let namespace = Project::namespace_for_specifier(&specifier_text);
        if !import_targets.contains(&namespace) {
            import_targets.push(namespace.clone());
        }

        // Flatten the specifier literal itself.
        edits.push(RenameEdit {
            start: import.source.span.start,
            end: import.source.span.end,
            text: format!("\"{}\"", replace_separator(&specifier_text)),
        });

        // Type-only imports vanish at emit; nothing to rename.
        if import.import_kind.is_type() {
            continue;
        }

        let Some(specifiers) = &import.specifiers else {
            continue; // bare `import "spec"` side-effect form
        };

        for specifier in specifiers {
            match specifier {
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                    push_reference_edits(
                        index.find_references(s.local.span.start),
                        &s.local.name,
                        &namespace,
                        edits,
                    );
                }
                ImportDeclarationSpecifier::ImportSpecifier(s) => {
                    // The original exported name, never the local alias.
                    let imported = match &s.imported {
                        ModuleExportName::IdentifierName(id) => id.name.to_string(),
                        ModuleExportName::StringLiteral(lit) => lit.value.to_string(),
                        ModuleExportName::IdentifierReference(id) => id.name.to_string(),
                    };
                    let new_name = format!("{}_{}", namespace, imported);
                    push_reference_edits(
                        index.find_references(s.local.span.start),
                        &s.local.name,
                        &new_name,
                        edits,
                    );
                }
                ImportDeclarationSpecifier::ImportDefaultSpecifier(_) => {
                    return Err(BuildError::UnsupportedSpecifier {
                        file: file.to_path_buf(),
                        specifier: specifier_text,
                        reason:
                            "default imports have no flattened form; use a namespace or named import"
                                .to_string(),
                    });
                }
            }
        }
    }

    Ok(())
}

fn push_reference_edits(
    references: &[Reference],
    original: &str,
    new_name: &str,
    edits: &mut Vec<RenameEdit>,
) {
    for reference in references {
        let text = if reference.shorthand {
            // `{ foo }` must stay keyed by the original name.
            format!("{}: {}", original, new_name)
        } else {
            new_name.to_string()
        };
        edits.push(RenameEdit {
            start: reference.span.start,
            end: reference.span.end,
            text,
        });
    }
}

fn validate_specifier(project: &Project, file: &Path, specifier: &str) -> Result<()> {
    if specifier.contains("..") {
        return Err(BuildError::UnsupportedSpecifier {
            file: file.to_path_buf(),
            specifier: specifier.to_string(),
            reason: "relative paths are not supported on cloud code".to_string(),
        });
    }
    if specifier.contains('/') || specifier.contains('\\') {
        return Err(BuildError::UnsupportedSpecifier {
            file: file.to_path_buf(),
            specifier: specifier.to_string(),
            reason: "the sandbox namespace is flat; nested module paths cannot be addressed"
                .to_string(),
        });
    }
    if project.resolve_specifier(specifier).is_none() {
        return Err(BuildError::UnresolvedImport {
            file: file.to_path_buf(),
            specifier: specifier.to_string(),
        });
    }
    Ok(())
}

/// Splice an edit batch into `source`. Edits are applied in descending start
/// order; identical duplicates are collapsed and an overlapping edit is
/// dropped rather than corrupting offsets.
pub fn apply_edits(source: &str, mut edits: Vec<RenameEdit>) -> String {
    edits.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));
    edits.dedup();

    let mut text = source.to_string();
    let mut previous_start = u32::MAX;
    for edit in edits {
        if edit.end > previous_start {
            tracing::warn!(
                start = edit.start,
                end = edit.end,
                "overlapping rename edit dropped"
            );
            continue;
        }
        previous_start = edit.start;
        text.replace_range(edit.start as usize..edit.end as usize, &edit.text);
    }
    text
}
