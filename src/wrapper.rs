//! Module wrapping: turns a renamed module file into a single global
//! namespace binding, and rewrites import statements into sandbox require
//! stubs.
//!
//! The wrapping strategy is trailing aggregation: every export marker is
//! stripped, the exported names are recorded in declaration order, and one
//! variable statement is appended binding the namespace object:
//!
//! ```text
//! var module_<ns> = {
//!     foo: module_<ns>_foo,
//! };
//! ```
//!
//! Renaming has already flattened the file's own declarations, so the
//! aggregate is the only surface other files can see; everything else hides
//! behind the reserved prefix. Externally the contract is
//! `module_<ns>.<exportedName>` and nothing more.

use oxc_allocator::Allocator;
use oxc_ast::ast::{Declaration, ModuleExportName, Program, Statement};
use oxc_parser::Parser;
use oxc_span::GetSpan;
use std::path::Path;

use crate::error::{BuildError, Result};
use crate::project::{FileKind, Project};
use crate::renamer::{apply_edits, parse_error, source_type, RenameEdit};

/// One `name: value` pair of the namespace aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ExportProperty {
    exported: String,
    internal: String,
}

/// Apply the wrapping pass to renamed source text. Module files get export
/// stripping plus the trailing aggregate; module and plain files get their
/// import statements replaced by require stubs; runtime files never reach
/// this pass.
pub fn wrap(
    project: &Project,
    file: &Path,
    kind: FileKind,
    use_require_once: bool,
    text: &str,
) -> Result<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, text, source_type()).parse();
    if !ret.errors.is_empty() {
        return Err(parse_error(file, &ret.errors));
    }
    let program = ret.program;

    let mut edits: Vec<RenameEdit> = Vec::new();

    convert_imports(&program, use_require_once, &mut edits);

    let mut aggregate = String::new();
    if kind == FileKind::Module {
        let namespace = project.module_namespace(file).ok_or_else(|| {
            BuildError::Config(format!(
                "{} is categorized as a module file but lies outside the module directory",
                file.display()
            ))
        })?;
        let properties = strip_export_markers(file, &program, &namespace, &mut edits)?;
        aggregate = render_aggregate(&namespace, &properties);
    }

    let mut out = apply_edits(text, edits);
    out.push_str(&aggregate);
    Ok(out)
}

/// Replace every import statement with a require stub, one per distinct
/// specifier. Type-only imports are erased outright.
fn convert_imports(program: &Program, use_require_once: bool, edits: &mut Vec<RenameEdit>) {
    let mut seen: Vec<String> = Vec::new();

    for stmt in &program.body {
        let Statement::ImportDeclaration(import) = stmt else {
            continue;
        };

        let specifier = import.source.value.to_string();
        let stub = if import.import_kind.is_type() || seen.contains(&specifier) {
            String::new()
        } else {
            seen.push(specifier.clone());
            if use_require_once {
                format!("requireOnce(\"{}\");", specifier)
            } else {
                format!("require(\"{}\");", specifier)
            }
        };

        edits.push(RenameEdit {
            start: import.span.start,
            end: import.span.end,
            text: stub,
        });
    }
}

/// Remove export markers from top-level statements, recording the exported
/// names in declaration order. Internal names already carry the flattened
/// prefix; the exported key is the original name with that prefix stripped.
fn strip_export_markers(
    file: &Path,
    program: &Program,
    namespace: &str,
    edits: &mut Vec<RenameEdit>,
) -> Result<Vec<ExportProperty>> {
    let internal_prefix = format!("{}_", namespace);
    let mut properties: Vec<ExportProperty> = Vec::new();

    for stmt in &program.body {
        match stmt {
            Statement::ExportNamedDeclaration(export) => {
                // `export { a } from "spec"` forwards bindings this file
                // never declares; it cannot survive flattening.
                if let Some(source) = &export.source {
                    return Err(BuildError::UnsupportedSpecifier {
                        file: file.to_path_buf(),
                        specifier: source.value.to_string(),
                        reason: "re-exports cannot cross the flat namespace; import the module and export its members directly".to_string(),
                    });
                }
                if let Some(decl) = &export.declaration {
                    // Drop the `export ` marker, keep the declaration.
                    edits.push(RenameEdit {
                        start: export.span.start,
                        end: decl.span().start,
                        text: String::new(),
                    });
                    for internal in declaration_names(decl) {
                        properties.push(ExportProperty {
                            exported: internal
                                .strip_prefix(&internal_prefix)
                                .unwrap_or(&internal)
                                .to_string(),
                            internal,
                        });
                    }
                } else {
                    // `export { a, b as c };` — record and drop the statement.
                    for specifier in &export.specifiers {
                        let exported = module_export_name(&specifier.exported);
                        let internal = module_export_name(&specifier.local);
                        properties.push(ExportProperty {
                            exported: exported
                                .strip_prefix(&internal_prefix)
                                .unwrap_or(&exported)
                                .to_string(),
                            internal,
                        });
                    }
                    edits.push(RenameEdit {
                        start: export.span.start,
                        end: export.span.end,
                        text: String::new(),
                    });
                }
            }
            Statement::ExportAllDeclaration(export) => {
                return Err(BuildError::UnsupportedSpecifier {
                    file: file.to_path_buf(),
                    specifier: export.source.value.to_string(),
                    reason: "star re-exports cannot cross the flat namespace; import the module and export its members directly".to_string(),
                });
            }
            Statement::ExportDefaultDeclaration(_) => {
                return Err(BuildError::UnsupportedSpecifier {
                    file: file.to_path_buf(),
                    specifier: "default".to_string(),
                    reason: format!(
                        "default exports have no flattened form; export named members of {} instead",
                        namespace
                    ),
                });
            }
            _ => {}
        }
    }

    Ok(properties)
}

fn declaration_names(decl: &Declaration) -> Vec<String> {
    use oxc_ast::ast::{BindingPattern, TSModuleDeclarationName};

    match decl {
        Declaration::FunctionDeclaration(f) => {
            f.id.iter().map(|id| id.name.to_string()).collect()
        }
        Declaration::ClassDeclaration(c) => {
            c.id.iter().map(|id| id.name.to_string()).collect()
        }
        Declaration::TSEnumDeclaration(e) => vec![e.id.name.to_string()],
        Declaration::TSModuleDeclaration(m) => match &m.id {
            TSModuleDeclarationName::Identifier(id) => vec![id.name.to_string()],
            _ => Vec::new(),
        },
        Declaration::VariableDeclaration(v) => v
            .declarations
            .iter()
            .filter_map(|d| match &d.id {
                BindingPattern::BindingIdentifier(id) => Some(id.name.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn module_export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::IdentifierName(id) => id.name.to_string(),
        ModuleExportName::IdentifierReference(id) => id.name.to_string(),
        ModuleExportName::StringLiteral(lit) => lit.value.to_string(),
    }
}

fn render_aggregate(namespace: &str, properties: &[ExportProperty]) -> String {
    if properties.is_empty() {
        return format!("\nvar {} = {{}};\n", namespace);
    }

    let mut out = format!("\nvar {} = {{\n", namespace);
    for property in properties {
        out.push_str(&format!("    {}: {},\n", property.exported, property.internal));
    }
    out.push_str("};\n");
    out
}
