//! Emit adapter: downlevel transpile, sandbox post-processing, output paths.
//!
//! The host compiler stack does the heavy lifting (type erasure and target
//! downleveling); this module owns the two sandbox-specific text fixups:
//!
//! - the CommonJS interop marker line is stripped byte-for-byte, exactly
//!   once, trailing newline included (the sandbox rejects the interop flag);
//! - doubled namespace prefixes from self-referential imports are collapsed,
//!   `module_<spec>.module_<spec>_name` -> `module_<spec>.name`.

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_syntax::es_target::ESTarget;
use oxc_transformer::{TransformOptions, Transformer};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::Result;
use crate::renamer::{parse_error, source_type};

lazy_static! {
    /// The interop preamble the CommonJS printer inserts unconditionally.
    static ref ES_MODULE_MARKER: Regex = Regex::new(
        r#"Object\.defineProperty\(exports, "__esModule", \{ value: true \}\);\r?\n"#
    )
    .unwrap();
}

/// Downlevel-transpile rewritten source text to target-runtime JavaScript.
pub fn transpile(file: &Path, text: &str, target: Option<&str>) -> Result<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, text, source_type()).parse();
    if !ret.errors.is_empty() {
        return Err(parse_error(file, &ret.errors));
    }
    let mut program = ret.program;

    let scoping = SemanticBuilder::new()
        .build(&program)
        .semantic
        .into_scoping();

    let options = transform_options(target);
    let transformed = Transformer::new(&allocator, file, &options)
        .build_with_scoping(scoping, &mut program);
    if !transformed.errors.is_empty() {
        return Err(parse_error(file, &transformed.errors));
    }

    Ok(Codegen::new().build(&program).code)
}

/// The configured target language level is forwarded to the transformer;
/// anything unrecognized was already rejected by configuration validation.
fn transform_options(target: Option<&str>) -> TransformOptions {
    match target.and_then(|t| ESTarget::from_str(&t.to_lowercase()).ok()) {
        Some(target) => TransformOptions::from(target),
        None => TransformOptions::default(),
    }
}

/// Remove the interop marker line, exactly once.
pub fn strip_interop_preamble(js: &str) -> String {
    ES_MODULE_MARKER.replacen(js, 1, "").into_owned()
}

/// Collapse the doubled prefix a self-referential import leaves behind, for
/// every import target the renaming pass encountered.
pub fn collapse_self_references(js: &str, import_targets: &[String]) -> String {
    let mut out = js.to_string();
    for namespace in import_targets {
        let escaped = regex::escape(namespace);
        let pattern = Regex::new(&format!(r"{}\.{}_", escaped, escaped))
            .expect("escaped namespace is a valid pattern");
        let replacement = format!("{}.", namespace);
        out = pattern.replace_all(&out, replacement.as_str()).into_owned();
    }
    out
}

/// Write emitted text under its flattened output path, creating parent
/// directories as needed. Re-running overwrites.
pub fn write_output(out_path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(out_path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interop_marker_is_stripped_exactly_once_with_its_newline() {
        let js = "Object.defineProperty(exports, \"__esModule\", { value: true });\nvar x = 1;\nObject.defineProperty(exports, \"__esModule\", { value: true });\n";
        let stripped = strip_interop_preamble(js);
        assert!(stripped.starts_with("var x = 1;\n"));
        // Only the first occurrence goes.
        assert!(stripped.contains("__esModule"));
    }

    #[test]
    fn marker_strip_is_a_no_op_when_absent() {
        let js = "var x = 1;\n";
        assert_eq!(strip_interop_preamble(js), js);
    }

    #[test]
    fn doubled_prefix_collapses() {
        let js = "module_moduleA.module_moduleA_foo();\n";
        let out = collapse_self_references(js, &["module_moduleA".to_string()]);
        assert_eq!(out, "module_moduleA.foo();\n");
    }

    #[test]
    fn collapse_only_touches_listed_targets() {
        let js = "module_other.module_other_foo();\n";
        let out = collapse_self_references(js, &["module_moduleA".to_string()]);
        assert_eq!(out, js);
    }

    #[test]
    fn transpile_erases_types() {
        let js = transpile(
            Path::new("test.ts"),
            "const foo: number = 1;\nfunction bar(x: string): string { return x; }\n",
            Some("es2015"),
        )
        .unwrap();
        assert!(!js.contains(": number"));
        assert!(!js.contains(": string"));
        assert!(js.contains("foo"));
        assert!(js.contains("bar"));
    }
}
