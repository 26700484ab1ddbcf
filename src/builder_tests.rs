#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use crate::builder::Builder;
    use crate::error::BuildError;
    use crate::init::init;

    const CONFIG: &str = r#"{
    "compilerOptions": {
        "target": "es2015",
        "module": "commonjs",
        "rootDir": "./",
        "outDir": "./dist/",
        "baseUrl": "./modules/"
    },
    "cloudflat": {
        "useRequireOnce": true
    }
}"#;

    fn write(dir: &Path, rel: &str, text: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn scaffold(dir: &Path) {
        write(dir, "tsconfig.json", CONFIG);
        write(
            dir,
            "modules/moduleA.ts",
            "export function greet(name: string): string { return \"hi \" + name; }\n",
        );
        write(
            dir,
            "modules/folder/moduleB.ts",
            "export const answer: number = 42;\n",
        );
        write(
            dir,
            "event/onMessage.ts",
            "import * as moduleA from \"moduleA\";\nmoduleA.greet(\"player\");\n",
        );
        write(dir, "rtModules/native.ts", "const tick: number = 1;\ntick;\n");
    }

    #[test]
    fn test_build_all_writes_flattened_outputs() {
        let tmp = TempDir::new().unwrap();
        scaffold(tmp.path());

        let builder = Builder::new(tmp.path()).unwrap();
        builder.build_all().unwrap();

        let module_a = fs::read_to_string(tmp.path().join("dist/modules/moduleA.js")).unwrap();
        assert!(module_a.contains("module_moduleA_greet"));
        assert!(module_a.contains("var module_moduleA ="));
        assert!(module_a.contains("greet: module_moduleA_greet"));
        assert!(!module_a.contains("export"));
        assert!(!module_a.contains(": string"));

        // Nested module folders collapse into single output filenames.
        let module_b =
            fs::read_to_string(tmp.path().join("dist/modules/folder__moduleB.js")).unwrap();
        assert!(module_b.contains("module_folder__moduleB_answer"));
        assert!(module_b.contains("answer: module_folder__moduleB_answer"));

        let handler = fs::read_to_string(tmp.path().join("dist/event/onMessage.js")).unwrap();
        assert!(handler.contains("requireOnce("));
        assert!(handler.contains("module_moduleA.greet"));
        assert!(!handler.contains("import"));
    }

    #[test]
    fn test_self_import_never_doubles_the_prefix() {
        let tmp = TempDir::new().unwrap();
        scaffold(tmp.path());
        write(
            tmp.path(),
            "modules/moduleA.ts",
            "import * as self from \"moduleA\";\nexport function greet(name: string): string { return \"hi \" + name; }\nexport function greetTwice(name: string): string { return self.greet(name) + self.greet(name); }\n",
        );

        let builder = Builder::new(tmp.path()).unwrap();
        let text = builder.render(Path::new("modules/moduleA.ts")).unwrap();
        assert!(text.contains("module_moduleA.greet("));
        assert!(!text.contains("module_moduleA.module_moduleA_greet"));
    }

    #[test]
    fn test_runtime_files_are_transpiled_untouched() {
        let tmp = TempDir::new().unwrap();
        scaffold(tmp.path());

        let builder = Builder::new(tmp.path()).unwrap();
        builder.build(Path::new("rtModules/native.ts")).unwrap();

        let native = fs::read_to_string(tmp.path().join("dist/rtModules/native.js")).unwrap();
        assert!(native.contains("tick"));
        assert!(!native.contains("module_"));
        assert!(!native.contains(": number"));
    }

    #[test]
    fn test_untracked_file_is_reported_with_the_tracked_set() {
        let tmp = TempDir::new().unwrap();
        scaffold(tmp.path());

        let builder = Builder::new(tmp.path()).unwrap();
        let err = builder.build(Path::new("modules/nope.ts")).unwrap_err();
        assert!(matches!(err, BuildError::FileNotTracked { .. }));
        assert_eq!(err.code(), "CF005");
        assert!(err.to_string().contains("moduleA.ts"));
    }

    #[test]
    fn test_render_leaves_the_output_directory_alone() {
        let tmp = TempDir::new().unwrap();
        scaffold(tmp.path());

        let builder = Builder::new(tmp.path()).unwrap();
        let text = builder.render(Path::new("modules/moduleA.ts")).unwrap();
        assert!(text.contains("var module_moduleA ="));
        assert!(!tmp.path().join("dist").exists());
    }

    #[test]
    fn test_rebuild_overwrites_stale_output() {
        let tmp = TempDir::new().unwrap();
        scaffold(tmp.path());

        let builder = Builder::new(tmp.path()).unwrap();
        builder.build_all().unwrap();
        write(
            tmp.path(),
            "modules/moduleA.ts",
            "export const renamed: number = 7;\n",
        );
        let builder = Builder::new(tmp.path()).unwrap();
        builder.build_all().unwrap();

        let module_a = fs::read_to_string(tmp.path().join("dist/modules/moduleA.js")).unwrap();
        assert!(module_a.contains("module_moduleA_renamed"));
        assert!(!module_a.contains("greet"));
    }

    #[test]
    fn test_config_is_discovered_upward() {
        let tmp = TempDir::new().unwrap();
        scaffold(tmp.path());

        let builder = Builder::new(&tmp.path().join("modules")).unwrap();
        assert_eq!(builder.project().root, tmp.path());
    }

    #[test]
    fn test_missing_base_url_fails_fast() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "tsconfig.json",
            r#"{ "compilerOptions": { "target": "es5" } }"#,
        );

        let err = Builder::new(tmp.path()).unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
        assert_eq!(err.code(), "CF001");
        assert!(err.to_string().contains("baseUrl"));
    }

    #[test]
    fn test_failing_file_stops_the_build() {
        let tmp = TempDir::new().unwrap();
        scaffold(tmp.path());
        write(
            tmp.path(),
            "event/bad.ts",
            "import * as gone from \"missing\";\ngone.x();\n",
        );

        let builder = Builder::new(tmp.path()).unwrap();
        let err = builder.build_all().unwrap_err();
        assert!(matches!(err, BuildError::UnresolvedImport { .. }));
    }

    #[test]
    fn test_init_scaffolds_the_configs_once() {
        let tmp = TempDir::new().unwrap();

        init(tmp.path()).unwrap();
        assert!(tmp.path().join("tsconfig.json").is_file());
        assert!(tmp.path().join("rtModules/tsconfig.json").is_file());
        assert!(tmp.path().join("rtScript/tsconfig.json").is_file());
        assert!(tmp.path().join("modules").is_dir());

        // Re-running keeps existing files intact.
        let before = fs::read_to_string(tmp.path().join("tsconfig.json")).unwrap();
        init(tmp.path()).unwrap();
        let after = fs::read_to_string(tmp.path().join("tsconfig.json")).unwrap();
        assert_eq!(before, after);
    }
}
