//! Project scaffolding: writes the starter configuration files.

use serde_json::json;
use std::fs;
use std::path::Path;

use crate::config::CONFIG_FILE_NAME;
use crate::error::{BuildError, Result};
use crate::project::RUNTIME_DIRS;

/// Create the starter configuration in `dir`: a root config plus one
/// extending config per runtime directory. Existing files are left alone so
/// re-running on a configured project is a no-op.
pub fn init(dir: &Path) -> Result<()> {
    let root_config = json!({
        "compilerOptions": {
            "target": "es5",
            "module": "commonjs",
            "rootDir": "./",
            "outDir": "../dist/",
            "baseUrl": "./modules/",
        }
    });
    write_config(&dir.join(CONFIG_FILE_NAME), &root_config)?;

    for runtime in RUNTIME_DIRS {
        let extending = json!({
            "extends": "../tsconfig.json",
            "compilerOptions": {
                "outDir": format!("../../dist/{}/", runtime),
            }
        });
        write_config(&dir.join(runtime).join(CONFIG_FILE_NAME), &extending)?;
    }

    fs::create_dir_all(dir.join("modules"))?;
    Ok(())
}

fn write_config(path: &Path, value: &serde_json::Value) -> Result<()> {
    if path.exists() {
        tracing::info!("{} already exists, skipping", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut text = serde_json::to_string_pretty(value)
        .map_err(|e| BuildError::Config(e.to_string()))?;
    text.push('\n');
    fs::write(path, text)?;
    tracing::info!("{} created", path.display());
    Ok(())
}
