use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Fail when `--output` would write the JSON conversion result over the
/// ScreenOS configuration passed as `config`.
///
/// Called before the configuration is parsed.
pub fn ensure_output_not_input(output: &Path, config: &Path) -> Result<()> {
    let result_path = resolved(output)
        .with_context(|| format!("failed to resolve output path {}", output.display()))?;
    let config_path = resolved(config)
        .with_context(|| format!("failed to resolve config path {}", config.display()))?;
    if result_path == config_path {
        bail!(
            "refusing to overwrite source config: output {} matches input {}",
            output.display(),
            config.display()
        );
    }
    Ok(())
}

/// Absolute form of `path` for comparison. A result file that does not
/// exist yet is resolved through its parent directory.
fn resolved(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return path
            .canonicalize()
            .with_context(|| format!("canonicalize {}", path.display()));
    }

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if let (true, Some(name)) = (parent.exists(), path.file_name()) {
        let parent = parent
            .canonicalize()
            .with_context(|| format!("canonicalize {}", parent.display()))?;
        return Ok(parent.join(name));
    }

    let base = if path.is_absolute() {
        PathBuf::new()
    } else {
        std::env::current_dir().context("current_dir")?
    };
    Ok(base.join(path))
}
