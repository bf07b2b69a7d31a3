use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

/// Separator used between classpath entries
pub const CLASSPATH_SEPARATOR: &str = ":";

/// Expand environment variables and `~` in a path string
pub fn expand_path_str(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| path.into())
        .into_owned()
}

/// Expand a PathBuf with environment variables
pub fn expand_path_buf(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(expand_path_str(&path_str))
}

/// Create a directory and all parent directories if they don't exist
pub fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {path:?}"))?;
        debug!("Created directory: {path:?}");
    }
    Ok(())
}

/// Expand a path and anchor it at `base_dir` when relative.
///
/// Unlike [`resolve_path`] the target does not need to exist, which is what
/// library entries pointing at not-yet-downloaded archives require.
pub fn absolutize(path: &Path, base_dir: &Path) -> PathBuf {
    let expanded = expand_path_buf(path);
    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}

/// Resolve a path to a canonical absolute path, creating directories if needed
pub fn resolve_path(path: &Path, config_dir: &Path, create_dirs: bool) -> Result<PathBuf> {
    let abs_path = absolutize(path, config_dir);

    if create_dirs {
        ensure_directory(&abs_path)?;
    }

    let canonical = abs_path
        .canonicalize()
        .with_context(|| format!("Failed to resolve path: {abs_path:?}"))?;

    Ok(canonical)
}

/// File name of `path` as a string, empty when there is none
pub fn file_name_str(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Join classpath entries in order
pub fn join_classpath<P: AsRef<Path>>(entries: &[P]) -> String {
    entries
        .iter()
        .map(|entry| entry.as_ref().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(CLASSPATH_SEPARATOR)
}
