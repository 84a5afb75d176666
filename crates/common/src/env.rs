//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;
use tracing::info;

/// Ensure the parent directory of a file-backed store exists.
pub fn ensure_parent_dir(file: &Path) -> std::io::Result<()> {
    if let Some(parent) = file.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            info!(dir = %parent.display(), "created data directory");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_parent() {
        let root = std::env::temp_dir().join(format!("carto_env_{}", std::process::id()));
        let file = root.join("nested").join("features.json");
        ensure_parent_dir(&file).unwrap();
        assert!(root.join("nested").is_dir());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn bare_file_name_is_fine() {
        ensure_parent_dir(Path::new("features.json")).unwrap();
    }
}
