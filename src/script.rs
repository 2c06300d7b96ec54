use crate::errors::{AppError, ResultExt};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// A SQL script read in full from disk.
///
/// The SHA-256 checksum identifies exactly which script text was replayed,
/// so two runs can be compared from their summaries alone.
#[derive(Debug, Clone)]
pub struct ScriptFile {
    pub path: PathBuf,
    pub contents: String,
    /// SHA-256 of the contents (hex encoded)
    pub checksum: String,
}

impl ScriptFile {
    /// Reads `path` as UTF-8. A missing or non-UTF-8 file is an error.
    pub fn read(path: &Path) -> Result<Self, AppError> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        Ok(Self::from_contents(path, contents))
    }

    pub fn from_contents(path: &Path, contents: String) -> Self {
        let checksum = compute_checksum(&contents);
        tracing::info!(
            "Loaded script {} ({} bytes, sha256 {})",
            path.display(),
            contents.len(),
            &checksum[..12]
        );
        Self {
            path: path.to_path_buf(),
            contents,
            checksum,
        }
    }
}

fn compute_checksum(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_checksum_is_stable_and_content_sensitive() {
        let a = compute_checksum("SELECT 1;");
        assert_eq!(a, compute_checksum("SELECT 1;"));
        assert_ne!(a, compute_checksum("SELECT 2;"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_read_script_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "CREATE TABLE a (id int);\n-- done\n").unwrap();
        let script = ScriptFile::read(file.path()).unwrap();
        assert!(script.contents.starts_with("CREATE TABLE a"));
        assert_eq!(script.checksum, compute_checksum(&script.contents));
    }

    #[test]
    fn test_read_missing_script_is_error() {
        let err = ScriptFile::read(Path::new("/nonexistent/schema.sql")).unwrap_err();
        assert!(err.to_string().contains("reading script"));
    }
}
