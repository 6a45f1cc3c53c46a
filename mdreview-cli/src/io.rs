//! File I/O for native CLI

use anyhow::{Context, Result};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use mdreview_core::SubmissionPayload;

/// Markdown to review plus a default title
pub struct Source {
    pub title: String,
    pub content: String,
}

/// Read markdown from a file, or from stdin when the path is `-`
pub fn load_source(path: &str) -> Result<Source> {
    if path == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read markdown from stdin")?;
        return Ok(Source {
            title: "stdin".to_string(),
            content,
        });
    }

    let path = Path::new(path);
    let canonical = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve path: {}", path.display()))?;

    let content = fs::read_to_string(&canonical)
        .with_context(|| format!("Failed to read file: {}", canonical.display()))?;

    let title = canonical
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Untitled".to_string());

    Ok(Source { title, content })
}

/// Get the ~/.mdreview directory path, creating it if needed
pub fn app_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not find home directory")?;
    ensure_dir(home.join(".mdreview"))
}

pub fn log_dir() -> Result<PathBuf> {
    ensure_dir(app_dir()?.join("logs"))
}

fn ensure_dir(dir: PathBuf) -> Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    Ok(dir)
}

/// Write the final payload to `<dir>/last-review.json`
pub fn export_payload(dir: &Path, payload: &SubmissionPayload) -> Result<PathBuf> {
    let export_path = dir.join("last-review.json");

    let json = mdreview_core::to_json(payload).context("Failed to serialize payload")?;

    fs::write(&export_path, json)
        .with_context(|| format!("Failed to write {}", export_path.display()))?;

    Ok(export_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_comes_from_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release-plan.md");
        fs::write(&path, "# Plan\n").unwrap();

        let source = load_source(path.to_str().unwrap()).unwrap();
        assert_eq!(source.title, "release-plan");
        assert_eq!(source.content, "# Plan\n");
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_source("/definitely/not/here.md").err().unwrap();
        assert!(err.to_string().contains("/definitely/not/here.md"));
    }

    #[test]
    fn test_export_writes_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_payload(dir.path(), &SubmissionPayload::cancelled()).unwrap();

        let written = fs::read_to_string(path).unwrap();
        let parsed: SubmissionPayload = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, SubmissionPayload::cancelled());
        assert!(written.contains('\n'));
    }
}
