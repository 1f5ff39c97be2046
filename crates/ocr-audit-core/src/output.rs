use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::debug;

/// Write a file all-or-nothing.
///
/// `write` fills a temporary file created next to `path`; the temporary file replaces
/// `path` only once `write` returns `Ok`. On any error the target is left untouched and the
/// temporary file is removed.
pub fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    let parent = parent_dir(path);
    fs::create_dir_all(&parent)
        .with_context(|| format!("failed to create output directory {}", parent.display()))?;
    let mut temp = NamedTempFile::new_in(&parent)
        .with_context(|| format!("failed to create temporary file in {}", parent.display()))?;
    write(temp.as_file_mut())?;
    temp.as_file_mut()
        .flush()
        .with_context(|| format!("failed to flush output for {}", path.display()))?;
    temp.persist(path)
        .with_context(|| format!("failed to move output into place at {}", path.display()))?;
    debug!(path = %path.display(), "output written");
    Ok(())
}

/// Write UTF-8 text all-or-nothing.
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    write_atomically(path, |file| {
        file.write_all(text.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))
    })
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// `<stem><suffix>` in the working directory, e.g. `scan_processed.txt`.
pub fn sibling_name(input: &Path, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}{suffix}", file_stem(input)))
}

/// `<stem><suffix>` in the input's own directory, e.g. `docs/scan_scanned.pdf`.
pub fn sibling_path(input: &Path, suffix: &str) -> PathBuf {
    let name = format!("{}{suffix}", file_stem(input));
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
        _ => PathBuf::from(name),
    }
}

fn file_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_creates_parents() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("a/b/out.txt");
        write_text(&path, "contenido").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "contenido");
    }

    #[test]
    fn failed_write_leaves_no_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("out.txt");
        let err = write_atomically(&path, |file| {
            file.write_all(b"partial")?;
            anyhow::bail!("encoder failed")
        })
        .unwrap_err();
        assert!(err.to_string().contains("encoder failed"));
        assert!(!path.exists());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn failed_write_keeps_previous_contents() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("out.txt");
        write_text(&path, "old").unwrap();
        let _ = write_atomically(&path, |_| anyhow::bail!("nope"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");
    }

    #[test]
    fn derived_names() {
        assert_eq!(
            sibling_name(Path::new("docs/scan.pdf"), "_processed.txt"),
            PathBuf::from("scan_processed.txt")
        );
        assert_eq!(
            sibling_path(Path::new("docs/scan.pdf"), "_scanned.pdf"),
            PathBuf::from("docs/scan_scanned.pdf")
        );
        assert_eq!(
            sibling_path(Path::new("scan.pdf"), "_scanned.pdf"),
            PathBuf::from("scan_scanned.pdf")
        );
    }
}
