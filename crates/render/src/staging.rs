use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

const PREFIX: &str = "render-";
const SUFFIX: &str = ".html";
const RANDOM_LENGTH: usize = 16;

/// An HTML document written into the provisioning root for the renderer to
/// read. The file is removed when this value is dropped, however the render
/// ends.
pub(crate) struct StagedHtml {
    path: PathBuf,
}

impl StagedHtml {
    /// Write `html` verbatim to a freshly named `render-*.html` file in `root`.
    pub(crate) fn write(root: &Path, html: &[u8]) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix(PREFIX)
            .suffix(SUFFIX)
            .rand_bytes(RANDOM_LENGTH)
            .tempfile_in(root)
            .or_raise(|| ErrorKind::Io)?;
        file.write_all(html).or_raise(|| ErrorKind::Io)?;
        file.flush().or_raise(|| ErrorKind::Io)?;
        // Removal is ours from here on (see `Drop`). The handle is closed;
        // the renderer opens the file by name.
        let (_, path) = file.keep().or_raise(|| ErrorKind::Io)?;
        tracing::debug!(path = %path.display(), size = html.len(), "HTML staged");
        Ok(Self { path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// File name relative to the root, as handed to the renderer.
    pub(crate) fn file_name(&self) -> &Path {
        self.path.file_name().map(Path::new).unwrap_or(self.path())
    }

    /// Output file name: the staged name with a `.pdf` extension.
    pub(crate) fn pdf_name(&self) -> OsString {
        let mut name = self.file_name().with_extension("").into_os_string();
        name.push(".pdf");
        name
    }
}

impl Drop for StagedHtml {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::trace!(path = %self.path.display(), "Staged HTML removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staged HTML"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_cleanup() {
        let root = tempfile::tempdir().unwrap();
        let staged = StagedHtml::write(root.path(), "<h1>Grüße</h1>".as_bytes()).unwrap();
        let path = staged.path().to_path_buf();
        assert_eq!(path.parent().unwrap(), root.path());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<h1>Grüße</h1>");

        let name = staged.file_name().to_string_lossy().into_owned();
        assert!(name.starts_with(PREFIX));
        assert!(name.ends_with(SUFFIX));
        assert_eq!(name.len(), PREFIX.len() + RANDOM_LENGTH + SUFFIX.len());

        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_after_external_removal() {
        let root = tempfile::tempdir().unwrap();
        let staged = StagedHtml::write(root.path(), b"<p></p>").unwrap();
        std::fs::remove_file(staged.path()).unwrap();
        drop(staged);
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_pdf_name() {
        let root = tempfile::tempdir().unwrap();
        let staged = StagedHtml::write(root.path(), b"").unwrap();
        let stem = staged.path().file_stem().unwrap().to_os_string();
        let mut expected = stem;
        expected.push(".pdf");
        assert_eq!(staged.pdf_name(), expected);
    }

    #[test]
    fn test_names_are_unique() {
        let root = tempfile::tempdir().unwrap();
        let first = StagedHtml::write(root.path(), b"<p>one</p>").unwrap();
        let second = StagedHtml::write(root.path(), b"<p>one</p>").unwrap();
        assert_ne!(first.file_name(), second.file_name());
    }

    #[test]
    fn test_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let result = StagedHtml::write(&root.path().join("missing"), b"<p></p>");
        assert_eq!(*result.err().unwrap(), ErrorKind::Io);
    }
}
