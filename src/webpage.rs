use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::debug;

use crate::grabber::{GrabError, Result};

/// Rendered markup of a page, as it was when the body became visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebPage {
    url: String,
    html: String,
}

impl WebPage {

    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Writes the raw HTML to `output_path`, replacing whatever was there.
    /// New files are created `rw-r--r--` on unix.
    pub fn write_to_disk(&self, output_path: &Path) -> Result<()> {

        let io_error = |source| GrabError::Io {
            path: output_path.to_path_buf(),
            source,
        };

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }

        let mut file = options.open(output_path).map_err(io_error)?;
        file.write_all(self.html.as_bytes()).map_err(io_error)?;

        debug!(path = %output_path.display(), bytes = self.html.len(), "wrote page");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = "<html><head></head><body><p>hi</p></body></html>";

    #[test]
    fn writes_raw_html() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.html");

        WebPage::new("http://example.com", HTML).write_to_disk(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), HTML);
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.html");
        std::fs::write(&path, "a much longer previous content that must disappear").unwrap();

        WebPage::new("http://example.com", HTML).write_to_disk(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), HTML);
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.html");

        let err = WebPage::new("http://example.com", HTML)
            .write_to_disk(&path)
            .unwrap_err();

        match err {
            GrabError::Io { path: failed, .. } => assert_eq!(failed, path),
            other => panic!("expected an I/O error, got {other:?}"),
        }
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn new_file_is_not_group_or_world_writable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.html");
        WebPage::new("http://example.com", HTML).write_to_disk(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o133, 0, "unexpected mode {mode:o}");
    }
}
