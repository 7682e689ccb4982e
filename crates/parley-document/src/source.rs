//! Ways a document can be handed to the extractor

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

/// A reference to a document, resolved once at the extraction boundary
pub enum DocumentSource {
    /// A file on disk
    Path(PathBuf),
    /// An open reader, e.g. an upload stream
    Stream {
        name: String,
        reader: Box<dyn Read + Send>,
    },
    /// Bytes already in memory
    Bytes { name: String, data: Vec<u8> },
}

impl DocumentSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        DocumentSource::Path(path.into())
    }

    pub fn stream(name: impl Into<String>, reader: impl Read + Send + 'static) -> Self {
        DocumentSource::Stream {
            name: name.into(),
            reader: Box::new(reader),
        }
    }

    pub fn bytes(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        DocumentSource::Bytes {
            name: name.into(),
            data: data.into(),
        }
    }

    /// First path of a multi-file selection; `None` when the list is empty
    pub fn from_paths<I, P>(paths: I) -> Option<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        paths.into_iter().next().map(Self::path)
    }

    /// Short human-readable name (file name for paths)
    pub fn name(&self) -> String {
        match self {
            DocumentSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            DocumentSource::Stream { name, .. } | DocumentSource::Bytes { name, .. } => {
                name.clone()
            }
        }
    }

    /// Whether the name carries a `.pdf` extension (case-insensitive)
    pub fn has_pdf_extension(&self) -> bool {
        Path::new(&self.name())
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false)
    }
}

impl fmt::Debug for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            DocumentSource::Stream { name, .. } => {
                f.debug_struct("Stream").field("name", name).finish_non_exhaustive()
            }
            DocumentSource::Bytes { name, data } => f
                .debug_struct("Bytes")
                .field("name", name)
                .field("len", &data.len())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paths_takes_first() {
        let source = DocumentSource::from_paths(["a.pdf", "b.pdf"]).unwrap();
        assert_eq!(source.name(), "a.pdf");

        let empty: Vec<&str> = vec![];
        assert!(DocumentSource::from_paths(empty).is_none());
    }

    #[test]
    fn test_names() {
        assert_eq!(DocumentSource::path("/tmp/docs/report.PDF").name(), "report.PDF");
        assert_eq!(DocumentSource::bytes("upload.pdf", vec![1, 2]).name(), "upload.pdf");
        assert_eq!(
            DocumentSource::stream("piped", std::io::empty()).name(),
            "piped"
        );
    }

    #[test]
    fn test_pdf_extension() {
        assert!(DocumentSource::path("report.PDF").has_pdf_extension());
        assert!(DocumentSource::path("notes.pdf").has_pdf_extension());
        assert!(!DocumentSource::path("notes.txt").has_pdf_extension());
        assert!(!DocumentSource::path("pdf").has_pdf_extension());
    }
}
