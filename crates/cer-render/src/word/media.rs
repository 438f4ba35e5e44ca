//! Image lookup for pictures embedded in the word package.

use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Resolves an image reference to its bytes.
///
/// Returning `None` makes the serializer fall back to the image's alt text.
pub trait ImageSource {
    fn load(&self, src: &str) -> Option<Vec<u8>>;
}

/// Loads relative paths from a base directory and decodes `data:` URIs.
#[derive(Clone, Debug)]
pub struct FsImageSource {
    base_dir: PathBuf,
}

impl FsImageSource {
    /// Create a source resolving relative paths against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl ImageSource for FsImageSource {
    fn load(&self, src: &str) -> Option<Vec<u8>> {
        if src.starts_with("data:") {
            return decode_data_uri(src);
        }
        if src.starts_with("http://") || src.starts_with("https://") {
            tracing::debug!(src, "Remote images are not embedded");
            return None;
        }
        let path = self.base_dir.join(src.trim_start_matches("file://"));
        match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read image");
                None
            }
        }
    }
}

/// Wrap the `<svg>` element found in `markup` into a base64 `data:` URI.
///
/// Returns `None` when the markup holds no complete SVG element.
pub fn svg_data_uri(markup: &str) -> Option<String> {
    let start = markup.find("<svg")?;
    let end = markup.rfind("</svg>")? + "</svg>".len();
    (start < end).then(|| {
        format!(
            "data:image/svg+xml;base64,{}",
            STANDARD.encode(&markup[start..end])
        )
    })
}

/// Decode a base64 `data:` URI into raw bytes.
///
/// Returns `None` for non-base64 URIs and malformed payloads.
pub fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    if !meta.ends_with(";base64") {
        return None;
    }
    STANDARD.decode(payload.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_uri() {
        assert_eq!(
            decode_data_uri("data:image/png;base64,aGVsbG8="),
            Some(b"hello".to_vec())
        );
        assert_eq!(decode_data_uri("data:text/plain,hello"), None);
        assert_eq!(decode_data_uri("data:image/png;base64,!!!"), None);
        assert_eq!(decode_data_uri("diagrams/a.png"), None);
    }

    #[test]
    fn test_svg_data_uri_strips_container() {
        let uri = svg_data_uri("<div class=\"mermaid-diagram\"><svg><g/></svg></div>").unwrap();
        assert_eq!(decode_data_uri(&uri), Some(b"<svg><g/></svg>".to_vec()));
        assert_eq!(svg_data_uri("<div>pas de schéma</div>"), None);
    }

    #[test]
    fn test_fs_source_reads_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("diagrams")).unwrap();
        std::fs::write(dir.path().join("diagrams/a.png"), b"png").unwrap();

        let source = FsImageSource::new(dir.path());
        assert_eq!(source.load("diagrams/a.png"), Some(b"png".to_vec()));
        assert_eq!(source.load("diagrams/missing.png"), None);
        assert_eq!(source.load("https://example.com/a.png"), None);
    }
}
