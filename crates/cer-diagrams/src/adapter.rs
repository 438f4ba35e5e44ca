//! Diagram substitution pass over document text.
//!
//! [`DiagramAdapter::process`] extracts every diagram block, renders them
//! in parallel, then rebuilds the text once from the recorded spans. Each
//! diagram succeeds or fails on its own: a failure is replaced by a
//! warning callout and the rest of the document is unaffected.

use std::fs;
use std::ops::Range;
use std::path::PathBuf;

use rayon::prelude::*;

use crate::cache::{CacheBucket, DiagramKey, NullCache};
use crate::consts::DEFAULT_DIAGRAMS_DIR;
use crate::dialect::{DiagramFormat, Dialect};
use crate::embed::{failure_callout, inline_svg, raster_embed, vector_embed};
use crate::extract::{DiagramBlock, extract_all};
use crate::naming::{diagram_file_name, unix_millis};
use crate::png::png_dimensions;
use crate::renderer::{DiagramError, DiagramErrorKind, DiagramRenderer, DiagramRequest};

/// Rendered form of one diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactRef {
    /// PNG written to disk.
    Raster {
        /// Absolute or working-directory-relative file path.
        path: PathBuf,
        /// Link used in the document (`diagrams/<file>`).
        link: String,
        width: u32,
        height: u32,
    },
    /// SVG markup ready for inline embedding.
    Vector { markup: String },
}

/// A successfully rendered diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramArtifact {
    pub dialect: Dialect,
    pub index: usize,
    pub artifact: ArtifactRef,
}

/// A diagram that could not be rendered.
#[derive(Debug)]
pub struct DiagramFailure {
    pub dialect: Dialect,
    pub error: DiagramError,
}

/// Outcome of a substitution pass.
#[derive(Debug, Default)]
pub struct DiagramPass {
    /// Document text with every diagram block replaced.
    pub text: String,
    pub artifacts: Vec<DiagramArtifact>,
    pub failures: Vec<DiagramFailure>,
}

/// Renders diagram blocks and splices the results back into the text.
///
/// # Example
///
/// ```ignore
/// use cer_diagrams::{DiagramAdapter, KrokiRenderer};
///
/// let adapter = DiagramAdapter::new(KrokiRenderer::new("https://kroki.io"))
///     .diagrams_dir("out/diagrams");
/// let pass = adapter.process(&markdown);
/// ```
pub struct DiagramAdapter {
    renderer: Box<dyn DiagramRenderer>,
    diagrams_dir: PathBuf,
    link_prefix: String,
    cache: Box<dyn CacheBucket>,
    timestamp: Option<u128>,
}

impl DiagramAdapter {
    /// Create an adapter that renders with `renderer`.
    ///
    /// Raster files go to `./diagrams` and are linked as `diagrams/<file>`.
    #[must_use]
    pub fn new(renderer: impl DiagramRenderer + 'static) -> Self {
        Self {
            renderer: Box::new(renderer),
            diagrams_dir: PathBuf::from(DEFAULT_DIAGRAMS_DIR),
            link_prefix: DEFAULT_DIAGRAMS_DIR.to_owned(),
            cache: Box::new(NullCache),
            timestamp: None,
        }
    }

    /// Set the directory raster diagrams are written to.
    #[must_use]
    pub fn diagrams_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diagrams_dir = dir.into();
        self
    }

    /// Set the path prefix used when linking raster diagrams.
    #[must_use]
    pub fn link_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.link_prefix = prefix.into().trim_end_matches('/').to_owned();
        self
    }

    /// Set the cache consulted before each render.
    #[must_use]
    pub fn with_cache(mut self, cache: Box<dyn CacheBucket>) -> Self {
        self.cache = cache;
        self
    }

    /// Use a fixed timestamp in generated file names instead of the clock.
    #[must_use]
    pub fn timestamp(mut self, millis: u128) -> Self {
        self.timestamp = Some(millis);
        self
    }

    /// Replace every diagram block in `text`.
    pub fn process(&self, text: &str) -> DiagramPass {
        self.render_blocks(text, extract_all(text, &Dialect::ALL))
    }

    /// Render already extracted `blocks` and splice the results into `text`.
    ///
    /// `blocks` must come from extracting `text` itself, so their spans
    /// point at the right bytes.
    pub fn render_blocks(&self, text: &str, blocks: Vec<DiagramBlock>) -> DiagramPass {
        if blocks.is_empty() {
            return DiagramPass {
                text: text.to_owned(),
                ..DiagramPass::default()
            };
        }

        let millis = self.timestamp.unwrap_or_else(unix_millis);
        let dir_error = self.prepare_diagrams_dir(&blocks);

        tracing::info!(count = blocks.len(), "Rendering diagrams");
        let results: Vec<Result<ArtifactRef, DiagramError>> = blocks
            .par_iter()
            .map(|block| match (&dir_error, block.dialect.format()) {
                (Some(message), DiagramFormat::Png) => Err(DiagramError::new(
                    block.index,
                    DiagramErrorKind::Io(message.clone()),
                )),
                _ => self.render_block(block, millis),
            })
            .collect();

        let mut replacements = Replacements::with_capacity(blocks.len());
        let mut artifacts = Vec::new();
        let mut failures = Vec::new();

        for (block, result) in blocks.into_iter().zip(results) {
            match result {
                Ok(artifact) => {
                    let markdown = match &artifact {
                        ArtifactRef::Raster { link, .. } => raster_embed(link),
                        ArtifactRef::Vector { markup } => vector_embed(markup),
                    };
                    replacements.add(block.span, markdown);
                    artifacts.push(DiagramArtifact {
                        dialect: block.dialect,
                        index: block.index,
                        artifact,
                    });
                }
                Err(error) => {
                    tracing::warn!(
                        dialect = %block.dialect,
                        index = block.index,
                        error = %error.kind,
                        "Diagram rendering failed"
                    );
                    let message = error.kind.to_string();
                    replacements.add(
                        block.span.clone(),
                        failure_callout(block.dialect, block.index, &message, block.code()),
                    );
                    failures.push(DiagramFailure {
                        dialect: block.dialect,
                        error,
                    });
                }
            }
        }

        DiagramPass {
            text: replacements.apply(text),
            artifacts,
            failures,
        }
    }

    /// Create the diagrams directory if any raster block needs it.
    ///
    /// Returns the error message to attach to every raster block on failure.
    fn prepare_diagrams_dir(&self, blocks: &[DiagramBlock]) -> Option<String> {
        if !blocks
            .iter()
            .any(|b| b.dialect.format() == DiagramFormat::Png)
        {
            return None;
        }
        fs::create_dir_all(&self.diagrams_dir).err().map(|e| {
            tracing::warn!(
                path = %self.diagrams_dir.display(),
                error = %e,
                "Cannot create diagrams directory"
            );
            format!("cannot create {}: {e}", self.diagrams_dir.display())
        })
    }

    /// Render one block into an artifact.
    pub fn render_block(
        &self,
        block: &DiagramBlock,
        millis: u128,
    ) -> Result<ArtifactRef, DiagramError> {
        let request = DiagramRequest::new(block.index, block.dialect, block.code());
        let hash = DiagramKey {
            source: &request.source,
            endpoint: request.dialect.kroki_endpoint(),
            format: request.format.as_str(),
        }
        .compute_hash();

        let cached = self.cache.get(&hash);
        let from_cache = cached.is_some();
        let data = match cached {
            Some(data) => data,
            None => self.renderer.render(&request)?,
        };

        let artifact = match request.format {
            DiagramFormat::Svg => {
                let svg = String::from_utf8(data).map_err(|e| {
                    DiagramError::new(
                        block.index,
                        DiagramErrorKind::Io(format!("invalid UTF-8 in SVG: {e}")),
                    )
                })?;
                if !from_cache {
                    self.cache.set(&hash, svg.as_bytes());
                }
                ArtifactRef::Vector {
                    markup: inline_svg(&svg),
                }
            }
            DiagramFormat::Png => {
                let (width, height) = png_dimensions(&data)
                    .ok_or(DiagramError::new(block.index, DiagramErrorKind::InvalidPng))?;
                if !from_cache {
                    self.cache.set(&hash, &data);
                }
                let file_name = diagram_file_name(block.index, millis);
                let path = self.diagrams_dir.join(&file_name);
                fs::write(&path, &data).map_err(|e| {
                    DiagramError::new(block.index, DiagramErrorKind::Io(e.to_string()))
                })?;
                ArtifactRef::Raster {
                    path,
                    link: format!("{}/{file_name}", self.link_prefix),
                    width,
                    height,
                }
            }
        };

        Ok(artifact)
    }
}

/// Collects span replacements for single-pass application.
///
/// Spans come from one extraction over the original text, so they are
/// applied against that text in order and never shift each other.
struct Replacements {
    items: Vec<(Range<usize>, String)>,
}

impl Replacements {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    fn add(&mut self, span: Range<usize>, content: String) {
        self.items.push((span, content));
    }

    fn apply(mut self, text: &str) -> String {
        self.items.sort_by_key(|(span, _)| span.start);

        let mut result = String::with_capacity(text.len());
        let mut last = 0;
        for (span, content) in &self.items {
            if span.start < last {
                continue;
            }
            result.push_str(&text[last..span.start]);
            result.push_str(content);
            last = span.end;
        }
        result.push_str(&text[last..]);
        result
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cache::FileCache;
    use crate::extract::extract;
    use crate::png::fake_png;

    /// Renders SVG for mermaid and a 40x20 PNG for nomnoml; fails on "FAIL".
    struct FakeRenderer {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeRenderer {
        fn new() -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl DiagramRenderer for FakeRenderer {
        fn render(&self, request: &DiagramRequest) -> Result<Vec<u8>, DiagramError> {
            self.calls.lock().unwrap().push(request.source.clone());
            if request.source.contains("FAIL") {
                return Err(DiagramError::new(
                    request.index,
                    DiagramErrorKind::Render("Parse error on line 1".to_owned()),
                ));
            }
            Ok(match request.format {
                DiagramFormat::Svg => format!("<svg>\n<text>{}</text>\n</svg>", request.index)
                    .into_bytes(),
                DiagramFormat::Png => fake_png(40, 20),
            })
        }
    }

    fn adapter(dir: &Path) -> DiagramAdapter {
        DiagramAdapter::new(FakeRenderer::new())
            .diagrams_dir(dir.join("diagrams"))
            .timestamp(1234)
    }

    #[test]
    fn test_no_diagrams_returns_text_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let pass = adapter(dir.path()).process("## Intro\nHello");
        assert_eq!(pass.text, "## Intro\nHello");
        assert!(pass.artifacts.is_empty());
        assert!(!dir.path().join("diagrams").exists());
    }

    #[test]
    fn test_mermaid_becomes_inline_svg() {
        let dir = tempfile::tempdir().unwrap();
        let pass = adapter(dir.path()).process("Avant\n```mermaid\ngraph TD\n```\nAprès");
        assert_eq!(
            pass.text,
            "Avant\n\n\n<div class=\"mermaid-diagram\"><svg> <text>0</text> </svg></div>\n\n\nAprès"
        );
        assert_eq!(pass.artifacts.len(), 1);
    }

    #[test]
    fn test_nomnoml_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let pass = adapter(dir.path()).process("```nomnoml\n[A] -> [B]\n```");

        assert_eq!(pass.text, "\n![Schéma](diagrams/diagram_0_1234.png)\n");
        let ArtifactRef::Raster {
            path,
            width,
            height,
            ..
        } = &pass.artifacts[0].artifact
        else {
            panic!("expected raster artifact");
        };
        assert_eq!((*width, *height), (40, 20));
        assert!(path.exists());
    }

    #[test]
    fn test_existing_diagrams_dir_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("diagrams")).unwrap();
        let pass = adapter(dir.path()).process("```nomnoml\n[A]\n```");
        assert!(pass.failures.is_empty());
    }

    #[test]
    fn test_failure_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let text = "```mermaid\ngraph TD\n```\n```mermaid\nFAIL here\n```\n```nomnoml\n[A]\n```";
        let pass = adapter(dir.path()).process(text);

        assert_eq!(pass.artifacts.len(), 2);
        assert_eq!(pass.failures.len(), 1);
        assert_eq!(pass.failures[0].error.index, 1);
        assert!(pass.text.contains("**Schéma 2 non-généré**"));
        assert!(pass.text.contains("> Erreur: Parse error on line 1"));
        assert!(pass.text.contains("```text\nFAIL here\n```"));
    }

    #[test]
    fn test_all_blocks_substituted() {
        let dir = tempfile::tempdir().unwrap();
        let mut text = String::new();
        for i in 0..6 {
            let body = if i % 3 == 0 { "FAIL" } else { "graph LR" };
            text.push_str(&format!("Texte {i}\n```mermaid\n{body}\n```\n```nomnoml\n[N{i}]\n```\n"));
        }
        assert_eq!(extract(&text, Dialect::Mermaid).len(), 6);

        let pass = adapter(dir.path()).process(&text);

        assert_eq!(pass.artifacts.len() + pass.failures.len(), 12);
        assert!(extract(&pass.text, Dialect::Mermaid).is_empty());
        assert!(extract(&pass.text, Dialect::Nomnoml).is_empty());
        for i in 0..6 {
            assert!(pass.text.contains(&format!("Texte {i}\n")));
        }
    }

    #[test]
    fn test_unwritable_diagrams_dir_fails_raster_only() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file").unwrap();
        let adapter = DiagramAdapter::new(FakeRenderer::new())
            .diagrams_dir(blocker.join("diagrams"))
            .timestamp(1);

        let pass = adapter.process("```nomnoml\n[A]\n```\n```mermaid\ngraph TD\n```");

        assert_eq!(pass.failures.len(), 1);
        assert_eq!(pass.failures[0].dialect, Dialect::Nomnoml);
        assert!(matches!(pass.failures[0].error.kind, DiagramErrorKind::Io(_)));
        assert!(pass.text.contains("Erreur de génération"));
        assert!(pass.text.contains("mermaid-diagram"));
    }

    #[test]
    fn test_cache_hit_skips_renderer() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("cache");
        let text = "```mermaid\ngraph TD\n```";

        let first_pass = adapter(dir.path())
            .with_cache(Box::new(FileCache::new(&cache_dir)))
            .process(text);

        let renderer = FakeRenderer::new();
        let calls = Arc::clone(&renderer.calls);
        let second_pass = DiagramAdapter::new(renderer)
            .with_cache(Box::new(FileCache::new(&cache_dir)))
            .process(text);

        assert_eq!(first_pass.text, second_pass.text);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_replacements_apply_in_order() {
        let mut replacements = Replacements::with_capacity(2);
        replacements.add(6..9, "X".to_owned());
        replacements.add(0..1, "Y".to_owned());
        assert_eq!(replacements.apply("abcdefghij"), "YbcdefXj");
    }
}
