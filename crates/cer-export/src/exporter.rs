//! Export pipeline: extraction, diagram rendering, projection and sinks.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use cer_config::Config;
use cer_diagrams::{DiagramAdapter, DiagramFailure};
use cer_render::{
    FsImageSource, PrintOptions, WordDocument, build_word_document, render_print_html,
    write_flat_opc,
};

use crate::cancel::CancellationToken;
use crate::error::ExportError;
use crate::print::{PrintError, PrintSurface};
use crate::session::{ExportSession, ParsedSession};

/// Output artifact kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Paginated PDF captured from the print HTML.
    Pdf,
    /// WordprocessingML package in single-file (Flat OPC) form.
    Docx,
    /// The print HTML itself.
    Html,
}

impl ExportFormat {
    pub const ALL: [Self; 3] = [Self::Pdf, Self::Docx, Self::Html];

    /// Whether producing this artifact needs a [`PrintSurface`].
    pub fn needs_browser(self) -> bool {
        self == Self::Pdf
    }

    /// File extension of the artifact.
    ///
    /// The word package is a single XML file, which word processors open
    /// directly; it is not a zipped `.docx` container.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "xml",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Html => "html",
        })
    }
}

/// Where and what to export.
#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    /// File name without extension, shared by every artifact.
    pub basename: String,
    pub formats: Vec<ExportFormat>,
    pub print: PrintOptions,
}

impl ExportOptions {
    /// Options from the `[output]` and `[print]` settings, PDF only.
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_dir: config.output_resolved.dir.clone(),
            basename: config.output_resolved.basename.clone(),
            formats: vec![ExportFormat::Pdf],
            print: PrintOptions::default().with_header_text(config.print.header_text.clone()),
        }
    }

    /// Replace the formats to produce.
    #[must_use]
    pub fn formats(mut self, formats: impl IntoIterator<Item = ExportFormat>) -> Self {
        self.formats = formats.into_iter().collect();
        self
    }

    /// Path of the artifact for `format`.
    pub fn artifact_path(&self, format: ExportFormat) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.basename, format.extension()))
    }
}

/// Outcome of a completed export.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Written artifacts, browser-free ones first.
    pub outputs: Vec<(ExportFormat, PathBuf)>,
    /// Number of diagrams rendered successfully.
    pub diagrams_rendered: usize,
    /// Diagrams replaced by a warning callout.
    pub failures: Vec<DiagramFailure>,
}

impl ExportReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// One line per failed diagram, for display.
    pub fn failure_lines(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|f| format!("{} {}", f.dialect, f.error))
            .collect()
    }
}

/// Projected document waiting to be written.
enum Projection {
    Html(String),
    Pdf(String),
    Word(WordDocument),
}

/// Runs one export from raw text to written artifacts.
///
/// Cancellation is checked before extraction, before diagram rendering,
/// before projection and before writing. Only a failing sink aborts the
/// export; diagram failures are collected in the [`ExportReport`].
///
/// HTML and word artifacts are written before the PDF, so a missing or
/// failing browser never costs the artifacts that do not need one.
pub struct Exporter {
    options: ExportOptions,
    diagrams: Option<DiagramAdapter>,
    surface: Option<Box<dyn PrintSurface>>,
}

impl Exporter {
    /// Create an exporter that leaves diagram fences unrendered.
    pub fn new(options: ExportOptions) -> Self {
        Self {
            options,
            diagrams: None,
            surface: None,
        }
    }

    /// Render diagrams with `adapter`.
    #[must_use]
    pub fn with_diagrams(mut self, adapter: DiagramAdapter) -> Self {
        self.diagrams = Some(adapter);
        self
    }

    /// Print PDFs through `surface`.
    #[must_use]
    pub fn with_print_surface(mut self, surface: impl PrintSurface + 'static) -> Self {
        self.surface = Some(Box::new(surface));
        self
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Run the pipeline for `session`.
    pub fn export(
        &self,
        session: ExportSession,
        token: &CancellationToken,
    ) -> Result<ExportReport, ExportError> {
        checkpoint(token, "extraction")?;
        let extracted = session.extract();

        checkpoint(token, "diagram rendering")?;
        let rendered = extracted.render(self.diagrams.as_ref());

        checkpoint(token, "projection")?;
        let parsed = rendered.parse();
        let mut projections = self.project(&parsed);
        projections.sort_by_key(|(format, _)| format.needs_browser());

        checkpoint(token, "writing")?;
        fs::create_dir_all(&self.options.output_dir)
            .map_err(|e| ExportError::write(&self.options.output_dir, e))?;

        let mut outputs = Vec::with_capacity(projections.len());
        for (format, projection) in projections {
            let path = self.options.artifact_path(format);
            self.write(&path, &projection)?;
            tracing::info!(format = %format, path = %path.display(), "Wrote artifact");
            outputs.push((format, path));
        }

        let pass = parsed.into_diagrams();
        Ok(ExportReport {
            outputs,
            diagrams_rendered: pass.artifacts.len(),
            failures: pass.failures,
        })
    }

    fn project(&self, parsed: &ParsedSession) -> Vec<(ExportFormat, Projection)> {
        let document = parsed.document();
        self.options
            .formats
            .iter()
            .map(|&format| {
                let projection = match format {
                    ExportFormat::Html => {
                        Projection::Html(render_print_html(document, &self.options.print))
                    }
                    ExportFormat::Pdf => {
                        Projection::Pdf(render_print_html(document, &self.pdf_print_options()))
                    }
                    ExportFormat::Docx => Projection::Word(build_word_document(document)),
                };
                (format, projection)
            })
            .collect()
    }

    /// Print options for the PDF page, which is loaded from outside the
    /// output directory and needs a base URL for relative image links.
    fn pdf_print_options(&self) -> PrintOptions {
        match std::path::absolute(&self.options.output_dir) {
            Ok(dir) => self
                .options
                .print
                .clone()
                .with_base_href(format!("file://{}/", dir.display())),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot resolve output directory for PDF images");
                self.options.print.clone()
            }
        }
    }

    fn write(&self, path: &Path, projection: &Projection) -> Result<(), ExportError> {
        match projection {
            Projection::Html(html) => {
                fs::write(path, html).map_err(|e| ExportError::write(path, e))
            }
            Projection::Pdf(html) => {
                let surface = self.surface.as_ref().ok_or(PrintError::BrowserNotFound)?;
                surface.print_to_pdf(html, path)?;
                Ok(())
            }
            Projection::Word(doc) => {
                let file = File::create(path).map_err(|e| ExportError::write(path, e))?;
                let mut writer = BufWriter::new(file);
                let images = FsImageSource::new(&self.options.output_dir);
                write_flat_opc(doc, &images, &mut writer).map_err(|source| {
                    ExportError::Render {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                writer.flush().map_err(|e| ExportError::write(path, e))
            }
        }
    }
}

fn checkpoint(token: &CancellationToken, stage: &str) -> Result<(), ExportError> {
    if token.is_cancelled() {
        tracing::info!(stage, "Export cancelled");
        return Err(ExportError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use cer_diagrams::{
        DiagramError, DiagramErrorKind, DiagramFormat, DiagramRenderer, DiagramRequest,
    };
    use pretty_assertions::assert_eq;

    use super::*;

    const REPORT: &str = "DUPONT Marie\nA3 FISA Info\n\n## Introduction\n\nLe **contexte**.\n\n\
        ```mermaid\ngraph TD\n  A --> B\n```\n\n```mermaid\nFAIL\n```\n\n## Bilan\n\n- point\n";

    struct SvgRenderer;

    impl DiagramRenderer for SvgRenderer {
        fn render(&self, request: &DiagramRequest) -> Result<Vec<u8>, DiagramError> {
            if request.source.contains("FAIL") {
                return Err(DiagramError::new(
                    request.index,
                    DiagramErrorKind::Render("syntax error".to_owned()),
                ));
            }
            assert_eq!(request.format, DiagramFormat::Svg);
            Ok(b"<svg><g/></svg>".to_vec())
        }
    }

    /// Records the HTML it was asked to print and writes a stub PDF.
    #[derive(Clone, Default)]
    struct FakeSurface {
        printed: Rc<RefCell<Vec<String>>>,
    }

    impl PrintSurface for FakeSurface {
        fn print_to_pdf(&self, html: &str, output: &Path) -> Result<(), PrintError> {
            self.printed.borrow_mut().push(html.to_owned());
            fs::write(output, b"%PDF-1.4")?;
            Ok(())
        }
    }

    /// Fails every print, like a browser that crashes.
    struct FailingSurface;

    impl PrintSurface for FailingSurface {
        fn print_to_pdf(&self, _html: &str, _output: &Path) -> Result<(), PrintError> {
            Err(PrintError::Failed {
                status: "exit status: 1".to_owned(),
                stderr: "crashed".to_owned(),
            })
        }
    }

    fn options(dir: &Path, formats: &[ExportFormat]) -> ExportOptions {
        ExportOptions {
            output_dir: dir.join("out"),
            basename: "cer".to_owned(),
            formats: formats.to_vec(),
            print: PrintOptions::default(),
        }
    }

    fn adapter(dir: &Path) -> DiagramAdapter {
        DiagramAdapter::new(SvgRenderer)
            .diagrams_dir(dir.join("out/diagrams"))
            .timestamp(1)
    }

    #[test]
    fn test_export_all_formats() {
        let dir = tempfile::tempdir().unwrap();
        let surface = FakeSurface::default();
        let exporter = Exporter::new(options(dir.path(), &ExportFormat::ALL))
            .with_diagrams(adapter(dir.path()))
            .with_print_surface(surface.clone());

        let report = exporter
            .export(ExportSession::new(REPORT), &CancellationToken::new())
            .unwrap();

        let names: Vec<_> = report
            .outputs
            .iter()
            .map(|(_, p)| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["cer.xml", "cer.html", "cer.pdf"]);
        for (_, path) in &report.outputs {
            assert!(path.exists(), "missing {}", path.display());
        }

        assert_eq!(report.diagrams_rendered, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failure_lines(), vec!["mermaid diagram 1: syntax error"]);

        let html = fs::read_to_string(dir.path().join("out/cer.html")).unwrap();
        assert!(html.contains("<svg><g/></svg>"));
        assert!(html.contains("Schéma 2 non-généré"));
        assert!(!html.contains("<base href"));

        let printed = surface.printed.borrow();
        assert_eq!(printed.len(), 1);
        assert!(printed[0].contains("<base href=\"file://"));

        let word = fs::read_to_string(dir.path().join("out/cer.xml")).unwrap();
        assert!(word.contains("pkg:package"));
        assert!(word.contains("Bilan"));
    }

    #[test]
    fn test_export_without_diagrams_keeps_pending_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(options(dir.path(), &[ExportFormat::Html]));

        let report = exporter
            .export(ExportSession::new(REPORT), &CancellationToken::new())
            .unwrap();

        assert_eq!(report.diagrams_rendered, 0);
        assert!(!report.has_failures());
        let html = fs::read_to_string(&report.outputs[0].1).unwrap();
        assert!(html.contains("<div class=\"mermaid\">"));
        assert!(!dir.path().join("out/diagrams").exists());
    }

    #[test]
    fn test_cancelled_before_start_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(options(dir.path(), &[ExportFormat::Html]));
        let token = CancellationToken::new();
        token.cancel();

        let err = exporter
            .export(ExportSession::new(REPORT), &token)
            .unwrap_err();

        assert!(matches!(err, ExportError::Cancelled));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_pdf_without_surface_fails() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(options(dir.path(), &[ExportFormat::Pdf]));

        let err = exporter
            .export(ExportSession::new(REPORT), &CancellationToken::new())
            .unwrap_err();

        assert!(matches!(err, ExportError::Print(PrintError::BrowserNotFound)));
    }

    #[test]
    fn test_failing_print_keeps_browser_free_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let exporter =
            Exporter::new(options(dir.path(), &ExportFormat::ALL)).with_print_surface(FailingSurface);

        let err = exporter
            .export(ExportSession::new(REPORT), &CancellationToken::new())
            .unwrap_err();

        assert!(matches!(err, ExportError::Print(PrintError::Failed { .. })));
        assert!(dir.path().join("out/cer.html").exists());
        assert!(dir.path().join("out/cer.xml").exists());
        assert!(!dir.path().join("out/cer.pdf").exists());
    }

    #[test]
    fn test_missing_browser_keeps_browser_free_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let formats = [ExportFormat::Pdf, ExportFormat::Html];
        let exporter = Exporter::new(options(dir.path(), &formats));

        let err = exporter
            .export(ExportSession::new(REPORT), &CancellationToken::new())
            .unwrap_err();

        assert!(matches!(err, ExportError::Print(PrintError::BrowserNotFound)));
        assert!(dir.path().join("out/cer.html").exists());
    }

    #[test]
    fn test_unwritable_output_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("out"), b"file").unwrap();
        let exporter = Exporter::new(options(dir.path(), &[ExportFormat::Html]));

        let err = exporter
            .export(ExportSession::new(REPORT), &CancellationToken::new())
            .unwrap_err();

        let ExportError::Write { path, .. } = err else {
            panic!("expected write error, got {err:?}");
        };
        assert_eq!(path, dir.path().join("out"));
    }

    #[test]
    fn test_artifact_path() {
        let options = options(Path::new("/tmp"), &[]);
        assert_eq!(
            options.artifact_path(ExportFormat::Docx),
            PathBuf::from("/tmp/out/cer.xml")
        );
        assert_eq!(ExportFormat::Docx.to_string(), "docx");
    }
}
