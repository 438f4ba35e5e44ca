//! `cer export` command implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cer_config::{CliSettings, Config};
use cer_diagrams::{DiagramAdapter, FileCache, KrokiRenderer};
use cer_export::{
    CancellationToken, ChromiumSurface, DetectingSurface, ExportFormat, ExportOptions,
    ExportSession, Exporter, ImageStore,
};
use clap::{Args, ValueEnum};

use crate::error::CliError;
use crate::output::Output;

/// Subdirectory of the output directory holding captured code images.
const CODE_IMAGES_DIR: &str = "images";

/// Output format selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum FormatArg {
    /// PDF printed by a headless Chromium-based browser.
    Pdf,
    /// Word package as a single Flat OPC file (`<name>.xml`), not a zipped `.docx`.
    Docx,
    /// Standalone print HTML.
    Html,
    /// Every format; HTML and Word are written before the PDF.
    All,
}

impl FormatArg {
    pub(crate) fn formats(self) -> Vec<ExportFormat> {
        match self {
            Self::Pdf => vec![ExportFormat::Pdf],
            Self::Docx => vec![ExportFormat::Docx],
            Self::Html => vec![ExportFormat::Html],
            Self::All => ExportFormat::ALL.to_vec(),
        }
    }
}

/// Arguments for the export command.
#[derive(Args)]
pub(crate) struct ExportArgs {
    /// Path to the report markdown file.
    input: PathBuf,

    /// Output format. `docx` writes a Flat OPC `.xml` file that Word opens directly.
    #[arg(short, long, value_enum, default_value_t = FormatArg::Pdf)]
    format: FormatArg,

    /// Output directory (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Kroki server URL for diagram rendering (overrides config).
    #[arg(long)]
    kroki_url: Option<String>,

    /// Leave diagram blocks unrendered.
    #[arg(long)]
    no_diagrams: bool,

    /// Do not use the rendered diagram cache.
    #[arg(long)]
    no_cache: bool,

    /// Browser executable used for PDF printing (overrides config).
    #[arg(long)]
    browser: Option<String>,

    /// Replace the N-th code block with a captured image.
    #[arg(long = "code-image", value_name = "INDEX=FILE", value_parser = parse_code_image)]
    code_images: Vec<(usize, PathBuf)>,

    /// Path to configuration file (default: auto-discover cer.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl ExportArgs {
    /// Execute the export command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, reading the input or writing an
    /// artifact fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            output_dir: self.output_dir,
            kroki_url: self.kroki_url,
            diagrams_enabled: self.no_diagrams.then_some(false),
            cache_enabled: self.no_cache.then_some(false),
            browser: self.browser,
            ..Default::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let markdown = std::fs::read_to_string(&self.input)?;
        output.step(&format!("Exporting {}...", self.input.display()));

        run_export(
            &config,
            markdown,
            &self.format.formats(),
            &self.code_images,
            &output,
        )
    }
}

/// Export `markdown` with the given configuration and report the result.
pub(crate) fn run_export(
    config: &Config,
    markdown: String,
    formats: &[ExportFormat],
    code_images: &[(usize, PathBuf)],
    output: &Output,
) -> Result<(), CliError> {
    let options = ExportOptions::from_config(config).formats(formats.iter().copied());
    let images = store_code_images(&options.output_dir, code_images)?;

    let mut exporter = Exporter::new(options);
    if config.diagrams.enabled {
        exporter = exporter.with_diagrams(diagram_adapter(config));
    }
    if formats.iter().any(|f| f.needs_browser()) {
        let settle = Duration::from_millis(config.print.settle_ms);
        exporter = match &config.print.browser {
            Some(browser) => {
                exporter.with_print_surface(ChromiumSurface::new(browser).settle(settle))
            }
            None => exporter.with_print_surface(DetectingSurface::default().settle(settle)),
        };
    }

    let session = ExportSession::new(markdown).with_code_images(&images);
    let report = exporter.export(session, &CancellationToken::new())?;
    output.export_report(&report);
    Ok(())
}

fn diagram_adapter(config: &Config) -> DiagramAdapter {
    let renderer = KrokiRenderer::new(&config.diagrams.kroki_url)
        .timeout(Duration::from_secs(config.diagrams.timeout_secs));
    let adapter = DiagramAdapter::new(renderer)
        .diagrams_dir(config.output_resolved.diagrams_path())
        .link_prefix(&config.output_resolved.diagrams_dir);
    if config.diagrams.cache_enabled {
        adapter.with_cache(Box::new(FileCache::new(config.cache_dir())))
    } else {
        adapter
    }
}

/// Copy captured images next to the output and map each code block
/// index to its relative link.
fn store_code_images(
    output_dir: &Path,
    code_images: &[(usize, PathBuf)],
) -> Result<HashMap<usize, String>, CliError> {
    let store = ImageStore::new(output_dir.join(CODE_IMAGES_DIR));
    let mut links = HashMap::with_capacity(code_images.len());
    for (index, path) in code_images {
        let bytes = std::fs::read(path)?;
        let saved = store.save(&format!("code_{index}"), &bytes)?;
        let file_name = saved
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        links.insert(*index, format!("{CODE_IMAGES_DIR}/{file_name}"));
    }
    Ok(links)
}

/// Parse `INDEX=FILE`.
fn parse_code_image(value: &str) -> Result<(usize, PathBuf), String> {
    let (index, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=FILE, got `{value}`"))?;
    let index = index
        .trim()
        .parse()
        .map_err(|_| format!("invalid code block index `{index}`"))?;
    if path.is_empty() {
        return Err("missing image file".to_owned());
    }
    Ok((index, PathBuf::from(path)))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_code_image() {
        assert_eq!(
            parse_code_image("2=captures/a.png"),
            Ok((2, PathBuf::from("captures/a.png")))
        );
        assert!(parse_code_image("a.png").is_err());
        assert!(parse_code_image("x=a.png").is_err());
        assert!(parse_code_image("1=").is_err());
    }

    #[test]
    fn test_format_all() {
        assert_eq!(FormatArg::All.formats(), ExportFormat::ALL.to_vec());
        assert_eq!(FormatArg::Docx.formats(), vec![ExportFormat::Docx]);
    }

    #[test]
    fn test_format_help_names_word_file() {
        let help = FormatArg::Docx
            .to_possible_value()
            .and_then(|v| v.get_help().map(ToString::to_string))
            .unwrap();
        assert!(help.contains("Flat OPC"));
        assert!(help.contains(".xml"));
        assert_eq!(ExportFormat::Docx.extension(), "xml");
    }

    #[test]
    fn test_broken_browser_keeps_html_and_word() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_toml(
            "[diagrams]\nenabled = false\n\n[print]\nbrowser = \"/nonexistent/chromium\"\n",
            dir.path(),
        )
        .unwrap();
        let options = ExportOptions::from_config(&config);

        let result = run_export(
            &config,
            "## Introduction\nTexte".to_owned(),
            &FormatArg::All.formats(),
            &[],
            &Output::new(),
        );

        assert!(matches!(result, Err(CliError::Export(_))));
        assert!(options.artifact_path(ExportFormat::Html).exists());
        assert!(options.artifact_path(ExportFormat::Docx).exists());
        assert!(!options.artifact_path(ExportFormat::Pdf).exists());
    }

    #[test]
    fn test_store_code_images() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("capture.png");
        std::fs::write(&capture, b"png").unwrap();

        let links = store_code_images(&dir.path().join("out"), &[(3, capture)]).unwrap();

        let link = &links[&3];
        assert!(link.starts_with("images/code_3_"));
        assert!(dir.path().join("out").join(link).exists());
    }
}
