//! `cer generate` command implementation.

use std::path::PathBuf;

use cer_config::{CliSettings, Config};
use cer_export::{AuthorInfo, GeminiClient, GenerationClient, build_prompt};
use clap::Args;

use super::export::{FormatArg, run_export};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the generate command.
#[derive(Args)]
pub(crate) struct GenerateArgs {
    /// Raw notes the report is written from.
    #[arg(long)]
    notes: PathBuf,

    /// Resource notes or links to study.
    #[arg(long)]
    resources: Option<PathBuf>,

    /// Markdown file to write (default: `<output_dir>/<basename>.md`).
    #[arg(long)]
    markdown: Option<PathBuf>,

    /// Export the generated report afterwards.
    #[arg(long)]
    export: bool,

    /// Output format when exporting.
    #[arg(short, long, value_enum, default_value_t = FormatArg::Pdf, requires = "export")]
    format: FormatArg,

    /// Output directory (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Generation API key (overrides config).
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Generation model (overrides config).
    #[arg(long)]
    model: Option<String>,

    /// Path to configuration file (default: auto-discover cer.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl GenerateArgs {
    /// Execute the generate command.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing, the service fails or a
    /// file cannot be read or written.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            output_dir: self.output_dir,
            api_key: self.api_key,
            model: self.model,
            ..Default::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let api_key = config.generation.require_api_key()?;

        let notes = std::fs::read_to_string(&self.notes)?;
        if notes.trim().is_empty() {
            return Err(CliError::Validation(format!(
                "{} is empty",
                self.notes.display()
            )));
        }
        let resources = self
            .resources
            .as_ref()
            .map(std::fs::read_to_string)
            .transpose()?;

        let author = AuthorInfo::from_config(&config.author);
        let prompt = build_prompt(&notes, resources.as_deref(), &author);

        output.step(&format!(
            "Generating report with {}...",
            config.generation.model
        ));
        let client = GeminiClient::new(&config.generation, api_key);
        let markdown = client.generate(&prompt)?;

        let target = self.markdown.unwrap_or_else(|| {
            config
                .output_resolved
                .dir
                .join(format!("{}.md", config.output_resolved.basename))
        });
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, &markdown)?;
        output.written("Report", &target);

        if self.export {
            output.step("\nExporting generated report...");
            run_export(&config, markdown, &self.format.formats(), &[], &output)?;
        }
        Ok(())
    }
}
