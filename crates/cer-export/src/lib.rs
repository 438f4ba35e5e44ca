//! Export orchestration for CER reports.
//!
//! An export runs as one sequential pipeline over an [`ExportSession`]:
//!
//! 1. Locate diagram blocks in the raw text
//! 2. Render them (in parallel) and splice the results back
//! 3. Parse the substituted text once into the document model
//! 4. Project it into each requested format
//! 5. Write the artifacts, PDF last; PDFs go through a [`PrintSurface`]
//!
//! Diagram failures are isolated and reported in the [`ExportReport`];
//! only a failing artifact write aborts the export.
//!
//! The crate also holds the generation boundary used to produce report
//! text in the first place: [`build_prompt`] and [`GenerationClient`].
//!
//! # Example
//!
//! ```no_run
//! use cer_export::{
//!     CancellationToken, DetectingSurface, ExportFormat, ExportOptions, ExportSession, Exporter,
//! };
//! use cer_render::PrintOptions;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ExportOptions {
//!     output_dir: "output".into(),
//!     basename: "cer".to_owned(),
//!     formats: ExportFormat::ALL.to_vec(),
//!     print: PrintOptions::default(),
//! };
//! let exporter = Exporter::new(options).with_print_surface(DetectingSurface::default());
//! let report = exporter.export(ExportSession::new("## Introduction\nTexte"), &CancellationToken::new())?;
//! println!("{} files written", report.outputs.len());
//! # Ok(())
//! # }
//! ```

mod cancel;
mod code_images;
mod error;
mod exporter;
mod generation;
mod images;
mod print;
mod prompt;
mod session;

pub use cancel::CancellationToken;
pub use code_images::embed_code_images;
pub use error::ExportError;
pub use exporter::{ExportFormat, ExportOptions, ExportReport, Exporter};
pub use generation::{GeminiClient, GenerationClient, GenerationError};
pub use images::ImageStore;
pub use print::{ChromiumSurface, DEFAULT_SETTLE, DetectingSurface, PrintError, PrintSurface};
pub use prompt::{AuthorInfo, build_prompt, format_date};
pub use session::{ExportSession, ExtractedSession, ParsedSession, RenderedSession};
