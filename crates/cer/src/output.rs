//! Terminal reporting for the `cer` commands.
//!
//! Everything goes to stderr. Progress lines are plain, finished steps
//! are green, diagram failures are yellow and fatal errors red. Export
//! summaries are built as lines first so their layout can be checked
//! without a terminal.

use std::fmt::Display;
use std::path::Path;

use cer_export::{ExportFormat, ExportReport};
use console::{Style, Term};

/// Styles for each kind of line.
struct Palette {
    done: Style,
    warn: Style,
    fail: Style,
    label: Style,
}

impl Palette {
    fn colored() -> Self {
        Self {
            done: Style::new().green(),
            warn: Style::new().yellow(),
            fail: Style::new().red(),
            label: Style::new().cyan().bold(),
        }
    }

    #[cfg(test)]
    fn plain() -> Self {
        Self {
            done: Style::new(),
            warn: Style::new(),
            fail: Style::new(),
            label: Style::new(),
        }
    }
}

/// Progress and result reporter on stderr.
pub(crate) struct Output {
    term: Term,
    palette: Palette,
}

impl Output {
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            palette: Palette::colored(),
        }
    }

    /// Announce a step that may take a while.
    pub(crate) fn step(&self, msg: &str) {
        self.line(msg);
    }

    /// Report a finished step (green).
    pub(crate) fn done(&self, msg: &str) {
        self.line(&self.palette.done.apply_to(msg).to_string());
    }

    /// Report a file written by a command (green).
    pub(crate) fn written(&self, what: &str, path: &Path) {
        self.done(&format!("{what} written to {}", path.display()));
    }

    /// Summarize a finished export: artifacts, diagram count and failures.
    pub(crate) fn export_report(&self, report: &ExportReport) {
        for line in report_lines(&self.palette, report) {
            self.line(&line);
        }
    }

    /// Report the error that ended the command (red).
    pub(crate) fn error(&self, err: &dyn Display) {
        self.line(&self.palette.fail.apply_to(format!("Error: {err}")).to_string());
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }
}

fn report_lines(palette: &Palette, report: &ExportReport) -> Vec<String> {
    let mut lines = vec![String::new(), palette.done.apply_to("Export complete!").to_string()];
    lines.extend(
        report
            .outputs
            .iter()
            .map(|(format, path)| artifact_line(palette, *format, path)),
    );
    if report.diagrams_rendered > 0 {
        lines.push(format!("Diagrams rendered: {}", report.diagrams_rendered));
    }
    if report.has_failures() {
        lines.push(String::new());
        lines.push(
            palette
                .warn
                .apply_to(format!(
                    "Warning: {} diagram(s) could not be rendered and were left as source:",
                    report.failures.len()
                ))
                .to_string(),
        );
        lines.extend(report.failure_lines().iter().map(|l| format!("  - {l}")));
    }
    lines
}

/// `  -> docx: out/cer.xml`; the word package is named for what it is.
fn artifact_line(palette: &Palette, format: ExportFormat, path: &Path) -> String {
    let label = match format {
        ExportFormat::Docx => "docx (Flat OPC)".to_owned(),
        other => other.to_string(),
    };
    format!("  -> {}: {}", palette.label.apply_to(label), path.display())
}
