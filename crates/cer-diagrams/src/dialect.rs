//! Supported diagram dialects.
//!
//! Reports embed two diagram languages: Mermaid flowcharts, which are
//! inlined as SVG, and nomnoml UML-style diagrams, which are saved as PNG
//! files next to the document.

use std::fmt;

/// Supported diagram dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Mermaid,
    Nomnoml,
}

impl Dialect {
    /// All dialects, in the order they are processed.
    pub const ALL: [Self; 2] = [Self::Mermaid, Self::Nomnoml];

    /// Parse a dialect from a code fence tag.
    ///
    /// Only the bare tags match, the same ones [`extract`](crate::extract)
    /// looks for, so a fence is either a diagram everywhere or code everywhere.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mermaid" => Some(Self::Mermaid),
            "nomnoml" => Some(Self::Nomnoml),
            _ => None,
        }
    }

    /// Tag used on the opening fence.
    #[must_use]
    pub fn fence_tag(self) -> &'static str {
        match self {
            Self::Mermaid => "mermaid",
            Self::Nomnoml => "nomnoml",
        }
    }

    /// Kroki endpoint name for this dialect.
    #[must_use]
    pub fn kroki_endpoint(self) -> &'static str {
        self.fence_tag()
    }

    /// Output format this dialect renders to.
    #[must_use]
    pub fn format(self) -> DiagramFormat {
        match self {
            Self::Mermaid => DiagramFormat::Svg,
            Self::Nomnoml => DiagramFormat::Png,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.fence_tag())
    }
}

/// Output format for rendered diagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramFormat {
    /// Vector markup spliced inline into the document.
    Svg,
    /// Raster image saved to the diagrams directory.
    Png,
}

impl DiagramFormat {
    /// Return format as string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Dialect::parse("mermaid"), Some(Dialect::Mermaid));
        assert_eq!(Dialect::parse("nomnoml"), Some(Dialect::Nomnoml));
        assert_eq!(Dialect::parse("plantuml"), None);
        assert_eq!(Dialect::parse(""), None);
    }

    #[test]
    fn test_parse_agrees_with_extract() {
        for tag in ["mermaid", "nomnoml", "kroki-mermaid", "kroki-nomnoml", "mermaidjs"] {
            let text = format!("```{tag}\nA\n```");
            let extracted = !crate::extract::extract_all(&text, &Dialect::ALL).is_empty();
            assert_eq!(Dialect::parse(tag).is_some(), extracted, "tag {tag}");
        }
    }

    #[test]
    fn test_formats() {
        assert_eq!(Dialect::Mermaid.format(), DiagramFormat::Svg);
        assert_eq!(Dialect::Nomnoml.format(), DiagramFormat::Png);
        assert_eq!(DiagramFormat::Png.as_str(), "png");
    }

    #[test]
    fn test_display_matches_fence_tag() {
        for dialect in Dialect::ALL {
            assert_eq!(dialect.to_string(), dialect.fence_tag());
        }
    }
}
