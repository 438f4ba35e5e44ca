//! Flat OPC serializer for [`WordDocument`].
//!
//! Writes a single-file WordprocessingML package (the `pkg:package` XML
//! form Word opens directly). Parts: package relationships, document,
//! styles, numbering, and one binary part per embedded picture.

use std::fmt::Write as _;
use std::io;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cer_diagrams::{Canvas, LARGE_CANVAS, is_svg, png_dimensions, rasterize_svg_within};
use quick_xml::escape::escape;

use super::media::ImageSource;
use super::{
    ParagraphStyle, SectionKind, TextRun, WordBlock, WordDocument, WordParagraph, WordRun,
    WordTable,
};

/// Error writing a word package.
#[derive(Debug, thiserror::Error)]
pub enum WordError {
    #[error("failed to write word document: {0}")]
    Io(#[from] io::Error),
}

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const NS_PKG_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_TYPE_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CT_RELS: &str = "application/vnd.openxmlformats-package.relationships+xml";
const CT_DOCUMENT: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
const CT_STYLES: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
const CT_NUMBERING: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml";

/// EMUs per pixel at 96 DPI.
const EMU_PER_PIXEL: u64 = 9525;
/// Widest picture that fits the A4 text column (16 cm).
const MAX_IMAGE_WIDTH_EMU: u64 = 5_760_000;

/// Spacing paragraph between sections.
const SECTION_BREAK_SPACING: u32 = 400;

const HEADER_FILL: &str = "2E3192";
const BAND_FILL: &str = "F2F2F2";
const BORDER_COLOR: &str = "BFBFBF";

/// Bullet glyphs cycled through the nine list levels.
const BULLETS: [&str; 3] = ["•", "◦", "▪"];

/// Picture collected while writing the document part.
struct MediaPart {
    rel_id: String,
    file_name: String,
    data: Vec<u8>,
}

/// Serialize `doc` as a Flat OPC package into `writer`.
///
/// Pictures are resolved through `images`. SVG pictures are rasterized
/// to PNG; a picture that cannot be loaded or drawn is replaced by its
/// alt text in italics.
pub fn write_flat_opc<W: io::Write>(
    doc: &WordDocument,
    images: &dyn ImageSource,
    mut writer: W,
) -> Result<(), WordError> {
    let xml = to_flat_opc(doc, images);
    writer.write_all(xml.as_bytes())?;
    writer.flush()?;
    Ok(())
}

fn to_flat_opc(doc: &WordDocument, images: &dyn ImageSource) -> String {
    let mut media = Vec::new();
    let body = document_body(doc, images, &mut media);

    let mut out = String::with_capacity(body.len() + 16 * 1024);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    out.push_str("<?mso-application progid=\"Word.Document\"?>\n");
    out.push_str(
        "<pkg:package xmlns:pkg=\"http://schemas.microsoft.com/office/2006/xmlPackage\">\n",
    );

    xml_part(
        &mut out,
        "/_rels/.rels",
        CT_RELS,
        &format!(
            "<Relationships xmlns=\"{NS_PKG_RELS}\"><Relationship Id=\"rId1\" Type=\"{REL_TYPE_BASE}/officeDocument\" Target=\"word/document.xml\"/></Relationships>"
        ),
    );
    xml_part(
        &mut out,
        "/word/_rels/document.xml.rels",
        CT_RELS,
        &document_rels(&media),
    );
    xml_part(
        &mut out,
        "/word/document.xml",
        CT_DOCUMENT,
        &format!(
            "<w:document xmlns:w=\"{NS_W}\" xmlns:r=\"{NS_R}\" xmlns:wp=\"{NS_WP}\" xmlns:a=\"{NS_A}\" xmlns:pic=\"{NS_PIC}\"><w:body>{body}<w:sectPr><w:pgSz w:w=\"11906\" w:h=\"16838\"/><w:pgMar w:top=\"1440\" w:right=\"1440\" w:bottom=\"1440\" w:left=\"1440\" w:header=\"708\" w:footer=\"708\" w:gutter=\"0\"/></w:sectPr></w:body></w:document>"
        ),
    );
    xml_part(&mut out, "/word/styles.xml", CT_STYLES, &styles());
    xml_part(&mut out, "/word/numbering.xml", CT_NUMBERING, &numbering());

    for part in &media {
        writeln!(
            out,
            "<pkg:part pkg:name=\"/word/media/{}\" pkg:contentType=\"image/png\" pkg:compression=\"store\"><pkg:binaryData>{}</pkg:binaryData></pkg:part>",
            part.file_name,
            STANDARD.encode(&part.data)
        )
        .unwrap();
    }

    out.push_str("</pkg:package>\n");
    out
}

fn xml_part(out: &mut String, name: &str, content_type: &str, xml: &str) {
    writeln!(
        out,
        "<pkg:part pkg:name=\"{name}\" pkg:contentType=\"{content_type}\"><pkg:xmlData>{xml}</pkg:xmlData></pkg:part>"
    )
    .unwrap();
}

fn document_rels(media: &[MediaPart]) -> String {
    let mut rels = format!(
        "<Relationships xmlns=\"{NS_PKG_RELS}\"><Relationship Id=\"rId1\" Type=\"{REL_TYPE_BASE}/styles\" Target=\"styles.xml\"/><Relationship Id=\"rId2\" Type=\"{REL_TYPE_BASE}/numbering\" Target=\"numbering.xml\"/>"
    );
    for part in media {
        write!(
            rels,
            "<Relationship Id=\"{}\" Type=\"{REL_TYPE_BASE}/image\" Target=\"media/{}\"/>",
            part.rel_id, part.file_name
        )
        .unwrap();
    }
    rels.push_str("</Relationships>");
    rels
}

fn document_body(
    doc: &WordDocument,
    images: &dyn ImageSource,
    media: &mut Vec<MediaPart>,
) -> String {
    let mut out = String::new();
    let mut writer = BodyWriter {
        out: &mut out,
        images,
        media,
    };

    let count = doc.sections.len();
    for (i, section) in doc.sections.iter().enumerate() {
        if let Some(title) = section.kind.title() {
            writer.paragraph(&WordParagraph {
                style: Some(ParagraphStyle::Heading1),
                runs: vec![WordRun::Text(TextRun::new(title))],
                ..WordParagraph::default()
            });
        }
        if section.kind == SectionKind::TableOfContents {
            writer.toc_field(doc);
        }
        for block in &section.content {
            match block {
                WordBlock::Paragraph(p) => writer.paragraph(p),
                WordBlock::Table(t) => writer.table(t),
                WordBlock::Rule => writer.rule(),
            }
        }
        if i + 1 < count {
            writer.section_break();
        }
    }
    out
}

struct BodyWriter<'a> {
    out: &'a mut String,
    images: &'a dyn ImageSource,
    media: &'a mut Vec<MediaPart>,
}

impl BodyWriter<'_> {
    fn paragraph(&mut self, p: &WordParagraph) {
        self.out.push_str("<w:p><w:pPr>");
        if let Some(style) = p.style {
            write!(self.out, "<w:pStyle w:val=\"{}\"/>", style.style_id()).unwrap();
        }
        if let Some(level) = p.bullet_level {
            write!(
                self.out,
                "<w:numPr><w:ilvl w:val=\"{}\"/><w:numId w:val=\"1\"/></w:numPr>",
                level.min(8)
            )
            .unwrap();
        }
        if let Some(after) = p.spacing_after {
            write!(self.out, "<w:spacing w:after=\"{after}\"/>").unwrap();
        }
        if p.centered {
            self.out.push_str("<w:jc w:val=\"center\"/>");
        }
        self.out.push_str("</w:pPr>");
        for run in &p.runs {
            match run {
                WordRun::Text(text) => self.text_run(text),
                WordRun::Break => self.out.push_str("<w:r><w:br/></w:r>"),
                WordRun::Image { src, alt } => self.picture(src, alt),
            }
        }
        self.out.push_str("</w:p>");
    }

    fn text_run(&mut self, run: &TextRun) {
        self.out.push_str("<w:r>");
        if run.bold || run.italic || run.size.is_some() {
            self.out.push_str("<w:rPr>");
            if run.bold {
                self.out.push_str("<w:b/>");
            }
            if run.italic {
                self.out.push_str("<w:i/>");
            }
            if let Some(size) = run.size {
                write!(self.out, "<w:sz w:val=\"{size}\"/>").unwrap();
            }
            self.out.push_str("</w:rPr>");
        }
        write!(
            self.out,
            "<w:t xml:space=\"preserve\">{}</w:t></w:r>",
            escape(run.text.as_str())
        )
        .unwrap();
    }

    fn picture(&mut self, src: &str, alt: &str) {
        let Some((data, width, height)) = self
            .images
            .load(src)
            .and_then(|data| as_png(data, src))
            .and_then(|data| png_dimensions(&data).map(|(w, h)| (data, w, h)))
        else {
            tracing::warn!(src = %truncate(src), "Image not embeddable, using alt text");
            self.text_run(&TextRun {
                text: format!("[{alt}]"),
                italic: true,
                ..TextRun::default()
            });
            return;
        };

        let number = self.media.len() + 1;
        let rel_id = format!("rIdImg{number}");
        let file_name = format!("image{number}.png");
        let (cx, cy) = extent_emu(width, height);

        write!(
            self.out,
            "<w:r><w:drawing><wp:inline distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\"><wp:extent cx=\"{cx}\" cy=\"{cy}\"/><wp:docPr id=\"{number}\" name=\"Picture {number}\" descr=\"{alt}\"/><a:graphic><a:graphicData uri=\"{NS_PIC}\"><pic:pic><pic:nvPicPr><pic:cNvPr id=\"{number}\" name=\"{file_name}\"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed=\"{rel_id}\"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm><a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>",
            alt = escape(alt),
        )
        .unwrap();

        self.media.push(MediaPart {
            rel_id,
            file_name,
            data,
        });
    }

    fn table(&mut self, table: &WordTable) {
        let columns = table.columns();
        // 9026 twips is the A4 text width with 1440 margins.
        let column_width = 9026 / columns;

        self.out.push_str("<w:tbl><w:tblPr><w:tblW w:w=\"5000\" w:type=\"pct\"/><w:tblBorders>");
        for edge in ["top", "left", "bottom", "right", "insideH", "insideV"] {
            write!(
                self.out,
                "<w:{edge} w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"{BORDER_COLOR}\"/>"
            )
            .unwrap();
        }
        self.out.push_str("</w:tblBorders></w:tblPr><w:tblGrid>");
        for _ in 0..columns {
            write!(self.out, "<w:gridCol w:w=\"{column_width}\"/>").unwrap();
        }
        self.out.push_str("</w:tblGrid>");

        self.out.push_str("<w:tr><w:trPr><w:tblHeader/></w:trPr>");
        for cell in &table.header {
            let run = TextRun {
                text: cell.clone(),
                bold: true,
                ..TextRun::default()
            };
            self.cell(std::slice::from_ref(&run), Some(HEADER_FILL), true);
        }
        if table.header.is_empty() {
            self.cell(&[], Some(HEADER_FILL), true);
        }
        self.out.push_str("</w:tr>");

        for (i, row) in table.rows.iter().enumerate() {
            let fill = (i % 2 == 1).then_some(BAND_FILL);
            self.out.push_str("<w:tr>");
            for cell in row {
                self.cell(cell, fill, false);
            }
            if row.is_empty() {
                self.cell(&[], fill, false);
            }
            self.out.push_str("</w:tr>");
        }
        self.out.push_str("</w:tbl>");
    }

    fn cell(&mut self, runs: &[TextRun], fill: Option<&str>, header: bool) {
        self.out.push_str("<w:tc><w:tcPr>");
        if let Some(fill) = fill {
            write!(self.out, "<w:shd w:val=\"clear\" w:color=\"auto\" w:fill=\"{fill}\"/>").unwrap();
        }
        self.out.push_str("</w:tcPr><w:p>");
        for run in runs {
            self.out.push_str("<w:r>");
            if run.bold || header {
                self.out.push_str("<w:rPr>");
                if run.bold {
                    self.out.push_str("<w:b/>");
                }
                if header {
                    self.out.push_str("<w:color w:val=\"FFFFFF\"/>");
                }
                self.out.push_str("</w:rPr>");
            }
            write!(
                self.out,
                "<w:t xml:space=\"preserve\">{}</w:t></w:r>",
                escape(run.text.as_str())
            )
            .unwrap();
        }
        self.out.push_str("</w:p></w:tc>");
    }

    /// Table of contents field, marked dirty so Word refreshes page numbers
    /// on open. The cached result lists the known entries.
    fn toc_field(&mut self, doc: &WordDocument) {
        self.out.push_str(
            "<w:p><w:r><w:fldChar w:fldCharType=\"begin\" w:dirty=\"true\"/></w:r><w:r><w:instrText xml:space=\"preserve\"> TOC \\o \"1-3\" \\h \\z \\u </w:instrText></w:r><w:r><w:fldChar w:fldCharType=\"separate\"/></w:r></w:p>",
        );
        for entry in &doc.toc {
            let indent = if entry.level == 1 { 0 } else { 440 };
            write!(
                self.out,
                "<w:p><w:pPr><w:ind w:left=\"{indent}\"/><w:spacing w:after=\"100\"/></w:pPr><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
                escape(entry.title.as_str())
            )
            .unwrap();
        }
        self.out.push_str("<w:p><w:r><w:fldChar w:fldCharType=\"end\"/></w:r></w:p>");
    }

    fn rule(&mut self) {
        write!(
            self.out,
            "<w:p><w:pPr><w:pBdr><w:bottom w:val=\"single\" w:sz=\"6\" w:space=\"1\" w:color=\"{BORDER_COLOR}\"/></w:pBdr></w:pPr></w:p>"
        )
        .unwrap();
    }

    fn section_break(&mut self) {
        write!(
            self.out,
            "<w:p><w:pPr><w:spacing w:after=\"{SECTION_BREAK_SPACING}\"/></w:pPr></w:p>"
        )
        .unwrap();
    }
}

/// Picture extent in EMUs, scaled down to the text column width.
/// Largest pixel size an SVG picture is drawn at before page scaling.
const SVG_BOUNDS: Canvas = LARGE_CANVAS;

fn as_png(data: Vec<u8>, src: &str) -> Option<Vec<u8>> {
    if !is_svg(&data) {
        return Some(data);
    }
    rasterize_svg_within(&data, SVG_BOUNDS)
        .inspect_err(|e| tracing::warn!(src = %truncate(src), error = %e, "Failed to rasterize SVG"))
        .ok()
}

fn truncate(src: &str) -> &str {
    src.get(..64).unwrap_or(src)
}

fn extent_emu(width: u32, height: u32) -> (u64, u64) {
    let cx = u64::from(width) * EMU_PER_PIXEL;
    let cy = u64::from(height) * EMU_PER_PIXEL;
    if cx <= MAX_IMAGE_WIDTH_EMU || cx == 0 {
        return (cx, cy);
    }
    (MAX_IMAGE_WIDTH_EMU, cy * MAX_IMAGE_WIDTH_EMU / cx)
}

fn styles() -> String {
    let mut out = format!(
        "<w:styles xmlns:w=\"{NS_W}\"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii=\"Calibri\" w:hAnsi=\"Calibri\" w:cs=\"Calibri\"/><w:sz w:val=\"22\"/><w:szCs w:val=\"22\"/><w:lang w:val=\"fr-FR\"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after=\"200\" w:line=\"276\" w:lineRule=\"auto\"/></w:pPr></w:pPrDefault></w:docDefaults>"
    );
    out.push_str("<w:style w:type=\"paragraph\" w:default=\"1\" w:styleId=\"Normal\"><w:name w:val=\"Normal\"/><w:qFormat/></w:style>");
    for (id, name, size, color, before, after, outline) in [
        ("Heading1", "heading 1", 32, HEADER_FILL, 400, 200, 0),
        ("Heading2", "heading 2", 28, HEADER_FILL, 300, 150, 1),
        ("Heading3", "heading 3", 24, "404040", 200, 100, 2),
    ] {
        write!(
            out,
            "<w:style w:type=\"paragraph\" w:styleId=\"{id}\"><w:name w:val=\"{name}\"/><w:basedOn w:val=\"Normal\"/><w:next w:val=\"Normal\"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before=\"{before}\" w:after=\"{after}\"/><w:outlineLvl w:val=\"{outline}\"/></w:pPr><w:rPr><w:b/><w:color w:val=\"{color}\"/><w:sz w:val=\"{size}\"/><w:szCs w:val=\"{size}\"/></w:rPr></w:style>"
        )
        .unwrap();
    }
    out.push_str("<w:style w:type=\"paragraph\" w:styleId=\"Code\"><w:name w:val=\"Code\"/><w:basedOn w:val=\"Normal\"/><w:pPr><w:shd w:val=\"clear\" w:color=\"auto\" w:fill=\"F1F5F9\"/><w:spacing w:after=\"150\" w:line=\"240\" w:lineRule=\"auto\"/></w:pPr><w:rPr><w:rFonts w:ascii=\"Consolas\" w:hAnsi=\"Consolas\" w:cs=\"Consolas\"/><w:sz w:val=\"18\"/><w:szCs w:val=\"18\"/></w:rPr></w:style>");
    out.push_str("</w:styles>");
    out
}

fn numbering() -> String {
    let mut out = format!(
        "<w:numbering xmlns:w=\"{NS_W}\"><w:abstractNum w:abstractNumId=\"0\"><w:multiLevelType w:val=\"hybridMultilevel\"/>"
    );
    for level in 0..9u32 {
        let glyph = BULLETS[level as usize % BULLETS.len()];
        let left = 720 * (level + 1);
        write!(
            out,
            "<w:lvl w:ilvl=\"{level}\"><w:start w:val=\"1\"/><w:numFmt w:val=\"bullet\"/><w:lvlText w:val=\"{glyph}\"/><w:lvlJc w:val=\"left\"/><w:pPr><w:ind w:left=\"{left}\" w:hanging=\"360\"/></w:pPr></w:lvl>"
        )
        .unwrap();
    }
    out.push_str("</w:abstractNum><w:num w:numId=\"1\"><w:abstractNumId w:val=\"0\"/></w:num></w:numbering>");
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use cer_document::parse_document;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::word::{FsImageSource, build_word_document};

    struct MapSource(HashMap<String, Vec<u8>>);

    impl ImageSource for MapSource {
        fn load(&self, src: &str) -> Option<Vec<u8>> {
            self.0.get(src).cloned()
        }
    }

    fn fake_png(width: u32, height: u32) -> Vec<u8> {
        let mut data = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0DIHDR".to_vec();
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&[8, 6, 0, 0, 0]);
        data
    }

    fn serialize(input: &str, images: &dyn ImageSource) -> String {
        let doc = build_word_document(&parse_document(input));
        let mut buf = Vec::new();
        write_flat_opc(&doc, images, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn no_images() -> MapSource {
        MapSource(HashMap::new())
    }

    #[test]
    fn test_package_parts() {
        let xml = serialize("## Introduction\nTexte", &no_images());
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<?mso-application progid=\"Word.Document\"?>"));
        for part in [
            "/_rels/.rels",
            "/word/_rels/document.xml.rels",
            "/word/document.xml",
            "/word/styles.xml",
            "/word/numbering.xml",
        ] {
            assert!(xml.contains(&format!("pkg:name=\"{part}\"")), "missing {part}");
        }
        assert!(xml.contains("<w:pgSz w:w=\"11906\" w:h=\"16838\"/>"));
    }

    #[test]
    fn test_section_titles_and_breaks() {
        let xml = serialize("## Introduction\nTexte", &no_images());
        let titles = [
            "Table des matières",
            "Introduction",
            "Recherches &amp; Expérimentations",
            "Bilan",
        ];
        for title in titles {
            assert!(
                xml.contains(&format!(
                    "<w:pStyle w:val=\"Heading1\"/></w:pPr><w:r><w:t xml:space=\"preserve\">{title}</w:t>"
                )),
                "missing title {title}"
            );
        }
        assert_eq!(xml.matches("<w:spacing w:after=\"400\"/>").count(), 3);
    }

    #[test]
    fn test_toc_field_lists_entries() {
        let xml = serialize("## Introduction\n### Contexte\n## Bilan", &no_images());
        assert!(xml.contains("w:fldCharType=\"begin\" w:dirty=\"true\""));
        assert!(xml.contains(" TOC \\o \"1-3\" \\h \\z \\u "));
        assert!(xml.contains("<w:ind w:left=\"440\"/><w:spacing w:after=\"100\"/></w:pPr><w:r><w:t xml:space=\"preserve\">Contexte</w:t>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let xml = serialize("## Bilan\na < b & **c**", &no_images());
        assert!(xml.contains("<w:t xml:space=\"preserve\">a &lt; b &amp; </w:t>"));
        assert!(xml.contains("<w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">c</w:t>"));
    }

    #[test]
    fn test_bullets_share_numbering() {
        let xml = serialize("## Bilan\n- un\n- deux\n  - trois", &no_images());
        assert_eq!(xml.matches("<w:numId w:val=\"1\"/>").count(), 3);
        assert!(xml.contains("<w:ilvl w:val=\"1\"/>"));
    }

    #[test]
    fn test_table_header_and_bands() {
        let xml = serialize(
            "## Bilan\n| A | B |\n|---|---|\n| 1 | 2 |\n| 3 | 4 |\n| 5 |",
            &no_images(),
        );
        assert_eq!(xml.matches("<w:tbl>").count(), 1);
        assert_eq!(xml.matches("<w:gridCol ").count(), 2);
        assert_eq!(xml.matches("w:fill=\"2E3192\"").count(), 2);
        assert_eq!(xml.matches("w:fill=\"F2F2F2\"").count(), 2);
        assert!(xml.contains("<w:tblHeader/>"));
    }

    #[test]
    fn test_picture_embedded_as_media_part() {
        let images = MapSource(HashMap::from([(
            "diagrams/diagram_0_1.png".to_owned(),
            fake_png(100, 50),
        )]));
        let xml = serialize("## Bilan\n![](diagrams/diagram_0_1.png)", &images);

        assert!(xml.contains("<wp:extent cx=\"952500\" cy=\"476250\"/>"));
        assert!(xml.contains("<a:blip r:embed=\"rIdImg1\"/>"));
        assert!(xml.contains("Id=\"rIdImg1\""));
        assert!(xml.contains("pkg:name=\"/word/media/image1.png\""));
        assert!(xml.contains(&STANDARD.encode(fake_png(100, 50))));
    }

    #[test]
    fn test_missing_picture_falls_back_to_alt() {
        let xml = serialize("## Bilan\n![Architecture](img/missing.png)", &no_images());
        assert!(xml.contains("<w:i/></w:rPr><w:t xml:space=\"preserve\">[Architecture]</w:t>"));
        assert!(!xml.contains("/word/media/"));
    }

    #[test]
    fn test_vector_diagram_rasterized_into_picture() {
        let input = "## Bilan\n<div class=\"mermaid-diagram\"><svg xmlns=\"http://www.w3.org/2000/svg\" width=\"200\" height=\"100\"><rect width=\"200\" height=\"100\" fill=\"navy\"/></svg></div>";
        let xml = serialize(input, &FsImageSource::new("."));

        assert!(xml.contains("<pic:pic>"));
        assert!(xml.contains("pkg:name=\"/word/media/image1.png\""));
        let (cx, cy) = extent_emu(1200, 600);
        assert!(xml.contains(&format!("<wp:extent cx=\"{cx}\" cy=\"{cy}\"/>")));
        assert!(!xml.contains("<w:i/></w:rPr><w:t xml:space=\"preserve\">["));
    }

    #[test]
    fn test_unreadable_svg_falls_back_to_alt() {
        let images = MapSource(HashMap::from([(
            "img/broken.svg".to_owned(),
            b"<svg <<".to_vec(),
        )]));
        let xml = serialize("## Bilan\n![Flux](img/broken.svg)", &images);
        assert!(xml.contains("[Flux]"));
        assert!(!xml.contains("<pic:pic>"));
    }

    #[test]
    fn test_extent_scales_wide_images() {
        assert_eq!(extent_emu(100, 50), (952_500, 476_250));
        let (cx, cy) = extent_emu(1200, 600);
        assert_eq!(cx, MAX_IMAGE_WIDTH_EMU);
        assert_eq!(cy, MAX_IMAGE_WIDTH_EMU / 2);
    }

    #[test]
    fn test_styles_part() {
        let styles = styles();
        assert!(styles.contains("w:ascii=\"Calibri\""));
        assert!(styles.contains("<w:sz w:val=\"22\"/>"));
        assert!(styles.contains("w:styleId=\"Heading1\""));
        assert!(styles.contains("<w:color w:val=\"404040\"/><w:sz w:val=\"24\"/>"));
    }
}
