//! Minimal WordprocessingML writer.
//!
//! A [`Document`] is a flat list of paragraphs and tables. Saving renders the
//! body plus a fixed style sheet into the parts Word needs and packs them into
//! a zip container.

use crate::error::WriteError;
use std::fmt;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_CT: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const NS_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Numbering definition used for every bullet paragraph.
const BULLET_NUM_ID: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub font: Option<&'static str>,
    /// Points.
    pub size: Option<f32>,
    pub color: Option<Rgb>,
}

impl RunStyle {
    fn is_plain(&self) -> bool {
        *self == RunStyle::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub style: RunStyle,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: RunStyle::default(),
        }
    }

    pub fn bold(mut self) -> Self {
        self.style.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.style.italic = true;
        self
    }

    pub fn font(mut self, font: &'static str) -> Self {
        self.style.font = Some(font);
        self
    }

    pub fn size(mut self, points: f32) -> Self {
        self.style.size = Some(points);
        self
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.style.color = Some(color);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParagraphStyle {
    #[default]
    Normal,
    Title,
    Heading,
}

impl ParagraphStyle {
    fn style_id(self) -> Option<&'static str> {
        match self {
            ParagraphStyle::Normal => None,
            ParagraphStyle::Title => Some("CustomTitle"),
            ParagraphStyle::Heading => Some("CustomHeading"),
        }
    }
}

/// Bullet nesting depth, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLevel(pub u32);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paragraph {
    pub style: ParagraphStyle,
    pub bullet: Option<ListLevel>,
    pub alignment: Alignment,
    pub runs: Vec<Run>,
    /// Emits a page break before the runs.
    pub page_break: bool,
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn styled(style: ParagraphStyle, text: impl Into<String>) -> Self {
        Self {
            style,
            ..Self::default()
        }
        .run(Run::new(text))
    }

    pub fn bullet(level: u32) -> Self {
        Self {
            bullet: Some(ListLevel(level)),
            ..Self::default()
        }
    }

    pub fn page_break() -> Self {
        Self {
            page_break: true,
            ..Self::default()
        }
    }

    pub fn align(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn run(mut self, run: Run) -> Self {
        self.runs.push(run);
        self
    }

    /// Concatenated run text.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub paragraphs: Vec<Paragraph>,
}

impl TableCell {
    pub fn new(paragraph: Paragraph) -> Self {
        Self {
            paragraphs: vec![paragraph],
        }
    }

    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, cells: Vec<TableCell>) -> Self {
        self.rows.push(TableRow { cells });
        self
    }

    fn columns(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    blocks: Vec<Block>,
}

fn xml_escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn run_properties_xml(style: &RunStyle) -> String {
    let mut out = String::from("<w:rPr>");
    if let Some(font) = style.font {
        out.push_str(&format!(
            "<w:rFonts w:ascii=\"{font}\" w:hAnsi=\"{font}\" w:cs=\"{font}\"/>"
        ));
    }
    if style.bold {
        out.push_str("<w:b/>");
    }
    if style.italic {
        out.push_str("<w:i/>");
    }
    if let Some(color) = style.color {
        out.push_str(&format!("<w:color w:val=\"{color}\"/>"));
    }
    if let Some(size) = style.size {
        // half-points
        let half_points = (size * 2.0).round() as u32;
        out.push_str(&format!(
            "<w:sz w:val=\"{half_points}\"/><w:szCs w:val=\"{half_points}\"/>"
        ));
    }
    out.push_str("</w:rPr>");
    out
}

fn run_xml(run: &Run) -> String {
    if run.text.is_empty() {
        return String::new();
    }
    let mut out = String::from("<w:r>");
    if !run.style.is_plain() {
        out.push_str(&run_properties_xml(&run.style));
    }
    // Embedded newlines become line breaks inside the run.
    for (i, line) in run.text.split('\n').enumerate() {
        if i > 0 {
            out.push_str("<w:br/>");
        }
        if !line.is_empty() {
            out.push_str("<w:t xml:space=\"preserve\">");
            out.push_str(&xml_escape_text(line));
            out.push_str("</w:t>");
        }
    }
    out.push_str("</w:r>");
    out
}

fn paragraph_xml(p: &Paragraph) -> String {
    let mut out = String::from("<w:p>");

    let style_id = p.style.style_id();
    if style_id.is_some() || p.bullet.is_some() || p.alignment != Alignment::Left {
        out.push_str("<w:pPr>");
        if let Some(id) = style_id {
            out.push_str(&format!("<w:pStyle w:val=\"{id}\"/>"));
        }
        if let Some(ListLevel(ilvl)) = p.bullet {
            out.push_str("<w:numPr>");
            out.push_str(&format!("<w:ilvl w:val=\"{ilvl}\"/>"));
            out.push_str(&format!("<w:numId w:val=\"{BULLET_NUM_ID}\"/>"));
            out.push_str("</w:numPr>");
        }
        if p.alignment == Alignment::Center {
            out.push_str("<w:jc w:val=\"center\"/>");
        }
        out.push_str("</w:pPr>");
    }

    if p.page_break {
        out.push_str("<w:r><w:br w:type=\"page\"/></w:r>");
    }
    for run in &p.runs {
        out.push_str(&run_xml(run));
    }

    out.push_str("</w:p>");
    out
}

fn table_xml(t: &Table) -> String {
    let mut out = String::new();
    out.push_str("<w:tbl>");
    out.push_str("<w:tblPr>");
    out.push_str("<w:tblStyle w:val=\"TableGrid\"/>");
    out.push_str("<w:tblW w:w=\"0\" w:type=\"auto\"/>");
    out.push_str(
        r#"<w:tblBorders>
<w:top w:val="single" w:sz="4" w:space="0" w:color="000000"/>
<w:left w:val="single" w:sz="4" w:space="0" w:color="000000"/>
<w:bottom w:val="single" w:sz="4" w:space="0" w:color="000000"/>
<w:right w:val="single" w:sz="4" w:space="0" w:color="000000"/>
<w:insideH w:val="single" w:sz="4" w:space="0" w:color="000000"/>
<w:insideV w:val="single" w:sz="4" w:space="0" w:color="000000"/>
</w:tblBorders>"#,
    );
    out.push_str("</w:tblPr>");

    out.push_str("<w:tblGrid>");
    for _ in 0..t.columns() {
        out.push_str("<w:gridCol/>");
    }
    out.push_str("</w:tblGrid>");

    for row in &t.rows {
        out.push_str("<w:tr>");
        for cell in &row.cells {
            out.push_str("<w:tc>");
            out.push_str("<w:tcPr><w:tcW w:w=\"0\" w:type=\"auto\"/></w:tcPr>");
            if cell.paragraphs.is_empty() {
                // A cell must hold at least one paragraph.
                out.push_str("<w:p/>");
            }
            for p in &cell.paragraphs {
                out.push_str(&paragraph_xml(p));
            }
            out.push_str("</w:tc>");
        }
        out.push_str("</w:tr>");
    }

    out.push_str("</w:tbl>");
    out
}

fn content_types_xml(has_numbering: bool) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(&format!(r#"<Types xmlns="{NS_CT}">"#));
    out.push('\n');
    out.push_str(
        r#"  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    );
    out.push('\n');
    out.push_str(r#"  <Default Extension="xml" ContentType="application/xml"/>"#);
    out.push('\n');
    out.push_str(r#"  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#);
    out.push('\n');
    out.push_str(r#"  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#);
    out.push('\n');
    if has_numbering {
        out.push_str(r#"  <Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/>"#);
        out.push('\n');
    }
    out.push_str("</Types>");
    out
}

fn rels_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{NS_RELS}">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#
    )
}

fn document_rels_xml(has_numbering: bool) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(&format!(r#"<Relationships xmlns="{NS_RELS}">"#));
    out.push('\n');
    out.push_str(r#"  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#);
    out.push('\n');
    if has_numbering {
        out.push_str(r#"  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/>"#);
        out.push('\n');
    }
    out.push_str("</Relationships>");
    out
}

fn styles_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="{NS_W}">
  <w:docDefaults>
    <w:rPrDefault>
      <w:rPr>
        <w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/>
        <w:sz w:val="22"/>
        <w:szCs w:val="22"/>
      </w:rPr>
    </w:rPrDefault>
    <w:pPrDefault>
      <w:pPr>
        <w:spacing w:after="160" w:line="259" w:lineRule="auto"/>
      </w:pPr>
    </w:pPrDefault>
  </w:docDefaults>
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
    <w:qFormat/>
  </w:style>
  <w:style w:type="paragraph" w:customStyle="1" w:styleId="CustomTitle">
    <w:name w:val="Custom Title"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:qFormat/>
    <w:pPr>
      <w:spacing w:after="240"/>
      <w:jc w:val="center"/>
    </w:pPr>
    <w:rPr>
      <w:rFonts w:ascii="Arial" w:hAnsi="Arial" w:cs="Arial"/>
      <w:b/>
      <w:color w:val="003366"/>
      <w:sz w:val="40"/>
      <w:szCs w:val="40"/>
    </w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:customStyle="1" w:styleId="CustomHeading">
    <w:name w:val="Custom Heading"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:qFormat/>
    <w:pPr>
      <w:keepNext/>
      <w:spacing w:before="240" w:after="120"/>
      <w:outlineLvl w:val="0"/>
    </w:pPr>
    <w:rPr>
      <w:rFonts w:ascii="Arial" w:hAnsi="Arial" w:cs="Arial"/>
      <w:b/>
      <w:color w:val="003366"/>
      <w:sz w:val="28"/>
      <w:szCs w:val="28"/>
    </w:rPr>
  </w:style>
  <w:style w:type="table" w:styleId="TableGrid">
    <w:name w:val="Table Grid"/>
    <w:pPr>
      <w:spacing w:after="0" w:line="240" w:lineRule="auto"/>
    </w:pPr>
    <w:tblPr>
      <w:tblCellMar>
        <w:left w:w="108" w:type="dxa"/>
        <w:right w:w="108" w:type="dxa"/>
      </w:tblCellMar>
    </w:tblPr>
  </w:style>
</w:styles>"#
    )
}

fn numbering_xml() -> String {
    let mut levels = String::new();
    for ilvl in 0..9u32 {
        let left = 720 * (ilvl + 1);
        let bullet = match ilvl % 3 {
            0 => "•",
            1 => "o",
            _ => "▪",
        };
        levels.push_str(&format!(
            r#"    <w:lvl w:ilvl="{ilvl}"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="{bullet}"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="{left}" w:hanging="360"/></w:pPr></w:lvl>"#
        ));
        levels.push('\n');
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="{NS_W}">
  <w:abstractNum w:abstractNumId="1">
    <w:multiLevelType w:val="hybridMultilevel"/>
{levels}  </w:abstractNum>
  <w:num w:numId="{BULLET_NUM_ID}"><w:abstractNumId w:val="1"/></w:num>
</w:numbering>"#
    )
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_paragraph(&mut self, paragraph: Paragraph) {
        self.blocks.push(Block::Paragraph(paragraph));
    }

    pub fn add_table(&mut self, table: Table) {
        self.blocks.push(Block::Table(table));
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Top-level paragraphs, skipping tables.
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Paragraph(p) => Some(p),
            Block::Table(_) => None,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Table(t) => Some(t),
            Block::Paragraph(_) => None,
        })
    }

    fn needs_numbering(&self) -> bool {
        self.blocks.iter().any(|b| match b {
            Block::Paragraph(p) => p.bullet.is_some(),
            Block::Table(t) => t
                .rows
                .iter()
                .flat_map(|r| r.cells.iter())
                .flat_map(|c| c.paragraphs.iter())
                .any(|p| p.bullet.is_some()),
        })
    }

    pub fn document_xml(&self) -> String {
        let mut body = String::new();
        for b in &self.blocks {
            match b {
                Block::Paragraph(p) => body.push_str(&paragraph_xml(p)),
                Block::Table(t) => body.push_str(&table_xml(t)),
            }
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{NS_W}" xmlns:r="{NS_R}">
  <w:body>
    {body}
    <w:sectPr>
      <w:pgSz w:w="12240" w:h="15840"/>
      <w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/>
      <w:cols w:space="708"/>
      <w:docGrid w:linePitch="360"/>
    </w:sectPr>
  </w:body>
</w:document>"#
        )
    }

    /// Writes the package into `writer` and hands it back.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W, WriteError> {
        let has_numbering = self.needs_numbering();
        let mut zip = ZipWriter::new(writer);
        let opts = SimpleFileOptions::default();

        zip.start_file("[Content_Types].xml", opts)?;
        zip.write_all(content_types_xml(has_numbering).as_bytes())?;

        zip.start_file("_rels/.rels", opts)?;
        zip.write_all(rels_xml().as_bytes())?;

        zip.start_file("word/document.xml", opts)?;
        zip.write_all(self.document_xml().as_bytes())?;

        zip.start_file("word/styles.xml", opts)?;
        zip.write_all(styles_xml().as_bytes())?;

        if has_numbering {
            zip.start_file("word/numbering.xml", opts)?;
            zip.write_all(numbering_xml().as_bytes())?;
        }

        zip.start_file("word/_rels/document.xml.rels", opts)?;
        zip.write_all(document_rels_xml(has_numbering).as_bytes())?;

        Ok(zip.finish()?)
    }

    pub fn save(&self, path: &Path) -> Result<(), WriteError> {
        let f = File::create(path)?;
        let mut f = self.write_to(f)?;
        f.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    fn read_part(bytes: Vec<u8>, name: &str) -> Option<String> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).ok()?;
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        Some(out)
    }

    #[test]
    fn escapes_run_text() {
        let xml = run_xml(&Run::new("a < b & \"c\""));
        assert!(xml.contains("a &lt; b &amp; &quot;c&quot;"));
        assert!(!xml.contains("<w:rPr>"));
    }

    #[test]
    fn run_properties_follow_style() {
        let run = Run::new("x")
            .bold()
            .italic()
            .font("Courier New")
            .size(9.0)
            .color(Rgb(255, 0, 0));
        let xml = run_xml(&run);
        assert!(xml.contains("<w:rFonts w:ascii=\"Courier New\""));
        assert!(xml.contains("<w:b/>"));
        assert!(xml.contains("<w:i/>"));
        assert!(xml.contains("<w:color w:val=\"FF0000\"/>"));
        assert!(xml.contains("<w:sz w:val=\"18\"/>"));
    }

    #[test]
    fn newlines_become_breaks() {
        let xml = run_xml(&Run::new("one\ntwo"));
        assert!(xml.contains("one</w:t><w:br/><w:t xml:space=\"preserve\">two"));
    }

    #[test]
    fn paragraph_properties() {
        let p = Paragraph::bullet(2).align(Alignment::Center).run(Run::new("x"));
        let xml = paragraph_xml(&p);
        assert!(xml.contains("<w:ilvl w:val=\"2\"/>"));
        assert!(xml.contains("<w:numId w:val=\"1\"/>"));
        assert!(xml.contains("<w:jc w:val=\"center\"/>"));

        let heading = paragraph_xml(&Paragraph::styled(ParagraphStyle::Heading, "H"));
        assert!(heading.contains("<w:pStyle w:val=\"CustomHeading\"/>"));

        assert_eq!(paragraph_xml(&Paragraph::new()), "<w:p></w:p>");
        assert!(paragraph_xml(&Paragraph::page_break()).contains("w:type=\"page\""));
    }

    #[test]
    fn table_grid_matches_widest_row() {
        let t = Table::new()
            .row(vec![TableCell::new(Paragraph::new().run(Run::new("a")))])
            .row(vec![
                TableCell::new(Paragraph::new().run(Run::new("b"))),
                TableCell::new(Paragraph::new().run(Run::new("c"))),
            ]);
        let xml = table_xml(&t);
        assert_eq!(xml.matches("<w:gridCol/>").count(), 2);
        assert_eq!(xml.matches("<w:tc>").count(), 3);
    }

    #[test]
    fn package_contains_required_parts() {
        let mut doc = Document::new();
        doc.add_paragraph(Paragraph::styled(ParagraphStyle::Title, "Report"));
        let bytes = doc.write_to(Cursor::new(Vec::new())).unwrap().into_inner();

        assert!(read_part(bytes.clone(), "[Content_Types].xml").is_some());
        assert!(read_part(bytes.clone(), "_rels/.rels").is_some());
        assert!(read_part(bytes.clone(), "word/styles.xml").is_some());
        assert!(read_part(bytes.clone(), "word/numbering.xml").is_none());
        let body = read_part(bytes, "word/document.xml").unwrap();
        assert!(body.contains("Report"));
    }

    #[test]
    fn bullets_pull_in_numbering() {
        let mut doc = Document::new();
        doc.add_paragraph(Paragraph::bullet(0).run(Run::new("item")));
        let bytes = doc.write_to(Cursor::new(Vec::new())).unwrap().into_inner();
        assert!(read_part(bytes.clone(), "word/numbering.xml").is_some());
        let types = read_part(bytes.clone(), "[Content_Types].xml").unwrap();
        assert!(types.contains("/word/numbering.xml"));
        let rels = read_part(bytes, "word/_rels/document.xml.rels").unwrap();
        assert!(rels.contains("numbering.xml"));
    }

    #[test]
    fn save_fails_for_missing_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.docx");
        assert!(matches!(
            Document::new().save(&path),
            Err(WriteError::Io(_))
        ));
    }
}
