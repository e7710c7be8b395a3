//! Document backends and the commit step
//!
//! A [`DocumentWriter`] turns a [`CardDocument`] into bytes. Two backends ship:
//! Flat OpenDocument Text (`.fodt`, a single-file word-processor document that
//! LibreOffice and Word open directly) and JSON (the card model as-is, for
//! feeding other layout tools).

use crate::card::CardDocument;
use crate::error::{Error, Result};
use crate::fragment::TableFragment;
use crate::markup::{Run, TextBlock};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Serializes a card into a specific file format
pub trait DocumentWriter {
    /// File extension without the dot
    fn extension(&self) -> &'static str;

    /// Write the whole document to `out`
    fn write(&self, document: &CardDocument, out: &mut dyn Write) -> io::Result<()>;
}

/// Output formats selectable from config and the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DocumentFormat {
    #[default]
    #[serde(rename = "fodt")]
    FlatOdt,
    #[serde(rename = "json")]
    Json,
}

impl DocumentFormat {
    /// Construct the writer for this format
    pub fn writer(self) -> Box<dyn DocumentWriter> {
        match self {
            DocumentFormat::FlatOdt => Box::new(FlatOdtWriter::new()),
            DocumentFormat::Json => Box::new(JsonWriter),
        }
    }
}

impl FromStr for DocumentFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fodt" | "odt" => Ok(DocumentFormat::FlatOdt),
            "json" => Ok(DocumentFormat::Json),
            other => Err(Error::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::FlatOdt => f.write_str("fodt"),
            DocumentFormat::Json => f.write_str("json"),
        }
    }
}

/// Where a card lands: `<output_dir>/<level>/<file stem>.<ext>`
pub fn output_path(output_dir: &Path, document: &CardDocument, extension: &str) -> PathBuf {
    output_dir
        .join(document.level.value().to_string())
        .join(format!("{}.{}", document.file_stem(), extension))
}

/// Write a card to disk, creating its level directory if needed
///
/// An existing file with the same name is overwritten.
pub fn commit(
    document: &CardDocument,
    output_dir: &Path,
    writer: &dyn DocumentWriter,
) -> Result<PathBuf> {
    let path = output_path(output_dir, document, writer.extension());

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| Error::Write {
            path: dir.to_path_buf(),
            source: e,
        })?;
    }

    let file = File::create(&path).map_err(|e| Error::Write {
        path: path.clone(),
        source: e,
    })?;
    let mut out = BufWriter::new(file);

    writer
        .write(document, &mut out)
        .and_then(|_| out.flush())
        .map_err(|e| Error::Write {
            path: path.clone(),
            source: e,
        })?;

    Ok(path)
}

/// Writes the card model as pretty-printed JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWriter;

impl DocumentWriter for JsonWriter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn write(&self, document: &CardDocument, out: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, document)?;
        writeln!(out)
    }
}

const OFFICE_NAMESPACES: [(&str, &str); 7] = [
    ("xmlns:office", "urn:oasis:names:tc:opendocument:xmlns:office:1.0"),
    ("xmlns:style", "urn:oasis:names:tc:opendocument:xmlns:style:1.0"),
    ("xmlns:text", "urn:oasis:names:tc:opendocument:xmlns:text:1.0"),
    ("xmlns:table", "urn:oasis:names:tc:opendocument:xmlns:table:1.0"),
    ("xmlns:fo", "urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0"),
    ("xmlns:meta", "urn:oasis:names:tc:opendocument:xmlns:meta:1.0"),
    ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
];

const BODY_FONT: &str = "Times New Roman";

/// Writes Flat OpenDocument Text (`.fodt`)
#[derive(Debug, Clone)]
pub struct FlatOdtWriter {
    generated_at: DateTime<Utc>,
}

impl FlatOdtWriter {
    /// Create a writer stamping documents with the current time
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Create a writer with a fixed creation timestamp
    pub fn at(generated_at: DateTime<Utc>) -> Self {
        Self { generated_at }
    }
}

impl Default for FlatOdtWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentWriter for FlatOdtWriter {
    fn extension(&self) -> &'static str {
        "fodt"
    }

    fn write(&self, document: &CardDocument, out: &mut dyn Write) -> io::Result<()> {
        let mut odt = OdtEmitter {
            xml: Writer::new(out),
        };

        odt.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new("office:document");
        root.extend_attributes(OFFICE_NAMESPACES);
        root.push_attribute(("office:version", "1.2"));
        root.push_attribute(("office:mimetype", "application/vnd.oasis.opendocument.text"));
        odt.emit(Event::Start(root))?;

        self.write_meta(&mut odt, document)?;
        write_styles(&mut odt, document)?;

        odt.start("office:body", &[])?;
        odt.start("office:text", &[])?;
        write_card_body(&mut odt, document)?;
        odt.end("office:text")?;
        odt.end("office:body")?;

        odt.end("office:document")
    }
}

impl FlatOdtWriter {
    fn write_meta<W: Write>(&self, odt: &mut OdtEmitter<W>, document: &CardDocument) -> io::Result<()> {
        let created = self.generated_at.format("%Y-%m-%dT%H:%M:%S").to_string();
        let generator = format!("spellcards/{}", env!("CARGO_PKG_VERSION"));

        odt.start("office:meta", &[])?;
        odt.text_element("meta:generator", &generator)?;
        odt.text_element("dc:title", &document.name)?;
        odt.text_element("meta:creation-date", &created)?;
        odt.end("office:meta")
    }
}

/// Thin helpers over the quick-xml writer
struct OdtEmitter<W: Write> {
    xml: Writer<W>,
}

impl<W: Write> OdtEmitter<W> {
    fn emit(&mut self, event: Event<'_>) -> io::Result<()> {
        self.xml
            .write_event(event)
            .map_err(|e| io::Error::other(e.to_string()))
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> io::Result<()> {
        self.emit(Event::Start(
            BytesStart::new(name).with_attributes(attrs.iter().copied()),
        ))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> io::Result<()> {
        self.emit(Event::Empty(
            BytesStart::new(name).with_attributes(attrs.iter().copied()),
        ))
    }

    fn end(&mut self, name: &str) -> io::Result<()> {
        self.emit(Event::End(BytesEnd::new(name)))
    }

    fn text(&mut self, text: &str) -> io::Result<()> {
        self.emit(Event::Text(BytesText::new(text)))
    }

    fn text_element(&mut self, name: &str, text: &str) -> io::Result<()> {
        self.start(name, &[])?;
        self.text(text)?;
        self.end(name)
    }

    /// Runs as text and `text:span`s carrying the bold/italic styles
    fn runs(&mut self, runs: &[Run]) -> io::Result<()> {
        for run in runs {
            let style = match (run.style.bold, run.style.italic) {
                (false, false) => None,
                (true, false) => Some("B"),
                (false, true) => Some("I"),
                (true, true) => Some("BI"),
            };
            match style {
                Some(style) => {
                    self.start("text:span", &[("text:style-name", style)])?;
                    self.text(&run.text)?;
                    self.end("text:span")?;
                }
                None => self.text(&run.text)?,
            }
        }
        Ok(())
    }

    fn paragraph(&mut self, style: &str, runs: &[Run]) -> io::Result<()> {
        self.start("text:p", &[("text:style-name", style)])?;
        self.runs(runs)?;
        self.end("text:p")
    }

    /// `<style:style>` with a single properties child
    fn style(
        &mut self,
        name: &str,
        family: &str,
        properties: &str,
        attrs: &[(&str, &str)],
    ) -> io::Result<()> {
        self.start("style:style", &[("style:name", name), ("style:family", family)])?;
        self.empty(properties, attrs)?;
        self.end("style:style")
    }
}

fn write_styles<W: Write>(odt: &mut OdtEmitter<W>, document: &CardDocument) -> io::Result<()> {
    let accent = format!("#{}", document.color);
    let body_size = format!("{}pt", document.layout.font_size_pt);
    let header_border = format!("0.5pt solid {}", accent);

    odt.start("office:automatic-styles", &[])?;

    odt.style(
        "Title",
        "paragraph",
        "style:text-properties",
        &[
            ("fo:font-family", BODY_FONT),
            ("fo:font-size", "12pt"),
            ("fo:font-weight", "bold"),
            ("fo:color", accent.as_str()),
        ],
    )?;
    odt.start("style:style", &[("style:name", "PartTitle"), ("style:family", "paragraph")])?;
    odt.empty("style:paragraph-properties", &[("fo:break-before", "page")])?;
    odt.empty(
        "style:text-properties",
        &[
            ("fo:font-family", BODY_FONT),
            ("fo:font-size", "12pt"),
            ("fo:font-weight", "bold"),
            ("fo:color", accent.as_str()),
        ],
    )?;
    odt.end("style:style")?;
    odt.style(
        "Stat",
        "paragraph",
        "style:text-properties",
        &[("fo:font-family", BODY_FONT), ("fo:font-size", "8pt")],
    )?;
    odt.style(
        "Blurb",
        "paragraph",
        "style:text-properties",
        &[
            ("fo:font-family", BODY_FONT),
            ("fo:font-size", "7pt"),
            ("fo:font-style", "italic"),
        ],
    )?;
    odt.style(
        "Body",
        "paragraph",
        "style:text-properties",
        &[("fo:font-family", BODY_FONT), ("fo:font-size", body_size.as_str())],
    )?;
    odt.start("style:style", &[("style:name", "ListItem"), ("style:family", "paragraph")])?;
    odt.empty("style:paragraph-properties", &[("fo:margin-left", "0.1in")])?;
    odt.empty(
        "style:text-properties",
        &[("fo:font-family", BODY_FONT), ("fo:font-size", body_size.as_str())],
    )?;
    odt.end("style:style")?;
    odt.style(
        "Cell",
        "paragraph",
        "style:text-properties",
        &[("fo:font-family", BODY_FONT), ("fo:font-size", "5.5pt")],
    )?;
    odt.style(
        "Footer",
        "paragraph",
        "style:text-properties",
        &[
            ("fo:font-family", BODY_FONT),
            ("fo:font-size", "5pt"),
            ("fo:font-style", "italic"),
        ],
    )?;
    odt.style("B", "text", "style:text-properties", &[("fo:font-weight", "bold")])?;
    odt.style("I", "text", "style:text-properties", &[("fo:font-style", "italic")])?;
    odt.style(
        "BI",
        "text",
        "style:text-properties",
        &[("fo:font-weight", "bold"), ("fo:font-style", "italic")],
    )?;
    odt.style(
        "HeaderText",
        "text",
        "style:text-properties",
        &[("fo:font-weight", "bold"), ("fo:color", "#ffffff")],
    )?;
    odt.style(
        "CardTable",
        "table",
        "style:table-properties",
        &[("style:width", "2.3in"), ("table:align", "center")],
    )?;
    odt.style(
        "HeaderCell",
        "table-cell",
        "style:table-cell-properties",
        &[("fo:background-color", accent.as_str()), ("fo:border", header_border.as_str())],
    )?;
    odt.style(
        "DataCell",
        "table-cell",
        "style:table-cell-properties",
        &[("fo:border", "0.5pt solid #000000")],
    )?;

    odt.end("office:automatic-styles")
}

fn write_card_body<W: Write>(odt: &mut OdtEmitter<W>, document: &CardDocument) -> io::Result<()> {
    odt.paragraph("Title", &[Run::plain(document.title_line())])?;

    for stat in &document.stats {
        odt.start("text:p", &[("text:style-name", "Stat")])?;
        odt.start("text:span", &[("text:style-name", "B")])?;
        odt.text(&format!("{}:", stat.label))?;
        odt.end("text:span")?;
        odt.text(&format!(" {}", stat.value))?;
        odt.end("text:p")?;
    }

    if let Some(blurb) = &document.blurb {
        odt.paragraph("Blurb", &[Run::plain(blurb.as_str())])?;
    }

    let mut number = 0;
    for (part, blocks) in document.description_parts().into_iter().enumerate() {
        if part > 0 {
            odt.paragraph("PartTitle", &[Run::plain(document.part_title(part + 1))])?;
        }
        // Numbering carries on across a card break
        write_blocks(odt, blocks, &mut number)?;
    }

    let mut table_number = 0;
    for (group, indices) in document.table_pages.iter().enumerate() {
        let title = document.part_title(document.table_part(group));
        odt.paragraph("PartTitle", &[Run::plain(title)])?;
        for table in indices.iter().filter_map(|&i| document.tables.get(i)) {
            table_number += 1;
            write_table(odt, table, table_number)?;
        }
    }

    odt.paragraph("Footer", &[Run::plain(document.footer.as_str())])
}

fn write_blocks<W: Write>(
    odt: &mut OdtEmitter<W>,
    blocks: &[TextBlock],
    number: &mut usize,
) -> io::Result<()> {
    for block in blocks {
        match block {
            TextBlock::Paragraph { runs } => {
                *number = 0;
                odt.paragraph("Body", runs)?;
            }
            TextBlock::ListItem { runs, ordered } => {
                let marker = if *ordered {
                    *number += 1;
                    format!("{}. ", number)
                } else {
                    *number = 0;
                    "\u{2022} ".to_string()
                };
                let mut item = Vec::with_capacity(runs.len() + 1);
                item.push(Run::plain(marker));
                item.extend(runs.iter().cloned());
                odt.paragraph("ListItem", &item)?;
            }
        }
    }
    Ok(())
}

fn write_table<W: Write>(odt: &mut OdtEmitter<W>, table: &TableFragment, number: usize) -> io::Result<()> {
    let name = format!("Table{}", number);
    let columns = table.column_count().to_string();

    odt.start(
        "table:table",
        &[("table:name", name.as_str()), ("table:style-name", "CardTable")],
    )?;
    odt.empty("table:table-column", &[("table:number-columns-repeated", columns.as_str())])?;

    for row in &table.rows {
        odt.start("table:table-row", &[])?;
        let mut used = 0;

        for cell in row {
            let span = cell.colspan.to_string();
            let style = if cell.header { "HeaderCell" } else { "DataCell" };
            let mut attrs = vec![("table:style-name", style), ("office:value-type", "string")];
            if cell.colspan > 1 {
                attrs.push(("table:number-columns-spanned", span.as_str()));
            }

            odt.start("table:table-cell", &attrs)?;
            odt.start("text:p", &[("text:style-name", "Cell")])?;
            if cell.header {
                odt.start("text:span", &[("text:style-name", "HeaderText")])?;
                odt.text(&cell.text())?;
                odt.end("text:span")?;
            } else {
                odt.runs(&cell.runs)?;
            }
            odt.end("text:p")?;
            odt.end("table:table-cell")?;

            for _ in 1..cell.colspan {
                odt.empty("table:covered-table-cell", &[])?;
            }
            used += cell.colspan as usize;
        }

        // Pad ragged rows so the grid stays rectangular
        for _ in used..table.column_count() {
            odt.empty("table:table-cell", &[("table:style-name", "DataCell")])?;
        }
        odt.end("table:table-row")?;
    }

    odt.end("table:table")
}
