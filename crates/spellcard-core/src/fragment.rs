//! Loader for externally authored table fragments
//!
//! Some spells carry tables (wild magic surges, summoned creature stats, ...) that do
//! not fit in a spreadsheet cell. Those live next to the input as small XHTML files
//! named `<spell>_table<index>.html`. Fragments are parsed strictly: anything that is
//! not a plain table of rows and cells is rejected rather than guessed at.

use crate::error::{Error, Result};
use crate::markup::{Run, RunStyle};
use crate::spell::file_stem;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A single table cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCell {
    /// Cell text with inline formatting
    pub runs: Vec<Run>,
    /// Whether this came from a `<th>`
    pub header: bool,
    /// Number of grid columns this cell spans (>= 1)
    pub colspan: u32,
}

impl TableCell {
    /// Concatenated text without formatting
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// A parsed table fragment
#[derive(Debug, Clone, Serialize)]
pub struct TableFragment {
    /// Rows in document order; every row has at least one cell
    pub rows: Vec<Vec<TableCell>>,
    /// File the fragment was read from
    pub source: PathBuf,
}

impl TableFragment {
    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row in grid columns
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.iter().map(|c| c.colspan as usize).sum::<usize>())
            .max()
            .unwrap_or(0)
    }
}

/// Looks up table fragments in a directory
#[derive(Debug, Clone)]
pub struct TableLoader {
    dir: PathBuf,
}

impl TableLoader {
    /// Create a loader rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory searched for fragments
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of fragment `index` (0-based) for a spell
    pub fn fragment_path(&self, spell_name: &str, index: usize) -> PathBuf {
        self.dir
            .join(format!("{}_table{}.html", file_stem(spell_name), index))
    }

    /// Load fragment `index` for a spell; `Ok(None)` when no such fragment exists
    pub fn load(&self, spell_name: &str, index: usize) -> Result<Option<TableFragment>> {
        let path = self.fragment_path(spell_name, index);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::TableRead { path, source: e }),
        };

        log::debug!("loading table fragment {}", path.display());
        parse_fragment(&content, &path).map(Some)
    }
}

/// Elements we accept, tracked on an open-element stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    /// html/body/div around the table
    Wrapper,
    Table,
    /// thead/tbody/tfoot
    Section,
    Row,
    Cell,
    Bold,
    Italic,
    /// span/p/sup/sub/a: kept for their text only
    Inline,
}

/// Accumulates one cell's runs
#[derive(Debug)]
struct CellBuilder {
    runs: Vec<Run>,
    header: bool,
    colspan: u32,
    bold: u32,
    italic: u32,
}

impl CellBuilder {
    fn push_text(&mut self, text: &str) {
        let style = RunStyle {
            bold: self.bold > 0,
            italic: self.italic > 0,
        };
        match self.runs.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.runs.push(Run::new(text, style)),
        }
    }

    /// Collapse whitespace the way a browser would, then trim the cell edges
    fn finish(self) -> TableCell {
        let mut runs: Vec<Run> = Vec::with_capacity(self.runs.len());
        let mut after_space = true;

        for run in self.runs {
            let mut text = String::with_capacity(run.text.len());
            for c in run.text.chars() {
                if c.is_whitespace() {
                    if !after_space {
                        text.push(' ');
                        after_space = true;
                    }
                } else {
                    text.push(c);
                    after_space = false;
                }
            }
            if !text.is_empty() {
                runs.push(Run::new(text, run.style));
            }
        }

        if let Some(last) = runs.last_mut() {
            let trimmed_len = last.text.trim_end().len();
            last.text.truncate(trimmed_len);
        }
        runs.retain(|r| !r.text.is_empty());

        TableCell {
            runs,
            header: self.header,
            colspan: self.colspan,
        }
    }
}

/// Parse fragment markup; `source` is only used for error messages
pub fn parse_fragment(content: &str, source: &Path) -> Result<TableFragment> {
    let fail = |message: String| Error::TableParse {
        path: source.to_path_buf(),
        message,
    };

    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut rows: Vec<Vec<TableCell>> = Vec::new();
    let mut row: Vec<TableCell> = Vec::new();
    let mut cell: Option<CellBuilder> = None;
    let mut seen_table = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| fail(format!("{} at byte {}", e, reader.buffer_position())))?;

        match event {
            Event::Start(start) => {
                let name = element_name(&start);
                let element = classify(stack.last().copied(), &name, seen_table)
                    .ok_or_else(|| fail(unexpected(&name, stack.last().copied())))?;

                match element {
                    Element::Table => seen_table = true,
                    Element::Cell => cell = Some(start_cell(&start, &name).map_err(fail)?),
                    Element::Bold => {
                        if let Some(cell) = cell.as_mut() {
                            cell.bold += 1;
                        }
                    }
                    Element::Italic => {
                        if let Some(cell) = cell.as_mut() {
                            cell.italic += 1;
                        }
                    }
                    _ => {}
                }
                stack.push(element);
            }
            Event::End(_) => {
                // quick-xml has already checked that the end name matches
                match stack.pop() {
                    Some(Element::Row) => {
                        if row.is_empty() {
                            return Err(fail(format!("row {} has no cells", rows.len() + 1)));
                        }
                        rows.push(std::mem::take(&mut row));
                    }
                    Some(Element::Cell) => {
                        if let Some(done) = cell.take() {
                            row.push(done.finish());
                        }
                    }
                    Some(Element::Bold) => {
                        if let Some(cell) = cell.as_mut() {
                            cell.bold = cell.bold.saturating_sub(1);
                        }
                    }
                    Some(Element::Italic) => {
                        if let Some(cell) = cell.as_mut() {
                            cell.italic = cell.italic.saturating_sub(1);
                        }
                    }
                    _ => {}
                }
            }
            Event::Empty(empty) => {
                let name = element_name(&empty);
                let parent = stack.last().copied();
                match (parent, name.as_str()) {
                    (Some(Element::Row), "td" | "th") => {
                        row.push(start_cell(&empty, &name).map_err(fail)?.finish());
                    }
                    (Some(Element::Cell | Element::Bold | Element::Italic | Element::Inline), "br") => {
                        if let Some(cell) = cell.as_mut() {
                            cell.push_text(" ");
                        }
                    }
                    _ => return Err(fail(unexpected(&name, parent))),
                }
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| fail(format!("{} at byte {}", e, reader.buffer_position())))?;
                match cell.as_mut() {
                    Some(cell) => cell.push_text(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err(fail(format!("text outside a cell: '{}'", text.trim()))),
                }
            }
            Event::CData(data) => match cell.as_mut() {
                Some(cell) => cell.push_text(&String::from_utf8_lossy(&data)),
                None => return Err(fail("CDATA outside a cell".to_string())),
            },
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if !stack.is_empty() {
        return Err(fail("unexpected end of file inside an open element".to_string()));
    }
    if !seen_table {
        return Err(fail("no <table> element".to_string()));
    }
    if rows.is_empty() {
        return Err(fail("table has no rows".to_string()));
    }

    Ok(TableFragment {
        rows,
        source: source.to_path_buf(),
    })
}

/// Lowercased element name
fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase()
}

/// Decide what an opening tag means given its parent; `None` rejects it
fn classify(parent: Option<Element>, name: &str, seen_table: bool) -> Option<Element> {
    match (parent, name) {
        (None | Some(Element::Wrapper), "html" | "body" | "div") => Some(Element::Wrapper),
        (None | Some(Element::Wrapper), "table") if !seen_table => Some(Element::Table),
        (Some(Element::Table), "thead" | "tbody" | "tfoot") => Some(Element::Section),
        (Some(Element::Table | Element::Section), "tr") => Some(Element::Row),
        (Some(Element::Row), "td" | "th") => Some(Element::Cell),
        (Some(Element::Cell | Element::Bold | Element::Italic | Element::Inline), inline) => {
            match inline {
                "strong" | "b" => Some(Element::Bold),
                "em" | "i" => Some(Element::Italic),
                "span" | "p" | "sup" | "sub" | "a" => Some(Element::Inline),
                _ => None,
            }
        }
        _ => None,
    }
}

fn unexpected(name: &str, parent: Option<Element>) -> String {
    match parent {
        Some(parent) => format!("unexpected <{}> inside {:?}", name, parent),
        None => format!("unexpected top-level <{}>", name),
    }
}

fn start_cell(start: &BytesStart<'_>, name: &str) -> std::result::Result<CellBuilder, String> {
    let mut colspan = 1;

    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        if attr.key.as_ref().eq_ignore_ascii_case(b"colspan") {
            let value = String::from_utf8_lossy(&attr.value);
            colspan = value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|&n| n >= 1)
                .ok_or_else(|| format!("invalid colspan '{}'", value))?;
        }
    }

    Ok(CellBuilder {
        runs: Vec::new(),
        header: name == "th",
        colspan,
        bold: 0,
        italic: 0,
    })
}
