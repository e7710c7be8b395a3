//! Description markup translation
//!
//! Descriptions in the spell sheet are hand-authored: paragraphs are separated by
//! `|`, and a handful of HTML-like tags mark bold, italic and list text. This module
//! turns that text into [`TextBlock`]s. It is deliberately permissive: unknown tags
//! are kept as literal text, stray closing tags are ignored, and unclosed opening
//! tags run to the end of their paragraph.

use serde::Serialize;

/// Paragraph separator in raw descriptions
pub const PARAGRAPH_DELIMITER: char = '|';

/// Inline formatting flags for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
}

impl RunStyle {
    pub const PLAIN: RunStyle = RunStyle {
        bold: false,
        italic: false,
    };
    pub const BOLD: RunStyle = RunStyle {
        bold: true,
        italic: false,
    };
    pub const ITALIC: RunStyle = RunStyle {
        bold: false,
        italic: true,
    };
}

/// A stretch of text with uniform formatting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Run {
    pub text: String,
    pub style: RunStyle,
}

impl Run {
    /// Create a new run
    pub fn new(text: impl Into<String>, style: RunStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    /// Create an unformatted run
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, RunStyle::PLAIN)
    }
}

/// A structured piece of card body text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextBlock {
    Paragraph { runs: Vec<Run> },
    ListItem { runs: Vec<Run>, ordered: bool },
}

impl TextBlock {
    /// The block's runs
    pub fn runs(&self) -> &[Run] {
        match self {
            TextBlock::Paragraph { runs } | TextBlock::ListItem { runs, .. } => runs,
        }
    }

    /// Concatenated text without formatting
    pub fn plain_text(&self) -> String {
        self.runs().iter().map(|r| r.text.as_str()).collect()
    }
}

/// Recognized tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Bold,
    Italic,
    UnorderedList,
    OrderedList,
    ListItem,
    /// `<p>` wrappers carry no meaning once paragraphs are split on '|'
    Paragraph,
}

/// Tag vocabulary: (name, tag)
const TAGS: [(&str, Tag); 8] = [
    ("b", Tag::Bold),
    ("strong", Tag::Bold),
    ("i", Tag::Italic),
    ("em", Tag::Italic),
    ("ul", Tag::UnorderedList),
    ("ol", Tag::OrderedList),
    ("li", Tag::ListItem),
    ("p", Tag::Paragraph),
];

impl Tag {
    fn lookup(name: &str) -> Option<Tag> {
        TAGS.iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, tag)| *tag)
    }

    fn list_kind(self) -> Option<ListKind> {
        match self {
            Tag::UnorderedList => Some(ListKind::Unordered),
            Tag::OrderedList => Some(ListKind::Ordered),
            _ => None,
        }
    }
}

/// Token types produced by the tokenizer
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    /// Literal text, including anything that looked like an unknown tag
    Text(&'a str),
    Open(Tag),
    Close(Tag),
}

/// Splits one paragraph segment into text and known tags
struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Interpret `<...>` contents as a known tag; attributes are ignored
    fn classify(inner: &str) -> Option<Token<'static>> {
        let (closing, body) = match inner.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, inner),
        };
        let name = body.split_whitespace().next()?.trim_end_matches('/');
        if !name.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }

        let tag = Tag::lookup(name)?;
        Some(if closing { Token::Close(tag) } else { Token::Open(tag) })
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.input.len() {
            return None;
        }

        let remaining = &self.input[self.pos..];

        let Some(open) = remaining.find('<') else {
            self.pos = self.input.len();
            return Some(Token::Text(remaining));
        };

        if open > 0 {
            self.pos += open;
            return Some(Token::Text(&remaining[..open]));
        }

        // At '<': a known tag, or a literal '<' plus whatever follows up to the next '<'
        if let Some(close) = remaining.find('>') {
            let inner = &remaining[1..close];
            if !inner.contains('<') {
                if let Some(token) = Self::classify(inner) {
                    self.pos += close + 1;
                    return Some(token);
                }
            }
        }

        let literal_end = remaining[1..].find('<').map_or(remaining.len(), |i| i + 1);
        let literal_end = match remaining.find('>') {
            Some(close) if close < literal_end => close + 1,
            _ => literal_end,
        };
        self.pos += literal_end;
        Some(Token::Text(&remaining[..literal_end]))
    }
}

/// Open list container kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

/// State machine over one segment's tokens
#[derive(Debug, Default)]
struct SegmentState {
    style: RunStyle,
    list: Option<ListKind>,
    item: Option<bool>,
    runs: Vec<Run>,
}

impl SegmentState {
    fn push_text(&mut self, text: &str) {
        // Whitespace between <ul> and <li> is layout, not content
        if self.list.is_some() && self.item.is_none() && text.trim().is_empty() {
            return;
        }

        match self.runs.last_mut() {
            Some(last) if last.style == self.style => last.text.push_str(text),
            _ => self.runs.push(Run::new(text, self.style)),
        }
    }

    fn open(&mut self, tag: Tag, blocks: &mut Vec<TextBlock>) {
        match tag {
            Tag::Bold => self.style.bold = true,
            Tag::Italic => self.style.italic = true,
            Tag::UnorderedList | Tag::OrderedList => {
                self.flush(blocks);
                self.list = tag.list_kind();
            }
            Tag::ListItem => {
                self.flush(blocks);
                self.item = Some(self.list == Some(ListKind::Ordered));
            }
            Tag::Paragraph => {}
        }
    }

    fn close(&mut self, tag: Tag, blocks: &mut Vec<TextBlock>) {
        match tag {
            Tag::Bold => self.style.bold = false,
            Tag::Italic => self.style.italic = false,
            Tag::UnorderedList | Tag::OrderedList => {
                if self.list == tag.list_kind() {
                    self.flush(blocks);
                    self.list = None;
                }
            }
            Tag::ListItem => {
                if self.item.is_some() {
                    self.flush(blocks);
                }
            }
            Tag::Paragraph => {}
        }
    }

    /// Emit pending runs as a block and leave the current item
    fn flush(&mut self, blocks: &mut Vec<TextBlock>) {
        let runs = trim_runs(std::mem::take(&mut self.runs));
        let item = self.item.take();
        if runs.is_empty() {
            return;
        }

        blocks.push(match item {
            Some(ordered) => TextBlock::ListItem { runs, ordered },
            None => TextBlock::Paragraph { runs },
        });
    }
}

/// Trim whitespace at block edges, dropping runs left empty
fn trim_runs(mut runs: Vec<Run>) -> Vec<Run> {
    while let Some(first) = runs.first_mut() {
        let trimmed = first.text.trim_start();
        if trimmed.is_empty() {
            runs.remove(0);
        } else {
            first.text = trimmed.to_string();
            break;
        }
    }
    while let Some(last) = runs.last_mut() {
        let trimmed = last.text.trim_end();
        if trimmed.is_empty() {
            runs.pop();
        } else {
            last.text = trimmed.to_string();
            break;
        }
    }
    runs
}

/// Translate a raw description into ordered text blocks
pub fn translate(raw: &str) -> Vec<TextBlock> {
    let mut blocks = Vec::new();

    for segment in raw.split(PARAGRAPH_DELIMITER) {
        // Formatting never leaks across paragraph boundaries
        let mut state = SegmentState::default();
        for token in Tokenizer::new(segment) {
            match token {
                Token::Text(text) => state.push_text(text),
                Token::Open(tag) => state.open(tag, &mut blocks),
                Token::Close(tag) => state.close(tag, &mut blocks),
            }
        }
        state.flush(&mut blocks);
    }

    blocks
}
