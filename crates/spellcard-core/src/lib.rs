//! spellcard-core: Core library for turning a spell list into printable cards
//!
//! This library provides functionality to:
//! - Parse a spell list (CSV, XLSX, XLS or ODS) into validated records
//! - Select records by class/level filters or a per-row generate flag
//! - Translate the description markup into styled paragraphs and list items
//! - Load per-spell HTML table fragments
//! - Render cards and write them as Flat ODT or JSON, one directory per level

pub mod card;
pub mod config;
pub mod error;
pub mod filter;
pub mod fragment;
pub mod layout;
pub mod markup;
pub mod parser;
pub mod pipeline;
pub mod spell;
pub mod writer;

pub use card::{
    build_card, load_tables, pack_tables, render, CardDocument, StatLine, TABLE_ROW_LIMIT_PER_PAGE,
};
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use filter::{select, FilterCriteria};
pub use fragment::{parse_fragment, TableCell, TableFragment, TableLoader};
pub use layout::{choose_layout, paginate, Layout};
pub use markup::{translate, Run, RunStyle, TextBlock};
pub use parser::{parse_spells, parse_spells_str};
pub use pipeline::{level_breakdown, run, run_records, RunOptions, RunReport};
pub use spell::{Availability, Class, Level, Requirements, School, SpellRecord};
pub use writer::{commit, output_path, DocumentFormat, DocumentWriter, FlatOdtWriter, JsonWriter};
