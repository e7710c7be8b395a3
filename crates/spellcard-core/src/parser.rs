//! Spell sheet ingestion
//!
//! The sheet can be a CSV export or a workbook (xlsx, xls, ods). Both are read
//! into the same header-plus-rows [`Sheet`] and validated by one column mapping.
//! Rows that fail validation are logged and skipped; only file-level problems abort.

use crate::error::{Error, Result};
use crate::spell::{Availability, Class, Level, Requirements, School, SpellRecord};
use calamine::{open_workbook_auto, Data, Reader};
use csv::StringRecord;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Extensions read through the workbook backend
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "xla", "ods"];

/// Spreadsheet formats neither backend understands
const UNSUPPORTED_EXTENSIONS: &[&str] = &["numbers"];

/// Parse a spell sheet (CSV or workbook) into validated records
pub fn parse_spells<P: AsRef<Path>>(path: P) -> Result<Vec<SpellRecord>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if UNSUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        });
    }

    fs::metadata(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let sheet = if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
        Sheet::from_workbook(path)?
    } else {
        let file = File::open(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Sheet::from_csv(BufReader::new(file), path)?
    };

    read_spells(sheet, path)
}

/// Parse CSV from a string (useful for testing)
pub fn parse_spells_str(content: &str, source_name: &str) -> Result<Vec<SpellRecord>> {
    let path = Path::new(source_name);
    read_spells(Sheet::from_csv(content.as_bytes(), path)?, path)
}

/// A header row plus data rows, whatever the file format
#[derive(Debug)]
struct Sheet {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl Sheet {
    fn from_csv<R: Read>(reader: R, path: &Path) -> Result<Self> {
        let csv_error = |source| Error::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // Hand-edited sheets often have ragged rows
            .from_reader(reader);

        let headers = csv_reader.headers().map_err(csv_error)?.clone();
        let rows = csv_reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(csv_error)?;

        Ok(Self { headers, rows })
    }

    /// First worksheet of a workbook; its first used row is the header
    fn from_workbook(path: &Path) -> Result<Self> {
        let spreadsheet_error = |source| Error::Spreadsheet {
            path: path.to_path_buf(),
            source,
        };

        let mut workbook = open_workbook_auto(path).map_err(spreadsheet_error)?;
        let range = match workbook.worksheet_range_at(0) {
            Some(range) => range.map_err(spreadsheet_error)?,
            None => return Err(Error::EmptyInput(path.to_path_buf())),
        };

        let mut rows = range
            .rows()
            .map(|cells| cells.iter().map(cell_text).collect::<StringRecord>());
        let headers = rows
            .next()
            .ok_or_else(|| Error::EmptyInput(path.to_path_buf()))?;

        Ok(Self {
            headers,
            rows: rows.collect(),
        })
    }
}

/// Workbook cell as the text a CSV export would contain
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        // Levels typed as numbers come back as floats
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn read_spells(sheet: Sheet, path: &Path) -> Result<Vec<SpellRecord>> {
    let columns = ColumnMap::from_headers(&sheet.headers, path)?;

    let mut records = Vec::new();
    for (row_idx, record) in sheet.rows.iter().enumerate() {
        // Skip fully blank rows (trailing lines in exported sheets)
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let row = RowReader {
            record,
            path,
            row: row_idx + 1,
        };
        match columns.build(&row) {
            Ok(spell) => records.push(spell),
            Err(e) => log::warn!("skipping row: {}", e),
        }
    }

    if records.is_empty() {
        return Err(Error::EmptyInput(path.to_path_buf()));
    }

    Ok(records)
}

/// Where class membership comes from in the header
#[derive(Debug)]
enum ClassColumns {
    /// A single "Classes" column listing names
    List(usize),
    /// One Yes/Optional/No column per class
    PerClass(Vec<(Class, usize)>),
}

/// Header positions of every column we read
#[derive(Debug)]
struct ColumnMap {
    name: usize,
    level: usize,
    school: usize,
    casting_time: usize,
    range: usize,
    components: usize,
    duration: usize,
    description: usize,
    classes: ClassColumns,
    generate: usize,
    ritual: Option<usize>,
    concentration: Option<usize>,
    verbal: Option<usize>,
    somatic: Option<usize>,
    /// The boolean "Material" column, not the component text
    material_flag: Option<usize>,
    material: Option<usize>,
    blurb: Option<usize>,
    source: Option<usize>,
    has_tables: Option<usize>,
}

/// Lowercase and drop spaces/underscores/dashes so "Casting Time" == "casting_time"
fn normalize_header(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord, path: &Path) -> Result<Self> {
        let mut index: BTreeMap<String, usize> = BTreeMap::new();
        for (i, header) in headers.iter().enumerate() {
            // First occurrence wins
            index.entry(normalize_header(header)).or_insert(i);
        }

        let find = |aliases: &[&str]| aliases.iter().find_map(|a| index.get(*a).copied());
        let require = |column: &'static str, aliases: &[&str]| {
            find(aliases).ok_or_else(|| Error::MissingColumn {
                path: path.to_path_buf(),
                column,
            })
        };

        let name = require("name", &["name", "spellname"])?;
        let level = require("level", &["level"])?;
        let school = require("school", &["school"])?;
        let casting_time = require("casting time", &["castingtime"])?;
        let range = require("range", &["range"])?;
        let components = require("components", &["components"])?;
        let duration = require("duration", &["duration"])?;
        let description = require("description", &["description"])?;

        let classes = match find(&["classes", "class"]) {
            Some(i) => ClassColumns::List(i),
            None => {
                let per_class: Vec<(Class, usize)> = Class::ALL
                    .into_iter()
                    .filter_map(|c| index.get(&normalize_header(c.name())).map(|&i| (c, i)))
                    .collect();
                if per_class.is_empty() {
                    return Err(Error::MissingColumn {
                        path: path.to_path_buf(),
                        column: "classes",
                    });
                }
                ClassColumns::PerClass(per_class)
            }
        };

        Ok(Self {
            name,
            level,
            school,
            casting_time,
            range,
            components,
            duration,
            description,
            classes,
            generate: require("generate", &["generate", "generatecard", "generatecards"])?,
            ritual: find(&["ritual"]),
            concentration: find(&["concentration"]),
            verbal: find(&["verbal"]),
            somatic: find(&["somatic"]),
            material_flag: find(&["material"]),
            material: find(&["materialcomponent", "materialcomponents"]),
            blurb: find(&["blurb"]),
            source: find(&["source"]),
            has_tables: find(&["hastables"]),
        })
    }

    fn build(&self, row: &RowReader<'_>) -> Result<SpellRecord> {
        let name = row.required(self.name, "name")?.to_string();
        let level = row
            .required(self.level, "level")?
            .parse::<Level>()
            .map_err(|e| row.invalid("level", e.to_string()))?;

        let classes = match &self.classes {
            ClassColumns::List(i) => parse_class_list(row, row.text(*i))?,
            ClassColumns::PerClass(cols) => cols
                .iter()
                .filter_map(|(class, i)| parse_availability(row.text(*i)).map(|a| (*class, a)))
                .collect(),
        };

        let components = row.text(self.components);
        // Explicit V/S/M columns win over the components text
        let listed = Requirements::from_components(components);
        let requirements = Requirements {
            concentration: row.flag(self.concentration, "concentration")?.unwrap_or(false),
            ritual: row.flag(self.ritual, "ritual")?.unwrap_or(false),
            verbal: row.flag(self.verbal, "verbal")?.unwrap_or(listed.verbal),
            somatic: row.flag(self.somatic, "somatic")?.unwrap_or(listed.somatic),
            material: row.flag(self.material_flag, "material")?.unwrap_or(listed.material),
        };

        Ok(SpellRecord {
            name,
            level,
            school: School::new(row.required(self.school, "school")?),
            casting_time: row.text(self.casting_time).to_string(),
            range: row.text(self.range).to_string(),
            components: components.to_string(),
            duration: row.text(self.duration).to_string(),
            classes,
            description: row.text(self.description).to_string(),
            generate: row.flag(Some(self.generate), "generate")?.unwrap_or(false),
            requirements,
            material: row.optional(self.material),
            blurb: row.optional(self.blurb),
            source: row.optional(self.source),
            has_tables: row.flag(self.has_tables, "has tables")?,
            row: row.row,
        })
    }
}

/// A single data row plus the context needed for error messages
struct RowReader<'a> {
    record: &'a StringRecord,
    path: &'a Path,
    row: usize,
}

impl<'a> RowReader<'a> {
    /// Trimmed cell text; missing trailing cells read as empty
    fn text(&self, index: usize) -> &'a str {
        self.record.get(index).map(str::trim).unwrap_or("")
    }

    fn required(&self, index: usize, column: &'static str) -> Result<&'a str> {
        let value = self.text(index);
        if value.is_empty() {
            Err(self.invalid(column, "value is required".to_string()))
        } else {
            Ok(value)
        }
    }

    /// Empty cells (and the "nan" pandas leaves behind) read as None
    fn optional(&self, index: Option<usize>) -> Option<String> {
        let value = self.text(index?);
        if is_blank(value) {
            None
        } else {
            Some(value.to_string())
        }
    }

    /// `None` when the column is absent or the cell is blank
    fn flag(&self, index: Option<usize>, column: &'static str) -> Result<Option<bool>> {
        let Some(index) = index else {
            return Ok(None);
        };
        let value = self.text(index);
        if is_blank(value) {
            return Ok(None);
        }
        parse_flag(value)
            .map(Some)
            .ok_or_else(|| self.invalid(column, format!("'{}' is not a yes/no value", value)))
    }

    fn invalid(&self, column: &'static str, message: String) -> Error {
        Error::InvalidField {
            path: PathBuf::from(self.path),
            row: self.row,
            column,
            message,
        }
    }
}

fn is_blank(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("nan")
}

/// Spreadsheet-style booleans
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "x" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Per-class column value. Anything other than blank/No/Optional is a listing,
/// so annotated cells like "Yes (TCE)" still count.
fn parse_availability(value: &str) -> Option<Availability> {
    match value.to_ascii_lowercase().as_str() {
        "" | "no" | "n" | "false" | "0" | "nan" => None,
        "optional" => Some(Availability::Optional),
        _ => Some(Availability::Standard),
    }
}

/// "Bard, Wizard (optional)" -> {Bard: Standard, Wizard: Optional}
fn parse_class_list(row: &RowReader<'_>, value: &str) -> Result<BTreeMap<Class, Availability>> {
    let mut classes = BTreeMap::new();

    for token in value.split([',', ';']).map(str::trim).filter(|t| !t.is_empty()) {
        let (name, availability) = match token.to_ascii_lowercase().strip_suffix("(optional)") {
            Some(rest) => (token[..rest.len()].trim(), Availability::Optional),
            None => (token, Availability::Standard),
        };

        let class = Class::lookup(name)
            .ok_or_else(|| row.invalid("classes", format!("unknown class '{}'", name)))?;
        classes.insert(class, availability);
    }

    Ok(classes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use tempfile::TempDir;

    const HEADER: &str =
        "Spell Name,Level,School,Casting Time,Range,Components,Duration,Description,Classes,Generate Card";

    /// Validate the first data row directly, without the skip-on-error pass
    fn build_first_row(csv: &str) -> Result<SpellRecord> {
        let path = Path::new("spells.csv");
        let sheet = Sheet::from_csv(csv.as_bytes(), path)?;
        let columns = ColumnMap::from_headers(&sheet.headers, path)?;
        columns.build(&RowReader {
            record: &sheet.rows[0],
            path,
            row: 1,
        })
    }

    #[test]
    fn test_parse_simple_sheet() {
        let csv = format!(
            "{}\nFireball,3,evocation,1 action,150 feet,\"V, S, M\",Instantaneous,A bright streak.,\"Sorcerer, Wizard\",TRUE\n",
            HEADER
        );
        let records = parse_spells_str(&csv, "spells.csv").unwrap();

        assert_eq!(records.len(), 1);
        let fireball = &records[0];
        assert_eq!(fireball.name, "Fireball");
        assert_eq!(fireball.level.value(), 3);
        assert_eq!(fireball.school.name(), "Evocation");
        assert_eq!(fireball.components, "V, S, M");
        assert!(fireball.generate);
        assert!(fireball.classes.contains_key(&Class::Wizard));
        assert!(fireball.classes.contains_key(&Class::Sorcerer));
        assert!(fireball.requirements.verbal && fireball.requirements.material);
        assert_eq!(fireball.has_tables, None);
        assert_eq!(fireball.row, 1);
    }

    #[test]
    fn test_duplicate_header_first_wins() {
        let csv = format!("{},Level\nLight,1,Evocation,a,b,V,d,e,Wizard,yes,12\n", HEADER);
        let records = parse_spells_str(&csv, "spells.csv").unwrap();
        assert_eq!(records[0].level.value(), 1);
    }

    #[test]
    fn test_parse_per_class_columns() {
        let csv = "Name,Level,School,Casting Time,Range,Components,Duration,Description,Bard,Wizard,Warlock,Cleric,Generate\n\
                   Light,0,Evocation,1 action,Touch,\"V, M\",1 hour,Glow.,Yes,Optional,No,Yes (TCE),false\n";
        let records = parse_spells_str(csv, "spells.csv").unwrap();

        let light = &records[0];
        assert_eq!(light.classes.get(&Class::Bard), Some(&Availability::Standard));
        assert_eq!(light.classes.get(&Class::Wizard), Some(&Availability::Optional));
        assert_eq!(light.classes.get(&Class::Cleric), Some(&Availability::Standard));
        assert!(!light.classes.contains_key(&Class::Warlock));
        assert!(!light.generate);
    }

    #[test]
    fn test_parse_optional_columns() {
        let csv = "Name,Level,School,Casting Time,Range,Components,Duration,Description,Classes,Generate,Ritual,Concentration,Material Component,Has Tables\n\
                   Detect Magic,1,Divination,1 action,Self,\"V, S\",10 minutes,Sense.,Wizard,yes,yes,yes,,no\n";
        let records = parse_spells_str(csv, "spells.csv").unwrap();

        let spell = &records[0];
        assert!(spell.requirements.ritual);
        assert!(spell.requirements.concentration);
        assert_eq!(spell.material, None);
        assert_eq!(spell.has_tables, Some(false));
    }

    #[test]
    fn test_requirement_columns_override_components() {
        let csv = "Name,Level,School,Casting Time,Range,Components,Duration,Description,Classes,Generate,Verbal,Somatic,Material,Material Component\n\
                   Shield,1,Abjuration,1 reaction,Self,\"V, S\",1 round,Ward.,Wizard,yes,TRUE,FALSE,TRUE,a silver shield\n\
                   Light,0,Evocation,1 action,Touch,\"V, M\",1 hour,Glow.,Wizard,yes,,,,\n";
        let records = parse_spells_str(csv, "spells.csv").unwrap();

        let shield = &records[0].requirements;
        assert!(shield.verbal && !shield.somatic && shield.material);
        assert_eq!(records[0].material.as_deref(), Some("a silver shield"));

        // Blank flag cells fall back to the components text
        let light = &records[1].requirements;
        assert!(light.verbal && !light.somatic && light.material);
    }

    #[test]
    fn test_class_list_optional_suffix() {
        let csv = format!("{}\nBless,1,Enchantment,1 action,30 feet,V,1 minute,Bless.,\"Cleric; Paladin (Optional)\",no\n", HEADER);
        let records = parse_spells_str(&csv, "spells.csv").unwrap();

        assert_eq!(records[0].classes.get(&Class::Cleric), Some(&Availability::Standard));
        assert_eq!(records[0].classes.get(&Class::Paladin), Some(&Availability::Optional));
        assert_eq!(records[0].class_summary(), "Cleric, Paladin (optional)");
    }

    #[test]
    fn test_missing_column() {
        let csv = "Name,Level\nFoo,1\n";
        let err = parse_spells_str(csv, "spells.csv").unwrap_err();
        assert!(matches!(err, Error::MissingColumn { column: "school", .. }));
    }

    #[test]
    fn test_invalid_level_names_row_and_column() {
        let csv = format!("{}\nBad,12,Evocation,a,b,c,d,e,Wizard,no\n", HEADER);
        let err = build_first_row(&csv).unwrap_err();
        assert!(matches!(err, Error::InvalidField { row: 1, column: "level", .. }));
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_unknown_class_names_column() {
        let csv = format!("{}\nFoo,1,Evocation,a,b,c,d,e,Monk,no\n", HEADER);
        let err = build_first_row(&csv).unwrap_err();
        assert!(matches!(err, Error::InvalidField { column: "classes", .. }));
    }

    #[test]
    fn test_bad_rows_skipped() {
        let csv = format!(
            "{}\nGood,1,Evocation,a,b,c,d,e,Wizard,yes\nTypo,2,Evocation,a,b,c,d,e,Wizzard,no\nWorse,12,Evocation,a,b,c,d,e,Wizard,no\n",
            HEADER
        );
        let records = parse_spells_str(&csv, "spells.csv").unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Good");
    }

    #[test]
    fn test_only_bad_rows_is_empty_input() {
        let csv = format!("{}\nTypo,2,Evocation,a,b,c,d,e,Wizzard,no\n", HEADER);
        let err = parse_spells_str(&csv, "spells.csv").unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
    }

    #[test]
    fn test_blank_rows_skipped_and_empty_rejected() {
        let csv = format!("{}\n,,,,,,,,,\n", HEADER);
        let err = parse_spells_str(&csv, "spells.csv").unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
    }

    #[test]
    fn test_parse_xlsx_workbook() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spell_list_inputs.xlsx");

        let mut workbook = Workbook::new();
        {
            let sheet = workbook.add_worksheet();
            for (col, header) in HEADER.split(',').enumerate() {
                sheet.write_string(0, col as u16, header).unwrap();
            }
            let text_cells = [
                (0, "Fireball"),
                (2, "Evocation"),
                (3, "1 action"),
                (4, "150 feet"),
                (5, "V, S, M"),
                (6, "Instantaneous"),
                (7, "A bright streak."),
                (8, "Sorcerer, Wizard"),
            ];
            for (col, value) in text_cells {
                sheet.write_string(1, col, value).unwrap();
            }
            sheet.write_number(1, 1, 3.0).unwrap();
            sheet.write_boolean(1, 9, true).unwrap();
        }
        workbook.save(&path).unwrap();

        let records = parse_spells(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Fireball");
        assert_eq!(records[0].level.value(), 3);
        assert!(records[0].generate);
        assert!(records[0].classes.contains_key(&Class::Sorcerer));
        assert!(records[0].requirements.somatic);
    }

    #[test]
    fn test_unreadable_workbook() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.xlsx");
        fs::write(&path, b"not a zip archive").unwrap();

        let err = parse_spells(&path).unwrap_err();
        assert!(matches!(err, Error::Spreadsheet { .. }));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Float(3.0)), "3");
        assert_eq!(cell_text(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String("Yes".into())), "Yes");
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let err = parse_spells("spell_list_inputs.numbers").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = parse_spells("definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));

        let err = parse_spells("definitely/not/here.xlsx").unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("Casting Time"), "castingtime");
        assert_eq!(normalize_header("casting_time"), "castingtime");
        assert_eq!(normalize_header(" Generate Card "), "generatecard");
    }
}
