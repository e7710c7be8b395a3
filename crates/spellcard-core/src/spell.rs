//! Core spell types read from the input sheet

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Spellcasting classes a spell can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Class {
    Artificer,
    Bard,
    Cleric,
    Druid,
    Paladin,
    Ranger,
    Sorcerer,
    Warlock,
    Wizard,
}

impl Class {
    /// Every supported class, in display order
    pub const ALL: [Class; 9] = [
        Class::Artificer,
        Class::Bard,
        Class::Cleric,
        Class::Druid,
        Class::Paladin,
        Class::Ranger,
        Class::Sorcerer,
        Class::Warlock,
        Class::Wizard,
    ];

    /// Display name (also the per-class column header)
    pub fn name(self) -> &'static str {
        match self {
            Class::Artificer => "Artificer",
            Class::Bard => "Bard",
            Class::Cleric => "Cleric",
            Class::Druid => "Druid",
            Class::Paladin => "Paladin",
            Class::Ranger => "Ranger",
            Class::Sorcerer => "Sorcerer",
            Class::Warlock => "Warlock",
            Class::Wizard => "Wizard",
        }
    }

    /// Case-insensitive lookup by name
    pub fn lookup(token: &str) -> Option<Class> {
        let token = token.trim();
        Class::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(token))
    }
}

impl FromStr for Class {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Class::lookup(s).ok_or_else(|| Error::UnknownClass(s.trim().to_string()))
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Card labels indexed by level
const LEVEL_LABELS: [&str; 10] = [
    "Cantrip", "1st", "2nd", "3rd", "4th", "5th", "6th", "7th", "8th", "9th",
];

/// A spell level in 0..=9 (0 is a cantrip)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Level(u8);

impl Level {
    /// Highest spell level
    pub const MAX: u8 = 9;

    /// Create a level, rejecting values above 9
    pub fn new(value: u8) -> Option<Level> {
        (value <= Self::MAX).then_some(Level(value))
    }

    /// Numeric value
    pub fn value(self) -> u8 {
        self.0
    }

    /// Check if this is a cantrip
    pub fn is_cantrip(self) -> bool {
        self.0 == 0
    }

    /// "Cantrip" for level 0, otherwise the ordinal ("1st", "2nd", ...)
    pub fn label(self) -> &'static str {
        LEVEL_LABELS[self.0 as usize]
    }

    /// All levels in ascending order
    pub fn all() -> impl Iterator<Item = Level> {
        (0..=Self::MAX).map(Level)
    }
}

impl TryFrom<u8> for Level {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Level::new(value).ok_or_else(|| Error::InvalidLevel(value.to_string()))
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> u8 {
        level.0
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("cantrip") {
            return Ok(Level(0));
        }
        trimmed
            .parse::<u8>()
            .ok()
            .and_then(Level::new)
            .ok_or_else(|| Error::InvalidLevel(trimmed.to_string()))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accent colors per school; anything unrecognized falls back to grey
const SCHOOL_COLORS: [(&str, &str); 8] = [
    ("Abjuration", "00b0f0"),
    ("Conjuration", "ed7d31"),
    ("Divination", "808080"),
    ("Enchantment", "ff85ff"),
    ("Evocation", "c00000"),
    ("Illusion", "7030a0"),
    ("Necromancy", "00b050"),
    ("Transmutation", "833c0b"),
];

const FALLBACK_COLOR: &str = "aaaaaa";

/// School of magic. Unknown schools are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct School(String);

impl School {
    /// Normalize a school name, title-casing known schools
    pub fn new(name: &str) -> School {
        let name = name.trim();
        match SCHOOL_COLORS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
        {
            Some((known, _)) => School((*known).to_string()),
            None => School(name.to_string()),
        }
    }

    /// School name as displayed on the card
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Hex accent color (without '#')
    pub fn color(&self) -> &'static str {
        SCHOOL_COLORS
            .iter()
            .find(|(known, _)| *known == self.0)
            .map(|(_, color)| *color)
            .unwrap_or(FALLBACK_COLOR)
    }
}

impl fmt::Display for School {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for School {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// How a class gets access to a spell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    /// On the class spell list
    Standard,
    /// Optional class feature access
    Optional,
}

/// Casting requirement indicators shown on the card, in display order:
/// concentration, ritual, verbal, somatic, material
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Requirements {
    pub concentration: bool,
    pub ritual: bool,
    pub verbal: bool,
    pub somatic: bool,
    pub material: bool,
}

impl Requirements {
    /// Read V/S/M from a components string like "V, S, M (a pinch of sulfur)"
    pub fn from_components(components: &str) -> Self {
        let mut requirements = Requirements::default();
        for token in components.split(',') {
            let letter = token
                .trim()
                .split(|c: char| !c.is_alphabetic())
                .next()
                .unwrap_or("");
            match letter.to_ascii_uppercase().as_str() {
                "V" => requirements.verbal = true,
                "S" => requirements.somatic = true,
                "M" => requirements.material = true,
                _ => {}
            }
        }
        requirements
    }

    /// Each indicator with its label, in display order
    pub fn indicators(&self) -> [(&'static str, bool); 5] {
        [
            ("Concentration", self.concentration),
            ("Ritual", self.ritual),
            ("Verbal", self.verbal),
            ("Somatic", self.somatic),
            ("Material", self.material),
        ]
    }

    /// Labels of the indicators that are set
    pub fn labels(&self) -> Vec<&'static str> {
        self.indicators()
            .into_iter()
            .filter(|(_, set)| *set)
            .map(|(label, _)| label)
            .collect()
    }
}

/// One validated row of the spell sheet
#[derive(Debug, Clone)]
pub struct SpellRecord {
    pub name: String,
    pub level: Level,
    pub school: School,
    pub casting_time: String,
    pub range: String,
    pub components: String,
    pub duration: String,
    pub classes: BTreeMap<Class, Availability>,
    /// Raw description: '|' separates paragraphs, inline HTML-like tags
    pub description: String,
    /// The "Generate Card" column
    pub generate: bool,
    pub requirements: Requirements,
    /// The "Material Component" text, e.g. "a pinch of sulfur"
    pub material: Option<String>,
    pub blurb: Option<String>,
    pub source: Option<String>,
    /// `None` when the sheet has no "Has Tables" column
    pub has_tables: Option<bool>,
    /// 1-based data row in the source file
    pub row: usize,
}

impl SpellRecord {
    /// Check if any class in `classes` can cast this spell
    pub fn has_any_class<'a>(&self, mut classes: impl Iterator<Item = &'a Class>) -> bool {
        classes.any(|c| self.classes.contains_key(c))
    }

    /// File stem used for both card output and table fragment lookup
    pub fn file_stem(&self) -> String {
        file_stem(&self.name)
    }

    /// "Bard, Wizard (optional)" style class listing
    pub fn class_summary(&self) -> String {
        self.classes
            .iter()
            .map(|(class, availability)| match availability {
                Availability::Standard => class.name().to_string(),
                Availability::Optional => format!("{} (optional)", class.name()),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Derive a filesystem-safe file stem from a spell name
///
/// Path separators and characters reserved on common filesystems become '-'.
/// "Antipathy/Sympathy" -> "Antipathy-Sympathy"
pub fn file_stem(name: &str) -> String {
    const RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

    let stem: String = name
        .trim()
        .chars()
        .map(|c| if RESERVED.contains(&c) || c.is_control() { '-' } else { c })
        .collect();
    let stem = stem.trim_end_matches(['.', ' ']);

    if stem.is_empty() {
        "unnamed".to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_lookup_case_insensitive() {
        assert_eq!(Class::lookup("wizard"), Some(Class::Wizard));
        assert_eq!(Class::lookup(" BARD "), Some(Class::Bard));
        assert_eq!(Class::lookup("Monk"), None);
    }

    #[test]
    fn test_class_from_str_error_names_token() {
        let err = "Monk".parse::<Class>().unwrap_err();
        assert!(matches!(err, Error::UnknownClass(ref t) if t == "Monk"));
    }

    #[test]
    fn test_level_bounds() {
        assert!(Level::new(0).is_some());
        assert!(Level::new(9).is_some());
        assert!(Level::new(10).is_none());
        assert_eq!(Level::all().count(), 10);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("3".parse::<Level>().unwrap().value(), 3);
        assert_eq!("Cantrip".parse::<Level>().unwrap().value(), 0);
        assert!(matches!("10".parse::<Level>(), Err(Error::InvalidLevel(_))));
        assert!(matches!("-1".parse::<Level>(), Err(Error::InvalidLevel(_))));
        assert!(matches!("three".parse::<Level>(), Err(Error::InvalidLevel(_))));
    }

    #[test]
    fn test_school_colors() {
        assert_eq!(School::new("evocation").name(), "Evocation");
        assert_eq!(School::new("Evocation").color(), "c00000");
        assert_eq!(School::new("Chronurgy").color(), "aaaaaa");
        assert_eq!(School::new("Chronurgy").name(), "Chronurgy");
    }

    #[test]
    fn test_requirements_from_components() {
        let r = Requirements::from_components("V, S, M (a tiny ball of bat guano)");
        assert!(r.verbal && r.somatic && r.material);
        assert!(!r.ritual && !r.concentration);

        let r = Requirements::from_components("s");
        assert_eq!(r.labels(), vec!["Somatic"]);

        assert_eq!(Requirements::from_components("").labels(), Vec::<&str>::new());
        assert!(!Requirements::from_components("Varies").verbal);
    }

    #[test]
    fn test_requirement_label_order() {
        let r = Requirements {
            concentration: true,
            ritual: true,
            verbal: true,
            somatic: false,
            material: true,
        };
        assert_eq!(r.labels(), vec!["Concentration", "Ritual", "Verbal", "Material"]);
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("Antipathy/Sympathy"), "Antipathy-Sympathy");
        assert_eq!(file_stem("  Fireball "), "Fireball");
        assert_eq!(file_stem("What?"), "What-");
        assert_eq!(file_stem("..."), "unnamed");
    }
}
