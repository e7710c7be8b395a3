//! Row selection by class/level filters or the generate column

use crate::error::Result;
use crate::spell::{Class, Level, SpellRecord};
use std::collections::BTreeSet;

/// User-supplied selection criteria
///
/// When both sets are empty, selection falls back to each record's generate flag.
/// Otherwise levels and classes combine with AND, and each set matches on any member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub classes: BTreeSet<Class>,
    pub levels: BTreeSet<Level>,
}

impl FilterCriteria {
    /// Create empty criteria (generate-flag mode)
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse comma-separated class and level lists as given on the command line
    pub fn parse(classes: Option<&str>, levels: Option<&str>) -> Result<Self> {
        Ok(Self {
            classes: classes.map(parse_class_list).transpose()?.unwrap_or_default(),
            levels: levels.map(parse_level_list).transpose()?.unwrap_or_default(),
        })
    }

    /// Builder-style class restriction
    pub fn with_classes(mut self, classes: impl IntoIterator<Item = Class>) -> Self {
        self.classes.extend(classes);
        self
    }

    /// Builder-style level restriction
    pub fn with_levels(mut self, levels: impl IntoIterator<Item = Level>) -> Self {
        self.levels.extend(levels);
        self
    }

    /// Check if no explicit filter was given
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.levels.is_empty()
    }

    /// Check if a single record passes
    pub fn matches(&self, record: &SpellRecord) -> bool {
        if self.is_empty() {
            return record.generate;
        }

        let level_ok = self.levels.is_empty() || self.levels.contains(&record.level);
        let class_ok = self.classes.is_empty() || record.has_any_class(self.classes.iter());
        level_ok && class_ok
    }
}

/// Select the records to render, preserving input order
pub fn select<'a>(records: &'a [SpellRecord], criteria: &FilterCriteria) -> Vec<&'a SpellRecord> {
    records.iter().filter(|r| criteria.matches(r)).collect()
}

/// Split a comma-separated list, ignoring blank entries
fn tokens(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|t| !t.is_empty())
}

fn parse_class_list(list: &str) -> Result<BTreeSet<Class>> {
    tokens(list).map(str::parse::<Class>).collect()
}

fn parse_level_list(list: &str) -> Result<BTreeSet<Level>> {
    tokens(list).map(str::parse::<Level>).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::spell::{Availability, Requirements, School};
    use std::collections::BTreeMap;

    fn spell(name: &str, level: u8, classes: &[Class], generate: bool) -> SpellRecord {
        SpellRecord {
            name: name.to_string(),
            level: Level::new(level).unwrap(),
            school: School::new("Evocation"),
            casting_time: "1 action".to_string(),
            range: "Self".to_string(),
            components: "V".to_string(),
            duration: "Instantaneous".to_string(),
            classes: classes
                .iter()
                .map(|c| (*c, Availability::Standard))
                .collect::<BTreeMap<_, _>>(),
            description: String::new(),
            generate,
            requirements: Requirements::default(),
            material: None,
            blurb: None,
            source: None,
            has_tables: None,
            row: 0,
        }
    }

    fn names(selected: &[&SpellRecord]) -> Vec<String> {
        selected.iter().map(|r| r.name.clone()).collect()
    }

    fn sample() -> Vec<SpellRecord> {
        vec![
            spell("Fire Bolt", 0, &[Class::Sorcerer, Class::Wizard], false),
            spell("Cure Wounds", 1, &[Class::Bard, Class::Cleric], true),
            spell("Fireball", 3, &[Class::Sorcerer, Class::Wizard], false),
            spell("Mass Heal", 9, &[Class::Cleric], true),
            spell("Shield", 1, &[Class::Wizard], false),
        ]
    }

    #[test]
    fn test_generate_flag_fallback() {
        let records = sample();
        let selected = select(&records, &FilterCriteria::new());
        assert_eq!(names(&selected), vec!["Cure Wounds", "Mass Heal"]);
    }

    #[test]
    fn test_all_false_generate_selects_nothing() {
        let records: Vec<_> = sample()
            .into_iter()
            .map(|mut r| {
                r.generate = false;
                r
            })
            .collect();
        assert!(select(&records, &FilterCriteria::new()).is_empty());
    }

    #[test]
    fn test_levels_only_preserves_order() {
        let records = sample();
        let criteria = FilterCriteria::parse(None, Some("9,1")).unwrap();
        let selected = select(&records, &criteria);
        assert_eq!(names(&selected), vec!["Cure Wounds", "Mass Heal", "Shield"]);
    }

    #[test]
    fn test_classes_only_ignores_generate_flag() {
        let records = sample();
        let criteria = FilterCriteria::parse(Some("wizard"), None).unwrap();
        let selected = select(&records, &criteria);
        assert_eq!(names(&selected), vec!["Fire Bolt", "Fireball", "Shield"]);
    }

    #[test]
    fn test_classes_and_levels_combine_with_and() {
        let records = sample();
        let criteria = FilterCriteria::parse(Some("Cleric,Wizard"), Some("1")).unwrap();
        let selected = select(&records, &criteria);
        assert_eq!(names(&selected), vec!["Cure Wounds", "Shield"]);
    }

    #[test]
    fn test_optional_availability_counts() {
        let mut record = spell("Aid", 2, &[Class::Cleric], false);
        record.classes.insert(Class::Ranger, Availability::Optional);
        let criteria = FilterCriteria::new().with_classes([Class::Ranger]);
        assert!(criteria.matches(&record));
    }

    #[test]
    fn test_invalid_tokens_fail() {
        assert!(matches!(
            FilterCriteria::parse(Some("Wizard,Monk"), None),
            Err(Error::UnknownClass(ref t)) if t == "Monk"
        ));
        assert!(matches!(
            FilterCriteria::parse(None, Some("1,10")),
            Err(Error::InvalidLevel(ref t)) if t == "10"
        ));
        assert!(matches!(
            FilterCriteria::parse(None, Some("one")),
            Err(Error::InvalidLevel(_))
        ));
    }

    #[test]
    fn test_blank_tokens_ignored() {
        let criteria = FilterCriteria::parse(Some("bard, ,"), Some("2,")).unwrap();
        assert_eq!(criteria.classes.len(), 1);
        assert_eq!(criteria.levels.len(), 1);
    }
}
