//! Card rendering: turns one spell row into a structured card document

use crate::error::Result;
use crate::fragment::{TableFragment, TableLoader};
use crate::layout::{choose_layout, Layout};
use crate::markup::{translate, TextBlock};
use crate::spell::{Level, Requirements, School, SpellRecord};
use serde::Serialize;

/// Attribution printed at the bottom of every card
pub const FOOTER_ATTRIBUTION: &str =
    "Made with spellcards. Spell text belongs to its publisher; for personal table use only.";

/// Table rows that fit on one card. Tables are never split, so a single larger
/// table still gets a card of its own.
pub const TABLE_ROW_LIMIT_PER_PAGE: usize = 19;

/// One labelled value in the stats block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatLine {
    pub label: &'static str,
    pub value: String,
}

impl StatLine {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }
}

/// A rendered card, ready to hand to a [`DocumentWriter`](crate::writer::DocumentWriter)
#[derive(Debug, Clone, Serialize)]
pub struct CardDocument {
    pub name: String,
    pub level: Level,
    /// "Cantrip", "1st", ... "9th"
    pub level_label: &'static str,
    pub school: School,
    /// School accent color, hex without '#'
    pub color: &'static str,
    /// Casting time, range, components, duration, then optional extras
    pub stats: Vec<StatLine>,
    pub blurb: Option<String>,
    pub blocks: Vec<TextBlock>,
    pub tables: Vec<TableFragment>,
    /// Indices into `tables`, grouped by the card they print on
    pub table_pages: Vec<Vec<usize>>,
    pub footer: String,
    pub layout: Layout,
    pub requirements: Requirements,
}

impl CardDocument {
    /// Description blocks split at the layout's card breaks
    pub fn description_parts(&self) -> Vec<&[TextBlock]> {
        let starts = &self.layout.page_starts;
        starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = starts.get(i + 1).copied().unwrap_or(self.blocks.len());
                let start = start.min(self.blocks.len());
                &self.blocks[start..end.clamp(start, self.blocks.len())]
            })
            .collect()
    }

    /// Description cards followed by table cards
    pub fn part_count(&self) -> usize {
        self.layout.pages + self.table_pages.len()
    }

    /// Part number of table card `group` (0-based); tables follow the description
    pub fn table_part(&self, group: usize) -> usize {
        self.layout.pages + 1 + group
    }

    /// Whether the card spills onto continuation cards
    pub fn is_multipart(&self) -> bool {
        self.part_count() > 1
    }

    /// Name as shown on part `part` (1-based)
    pub fn part_title(&self, part: usize) -> String {
        if self.is_multipart() {
            format!("{} (Part {})", self.name, part)
        } else {
            self.name.clone()
        }
    }

    /// Header line: name, level label and school
    pub fn title_line(&self) -> String {
        format!("{} | {} | {}", self.part_title(1), self.level_label, self.school)
    }

    /// Output file stem derived from the spell name
    pub fn file_stem(&self) -> String {
        crate::spell::file_stem(&self.name)
    }
}

/// Assemble a card from a record and its already-translated parts
pub fn render(
    record: &SpellRecord,
    blocks: Vec<TextBlock>,
    tables: Vec<TableFragment>,
) -> CardDocument {
    let mut casting_time = record.casting_time.clone();
    if record.requirements.ritual && !casting_time.to_lowercase().contains("ritual") {
        casting_time.push_str(" (ritual)");
    }

    let mut duration = record.duration.clone();
    if record.requirements.concentration && !duration.to_lowercase().contains("concentration") {
        duration = format!("Concentration, {}", duration);
    }

    let mut stats = vec![
        StatLine::new("Casting Time", casting_time),
        StatLine::new("Range", record.range.as_str()),
        StatLine::new("Components", record.components.as_str()),
        StatLine::new("Duration", duration),
    ];
    let requirements = record.requirements.labels();
    if !requirements.is_empty() {
        stats.push(StatLine::new("Requirements", requirements.join(", ")));
    }
    if let Some(material) = &record.material {
        stats.push(StatLine::new("Material", material.as_str()));
    }
    if !record.classes.is_empty() {
        stats.push(StatLine::new("Classes", record.class_summary()));
    }

    let lengths: Vec<usize> = blocks.iter().map(|b| b.plain_text().chars().count()).collect();
    let layout = choose_layout(&lengths);
    let row_counts: Vec<usize> = tables.iter().map(|t| t.rows.len()).collect();
    let table_pages = pack_tables(&row_counts);

    let footer = match &record.source {
        Some(source) => format!("Source: {}. {}", source, FOOTER_ATTRIBUTION),
        None => FOOTER_ATTRIBUTION.to_string(),
    };

    CardDocument {
        name: record.name.clone(),
        level: record.level,
        level_label: record.level.label(),
        school: record.school.clone(),
        color: record.school.color(),
        stats,
        blurb: record.blurb.clone(),
        blocks,
        tables,
        table_pages,
        footer,
        layout,
        requirements: record.requirements,
    }
}

/// Group tables onto cards after the description. The first table always opens
/// a new card; later ones share it while the row total stays within
/// [`TABLE_ROW_LIMIT_PER_PAGE`].
pub fn pack_tables(row_counts: &[usize]) -> Vec<Vec<usize>> {
    let mut pages: Vec<Vec<usize>> = Vec::new();
    let mut rows_on_page = 0;

    for (index, &count) in row_counts.iter().enumerate() {
        match pages.last_mut() {
            Some(page) if rows_on_page + count <= TABLE_ROW_LIMIT_PER_PAGE => {
                page.push(index);
                rows_on_page += count;
            }
            _ => {
                pages.push(vec![index]);
                rows_on_page = count;
            }
        }
    }

    pages
}

/// Load fragments 0, 1, 2, ... for a spell, stopping at the first missing index
pub fn load_tables(loader: &TableLoader, record: &SpellRecord) -> Result<Vec<TableFragment>> {
    if record.has_tables == Some(false) {
        return Ok(Vec::new());
    }

    let mut tables = Vec::new();
    while let Some(table) = loader.load(&record.name, tables.len())? {
        tables.push(table);
    }
    Ok(tables)
}

/// Translate, load tables and render a single record
pub fn build_card(record: &SpellRecord, loader: &TableLoader) -> Result<CardDocument> {
    let blocks = translate(&record.description);
    let tables = load_tables(loader, record)?;
    Ok(render(record, blocks, tables))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::Run;
    use crate::spell::{Availability, Class};
    use rstest::rstest;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn fireball() -> SpellRecord {
        let mut classes = BTreeMap::new();
        classes.insert(Class::Sorcerer, Availability::Standard);
        classes.insert(Class::Wizard, Availability::Standard);

        SpellRecord {
            name: "Fireball".to_string(),
            level: Level::new(3).unwrap(),
            school: School::new("evocation"),
            casting_time: "1 action".to_string(),
            range: "150 feet".to_string(),
            components: "V, S, M".to_string(),
            duration: "Instantaneous".to_string(),
            classes,
            description: "A bright streak flashes.|<b>At Higher Levels.</b> More damage.".to_string(),
            generate: true,
            requirements: Requirements::from_components("V, S, M"),
            material: Some("a tiny ball of bat guano and sulfur".to_string()),
            blurb: None,
            source: Some("PHB".to_string()),
            has_tables: None,
            row: 1,
        }
    }

    #[rstest]
    #[case(0, "Cantrip")]
    #[case(1, "1st")]
    #[case(2, "2nd")]
    #[case(3, "3rd")]
    #[case(4, "4th")]
    #[case(9, "9th")]
    fn test_level_labels(#[case] level: u8, #[case] label: &str) {
        let mut record = fireball();
        record.level = Level::new(level).unwrap();
        let card = render(&record, Vec::new(), Vec::new());
        assert_eq!(card.level_label, label);
    }

    #[test]
    fn test_render_layout() {
        let record = fireball();
        let card = render(&record, translate(&record.description), Vec::new());

        assert_eq!(card.title_line(), "Fireball | 3rd | Evocation");
        assert_eq!(card.color, "c00000");
        let labels: Vec<&str> = card.stats.iter().map(|s| s.label).collect();
        assert_eq!(
            labels,
            vec![
                "Casting Time",
                "Range",
                "Components",
                "Duration",
                "Requirements",
                "Material",
                "Classes"
            ]
        );
        assert_eq!(card.stats[4].value, "Verbal, Somatic, Material");
        assert_eq!(card.stats[6].value, "Sorcerer, Wizard");
        assert_eq!(card.blocks.len(), 2);
        assert!(card.footer.starts_with("Source: PHB."));
        assert!(!card.is_multipart());
    }

    #[test]
    fn test_ritual_and_concentration_markers() {
        let mut record = fireball();
        record.requirements.ritual = true;
        record.requirements.concentration = true;
        record.duration = "up to 1 minute".to_string();

        let card = render(&record, Vec::new(), Vec::new());
        assert_eq!(card.stats[0].value, "1 action (ritual)");
        assert_eq!(card.stats[3].value, "Concentration, up to 1 minute");
        assert_eq!(
            card.stats[4].value,
            "Concentration, Ritual, Verbal, Somatic, Material"
        );
        assert!(card.requirements.concentration);
    }

    #[test]
    fn test_no_requirements_line_when_none_set() {
        let mut record = fireball();
        record.requirements = Requirements::default();
        let card = render(&record, Vec::new(), Vec::new());
        assert!(card.stats.iter().all(|s| s.label != "Requirements"));
    }

    fn table_with_rows(rows: usize) -> TableFragment {
        let row = vec![crate::fragment::TableCell {
            runs: vec![Run::plain("x")],
            header: false,
            colspan: 1,
        }];
        TableFragment {
            rows: vec![row; rows],
            source: "Fireball_table0.html".into(),
        }
    }

    #[test]
    fn test_tables_make_card_multipart() {
        let record = fireball();
        let card = render(&record, Vec::new(), vec![table_with_rows(1)]);

        assert!(card.is_multipart());
        assert_eq!(card.part_count(), 2);
        assert_eq!(card.table_part(0), 2);
        assert_eq!(card.part_title(2), "Fireball (Part 2)");
        assert!(card.title_line().starts_with("Fireball (Part 1) |"));
    }

    #[test]
    fn test_pack_tables_by_row_limit() {
        assert_eq!(pack_tables(&[10, 9, 5, 25]), vec![vec![0, 1], vec![2], vec![3]]);
        assert_eq!(pack_tables(&[19]), vec![vec![0]]);
        assert!(pack_tables(&[]).is_empty());
    }

    #[test]
    fn test_table_parts_follow_description_parts() {
        let mut record = fireball();
        record.description = vec!["x".repeat(540); 4].join("|");
        let blocks = translate(&record.description);
        let card = render(&record, blocks, vec![table_with_rows(12), table_with_rows(12)]);

        assert_eq!(card.layout.pages, 2);
        assert_eq!(card.description_parts().len(), 2);
        assert_eq!(card.description_parts()[0].len(), 1);
        assert_eq!(card.table_pages, vec![vec![0], vec![1]]);
        assert_eq!(card.part_count(), 4);
        assert_eq!(card.table_part(0), 3);
        assert_eq!(card.table_part(1), 4);
    }

    #[test]
    fn test_long_description_without_tables_is_multipart() {
        let mut record = fireball();
        record.description = vec!["x".repeat(648); 5].join("|");
        let card = render(&record, translate(&record.description), Vec::new());

        assert!(card.is_multipart());
        assert_eq!(card.part_count(), 3);
        let sizes: Vec<usize> = card.description_parts().iter().map(|p| p.len()).collect();
        assert_eq!(sizes, vec![1, 2, 2]);
    }

    #[test]
    fn test_load_tables_stops_at_gap() {
        let dir = TempDir::new().unwrap();
        let table = "<table><tr><td>x</td></tr></table>";
        fs::write(dir.path().join("Fireball_table0.html"), table).unwrap();
        fs::write(dir.path().join("Fireball_table1.html"), table).unwrap();
        fs::write(dir.path().join("Fireball_table3.html"), table).unwrap();

        let loader = TableLoader::new(dir.path());
        let tables = load_tables(&loader, &fireball()).unwrap();
        assert_eq!(tables.len(), 2);
    }

    #[test]
    fn test_has_tables_false_skips_lookup() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Fireball_table0.html"), "not a table").unwrap();

        let mut record = fireball();
        record.has_tables = Some(false);
        let loader = TableLoader::new(dir.path());
        assert!(load_tables(&loader, &record).unwrap().is_empty());

        record.has_tables = None;
        assert!(load_tables(&loader, &record).is_err());
    }
}
