//! Body font selection for printed cards
//!
//! Cards are printed at a fixed size, so long descriptions have to shrink or spill
//! onto a second card. The estimate is deliberately crude: each paragraph takes
//! `ceil(chars / chars_per_line)` lines plus one spacer line.

use serde::Serialize;

/// Line capacity of a card at one font size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontProfile {
    pub size_pt: f32,
    /// Body lines available on the first card (the stats block takes the rest)
    pub first_page_lines: usize,
    /// Body lines available on continuation cards
    pub page_lines: usize,
    pub chars_per_line: usize,
}

/// Supported body sizes, largest first
pub const FONT_PROFILES: [FontProfile; 3] = [
    FontProfile {
        size_pt: 8.0,
        first_page_lines: 13,
        page_lines: 26,
        chars_per_line: 54,
    },
    FontProfile {
        size_pt: 7.0,
        first_page_lines: 17,
        page_lines: 28,
        chars_per_line: 55,
    },
    FontProfile {
        size_pt: 6.5,
        first_page_lines: 20,
        page_lines: 32,
        chars_per_line: 54,
    },
];

/// Chosen body font size and where the description breaks across cards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub font_size_pt: f32,
    pub pages: usize,
    /// Index of the first block on each card; `page_starts[0]` is always 0
    pub page_starts: Vec<usize>,
}

/// Walk paragraphs of the given lengths onto cards, returning the index of the
/// paragraph that opens each card
///
/// A paragraph that doesn't fit the remaining lines moves whole to the next card.
/// An oversized paragraph at the top of a card stays put rather than leaving the
/// card empty.
pub fn paginate(paragraph_lengths: &[usize], profile: &FontProfile) -> Vec<usize> {
    let mut starts = vec![0];
    let mut line = 0;
    let mut limit = profile.first_page_lines;

    for (index, &len) in paragraph_lengths.iter().enumerate() {
        let needed = len.div_ceil(profile.chars_per_line);
        if line > 0 && line + needed > limit {
            starts.push(index);
            line = 0;
            limit = profile.page_lines;
        }
        line += needed + 1;
    }

    starts
}

/// Estimate how many cards paragraphs of the given lengths need at a font size
pub fn estimate_pages(paragraph_lengths: &[usize], profile: &FontProfile) -> usize {
    paginate(paragraph_lengths, profile).len()
}

/// Pick the largest font that fits on one card; failing that, the largest that
/// fits on two; failing that, the smallest font
pub fn choose_layout(paragraph_lengths: &[usize]) -> Layout {
    let layout_for = |profile: &FontProfile| {
        let page_starts = paginate(paragraph_lengths, profile);
        Layout {
            font_size_pt: profile.size_pt,
            pages: page_starts.len(),
            page_starts,
        }
    };

    let candidates: Vec<Layout> = FONT_PROFILES.iter().map(layout_for).collect();

    candidates
        .iter()
        .find(|l| l.pages == 1)
        .or_else(|| candidates.iter().find(|l| l.pages == 2))
        .or_else(|| candidates.last())
        .cloned()
        .unwrap_or_else(|| layout_for(&FONT_PROFILES[0]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_description_fits_largest_font() {
        let layout = choose_layout(&[120, 80]);
        assert_eq!(layout.font_size_pt, 8.0);
        assert_eq!(layout.pages, 1);
    }

    #[test]
    fn test_medium_description_shrinks() {
        // Two cards at 8pt, one at 7pt
        let layout = choose_layout(&[54 * 7, 55 * 7]);
        assert_eq!(layout.font_size_pt, 7.0);
        assert_eq!(layout.pages, 1);
    }

    #[test]
    fn test_long_description_falls_back_to_two_cards() {
        let lengths = vec![54 * 10; 4];
        assert_eq!(estimate_pages(&lengths, &FONT_PROFILES[0]), 3);
        assert_eq!(estimate_pages(&lengths, &FONT_PROFILES[1]), 3);
        assert_eq!(estimate_pages(&lengths, &FONT_PROFILES[2]), 2);

        let layout = choose_layout(&lengths);
        assert_eq!(layout.font_size_pt, 6.5);
        assert_eq!(layout.pages, 2);
    }

    #[test]
    fn test_page_starts_follow_breaks() {
        let lengths = vec![54 * 10; 4];
        assert_eq!(paginate(&lengths, &FONT_PROFILES[0]), vec![0, 1, 3]);
        assert_eq!(choose_layout(&lengths).page_starts, vec![0, 1]);
    }

    #[test]
    fn test_three_card_description() {
        // Twelve lines each; no profile gets this onto two cards
        let lengths = vec![648; 5];
        let layout = choose_layout(&lengths);
        assert_eq!(layout.font_size_pt, 6.5);
        assert_eq!(layout.pages, 3);
        assert_eq!(layout.page_starts, vec![0, 1, 3]);
    }

    #[test]
    fn test_oversized_first_paragraph_stays_on_first_card() {
        assert_eq!(paginate(&[54 * 40, 10], &FONT_PROFILES[0]), vec![0, 1]);
    }

    #[test]
    fn test_empty_description() {
        assert_eq!(estimate_pages(&[], &FONT_PROFILES[0]), 1);
        assert_eq!(choose_layout(&[]).pages, 1);
        assert_eq!(choose_layout(&[]).page_starts, vec![0]);
    }
}
