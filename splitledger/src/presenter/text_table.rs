use std::{borrow::Cow, fmt::Write};

const COLUMN_GAP: usize = 2;

/// First code point of the wide scripts (Hangul Jamo onwards).
const WIDE_FROM: char = '\u{1100}';

/// Terminal columns taken by `text`. Code points below [`WIDE_FROM`] take
/// one cell, the rest are counted as two.
fn display_width(text: &str) -> usize {
    text.chars().map(|c| if c < WIDE_FROM { 1 } else { 2 }).sum()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

/// Fixed-width plain text table.
#[derive(Default)]
pub struct TextTableBuilder<'a> {
    headers: &'a [&'a str],
    alignments: Cow<'a, [Alignment]>,
    rows: Vec<Vec<Cow<'a, str>>>,
}

impl<'a> TextTableBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alignments(mut self, alignments: &'a [Alignment]) -> Self {
        self.alignments = Cow::Borrowed(alignments);
        self
    }

    pub fn headers(mut self, headers: &'a [&'a str]) -> Self {
        self.headers = headers;
        if self.alignments.is_empty() {
            self.alignments = Cow::Owned(vec![Alignment::default(); headers.len()]);
        }
        self
    }

    pub fn row<I>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = Cow<'a, str>>,
    {
        self.rows.push(cells.into_iter().collect());
        self
    }

    pub fn build(self) -> String {
        let col_count = self.headers.len();
        if col_count == 0 {
            return String::new();
        }

        let mut widths: Vec<usize> = self.headers.iter().map(|h| display_width(h)).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(display_width(cell));
            }
        }

        let mut out = String::new();
        self.write_line(&mut out, self.headers.iter().copied(), &widths);
        let rule_len = widths.iter().sum::<usize>() + COLUMN_GAP * (col_count - 1);
        let _ = writeln!(out, "{}", "-".repeat(rule_len));
        for row in &self.rows {
            self.write_line(&mut out, row.iter().map(AsRef::as_ref), &widths);
        }
        out
    }

    fn write_line<'s>(
        &self,
        out: &mut String,
        cells: impl Iterator<Item = &'s str>,
        widths: &[usize],
    ) {
        let mut line = String::new();
        for (idx, (cell, width)) in cells.zip(widths).enumerate() {
            if idx > 0 {
                line.push_str(&" ".repeat(COLUMN_GAP));
            }
            // `format!` widths count chars, not columns.
            let pad = " ".repeat(width.saturating_sub(display_width(cell)));
            match self.alignments.get(idx).copied().unwrap_or_default() {
                Alignment::Left => {
                    line.push_str(cell);
                    line.push_str(&pad);
                }
                Alignment::Right => {
                    line.push_str(&pad);
                    line.push_str(cell);
                }
            }
        }
        let _ = writeln!(out, "{}", line.trim_end());
    }
}
