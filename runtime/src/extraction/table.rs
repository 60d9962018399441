//! Primary strategy: scan every `<table>` row by row.

use super::heuristics::{Cell, RowHeuristics, RowOutcome};
use super::strategy::{ExtractionStrategy, RowTally, UnitScan};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td, th").unwrap());

/// Table scan driven by a [`RowHeuristics`] chain.
#[derive(Default)]
pub struct TableScan {
    heuristics: RowHeuristics,
}

impl TableScan {
    pub fn new(heuristics: RowHeuristics) -> Self {
        Self { heuristics }
    }

    fn scan_table(&self, index: usize, table: ElementRef<'_>) -> UnitScan {
        let mut unit = UnitScan {
            label: table_label(index, table),
            ..UnitScan::default()
        };

        for row in table.select(&ROW_SEL) {
            unit.rows += 1;
            let cells: Vec<Cell> = row.select(&CELL_SEL).map(cell_of).collect();
            match self.heuristics.classify(&cells) {
                RowOutcome::Candidate(candidate) => unit.candidates.push(candidate),
                RowOutcome::TooShort => unit.skipped.too_short += 1,
                RowOutcome::Header => unit.skipped.header += 1,
                RowOutcome::InvalidRank => unit.skipped.invalid_rank += 1,
                RowOutcome::NoTeam => unit.skipped.no_team += 1,
            }
        }

        unit
    }
}

impl ExtractionStrategy for TableScan {
    fn name(&self) -> &'static str {
        "table-scan"
    }

    fn scan(&self, document: &Html) -> Vec<UnitScan> {
        document
            .select(&TABLE_SEL)
            .enumerate()
            .map(|(i, table)| self.scan_table(i, table))
            .collect()
    }
}

/// Visible text of an element: text nodes trimmed and joined by one space.
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn cell_of(el: ElementRef<'_>) -> Cell {
    Cell {
        text: element_text(el),
        class: el.value().attr("class").map(str::to_string),
    }
}

fn table_label(index: usize, table: ElementRef<'_>) -> String {
    let mut label = format!("table[{index}]");
    if let Some(id) = table.value().id() {
        label.push('#');
        label.push_str(id);
    }
    if let Some(class) = table.value().attr("class") {
        for c in class.split_whitespace() {
            label.push('.');
            label.push_str(c);
        }
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rankings::RawCandidate;

    fn scan(html: &str) -> Vec<UnitScan> {
        TableScan::default().scan(&Html::parse_document(html))
    }

    #[test]
    fn test_scan_counts_skips_per_table() {
        let units = scan(
            r#"<table id="poll" class="rankings wide">
                <tr><th>Rank</th><th>Team</th><th>Record</th></tr>
                <tr><td>1</td><td>Georgia Bulldogs</td><td>12-1</td></tr>
                <tr><td>26</td><td>Nobody</td><td>1-11</td></tr>
                <tr><td colspan="3">Others receiving votes</td></tr>
              </table>
              <table><tr><td>a</td><td>b</td><td>c</td></tr></table>"#,
        );
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].label, "table[0]#poll.rankings.wide");
        assert_eq!(units[0].rows, 4);
        assert_eq!(
            units[0].skipped,
            RowTally {
                too_short: 1,
                header: 1,
                invalid_rank: 1,
                no_team: 0,
            }
        );
        assert_eq!(
            units[0].candidates,
            vec![RawCandidate {
                rank: 1,
                team: "Georgia Bulldogs".to_string(),
                record: "12-1".to_string(),
            }]
        );
        assert!(units[1].is_zero_rows());
    }

    #[test]
    fn test_cell_text_joins_nested_nodes() {
        let units = scan(
            r#"<table><tr>
                <td><span>#</span>3</td>
                <td><img alt="Logo"><a href="/t/osu"> Ohio State </a>
                    <span class="mascot">Buckeyes</span></td>
                <td>11-1</td></tr></table>"#,
        );
        assert_eq!(units[0].candidates[0].rank, 3);
        assert_eq!(units[0].candidates[0].team, "Ohio State Buckeyes");
    }
}
