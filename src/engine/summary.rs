use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};

use crate::models::Selection;
use crate::types::Year;

/// Counters accumulated over one backfill run.
#[derive(Debug, Clone, PartialEq)]
pub struct BackfillSummary {
    pub selection: Selection,
    pub dry_run: bool,
    /// Records returned by the selection.
    pub selected: usize,
    /// Records whose point update succeeded (or would have, on a dry run).
    pub updated: usize,
    /// Updated records whose stored value actually differed from the derived one.
    pub changed: usize,
    /// Records that failed and were left as they were.
    pub skipped: usize,
    /// Updated counts per accounting year. Only filled for cross-year selections.
    pub updated_by_year: BTreeMap<Year, usize>
}

impl BackfillSummary {
    pub fn new(selection: Selection, selected: usize, dry_run: bool) -> Self {
        Self {
            selection,
            dry_run,
            selected,
            updated: 0,
            changed: 0,
            skipped: 0,
            updated_by_year: BTreeMap::new()
        }
    }

    pub fn record_update(&mut self, year: Year, changed: bool) {
        self.updated += 1;

        if changed {
            self.changed += 1;
        }

        if self.selection.is_cross_year() {
            *self.updated_by_year.entry(year).or_insert(0) += 1;
        }
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }
}

impl Display for BackfillSummary {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let mode = if self.dry_run { ", dry run" } else { "" };

        writeln!(formatter, "Backfill summary ({}{mode})", self.selection)?;
        writeln!(formatter, "  selected: {}", self.selected)?;
        writeln!(formatter, "  updated:  {}", self.updated)?;
        writeln!(formatter, "  changed:  {}", self.changed)?;
        write!(formatter, "  skipped:  {}", self.skipped)?;

        if self.selection.is_cross_year() {
            write!(formatter, "\n  updated by year:")?;

            if self.updated_by_year.is_empty() {
                write!(formatter, " none")?;
            }

            for (year, count) in &self.updated_by_year {
                write!(formatter, "\n    {year}: {count}")?;
            }
        }

        Ok(())
    }
}
