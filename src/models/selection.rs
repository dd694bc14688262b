use std::fmt;
use std::fmt::{Display, Formatter};

use crate::types::Year;

/// The predicate deciding which transactions a backfill run targets.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Selection {
    /// Every transaction of one accounting year.
    Year(Year),
    /// Every transaction whose USD amount was never populated, across all years.
    ZeroUsd
}

impl Selection {
    /// Whether a run spans several years and so reports a per-year breakdown.
    pub fn is_cross_year(&self) -> bool {
        matches!(self, Selection::ZeroUsd)
    }

    /// How many records are processed between two progress lines.
    pub fn default_progress_interval(&self) -> usize {
        match self {
            Selection::Year(_) => 20,
            Selection::ZeroUsd => 50
        }
    }
}

impl Display for Selection {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Year(year) => write!(formatter, "year == {year}"),
            Selection::ZeroUsd => write!(formatter, "amount_usd == 0")
        }
    }
}
