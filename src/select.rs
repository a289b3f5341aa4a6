//! # Time Index Selection
//!
//! Selects the entries of a time axis that fall within an inclusive year range
//! and a subset of the months of the year. The axis can be given already
//! decoded (any [`CalendarDate`]) or as raw numbers with CF units and calendar.
//!
//! An empty selection is a valid result, never an error.

use crate::calendar::{CalendarDate, CfDatetime, TimeDecoder};
use crate::error::{ArchiveError, ArchiveResult};
use crate::labels::DateRange;
use log::debug;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What a selection returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectMode {
    /// Boolean mask aligned with the axis
    #[default]
    MaskOnly,
    /// Mask plus the selected values
    MaskAndValues,
    /// Selected values only
    ValuesOnly,
}

impl FromStr for SelectMode {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mask" | "mask_only" | "mask-only" => Ok(SelectMode::MaskOnly),
            "both" | "mask_and_values" | "mask-and-values" => Ok(SelectMode::MaskAndValues),
            "values" | "values_only" | "values-only" => Ok(SelectMode::ValuesOnly),
            _ => Err(ArchiveError::InvalidSpec {
                kind: "selection mode",
                value: s.to_string(),
            }),
        }
    }
}

/// A (years, months, mode) query against a time axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeAxisQuery {
    years: DateRange,
    months: Vec<u8>,
    mode: SelectMode,
}

impl TimeAxisQuery {
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidRange`] if `end_year < start_year`.
    pub fn new(start_year: i32, end_year: i32, months: Vec<u8>, mode: SelectMode) -> ArchiveResult<Self> {
        Ok(TimeAxisQuery {
            years: DateRange::new(start_year, end_year)?,
            months,
            mode,
        })
    }

    pub fn years(&self) -> DateRange {
        self.years
    }

    pub fn months(&self) -> &[u8] {
        &self.months
    }

    pub fn mode(&self) -> SelectMode {
        self.mode
    }

    /// Whether a timestamp satisfies the year and month conditions.
    pub fn matches<T: CalendarDate>(&self, date: &T) -> bool {
        self.years.contains(date.year()) && self.months.iter().any(|&m| u32::from(m) == date.month())
    }
}

/// Result of a selection, shaped by [`SelectMode`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection<T> {
    Mask(Vec<bool>),
    MaskAndValues { mask: Vec<bool>, values: Vec<T> },
    Values(Vec<T>),
}

impl<T> Selection<T> {
    fn build(mask: Vec<bool>, axis: &[T], mode: SelectMode) -> Self
    where
        T: Clone,
    {
        match mode {
            SelectMode::MaskOnly => Selection::Mask(mask),
            SelectMode::MaskAndValues => {
                let values = filter_by_mask(axis, &mask);
                Selection::MaskAndValues { mask, values }
            }
            SelectMode::ValuesOnly => Selection::Values(filter_by_mask(axis, &mask)),
        }
    }

    pub fn mask(&self) -> Option<&[bool]> {
        match self {
            Selection::Mask(mask) | Selection::MaskAndValues { mask, .. } => Some(mask),
            Selection::Values(_) => None,
        }
    }

    pub fn values(&self) -> Option<&[T]> {
        match self {
            Selection::Values(values) | Selection::MaskAndValues { values, .. } => Some(values),
            Selection::Mask(_) => None,
        }
    }

    /// Positions of the selected entries, when a mask is available.
    pub fn indices(&self) -> Option<Vec<usize>> {
        self.mask().map(|mask| {
            mask.iter()
                .enumerate()
                .filter(|(_, keep)| **keep)
                .map(|(idx, _)| idx)
                .collect()
        })
    }

    /// Number of selected entries.
    pub fn len(&self) -> usize {
        match self {
            Selection::Mask(mask) => mask.iter().filter(|keep| **keep).count(),
            Selection::MaskAndValues { values, .. } | Selection::Values(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn filter_by_mask<T: Clone>(axis: &[T], mask: &[bool]) -> Vec<T> {
    axis.iter()
        .zip(mask)
        .filter(|(_, keep)| **keep)
        .map(|(value, _)| value.clone())
        .collect()
}

/// Selects from an already decoded axis.
pub fn select<T>(axis: &[T], query: &TimeAxisQuery) -> Selection<T>
where
    T: CalendarDate + Clone,
{
    let mask: Vec<bool> = axis.iter().map(|date| query.matches(date)).collect();
    debug!(
        "Selected {} of {} time steps for years {} months {:?}",
        mask.iter().filter(|keep| **keep).count(),
        axis.len(),
        query.years,
        query.months
    );
    Selection::build(mask, axis, query.mode)
}

/// Decodes a numeric axis under `units`/`calendar`, then selects from it.
///
/// Returned values are the raw numeric entries of the axis.
///
/// # Errors
///
/// Returns [`ArchiveError::Decode`] carrying the decoder's error unchanged.
pub fn select_numeric(
    values: &[f64],
    units: &str,
    calendar: &str,
    query: &TimeAxisQuery,
    decoder: &dyn TimeDecoder,
) -> ArchiveResult<Selection<f64>> {
    let dates = decoder.decode(values, units, calendar)?;
    let mask: Vec<bool> = dates.iter().map(|date| query.matches(date)).collect();
    debug!(
        "Selected {} of {} numeric time steps ({}, {})",
        mask.iter().filter(|keep| **keep).count(),
        values.len(),
        units,
        calendar
    );
    Ok(Selection::build(mask, values, query.mode))
}

/// Selects entries between two calendar dates (inclusive, compared by day)
/// whose month is in `months`.
pub fn select_between<T>(
    axis: &[T],
    start: CfDatetime,
    end: CfDatetime,
    months: &[u8],
    mode: SelectMode,
) -> ArchiveResult<Selection<T>>
where
    T: CalendarDate + Clone,
{
    let key = |y: i32, m: u32, d: u32| (y, m, d);
    let lower = key(start.year, start.month, start.day);
    let upper = key(end.year, end.month, end.day);
    if upper < lower {
        return Err(ArchiveError::InvalidRange {
            start: start.year,
            end: end.year,
        });
    }
    let mask: Vec<bool> = axis
        .iter()
        .map(|date| {
            let k = key(date.year(), date.month(), date.day());
            k >= lower && k <= upper && months.iter().any(|&m| u32::from(m) == date.month())
        })
        .collect();
    Ok(Selection::build(mask, axis, mode))
}
