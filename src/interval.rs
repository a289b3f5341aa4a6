//! # Time Interval Module
//!
//! This module holds the fixed interval vocabulary (season codes and their
//! month sets) and resolves user-facing interval specifiers into a canonical
//! short label plus the ordered months it denotes.
//!
//! ## Vocabulary
//!
//! - **Months**: `1`..`12`, labelled `"01"`..`"12"`
//! - **Seasons**: three- and four-letter codes such as `"jja"` or `"djfm"`
//! - **Annual**: `"ann"` (also accepted as `"annual"`), all twelve months
//!
//! ## Example
//!
//! ```rust
//! use ncarchive::interval::{resolve, IntervalSpec};
//!
//! let resolved = resolve(&IntervalSpec::Months(vec![8, 6, 7]))?;
//! assert_eq!(resolved.label, "jja");
//! assert_eq!(resolved.months, vec![6, 7, 8]);
//! # Ok::<(), ncarchive::error::ArchiveError>(())
//! ```

use crate::error::{ArchiveError, ArchiveResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Season codes and their month tuples, in lookup order.
///
/// When a caller supplies explicit months rather than a code, the first entry
/// whose month set equals the supplied set wins.
pub const SEASONS: &[(&str, &[u8])] = &[
    ("jfm", &[1, 2, 3]),
    ("fma", &[2, 3, 4]),
    ("mam", &[3, 4, 5]),
    ("amj", &[4, 5, 6]),
    ("mjj", &[5, 6, 7]),
    ("jja", &[6, 7, 8]),
    ("jas", &[7, 8, 9]),
    ("aso", &[8, 9, 10]),
    ("son", &[9, 10, 11]),
    ("ond", &[10, 11, 12]),
    ("ndj", &[11, 12, 1]),
    ("djf", &[1, 2, 12]),
    ("jjas", &[6, 7, 8, 9]),
    ("djfm", &[12, 1, 2, 3]),
    ("ann", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]),
];

const MONTH_INITIALS: &str = "jfmamjjasond";

/// A time-of-year subset as requested by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawInterval", into = "String")]
pub enum IntervalSpec {
    /// A single month, 1-based
    Month(u8),
    /// An explicit set of months
    Months(Vec<u8>),
    /// A season code from [`SEASONS`]
    Season(String),
    /// The whole year
    Annual,
}

/// A resolved interval: its canonical label and the months it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedInterval {
    pub label: String,
    pub months: Vec<u8>,
}

impl ResolvedInterval {
    pub fn contains(&self, month: u32) -> bool {
        self.months.iter().any(|&m| u32::from(m) == month)
    }
}

/// Looks up the month tuple of a season code (exact, lowercase match).
pub fn season_months(code: &str) -> Option<&'static [u8]> {
    SEASONS
        .iter()
        .find(|(name, _)| *name == code)
        .map(|(_, months)| *months)
}

/// Finds the first season code whose month set equals `months`.
pub fn season_for_months(months: &[u8]) -> Option<&'static str> {
    let wanted: BTreeSet<u8> = months.iter().copied().collect();
    SEASONS
        .iter()
        .find(|(_, vals)| vals.iter().copied().collect::<BTreeSet<u8>>() == wanted)
        .map(|(name, _)| *name)
}

/// Resolves an interval specifier into its label and month set.
///
/// # Errors
///
/// Returns [`ArchiveError::UnresolvedInterval`] when the month is outside
/// 1-12, the code is not in [`SEASONS`], or an explicit month list matches no
/// season.
pub fn resolve(spec: &IntervalSpec) -> ArchiveResult<ResolvedInterval> {
    match spec {
        IntervalSpec::Month(month) => single_month(*month),
        IntervalSpec::Months(months) if months.len() == 1 => single_month(months[0]),
        IntervalSpec::Months(months) => season_for_months(months)
            .map(from_table)
            .ok_or_else(|| ArchiveError::UnresolvedInterval(spec.to_string())),
        IntervalSpec::Season(code) => {
            let code = code.trim().to_lowercase();
            let code = if code == "annual" { "ann".to_string() } else { code };
            match SEASONS.iter().find(|(name, _)| *name == code) {
                Some((name, _)) => Ok(from_table(name)),
                None => Err(ArchiveError::UnresolvedInterval(spec.to_string())),
            }
        }
        IntervalSpec::Annual => Ok(from_table("ann")),
    }
}

fn single_month(month: u8) -> ArchiveResult<ResolvedInterval> {
    if (1..=12).contains(&month) {
        Ok(ResolvedInterval {
            label: format!("{:02}", month),
            months: vec![month],
        })
    } else {
        Err(ArchiveError::UnresolvedInterval(month.to_string()))
    }
}

fn from_table(code: &'static str) -> ResolvedInterval {
    ResolvedInterval {
        label: code.to_string(),
        months: season_months(code).map(<[u8]>::to_vec).unwrap_or_default(),
    }
}

/// Converts a run of month initials into month numbers.
///
/// `"ann"` yields all twelve months; any other string must be a contiguous
/// run of `jfmamjjasond` (wrapping past December), e.g. `"jjas"` or `"djf"`.
///
/// # Examples
///
/// ```rust
/// use ncarchive::interval::months_from_letters;
///
/// assert_eq!(months_from_letters("DJF")?, vec![12, 1, 2]);
/// # Ok::<(), ncarchive::error::ArchiveError>(())
/// ```
pub fn months_from_letters(letters: &str) -> ArchiveResult<Vec<u8>> {
    let letters = letters.trim().to_lowercase();
    if letters == "ann" {
        return Ok((1..=12).collect());
    }
    if letters.is_empty() || letters.len() > 12 {
        return Err(ArchiveError::UnresolvedInterval(letters));
    }
    let cycle = MONTH_INITIALS.repeat(2);
    let start = cycle
        .find(&letters)
        .ok_or_else(|| ArchiveError::UnresolvedInterval(letters.clone()))?;
    Ok((start..start + letters.len())
        .map(|i| (i % 12) as u8 + 1)
        .collect())
}

impl fmt::Display for IntervalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalSpec::Month(m) => write!(f, "{}", m),
            IntervalSpec::Months(months) => {
                let parts: Vec<String> = months.iter().map(|m| m.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
            IntervalSpec::Season(code) => write!(f, "{}", code),
            IntervalSpec::Annual => write!(f, "ann"),
        }
    }
}

impl FromStr for IntervalSpec {
    type Err = ArchiveError;

    /// Parses `"7"`, `"6,7,8"`, `"jja"` or `"ann"`/`"annual"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_lowercase();
        if text.is_empty() {
            return Err(ArchiveError::UnresolvedInterval(s.to_string()));
        }
        if text == "ann" || text == "annual" {
            return Ok(IntervalSpec::Annual);
        }
        if text.chars().all(|c| c.is_ascii_digit() || c == ',' || c == ' ') {
            let months: Result<Vec<u8>, _> = text
                .split(',')
                .map(|part| part.trim().parse::<u8>())
                .collect();
            let months = months.map_err(|_| ArchiveError::UnresolvedInterval(s.to_string()))?;
            return Ok(match months.as_slice() {
                [month] => IntervalSpec::Month(*month),
                _ => IntervalSpec::Months(months),
            });
        }
        Ok(IntervalSpec::Season(text))
    }
}

/// Shapes an interval may take in JSON/YAML configuration.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawInterval {
    Month(u8),
    Months(Vec<u8>),
    Text(String),
}

impl TryFrom<RawInterval> for IntervalSpec {
    type Error = ArchiveError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        match raw {
            RawInterval::Month(m) => Ok(IntervalSpec::Month(m)),
            RawInterval::Months(months) => Ok(IntervalSpec::Months(months)),
            RawInterval::Text(text) => text.parse(),
        }
    }
}

impl From<IntervalSpec> for String {
    fn from(spec: IntervalSpec) -> Self {
        spec.to_string()
    }
}
