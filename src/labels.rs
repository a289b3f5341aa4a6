//! # Label Module
//!
//! Small, independent label builders used to compose archive and output names:
//! year ranges, ensemble members, zonal-mean flags, variable/level labels and
//! the provenance labels that describe what data a calculation consumed or
//! produced.

use crate::error::{ArchiveError, ArchiveResult};
use crate::interval::{resolve, IntervalSpec};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inclusive range of years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(i32, i32)", into = "(i32, i32)")]
pub struct DateRange {
    start: i32,
    end: i32,
}

impl DateRange {
    /// Creates a range, rejecting `end < start`.
    pub fn new(start: i32, end: i32) -> ArchiveResult<Self> {
        if end < start {
            return Err(ArchiveError::InvalidRange { start, end });
        }
        Ok(DateRange { start, end })
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }

    /// `"1981"` for a single year, `"1981-2010"` otherwise.
    pub fn label(&self) -> String {
        if self.start == self.end {
            format!("{:04}", self.start)
        } else {
            format!("{:04}-{:04}", self.start, self.end)
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl TryFrom<(i32, i32)> for DateRange {
    type Error = ArchiveError;

    fn try_from((start, end): (i32, i32)) -> Result<Self, Self::Error> {
        DateRange::new(start, end)
    }
}

impl From<DateRange> for (i32, i32) {
    fn from(range: DateRange) -> Self {
        (range.start, range.end)
    }
}

/// One-shot form of [`DateRange::label`].
pub fn year_range_label(start: i32, end: i32) -> ArchiveResult<String> {
    Ok(DateRange::new(start, end)?.label())
}

/// Identity of an ensemble member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMember", into = "String")]
pub enum EnsembleMember {
    /// The ensemble mean
    Average,
    /// A member by zero-based index
    Index(u32),
}

impl FromStr for EnsembleMember {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.eq_ignore_ascii_case("avg") {
            return Ok(EnsembleMember::Average);
        }
        text.parse::<u32>()
            .map(EnsembleMember::Index)
            .map_err(|_| ArchiveError::InvalidSpec {
                kind: "ensemble member",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for EnsembleMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnsembleMember::Average => write!(f, "avg"),
            EnsembleMember::Index(k) => write!(f, "{}", k),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMember {
    Index(u32),
    Text(String),
}

impl TryFrom<RawMember> for EnsembleMember {
    type Error = ArchiveError;

    fn try_from(raw: RawMember) -> Result<Self, Self::Error> {
        match raw {
            RawMember::Index(k) => Ok(EnsembleMember::Index(k)),
            RawMember::Text(text) => text.parse(),
        }
    }
}

impl From<EnsembleMember> for String {
    fn from(member: EnsembleMember) -> Self {
        member.to_string()
    }
}

/// `""` for no member, `"ens_mean"` for the average, `"mem{k+1}"` otherwise.
pub fn ensemble_label(member: Option<&EnsembleMember>) -> String {
    match member {
        None => String::new(),
        Some(EnsembleMember::Average) => "ens_mean".to_string(),
        Some(EnsembleMember::Index(k)) => format!("mem{}", k + 1),
    }
}

/// `"znl"` when the variable is defined on a longitude dimension.
///
/// An unknown definition (`None`) counts as false.
pub fn zonal_mean_label(def_lon: Option<bool>) -> &'static str {
    if def_lon.unwrap_or(false) {
        "znl"
    } else {
        ""
    }
}

/// Variable name, suffixed with `.level` when the level applies.
///
/// The level applies when the variable is defined on a vertical axis, or
/// unconditionally when it is `sigma`.
pub fn var_label(name: &str, def_vert: bool, level: Option<&str>) -> String {
    match level {
        Some(level) if def_vert || level == "sigma" => format!("{}.{}", name, level),
        _ => name.to_string(),
    }
}

/// Whether a provenance label names the data consumed or the data produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// `from_<interval>_<kind>[_<vertical>]`
    Input,
    /// `<interval>.<kind>[.<vertical>]`
    Output,
}

impl Provenance {
    fn separator(self) -> char {
        match self {
            Provenance::Input => '_',
            Provenance::Output => '.',
        }
    }
}

/// Joins interval, temporal kind and optional vertical kind into a
/// provenance label.
///
/// Empty components are skipped and repeated separators are collapsed, so the
/// result never carries a leading, trailing or doubled separator.
pub fn provenance_label(
    provenance: Provenance,
    interval_label: &str,
    data_kind: &str,
    vertical_kind: Option<&str>,
) -> String {
    let sep = provenance.separator();
    let prefix = match provenance {
        Provenance::Input => Some("from"),
        Provenance::Output => None,
    };
    let joined = prefix
        .into_iter()
        .chain([interval_label, data_kind])
        .chain(vertical_kind)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(&sep.to_string());
    collapse_separator(&joined, sep)
}

fn collapse_separator(label: &str, sep: char) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        if c == sep && (out.is_empty() || out.ends_with(sep)) {
            continue;
        }
        out.push(c);
    }
    while out.ends_with(sep) {
        out.pop();
    }
    out
}

/// Label for the input data of a calculation, e.g. `from_monthly_ts`.
pub fn data_in_label(interval: &str, data_kind: &str, vertical_kind: Option<&str>) -> String {
    provenance_label(Provenance::Input, interval, data_kind, vertical_kind)
}

/// Label for the output of a calculation, e.g. `jja.ts.pressure`.
pub fn data_out_label(
    interval: &IntervalSpec,
    data_kind: &str,
    vertical_kind: Option<&str>,
) -> ArchiveResult<String> {
    let resolved = resolve(interval)?;
    Ok(provenance_label(
        Provenance::Output,
        &resolved.label,
        data_kind,
        vertical_kind,
    ))
}
