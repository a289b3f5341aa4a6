//! # NetCDF Dataset Access
//!
//! Reads the pieces of a staged archive file the core needs: the numeric time
//! coordinate with its `units`/`calendar` attributes, and the dimensions a
//! variable is defined on.

use crate::calendar::{CfDatetime, TimeDecoder};
use crate::error::{ArchiveError, ArchiveResult};
use crate::select::{select_numeric, Selection, TimeAxisQuery};
use log::debug;
use netcdf::AttributeValue;
use serde::Serialize;
use std::path::Path;

/// Calendar assumed when the time variable carries no `calendar` attribute.
pub const DEFAULT_CALENDAR: &str = "standard";

/// Dimension names treated as longitude.
pub const LONGITUDE_NAMES: &[&str] = &["lon", "longitude", "grid_xt", "x"];

/// A raw time coordinate as stored in a file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericTimeAxis {
    pub values: Vec<f64>,
    pub units: String,
    pub calendar: String,
}

impl NumericTimeAxis {
    pub fn decode(&self, decoder: &dyn TimeDecoder) -> ArchiveResult<Vec<CfDatetime>> {
        Ok(decoder.decode(&self.values, &self.units, &self.calendar)?)
    }

    pub fn select(
        &self,
        query: &TimeAxisQuery,
        decoder: &dyn TimeDecoder,
    ) -> ArchiveResult<Selection<f64>> {
        select_numeric(&self.values, &self.units, &self.calendar, query, decoder)
    }
}

fn string_attribute(var: &netcdf::Variable, name: &str) -> Option<String> {
    match var.attribute_value(name) {
        Some(Ok(AttributeValue::Str(value))) => Some(value),
        _ => None,
    }
}

/// Reads the time coordinate `time_name` from a NetCDF file.
///
/// # Errors
///
/// - [`ArchiveError::Netcdf`] if the file cannot be opened or read
/// - [`ArchiveError::MissingVariable`] if there is no such variable
/// - [`ArchiveError::MissingAttribute`] if it has no string `units` attribute
pub fn read_time_axis<P: AsRef<Path>>(path: P, time_name: &str) -> ArchiveResult<NumericTimeAxis> {
    debug!("Opening NetCDF file: {}", path.as_ref().display());
    let file = netcdf::open(path.as_ref())?;
    let var = file
        .variable(time_name)
        .ok_or_else(|| ArchiveError::MissingVariable(time_name.to_string()))?;

    let values = var.get_values::<f64, _>(..)?;
    let units = string_attribute(&var, "units").ok_or_else(|| ArchiveError::MissingAttribute {
        variable: time_name.to_string(),
        attribute: "units".to_string(),
    })?;
    let calendar =
        string_attribute(&var, "calendar").unwrap_or_else(|| DEFAULT_CALENDAR.to_string());

    debug!(
        "Time axis '{}': {} values, units '{}', calendar '{}'",
        time_name,
        values.len(),
        units,
        calendar
    );
    Ok(NumericTimeAxis {
        values,
        units,
        calendar,
    })
}

/// Names of the dimensions `variable` is defined on, in order.
pub fn variable_dimensions<P: AsRef<Path>>(path: P, variable: &str) -> ArchiveResult<Vec<String>> {
    let file = netcdf::open(path.as_ref())?;
    let var = file
        .variable(variable)
        .ok_or_else(|| ArchiveError::MissingVariable(variable.to_string()))?;
    Ok(var
        .dimensions()
        .iter()
        .map(|d| d.name().to_string())
        .collect())
}

/// Whether `variable` is defined on a longitude dimension.
pub fn has_longitude<P: AsRef<Path>>(path: P, variable: &str) -> ArchiveResult<bool> {
    Ok(variable_dimensions(path, variable)?
        .iter()
        .any(|dim| LONGITUDE_NAMES.contains(&dim.to_lowercase().as_str())))
}
