//! Epoch handling
//!
//! Epochs are calendar dates everywhere in the model. The coordinate transformer consumes them
//! as decimal years, produced once by [`decimal_year`].

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{LastrxError, Result};

/// Number of days in the given year
pub fn days_in_year(year: i32) -> u32 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366
    } else {
        365
    }
}

/// Convert a calendar date to a decimal year.
///
/// `year + (day_of_year - 1) / days_in_year`, so January 1st maps exactly to the year.
pub fn decimal_year(date: NaiveDate) -> f64 {
    let year = date.year();
    f64::from(year) + f64::from(date.ordinal0()) / f64::from(days_in_year(year))
}

/// Convert a decimal year back to the calendar date it falls on
pub fn date_from_decimal_year(value: f64) -> Result<NaiveDate> {
    if !value.is_finite() || !(1.0..=9999.0).contains(&value) {
        return Err(LastrxError::ConfigInvalid {
            key: "epoch".to_string(),
            reason: format!("decimal year {} is out of range", value),
        });
    }

    let year = value.floor() as i32;
    let days = days_in_year(year);
    let ordinal0 = ((value - f64::from(year)) * f64::from(days)).round() as u32;
    let ordinal0 = ordinal0.min(days - 1);

    NaiveDate::from_yo_opt(year, ordinal0 + 1).ok_or_else(|| LastrxError::ConfigInvalid {
        key: "epoch".to_string(),
        reason: format!("decimal year {} does not name a date", value),
    })
}

/// Epoch as accepted at the input boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EpochInput {
    Date(NaiveDate),
    DecimalYear(f64),
}

impl EpochInput {
    /// Resolve to the canonical calendar date
    pub fn to_date(self) -> Result<NaiveDate> {
        match self {
            EpochInput::Date(date) => Ok(date),
            EpochInput::DecimalYear(value) => date_from_decimal_year(value),
        }
    }
}

impl FromStr for EpochInput {
    type Err = LastrxError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(EpochInput::Date(date));
        }
        if let Ok(value) = s.parse::<f64>() {
            return Ok(EpochInput::DecimalYear(value));
        }
        Err(LastrxError::ConfigInvalid {
            key: "epoch".to_string(),
            reason: format!(
                "'{}' is neither an ISO date (YYYY-MM-DD) nor a decimal year",
                s
            ),
        })
    }
}

/// Parse an epoch string into a calendar date
pub fn parse_epoch(s: &str) -> Result<NaiveDate> {
    s.parse::<EpochInput>()?.to_date()
}
