//! Input validation utilities.
//!
//! These run at the start of each workflow operation, before any storage is touched, so a
//! rejected request never leaves a partial write behind.

use crate::constants::MIN_PASSWORD_LEN;
use crate::models::Vitals;
use crate::{HospitalError, HospitalResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Combines a `YYYY-MM-DD` date and an `HH:MM` time into a wall-clock instant.
///
/// `HH:MM:SS` is also accepted for the time.
///
/// # Errors
///
/// Returns `HospitalError::Validation` if either part does not parse.
pub fn parse_schedule(date: &str, time: &str) -> HospitalResult<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
        HospitalError::validation(format!("Invalid date '{date}', expected YYYY-MM-DD"))
    })?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M:%S"))
        .map_err(|_| HospitalError::validation(format!("Invalid time '{time}', expected HH:MM")))?;

    Ok(date.and_time(time))
}

/// Validates a new password against the minimum length policy.
///
/// # Errors
///
/// Returns `HospitalError::Validation` if the password is shorter than the minimum.
pub fn validate_password(password: &str) -> HospitalResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(HospitalError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Validates a set of vital signs.
///
/// - temperature between 25 and 45 °C
/// - heart rate between 1 and 300 bpm
/// - blood pressure written as `systolic/diastolic`, both whole numbers
///
/// # Errors
///
/// Returns `HospitalError::Validation` naming the first field out of range.
pub fn validate_vitals(vitals: &Vitals) -> HospitalResult<()> {
    if !(25.0..=45.0).contains(&vitals.temperature) {
        return Err(HospitalError::validation(format!(
            "Temperature {} is out of range",
            vitals.temperature
        )));
    }

    if !(1..=300).contains(&vitals.heart_rate) {
        return Err(HospitalError::validation(format!(
            "Heart rate {} is out of range",
            vitals.heart_rate
        )));
    }

    let well_formed = vitals
        .blood_pressure
        .trim()
        .split_once('/')
        .is_some_and(|(sys, dia)| is_pressure(sys) && is_pressure(dia));
    if !well_formed {
        return Err(HospitalError::validation(format!(
            "Blood pressure '{}' must look like 120/80",
            vitals.blood_pressure
        )));
    }

    Ok(())
}

fn is_pressure(part: &str) -> bool {
    (2..=3).contains(&part.len()) && part.bytes().all(|b| b.is_ascii_digit())
}
