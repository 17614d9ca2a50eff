//! Normalization and plausibility checks for extracted rate tokens.

use thiserror::Error;
use tracing::debug;

/// Exclusive plausibility band for a per-gram 24K rate in INR. Numbers
/// outside this band are assumed to be an unrelated price on the page
/// rather than the intended quantity.
pub const MIN_PLAUSIBLE_RATE: f64 = 5000.0;
pub const MAX_PLAUSIBLE_RATE: f64 = 50000.0;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("token '{0}' is not a number")]
    Unparsable(String),

    /// Parsed fine but lies outside the plausibility band; distinguishes
    /// "something matched but is implausible" from "nothing matched".
    #[error("rate {0} outside plausible band ({MIN_PLAUSIBLE_RATE}, {MAX_PLAUSIBLE_RATE})")]
    OutOfBand(f64),
}

/// Strips grouping commas and surrounding whitespace, parses the token
/// as a float and enforces the plausibility band.
pub fn check(raw: &str) -> Result<f64, ValidationError> {
    let normalized = raw.trim().replace(',', "");
    let value: f64 = normalized
        .parse()
        .map_err(|_| ValidationError::Unparsable(raw.to_string()))?;

    debug!(raw, value, "Normalized scraped token");

    if value > MIN_PLAUSIBLE_RATE && value < MAX_PLAUSIBLE_RATE {
        Ok(value)
    } else {
        Err(ValidationError::OutOfBand(value))
    }
}
