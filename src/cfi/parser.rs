//! Location reference parser
//!
//! Grammar:
//! ```text
//! reference = resource "#" scheme "(" path ":" offset ")"
//! resource  = 1*( any character except "#" )
//! scheme    = 1*( word character )
//! path      = 1*( digit / "/" )
//! offset    = 1*digit
//! ```
//!
//! Path values of 0 and 1 are dropped: they address text or non-element
//! positions and are never used for element descent.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::types::LocationReference;

static REFERENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^#]+)#(\w+)\(([\d/]+):(\d+)\)$").expect("location reference regex is valid")
});

/// Location reference parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationParseError {
    #[error("Empty location reference")]
    Empty,

    #[error("Incorrectly formatted location reference: {0}")]
    Malformed(String),

    #[error("Invalid path step '{step}' in {input}")]
    InvalidStep { step: String, input: String },

    #[error("Invalid character offset '{offset}' in {input}")]
    InvalidOffset { offset: String, input: String },
}

/// Parse a serialized location reference
pub fn parse(input: &str) -> Result<LocationReference, LocationParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(LocationParseError::Empty);
    }

    let captures = REFERENCE_REGEX
        .captures(input)
        .ok_or_else(|| LocationParseError::Malformed(input.to_string()))?;

    let raw_path = captures[3].to_string();
    let path = parse_steps(&raw_path, input)?;

    let offset = captures[4]
        .parse::<usize>()
        .map_err(|_| LocationParseError::InvalidOffset {
            offset: captures[4].to_string(),
            input: input.to_string(),
        })?;

    Ok(LocationReference {
        resource_name: captures[1].to_string(),
        scheme: captures[2].to_string(),
        raw_path,
        path,
        offset,
    })
}

/// Parse a location reference, logging and discarding failures
pub fn try_parse(input: &str) -> Option<LocationReference> {
    match parse(input) {
        Ok(reference) => Some(reference),
        Err(e) => {
            tracing::warn!(reference = input, "{}", e);
            None
        }
    }
}

/// Split a raw step-path and keep the element-addressable values
fn parse_steps(raw_path: &str, input: &str) -> Result<Vec<u32>, LocationParseError> {
    let mut steps = Vec::new();
    for segment in raw_path.split('/').filter(|s| !s.is_empty()) {
        let value: u32 = segment
            .parse()
            .map_err(|_| LocationParseError::InvalidStep {
                step: segment.to_string(),
                input: input.to_string(),
            })?;
        if value > 1 {
            steps.push(value);
        }
    }
    Ok(steps)
}
