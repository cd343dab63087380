//! Line filter value object
//!
//! Users restrict a stop to specific lines with a comma-separated allow-list
//! such as `"151, R2"`. Matching is exact but case-insensitive on trimmed codes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// An allow-list of line codes for one stop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineFilter {
    codes: Vec<String>,
}

impl LineFilter {
    /// Parse a comma-separated filter expression
    ///
    /// Codes are trimmed; empty segments are dropped. An expression without a
    /// single non-empty code is rejected; use [`LineFilter::parse_optional`]
    /// when a blank expression should mean "no filter".
    pub fn parse(expression: &str) -> Result<Self, DomainError> {
        let codes: Vec<String> = expression
            .split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect();

        if codes.is_empty() {
            return Err(DomainError::InvalidLineFilter(format!(
                "'{expression}' contains no line codes"
            )));
        }

        Ok(Self { codes })
    }

    /// Parse an optional filter expression, mapping `None`/blank to no filter
    pub fn parse_optional(expression: Option<&str>) -> Result<Option<Self>, DomainError> {
        match expression {
            None => Ok(None),
            Some(expr) if expr.split(',').all(|code| code.trim().is_empty()) => Ok(None),
            Some(expr) => Self::parse(expr).map(Some),
        }
    }

    /// Check whether a line code is allowed by this filter
    ///
    /// Comparison is case-insensitive on the trimmed code.
    pub fn matches(&self, line: &str) -> bool {
        let line = line.trim();
        self.codes.iter().any(|code| code.eq_ignore_ascii_case(line))
    }

    /// The allowed line codes, as configured
    pub fn codes(&self) -> &[String] {
        &self.codes
    }
}

impl fmt::Display for LineFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.codes.join(","))
    }
}
