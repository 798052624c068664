//! Audit verbosity levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Verbosity selected by the audit policy.
///
/// Levels are totally ordered: `None < Metadata < Request < RequestResponse`.
/// Each level records everything the previous one does.
///
/// # Examples
///
/// ```rust
/// use kaudit_core::AuditLevel;
///
/// assert!(AuditLevel::RequestResponse > AuditLevel::Metadata);
/// assert!(!AuditLevel::None.is_enabled());
/// assert_eq!("metadata".parse::<AuditLevel>().unwrap(), AuditLevel::Metadata);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String")]
pub enum AuditLevel {
    /// Do not audit.
    #[default]
    None,
    /// Record request metadata (user, verb, resource, status) but no bodies.
    Metadata,
    /// Metadata plus the request body.
    Request,
    /// Metadata plus request and response bodies.
    RequestResponse,
}

impl AuditLevel {
    /// All levels in ascending order.
    pub const ALL: [Self; 4] = [
        Self::None,
        Self::Metadata,
        Self::Request,
        Self::RequestResponse,
    ];

    /// Returns true if events should be recorded at this level.
    #[must_use]
    pub fn is_enabled(self) -> bool {
        self != Self::None
    }

    /// Returns true if this level is at least `other`.
    #[must_use]
    pub fn at_least(self, other: Self) -> bool {
        self >= other
    }

    /// Returns true if the request body may be recorded.
    #[must_use]
    pub fn records_request_body(self) -> bool {
        self.at_least(Self::Request)
    }

    /// Returns true if the response body may be recorded.
    #[must_use]
    pub fn records_response_body(self) -> bool {
        self.at_least(Self::RequestResponse)
    }

    /// Returns the canonical wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Metadata => "Metadata",
            Self::Request => "Request",
            Self::RequestResponse => "RequestResponse",
        }
    }
}

impl fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownLevel {
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for AuditLevel {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
