//! Session liveness policies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing a session policy value
#[derive(Debug, Clone)]
pub struct ParsePolicyError {
    kind: &'static str,
    value: String,
}

impl fmt::Display for ParsePolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for ParsePolicyError {}

/// How validation consults the revocation store
///
/// With `Present` or `Latest`, a token whose record could not be written at
/// login is rejected as soon as the store answers again, and logout takes
/// effect. With `Off`, such a token stays valid until it expires.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LivenessCheck {
    /// Signature and expiry only
    #[default]
    Off,
    /// Any live record for the subject keeps every unexpired token valid
    Present,
    /// Only the most recently issued token for the subject is valid
    Latest,
}

impl LivenessCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            LivenessCheck::Off => "off",
            LivenessCheck::Present => "present",
            LivenessCheck::Latest => "latest",
        }
    }
}

impl FromStr for LivenessCheck {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" => Ok(LivenessCheck::Off),
            "present" => Ok(LivenessCheck::Present),
            "latest" => Ok(LivenessCheck::Latest),
            _ => Err(ParsePolicyError {
                kind: "liveness check",
                value: s.to_string(),
            }),
        }
    }
}

/// What validation does when the revocation store cannot be reached
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UnavailablePolicy {
    /// Fall back to signature and expiry
    #[default]
    FailOpen,
    /// Reject the token
    FailClosed,
}

impl UnavailablePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnavailablePolicy::FailOpen => "fail-open",
            UnavailablePolicy::FailClosed => "fail-closed",
        }
    }
}

impl FromStr for UnavailablePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "fail-open" | "open" => Ok(UnavailablePolicy::FailOpen),
            "fail-closed" | "closed" => Ok(UnavailablePolicy::FailClosed),
            _ => Err(ParsePolicyError {
                kind: "unavailable policy",
                value: s.to_string(),
            }),
        }
    }
}

/// Session policy for the session manager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionPolicy {
    pub liveness: LivenessCheck,
    pub on_unavailable: UnavailablePolicy,
}
