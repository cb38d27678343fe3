//! Reference ids.
//!
//! A reference id correlates one gateway payment attempt with one ledger
//! transaction. It is assigned by the ledger before the gateway is ever
//! contacted and has the form
//! `<tenant-prefix>-<6-digit-debitor-id>-<date>-<time>-<random>`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Maximum length accepted for a reference id on the HTTP surface.
pub const MAX_REFERENCE_ID_LEN: usize = 63;

/// Number of hyphen-delimited tokens in a well-formed reference id.
const TOKEN_COUNT: usize = 5;

/// A reference id that passed the route-level syntax check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferenceId(String);

impl ReferenceId {
    /// Check the character-level syntax: upper-case alphanumerics and
    /// hyphens, starting and ending with an alphanumeric.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        if raw.len() < 3 || raw.len() > MAX_REFERENCE_ID_LEN {
            return Err(CoreError::InvalidReferenceId(raw.to_string()));
        }
        let edge_ok = |c: char| c.is_ascii_uppercase() || c.is_ascii_digit();
        let body_ok = |c: char| edge_ok(c) || c == '-';

        let first = raw.chars().next();
        let last = raw.chars().last();
        match (first, last) {
            (Some(f), Some(l)) if edge_ok(f) && edge_ok(l) && raw.chars().all(body_ok) => {
                Ok(Self(raw.to_string()))
            }
            _ => Err(CoreError::InvalidReferenceId(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ReferenceId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReferenceId> for String {
    fn from(value: ReferenceId) -> Self {
        value.0
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The tenant token of an arbitrary (possibly untrusted) reference id.
pub fn tenant_of(raw: &str) -> &str {
    raw.split('-').next().unwrap_or_default()
}

/// Whether a reference id belongs to the configured tenant.
///
/// An empty prefix disables the check.
pub fn has_tenant_prefix(raw: &str, prefix: &str) -> bool {
    prefix.is_empty() || tenant_of(raw) == prefix
}

/// Extract the debitor id from token 1 of a reference id.
///
/// Requires exactly five hyphen-delimited tokens; token 1 must be a base-10
/// unsigned integer.
pub fn debitor_id_of(raw: &str) -> Result<u32, CoreError> {
    let tokens: Vec<&str> = raw.split('-').collect();
    if tokens.len() != TOKEN_COUNT {
        return Err(CoreError::InvalidDebitorId {
            reference_id: raw.to_string(),
            reason: format!("expected {} tokens, found {}", TOKEN_COUNT, tokens.len()),
        });
    }
    let token = tokens[1];
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
        return Err(CoreError::InvalidDebitorId {
            reference_id: raw.to_string(),
            reason: format!("token '{}' is not an unsigned integer", token),
        });
    }
    token.parse::<u32>().map_err(|e| CoreError::InvalidDebitorId {
        reference_id: raw.to_string(),
        reason: e.to_string(),
    })
}
