use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex characters used in human-facing artifact names.
pub const SHORT_LEN: usize = 12;

/// SHA-256 digest of canonical image bytes, as 64 lowercase hex characters.
///
/// This is the dedup key of the artifact cache, so a collision would serve the
/// wrong model; only the full value is ever compared.
///
/// Deserialization goes through [`Fingerprint::parse`], so a damaged record
/// can never carry a value that is unsafe as a file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    /// Parses a previously rendered fingerprint. Returns `None` unless the
    /// input is exactly 64 lowercase hex characters.
    pub fn parse(s: &str) -> Option<Self> {
        let valid = s.len() == 64 && s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'));
        valid.then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading hex digits, for display only.
    pub fn short(&self) -> &str {
        &self.0[..SHORT_LEN]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Fingerprint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("not a fingerprint: {}", s))
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.0
    }
}
