//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`EntityName`] - Validated node or profile identity
//! - [`ProfileRef`] - One entry of a profile membership list (include or `~` exclude)
//! - [`HwAddr`] - Validated, normalized hardware (MAC) address
//! - [`Fingerprint`] - Registry digest used for optimistic concurrency
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, so a typed field that fails to parse surfaces
//! as a load error instead of a surprise during merge.
//!
//! # Examples
//!
//! ```
//! use nodereg::core::types::{EntityName, HwAddr, ProfileRef};
//!
//! let name = EntityName::new("n001").unwrap();
//! assert_eq!(name.as_str(), "n001");
//!
//! let mac = HwAddr::new("AA-BB-CC-DD-EE-FF").unwrap();
//! assert_eq!(mac.as_str(), "aa:bb:cc:dd:ee:ff");
//!
//! assert_eq!(ProfileRef::parse("~gpu"), Some(ProfileRef::Exclude("gpu".into())));
//! assert!(EntityName::new("~negated").is_err());
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("invalid hardware address: {0}")]
    InvalidHwAddr(String),

    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),
}

/// A validated node or profile name.
///
/// Names are the map keys of the registry and double as provenance
/// sources, so they must not contain characters that carry meaning in
/// those places:
/// - Cannot be empty
/// - Cannot start with `~` (reserved for negated profile references)
/// - Cannot contain `,` (source lists are comma-joined)
/// - Cannot contain `[` or `]` (field path brackets)
/// - Cannot contain whitespace or control characters
///
/// # Example
///
/// ```
/// use nodereg::core::types::EntityName;
///
/// assert!(EntityName::new("node01.cluster").is_ok());
/// assert!(EntityName::new("").is_err());
/// assert!(EntityName::new("a,b").is_err());
/// assert!(EntityName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityName(String);

impl EntityName {
    /// Create a new validated name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidName` if the name violates the rules above.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidName("name cannot be empty".into()));
        }
        if name.starts_with('~') {
            return Err(TypeError::InvalidName(format!(
                "'{name}' cannot start with '~'"
            )));
        }
        const INVALID_CHARS: [char; 3] = [',', '[', ']'];
        for c in INVALID_CHARS {
            if name.contains(c) {
                return Err(TypeError::InvalidName(format!(
                    "'{name}' cannot contain '{c}'"
                )));
            }
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(TypeError::InvalidName(format!(
                "'{name}' cannot contain whitespace or control characters"
            )));
        }
        Ok(())
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EntityName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<EntityName> for String {
    fn from(name: EntityName) -> Self {
        name.0
    }
}

impl AsRef<str> for EntityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of a profile membership list.
///
/// Membership lists are stored verbatim as strings; this is the parsed
/// view used during resolution. A leading `~` marks an exclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileRef {
    /// Include the named profile.
    Include(String),
    /// Prevent the named profile from being added later in the closure.
    Exclude(String),
}

impl ProfileRef {
    /// Parse a raw membership entry.
    ///
    /// Surrounding whitespace is ignored. Returns `None` for entries that
    /// name nothing (`""`, `"~"`).
    pub fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        match entry.strip_prefix('~') {
            Some(rest) => {
                let rest = rest.trim();
                (!rest.is_empty()).then(|| ProfileRef::Exclude(rest.to_string()))
            }
            None => (!entry.is_empty()).then(|| ProfileRef::Include(entry.to_string())),
        }
    }

    /// The profile name this entry refers to.
    pub fn name(&self) -> &str {
        match self {
            ProfileRef::Include(name) | ProfileRef::Exclude(name) => name,
        }
    }

    /// Whether this entry is an exclusion.
    pub fn is_exclude(&self) -> bool {
        matches!(self, ProfileRef::Exclude(_))
    }
}

/// A hardware (MAC) address.
///
/// Accepts six hex octets separated by `:` or `-`, in any case.
/// Normalized to lowercase with `:` separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HwAddr(String);

impl HwAddr {
    /// Create a new validated hardware address.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidHwAddr` if the string is not six hex octets.
    pub fn new(addr: impl Into<String>) -> Result<Self, TypeError> {
        let addr = addr.into();
        let octets: Vec<&str> = addr.split([':', '-']).collect();
        if octets.len() != 6
            || octets
                .iter()
                .any(|o| o.len() != 2 || !o.chars().all(|c| c.is_ascii_hexdigit()))
        {
            return Err(TypeError::InvalidHwAddr(addr));
        }
        Ok(Self(octets.join(":").to_ascii_lowercase()))
    }

    /// Get the normalized address.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HwAddr {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<HwAddr> for String {
    fn from(addr: HwAddr) -> Self {
        addr.0
    }
}

impl std::fmt::Display for HwAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A SHA-256 digest of the canonical registry document.
///
/// Mutating callers capture a fingerprint when they read the registry and
/// present it again when they write; a mismatch means someone else wrote
/// in between.
///
/// # Example
///
/// ```
/// use nodereg::core::types::Fingerprint;
///
/// let fp = Fingerprint::compute(b"nodes: {}\n");
/// let parsed: Fingerprint = fp.to_string().parse().unwrap();
/// assert_eq!(fp, parsed);
/// assert_eq!(fp.to_string().len(), 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Compute the fingerprint of a serialized document.
    pub fn compute(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hasher.finalize().into())
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for Fingerprint {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut digest = [0u8; 32];
        hex::decode_to_slice(s.trim(), &mut digest)
            .map_err(|e| TypeError::InvalidFingerprint(format!("'{s}': {e}")))?;
        Ok(Self(digest))
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.to_string()
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
