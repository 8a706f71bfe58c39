//! Core type definitions with strong typing and validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Identifier of a provider-managed network namespace
///
/// The name is used as a single path component in the handle and resolver
/// templates, so anything that could step outside the template's directory
/// is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(try_from = "String", into = "String")]
pub struct NamespaceName(String);

impl NamespaceName {
    /// Name used when no `--net` is given
    pub const DEFAULT: &'static str = "main";

    /// Maximum length, matching `NAME_MAX`
    pub const MAX_LENGTH: usize = 255;

    /// Create a new `NamespaceName` with validation
    ///
    /// # Errors
    /// Returns error if the name is empty, too long, `.`/`..`, or contains `/` or NUL
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<()> {
        let reason = if name.is_empty() {
            "name cannot be empty"
        } else if name.len() > Self::MAX_LENGTH {
            "name too long"
        } else if name == "." || name == ".." {
            "name cannot be a relative directory"
        } else if name.contains('/') {
            "name cannot contain '/'"
        } else if name.contains('\0') {
            "name cannot contain NUL"
        } else {
            return Ok(());
        };

        Err(Error::InvalidName {
            name: name.to_string(),
            reason,
        })
    }

    /// Get the name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NamespaceName {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for NamespaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NamespaceName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for NamespaceName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<NamespaceName> for String {
    fn from(name: NamespaceName) -> Self {
        name.0
    }
}

impl AsRef<str> for NamespaceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
