//! Class identifiers (WordNet ids such as `n02124075`).
//!
//! An identifier becomes both a URL path component and a directory name under
//! the target root, so anything that could escape that root is rejected here
//! rather than sanitized. Interior whitespace is rejected too, so an id is
//! always a single token in the failure log.

use std::fmt;
use thiserror::Error;

/// Longest identifier accepted (Linux NAME_MAX, leaving room for `.tar.part`).
const MAX_LEN: usize = 245;

/// Why a raw string is not a usable class identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassIdError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier {0:?} contains a path separator, whitespace or a control character")]
    ForbiddenChar(String),
    #[error("identifier {0:?} is a relative path component")]
    Reserved(String),
    #[error("identifier is longer than {MAX_LEN} bytes")]
    TooLong,
}

/// Opaque, validated class identifier: non-empty and free of path traversal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(String);

impl ClassId {
    /// Validates `raw` after trimming surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self, ClassIdError> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(ClassIdError::Empty);
        }
        if s.len() > MAX_LEN {
            return Err(ClassIdError::TooLong);
        }
        if s.chars().any(|c| c == '/' || c == '\\' || c.is_control() || c.is_whitespace()) {
            return Err(ClassIdError::ForbiddenChar(s.to_string()));
        }
        if s == "." || s == ".." {
            return Err(ClassIdError::Reserved(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClassId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
