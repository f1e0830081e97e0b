//! Dotted module references such as `loadkit.services.Unpacker`.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Reasons a module reference string is rejected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ModuleRefError {
    /// The reference is empty or whitespace.
    #[error("module reference is empty")]
    Empty,

    /// A segment between dots is empty (leading, trailing, or doubled dots).
    #[error("module reference \"{reference}\" contains an empty segment")]
    EmptySegment {
        /// The rejected reference.
        reference: String,
    },

    /// A segment is not a valid identifier.
    #[error("module reference \"{reference}\" has invalid segment \"{segment}\"")]
    InvalidSegment {
        /// The rejected reference.
        reference: String,
        /// The offending segment.
        segment: String,
    },
}

/// A validated module reference made of identifier segments.
///
/// The final segment names the component; the preceding segments name the
/// package it lives in.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleRef {
    segments: Vec<String>,
}

impl ModuleRef {
    /// Parses a dotted reference.
    ///
    /// # Examples
    ///
    /// ```
    /// use loadkit_common::path::ModuleRef;
    ///
    /// let reference = ModuleRef::parse("loadkit.services.Unpacker")?;
    /// assert_eq!(reference.component(), "Unpacker");
    /// assert_eq!(reference.package(), "loadkit.services");
    /// # Ok::<(), loadkit_common::path::ModuleRefError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ModuleRefError`] when the string is empty, has empty
    /// segments, or a segment is not an identifier.
    pub fn parse(reference: &str) -> Result<Self, ModuleRefError> {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(ModuleRefError::Empty);
        }

        let mut segments = Vec::new();
        for segment in trimmed.split('.') {
            if segment.is_empty() {
                return Err(ModuleRefError::EmptySegment {
                    reference: trimmed.to_owned(),
                });
            }
            if !is_identifier(segment) {
                return Err(ModuleRefError::InvalidSegment {
                    reference: trimmed.to_owned(),
                    segment: segment.to_owned(),
                });
            }
            segments.push(segment.to_owned());
        }

        Ok(Self { segments })
    }

    /// Returns the path segments as a slice.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the final segment.
    #[must_use]
    pub fn component(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Returns everything before the final segment, joined with dots.
    ///
    /// Single-segment references have an empty package.
    #[must_use]
    pub fn package(&self) -> String {
        match self.segments.split_last() {
            Some((_, rest)) => rest.join("."),
            None => String::new(),
        }
    }

    /// Returns `true` when this reference matches the provided segments exactly.
    #[must_use]
    pub fn matches<I, S>(&self, candidate: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut expected = candidate.into_iter();
        for segment in &self.segments {
            match expected.next() {
                Some(candidate) if candidate.as_ref() == segment => {}
                _ => return false,
            }
        }
        expected.next().is_none()
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for ModuleRef {
    type Err = ModuleRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}
