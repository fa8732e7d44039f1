//! Target definitions
//!
//! Targets come from configuration as plain strings: `@account`, `#tag`, or a
//! full `https://` URL. A bare word is treated as an account handle.

use crate::ConfigError;
use std::fmt;
use url::Url;

/// Kind of source a target points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Account,
    Tag,
    Url,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Tag => "tag",
            Self::Url => "url",
        }
    }
}

/// A single source to scrape, immutable once parsed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    identifier: String,
    kind: TargetKind,
}

impl Target {
    /// Creates an account target from a handle without the leading `@`
    pub fn account(handle: impl Into<String>) -> Self {
        Self {
            identifier: handle.into(),
            kind: TargetKind::Account,
        }
    }

    /// Creates a tag target from a tag without the leading `#`
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            identifier: tag.into(),
            kind: TargetKind::Tag,
        }
    }

    /// Parses a configured target string
    ///
    /// # Examples
    ///
    /// ```
    /// use reel_harvest::model::{Target, TargetKind};
    ///
    /// assert_eq!(Target::parse("@natgeo").unwrap().kind(), TargetKind::Account);
    /// assert_eq!(Target::parse("#viral").unwrap().kind(), TargetKind::Tag);
    /// ```
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();

        if raw.starts_with("http://") || raw.starts_with("https://") {
            let url = Url::parse(raw).map_err(|_| ConfigError::InvalidTarget(raw.to_string()))?;
            if url.host_str().is_none() {
                return Err(ConfigError::InvalidTarget(raw.to_string()));
            }
            return Ok(Self {
                identifier: url.to_string(),
                kind: TargetKind::Url,
            });
        }

        let (kind, name, allowed): (TargetKind, &str, fn(char) -> bool) =
            if let Some(tag) = raw.strip_prefix('#') {
                (TargetKind::Tag, tag, is_tag_char)
            } else if let Some(handle) = raw.strip_prefix('@') {
                (TargetKind::Account, handle, is_handle_char)
            } else {
                (TargetKind::Account, raw, is_handle_char)
            };

        let valid = !name.is_empty() && name.chars().all(allowed);
        if !valid {
            return Err(ConfigError::InvalidTarget(raw.to_string()));
        }

        Ok(Self {
            identifier: name.to_string(),
            kind,
        })
    }

    /// The handle, tag, or URL without any sigil
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }
}

fn is_handle_char(c: char) -> bool {
    c.is_alphanumeric() || c == '.' || c == '_'
}

fn is_tag_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TargetKind::Account => write!(f, "@{}", self.identifier),
            TargetKind::Tag => write!(f, "#{}", self.identifier),
            TargetKind::Url => f.write_str(&self.identifier),
        }
    }
}
