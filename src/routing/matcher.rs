//! Route matching module
//!
//! Recognizes `/<operation>/<title>` request paths.

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;

static VALID_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^/(edit|save|view)/([a-zA-Z0-9]+)$").unwrap_or_else(|e| {
        unreachable!("page path pattern is a valid regex: {e}")
    })
});

/// The action a request path names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    View,
    Edit,
    Save,
}

impl Operation {
    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "view" => Some(Self::View),
            "edit" => Some(Self::Edit),
            "save" => Some(Self::Save),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Save => "save",
        }
    }

    /// Path for this operation on a title, e.g. `/edit/FrontPage`
    pub fn path_for(self, title: &str) -> String {
        format!("/{}/{title}", self.as_str())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated page route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRoute<'a> {
    pub operation: Operation,
    pub title: &'a str,
}

/// Percent-decode a raw request path before matching
///
/// Returns `None` when the decoded bytes are not UTF-8; no page title could
/// match such a path anyway.
pub fn decode_path(raw: &str) -> Option<Cow<'_, str>> {
    percent_decode_str(raw).decode_utf8().ok()
}

/// Match a decoded request path against the page routes
///
/// Returns `None` for anything that is not exactly `/(view|edit|save)/<title>`
/// with a non-empty alphanumeric title.
pub fn match_path(path: &str) -> Option<PageRoute<'_>> {
    let caps = VALID_PATH.captures(path)?;
    let operation = Operation::from_segment(caps.get(1)?.as_str())?;
    let title = caps.get(2)?.as_str();
    Some(PageRoute { operation, title })
}
