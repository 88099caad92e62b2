//! Page module
//!
//! A page is a titled body of text persisted as one file per title.

pub mod store;

pub use store::{LoadError, PageStore};

/// A single wiki page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    pub body: Vec<u8>,
}

impl Page {
    pub fn new(title: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Blank page carrying only a title, used for the new-page form
    pub fn blank(title: impl Into<String>) -> Self {
        Self::new(title, Vec::new())
    }
}

/// Check that a title is non-empty and made of ASCII letters and digits only
pub fn is_valid_title(title: &str) -> bool {
    !title.is_empty() && title.bytes().all(|b| b.is_ascii_alphanumeric())
}
