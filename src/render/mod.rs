//! Template rendering module
//!
//! The template set is read once at startup and is immutable afterwards. It
//! is owned by the application state and handed to request handlers from
//! there.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use minijinja::{context, Environment};

use crate::page::Page;

/// The fixed set of page templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateName {
    Edit,
    View,
}

impl TemplateName {
    pub const ALL: [Self; 2] = [Self::Edit, Self::View];

    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Edit => "edit.html",
            Self::View => "view.html",
        }
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("read template {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("{0}")]
    Template(#[from] minijinja::Error),
}

/// Compiled page templates
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Read and compile `edit.html` and `view.html` from `dir`
    ///
    /// Any missing or malformed template is an error; the server refuses to
    /// start without both.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, RenderError> {
        let dir = dir.as_ref();
        let mut env = Environment::new();
        for name in TemplateName::ALL {
            let path = dir.join(name.file_name());
            let source = std::fs::read_to_string(&path)
                .map_err(|source| RenderError::Read { path, source })?;
            env.add_template_owned(name.file_name(), source)?;
        }
        Ok(Self { env })
    }

    /// Compile templates from in-memory sources
    #[cfg(test)]
    pub fn from_sources(edit: &str, view: &str) -> Result<Self, RenderError> {
        let mut env = Environment::new();
        env.add_template_owned(TemplateName::Edit.file_name(), edit.to_string())?;
        env.add_template_owned(TemplateName::View.file_name(), view.to_string())?;
        Ok(Self { env })
    }

    /// Substitute the page's `title` and `body` into a template
    pub fn render(&self, name: TemplateName, page: &Page) -> Result<String, RenderError> {
        let template = self.env.get_template(name.file_name())?;
        let body = String::from_utf8_lossy(&page.body).into_owned();
        let html = template.render(context! {
            title => page.title.as_str(),
            body => body,
        })?;
        Ok(html)
    }
}

impl fmt::Debug for Templates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Templates")
            .field("templates", &TemplateName::ALL)
            .finish()
    }
}
