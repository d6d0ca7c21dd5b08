//! Render options.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::RenderError;

/// Options passed to a [`RenderEngine`](crate::RenderEngine).
///
/// The output dialect is always Confluence storage format; options only
/// control template overrides and attribute bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Directory with `<node>.xml` template overrides.
    pub template_dir: Option<PathBuf>,
    /// Attribute bindings applied on top of document attribute entries.
    ///
    /// A value ending in `@` is a soft default that document entries may override.
    pub attributes: BTreeMap<String, String>,
}

impl RenderOptions {
    /// Create options with no template overrides and no attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the template override directory.
    #[must_use]
    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = Some(dir.into());
        self
    }

    /// Add one attribute binding.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Replace all attribute bindings.
    #[must_use]
    pub fn with_attributes(mut self, attributes: BTreeMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Check that the options can be used for rendering.
    ///
    /// A configured template directory must exist and be a directory.
    pub fn validate(&self) -> Result<(), RenderError> {
        if let Some(dir) = &self.template_dir {
            check_template_dir(dir)?;
        }
        Ok(())
    }
}

fn check_template_dir(dir: &Path) -> Result<(), RenderError> {
    if !dir.exists() {
        return Err(RenderError::InvalidConfig(format!(
            "template directory {} does not exist",
            dir.display()
        )));
    }
    if !dir.is_dir() {
        return Err(RenderError::InvalidConfig(format!(
            "template directory {} is not a directory",
            dir.display()
        )));
    }
    Ok(())
}
