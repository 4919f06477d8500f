//! Build configuration.
//!
//! Everything a site declares lives in `wobsite.toml`. The `[site]` and
//! `[macros]` tables describe *what* to build and are read by
//! [`manifest`](crate::manifest). The optional `[compile]` table decides *how*
//! the build behaves and is deserialised here:
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [compile]
//! missing_template = "skip-page"  # or "abort-build"
//! output_extension = "html"       # appended to artifact names without an extension
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// What happens when a page names a template the site does not define.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingTemplatePolicy {
    /// Fail that page alone; the other pages are still written.
    #[default]
    SkipPage,
    /// Fail the whole build at the first such page.
    AbortBuild,
}

/// The `[compile]` table of `wobsite.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileConfig {
    pub missing_template: MissingTemplatePolicy,
    /// Extension given to artifacts whose output name has none.
    pub output_extension: String,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            missing_template: MissingTemplatePolicy::default(),
            output_extension: "html".to_string(),
        }
    }
}

impl CompileConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ext = &self.output_extension;
        if ext.is_empty() {
            return Err(ConfigError::Validation(
                "compile.output_extension must not be empty".into(),
            ));
        }
        if ext.starts_with('.') {
            return Err(ConfigError::Validation(format!(
                "compile.output_extension must not start with a dot (got \"{ext}\")"
            )));
        }
        if ext.contains(['/', '\\']) {
            return Err(ConfigError::Validation(format!(
                "compile.output_extension must be a bare extension (got \"{ext}\")"
            )));
        }
        Ok(())
    }

    /// Read the `[compile]` table of a parsed site manifest. An absent table
    /// yields the defaults.
    pub fn from_document(document: &toml::Table) -> Result<Self, ConfigError> {
        let config = match document.get("compile") {
            Some(value) => value.clone().try_into()?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }
}

/// A documented `wobsite.toml` with every option at its default.
pub fn stock_config_toml() -> &'static str {
    r##"# wobsite site manifest
#
# Paths are relative to the directory holding this file.

[site]
# Display name. Defaults to the site directory name.
# name = "My Site"

# Directories scanned (non-recursively) for *.template.toml manifests.
templates = ["templates"]

# Directories scanned (non-recursively) for *.page.toml manifests.
pages = ["pages"]

# Directories copied verbatim into the output directory, under the same
# relative path. Must lie below this directory (no absolute paths, no "..").
# assets = ["static"]

# Output directory. Removed and recreated on every build.
build = "output"

# Site-wide macros, available to every template and page.
# Expand one with <wobsite-macro key="author"></wobsite-macro>.
[macros]
# author = "Jane Doe"

[compile]
# What happens when a page names a template that does not exist:
#   "skip-page"   - that page fails, every other page is still written
#   "abort-build" - the build stops at the first such page
missing_template = "skip-page"

# Extension appended to artifact names that have none.
output_extension = "html"
"##
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> toml::Table {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn defaults_when_table_absent() {
        let config = CompileConfig::from_document(&doc("[site]\npages = \"p\"")).unwrap();
        assert_eq!(config, CompileConfig::default());
        assert_eq!(config.missing_template, MissingTemplatePolicy::SkipPage);
        assert_eq!(config.output_extension, "html");
    }

    #[test]
    fn partial_table_keeps_other_defaults() {
        let config =
            CompileConfig::from_document(&doc("[compile]\nmissing_template = \"abort-build\""))
                .unwrap();
        assert_eq!(config.missing_template, MissingTemplatePolicy::AbortBuild);
        assert_eq!(config.output_extension, "html");
    }

    #[test]
    fn unknown_key_rejected() {
        let result = CompileConfig::from_document(&doc("[compile]\nmissing_templates = \"x\""));
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_policy_rejected() {
        let result = CompileConfig::from_document(&doc("[compile]\nmissing_template = \"ignore\""));
        assert!(result.is_err());
    }

    #[test]
    fn dotted_extension_rejected() {
        let result = CompileConfig::from_document(&doc("[compile]\noutput_extension = \".htm\""));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn empty_extension_rejected() {
        let config = CompileConfig {
            output_extension: String::new(),
            ..CompileConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let document = doc(stock_config_toml());
        let config = CompileConfig::from_document(&document).unwrap();
        assert_eq!(config, CompileConfig::default());
        assert!(document.get("site").is_some());
    }
}
