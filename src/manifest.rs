//! Typed records for the three kinds of manifest.
//!
//! | File | Record | Required keys |
//! |------|--------|---------------|
//! | `wobsite.toml` | [`SiteManifest`] | `site.templates`, `site.pages` |
//! | `*.template.toml` | [`TemplateManifest`] | `template.file` |
//! | `*.page.toml` | [`PageManifest`] | `page.file` |
//!
//! Every manifest may carry a `[macros]` table. Content file paths are
//! resolved against the directory holding the manifest. Records are built once
//! and never mutated.
//!
//! `page.output` and every `site.assets` entry end up joined onto the output
//! directory, so they must be relative and free of `..`. Anything else is
//! rejected here, before a build touches the file system.

use crate::keys::{KeyPath, MissingKey, scalar_text};
use crate::macros::MacroMap;
use crate::naming;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SITE_MANIFEST: &str = "wobsite.toml";
pub const TEMPLATE_SUFFIX: &str = "template.toml";
pub const PAGE_SUFFIX: &str = "page.toml";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("cannot read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("in {path}: {source}")]
    Key { path: PathBuf, source: MissingKey },
    #[error("in {path}: `{key}` = {value:?} must be a relative path below its directory")]
    EscapingPath {
        path: PathBuf,
        key: String,
        value: String,
    },
}

/// Scope-local macros plus the keys that were dropped for not being scalars.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroTable {
    pub values: MacroMap,
    pub skipped: Vec<String>,
}

impl MacroTable {
    fn read(document: &toml::Table) -> Self {
        let mut table = MacroTable::default();
        let Some(macros) = KeyPath::new("macros").optional::<toml::Table>(document) else {
            return table;
        };
        for (key, value) in &macros {
            match scalar_text(value) {
                Some(text) => {
                    table.values.insert(key.clone(), text);
                }
                None => table.skipped.push(key.clone()),
            }
        }
        table
    }
}

#[derive(Debug, Clone)]
pub struct SiteManifest {
    /// Path of `wobsite.toml`.
    pub path: PathBuf,
    /// Directory holding `wobsite.toml`.
    pub root: PathBuf,
    pub name: String,
    /// Directory lists as written, relative to `root`.
    pub templates: Vec<String>,
    pub pages: Vec<String>,
    pub assets: Vec<String>,
    pub build: String,
    pub macros: MacroTable,
}

impl SiteManifest {
    pub fn parse(path: &Path, text: &str) -> Result<(Self, toml::Table), ManifestError> {
        let document = parse_document(path, text)?;
        let root = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let site = KeyPath::new("site");
        let key_err = |source| ManifestError::Key {
            path: path.to_path_buf(),
            source,
        };

        let assets_key = site.child("assets");
        let assets: Vec<String> = assets_key.defaulted(&document, Vec::new());
        for dir in &assets {
            stays_inside(path, &assets_key, dir)?;
        }

        let manifest = SiteManifest {
            path: path.to_path_buf(),
            name: site
                .child("name")
                .optional(&document)
                .unwrap_or_else(|| default_site_name(&root)),
            templates: site.child("templates").required(&document).map_err(key_err)?,
            pages: site.child("pages").required(&document).map_err(key_err)?,
            assets,
            build: site
                .child("build")
                .defaulted(&document, "output".to_string()),
            macros: MacroTable::read(&document),
            root,
        };
        Ok((manifest, document))
    }

    /// Load `wobsite.toml`, returning the record and the parsed document
    /// (other tables are read by their own modules).
    pub fn load(path: &Path) -> Result<(Self, toml::Table), ManifestError> {
        Self::parse(path, &read(path)?)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.build)
    }

    /// Every configured source directory, resolved against the root.
    pub fn source_dirs(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.templates
            .iter()
            .chain(&self.pages)
            .chain(&self.assets)
            .map(|dir| self.root.join(dir))
    }
}

fn default_site_name(root: &Path) -> String {
    let absolute = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    absolute
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct TemplateManifest {
    pub path: PathBuf,
    /// Content file, resolved against the manifest directory.
    pub file: PathBuf,
    pub name: String,
    pub macros: MacroTable,
}

impl TemplateManifest {
    pub fn parse(path: &Path, text: &str) -> Result<Self, ManifestError> {
        let document = parse_document(path, text)?;
        let template = KeyPath::new("template");
        let file: String = template
            .child("file")
            .required(&document)
            .map_err(|source| ManifestError::Key {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(TemplateManifest {
            path: path.to_path_buf(),
            file: sibling(path, &file),
            name: template
                .child("name")
                .optional(&document)
                .unwrap_or_else(|| naming::base_name(path)),
            macros: MacroTable::read(&document),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        Self::parse(path, &read(path)?)
    }
}

#[derive(Debug, Clone)]
pub struct PageManifest {
    pub path: PathBuf,
    pub file: PathBuf,
    pub template: Option<String>,
    /// Artifact name, without the output extension unless one was given.
    pub output: String,
    pub macros: MacroTable,
}

impl PageManifest {
    pub fn parse(path: &Path, text: &str) -> Result<Self, ManifestError> {
        let document = parse_document(path, text)?;
        let page = KeyPath::new("page");
        let file: String = page
            .child("file")
            .required(&document)
            .map_err(|source| ManifestError::Key {
                path: path.to_path_buf(),
                source,
            })?;
        let output_key = page.child("output");
        let output = output_key
            .optional(&document)
            .unwrap_or_else(|| naming::stem(&file));
        stays_inside(path, &output_key, &output)?;
        Ok(PageManifest {
            path: path.to_path_buf(),
            template: page.child("template").optional(&document),
            output,
            file: sibling(path, &file),
            macros: MacroTable::read(&document),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        Self::parse(path, &read(path)?)
    }
}

fn read(path: &Path) -> Result<String, ManifestError> {
    fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_document(path: &Path, text: &str) -> Result<toml::Table, ManifestError> {
    toml::from_str(text).map_err(|source| ManifestError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

fn stays_inside(manifest: &Path, key: &KeyPath, value: &str) -> Result<(), ManifestError> {
    if naming::stays_inside(value) {
        Ok(())
    } else {
        Err(ManifestError::EscapingPath {
            path: manifest.to_path_buf(),
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

fn sibling(manifest: &Path, file: &str) -> PathBuf {
    manifest.parent().unwrap_or(Path::new(".")).join(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_manifest_defaults() {
        let (site, _) = SiteManifest::parse(
            Path::new("/srv/blog/wobsite.toml"),
            "[site]\ntemplates = \"t\"\npages = [\"p\", \"q\"]",
        )
        .unwrap();
        assert_eq!(site.name, "blog");
        assert_eq!(site.templates, vec!["t"]);
        assert_eq!(site.pages, vec!["p", "q"]);
        assert!(site.assets.is_empty());
        assert_eq!(site.build, "output");
        assert_eq!(site.output_dir(), PathBuf::from("/srv/blog/output"));
    }

    #[test]
    fn site_manifest_missing_pages_names_key() {
        let err = SiteManifest::parse(Path::new("wobsite.toml"), "[site]\ntemplates = \"t\"")
            .unwrap_err();
        match err {
            ManifestError::Key { source, .. } => assert_eq!(source.path, "site.pages"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn site_source_dirs_include_assets() {
        let (site, _) = SiteManifest::parse(
            Path::new("/s/wobsite.toml"),
            "[site]\ntemplates = \"t\"\npages = \"p\"\nassets = \"a\"",
        )
        .unwrap();
        let dirs: Vec<PathBuf> = site.source_dirs().collect();
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/s/t"),
                PathBuf::from("/s/p"),
                PathBuf::from("/s/a")
            ]
        );
    }

    #[test]
    fn template_name_defaults_to_base_name() {
        let t = TemplateManifest::parse(
            Path::new("/s/templates/base.template.toml"),
            "[template]\nfile = \"base.html\"",
        )
        .unwrap();
        assert_eq!(t.name, "base");
        assert_eq!(t.file, PathBuf::from("/s/templates/base.html"));
    }

    #[test]
    fn template_explicit_name_and_macros() {
        let t = TemplateManifest::parse(
            Path::new("x.template.toml"),
            "[template]\nname = \"main\"\nfile = \"m.html\"\n[macros]\nx = \"B\"",
        )
        .unwrap();
        assert_eq!(t.name, "main");
        assert_eq!(t.macros.values.get("x").map(String::as_str), Some("B"));
    }

    #[test]
    fn template_missing_file_is_error() {
        let err = TemplateManifest::parse(Path::new("x.template.toml"), "[template]\nname = \"x\"")
            .unwrap_err();
        assert!(err.to_string().contains("template.file"));
    }

    #[test]
    fn page_output_defaults_to_content_stem() {
        let p = PageManifest::parse(
            Path::new("/s/pages/about.page.toml"),
            "[page]\nfile = \"about.md\"\ntemplate = \"base\"",
        )
        .unwrap();
        assert_eq!(p.output, "about");
        assert_eq!(p.template.as_deref(), Some("base"));
        assert_eq!(p.file, PathBuf::from("/s/pages/about.md"));
    }

    #[test]
    fn page_without_template_is_templateless() {
        let p = PageManifest::parse(Path::new("raw.page.toml"), "[page]\nfile = \"raw.html\"")
            .unwrap();
        assert_eq!(p.template, None);
    }

    #[test]
    fn non_scalar_macros_are_skipped() {
        let p = PageManifest::parse(
            Path::new("p.page.toml"),
            "[page]\nfile = \"p.html\"\n[macros]\nyear = 2024\nlist = [1, 2]",
        )
        .unwrap();
        assert_eq!(p.macros.values.get("year").map(String::as_str), Some("2024"));
        assert_eq!(p.macros.skipped, vec!["list"]);
    }

    #[test]
    fn invalid_toml_names_manifest() {
        let err = PageManifest::parse(Path::new("bad.page.toml"), "[page\nfile=").unwrap_err();
        assert!(matches!(err, ManifestError::Toml { .. }));
        assert!(err.to_string().contains("bad.page.toml"));
    }

    #[test]
    fn page_output_may_not_leave_output_dir() {
        for output in ["../pages/about.html", "/tmp/about", "a/../../b"] {
            let text = format!("[page]\nfile = \"about.html\"\noutput = \"{output}\"");
            match PageManifest::parse(Path::new("/s/pages/evil.page.toml"), &text).unwrap_err() {
                ManifestError::EscapingPath { key, value, .. } => {
                    assert_eq!(key, "page.output");
                    assert_eq!(value, output);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn nested_page_output_is_allowed() {
        let p = PageManifest::parse(
            Path::new("notes.page.toml"),
            "[page]\nfile = \"notes.md\"\noutput = \"notes/index\"",
        )
        .unwrap();
        assert_eq!(p.output, "notes/index");
    }

    #[test]
    fn asset_dirs_must_be_relative() {
        for assets in ["\"/srv/shared\"", "[\"static\", \"../shared\"]", "\".\""] {
            let text = format!("[site]\ntemplates = \"t\"\npages = \"p\"\nassets = {assets}");
            match SiteManifest::parse(Path::new("/s/wobsite.toml"), &text).unwrap_err() {
                ManifestError::EscapingPath { key, .. } => assert_eq!(key, "site.assets"),
                other => panic!("unexpected error: {other}"),
            }
        }
    }
}
