//! Typed, path-addressed lookup into parsed TOML documents.
//!
//! Every manifest key is described by a [`KeyPath`]: a sequence of table names
//! followed by a final key. Paths are plain data. Building one never touches a
//! document, and child paths are derived from a parent so shared prefixes
//! (everything under `[page]`, for instance) are stated once:
//!
//! ```
//! use wobsite::keys::KeyPath;
//!
//! let page = KeyPath::new("page");
//! let file = page.child("file");
//! assert_eq!(file.to_string(), "page.file");
//! ```
//!
//! ## Resolution modes
//!
//! | Mode | Absent key |
//! |------|------------|
//! | [`KeyPath::required`] | [`MissingKey`] error naming the full dotted path |
//! | [`KeyPath::optional`] | `None` |
//! | [`KeyPath::defaulted`] | the caller's default |
//!
//! A value of the wrong type counts as absent, so `site.templates = 3` behaves
//! exactly like a missing `site.templates`. Conversions live in [`FromToml`].

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A required key was absent (or had the wrong type).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("required key `{path}` is missing or has the wrong type")]
pub struct MissingKey {
    pub path: String,
}

/// Location of a value inside a TOML document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    tables: Vec<String>,
    key: String,
}

impl KeyPath {
    /// Build a path from dotted text: `"site.build"` → table `site`, key `build`.
    pub fn new(dotted: &str) -> Self {
        let mut parts: Vec<String> = dotted.split('.').map(str::to_string).collect();
        let key = parts.pop().unwrap_or_default();
        Self { tables: parts, key }
    }

    /// Derive a path one level below this one.
    pub fn child(&self, key: &str) -> KeyPath {
        let mut tables = self.tables.clone();
        tables.push(self.key.clone());
        let mut child = KeyPath::new(key);
        tables.append(&mut child.tables);
        child.tables = tables;
        child
    }

    /// Table names followed by the final key.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.tables
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.key.as_str()))
    }

    /// Walk `document` to the raw value. Any non-table on the way means absent.
    pub fn lookup<'a>(&self, document: &'a toml::Table) -> Option<&'a toml::Value> {
        let mut table = document;
        for name in &self.tables {
            table = table.get(name)?.as_table()?;
        }
        table.get(&self.key)
    }

    pub fn optional<T: FromToml>(&self, document: &toml::Table) -> Option<T> {
        self.lookup(document).and_then(T::from_toml)
    }

    pub fn required<T: FromToml>(&self, document: &toml::Table) -> Result<T, MissingKey> {
        self.optional(document).ok_or_else(|| MissingKey {
            path: self.to_string(),
        })
    }

    pub fn defaulted<T: FromToml>(&self, document: &toml::Table, default: T) -> T {
        self.optional(document).unwrap_or(default)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for table in &self.tables {
            write!(f, "{table}.")?;
        }
        f.write_str(&self.key)
    }
}

/// Conversion from a raw TOML value. `None` means "wrong type".
pub trait FromToml: Sized {
    fn from_toml(value: &toml::Value) -> Option<Self>;
}

impl FromToml for String {
    fn from_toml(value: &toml::Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromToml for bool {
    fn from_toml(value: &toml::Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromToml for i64 {
    fn from_toml(value: &toml::Value) -> Option<Self> {
        value.as_integer()
    }
}

impl FromToml for toml::Table {
    fn from_toml(value: &toml::Value) -> Option<Self> {
        value.as_table().cloned()
    }
}

/// A list of strings. A bare string is accepted as a one-element list so that
/// `pages = "pages"` and `pages = ["pages"]` mean the same thing.
impl FromToml for Vec<String> {
    fn from_toml(value: &toml::Value) -> Option<Self> {
        match value {
            toml::Value::String(s) => Some(vec![s.clone()]),
            toml::Value::Array(items) => items.iter().map(String::from_toml).collect(),
            _ => None,
        }
    }
}

/// A table of scalars rendered as text. Non-scalar entries are dropped; use
/// [`scalar_text`] directly when the caller needs to report them.
impl FromToml for BTreeMap<String, String> {
    fn from_toml(value: &toml::Value) -> Option<Self> {
        let table = value.as_table()?;
        Some(
            table
                .iter()
                .filter_map(|(k, v)| scalar_text(v).map(|text| (k.clone(), text)))
                .collect(),
        )
    }
}

/// Text form of a scalar value; `None` for arrays and tables.
pub fn scalar_text(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> toml::Table {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn new_splits_tables_and_key() {
        let path = KeyPath::new("site.build");
        assert_eq!(path.segments().collect::<Vec<_>>(), vec!["site", "build"]);
    }

    #[test]
    fn child_extends_prefix() {
        let site = KeyPath::new("site");
        assert_eq!(site.child("templates").to_string(), "site.templates");
        assert_eq!(site.child("a.b").to_string(), "site.a.b");
    }

    #[test]
    fn child_does_not_modify_parent() {
        let site = KeyPath::new("site");
        let _ = site.child("pages");
        assert_eq!(site.to_string(), "site");
    }

    #[test]
    fn required_present() {
        let d = doc("[page]\nfile = \"index.md\"");
        let file: String = KeyPath::new("page.file").required(&d).unwrap();
        assert_eq!(file, "index.md");
    }

    #[test]
    fn required_missing_names_full_path() {
        let d = doc("[page]\noutput = \"x\"");
        let err = KeyPath::new("page")
            .child("file")
            .required::<String>(&d)
            .unwrap_err();
        assert_eq!(err.path, "page.file");
        assert!(err.to_string().contains("page.file"));
    }

    #[test]
    fn optional_missing_is_none() {
        let d = doc("[page]");
        assert_eq!(KeyPath::new("page.template").optional::<String>(&d), None);
    }

    #[test]
    fn defaulted_missing_returns_default() {
        let d = doc("[site]");
        let out = KeyPath::new("site.build").defaulted(&d, "output".to_string());
        assert_eq!(out, "output");
    }

    #[test]
    fn type_mismatch_is_absence() {
        let d = doc("[site]\nbuild = 3");
        assert_eq!(KeyPath::new("site.build").optional::<String>(&d), None);
        assert_eq!(
            KeyPath::new("site.build").defaulted(&d, "output".to_string()),
            "output"
        );
        assert!(KeyPath::new("site.build").required::<String>(&d).is_err());
    }

    #[test]
    fn scalar_where_table_expected_is_absence() {
        let d = doc("site = \"flat\"");
        assert_eq!(KeyPath::new("site.name").optional::<String>(&d), None);
    }

    #[test]
    fn string_list_accepts_single_string() {
        let d = doc("[site]\npages = \"pages\"");
        let pages: Vec<String> = KeyPath::new("site.pages").required(&d).unwrap();
        assert_eq!(pages, vec!["pages"]);
    }

    #[test]
    fn string_list_rejects_mixed_array() {
        let d = doc("[site]\npages = [\"pages\", 1]");
        assert_eq!(KeyPath::new("site.pages").optional::<Vec<String>>(&d), None);
    }

    #[test]
    fn macro_table_stringifies_scalars() {
        let d = doc("[macros]\nname = \"x\"\nyear = 2024\nflag = true\nlist = [1]");
        let map: BTreeMap<String, String> = KeyPath::new("macros").required(&d).unwrap();
        assert_eq!(map.get("name").map(String::as_str), Some("x"));
        assert_eq!(map.get("year").map(String::as_str), Some("2024"));
        assert_eq!(map.get("flag").map(String::as_str), Some("true"));
        assert!(!map.contains_key("list"));
    }
}
