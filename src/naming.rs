//! File-name conventions shared by discovery, format dispatch and output.
//!
//! - Manifest files are recognised by a compound suffix (`base.template.toml`,
//!   `index.page.toml`), compared case-insensitively.
//! - Format dispatch uses a normalised extension: lowercase, leading dot
//!   stripped (`".HTML"` → `"html"`).
//! - A template without an explicit name is named after its manifest file up to
//!   the first dot: `base.template.toml` → `base`.
//! - A page without an explicit output name is named after its content file
//!   stem: `about.md` → `about`.
//! - Paths that are joined onto the output directory (page outputs, asset
//!   directories) must stay below it: see [`stays_inside`].

use std::path::{Component, Path};

/// Lowercase an extension and strip a leading dot.
pub fn normalize_extension(ext: &str) -> String {
    ext.strip_prefix('.').unwrap_or(ext).to_ascii_lowercase()
}

/// Normalised extension of `path`, if it has one.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| normalize_extension(&e.to_string_lossy()))
}

/// Whether the file name of `path` ends with `.{suffix}` (case-insensitive).
pub fn has_suffix(path: &Path, suffix: &str) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_string_lossy().to_ascii_lowercase();
    let suffix = format!(".{}", normalize_extension(suffix));
    name.len() > suffix.len() && name.ends_with(&suffix)
}

/// File name up to its first dot: `base.template.toml` → `base`.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .and_then(|n| n.split('.').next().map(str::to_string))
        .unwrap_or_default()
}

/// File stem: `notes/about.md` → `about`.
pub fn stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Artifact file name for a page output name.
///
/// `ext` is appended unless the name already carries an extension:
/// `index` → `index.html`, `feed.xml` → `feed.xml`.
pub fn artifact_file_name(output: &str, ext: &str) -> String {
    if Path::new(output).extension().is_some() {
        output.to_string()
    } else {
        format!("{output}.{ext}")
    }
}

/// Whether `relative`, joined onto some directory, names a path strictly
/// below that directory: not absolute, no `..`, at least one named component.
pub fn stays_inside(relative: &str) -> bool {
    let mut named = false;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(_) => named = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    named
}
