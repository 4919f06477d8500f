//! End-to-end builds of the `fixtures/site` example site.

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;
use wobsite::generate::{self, GenerateError};
use wobsite::scan::ScanError;
use wobsite::target::CompileError;
use wobsite::types::Diagnostic;

fn fixture_site() -> TempDir {
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    let tmp = TempDir::new().unwrap();
    for entry in WalkDir::new(&src) {
        let entry = entry.unwrap();
        let relative = entry.path().strip_prefix(&src).unwrap();
        if relative.starts_with("output") {
            continue;
        }
        let target = tmp.path().join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
    tmp
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn read_output(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join("output").join(relative)).unwrap()
}

#[test]
fn builds_every_page_of_the_fixture() {
    let site = fixture_site();
    let report = generate::build(site.path()).unwrap();

    assert!(report.succeeded());
    assert_eq!(report.artifacts.len(), 4);
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    for name in ["index.html", "about.html", "notes/index.html", "raw.html"] {
        assert!(site.path().join("output").join(name).is_file(), "{name}");
    }
}

#[test]
fn shared_template_is_parsed_once() {
    let site = fixture_site();
    // base is used by index and about; bare by notes.
    let report = generate::build(site.path()).unwrap();
    assert_eq!(report.templates_parsed, 2);
}

#[test]
fn multi_node_page_is_wrapped_at_placeholder() {
    let site = fixture_site();
    generate::build(site.path()).unwrap();
    let html = read_output(site.path(), "index.html");

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>Home | Fixture Site</title>"), "{html}");
    assert!(html.contains("<main><div id=\"wobsite-page-content\"><h1>Welcome</h1>"), "{html}");
    assert!(html.contains("<p>This site was built by Fixture Site.</p>"), "{html}");
    assert!(html.contains("<p>Pages are plain files &amp; manifests.</p>"), "{html}");
    assert!(!html.contains("wobsite-page-placeholder"));
    assert!(!html.contains("wobsite-macro"));
}

#[test]
fn single_node_page_is_not_wrapped() {
    let site = fixture_site();
    generate::build(site.path()).unwrap();
    let html = read_output(site.path(), "about.html");

    assert!(html.contains("<main><article>"), "{html}");
    assert!(!html.contains("wobsite-page-content"));
}

#[test]
fn macro_scopes_shadow_outwards() {
    let site = fixture_site();
    generate::build(site.path()).unwrap();

    // site x = A, template x = B, about page x = C
    assert!(read_output(site.path(), "index.html").contains("<footer>x = B</footer>"));
    let about = read_output(site.path(), "about.html");
    assert!(about.contains("<footer>x = C</footer>"));
    assert!(about.contains("<p>x is C</p>"));
}

#[test]
fn root_placeholder_outputs_page_content_only() {
    let site = fixture_site();
    generate::build(site.path()).unwrap();
    assert_eq!(
        read_output(site.path(), "notes/index.html"),
        "<p>Plain notes,<br>\nkept on two lines.</p>"
    );
}

#[test]
fn templateless_page_is_raw_content_with_macros() {
    let site = fixture_site();
    generate::build(site.path()).unwrap();
    assert_eq!(
        read_output(site.path(), "raw.html"),
        "<p>one</p>\n<p>raw output</p>\n"
    );
}

#[test]
fn empty_page_leaves_empty_wrapper() {
    let site = fixture_site();
    write(site.path(), "pages/empty.html", "");
    write(
        site.path(),
        "pages/empty.page.toml",
        "[page]\nfile = \"empty.html\"\ntemplate = \"base\"\n[macros]\ntitle = \"Empty\"",
    );
    generate::build(site.path()).unwrap();
    let html = read_output(site.path(), "empty.html");
    assert!(html.contains("<main><div id=\"wobsite-page-content\"></div></main>"), "{html}");
}

#[test]
fn unknown_macro_renders_key_and_warns() {
    let site = fixture_site();
    write(site.path(), "pages/typo.html", "<p><wobsite-macro key=\"missing\"></wobsite-macro></p>");
    write(site.path(), "pages/typo.page.toml", "[page]\nfile = \"typo.html\"");
    let report = generate::build(site.path()).unwrap();

    assert_eq!(read_output(site.path(), "typo.html"), "<p>missing</p>");
    assert!(report.diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::UnknownMacro { key, .. } if key == "missing"
    )));
}

#[test]
fn duplicate_template_names_write_nothing() {
    let site = fixture_site();
    write(
        site.path(),
        "templates/clone.template.toml",
        "[template]\nname = \"base\"\nfile = \"base.html\"",
    );
    let err = generate::build(site.path()).unwrap_err();
    assert!(matches!(
        err,
        GenerateError::Scan(ScanError::DuplicateTemplate { .. })
    ));
    assert!(!site.path().join("output").exists());
}

#[test]
fn missing_template_fails_only_its_page() {
    let site = fixture_site();
    write(
        site.path(),
        "pages/orphan.page.toml",
        "[page]\nfile = \"about.html\"\ntemplate = \"gone\"\noutput = \"orphan\"",
    );
    let report = generate::build(site.path()).unwrap();

    assert!(!report.succeeded());
    assert_eq!(report.failures.len(), 1);
    match &report.failures[0].error {
        CompileError::TemplateNotFound { template, .. } => assert_eq!(template, "gone"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!site.path().join("output/orphan.html").exists());
    assert!(site.path().join("output/index.html").exists());
    assert!(site.path().join("output/about.html").exists());
}

#[test]
fn missing_directories_reported_together() {
    let site = fixture_site();
    fs::remove_dir_all(site.path().join("templates")).unwrap();
    fs::remove_dir_all(site.path().join("static")).unwrap();
    match generate::build(site.path()).unwrap_err() {
        GenerateError::Scan(ScanError::MissingDirectories(dirs)) => assert_eq!(dirs.len(), 2),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn rebuild_replaces_previous_output() {
    let site = fixture_site();
    generate::build(site.path()).unwrap();
    let first = read_output(site.path(), "index.html");

    fs::remove_file(site.path().join("pages/raw.page.toml")).unwrap();
    let report = generate::build(site.path()).unwrap();

    assert_eq!(report.artifacts.len(), 3);
    assert!(!site.path().join("output/raw.html").exists());
    assert_eq!(read_output(site.path(), "index.html"), first);
}

#[test]
fn assets_are_copied_under_their_directory_name() {
    let site = fixture_site();
    generate::build(site.path()).unwrap();
    assert!(read_output(site.path(), "static/style.css").contains("font-family"));
    assert!(site.path().join("output/static/js/site.js").is_file());
}
