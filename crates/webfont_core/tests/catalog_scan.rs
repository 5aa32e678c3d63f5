use std::fs;
use std::path::Path;

use webfont_core::catalog::IconFileName;
use webfont_core::{check_unique, CatalogError, IconCatalog};

const SVG: &str = r#"<svg width="10" height="10"><path d="M0 0 L10 10"/></svg>"#;

fn touch(dir: &Path, name: &str) {
    fs::write(dir.join(name), SVG).unwrap();
}

#[test]
fn scan_yields_sorted_icons_with_default_and_file_tags() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "uni0042_frown_bold.svg");
    touch(dir.path(), "uni0041_smile.svg");
    touch(dir.path(), "readme.txt");
    touch(dir.path(), "icon.svg");
    fs::create_dir(dir.path().join("uni0043_folder.svg")).unwrap();

    let catalog = IconCatalog::new(dir.path(), ["svg", "font"]);
    let icons = catalog.icons().unwrap();

    let names: Vec<_> = icons.iter().map(|icon| icon.name.as_str()).collect();
    assert_eq!(names, ["smile", "frown"]);
    assert_eq!(icons[0].code, 0x41);
    assert_eq!(icons[0].tags.iter().collect::<Vec<_>>(), ["svg", "font"]);
    assert_eq!(
        icons[1].tags.iter().collect::<Vec<_>>(),
        ["svg", "font", "bold"]
    );
    assert_eq!(icons[1].glyph_name(), "uni0042");
}

#[test]
fn repeated_scans_agree() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "uni00e9_e-acute.svg");
    touch(dir.path(), "uni0041_a_css.svg");

    let catalog = IconCatalog::new(dir.path(), ["svg"]);
    let first: Vec<_> = catalog.scan().unwrap().map(|icon| icon.file).collect();
    let second: Vec<_> = catalog.scan().unwrap().map(|icon| icon.file).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn oversized_code_points_are_skipped() {
    assert!(IconFileName::parse("uni1ffffffff_huge.svg").is_none());
    assert!(IconFileName::parse("uni0041_9lives.svg").is_none());
    let parsed = IconFileName::parse("uni0041_star_bold--css.svg").unwrap();
    assert_eq!(parsed.tags, ["bold", "css"]);
}

#[test]
fn missing_directory_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = IconCatalog::new(dir.path().join("icons"), ["svg"])
        .icons()
        .unwrap_err();
    assert!(matches!(err, CatalogError::MissingDirectory(_)));
}

#[test]
fn duplicate_code_points_and_names_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "uni0041_smile.svg");
    touch(dir.path(), "uni0041_grin.svg");
    let icons = IconCatalog::new(dir.path(), ["svg"]).icons().unwrap();
    match check_unique(&icons).unwrap_err() {
        CatalogError::DuplicateCodePoint { code, .. } => assert_eq!(code, 0x41),
        other => panic!("unexpected error: {other}"),
    }

    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "uni0041_smile.svg");
    touch(dir.path(), "uni0042_smile_bold.svg");
    let icons = IconCatalog::new(dir.path(), ["svg"]).icons().unwrap();
    match check_unique(&icons).unwrap_err() {
        CatalogError::DuplicateName { name, .. } => assert_eq!(name, "smile"),
        other => panic!("unexpected error: {other}"),
    }
}
