use std::fs;

use webfont_core::extension::{required_tags, ExtensionOrigin, LOCAL_EXTENSIONS_DIR};
use webfont_core::{Capability, ExtensionRegistry, IconRecord, OptionsAggregator, RegistryError};

#[test]
fn builtins_are_registered_under_their_tags() {
    let registry = ExtensionRegistry::with_builtins();
    let tags: Vec<_> = registry.builtins().map(|extension| extension.tag().to_string()).collect();
    assert_eq!(tags, ["colors", "css", "css-vars", "font", "svg"]);
}

#[test]
fn svg_and_font_resolve_to_exactly_two_extensions() {
    let registry = ExtensionRegistry::with_builtins();
    let resolved = registry.resolve(["svg", "font"]).unwrap();
    assert_eq!(resolved.tags(), ["svg", "font"]);
    assert!(resolved
        .iter()
        .all(|entry| entry.origin == ExtensionOrigin::Builtin));
}

#[test]
fn unknown_tag_fails_resolution() {
    let registry = ExtensionRegistry::with_builtins();
    let err = registry.resolve(["svg", "font", "bogus"]).unwrap_err();
    assert_eq!(err, RegistryError::UnknownExtension("bogus".to_string()));
}

#[test]
fn css_without_font_is_a_peer_dependency_error() {
    let registry = ExtensionRegistry::with_builtins();
    let err = registry.resolve(["svg", "css"]).unwrap_err();
    assert_eq!(
        err,
        RegistryError::PeerDependency {
            extension: "css".to_string(),
            missing: "font".to_string(),
        }
    );
}

#[test]
fn builtin_chain_runs_in_dependency_order() {
    let registry = ExtensionRegistry::with_builtins();
    let resolved = registry
        .resolve(["css-vars", "colors", "css", "font", "svg"])
        .unwrap();
    assert_eq!(resolved.tags(), ["svg", "colors", "font", "css", "css-vars"]);
}

#[test]
fn icon_tags_pull_in_project_local_manifests() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join(LOCAL_EXTENSIONS_DIR);
    fs::create_dir(&local).unwrap();
    fs::write(
        local.join("bold.yml"),
        "tag: bold\nversion: 1.0.0\nrequires: [font]\noptions:\n  - name: bold-weight\n    kind: integer\n    default: 700\n",
    )
    .unwrap();

    let icons = vec![
        IconRecord::new("uni0041_smile.svg", 0x41, "smile").with_tags(["svg", "font"]),
        IconRecord::new("uni0042_frown_bold.svg", 0x42, "frown")
            .with_tags(["svg", "font", "bold"]),
    ];
    let tags = required_tags(&["svg".to_string(), "font".to_string()], &icons);

    let registry = ExtensionRegistry::with_builtins().with_local_dir(&local);
    let resolved = registry.resolve(&tags).unwrap();
    assert_eq!(resolved.tags(), ["svg", "font", "bold"]);

    let bold = resolved.get("bold").unwrap();
    assert_eq!(bold.origin, ExtensionOrigin::ProjectLocal(local.join("bold.yml")));
    assert!(bold.implements(Capability::DeclareOptions));
    assert!(!bold.implements(Capability::Process));

    let schema = OptionsAggregator::new(&resolved).schema().unwrap();
    assert!(schema.spec("bold-weight").is_some());
    assert!(schema.spec("font-family").is_some());
}

#[test]
fn project_local_manifest_shadows_builtin() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("colors.yaml"), "tag: colors\nversion: 2.0.0\n").unwrap();

    let registry = ExtensionRegistry::with_builtins().with_local_dir(dir.path());
    let resolved = registry.resolve(["svg", "colors"]).unwrap();
    let colors = resolved.get("colors").unwrap();
    assert!(matches!(colors.origin, ExtensionOrigin::ProjectLocal(_)));
    assert_eq!(colors.extension.version(), "2.0.0");
    assert!(colors.capabilities.is_empty());
}

#[test]
fn invalid_manifest_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bold.yml"), "tag: heavy\nversion: 1.0.0\n").unwrap();

    let registry = ExtensionRegistry::with_builtins().with_local_dir(dir.path());
    let err = registry.resolve(["bold"]).unwrap_err();
    assert!(matches!(err, RegistryError::InvalidManifest { .. }));
}

#[test]
fn manifest_capabilities_drive_the_hooks_run() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("audit.yml"),
        "tag: audit\nversion: 1.0.0\nrequires: [svg]\ncapabilities: [init, finish]\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("shadow.yml"),
        "tag: shadow\nversion: 1.0.0\ncapabilities: [process, paint]\n",
    )
    .unwrap();

    let registry = ExtensionRegistry::with_builtins().with_local_dir(dir.path());
    let resolved = registry.resolve(["svg", "audit"]).unwrap();
    let audit = resolved.get("audit").unwrap();
    assert!(audit.implements(Capability::Init));
    assert!(audit.implements(Capability::Finish));
    assert!(!audit.implements(Capability::DeclareOptions));

    let icon = IconRecord::new("uni0041_smile.svg", 0x41, "smile").with_tags(["svg", "audit"]);
    let per_icon: Vec<_> = resolved
        .for_icon(&icon)
        .iter()
        .map(|entry| entry.tag.as_str())
        .collect();
    assert_eq!(per_icon, ["svg"]);

    let err = registry.resolve(["shadow"]).unwrap_err();
    match err {
        RegistryError::InvalidManifest { reason, .. } => assert!(reason.contains("paint")),
        other => panic!("unexpected error: {other}"),
    }
}
