//! Integration tests for modelkit-workspace
//!
//! Workspaces are built from a configuration file over temporary source
//! directories holding component type documents.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use modelkit_core::{
    ChangeEvent, ChangeKind, ExtensionPropertyRegistry, PartContainer, ValidationContext,
};
use modelkit_types::{component, rules, ComponentType};
use modelkit_workspace::{Document, Error, ObjectKind, ObjectKindRegistry, Workspace};
use tempfile::TempDir;

fn component_kind() -> ObjectKind {
    ObjectKind::new(component::TAG, "ctype", ComponentType::boxed)
}

fn kinds() -> ObjectKindRegistry {
    let mut kinds = ObjectKindRegistry::new();
    kinds.register(component_kind()).unwrap();
    kinds
}

fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Two projects: `base` and `ext`, which depends on `base`
fn setup() -> (TempDir, Workspace) {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "workspace.yaml",
        "projects:\n  - {name: base, root: base}\n  - {name: ext, root: ext, dependencies: [base]}\n",
    );
    write(
        dir.path(),
        "base/policy/Policy.ctype",
        r#"<ComponentType abstract="true">
             <Attribute id="a1" name="sum" datatype="Money"/>
           </ComponentType>"#,
    );
    write(
        dir.path(),
        "ext/motor/Car.ctype",
        r#"<ComponentType supertype="policy.Policy">
             <Attribute id="c1" name="limit" datatype="Money" overrides="true"/>
           </ComponentType>"#,
    );
    let mut workspace = Workspace::open(&dir.path().join("workspace.yaml"), kinds()).unwrap();
    assert!(workspace.load_all().is_empty());
    (dir, workspace)
}

fn policy_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("base/policy/Policy.ctype")
}

#[test]
fn test_edit_marks_dirty_and_save_marks_clean() {
    let (dir, mut workspace) = setup();
    let document = workspace.document_mut("base", "policy.Policy").unwrap();
    assert!(!document.is_dirty());

    let policy = document.root_as_mut::<ComponentType>().unwrap();
    assert!(policy.set_abstract(false));
    assert!(document.is_dirty());

    document.save(false).unwrap();
    assert!(!document.is_dirty());
    let written = fs::read_to_string(policy_path(&dir)).unwrap();
    assert!(written.contains(r#"abstract="false""#), "{written}");
    assert!(written.contains(r#"id="a1""#), "{written}");
}

#[test]
fn test_save_over_external_change_is_a_conflict() {
    let (dir, mut workspace) = setup();
    fs::write(
        policy_path(&dir),
        r#"<ComponentType><Attribute id="x" name="changed" datatype="String"/></ComponentType>"#,
    )
    .unwrap();

    let document = workspace.document_mut("base", "policy.Policy").unwrap();
    document
        .root_as_mut::<ComponentType>()
        .unwrap()
        .set_supertype(Some("other.Base"));

    assert!(matches!(document.save(false), Err(Error::WriteConflict { .. })));
    assert!(document.is_dirty());
    assert!(fs::read_to_string(policy_path(&dir)).unwrap().contains("changed"));

    document.save(true).unwrap();
    assert!(!document.is_dirty());
    assert!(fs::read_to_string(policy_path(&dir)).unwrap().contains("other.Base"));
}

#[test]
fn test_discard_restores_saved_state_and_keeps_identity() {
    let (_dir, mut workspace) = setup();
    let replaced = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&replaced);
    workspace.listeners().add(Arc::new(move |event: &ChangeEvent| {
        if event.kind == ChangeKind::ContentReplaced {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }));

    let document = workspace.document_mut("base", "policy.Policy").unwrap();
    let before = document
        .root_as::<ComponentType>()
        .unwrap()
        .attribute("sum")
        .unwrap()
        .instance();

    let policy = document.root_as_mut::<ComponentType>().unwrap();
    policy.set_supertype(Some("p.Elsewhere"));
    policy.new_attribute("extra").unwrap();
    assert!(document.is_dirty());

    document.discard_changes().unwrap();
    assert!(!document.is_dirty());
    assert_eq!(replaced.load(Ordering::SeqCst), 1);

    let policy = document.root_as::<ComponentType>().unwrap();
    assert_eq!(policy.supertype(), None);
    assert!(policy.is_abstract());
    assert!(policy.attribute("extra").is_none());
    assert_eq!(policy.attribute("sum").unwrap().instance(), before);

    // Nothing to discard on a clean document
    document.discard_changes().unwrap();
    assert_eq!(replaced.load(Ordering::SeqCst), 1);
}

#[test]
fn test_refresh_reconciles_clean_documents_only() {
    let (dir, mut workspace) = setup();
    let before = workspace
        .document_mut("base", "policy.Policy")
        .unwrap()
        .root_as::<ComponentType>()
        .unwrap()
        .attribute("sum")
        .unwrap()
        .instance();

    fs::write(
        policy_path(&dir),
        r#"<ComponentType>
             <Attribute id="a1" name="sum" datatype="Decimal"/>
             <Attribute id="a2" name="rate" datatype="Decimal"/>
           </ComponentType>"#,
    )
    .unwrap();

    let (replaced, failures) = workspace.refresh_all();
    assert_eq!(replaced, vec!["policy.Policy"]);
    assert!(failures.is_empty());

    let document = workspace.document_mut("base", "policy.Policy").unwrap();
    let policy = document.root_as::<ComponentType>().unwrap();
    let sum = policy.attribute("sum").unwrap();
    assert_eq!(sum.instance(), before);
    assert_eq!(sum.datatype(), "Decimal");
    assert!(policy.attribute("rate").is_some());
    assert!(!policy.is_abstract());

    // A dirty document keeps its edits
    document.root_as_mut::<ComponentType>().unwrap().set_abstract(true);
    fs::write(policy_path(&dir), "<ComponentType/>").unwrap();
    assert!(!document.refresh().unwrap());
    assert!(document.root_as::<ComponentType>().unwrap().attribute("rate").is_some());
}

#[test]
fn test_unparsable_document_refuses_access_until_fixed() {
    let (dir, mut workspace) = setup();
    write(dir.path(), "base/policy/Broken.ctype", "<ComponentType><Attribute");
    let kinds = kinds();
    let registry = Arc::clone(workspace.registry());
    let listeners = Arc::clone(workspace.listeners());
    let project = workspace.project_mut("base").unwrap();
    assert_eq!(project.scan(&kinds, &registry, &listeners).unwrap(), 1);

    let failures = project.load_all();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0].1, Error::Parse { .. }));

    let document = project.document_mut("policy.Broken").unwrap();
    assert!(!document.is_parsable());
    assert!(matches!(document.root(), Err(Error::ContentUnavailable { .. })));
    assert!(matches!(document.save(false), Err(Error::ContentUnavailable { .. })));

    write(dir.path(), "base/policy/Broken.ctype", r#"<ComponentType abstract="true"/>"#);
    assert!(document.refresh().unwrap());
    assert!(document.is_parsable());
    assert!(document.root_as::<ComponentType>().unwrap().is_abstract());
}

#[test]
fn test_wrong_root_element_is_a_parse_error() {
    let (dir, mut workspace) = setup();
    write(dir.path(), "ext/motor/Odd.ctype", "<Something/>");
    let kinds = kinds();
    let registry = Arc::clone(workspace.registry());
    let listeners = Arc::clone(workspace.listeners());
    let project = workspace.project_mut("ext").unwrap();
    project.scan(&kinds, &registry, &listeners).unwrap();

    let err = project.document_mut("motor.Odd").unwrap().ensure_loaded().unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
    assert!(err.to_string().contains("<Something>"), "{err}");
}

#[test]
fn test_historic_documents_are_frozen_and_never_invalid() {
    let mut document = Document::historic(
        "policy.Old",
        component_kind(),
        r#"<ComponentType supertype="gone.Missing"/>"#,
        Arc::new(ExtensionPropertyRegistry::new()),
    )
    .unwrap();

    assert!(document.is_historic());
    assert!(!document.is_dirty());
    assert!(matches!(document.root_mut(), Err(Error::Frozen { .. })));
    assert!(matches!(document.save(true), Err(Error::Frozen { .. })));
    assert!(matches!(document.discard_changes(), Err(Error::Frozen { .. })));

    let root = document.root().unwrap();
    let project = modelkit_core::EmptyProject::default();
    let messages = modelkit_validation::ValidationEngine::new()
        .validate(root, &ValidationContext::new(&project));
    assert!(messages.is_empty());
}

#[test]
fn test_lookup_reaches_dependencies_but_not_dependents() {
    let (dir, mut workspace) = setup();
    write(
        dir.path(),
        "base/policy/Special.ctype",
        r#"<ComponentType supertype="motor.Car"/>"#,
    );
    let kinds = kinds();
    let registry = Arc::clone(workspace.registry());
    let listeners = Arc::clone(workspace.listeners());
    workspace
        .project_mut("base")
        .unwrap()
        .scan(&kinds, &registry, &listeners)
        .unwrap();
    assert!(workspace.load_all().is_empty());

    let car = workspace.validate_document("ext", "motor.Car").unwrap();
    assert!(car.by_code(rules::SUPERTYPE_NOT_FOUND).is_none());

    let special = workspace.validate_document("base", "policy.Special").unwrap();
    assert!(special.by_code(rules::SUPERTYPE_NOT_FOUND).is_some());

    let results = workspace.validate_project("base").unwrap();
    let names: Vec<&str> = results.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["policy.Policy", "policy.Special"]);
}

#[test]
fn test_edit_in_one_document_revalidates_another() {
    let (_dir, mut workspace) = setup();

    let car = workspace.validate_document("ext", "motor.Car").unwrap();
    assert!(car.by_code(rules::OVERRIDDEN_ATTRIBUTE_NOT_FOUND).is_some());

    let policy = workspace
        .document_mut("base", "policy.Policy")
        .unwrap()
        .root_as_mut::<ComponentType>()
        .unwrap();
    policy.new_attribute("limit").unwrap().set_datatype("Money");

    let car = workspace.validate_document("ext", "motor.Car").unwrap();
    assert!(car.by_code(rules::OVERRIDDEN_ATTRIBUTE_NOT_FOUND).is_none(), "{car:?}");
}

#[test]
fn test_unknown_project_and_document() {
    let (_dir, workspace) = setup();
    assert!(matches!(
        workspace.document("nope", "policy.Policy"),
        Err(Error::UnknownProject(_))
    ));
    assert!(matches!(
        workspace.document("base", "policy.Nope"),
        Err(Error::UnknownDocument(_))
    ));
    let root = workspace
        .document("base", "policy.Policy")
        .unwrap()
        .loaded_root()
        .unwrap();
    assert_eq!(root.kind(), component::TAG);
}
