use std::path::Path;
use std::sync::Arc;

use jsonable::{
    settings, text, Decoder, Error, ImportReason, Jsonable, JsonableType, Registry, Settings,
};

#[derive(Jsonable, Debug, Clone, PartialEq)]
#[jsonable(module = "tests.shapes", no_register)]
struct Circle {
    radius: f64,
}

#[derive(Jsonable, Debug, Clone, PartialEq)]
#[jsonable(module = "tests.shapes", no_register)]
struct Rectangle {
    width: f64,
    #[jsonable(default = 1.0)]
    height: f64,
}

fn fixture() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/settings.yaml"))
}

fn registry() -> Arc<Registry> {
    let mut registry = Registry::with_builtins();
    registry
        .register_type::<Circle>()
        .register_type::<Rectangle>()
        .extend_redirects(settings::load_redirect(fixture()).unwrap());
    Arc::new(registry)
}

fn decode(registry: &Arc<Registry>, json: &str) -> jsonable::Result<jsonable::Value> {
    let cf = text::from_str(json)?;
    Decoder::with_registry(registry.clone()).decode(&cf)
}

#[test]
fn settings_file_builds_nested_table() {
    let table = settings::load_redirect(fixture()).unwrap();
    let target = &table["legacy.shapes"]["Square"];
    assert_eq!((target.module.as_str(), target.class.as_str()), ("tests.shapes", "Rectangle"));
    assert_eq!(table["legacy.shapes"].len(), 3);
}

#[test]
fn renamed_types_load_from_old_payloads() {
    let registry = registry();
    let circle = decode(&registry, r#"{"@module":"legacy.shapes","@class":"Circle","radius":2.5}"#)
        .unwrap();
    assert_eq!(circle.downcast_ref::<Circle>(), Some(&Circle { radius: 2.5 }));

    let square = decode(&registry, r#"{"@module":"legacy.shapes","@class":"Square","width":3.0}"#)
        .unwrap();
    assert_eq!(
        square.downcast_ref::<Rectangle>(),
        Some(&Rectangle { width: 3.0, height: 1.0 })
    );
}

#[test]
fn current_names_still_resolve() {
    let registry = registry();
    let value = decode(&registry, r#"{"@module":"tests.shapes","@class":"Circle","radius":1.0}"#)
        .unwrap();
    assert!(value.downcast_ref::<Circle>().is_some());
}

#[test]
fn failure_names_the_redirect_target() {
    let registry = registry();
    let err = decode(&registry, r#"{"@module":"legacy.shapes","@class":"Blob"}"#).unwrap_err();
    match &err {
        Error::ImportFailure {
            module,
            name,
            reason,
        } => {
            assert_eq!((module.as_str(), name.as_str()), ("tests.missing", "Blob"));
            assert_eq!(*reason, ImportReason::NoModule);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.to_string(), "No module named 'tests.missing'");
}

#[test]
fn known_module_unknown_name() {
    let registry = registry();
    let err = decode(&registry, r#"{"@module":"tests.shapes","@class":"Hexagon"}"#).unwrap_err();
    assert!(matches!(
        err,
        Error::ImportFailure {
            reason: ImportReason::NoName,
            ..
        }
    ));
    assert_eq!(
        err.to_string(),
        "cannot import name 'Hexagon' from 'tests.shapes'"
    );
}

#[test]
fn redirects_are_not_transitive() {
    let mut registry = Registry::with_builtins();
    registry
        .register_type::<Circle>()
        .register_redirect("a", "First", "b", "Second")
        .register_redirect("b", "Second", "tests.shapes", "Circle");
    let registry = Arc::new(registry);
    let err = decode(&registry, r#"{"@module":"a","@class":"First","radius":1.0}"#).unwrap_err();
    assert!(err.to_string().contains("'b'"));
}

#[test]
fn unregistered_types_need_registration() {
    let registry = Arc::new(Registry::with_builtins());
    let err = decode(&registry, r#"{"@module":"tests.shapes","@class":"Circle","radius":1.0}"#)
        .unwrap_err();
    assert!(matches!(err, Error::ImportFailure { .. }));
    assert_eq!(Circle::tag().to_string(), "tests.shapes.Circle");
}

#[test]
fn missing_settings_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::from_path(dir.path().join("absent.yaml")).unwrap();
    assert!(settings.redirect.is_empty());
    assert!(settings.redirect_table().unwrap().is_empty());
}
