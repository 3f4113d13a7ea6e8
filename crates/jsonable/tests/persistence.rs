use std::fs;

use jsonable::{load, load_as, save, Error, Jsonable, JsonableExt, JsonableType, SaveOptions, ToValue};

#[derive(Jsonable, Debug, Clone, PartialEq)]
#[jsonable(module = "tests.persistence", version = "3")]
struct Checkpoint {
    step: i64,
    loss: f64,
    notes: Vec<String>,
}

fn checkpoint() -> Checkpoint {
    Checkpoint {
        step: 400,
        loss: 0.125,
        notes: vec!["warmup done".into()],
    }
}

#[test]
fn save_then_load_reconstructs_an_equal_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checkpoint.json");
    checkpoint().save(&path, &SaveOptions::default()).unwrap();

    assert_eq!(Checkpoint::load(&path).unwrap(), checkpoint());
    assert_eq!(load_as::<Checkpoint>(&path).unwrap(), checkpoint());
    assert_eq!(load(&path).unwrap(), checkpoint().to_value());
}

#[test]
fn existing_files_are_protected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checkpoint.json");
    fs::write(&path, "{}").unwrap();

    let err = checkpoint().save(&path, &SaveOptions::default()).unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(ref p) if p == &path));
    assert!(err.to_string().starts_with("File exists"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "{}");

    checkpoint()
        .save(&path, &SaveOptions::default().overwrite(true))
        .unwrap();
    assert_eq!(Checkpoint::load(&path).unwrap(), checkpoint());
}

#[test]
fn text_options_shape_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sorted.json");
    let options = SaveOptions::default().indent(2).sort_keys(true);
    save(&checkpoint().to_value(), &path, &options).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("{\n  \"@class\": \"Checkpoint\",\n  \"@module\""));
    assert_eq!(Checkpoint::load(&path).unwrap(), checkpoint());
}

#[test]
fn yaml_files_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checkpoint.yml");
    checkpoint().save(&path, &SaveOptions::default()).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("@class") && !text.contains('{'));
    assert_eq!(Checkpoint::load(&path).unwrap(), checkpoint());
}

#[test]
fn loading_a_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
