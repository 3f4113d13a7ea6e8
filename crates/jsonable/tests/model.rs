use jsonable::{Error, Jsonable, JsonableExt, JsonableType, SchemaOf, ToValue, Value};
use serde_json::json;

#[derive(Jsonable, Debug, Clone, PartialEq)]
#[jsonable(module = "tests.model", version = "0.9")]
struct Dataset {
    path: String,
    rows: i64,
}

#[derive(Jsonable, Debug, Clone, PartialEq)]
#[jsonable(module = "tests.model", model)]
struct Experiment {
    name: String,
    dataset: Dataset,
    #[jsonable(default)]
    seeds: Vec<i64>,
    #[jsonable(default = 0.5)]
    dropout_rate: f64,
}

fn experiment() -> Experiment {
    Experiment {
        name: "baseline".into(),
        dataset: Dataset {
            path: "/data/train.csv".into(),
            rows: 1000,
        },
        seeds: vec![1, 2],
        dropout_rate: 0.1,
    }
}

#[test]
fn models_round_trip_with_nested_objects() {
    let text = experiment().to_json().unwrap();
    assert!(text.contains(r#""dataset":{"@module":"tests.model","@class":"Dataset""#));
    assert_eq!(Experiment::from_json(&text).unwrap(), experiment());
}

#[test]
fn untagged_nested_mappings_are_accepted() {
    let text = r#"{
        "@module": "tests.model",
        "@class": "Experiment",
        "name": "plain",
        "dataset": {"path": "a.csv", "rows": 3},
        "unknown": true
    }"#;
    let exp = Experiment::from_json(text).unwrap();
    assert_eq!(exp.dataset.rows, 3);
    assert_eq!(exp.dropout_rate, 0.5);
    assert!(exp.seeds.is_empty());
}

#[test]
fn instances_are_accepted_as_field_values() {
    let mut fields = jsonable::Fields::new();
    fields.insert("name".into(), Value::from("direct"));
    fields.insert(
        "dataset".into(),
        Dataset {
            path: "b.csv".into(),
            rows: 1,
        }
        .to_value(),
    );
    let exp = Experiment::from_fields(fields).unwrap();
    assert_eq!(exp.dataset.path, "b.csv");
}

#[test]
fn missing_fields_fail_validation() {
    let text = r#"{"@module":"tests.model","@class":"Experiment","dataset":{"path":"a","rows":1}}"#;
    let err = Experiment::from_json(text).unwrap_err();
    match &err {
        Error::Validation { class, field, .. } => {
            assert_eq!(class, "Experiment");
            assert_eq!(field, "name");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn mistyped_fields_fail_validation() {
    let text = r#"{"@module":"tests.model","@class":"Experiment","name":"x","dataset":7}"#;
    let err = Experiment::from_json(text).unwrap_err();
    assert!(matches!(err, Error::Validation { ref field, .. } if field == "dataset"));
}

#[test]
fn schema_describes_fields_and_tags() {
    let schema = Experiment::json_schema();
    assert_eq!(schema["title"], "Experiment");
    assert_eq!(schema["required"], json!(["name", "dataset"]));
    assert_eq!(
        schema["properties"]["dropout_rate"],
        json!({"title": "Dropout Rate", "type": "number"})
    );
    assert_eq!(
        schema["properties"]["dataset"],
        json!({
            "title": "Dataset",
            "type": "object",
            "properties": {
                "@class": {"enum": ["Dataset"], "type": "string"},
                "@module": {"enum": ["tests.model"], "type": "string"},
                "@version": {"type": "string"},
            },
            "required": ["@class", "@module"],
        })
    );
}

#[test]
fn hash_tracks_representation() {
    let a = experiment();
    let mut b = experiment();
    assert_eq!(a.unsafe_hash().unwrap(), b.unsafe_hash().unwrap());

    b.seeds.reverse();
    assert_ne!(a.unsafe_hash().unwrap(), b.unsafe_hash().unwrap());
}
