use std::path::PathBuf;

use chrono::NaiveDate;
use jsonable::{
    fields, jsanitize, Canonical, DataFrame, Error, Jsonable, NdArray, ObjectId, SanitizeOptions,
    Series, Timestamp, ToValue, Value,
};
use serde_json::json;
use uuid::Uuid;

#[derive(Jsonable, Debug, Clone, PartialEq)]
#[jsonable(module = "tests.sanitize", version = "0.3")]
struct Probe {
    label: String,
    reading: f64,
    children: Vec<Probe>,
}

#[derive(Jsonable, Debug, Clone, Copy, PartialEq)]
#[jsonable(module = "tests.sanitize")]
enum Level {
    Low,
    #[jsonable(value = 10)]
    High,
}

#[derive(Debug, PartialEq)]
struct Opaque(u8);

#[derive(Jsonable, Debug, Clone, PartialEq)]
#[jsonable(module = "tests.sanitize", version = "0.3")]
struct Holder {
    inner: Value,
}

fn probe() -> Probe {
    Probe {
        label: "outer".into(),
        reading: 1.5,
        children: vec![Probe {
            label: "inner".into(),
            reading: 2.0,
            children: Vec::new(),
        }],
    }
}

fn json_of(cf: Canonical) -> serde_json::Value {
    cf.to_json_value().unwrap()
}

#[test]
fn objects_become_display_strings_by_default() {
    let cf = jsanitize(&probe().to_value(), SanitizeOptions::default()).unwrap();
    match cf {
        Canonical::Str(text) => assert!(text.starts_with("Probe {")),
        other => panic!("expected a string, got {other:?}"),
    }
}

#[test]
fn recursive_mode_emits_tagged_mappings() {
    let options = SanitizeOptions::default().recursive_msonable(true);
    let cf = jsanitize(&probe().to_value(), options).unwrap();
    assert_eq!(
        json_of(cf),
        json!({
            "@module": "tests.sanitize",
            "@class": "Probe",
            "@version": "0.3",
            "label": "outer",
            "reading": 1.5,
            "children": [{
                "@module": "tests.sanitize",
                "@class": "Probe",
                "@version": "0.3",
                "label": "inner",
                "reading": 2.0,
                "children": [],
            }],
        })
    );
}

#[test]
fn recursive_mode_degrades_unencodable_fields() {
    let holder = Holder {
        inner: Value::foreign(Opaque(1)),
    };
    let value = Value::Map(fields([("h", holder.to_value())]));
    let options = SanitizeOptions::default().recursive_msonable(true);
    let cf = jsanitize(&value, options).unwrap();
    assert_eq!(
        json_of(cf),
        json!({"h": {
            "@module": "tests.sanitize",
            "@class": "Holder",
            "@version": "0.3",
            "inner": "Opaque(1)",
        }})
    );

    let err = jsanitize(&value, options.strict(true)).unwrap_err();
    assert!(matches!(err, Error::Unconvertible { ref type_name } if type_name == "Opaque"));
}

#[test]
fn strict_mode_sanitizes_object_fields() {
    let value = Value::Seq(vec![probe().to_value()]);
    let cf = jsanitize(&value, SanitizeOptions::default().strict(true)).unwrap();
    assert_eq!(cf[0]["children"][0]["label"], Canonical::from("inner"));
    assert_eq!(cf[0]["@class"], Canonical::from("Probe"));
}

#[test]
fn strict_mode_rejects_opaque_values() {
    let value = Value::Map(fields([("x", Value::foreign(Opaque(1)))]));
    let err = jsanitize(&value, SanitizeOptions::default().strict(true)).unwrap_err();
    assert!(matches!(err, Error::Unconvertible { ref type_name } if type_name == "Opaque"));

    let cf = jsanitize(&value, SanitizeOptions::default()).unwrap();
    assert_eq!(cf["x"], Canonical::from("Opaque(1)"));
}

#[test]
fn enums_use_raw_values_on_request() {
    let value = Value::Seq(vec![Level::Low.to_value(), Level::High.to_value()]);
    let raw = jsanitize(&value, SanitizeOptions::default().enum_values(true)).unwrap();
    assert_eq!(json_of(raw), json!(["Low", 10]));

    let tagged = jsanitize(&value, SanitizeOptions::default()).unwrap();
    assert_eq!(tagged[1]["value"], Canonical::Int(10));
    assert_eq!(tagged[1]["@class"], Canonical::from("Level"));
}

#[test]
fn std_like_values_become_strings() {
    let when = NaiveDate::from_ymd_opt(2020, 1, 2)
        .and_then(|d| d.and_hms_opt(3, 4, 5))
        .unwrap();
    let value = Value::Seq(vec![
        Value::Path(PathBuf::from("/tmp/out")),
        Value::DateTime(Timestamp::Naive(when)),
        Value::Uuid(Uuid::nil()),
    ]);
    let cf = jsanitize(&value, SanitizeOptions::default()).unwrap();
    assert_eq!(
        json_of(cf),
        json!(["/tmp/out", "2020-01-02 03:04:05", "00000000-0000-0000-0000-000000000000"])
    );
}

#[test]
fn bson_mode_passes_native_values_through() {
    let when = Timestamp::Naive(
        NaiveDate::from_ymd_opt(2020, 1, 2)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap(),
    );
    let oid = ObjectId::from_timestamp(42);
    let value = Value::Seq(vec![Value::DateTime(when), Value::foreign(oid)]);
    let cf = jsanitize(&value, SanitizeOptions::default().allow_bson(true)).unwrap();
    assert_eq!(cf[0], Canonical::DateTime(when));
    assert_eq!(cf[1], Canonical::ObjectId(oid));
}

#[test]
fn arrays_and_tables_become_plain_data() {
    let arr = NdArray::from_f64(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    let frame = DataFrame::from_records([fields([("a", 1i64), ("b", 2)])]);
    let series = Series::new([("x", 1.5f64)]);
    let value = Value::Map(fields([
        ("arr", Value::foreign(arr)),
        ("frame", Value::foreign(frame)),
        ("series", Value::foreign(series)),
    ]));
    let cf = jsanitize(&value, SanitizeOptions::default().strict(true)).unwrap();
    assert_eq!(
        json_of(cf),
        json!({
            "arr": [[1.0, 2.0], [3.0, 4.0]],
            "frame": {"a": {"0": 1}, "b": {"0": 2}},
            "series": {"x": 1.5},
        })
    );
}
