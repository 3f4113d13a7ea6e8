//! JSON Schema export.
//!
//! Participating object types describe only their tag keys, so a
//! validating consumer can recognise a tagged payload without knowing the
//! type's fields. Models describe every field.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde_json::{json, Map, Value as Json};
use uuid::Uuid;

use crate::canonical::{CLASS_KEY, MODULE_KEY, VERSION_KEY};
use crate::object::TypeTag;
use crate::value::{Timestamp, Value};

pub trait SchemaOf {
    fn json_schema() -> Json;
}

/// Schema of a tagged mapping for the type named by `tag`.
pub fn tag_schema(tag: &TypeTag) -> Json {
    json!({
        "type": "object",
        "properties": {
            CLASS_KEY: {"enum": [tag.class], "type": "string"},
            MODULE_KEY: {"enum": [tag.module], "type": "string"},
            VERSION_KEY: {"type": "string"},
        },
        "required": [CLASS_KEY, MODULE_KEY],
    })
}

/// A model schema from `(field, schema, required)` triples. Each property
/// gets a title derived from its field name.
pub fn model_schema<'a, I>(title: &str, fields: I) -> Json
where
    I: IntoIterator<Item = (&'a str, Json, bool)>,
{
    let mut properties = Map::new();
    let mut required = Vec::new();
    for (name, schema, is_required) in fields {
        let mut property = Map::new();
        property.insert("title".into(), Json::String(title_case(name)));
        match schema {
            Json::Object(entries) => property.extend(entries),
            other => {
                property.insert("allOf".into(), Json::Array(vec![other]));
            }
        }
        properties.insert(name.to_string(), Json::Object(property));
        if is_required {
            required.push(Json::String(name.to_string()));
        }
    }
    let mut schema = Map::new();
    schema.insert("title".into(), Json::String(title.to_string()));
    schema.insert("type".into(), Json::String("object".into()));
    schema.insert("properties".into(), Json::Object(properties));
    if !required.is_empty() {
        schema.insert("required".into(), Json::Array(required));
    }
    Json::Object(schema)
}

/// `snake_case` to `Title Case`.
pub fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

macro_rules! schema_of {
    ($schema:tt => $($ty:ty),+) => {
        $(impl SchemaOf for $ty {
            fn json_schema() -> Json {
                json!($schema)
            }
        })+
    };
}

schema_of!({"type": "boolean"} => bool);
schema_of!({"type": "integer"} => i8, i16, i32, i64, u8, u16, u32, u64, usize);
schema_of!({"type": "number"} => f32, f64);
schema_of!({"type": "string"} => String, str);
schema_of!({"type": "string", "format": "path"} => PathBuf);
schema_of!({"type": "string", "format": "uuid"} => Uuid);
schema_of!({"type": "string", "format": "date-time"} =>
    Timestamp, NaiveDateTime, DateTime<FixedOffset>, DateTime<Utc>);
schema_of!({} => Value);

impl<T: SchemaOf> SchemaOf for Option<T> {
    fn json_schema() -> Json {
        json!({"anyOf": [T::json_schema(), {"type": "null"}]})
    }
}

impl<T: SchemaOf> SchemaOf for Vec<T> {
    fn json_schema() -> Json {
        json!({"type": "array", "items": T::json_schema()})
    }
}

macro_rules! schema_of_map {
    ($($map:ident),+) => {
        $(impl<T: SchemaOf> SchemaOf for $map<String, T> {
            fn json_schema() -> Json {
                json!({"type": "object", "additionalProperties": T::json_schema()})
            }
        })+
    };
}

schema_of_map!(IndexMap, BTreeMap, HashMap);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_schema_requires_class_and_module() {
        let schema = tag_schema(&TypeTag::new("shapes", "Circle"));
        assert_eq!(schema["properties"]["@class"]["enum"], json!(["Circle"]));
        assert_eq!(schema["properties"]["@module"]["enum"], json!(["shapes"]));
        assert_eq!(schema["properties"]["@version"], json!({"type": "string"}));
        assert_eq!(schema["required"], json!(["@class", "@module"]));
    }

    #[test]
    fn model_properties_get_titles() {
        let schema = model_schema(
            "Job",
            [
                ("max_retries", i64::json_schema(), true),
                ("label", Option::<String>::json_schema(), false),
            ],
        );
        assert_eq!(schema["title"], "Job");
        assert_eq!(
            schema["properties"]["max_retries"],
            json!({"title": "Max Retries", "type": "integer"})
        );
        assert_eq!(schema["properties"]["label"]["title"], "Label");
        assert_eq!(schema["required"], json!(["max_retries"]));
    }

    #[test]
    fn containers_nest() {
        assert_eq!(
            Vec::<IndexMap<String, f64>>::json_schema(),
            json!({"type": "array", "items": {"type": "object", "additionalProperties": {"type": "number"}}})
        );
        assert_eq!(title_case("_private_name"), "Private Name");
    }
}
