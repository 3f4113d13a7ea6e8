//! Field validation for `Model`-kind types.
//!
//! Models declare their fields directly instead of going through a
//! constructor signature. Unknown keys are ignored.

use crate::convert::FromValue;
use crate::error::{Error, Result};
use crate::value::Fields;

pub struct FieldReader {
    class: String,
    fields: Fields,
}

impl FieldReader {
    pub fn new(class: impl Into<String>, fields: Fields) -> Self {
        FieldReader {
            class: class.into(),
            fields,
        }
    }

    pub fn required<T: FromValue>(&mut self, name: &str) -> Result<T> {
        match self.fields.shift_remove(name) {
            Some(value) => self.validate(name, value),
            None => Err(self.error(name, "field required")),
        }
    }

    pub fn optional<T: FromValue>(&mut self, name: &str, default: impl FnOnce() -> T) -> Result<T> {
        match self.fields.shift_remove(name) {
            Some(value) => self.validate(name, value),
            None => Ok(default()),
        }
    }

    fn validate<T: FromValue>(&self, name: &str, value: crate::Value) -> Result<T> {
        T::from_value(value).map_err(|err| self.error(name, err.to_string()))
    }

    fn error(&self, field: &str, reason: impl Into<String>) -> Error {
        Error::Validation {
            class: self.class.clone(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
