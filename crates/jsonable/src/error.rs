use std::path::PathBuf;

use thiserror::Error;

use crate::convert::Mismatch;
use crate::text::TextError;

/// Why a `(namespace, name)` pair could not be loaded from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportReason {
    /// Nothing at all is registered under the namespace.
    NoModule,
    /// The namespace exists but does not contain the name.
    NoName,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Object of type {type_name} is not JSON serializable: {reason}")]
    Unencodable { type_name: String, reason: String },

    #[error(
        "Unable to automatically determine the field layout of {class}: constructor parameter \
         '{param}' is stored neither as `{param}` nor as `_{param}`. Implement both to_fields \
         and from_fields."
    )]
    Unreconstructable { class: String, param: String },

    #[error("{class}.from_fields(): {reason}")]
    IncompatibleConstructor { class: String, reason: String },

    #[error("{}", import_message(.module, .name, *.reason))]
    ImportFailure {
        module: String,
        name: String,
        reason: ImportReason,
    },

    #[error("Unable to resolve callable '{qualname}' from module '{module}'")]
    CallableResolution { module: String, qualname: String },

    #[error("File exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("{type_name} has no canonical representation in strict mode")]
    Unconvertible { type_name: String },

    #[error("validation failed for {class}.{field}: {reason}")]
    Validation {
        class: String,
        field: String,
        reason: String,
    },

    #[error("maximum nesting depth of {max_depth} exceeded")]
    DepthExceeded { max_depth: usize },

    #[error("malformed {class} payload: {reason}")]
    Malformed { class: String, reason: String },

    #[error(transparent)]
    Mismatch(#[from] Mismatch),

    #[error(transparent)]
    Text(#[from] TextError),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid settings: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, Error>;

fn import_message(module: &str, name: &str, reason: ImportReason) -> String {
    match reason {
        ImportReason::NoModule => format!("No module named '{}'", module),
        ImportReason::NoName => format!("cannot import name '{}' from '{}'", name, module),
    }
}

impl Error {
    pub(crate) fn unencodable(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Unencodable {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn incompatible(class: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::IncompatibleConstructor {
            class: class.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(class: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Malformed {
            class: class.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_failure_names_the_attempted_pair() {
        let err = Error::ImportFailure {
            module: "tests.json2".into(),
            name: "AnotherClass".into(),
            reason: ImportReason::NoModule,
        };
        assert_eq!(err.to_string(), "No module named 'tests.json2'");

        let err = Error::ImportFailure {
            module: "tests.json".into(),
            name: "Missing".into(),
            reason: ImportReason::NoName,
        };
        assert_eq!(
            err.to_string(),
            "cannot import name 'Missing' from 'tests.json'"
        );
    }

    #[test]
    fn already_exists_shows_path() {
        let err = Error::AlreadyExists(PathBuf::from("/tmp/x.json"));
        assert_eq!(err.to_string(), "File exists: /tmp/x.json");
    }
}
