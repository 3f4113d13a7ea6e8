//! YAML settings located through `JSONABLE_SETTINGS`.
//!
//! ```yaml
//! redirect:
//!   old_module.OldClass: new_module.NewClass
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::object::TypeTag;
use crate::registry::RedirectTable;

pub const SETTINGS_ENV: &str = "JSONABLE_SETTINGS";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Flat `"old_ns.old_name" -> "new_ns.new_name"` pairs.
    pub redirect: IndexMap<String, String>,
}

impl Settings {
    /// A missing file yields default settings.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = match fs::read_to_string(path.as_ref()) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(err.into()),
        };
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&text)?)
    }

    /// `None` when the environment variable is unset.
    pub fn from_env() -> Result<Option<Self>> {
        match std::env::var_os(SETTINGS_ENV) {
            Some(path) => Self::from_path(path).map(Some),
            None => Ok(None),
        }
    }

    pub fn redirect_table(&self) -> Result<RedirectTable> {
        let mut table = RedirectTable::new();
        for (old, new) in &self.redirect {
            let (old_module, old_name) = split_dotted(old)?;
            let (new_module, new_name) = split_dotted(new)?;
            table
                .entry(old_module.to_string())
                .or_default()
                .insert(old_name.to_string(), TypeTag::new(new_module, new_name));
        }
        Ok(table)
    }
}

fn split_dotted(path: &str) -> Result<(&str, &str)> {
    match path.rsplit_once('.') {
        Some((module, name)) if !module.is_empty() && !name.is_empty() => Ok((module, name)),
        _ => Err(Error::Settings(format!(
            "'{}' is not of the form namespace.name",
            path
        ))),
    }
}

/// Reads the redirect section of a settings file into the nested table.
pub fn load_redirect(path: impl AsRef<Path>) -> Result<RedirectTable> {
    Settings::from_path(path)?.redirect_table()
}
