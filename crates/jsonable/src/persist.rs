//! Saving and loading single values to files.
//!
//! The format follows the extension: `.yaml` and `.yml` are written through
//! `serde_yaml`, everything else as JSON text.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::canonical::Canonical;
use crate::convert::FromValue;
use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::error::{Error, Result};
use crate::text::{self, TextOptions};
use crate::value::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Replace an existing file instead of failing.
    pub overwrite: bool,
    pub text: TextOptions,
}

impl SaveOptions {
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn indent(mut self, indent: usize) -> Self {
        self.text = self.text.indent(indent);
        self
    }

    pub fn sort_keys(mut self, sort_keys: bool) -> Self {
        self.text = self.text.sort_keys(sort_keys);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Format::Yaml
            }
            _ => Format::Json,
        }
    }
}

/// Encodes `value` strictly and writes it to `path`.
pub fn save(value: &Value, path: impl AsRef<Path>, options: &SaveOptions) -> Result<()> {
    let cf = Encoder::new().encode(value)?;
    save_canonical(&cf, path, options)
}

pub(crate) fn save_canonical(
    cf: &Canonical,
    path: impl AsRef<Path>,
    options: &SaveOptions,
) -> Result<()> {
    let path = path.as_ref();
    if !options.overwrite && path.exists() {
        return Err(Error::AlreadyExists(path.to_path_buf()));
    }
    let contents = match Format::of(path) {
        Format::Yaml => serde_yaml::to_string(cf)?,
        Format::Json => text::to_string(cf, &options.text)?,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    debug!(path = %path.display(), "saved value");
    Ok(())
}

/// Reads and fully decodes the value stored at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let cf = match Format::of(path) {
        Format::Yaml => serde_yaml::from_str(&contents)?,
        Format::Json => text::from_str(&contents)?,
    };
    Decoder::new().decode(&cf)
}

/// Like [`load`], converting the result into `T`.
pub fn load_as<T: FromValue>(path: impl AsRef<Path>) -> Result<T> {
    Ok(T::from_value(load(path)?)?)
}
