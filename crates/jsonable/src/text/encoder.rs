//! `TextEncoder` writes a [`Canonical`] tree as JSON text.

use super::{TextError, TextOptions};
use crate::canonical::Canonical;

pub struct TextEncoder {
    out: String,
    options: TextOptions,
    level: usize,
}

impl TextEncoder {
    pub fn new(options: TextOptions) -> Self {
        Self {
            out: String::new(),
            options,
            level: 0,
        }
    }

    pub fn encode(mut self, value: &Canonical) -> Result<String, TextError> {
        self.write_any(value)?;
        Ok(self.out)
    }

    fn write_any(&mut self, value: &Canonical) -> Result<(), TextError> {
        match value {
            Canonical::Null => self.out.push_str("null"),
            Canonical::Bool(true) => self.out.push_str("true"),
            Canonical::Bool(false) => self.out.push_str("false"),
            Canonical::Int(i) => self.out.push_str(&i.to_string()),
            Canonical::Float(f) => self.write_float(*f),
            Canonical::Str(s) => self.write_str(s),
            Canonical::Seq(items) => self.write_arr(items)?,
            Canonical::Map(map) => {
                let mut entries: Vec<(&String, &Canonical)> = map.iter().collect();
                if self.options.sort_keys {
                    entries.sort_by(|a, b| a.0.cmp(b.0));
                }
                self.write_obj(&entries)?;
            }
            other => return Err(TextError::NotJsonNative(other.kind_name())),
        }
        Ok(())
    }

    fn write_float(&mut self, f: f64) {
        if f.is_nan() {
            self.out.push_str("NaN");
        } else if f.is_infinite() {
            self.out
                .push_str(if f > 0.0 { "Infinity" } else { "-Infinity" });
        } else {
            // Debug formatting keeps a fractional part or exponent, so the
            // reader sees a float again.
            self.out.push_str(&format!("{:?}", f));
        }
    }

    fn write_str(&mut self, s: &str) {
        let plain = s
            .bytes()
            .all(|b| (32..=126).contains(&b) && b != b'"' && b != b'\\');
        if plain {
            self.out.push('"');
            self.out.push_str(s);
            self.out.push('"');
            return;
        }
        match serde_json::to_string(s) {
            Ok(escaped) => self.out.push_str(&escaped),
            Err(_) => self.out.push_str("\"\""),
        }
    }

    fn write_arr(&mut self, items: &[Canonical]) -> Result<(), TextError> {
        if items.is_empty() {
            self.out.push_str("[]");
            return Ok(());
        }
        self.out.push('[');
        self.level += 1;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.newline();
            self.write_any(item)?;
        }
        self.level -= 1;
        self.newline();
        self.out.push(']');
        Ok(())
    }

    fn write_obj(&mut self, entries: &[(&String, &Canonical)]) -> Result<(), TextError> {
        if entries.is_empty() {
            self.out.push_str("{}");
            return Ok(());
        }
        self.out.push('{');
        self.level += 1;
        for (i, (key, value)) in entries.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.newline();
            self.write_str(key);
            self.out.push(':');
            if self.options.indent.is_some() {
                self.out.push(' ');
            }
            self.write_any(value)?;
        }
        self.level -= 1;
        self.newline();
        self.out.push('}');
        Ok(())
    }

    fn newline(&mut self) {
        if let Some(indent) = self.options.indent {
            self.out.push('\n');
            for _ in 0..indent * self.level {
                self.out.push(' ');
            }
        }
    }
}
