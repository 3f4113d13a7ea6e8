//! `TextDecoder` reads JSON text into a [`Canonical`] tree.
//!
//! Accepts the `NaN`, `Infinity` and `-Infinity` tokens. Numbers with a
//! fraction or exponent become floats, everything else an integer when it
//! fits in `i64`.

use super::TextError;
use crate::canonical::{Canonical, CanonicalMap};
use crate::encode::DEFAULT_MAX_DEPTH;

pub struct TextDecoder<'a> {
    data: &'a [u8],
    x: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> TextDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            x: 0,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Arrays and objects nested deeper than this are rejected.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn decode(mut self) -> Result<Canonical, TextError> {
        let value = self.read_any()?;
        self.skip_whitespace();
        if self.x < self.data.len() {
            return Err(TextError::Trailing(self.x));
        }
        Ok(value)
    }

    fn read_any(&mut self) -> Result<Canonical, TextError> {
        self.skip_whitespace();
        let Some(&ch) = self.data.get(self.x) else {
            return Err(TextError::Invalid(self.x));
        };
        match ch {
            b'"' => self.read_str().map(Canonical::Str),
            b'[' | b'{' => {
                if self.depth >= self.max_depth {
                    return Err(TextError::DepthExceeded(self.max_depth));
                }
                self.depth += 1;
                let value = if ch == b'[' {
                    self.read_arr()
                } else {
                    self.read_obj()
                };
                self.depth -= 1;
                value
            }
            b'n' => self.read_literal("null", Canonical::Null),
            b't' => self.read_literal("true", Canonical::Bool(true)),
            b'f' => self.read_literal("false", Canonical::Bool(false)),
            b'N' => self.read_literal("NaN", Canonical::Float(f64::NAN)),
            b'I' => self.read_literal("Infinity", Canonical::Float(f64::INFINITY)),
            b'-' if self.data[self.x..].starts_with(b"-Infinity") => {
                self.read_literal("-Infinity", Canonical::Float(f64::NEG_INFINITY))
            }
            b'-' | b'0'..=b'9' => self.read_num(),
            _ => Err(TextError::Invalid(self.x)),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.data.get(self.x) {
            self.x += 1;
        }
    }

    fn read_literal(&mut self, token: &str, value: Canonical) -> Result<Canonical, TextError> {
        if !self.data[self.x..].starts_with(token.as_bytes()) {
            return Err(TextError::Invalid(self.x));
        }
        self.x += token.len();
        Ok(value)
    }

    fn read_num(&mut self) -> Result<Canonical, TextError> {
        let start = self.x;
        let data = self.data;
        let len = data.len();
        let mut x = self.x;

        if x < len && data[x] == b'-' {
            x += 1;
        }
        let digits_start = x;
        while x < len && data[x].is_ascii_digit() {
            x += 1;
        }
        if x == digits_start {
            return Err(TextError::Invalid(start));
        }
        let mut is_float = false;
        if x < len && data[x] == b'.' {
            is_float = true;
            x += 1;
            while x < len && data[x].is_ascii_digit() {
                x += 1;
            }
        }
        if x < len && (data[x] == b'e' || data[x] == b'E') {
            is_float = true;
            x += 1;
            if x < len && (data[x] == b'+' || data[x] == b'-') {
                x += 1;
            }
            while x < len && data[x].is_ascii_digit() {
                x += 1;
            }
        }
        self.x = x;

        let s = std::str::from_utf8(&data[start..x]).map_err(|_| TextError::InvalidUtf8)?;
        if !is_float {
            if let Ok(i) = s.parse::<i64>() {
                return Ok(Canonical::Int(i));
            }
        }
        s.parse::<f64>()
            .map(Canonical::Float)
            .map_err(|_| TextError::Invalid(start))
    }

    fn read_str(&mut self) -> Result<String, TextError> {
        self.x += 1;
        let start = self.x;
        let end = self.find_ending_quote(start)?;
        let body = &self.data[start..end];
        self.x = end + 1;
        decode_json_string(body, start)
    }

    fn find_ending_quote(&self, from: usize) -> Result<usize, TextError> {
        let mut x = from;
        while let Some(&b) = self.data.get(x) {
            match b {
                b'"' => return Ok(x),
                b'\\' => x += 2,
                _ => x += 1,
            }
        }
        Err(TextError::Invalid(from.saturating_sub(1)))
    }

    fn read_arr(&mut self) -> Result<Canonical, TextError> {
        self.x += 1;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.data.get(self.x) {
                Some(b']') => {
                    self.x += 1;
                    return Ok(Canonical::Seq(items));
                }
                Some(b',') if !items.is_empty() => self.x += 1,
                Some(_) if items.is_empty() => {}
                _ => return Err(TextError::Invalid(self.x)),
            }
            items.push(self.read_any()?);
        }
    }

    fn read_obj(&mut self) -> Result<Canonical, TextError> {
        self.x += 1;
        let mut map = CanonicalMap::new();
        let mut first = true;
        loop {
            self.skip_whitespace();
            match self.data.get(self.x) {
                Some(b'}') => {
                    self.x += 1;
                    return Ok(Canonical::Map(map));
                }
                Some(b',') if !first => self.x += 1,
                Some(_) if first => {}
                _ => return Err(TextError::Invalid(self.x)),
            }
            self.skip_whitespace();
            if self.data.get(self.x) != Some(&b'"') {
                return Err(TextError::Invalid(self.x));
            }
            let key = self.read_str()?;
            self.skip_whitespace();
            if self.data.get(self.x) != Some(&b':') {
                return Err(TextError::Invalid(self.x));
            }
            self.x += 1;
            let value = self.read_any()?;
            map.insert(key, value);
            first = false;
        }
    }
}

/// Decodes a string body (between the quotes), unescaping through
/// `serde_json`.
fn decode_json_string(bytes: &[u8], at: usize) -> Result<String, TextError> {
    if !bytes.contains(&b'\\') {
        return std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| TextError::InvalidUtf8);
    }
    let mut quoted = Vec::with_capacity(bytes.len() + 2);
    quoted.push(b'"');
    quoted.extend_from_slice(bytes);
    quoted.push(b'"');
    serde_json::from_slice(&quoted).map_err(|_| TextError::Invalid(at))
}
