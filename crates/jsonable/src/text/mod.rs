//! Physical JSON text for the canonical form.
//!
//! Unlike `serde_json`, the writer emits `NaN`, `Infinity` and `-Infinity`
//! tokens and always writes floats with a fractional part or exponent, so
//! special floats and the int/float distinction survive a round trip.

mod decoder;
mod encoder;

pub use decoder::TextDecoder;
pub use encoder::TextEncoder;

use thiserror::Error;

use crate::canonical::Canonical;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextError {
    #[error("invalid JSON at byte {0}")]
    Invalid(usize),
    #[error("invalid UTF-8 in JSON string")]
    InvalidUtf8,
    #[error("unexpected trailing characters at byte {0}")]
    Trailing(usize),
    #[error("JSON nested deeper than {0} levels")]
    DepthExceeded(usize),
    #[error("Object of type {0} is not JSON serializable")]
    NotJsonNative(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextOptions {
    /// Pretty-print with this many spaces per level.
    pub indent: Option<usize>,
    pub sort_keys: bool,
}

impl TextOptions {
    pub fn indent(mut self, indent: usize) -> Self {
        self.indent = Some(indent);
        self
    }

    pub fn sort_keys(mut self, sort_keys: bool) -> Self {
        self.sort_keys = sort_keys;
        self
    }
}

pub fn to_string(value: &Canonical, options: &TextOptions) -> Result<String, TextError> {
    TextEncoder::new(options.clone()).encode(value)
}

pub fn from_str(text: &str) -> Result<Canonical, TextError> {
    TextDecoder::new(text.as_bytes()).decode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::CanonicalMap;
    use proptest::prelude::*;

    fn map(entries: Vec<(&str, Canonical)>) -> Canonical {
        Canonical::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<CanonicalMap>(),
        )
    }

    #[test]
    fn compact_output() {
        let cf = map(vec![
            ("a", Canonical::Int(1)),
            ("b", Canonical::Float(1.0)),
            ("c", Canonical::Seq(vec![Canonical::Null, Canonical::Bool(true)])),
            ("d", Canonical::Str("x\"y".into())),
        ]);
        assert_eq!(
            to_string(&cf, &TextOptions::default()).unwrap(),
            r#"{"a":1,"b":1.0,"c":[null,true],"d":"x\"y"}"#
        );
    }

    #[test]
    fn indented_and_sorted_output() {
        let cf = map(vec![
            ("b", Canonical::Seq(vec![Canonical::Int(1)])),
            ("a", Canonical::Map(CanonicalMap::new())),
        ]);
        let text = to_string(&cf, &TextOptions::default().indent(2).sort_keys(true)).unwrap();
        assert_eq!(text, "{\n  \"a\": {},\n  \"b\": [\n    1\n  ]\n}");
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let deep = format!("{}{}", "[".repeat(200_000), "]".repeat(200_000));
        assert_eq!(
            from_str(&deep),
            Err(TextError::DepthExceeded(crate::encode::DEFAULT_MAX_DEPTH))
        );

        let nested = r#"{"a":[{"b":[1]}]}"#;
        assert!(TextDecoder::new(nested.as_bytes()).max_depth(4).decode().is_ok());
        assert_eq!(
            TextDecoder::new(nested.as_bytes()).max_depth(3).decode(),
            Err(TextError::DepthExceeded(3))
        );
    }

    #[test]
    fn special_floats_round_trip() {
        let cf = Canonical::Seq(vec![
            Canonical::Float(f64::INFINITY),
            Canonical::Float(f64::NEG_INFINITY),
            Canonical::Float(f64::NAN),
        ]);
        let text = to_string(&cf, &TextOptions::default()).unwrap();
        assert_eq!(text, "[Infinity,-Infinity,NaN]");
        let back = from_str(&text).unwrap();
        assert_eq!(back[0], Canonical::Float(f64::INFINITY));
        assert_eq!(back[1], Canonical::Float(f64::NEG_INFINITY));
        assert!(matches!(back[2], Canonical::Float(f) if f.is_nan()));
    }

    #[test]
    fn passthrough_variants_are_rejected() {
        let cf = Canonical::Seq(vec![Canonical::Bytes(vec![0])]);
        assert_eq!(
            to_string(&cf, &TextOptions::default()),
            Err(TextError::NotJsonNative("bytes"))
        );
    }

    #[test]
    fn decoder_rejects_garbage() {
        assert!(matches!(from_str("{\"a\":}"), Err(TextError::Invalid(_))));
        assert!(matches!(from_str("[1] x"), Err(TextError::Trailing(4))));
        assert!(matches!(from_str(""), Err(TextError::Invalid(0))));
    }

    #[test]
    fn decoder_handles_escapes_and_unicode() {
        let cf = from_str(r#"{"k":"a\nbé","é":[1,-2.5e3]}"#).unwrap();
        assert_eq!(cf["k"], Canonical::Str("a\nbé".into()));
        assert_eq!(cf["é"][1], Canonical::Float(-2500.0));
    }

    fn leaf() -> impl Strategy<Value = Canonical> {
        prop_oneof![
            Just(Canonical::Null),
            any::<bool>().prop_map(Canonical::Bool),
            any::<i64>().prop_map(Canonical::Int),
            any::<f64>()
                .prop_filter("finite", |f| f.is_finite())
                .prop_map(Canonical::Float),
            ".*".prop_map(Canonical::Str),
        ]
    }

    fn tree() -> impl Strategy<Value = Canonical> {
        leaf().prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..8).prop_map(Canonical::Seq),
                prop::collection::vec(("[a-z@]{0,6}", inner), 0..8)
                    .prop_map(|entries| Canonical::Map(entries.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn text_round_trip(cf in tree()) {
            let text = to_string(&cf, &TextOptions::default()).unwrap();
            prop_assert_eq!(from_str(&text).unwrap(), cf);
        }

        #[test]
        fn pretty_text_parses_the_same(cf in tree()) {
            let compact = to_string(&cf, &TextOptions::default()).unwrap();
            let pretty = to_string(&cf, &TextOptions::default().indent(4)).unwrap();
            prop_assert_eq!(from_str(&compact).unwrap(), from_str(&pretty).unwrap());
        }
    }
}
