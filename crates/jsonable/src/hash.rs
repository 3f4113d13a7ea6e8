//! Representation-sensitive digest of a participating object.
//!
//! The canonical mapping is flattened (nested mappings joined with `.`),
//! every key containing `@` is dropped and the remaining keys are sorted
//! before the JSON text is hashed. Two objects that compare equal but
//! encode differently hash differently.

use sha2::{Digest, Sha256};

use crate::canonical::{Canonical, CanonicalMap};
use crate::encode::Encoder;
use crate::error::Result;
use crate::object::Jsonable;
use crate::text::{self, TextOptions};

pub fn unsafe_hash(obj: &dyn Jsonable) -> Result<String> {
    let map = Encoder::new().encode_object(obj)?;
    digest(&map)
}

pub(crate) fn digest(map: &CanonicalMap) -> Result<String> {
    let mut flat = Vec::new();
    flatten("", map, &mut flat);
    flat.retain(|(key, _)| !key.contains('@'));
    flat.sort_by(|a, b| a.0.cmp(&b.0));
    let stable: CanonicalMap = flat.into_iter().collect();
    let text = text::to_string(&Canonical::Map(stable), &TextOptions::default())?;
    Ok(hex::encode(Sha256::digest(text.as_bytes())))
}

/// Sequences are leaves; only mappings are flattened.
fn flatten(prefix: &str, map: &CanonicalMap, out: &mut Vec<(String, Canonical)>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Canonical::Map(inner) => flatten(&path, inner, out),
            leaf => out.push((path, leaf.clone())),
        }
    }
}
