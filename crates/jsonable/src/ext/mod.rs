//! Values owned by external collaborators: numeric arrays, tables and
//! document identifiers.
//!
//! Each family is carried as [`Value::Foreign`](crate::Value::Foreign) and
//! contributes an encode handler plus a raw reconstructor.

pub mod array;
pub mod objectid;
pub mod table;

use crate::encode::EncodeHandler;
use crate::registry::Registry;

pub(crate) fn encode_handlers() -> Vec<EncodeHandler> {
    vec![array::ENCODE, table::ENCODE, objectid::ENCODE]
}

pub(crate) fn register(registry: &mut Registry) {
    array::register(registry);
    table::register(registry);
    objectid::register(registry);
}
