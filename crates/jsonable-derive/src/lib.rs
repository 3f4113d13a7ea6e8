//! `#[derive(Jsonable)]`.
//!
//! Generates the serialization traits of the `jsonable` crate for a
//! non-generic struct or unit-only enum. Deriving types must also be
//! `Clone` and `Debug`.
//!
//! Structs get a constructor signature built from their fields, one
//! positional parameter per field in declaration order:
//!
//! ```rust, ignore
//! #[derive(Jsonable, Debug, Clone)]
//! #[jsonable(module = "jobs", version = "2.1")]
//! struct Job {
//!     name: String,
//!     #[jsonable(default = 3)]
//!     retries: i64,
//!     #[jsonable(private)]
//!     token: String,
//!     #[jsonable(varargs)]
//!     steps: Vec<String>,
//! }
//! ```
//!
//! Container attributes: `module`, `name`, `version`, `record`, `model`,
//! `to_fields = "path"`, `from_fields = "path"` and `no_register`.
//!
//! Field attributes: `private` (stored as `_name`), `param = "..."`,
//! `default` or `default = expr`, `keyword_only`, `varargs`, `kwargs` and
//! `skip`.
//!
//! Enum variants take `value = expr`. Without it a member's raw value is
//! its name.

mod attrs;
mod expand;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

#[proc_macro_derive(Jsonable, attributes(jsonable))]
pub fn derive_jsonable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand::derive(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
