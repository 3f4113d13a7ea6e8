//! Type identity and redirect registry.
//!
//! Maps `(namespace, name)` pairs to reconstruction strategies. A
//! process-wide snapshot is built lazily from the built-in handlers, every
//! type submitted through `#[derive(Jsonable)]`, and the redirect section of
//! the settings file.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::callable::{NativeFn, Target};
use crate::canonical::CanonicalMap;
use crate::decode::Decoder;
use crate::error::{Error, ImportReason, Result};
use crate::object::{JsonableType, TypeTag};
use crate::settings::Settings;
use crate::value::{Fields, Value};

pub type FieldsFn = fn(Fields) -> Result<Value>;
pub type RawFn = fn(&CanonicalMap, &Decoder) -> Result<Value>;

/// How a registered type is rebuilt from its tagged mapping.
#[derive(Clone, Copy, Debug)]
pub enum TypeEntry {
    /// Reserved keys are stripped and the remaining values decoded first.
    Fields(FieldsFn),
    /// Receives the raw mapping, for fixed-shape encodings.
    Raw(RawFn),
}

/// `namespace -> old name -> replacement identity`.
pub type RedirectTable = HashMap<String, HashMap<String, TypeTag>>;

#[derive(Clone, Default)]
pub struct Registry {
    types: HashMap<TypeTag, TypeEntry>,
    callables: HashMap<TypeTag, NativeFn>,
    modules: HashSet<String>,
    redirects: RedirectTable,
}

impl Registry {
    /// An empty registry with no built-in handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in fixed-shape handlers only.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::decode::builtin::register(&mut registry);
        crate::ext::register(&mut registry);
        registry
    }

    pub fn register_type<T: JsonableType>(&mut self) -> &mut Self {
        self.register_fields(T::tag(), |fields| T::from_fields(fields).map(Value::object))
    }

    pub fn register_fields(&mut self, tag: TypeTag, f: FieldsFn) -> &mut Self {
        self.modules.insert(tag.module.clone());
        self.types.insert(tag, TypeEntry::Fields(f));
        self
    }

    pub fn register_raw(&mut self, tag: TypeTag, f: RawFn) -> &mut Self {
        self.modules.insert(tag.module.clone());
        self.types.insert(tag, TypeEntry::Raw(f));
        self
    }

    pub fn register_function(
        &mut self,
        module: impl Into<String>,
        qualname: impl Into<String>,
        f: NativeFn,
    ) -> &mut Self {
        let tag = TypeTag::new(module, qualname);
        self.modules.insert(tag.module.clone());
        self.callables.insert(tag, f);
        self
    }

    pub fn register_redirect(
        &mut self,
        old_module: impl Into<String>,
        old_name: impl Into<String>,
        new_module: impl Into<String>,
        new_name: impl Into<String>,
    ) -> &mut Self {
        self.redirects
            .entry(old_module.into())
            .or_default()
            .insert(old_name.into(), TypeTag::new(new_module, new_name));
        self
    }

    pub fn extend_redirects(&mut self, table: RedirectTable) -> &mut Self {
        for (module, entries) in table {
            self.redirects.entry(module).or_default().extend(entries);
        }
        self
    }

    pub fn redirects(&self) -> &RedirectTable {
        &self.redirects
    }

    pub fn contains_type(&self, tag: &TypeTag) -> bool {
        self.types.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.types.len() + self.callables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies the redirect table once. Redirect targets are not
    /// themselves redirected.
    fn redirect(&self, module: &str, name: &str) -> TypeTag {
        match self.redirects.get(module).and_then(|m| m.get(name)) {
            Some(target) => {
                debug!(from.module = module, from.name = name, to = %target, "redirect applied");
                target.clone()
            }
            None => TypeTag::new(module, name),
        }
    }

    fn import_error(&self, tag: TypeTag) -> Error {
        let reason = if self.modules.contains(&tag.module) {
            ImportReason::NoName
        } else {
            ImportReason::NoModule
        };
        Error::ImportFailure {
            module: tag.module,
            name: tag.class,
            reason,
        }
    }

    /// Resolves a type identity, following at most one redirect.
    pub fn resolve_type(&self, module: &str, name: &str) -> Result<(TypeTag, TypeEntry)> {
        let tag = self.redirect(module, name);
        match self.types.get(&tag) {
            Some(entry) => Ok((tag, *entry)),
            None => Err(self.import_error(tag)),
        }
    }

    /// Resolves a callable pair to a registered function or, failing
    /// that, a registered type.
    pub fn resolve_callable(&self, module: &str, qualname: &str) -> Result<(TypeTag, Target)> {
        let tag = self.redirect(module, qualname);
        if let Some(f) = self.callables.get(&tag) {
            return Ok((tag, Target::Function(*f)));
        }
        match self.types.get(&tag) {
            Some(TypeEntry::Fields(f)) => Ok((tag, Target::Type(*f))),
            _ => Err(self.import_error(tag)),
        }
    }

    /// Whether the exact pair, without redirects, can be resolved.
    pub fn is_importable(&self, module: &str, qualname: &str) -> bool {
        let tag = TypeTag::new(module, qualname);
        self.callables.contains_key(&tag)
            || matches!(self.types.get(&tag), Some(TypeEntry::Fields(_)))
    }
}

/// A registration hook collected at link time.
pub struct Registration(pub fn(&mut Registry));

#[cfg(feature = "auto_register")]
inventory::collect!(Registration);

/// Target of the registrations emitted by `#[derive(Jsonable)]`.
#[doc(hidden)]
pub fn register<T: JsonableType>(registry: &mut Registry) {
    registry.register_type::<T>();
}

static GLOBAL: Lazy<RwLock<Arc<Registry>>> = Lazy::new(|| RwLock::new(Arc::new(bootstrap())));

fn bootstrap() -> Registry {
    let mut registry = Registry::with_builtins();
    #[cfg(feature = "auto_register")]
    for registration in inventory::iter::<Registration> {
        (registration.0)(&mut registry);
    }
    match Settings::from_env() {
        Ok(Some(settings)) => match settings.redirect_table() {
            Ok(table) => {
                registry.extend_redirects(table);
            }
            Err(err) => warn!(error = %err, "ignoring redirect settings"),
        },
        Ok(None) => {}
        Err(err) => warn!(error = %err, "ignoring unreadable settings"),
    }
    debug!(
        types = registry.types.len(),
        callables = registry.callables.len(),
        redirects = registry.redirects.values().map(HashMap::len).sum::<usize>(),
        "registry bootstrapped"
    );
    registry
}

/// Snapshot of the process-wide registry.
pub fn global() -> Arc<Registry> {
    GLOBAL.read().clone()
}

/// Copy-on-write update of the process-wide registry. Snapshots taken
/// before the update are unaffected.
pub fn update<F: FnOnce(&mut Registry)>(f: F) {
    let mut guard = GLOBAL.write();
    let mut next = Registry::clone(&guard);
    f(&mut next);
    *guard = Arc::new(next);
}
