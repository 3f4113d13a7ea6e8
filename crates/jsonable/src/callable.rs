//! References to registered functions, methods and types.

use std::fmt;

use crate::error::{Error, Result};
use crate::object::JsonableType;
use crate::registry::FieldsFn;
use crate::value::{Fields, Value};

/// A registered native function. The first argument is the bound receiver,
/// if any.
pub type NativeFn = fn(Option<&Value>, &[Value]) -> Result<Value>;

/// What a resolved callable pair points at.
#[derive(Clone, Copy, Debug)]
pub enum Target {
    Function(NativeFn),
    /// A participating type; invoking it reconstructs an instance.
    Type(FieldsFn),
}

/// A function, bound method or type reference that travels as
/// `{@module, @callable, @bound}`.
#[derive(Clone)]
pub struct Callable {
    module: String,
    qualname: String,
    target: Target,
    receiver: Option<Box<Value>>,
}

impl Callable {
    pub fn function(module: impl Into<String>, qualname: impl Into<String>, f: NativeFn) -> Self {
        Callable {
            module: module.into(),
            qualname: qualname.into(),
            target: Target::Function(f),
            receiver: None,
        }
    }

    /// A method bound to `receiver`. `qualname` is usually `Class.method`.
    pub fn method(
        receiver: Value,
        module: impl Into<String>,
        qualname: impl Into<String>,
        f: NativeFn,
    ) -> Self {
        Callable::function(module, qualname, f).bind(receiver)
    }

    /// A reference to the type `T` itself.
    pub fn class<T: JsonableType>() -> Self {
        let tag = T::tag();
        Callable {
            module: tag.module,
            qualname: tag.class,
            target: Target::Type(|fields| T::from_fields(fields).map(Value::object)),
            receiver: None,
        }
    }

    pub(crate) fn resolved(
        module: String,
        qualname: String,
        target: Target,
        receiver: Option<Value>,
    ) -> Self {
        Callable {
            module,
            qualname,
            target,
            receiver: receiver.map(Box::new),
        }
    }

    pub fn bind(mut self, receiver: Value) -> Self {
        self.receiver = Some(Box::new(receiver));
        self
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn qualname(&self) -> &str {
        &self.qualname
    }

    /// Last segment of the qualified name.
    pub fn name(&self) -> &str {
        self.qualname.rsplit('.').next().unwrap_or(&self.qualname)
    }

    pub fn receiver(&self) -> Option<&Value> {
        self.receiver.as_deref()
    }

    pub fn is_bound(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn is_type(&self) -> bool {
        matches!(self.target, Target::Type(_))
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match (&self.target, &self.receiver) {
            (Target::Type(_), _) => "type",
            (Target::Function(_), Some(_)) => "method",
            (Target::Function(_), None) => "function",
        }
    }

    /// Invokes the target. A type reference takes a single mapping of
    /// fields.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        match self.target {
            Target::Function(f) => f(self.receiver(), args),
            Target::Type(construct) => match args {
                [Value::Map(fields)] => construct(fields.clone()),
                [] => construct(Fields::new()),
                _ => Err(Error::incompatible(
                    &self.qualname,
                    "a type reference takes a single mapping of fields",
                )),
            },
        }
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.module == other.module
            && self.qualname == other.qualname
            && self.is_type() == other.is_type()
            && self.receiver == other.receiver
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.receiver {
            Some(receiver) => write!(
                f,
                "<bound method {} of {}>",
                self.qualname,
                receiver.display()
            ),
            None => write!(f, "<{} {}.{}>", self.type_name(), self.module, self.qualname),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("module", &self.module)
            .field("qualname", &self.qualname)
            .field("kind", &self.type_name())
            .field("receiver", &self.receiver)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(_: Option<&Value>, args: &[Value]) -> Result<Value> {
        let sum: i64 = args.iter().filter_map(Value::as_i64).sum();
        Ok(Value::Int(sum))
    }

    fn describe(receiver: Option<&Value>, _: &[Value]) -> Result<Value> {
        Ok(Value::Str(receiver.map(Value::display).unwrap_or_default()))
    }

    #[test]
    fn function_call_passes_arguments() {
        let f = Callable::function("math_ops", "add", add);
        assert_eq!(f.call(&[Value::Int(2), Value::Int(3)]).unwrap(), Value::Int(5));
        assert!(!f.is_bound());
        assert_eq!(f.name(), "add");
    }

    #[test]
    fn bound_method_receives_receiver() {
        let m = Callable::method(Value::Int(7), "m", "Thing.describe", describe);
        assert!(m.is_bound());
        assert_eq!(m.name(), "describe");
        assert_eq!(m.call(&[]).unwrap(), Value::Str("7".into()));
    }

    #[test]
    fn equality_ignores_function_pointer() {
        let a = Callable::function("m", "f", add);
        let b = Callable::function("m", "f", describe);
        assert_eq!(a, b);
        assert_ne!(a, Callable::function("m", "g", add));
    }
}
