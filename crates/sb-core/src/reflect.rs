use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ScriptHostError;
use crate::value::ScriptValue;

/// Shared handle to a native object exposed to scripts.
pub type ObjectRef = Rc<RefCell<dyn ScriptObject>>;

/// A native type exposed to scripts through a capability table.
///
/// Member resolution order is fixed: declared members first, then the
/// type's own method table, then (explicitly, never structurally) the
/// delegate object, if any.
pub trait ScriptObject: 'static {
    fn type_name(&self) -> &'static str;

    fn method_table(&self) -> &'static MethodTable;

    /// Declared members resolved ahead of the method table.
    fn get_member(&self, _name: &str) -> Option<ScriptValue> {
        None
    }

    /// Fallthrough target consulted when nothing else resolves.
    fn delegate(&self) -> Option<ObjectRef> {
        None
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub fn new_object<T: ScriptObject>(value: T) -> ObjectRef {
    Rc::new(RefCell::new(value))
}

/// Declared value categories for parameters and results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Unit,
    Bool,
    I32,
    U32,
    Str,
    List,
    Table,
    Object,
    Weak,
    Any,
}

impl ValueKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Bool => "bool",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::Str => "string",
            Self::List => "list",
            Self::Table => "table",
            Self::Object => "object",
            Self::Weak => "weakref",
            Self::Any => "any",
        }
    }
}

/// Default applied when a trailing argument is omitted.
#[derive(Debug, Clone, Copy)]
pub enum DefaultArg {
    Required,
    Absent,
    I32(i32),
    U32(u32),
}

impl DefaultArg {
    fn value(self) -> ScriptValue {
        match self {
            Self::Required | Self::Absent => ScriptValue::Null,
            Self::I32(value) => ScriptValue::I32(value),
            Self::U32(value) => ScriptValue::U32(value),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ValueKind,
    pub default: DefaultArg,
}

pub type NativeFn = fn(&mut dyn Any, &[ScriptValue]) -> Result<ScriptValue, ScriptHostError>;

/// One script-callable method: signature metadata plus the invocation thunk.
pub struct MethodDef {
    pub name: &'static str,
    pub doc: &'static str,
    pub params: &'static [ParamSpec],
    pub result: ValueKind,
    pub func: NativeFn,
}

impl MethodDef {
    pub fn signature(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|param| match param.default {
                DefaultArg::Required => format!("{}: {}", param.name, param.kind.label()),
                DefaultArg::Absent => format!("{}?: {}", param.name, param.kind.label()),
                DefaultArg::I32(value) => {
                    format!("{}: {} = {}", param.name, param.kind.label(), value)
                }
                DefaultArg::U32(value) => {
                    format!("{}: {} = {:#x}", param.name, param.kind.label(), value)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({}) -> {}", self.name, params, self.result.label())
    }

    /// Checks arity, fills defaults, and coerces each argument to its
    /// declared kind.
    pub fn check_args(&self, args: &[ScriptValue]) -> Result<Vec<ScriptValue>, ScriptHostError> {
        let required = self
            .params
            .iter()
            .take_while(|param| matches!(param.default, DefaultArg::Required))
            .count();
        if args.len() < required || args.len() > self.params.len() {
            let expected = if args.len() < required {
                required
            } else {
                self.params.len()
            };
            return Err(ScriptHostError::BadArity {
                method: self.name,
                expected,
                got: args.len(),
            });
        }

        let mut out = Vec::with_capacity(self.params.len());
        for (index, param) in self.params.iter().enumerate() {
            match args.get(index) {
                Some(value) => out.push(self.coerce(index, param, value)?),
                None => out.push(param.default.value()),
            }
        }
        Ok(out)
    }

    fn coerce(
        &self,
        index: usize,
        param: &ParamSpec,
        value: &ScriptValue,
    ) -> Result<ScriptValue, ScriptHostError> {
        if value.is_null() && !matches!(param.default, DefaultArg::Required) {
            return Ok(ScriptValue::Null);
        }
        let coerced = match param.kind {
            ValueKind::Any => Some(value.clone()),
            ValueKind::Bool => value.as_bool().map(ScriptValue::Bool),
            ValueKind::I32 => value.as_i32().map(ScriptValue::I32),
            ValueKind::U32 => value.as_u32().map(ScriptValue::U32),
            ValueKind::Str => value.as_str().map(|text| ScriptValue::String(text.to_string())),
            ValueKind::List => value.as_list().map(|items| ScriptValue::List(items.to_vec())),
            ValueKind::Table => value.as_table().map(|table| ScriptValue::Table(table.clone())),
            ValueKind::Object => value.as_object().map(|object| ScriptValue::Object(Rc::clone(object))),
            ValueKind::Weak => value.as_weak().map(ScriptValue::Weak),
            ValueKind::Unit => None,
        };
        coerced.ok_or(ScriptHostError::BadArgument {
            method: self.name,
            index,
            expected: param.kind.label(),
            got: value.type_name(),
        })
    }
}

/// The capability table of one exposed type, built once and shared across
/// every instance.
pub struct MethodTable {
    type_name: &'static str,
    methods: Vec<MethodDef>,
}

impl MethodTable {
    pub fn new(type_name: &'static str, methods: Vec<MethodDef>) -> Self {
        Self { type_name, methods }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn methods(&self) -> &[MethodDef] {
        &self.methods
    }

    pub fn find(&'static self, name: &str) -> Option<&'static MethodDef> {
        self.methods.iter().find(|method| method.name == name)
    }
}

/// A method resolved against a concrete receiver, ready to call.
#[derive(Clone)]
pub struct BoundMethod {
    pub receiver: ObjectRef,
    pub def: &'static MethodDef,
}

impl BoundMethod {
    pub fn call(&self, args: &[ScriptValue]) -> Result<ScriptValue, ScriptHostError> {
        let args = self.def.check_args(args)?;
        let mut receiver = self.receiver.borrow_mut();
        (self.def.func)(receiver.as_any_mut(), &args)
    }
}

/// Resolves `name` on `object`: declared members, then the method table,
/// then the delegate chain.
pub fn resolve_member(object: &ObjectRef, name: &str) -> Option<ScriptValue> {
    {
        let inner = object.borrow();
        if let Some(value) = inner.get_member(name) {
            return Some(value);
        }
        if let Some(def) = inner.method_table().find(name) {
            return Some(ScriptValue::Method(BoundMethod {
                receiver: Rc::clone(object),
                def,
            }));
        }
    }
    let delegate = object.borrow().delegate()?;
    resolve_member(&delegate, name)
}

/// Resolves and calls a method in one step.
pub fn invoke(
    object: &ObjectRef,
    name: &str,
    args: &[ScriptValue],
) -> Result<ScriptValue, ScriptHostError> {
    match resolve_member(object, name) {
        Some(ScriptValue::Method(method)) => method.call(args),
        Some(_) => Err(ScriptHostError::NotCallable {
            type_name: object.borrow().type_name(),
            member: name.to_string(),
        }),
        None => Err(ScriptHostError::UnknownMember {
            type_name: object.borrow().type_name(),
            member: name.to_string(),
        }),
    }
}

/// Downcasts a thunk receiver to its concrete type.
pub fn receiver_mut<'a, T: ScriptObject>(
    receiver: &'a mut dyn Any,
    method: &'static str,
) -> Result<&'a mut T, ScriptHostError> {
    receiver
        .downcast_mut::<T>()
        .ok_or(ScriptHostError::BadReceiver {
            method,
            expected: std::any::type_name::<T>(),
        })
}

pub fn arg_bool(
    args: &[ScriptValue],
    index: usize,
    method: &'static str,
) -> Result<bool, ScriptHostError> {
    args.get(index)
        .and_then(ScriptValue::as_bool)
        .ok_or_else(|| bad_argument(args, index, method, ValueKind::Bool))
}

pub fn arg_i32(
    args: &[ScriptValue],
    index: usize,
    method: &'static str,
) -> Result<i32, ScriptHostError> {
    args.get(index)
        .and_then(ScriptValue::as_i32)
        .ok_or_else(|| bad_argument(args, index, method, ValueKind::I32))
}

pub fn arg_u32(
    args: &[ScriptValue],
    index: usize,
    method: &'static str,
) -> Result<u32, ScriptHostError> {
    args.get(index)
        .and_then(ScriptValue::as_u32)
        .ok_or_else(|| bad_argument(args, index, method, ValueKind::U32))
}

pub fn arg_str<'a>(
    args: &'a [ScriptValue],
    index: usize,
    method: &'static str,
) -> Result<&'a str, ScriptHostError> {
    args.get(index)
        .and_then(ScriptValue::as_str)
        .ok_or_else(|| bad_argument(args, index, method, ValueKind::Str))
}

/// Optional string argument: absent (`Null`) resolves to `None`.
pub fn arg_opt_str<'a>(
    args: &'a [ScriptValue],
    index: usize,
    method: &'static str,
) -> Result<Option<&'a str>, ScriptHostError> {
    match args.get(index) {
        None | Some(ScriptValue::Null) => Ok(None),
        Some(ScriptValue::String(text)) => Ok(Some(text.as_str())),
        Some(other) => Err(ScriptHostError::BadArgument {
            method,
            index,
            expected: ValueKind::Str.label(),
            got: other.type_name(),
        }),
    }
}

fn bad_argument(
    args: &[ScriptValue],
    index: usize,
    method: &'static str,
    expected: ValueKind,
) -> ScriptHostError {
    ScriptHostError::BadArgument {
        method,
        index,
        expected: expected.label(),
        got: args
            .get(index)
            .map(ScriptValue::type_name)
            .unwrap_or("nothing"),
    }
}
