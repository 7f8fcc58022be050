pub mod context;
pub mod error;
pub mod reflect;
pub mod value;

pub use context::{ScriptContext, ScriptContextRef, WeakRef};
pub use error::ScriptHostError;
pub use reflect::*;
pub use value::ScriptValue;
