use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::OnceLock;

use sb_core::{
    arg_str, new_object, receiver_mut, DefaultArg, MethodDef, MethodTable, ParamSpec,
    ScriptContextRef, ScriptObject, ScriptValue, ValueKind,
};

/// Global binding under which the logger facade is published.
pub const CONSOLE_GLOBAL: &str = "console";

/// Category every script-originated message is tagged with.
const SCRIPT_CATEGORY: &str = "script";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// The host's logging sink. Implementations decide formatting and routing;
/// the facade only forwards.
pub trait LogSink: 'static {
    fn write(&mut self, level: LogLevel, category: &str, message: &str);
}

pub type LogSinkRef = Rc<RefCell<dyn LogSink>>;

/// Script-facing logger: three severities, fixed category, no return value.
struct ScriptLogger {
    sink: LogSinkRef,
}

impl ScriptLogger {
    fn forward(&self, level: LogLevel, message: &str) {
        self.sink
            .borrow_mut()
            .write(level, SCRIPT_CATEGORY, message);
    }
}

const MESSAGE: &[ParamSpec] = &[ParamSpec {
    name: "msg",
    kind: ValueKind::Str,
    default: DefaultArg::Required,
}];

fn logger_method_table() -> &'static MethodTable {
    static TABLE: OnceLock<MethodTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        MethodTable::new(
            "Logger",
            vec![
                MethodDef {
                    name: "log",
                    doc: "Print a log message",
                    params: MESSAGE,
                    result: ValueKind::Unit,
                    func: |receiver, args| {
                        let logger = receiver_mut::<ScriptLogger>(receiver, "log")?;
                        logger.forward(LogLevel::Info, arg_str(args, 0, "log")?);
                        Ok(ScriptValue::Null)
                    },
                },
                MethodDef {
                    name: "warn",
                    doc: "Print a warning message",
                    params: MESSAGE,
                    result: ValueKind::Unit,
                    func: |receiver, args| {
                        let logger = receiver_mut::<ScriptLogger>(receiver, "warn")?;
                        logger.forward(LogLevel::Warn, arg_str(args, 0, "warn")?);
                        Ok(ScriptValue::Null)
                    },
                },
                MethodDef {
                    name: "error",
                    doc: "Print an error message",
                    params: MESSAGE,
                    result: ValueKind::Unit,
                    func: |receiver, args| {
                        let logger = receiver_mut::<ScriptLogger>(receiver, "error")?;
                        logger.forward(LogLevel::Error, arg_str(args, 0, "error")?);
                        Ok(ScriptValue::Null)
                    },
                },
            ],
        )
    })
}

impl ScriptObject for ScriptLogger {
    fn type_name(&self) -> &'static str {
        "Logger"
    }

    fn method_table(&self) -> &'static MethodTable {
        logger_method_table()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Publishes the logger facade as the `console` global.
pub fn attach_logger(context: &ScriptContextRef, sink: LogSinkRef) {
    let logger = new_object(ScriptLogger { sink });
    context
        .borrow_mut()
        .set_global(CONSOLE_GLOBAL, ScriptValue::Object(logger));
}

pub fn detach_logger(context: &ScriptContextRef) {
    context.borrow_mut().remove_global(CONSOLE_GLOBAL);
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_core::{invoke, ScriptContext};

    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) lines: Vec<(LogLevel, String, String)>,
    }

    impl LogSink for RecordingSink {
        fn write(&mut self, level: LogLevel, category: &str, message: &str) {
            self.lines
                .push((level, category.to_string(), message.to_string()));
        }
    }

    #[test]
    fn severities_forward_with_the_script_category() {
        let context = ScriptContext::shared();
        let sink = Rc::new(RefCell::new(RecordingSink::default()));
        attach_logger(&context, sink.clone());

        let console = context
            .borrow()
            .global(CONSOLE_GLOBAL)
            .expect("console should be bound");
        let console = console.as_object().expect("console should be an object").clone();

        for (method, level) in [
            ("log", LogLevel::Info),
            ("warn", LogLevel::Warn),
            ("error", LogLevel::Error),
        ] {
            invoke(
                &console,
                method,
                &[ScriptValue::String(format!("{method} line"))],
            )
            .expect("logging should pass");
            let lines = sink.borrow().lines.clone();
            let last = lines.last().expect("line should be recorded").clone();
            assert_eq!(last, (level, "script".to_string(), format!("{method} line")));
        }
    }

    #[test]
    fn detach_removes_the_console_binding() {
        let context = ScriptContext::shared();
        let sink = Rc::new(RefCell::new(RecordingSink::default()));
        attach_logger(&context, sink);
        detach_logger(&context);
        assert!(context.borrow().global(CONSOLE_GLOBAL).is_none());
    }
}
