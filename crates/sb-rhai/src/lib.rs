mod convert;

use rhai::{Array, Dynamic, Engine, Scope, AST, INT};

use sb_core::{invoke, resolve_member, ScriptContextRef, ScriptValue};
use sb_host::{ScriptEngine, ScriptFile, CONSOLE_GLOBAL};

use convert::{from_dynamic, runtime_error, to_dynamic, HostHandle};

pub use convert::HostHandle as RhaiHostHandle;

const ENGINE_NAME: &str = "rhai";
const SCRIPT_EXTENSION: &str = ".rhai";
const SCRIPT_MARKER: &[u8] = b"//!rhai";
const FRAME_ENTRY_POINT: &str = "frame";

/// Reference engine: binds the plugin contract to the rhai interpreter.
///
/// Scripts see the host globals through a small registered API: `global`
/// fetches a binding, `getp` resolves a property (weak references are
/// dereferenced on access), `call` invokes a reflected method, and
/// `log`/`warn`/`error` forward to the logger facade. Top-level code runs
/// once at load; a script-defined `frame` function, if present, runs once
/// per tick.
pub struct RhaiScriptEngine {
    context: Option<ScriptContextRef>,
    engine: Engine,
    scope: Scope<'static>,
    ast: Option<AST>,
}

impl Default for RhaiScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RhaiScriptEngine {
    pub fn new() -> Self {
        Self {
            context: None,
            engine: Engine::new(),
            scope: Scope::new(),
            ast: None,
        }
    }

    pub fn has_script(&self) -> bool {
        self.ast.is_some()
    }

    fn report_error(&self, message: impl std::fmt::Display) {
        let Some(context) = &self.context else {
            return;
        };
        let console = context.borrow().global(CONSOLE_GLOBAL);
        if let Some(object) = console.as_ref().and_then(ScriptValue::as_object) {
            let _ = invoke(
                object,
                "error",
                &[ScriptValue::String(message.to_string())],
            );
        }
    }
}

fn deref_value(context: &ScriptContextRef, value: &ScriptValue) -> Option<ScriptValue> {
    match value {
        ScriptValue::Weak(weak) => context.borrow().access_weakref(*weak),
        other => Some(other.clone()),
    }
}

fn get_property(
    context: &ScriptContextRef,
    value: &ScriptValue,
    name: &str,
) -> Option<ScriptValue> {
    let target = deref_value(context, value)?;
    let resolved = match target {
        ScriptValue::Object(object) => resolve_member(&object, name),
        ScriptValue::Table(entries) => entries.get(name).cloned(),
        _ => None,
    }?;
    deref_value(context, &resolved)
}

fn invoke_host(
    context: &ScriptContextRef,
    handle: &HostHandle,
    name: &str,
    args: Vec<Dynamic>,
) -> Result<Dynamic, Box<rhai::EvalAltResult>> {
    let target = deref_value(context, &handle.value)
        .ok_or_else(|| runtime_error(format!("stale handle used to call \"{name}\"")))?;
    let ScriptValue::Object(object) = target else {
        return Err(runtime_error(format!(
            "\"{name}\" called on a non-object value"
        )));
    };

    let mut host_args = Vec::with_capacity(args.len());
    for arg in args {
        host_args.push(from_dynamic(arg)?);
    }

    let result = invoke(&object, name, &host_args)
        .map_err(|error| runtime_error(error.to_string()))?;
    let result = deref_value(context, &result).unwrap_or(ScriptValue::Null);
    Ok(to_dynamic(&result))
}

fn console_write(context: &ScriptContextRef, method: &'static str, message: &str) {
    let console = context.borrow().global(CONSOLE_GLOBAL);
    if let Some(object) = console.as_ref().and_then(ScriptValue::as_object) {
        let _ = invoke(object, method, &[ScriptValue::String(message.to_string())]);
    }
}

fn register_host_api(engine: &mut Engine, context: &ScriptContextRef) {
    engine.register_type_with_name::<HostHandle>("HostHandle");

    let ctx = context.clone();
    engine.register_fn("global", move |name: &str| -> Dynamic {
        match ctx.borrow().global(name) {
            Some(value) => to_dynamic(&value),
            None => Dynamic::UNIT,
        }
    });

    let ctx = context.clone();
    engine.register_fn("getp", move |handle: HostHandle, name: &str| -> Dynamic {
        match get_property(&ctx, &handle.value, name) {
            Some(value) => to_dynamic(&value),
            None => Dynamic::UNIT,
        }
    });

    let ctx = context.clone();
    engine.register_fn(
        "call",
        move |handle: HostHandle, name: &str| invoke_host(&ctx, &handle, name, Vec::new()),
    );

    let ctx = context.clone();
    engine.register_fn(
        "call",
        move |handle: HostHandle, name: &str, arg: Dynamic| {
            invoke_host(&ctx, &handle, name, vec![arg])
        },
    );

    let ctx = context.clone();
    engine.register_fn(
        "call",
        move |handle: HostHandle, name: &str, first: Dynamic, second: Dynamic| {
            invoke_host(&ctx, &handle, name, vec![first, second])
        },
    );

    let ctx = context.clone();
    engine.register_fn(
        "calln",
        move |handle: HostHandle, name: &str, args: Array| {
            invoke_host(&ctx, &handle, name, args)
        },
    );

    let ctx = context.clone();
    engine.register_fn("log", move |message: &str| console_write(&ctx, "log", message));
    let ctx = context.clone();
    engine.register_fn("warn", move |message: &str| {
        console_write(&ctx, "warn", message)
    });
    let ctx = context.clone();
    engine.register_fn("error", move |message: &str| {
        console_write(&ctx, "error", message)
    });
}

impl ScriptEngine for RhaiScriptEngine {
    fn init(&mut self, context: ScriptContextRef) -> bool {
        register_host_api(&mut self.engine, &context);
        self.context = Some(context);
        true
    }

    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn is_script(&mut self, file: &mut ScriptFile) -> bool {
        if file.name().ends_with(SCRIPT_EXTENSION) {
            return true;
        }
        file.read_prefix(SCRIPT_MARKER.len())
            .map(|prefix| prefix == SCRIPT_MARKER)
            .unwrap_or(false)
    }

    fn load_script(&mut self, file: &mut ScriptFile) -> bool {
        let source = match file.read_to_string() {
            Ok(source) => source,
            Err(error) => {
                self.report_error(format!("{}: {error}", file.name()));
                return false;
            }
        };
        let ast = match self.engine.compile(&source) {
            Ok(ast) => ast,
            Err(error) => {
                self.report_error(format!("{}: {error}", file.name()));
                return false;
            }
        };

        let mut scope = Scope::new();
        match self.engine.run_ast_with_scope(&mut scope, &ast) {
            Ok(()) => {
                self.scope = scope;
                self.ast = Some(ast);
                true
            }
            Err(error) => {
                self.report_error(format!("{}: {error}", file.name()));
                false
            }
        }
    }

    fn run(&mut self) {
        let Some(ast) = &self.ast else {
            return;
        };
        let result = self
            .engine
            .call_fn::<Dynamic>(&mut self.scope, ast, FRAME_ENTRY_POINT, ());
        if let Err(error) = result {
            // A script with no per-tick entry point is fine; anything else
            // is surfaced on the console.
            if let rhai::EvalAltResult::ErrorFunctionNotFound(signature, _) = &*error {
                if signature.starts_with(FRAME_ENTRY_POINT) {
                    return;
                }
            }
            self.report_error(error);
        }
    }

    fn lookup_symbol(&mut self, name: &str) -> Option<i32> {
        let value = self.scope.get_value::<INT>(name)?;
        i32::try_from(value).ok()
    }

    fn deinit(&mut self) {
        self.ast = None;
        self.scope = Scope::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use sb_core::ScriptContext;
    use sb_host::{attach_core, attach_logger, LogLevel, LogSink};
    use sb_machine::sample::WRAM_START;
    use sb_machine::{MachineCore, MachineRef, SampleMachine};

    #[derive(Default)]
    struct RecordingSink {
        lines: Vec<(LogLevel, String)>,
    }

    impl LogSink for RecordingSink {
        fn write(&mut self, level: LogLevel, _category: &str, message: &str) {
            self.lines.push((level, message.to_string()));
        }
    }

    struct Harness {
        context: ScriptContextRef,
        machine: Rc<RefCell<SampleMachine>>,
        sink: Rc<RefCell<RecordingSink>>,
        engine: RhaiScriptEngine,
    }

    fn harness() -> Harness {
        let context = ScriptContext::shared();
        let machine = Rc::new(RefCell::new(SampleMachine::new()));
        let sink = Rc::new(RefCell::new(RecordingSink::default()));
        let shared: MachineRef = machine.clone();
        attach_core(&context, shared);
        attach_logger(&context, sink.clone());

        let mut engine = RhaiScriptEngine::new();
        assert!(engine.init(context.clone()));
        Harness {
            context,
            machine,
            sink,
            engine,
        }
    }

    fn load(engine: &mut RhaiScriptEngine, source: &str) -> bool {
        let mut file = ScriptFile::from_bytes("test.rhai", source);
        engine.load_script(&mut file)
    }

    #[test]
    fn sniffs_scripts_by_extension_or_marker() {
        let mut engine = RhaiScriptEngine::new();
        let mut by_extension = ScriptFile::from_bytes("demo.rhai", "let x = 1;");
        assert!(engine.is_script(&mut by_extension));

        let mut by_marker = ScriptFile::from_bytes("demo.txt", "//!rhai\nlet x = 1;");
        assert!(engine.is_script(&mut by_marker));

        let mut neither = ScriptFile::from_bytes("demo.lua", "print('x')");
        assert!(!engine.is_script(&mut neither));
    }

    #[test]
    fn load_runs_top_level_code_against_the_machine() {
        let mut harness = harness();
        assert!(load(
            &mut harness.engine,
            r#"
                let e = global("emu");
                log("platform is " + call(e, "platform"));
            "#,
        ));
        let sink = harness.sink.borrow();
        assert_eq!(
            sink.lines.as_slice(),
            &[(LogLevel::Info, "platform is sb1".to_string())]
        );
    }

    #[test]
    fn frame_entry_point_runs_once_per_tick() {
        let mut harness = harness();
        assert!(load(
            &mut harness.engine,
            r#"
                fn frame() {
                    let e = global("emu");
                    call(e, "runFrame");
                }
            "#,
        ));
        harness.engine.run();
        harness.engine.run();
        assert_eq!(harness.machine.borrow().frame_counter(), 2);
    }

    #[test]
    fn scripts_without_a_frame_function_still_tick_quietly() {
        let mut harness = harness();
        assert!(load(&mut harness.engine, "let x = 1;"));
        harness.engine.run();
        assert!(harness.sink.borrow().lines.is_empty());
    }

    #[test]
    fn symbols_resolve_from_the_retained_scope() {
        let mut harness = harness();
        assert!(load(
            &mut harness.engine,
            r#"
                const ENTRY_POINT = 0x2040;
                let scratch = 9;
            "#,
        ));
        assert_eq!(harness.engine.lookup_symbol("ENTRY_POINT"), Some(0x2040));
        assert_eq!(harness.engine.lookup_symbol("scratch"), Some(9));
        assert_eq!(harness.engine.lookup_symbol("missing"), None);
    }

    #[test]
    fn memory_regions_are_reachable_through_property_access() {
        let mut harness = harness();
        assert!(load(
            &mut harness.engine,
            r#"
                let e = global("emu");
                let wram = getp(getp(e, "memory"), "wram");
                call(wram, "write8", 0x10, 0x7F);
            "#,
        ));
        assert_eq!(
            harness.machine.borrow_mut().bus_read8(WRAM_START + 0x10),
            0x7F
        );

        // The same byte is visible through a banked read from the script.
        assert!(load(
            &mut harness.engine,
            r#"
                let e = global("emu");
                let wram = getp(getp(e, "memory"), "wram");
                let value = call(wram, "read8", 0x10);
                log("byte is " + value);
            "#,
        ));
        let lines = harness.sink.borrow().lines.clone();
        assert_eq!(
            lines.last(),
            Some(&(LogLevel::Info, "byte is 127".to_string()))
        );
    }

    #[test]
    fn compile_errors_fail_the_load_and_reach_the_console() {
        let mut harness = harness();
        assert!(!load(&mut harness.engine, "let x = ;"));
        let lines = harness.sink.borrow().lines.clone();
        assert!(matches!(lines.first(), Some((LogLevel::Error, _))));
    }

    #[test]
    fn runtime_errors_in_frame_are_reported_not_fatal() {
        let mut harness = harness();
        assert!(load(
            &mut harness.engine,
            r#"
                fn frame() {
                    let e = global("emu");
                    call(e, "noSuchMethod");
                }
            "#,
        ));
        harness.engine.run();
        let lines = harness.sink.borrow().lines.clone();
        assert!(matches!(lines.first(), Some((LogLevel::Error, _))));
        let _ = harness.context;
    }
}
