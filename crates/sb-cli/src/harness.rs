use std::cell::RefCell;
use std::rc::Rc;

use sb_core::{ScriptContext, ScriptContextRef};
use sb_host::{
    attach_core, attach_logger, set_text_buffer_factory, EngineRegistry, InstallOutcome,
    LogLevel, LogSink, TextBuffer,
};
use sb_machine::SampleMachine;
use sb_rhai::RhaiScriptEngine;

/// Log sink routing script output to stderr.
pub(crate) struct StderrSink;

impl LogSink for StderrSink {
    fn write(&mut self, level: LogLevel, category: &str, message: &str) {
        let label = match level {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        eprintln!("[{label}] {category}: {message}");
    }
}

/// Text buffer that mirrors prints to stdout, prefixed with its name.
pub(crate) struct ConsoleBuffer {
    name: String,
    cols: u32,
    rows: u32,
    x: u32,
    y: u32,
}

impl ConsoleBuffer {
    pub(crate) fn new() -> Self {
        Self {
            name: String::new(),
            cols: 80,
            rows: 24,
            x: 0,
            y: 0,
        }
    }
}

impl TextBuffer for ConsoleBuffer {
    fn init(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn x(&self) -> u32 {
        self.x
    }

    fn y(&self) -> u32 {
        self.y
    }

    fn cols(&self) -> u32 {
        self.cols
    }

    fn rows(&self) -> u32 {
        self.rows
    }

    fn print(&mut self, text: &str) {
        println!("[{}] {}", self.name, text);
        self.x = self.x.saturating_add(text.len() as u32);
    }

    fn clear(&mut self) {
        self.x = 0;
        self.y = 0;
    }

    fn set_size(&mut self, cols: u32, rows: u32) {
        self.cols = cols;
        self.rows = rows;
    }

    fn move_cursor(&mut self, x: u32, y: u32) {
        self.x = x;
        self.y = y;
    }

    fn advance(&mut self, adv: i32) {
        self.x = self.x.saturating_add_signed(adv);
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
}

/// A fully wired host: sample machine attached, logger and buffer factory
/// installed, reference engine registered.
pub(crate) struct Harness {
    pub(crate) context: ScriptContextRef,
    pub(crate) registry: EngineRegistry,
    pub(crate) machine: Rc<RefCell<SampleMachine>>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let context = ScriptContext::shared();
        let machine = Rc::new(RefCell::new(SampleMachine::new()));

        attach_logger(&context, Rc::new(RefCell::new(StderrSink)));
        attach_core(&context, machine.clone());
        set_text_buffer_factory(&context, Box::new(|| Box::new(ConsoleBuffer::new())));

        let mut registry = EngineRegistry::new(context.clone());
        let outcome = registry.install_engine(Box::new(RhaiScriptEngine::new()));
        debug_assert_eq!(outcome, InstallOutcome::Installed);

        Self {
            context,
            registry,
            machine,
        }
    }
}
