pub mod core_adapter;
#[cfg(feature = "debugger")]
pub mod debugger;
pub mod engine;
pub mod logger;
pub mod region;
pub mod registry;
pub mod ui;

pub use core_adapter::{
    attach_core, detach_core, machine_surface, refresh_memory_map, CoreAdapter, EMU_GLOBAL,
};
#[cfg(feature = "debugger")]
pub use debugger::{Debugger, DebuggerEntryInfo, DebuggerEntryReason, DebuggerRef};
pub use engine::{ScriptEngine, ScriptFile};
pub use logger::{attach_logger, detach_logger, LogLevel, LogSink, LogSinkRef, CONSOLE_GLOBAL};
pub use region::MemoryRegionAdapter;
pub use registry::{EngineRegistry, InstallOutcome};
pub use ui::{set_text_buffer_factory, TextBuffer, TextBufferFactory, UiLibrary, UI_GLOBAL};
