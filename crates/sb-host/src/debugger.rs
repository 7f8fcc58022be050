use std::cell::RefCell;
use std::rc::Rc;

/// Why the debugger intercepted execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebuggerEntryReason {
    Manual,
    Attached,
    Breakpoint,
    Watchpoint,
    IllegalOpcode,
}

/// Context handed to engines alongside the entry reason.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebuggerEntryInfo {
    pub address: u32,
    pub detail: Option<String>,
}

/// External debugger instance associated with the registry.
///
/// The association is bidirectional in effect: the registry holds the
/// instance, and the instance is told when it gains or loses the registry.
pub trait Debugger {
    fn bridge_attached(&mut self) {}
    fn bridge_detached(&mut self) {}
}

pub type DebuggerRef = Rc<RefCell<dyn Debugger>>;
