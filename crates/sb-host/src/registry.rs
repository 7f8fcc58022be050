use std::path::Path;

use sb_core::{ScriptContextRef, ScriptHostError};

use crate::engine::{ScriptEngine, ScriptFile};

#[cfg(feature = "debugger")]
use crate::debugger::{DebuggerEntryInfo, DebuggerEntryReason, DebuggerRef};

/// Result of an `install_engine` call. Rejected engines are discarded and
/// never receive further events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    InitRejected,
    DuplicateName,
}

/// Owns the installed script engines and fans lifecycle events out to them.
///
/// Dispatch is in install order, which is deterministic but carries no
/// priority semantics: load and symbol lookup stop at the first engine that
/// succeeds, run and debugger notification always reach every engine.
pub struct EngineRegistry {
    context: ScriptContextRef,
    engines: Vec<Box<dyn ScriptEngine>>,
    #[cfg(feature = "debugger")]
    debugger: Option<DebuggerRef>,
}

impl EngineRegistry {
    pub fn new(context: ScriptContextRef) -> Self {
        Self {
            context,
            engines: Vec::new(),
            #[cfg(feature = "debugger")]
            debugger: None,
        }
    }

    pub fn context(&self) -> &ScriptContextRef {
        &self.context
    }

    pub fn engine_names(&self) -> Vec<String> {
        self.engines
            .iter()
            .map(|engine| engine.name().to_string())
            .collect()
    }

    /// Installs an engine: runs its init hook and registers it under the
    /// name it reports. Engines whose init fails, and engines whose name is
    /// already taken, are torn down and dropped.
    pub fn install_engine(&mut self, mut engine: Box<dyn ScriptEngine>) -> InstallOutcome {
        if !engine.init(self.context.clone()) {
            return InstallOutcome::InitRejected;
        }
        if self
            .engines
            .iter()
            .any(|installed| installed.name() == engine.name())
        {
            engine.deinit();
            return InstallOutcome::DuplicateName;
        }
        self.engines.push(engine);
        InstallOutcome::Installed
    }

    /// Opens the resource read-only and offers it to every installed engine
    /// until one both recognizes it and loads it. The handle is dropped
    /// before returning regardless of the outcome.
    pub fn load_script(&mut self, path: impl AsRef<Path>) -> Result<(), ScriptHostError> {
        let path = path.as_ref();
        let mut file =
            ScriptFile::open(path).map_err(|source| ScriptHostError::ResourceNotFound {
                path: path.display().to_string(),
                source,
            })?;

        for engine in &mut self.engines {
            if file.rewind().is_err() {
                break;
            }
            if !engine.is_script(&mut file) {
                continue;
            }
            if file.rewind().is_err() {
                break;
            }
            if engine.load_script(&mut file) {
                return Ok(());
            }
        }
        Err(ScriptHostError::NoEngineAccepted {
            path: path.display().to_string(),
        })
    }

    /// Resolves a global symbol against the installed engines, stopping at
    /// the first one that reports success.
    pub fn lookup_symbol(&mut self, name: &str) -> Option<i32> {
        self.engines
            .iter_mut()
            .find_map(|engine| engine.lookup_symbol(name))
    }

    /// Runs every installed engine once, unconditionally.
    pub fn run(&mut self) {
        for engine in &mut self.engines {
            engine.run();
        }
    }

    /// Notifies every installed engine of a debugger entry.
    #[cfg(feature = "debugger")]
    pub fn debugger_entered(&mut self, reason: DebuggerEntryReason, info: &DebuggerEntryInfo) {
        for engine in &mut self.engines {
            engine.debugger_entered(reason, info);
        }
    }

    /// Associates one external debugger with the registry. Setting the same
    /// instance again is a no-op; replacing an existing one detaches it
    /// first.
    #[cfg(feature = "debugger")]
    pub fn set_debugger(&mut self, debugger: Option<DebuggerRef>) {
        if let (Some(current), Some(next)) = (&self.debugger, &debugger) {
            if std::rc::Rc::ptr_eq(current, next) {
                return;
            }
        }
        if let Some(old) = self.debugger.take() {
            old.borrow_mut().bridge_detached();
        }
        if let Some(new) = &debugger {
            new.borrow_mut().bridge_attached();
        }
        self.debugger = debugger;
    }

    #[cfg(feature = "debugger")]
    pub fn debugger(&self) -> Option<DebuggerRef> {
        self.debugger.clone()
    }
}

impl Drop for EngineRegistry {
    fn drop(&mut self) {
        for engine in &mut self.engines {
            engine.deinit();
        }
    }
}
