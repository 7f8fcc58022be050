use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use sb_core::ScriptContextRef;

#[cfg(feature = "debugger")]
use crate::debugger::{DebuggerEntryInfo, DebuggerEntryReason};

/// A script resource offered to engines during a load attempt.
///
/// The registry opens the resource read-only and rewinds it before each
/// engine looks at it, so content sniffing by one engine never corrupts the
/// next engine's view.
pub struct ScriptFile {
    name: String,
    source: FileSource,
}

enum FileSource {
    Disk(File),
    Memory(Cursor<Vec<u8>>),
}

impl ScriptFile {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            name: path.display().to_string(),
            source: FileSource::Disk(file),
        })
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Memory(Cursor::new(bytes.into())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rewind(&mut self) -> io::Result<()> {
        match &mut self.source {
            FileSource::Disk(file) => file.seek(SeekFrom::Start(0)).map(|_| ()),
            FileSource::Memory(cursor) => cursor.seek(SeekFrom::Start(0)).map(|_| ()),
        }
    }

    /// Reads the whole resource from the start.
    pub fn read_to_string(&mut self) -> io::Result<String> {
        self.rewind()?;
        let mut out = String::new();
        match &mut self.source {
            FileSource::Disk(file) => file.read_to_string(&mut out)?,
            FileSource::Memory(cursor) => cursor.read_to_string(&mut out)?,
        };
        Ok(out)
    }

    /// Reads up to `limit` bytes from the start, for content sniffing.
    pub fn read_prefix(&mut self, limit: usize) -> io::Result<Vec<u8>> {
        self.rewind()?;
        let mut out = vec![0; limit];
        let read = match &mut self.source {
            FileSource::Disk(file) => read_up_to(file, &mut out)?,
            FileSource::Memory(cursor) => read_up_to(cursor, &mut out)?,
        };
        out.truncate(read);
        Ok(out)
    }
}

fn read_up_to(reader: &mut impl Read, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let read = reader.read(&mut buffer[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}

/// The plugin contract every installed script engine implements.
///
/// Engines receive the shared script context at init time and keep their
/// own clone of it; every later hook runs on the host's scripting tick.
pub trait ScriptEngine {
    /// Called once at install. Returning `false` discards the engine; it is
    /// never registered and receives no further events.
    fn init(&mut self, context: ScriptContextRef) -> bool;

    /// Unique registry key for this engine.
    fn name(&self) -> &str;

    /// Whether this engine can handle the given resource, judged by name
    /// and/or content sniffing.
    fn is_script(&mut self, file: &mut ScriptFile) -> bool;

    /// Attempts to load the resource. Returning `false` lets the registry
    /// keep offering the resource to other engines.
    fn load_script(&mut self, file: &mut ScriptFile) -> bool;

    /// One scheduling tick.
    fn run(&mut self);

    /// Resolves a 32-bit global symbol, or `None` when unknown.
    fn lookup_symbol(&mut self, name: &str) -> Option<i32>;

    /// Notification that the debugger intercepted execution.
    #[cfg(feature = "debugger")]
    fn debugger_entered(&mut self, _reason: DebuggerEntryReason, _info: &DebuggerEntryInfo) {}

    /// Called once at registry teardown.
    fn deinit(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_resource_reads_and_rewinds() {
        let mut file = ScriptFile::from_bytes("demo.rhai", "let x = 1;");
        assert_eq!(file.name(), "demo.rhai");
        assert_eq!(
            file.read_to_string().expect("read should pass"),
            "let x = 1;"
        );
        // A second full read sees the same bytes thanks to the rewind.
        assert_eq!(
            file.read_to_string().expect("re-read should pass"),
            "let x = 1;"
        );
    }

    #[test]
    fn prefix_read_is_clamped_to_the_resource_length() {
        let mut file = ScriptFile::from_bytes("short", "ab");
        assert_eq!(file.read_prefix(16).expect("prefix should pass"), b"ab");
    }
}
