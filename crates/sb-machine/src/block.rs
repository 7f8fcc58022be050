/// One named region of the machine's address space, as reported by
/// `MachineCore::list_memory_blocks`. The byte range is `[start, end)`;
/// `segment_start`, when set, marks where the bank-switched portion of the
/// region begins (bytes before it are a fixed prefix shared by every bank).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBlockDescriptor {
    pub name: String,
    pub start: u32,
    pub end: u32,
    pub segment_start: Option<u32>,
}

impl MemoryBlockDescriptor {
    pub fn linear(name: impl Into<String>, start: u32, end: u32) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            segment_start: None,
        }
    }

    pub fn banked(name: impl Into<String>, start: u32, end: u32, segment_start: u32) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            segment_start: Some(segment_start),
        }
    }

    pub fn is_banked(&self) -> bool {
        self.segment_start.is_some()
    }

    /// Size of the addressable window, prefix included.
    pub fn window_len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }
}
