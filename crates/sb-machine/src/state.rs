use bitflags::bitflags;

bitflags! {
    /// Sections of a numbered save-state slot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StateFlags: u32 {
        const SCREENSHOT = 1;
        const SAVEDATA = 1 << 1;
        const CHEATS = 1 << 2;
        const RTC = 1 << 3;
        const METADATA = 1 << 4;
        const ALL = Self::SCREENSHOT.bits()
            | Self::SAVEDATA.bits()
            | Self::CHEATS.bits()
            | Self::RTC.bits()
            | Self::METADATA.bits();
    }
}

impl StateFlags {
    /// Default section mask for saving a state.
    pub const SAVE_DEFAULT: Self = Self::ALL;

    /// Default section mask for loading a state. Save data is excluded so a
    /// state load never clobbers the persistent game save.
    pub const LOAD_DEFAULT: Self =
        Self::from_bits_truncate(Self::ALL.bits() & !Self::SAVEDATA.bits());
}
