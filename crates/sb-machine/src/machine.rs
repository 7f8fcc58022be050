use std::cell::RefCell;
use std::rc::Rc;

use crate::block::MemoryBlockDescriptor;
use crate::state::StateFlags;

/// Shared single-threaded handle to the emulated machine.
pub type MachineRef = Rc<RefCell<dyn MachineCore>>;

/// The emulated machine as consumed by the scripting host.
///
/// Bus accessors take a linear address and go through whatever banking the
/// machine currently has mapped; raw accessors take an explicit bank index
/// so a caller that has already resolved a bank can reach any bank of a
/// region, mapped or not. A negative bank index selects the currently
/// mapped bank. Reads take `&mut self` because a bus access may have
/// side effects (MMIO).
pub trait MachineCore: 'static {
    fn platform(&self) -> &str;
    fn frame_counter(&self) -> u32;
    fn frame_cycles(&self) -> i32;
    fn frequency(&self) -> i32;

    fn game_title(&self) -> String;
    fn game_code(&self) -> String;

    fn run_frame(&mut self);
    fn step(&mut self);

    fn set_keys(&mut self, keys: u32);
    fn add_keys(&mut self, keys: u32);
    fn clear_keys(&mut self, keys: u32);
    fn keys(&self) -> u32;

    fn bus_read8(&mut self, address: u32) -> u8;
    fn bus_read16(&mut self, address: u32) -> u16;
    fn bus_read32(&mut self, address: u32) -> u32;
    fn bus_write8(&mut self, address: u32, value: u8);
    fn bus_write16(&mut self, address: u32, value: u16);
    fn bus_write32(&mut self, address: u32, value: u32);

    fn raw_read8(&mut self, address: u32, segment: i32) -> u8;
    fn raw_read16(&mut self, address: u32, segment: i32) -> u16;
    fn raw_read32(&mut self, address: u32, segment: i32) -> u32;
    fn raw_write8(&mut self, address: u32, segment: i32, value: u8);
    fn raw_write16(&mut self, address: u32, segment: i32, value: u16);
    fn raw_write32(&mut self, address: u32, segment: i32, value: u32);

    /// Register names are machine-defined strings. Reads on unknown names
    /// resolve to `None`; writes on unknown names are a no-op.
    fn read_register(&mut self, name: &str) -> Option<i32>;
    fn write_register(&mut self, name: &str, value: i32);

    /// Current block list in presentation order. Called again after every
    /// program change; the returned descriptors are an immutable snapshot.
    fn list_memory_blocks(&self) -> Vec<MemoryBlockDescriptor>;

    fn save_state_slot(&mut self, slot: i32, flags: StateFlags) -> bool;
    fn load_state_slot(&mut self, slot: i32, flags: StateFlags) -> bool;

    fn screenshot(&mut self);
}

pub fn machine_ref<M: MachineCore>(machine: M) -> MachineRef {
    Rc::new(RefCell::new(machine))
}
