use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::block::MemoryBlockDescriptor;
use crate::machine::MachineCore;
use crate::state::StateFlags;

pub const BIOS_START: u32 = 0x0000;
pub const BIOS_END: u32 = 0x2000;
pub const CART_START: u32 = 0x2000;
/// Start of the bank-switched cartridge window; bytes below it are bank 0.
pub const CART_SEGMENT_START: u32 = 0x4000;
pub const CART_END: u32 = 0x6000;
pub const WRAM_START: u32 = 0x6000;
pub const WRAM_END: u32 = 0x8000;
pub const SRAM_START: u32 = 0x8000;
pub const SRAM_END: u32 = 0x9000;

pub const CART_BANK_SIZE: usize = 0x2000;

const DEFAULT_BANKS: usize = 4;
const FRAME_CYCLES: i32 = 280_896;
const FREQUENCY: i32 = 16_777_216;

fn gpr_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^r([0-7])$").expect("register pattern should compile"))
}

fn gpr_index(name: &str) -> Option<usize> {
    let captures = gpr_pattern().captures(name)?;
    captures.get(1)?.as_str().parse().ok()
}

#[derive(Serialize, Deserialize)]
struct SampleState {
    frames: u32,
    keys: u32,
    gpr: [i32; 8],
    pc: i32,
    sp: i32,
    rom_bank: i32,
    wram: Vec<u8>,
    sram: Vec<u8>,
}

/// Reference machine used by the CLI harness and the integration tests.
///
/// A small fantasy console: 8 KiB of BIOS, a cartridge with a fixed bank 0
/// and a switchable 8 KiB window (register `rombank` selects the mapped
/// bank, MBC-style: bank 0 is never mapped into the window), 8 KiB of work
/// RAM, and 4 KiB of battery-backed save RAM.
pub struct SampleMachine {
    title: String,
    code: String,
    bios: Vec<u8>,
    rom: Vec<u8>,
    wram: Vec<u8>,
    sram: Vec<u8>,
    gpr: [i32; 8],
    pc: i32,
    sp: i32,
    rom_bank: i32,
    keys: u32,
    frames: u32,
    screenshots: u32,
    slots: BTreeMap<i32, String>,
}

impl Default for SampleMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleMachine {
    pub fn new() -> Self {
        let mut machine = Self {
            title: String::new(),
            code: String::new(),
            bios: vec![0; (BIOS_END - BIOS_START) as usize],
            rom: Vec::new(),
            wram: vec![0; (WRAM_END - WRAM_START) as usize],
            sram: vec![0; (SRAM_END - SRAM_START) as usize],
            gpr: [0; 8],
            pc: 0,
            sp: 0,
            rom_bank: 1,
            keys: 0,
            frames: 0,
            screenshots: 0,
            slots: BTreeMap::new(),
        };
        machine.load_cartridge(Self::default_rom(), "SAMPLE QUEST", "SBQE-0001");
        machine
    }

    /// Deterministic content of the default cartridge at `(bank, offset)`.
    pub fn rom_byte(bank: usize, offset: usize) -> u8 {
        (bank as u8).wrapping_mul(0x10).wrapping_add(offset as u8)
    }

    fn default_rom() -> Vec<u8> {
        let mut rom = vec![0; DEFAULT_BANKS * CART_BANK_SIZE];
        for bank in 0..DEFAULT_BANKS {
            for offset in 0..CART_BANK_SIZE {
                rom[bank * CART_BANK_SIZE + offset] = Self::rom_byte(bank, offset);
            }
        }
        rom
    }

    /// Replaces the loaded program. The host is expected to rebuild the
    /// scripting memory map after calling this.
    pub fn load_cartridge(&mut self, rom: Vec<u8>, title: impl Into<String>, code: impl Into<String>) {
        let mut rom = rom;
        let padded = rom.len().div_ceil(CART_BANK_SIZE).max(2) * CART_BANK_SIZE;
        rom.resize(padded, 0);
        self.rom = rom;
        self.title = title.into();
        self.code = code.into();
        self.rom_bank = 1;
        self.pc = 0;
        self.frames = 0;
    }

    pub fn set_header(&mut self, title: impl Into<String>, code: impl Into<String>) {
        self.title = title.into();
        self.code = code.into();
    }

    pub fn bank_count(&self) -> usize {
        self.rom.len() / CART_BANK_SIZE
    }

    pub fn screenshot_count(&self) -> u32 {
        self.screenshots
    }

    fn mapped_bank(&self, segment: i32) -> usize {
        let bank = if segment < 0 {
            self.rom_bank as usize
        } else {
            segment as usize
        };
        bank.min(self.bank_count() - 1)
    }

    fn read_byte(&self, address: u32, segment: i32) -> u8 {
        match address {
            BIOS_START..=0x1FFF => self.bios[(address - BIOS_START) as usize],
            CART_START..=0x3FFF => self.rom[(address - CART_START) as usize],
            CART_SEGMENT_START..=0x5FFF => {
                let bank = self.mapped_bank(segment);
                self.rom[bank * CART_BANK_SIZE + (address - CART_SEGMENT_START) as usize]
            }
            WRAM_START..=0x7FFF => self.wram[(address - WRAM_START) as usize],
            SRAM_START..=0x8FFF => self.sram[(address - SRAM_START) as usize],
            _ => 0,
        }
    }

    fn write_byte(&mut self, address: u32, _segment: i32, value: u8) {
        match address {
            WRAM_START..=0x7FFF => self.wram[(address - WRAM_START) as usize] = value,
            SRAM_START..=0x8FFF => self.sram[(address - SRAM_START) as usize] = value,
            // BIOS and cartridge ROM ignore writes.
            _ => {}
        }
    }
}

impl MachineCore for SampleMachine {
    fn platform(&self) -> &str {
        "sb1"
    }

    fn frame_counter(&self) -> u32 {
        self.frames
    }

    fn frame_cycles(&self) -> i32 {
        FRAME_CYCLES
    }

    fn frequency(&self) -> i32 {
        FREQUENCY
    }

    fn game_title(&self) -> String {
        self.title.clone()
    }

    fn game_code(&self) -> String {
        self.code.clone()
    }

    fn run_frame(&mut self) {
        self.frames += 1;
    }

    fn step(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    fn set_keys(&mut self, keys: u32) {
        self.keys = keys;
    }

    fn add_keys(&mut self, keys: u32) {
        self.keys |= keys;
    }

    fn clear_keys(&mut self, keys: u32) {
        self.keys &= !keys;
    }

    fn keys(&self) -> u32 {
        self.keys
    }

    fn bus_read8(&mut self, address: u32) -> u8 {
        self.read_byte(address, -1)
    }

    fn bus_read16(&mut self, address: u32) -> u16 {
        u16::from_le_bytes([self.bus_read8(address), self.bus_read8(address.wrapping_add(1))])
    }

    fn bus_read32(&mut self, address: u32) -> u32 {
        u32::from_le_bytes([
            self.bus_read8(address),
            self.bus_read8(address.wrapping_add(1)),
            self.bus_read8(address.wrapping_add(2)),
            self.bus_read8(address.wrapping_add(3)),
        ])
    }

    fn bus_write8(&mut self, address: u32, value: u8) {
        self.write_byte(address, -1, value);
    }

    fn bus_write16(&mut self, address: u32, value: u16) {
        for (offset, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.bus_write8(address.wrapping_add(offset as u32), byte);
        }
    }

    fn bus_write32(&mut self, address: u32, value: u32) {
        for (offset, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.bus_write8(address.wrapping_add(offset as u32), byte);
        }
    }

    fn raw_read8(&mut self, address: u32, segment: i32) -> u8 {
        self.read_byte(address, segment)
    }

    fn raw_read16(&mut self, address: u32, segment: i32) -> u16 {
        u16::from_le_bytes([
            self.read_byte(address, segment),
            self.read_byte(address.wrapping_add(1), segment),
        ])
    }

    fn raw_read32(&mut self, address: u32, segment: i32) -> u32 {
        u32::from_le_bytes([
            self.read_byte(address, segment),
            self.read_byte(address.wrapping_add(1), segment),
            self.read_byte(address.wrapping_add(2), segment),
            self.read_byte(address.wrapping_add(3), segment),
        ])
    }

    fn raw_write8(&mut self, address: u32, segment: i32, value: u8) {
        self.write_byte(address, segment, value);
    }

    fn raw_write16(&mut self, address: u32, segment: i32, value: u16) {
        for (offset, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.write_byte(address.wrapping_add(offset as u32), segment, byte);
        }
    }

    fn raw_write32(&mut self, address: u32, segment: i32, value: u32) {
        for (offset, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.write_byte(address.wrapping_add(offset as u32), segment, byte);
        }
    }

    fn read_register(&mut self, name: &str) -> Option<i32> {
        if let Some(index) = gpr_index(name) {
            return Some(self.gpr[index]);
        }
        match name {
            "pc" => Some(self.pc),
            "sp" => Some(self.sp),
            "rombank" => Some(self.rom_bank),
            _ => None,
        }
    }

    fn write_register(&mut self, name: &str, value: i32) {
        if let Some(index) = gpr_index(name) {
            self.gpr[index] = value;
            return;
        }
        match name {
            "pc" => self.pc = value,
            "sp" => self.sp = value,
            // Bank 0 is never mapped into the switchable window.
            "rombank" => self.rom_bank = value.clamp(1, self.bank_count() as i32 - 1),
            _ => {}
        }
    }

    fn list_memory_blocks(&self) -> Vec<MemoryBlockDescriptor> {
        vec![
            MemoryBlockDescriptor::linear("bios", BIOS_START, BIOS_END),
            MemoryBlockDescriptor::banked("cart", CART_START, CART_END, CART_SEGMENT_START),
            MemoryBlockDescriptor::linear("wram", WRAM_START, WRAM_END),
            MemoryBlockDescriptor::linear("sram", SRAM_START, SRAM_END),
        ]
    }

    fn save_state_slot(&mut self, slot: i32, flags: StateFlags) -> bool {
        let state = SampleState {
            frames: self.frames,
            keys: self.keys,
            gpr: self.gpr,
            pc: self.pc,
            sp: self.sp,
            rom_bank: self.rom_bank,
            wram: self.wram.clone(),
            sram: if flags.contains(StateFlags::SAVEDATA) {
                self.sram.clone()
            } else {
                Vec::new()
            },
        };
        match serde_json::to_string(&state) {
            Ok(encoded) => {
                self.slots.insert(slot, encoded);
                true
            }
            Err(_) => false,
        }
    }

    fn load_state_slot(&mut self, slot: i32, flags: StateFlags) -> bool {
        let Some(encoded) = self.slots.get(&slot) else {
            return false;
        };
        let Ok(state) = serde_json::from_str::<SampleState>(encoded) else {
            return false;
        };
        self.frames = state.frames;
        self.keys = state.keys;
        self.gpr = state.gpr;
        self.pc = state.pc;
        self.sp = state.sp;
        self.rom_bank = state.rom_bank;
        self.wram = state.wram;
        if flags.contains(StateFlags::SAVEDATA) && !state.sram.is_empty() {
            self.sram = state.sram;
        }
        true
    }

    fn screenshot(&mut self) {
        self.screenshots += 1;
    }
}
