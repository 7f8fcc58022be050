use std::any::Any;
use std::sync::OnceLock;

use sb_core::{
    arg_u32, receiver_mut, DefaultArg, MethodDef, MethodTable, ParamSpec, ScriptObject,
    ScriptValue, ValueKind,
};
use sb_machine::{MachineRef, MemoryBlockDescriptor};

/// Size of the repeating (bank-switched) portion of a region. For a region
/// without a segment prefix this is the whole window.
fn segment_size(block: &MemoryBlockDescriptor) -> u32 {
    let mut size = block.end.saturating_sub(block.start);
    if let Some(segment_start) = block.segment_start {
        size = size.saturating_sub(segment_start.saturating_sub(block.start));
    }
    size
}

/// Translates an adapter-relative offset into a bus-window physical address
/// plus the bank index to hand to the machine's raw accessors. Bank 0 reads
/// the fixed prefix verbatim; banks >= 1 land in the repeating window.
fn translate(block: &MemoryBlockDescriptor, address: u32) -> (u32, i32) {
    let size = segment_size(block);
    if size == 0 {
        return (block.start, 0);
    }
    let segment = (address / size) as i32;
    let mut physical = block.start.wrapping_add(address % size);
    if let Some(segment_start) = block.segment_start {
        if segment != 0 {
            physical = physical.wrapping_add(segment_start - block.start);
        }
    }
    (physical, segment)
}

/// Script-facing view of one memory region. Holds the machine reference and
/// an immutable copy of the descriptor taken at memory-map rebuild time.
pub struct MemoryRegionAdapter {
    machine: MachineRef,
    block: MemoryBlockDescriptor,
}

impl MemoryRegionAdapter {
    pub fn new(machine: MachineRef, block: MemoryBlockDescriptor) -> Self {
        Self { machine, block }
    }

    pub fn block(&self) -> &MemoryBlockDescriptor {
        &self.block
    }

    pub fn read8(&self, address: u32) -> u32 {
        let (physical, segment) = translate(&self.block, address);
        u32::from(self.machine.borrow_mut().raw_read8(physical, segment))
    }

    pub fn read16(&self, address: u32) -> u32 {
        let (physical, segment) = translate(&self.block, address);
        u32::from(self.machine.borrow_mut().raw_read16(physical, segment))
    }

    pub fn read32(&self, address: u32) -> u32 {
        let (physical, segment) = translate(&self.block, address);
        self.machine.borrow_mut().raw_read32(physical, segment)
    }

    /// Byte reads with the translation re-run at every index, so a range
    /// may cross bank boundaries.
    pub fn iter_range(&self, address: u32, length: u32) -> impl Iterator<Item = u32> + '_ {
        (0..length).map(move |offset| self.read8(address.wrapping_add(offset)))
    }

    pub fn read_range(&self, address: u32, length: u32) -> Vec<u32> {
        self.iter_range(address, length).collect()
    }

    pub fn write8(&self, address: u32, value: u32) {
        let (physical, segment) = translate(&self.block, address);
        self.machine
            .borrow_mut()
            .raw_write8(physical, segment, value as u8);
    }

    pub fn write16(&self, address: u32, value: u32) {
        let (physical, segment) = translate(&self.block, address);
        self.machine
            .borrow_mut()
            .raw_write16(physical, segment, value as u16);
    }

    pub fn write32(&self, address: u32, value: u32) {
        let (physical, segment) = translate(&self.block, address);
        self.machine
            .borrow_mut()
            .raw_write32(physical, segment, value);
    }
}

const ADDRESS: &[ParamSpec] = &[ParamSpec {
    name: "address",
    kind: ValueKind::U32,
    default: DefaultArg::Required,
}];

const ADDRESS_VALUE: &[ParamSpec] = &[
    ParamSpec {
        name: "address",
        kind: ValueKind::U32,
        default: DefaultArg::Required,
    },
    ParamSpec {
        name: "value",
        kind: ValueKind::U32,
        default: DefaultArg::Required,
    },
];

const ADDRESS_LENGTH: &[ParamSpec] = &[
    ParamSpec {
        name: "address",
        kind: ValueKind::U32,
        default: DefaultArg::Required,
    },
    ParamSpec {
        name: "length",
        kind: ValueKind::U32,
        default: DefaultArg::Required,
    },
];

fn region_method_table() -> &'static MethodTable {
    static TABLE: OnceLock<MethodTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        MethodTable::new(
            "MemoryRegionAdapter",
            vec![
                MethodDef {
                    name: "read8",
                    doc: "Read an 8-bit value from the given offset",
                    params: ADDRESS,
                    result: ValueKind::U32,
                    func: |receiver, args| {
                        let region = receiver_mut::<MemoryRegionAdapter>(receiver, "read8")?;
                        Ok(ScriptValue::U32(region.read8(arg_u32(args, 0, "read8")?)))
                    },
                },
                MethodDef {
                    name: "read16",
                    doc: "Read a 16-bit value from the given offset",
                    params: ADDRESS,
                    result: ValueKind::U32,
                    func: |receiver, args| {
                        let region = receiver_mut::<MemoryRegionAdapter>(receiver, "read16")?;
                        Ok(ScriptValue::U32(region.read16(arg_u32(args, 0, "read16")?)))
                    },
                },
                MethodDef {
                    name: "read32",
                    doc: "Read a 32-bit value from the given offset",
                    params: ADDRESS,
                    result: ValueKind::U32,
                    func: |receiver, args| {
                        let region = receiver_mut::<MemoryRegionAdapter>(receiver, "read32")?;
                        Ok(ScriptValue::U32(region.read32(arg_u32(args, 0, "read32")?)))
                    },
                },
                MethodDef {
                    name: "readRange",
                    doc: "Read byte range from the given offset",
                    params: ADDRESS_LENGTH,
                    result: ValueKind::List,
                    func: |receiver, args| {
                        let region = receiver_mut::<MemoryRegionAdapter>(receiver, "readRange")?;
                        let address = arg_u32(args, 0, "readRange")?;
                        let length = arg_u32(args, 1, "readRange")?;
                        Ok(ScriptValue::List(
                            region
                                .iter_range(address, length)
                                .map(ScriptValue::U32)
                                .collect(),
                        ))
                    },
                },
                MethodDef {
                    name: "write8",
                    doc: "Write an 8-bit value to the given offset",
                    params: ADDRESS_VALUE,
                    result: ValueKind::Unit,
                    func: |receiver, args| {
                        let region = receiver_mut::<MemoryRegionAdapter>(receiver, "write8")?;
                        region.write8(arg_u32(args, 0, "write8")?, arg_u32(args, 1, "write8")?);
                        Ok(ScriptValue::Null)
                    },
                },
                MethodDef {
                    name: "write16",
                    doc: "Write a 16-bit value to the given offset",
                    params: ADDRESS_VALUE,
                    result: ValueKind::Unit,
                    func: |receiver, args| {
                        let region = receiver_mut::<MemoryRegionAdapter>(receiver, "write16")?;
                        region.write16(arg_u32(args, 0, "write16")?, arg_u32(args, 1, "write16")?);
                        Ok(ScriptValue::Null)
                    },
                },
                MethodDef {
                    name: "write32",
                    doc: "Write a 32-bit value to the given offset",
                    params: ADDRESS_VALUE,
                    result: ValueKind::Unit,
                    func: |receiver, args| {
                        let region = receiver_mut::<MemoryRegionAdapter>(receiver, "write32")?;
                        region.write32(arg_u32(args, 0, "write32")?, arg_u32(args, 1, "write32")?);
                        Ok(ScriptValue::Null)
                    },
                },
            ],
        )
    })
}

impl ScriptObject for MemoryRegionAdapter {
    fn type_name(&self) -> &'static str {
        "MemoryRegionAdapter"
    }

    fn method_table(&self) -> &'static MethodTable {
        region_method_table()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
