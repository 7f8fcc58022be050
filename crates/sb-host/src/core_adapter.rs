use std::any::Any;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::OnceLock;

use sb_core::{
    arg_i32, arg_str, arg_u32, new_object, receiver_mut, DefaultArg, MethodDef, MethodTable,
    ObjectRef, ParamSpec, ScriptContextRef, ScriptObject, ScriptValue, ValueKind, WeakRef,
};
use sb_machine::{MachineRef, StateFlags};

use crate::region::MemoryRegionAdapter;

/// Global binding under which the attached machine is published.
pub const EMU_GLOBAL: &str = "emu";

const GAME_TITLE_BYTES: usize = 32;
const GAME_CODE_BYTES: usize = 16;

/// Fixed-size ROM header fields: truncate to capacity, stop at the first
/// NUL, keep ASCII only.
fn header_field(raw: &str, limit: usize) -> String {
    raw.bytes()
        .take(limit)
        .take_while(|byte| *byte != 0)
        .filter(u8::is_ascii)
        .map(char::from)
        .collect()
}

/// Reflected surface of the machine itself. The core adapter delegates any
/// member it does not declare to this object.
struct MachineObject {
    machine: MachineRef,
}

const KEYS: &[ParamSpec] = &[ParamSpec {
    name: "keys",
    kind: ValueKind::U32,
    default: DefaultArg::Required,
}];

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

const SAVE_SLOT: &[ParamSpec] = &[
    ParamSpec {
        name: "slot",
        kind: ValueKind::I32,
        default: DefaultArg::Required,
    },
    ParamSpec {
        name: "flags",
        kind: ValueKind::U32,
        default: DefaultArg::U32(StateFlags::SAVE_DEFAULT.bits()),
    },
];

const LOAD_SLOT: &[ParamSpec] = &[
    ParamSpec {
        name: "slot",
        kind: ValueKind::I32,
        default: DefaultArg::Required,
    },
    ParamSpec {
        name: "flags",
        kind: ValueKind::U32,
        default: DefaultArg::U32(StateFlags::LOAD_DEFAULT.bits()),
    },
];

fn machine_method_table() -> &'static MethodTable {
    static TABLE: OnceLock<MethodTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        MethodTable::new(
            "Machine",
            vec![
                MethodDef {
                    name: "platform",
                    doc: "Get which platform is being emulated",
                    params: &[],
                    result: ValueKind::Str,
                    func: |receiver, _args| {
                        let this = receiver_mut::<MachineObject>(receiver, "platform")?;
                        let platform = this.machine.borrow().platform().to_string();
                        Ok(ScriptValue::String(platform))
                    },
                },
                MethodDef {
                    name: "currentFrame",
                    doc: "Get the number of the current frame",
                    params: &[],
                    result: ValueKind::U32,
                    func: |receiver, _args| {
                        let this = receiver_mut::<MachineObject>(receiver, "currentFrame")?;
                        let frame = this.machine.borrow().frame_counter();
                        Ok(ScriptValue::U32(frame))
                    },
                },
                MethodDef {
                    name: "frameCycles",
                    doc: "Get the number of cycles per frame",
                    params: &[],
                    result: ValueKind::I32,
                    func: |receiver, _args| {
                        let this = receiver_mut::<MachineObject>(receiver, "frameCycles")?;
                        let cycles = this.machine.borrow().frame_cycles();
                        Ok(ScriptValue::I32(cycles))
                    },
                },
                MethodDef {
                    name: "frequency",
                    doc: "Get the number of cycles per second",
                    params: &[],
                    result: ValueKind::I32,
                    func: |receiver, _args| {
                        let this = receiver_mut::<MachineObject>(receiver, "frequency")?;
                        let frequency = this.machine.borrow().frequency();
                        Ok(ScriptValue::I32(frequency))
                    },
                },
                MethodDef {
                    name: "getGameTitle",
                    doc: "Get internal title of the game from the ROM header",
                    params: &[],
                    result: ValueKind::Str,
                    func: |receiver, _args| {
                        let this = receiver_mut::<MachineObject>(receiver, "getGameTitle")?;
                        let title = this.machine.borrow().game_title();
                        Ok(ScriptValue::String(header_field(&title, GAME_TITLE_BYTES)))
                    },
                },
                MethodDef {
                    name: "getGameCode",
                    doc: "Get internal product code for the game from the ROM header",
                    params: &[],
                    result: ValueKind::Str,
                    func: |receiver, _args| {
                        let this = receiver_mut::<MachineObject>(receiver, "getGameCode")?;
                        let code = this.machine.borrow().game_code();
                        Ok(ScriptValue::String(header_field(&code, GAME_CODE_BYTES)))
                    },
                },
                MethodDef {
                    name: "runFrame",
                    doc: "Run until the next frame",
                    params: &[],
                    result: ValueKind::Unit,
                    func: |receiver, _args| {
                        let this = receiver_mut::<MachineObject>(receiver, "runFrame")?;
                        this.machine.borrow_mut().run_frame();
                        Ok(ScriptValue::Null)
                    },
                },
                MethodDef {
                    name: "step",
                    doc: "Run a single instruction",
                    params: &[],
                    result: ValueKind::Unit,
                    func: |receiver, _args| {
                        let this = receiver_mut::<MachineObject>(receiver, "step")?;
                        this.machine.borrow_mut().step();
                        Ok(ScriptValue::Null)
                    },
                },
                MethodDef {
                    name: "setKeys",
                    doc: "Set the currently active keys",
                    params: KEYS,
                    result: ValueKind::Unit,
                    func: |receiver, args| {
                        let this = receiver_mut::<MachineObject>(receiver, "setKeys")?;
                        this.machine
                            .borrow_mut()
                            .set_keys(arg_u32(args, 0, "setKeys")?);
                        Ok(ScriptValue::Null)
                    },
                },
                MethodDef {
                    name: "addKeys",
                    doc: "Add keys to the currently active key list",
                    params: KEYS,
                    result: ValueKind::Unit,
                    func: |receiver, args| {
                        let this = receiver_mut::<MachineObject>(receiver, "addKeys")?;
                        this.machine
                            .borrow_mut()
                            .add_keys(arg_u32(args, 0, "addKeys")?);
                        Ok(ScriptValue::Null)
                    },
                },
                MethodDef {
                    name: "clearKeys",
                    doc: "Remove keys from the currently active key list",
                    params: KEYS,
                    result: ValueKind::Unit,
                    func: |receiver, args| {
                        let this = receiver_mut::<MachineObject>(receiver, "clearKeys")?;
                        this.machine
                            .borrow_mut()
                            .clear_keys(arg_u32(args, 0, "clearKeys")?);
                        Ok(ScriptValue::Null)
                    },
                },
                MethodDef {
                    name: "getKeys",
                    doc: "Get the currently active keys",
                    params: &[],
                    result: ValueKind::U32,
                    func: |receiver, _args| {
                        let this = receiver_mut::<MachineObject>(receiver, "getKeys")?;
                        let keys = this.machine.borrow().keys();
                        Ok(ScriptValue::U32(keys))
                    },
                },
                MethodDef {
                    name: "read8",
                    doc: "Read an 8-bit value from the given bus address",
                    params: ADDRESS,
                    result: ValueKind::U32,
                    func: |receiver, args| {
                        let this = receiver_mut::<MachineObject>(receiver, "read8")?;
                        let value = this.machine.borrow_mut().bus_read8(arg_u32(args, 0, "read8")?);
                        Ok(ScriptValue::U32(u32::from(value)))
                    },
                },
                MethodDef {
                    name: "read16",
                    doc: "Read a 16-bit value from the given bus address",
                    params: ADDRESS,
                    result: ValueKind::U32,
                    func: |receiver, args| {
                        let this = receiver_mut::<MachineObject>(receiver, "read16")?;
                        let value = this
                            .machine
                            .borrow_mut()
                            .bus_read16(arg_u32(args, 0, "read16")?);
                        Ok(ScriptValue::U32(u32::from(value)))
                    },
                },
                MethodDef {
                    name: "read32",
                    doc: "Read a 32-bit value from the given bus address",
                    params: ADDRESS,
                    result: ValueKind::U32,
                    func: |receiver, args| {
                        let this = receiver_mut::<MachineObject>(receiver, "read32")?;
                        let value = this
                            .machine
                            .borrow_mut()
                            .bus_read32(arg_u32(args, 0, "read32")?);
                        Ok(ScriptValue::U32(value))
                    },
                },
                MethodDef {
                    name: "readRange",
                    doc: "Read byte range from the given bus address",
                    params: &[
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
                    ],
                    result: ValueKind::List,
                    func: |receiver, args| {
                        let this = receiver_mut::<MachineObject>(receiver, "readRange")?;
                        let address = arg_u32(args, 0, "readRange")?;
                        let length = arg_u32(args, 1, "readRange")?;
                        let mut machine = this.machine.borrow_mut();
                        let bytes = (0..length)
                            .map(|offset| {
                                ScriptValue::U32(u32::from(
                                    machine.bus_read8(address.wrapping_add(offset)),
                                ))
                            })
                            .collect();
                        Ok(ScriptValue::List(bytes))
                    },
                },
                MethodDef {
                    name: "write8",
                    doc: "Write an 8-bit value to the given bus address",
                    params: ADDRESS_VALUE,
                    result: ValueKind::Unit,
                    func: |receiver, args| {
                        let this = receiver_mut::<MachineObject>(receiver, "write8")?;
                        this.machine.borrow_mut().bus_write8(
                            arg_u32(args, 0, "write8")?,
                            arg_u32(args, 1, "write8")? as u8,
                        );
                        Ok(ScriptValue::Null)
                    },
                },
                MethodDef {
                    name: "write16",
                    doc: "Write a 16-bit value to the given bus address",
                    params: ADDRESS_VALUE,
                    result: ValueKind::Unit,
                    func: |receiver, args| {
                        let this = receiver_mut::<MachineObject>(receiver, "write16")?;
                        this.machine.borrow_mut().bus_write16(
                            arg_u32(args, 0, "write16")?,
                            arg_u32(args, 1, "write16")? as u16,
                        );
                        Ok(ScriptValue::Null)
                    },
                },
                MethodDef {
                    name: "write32",
                    doc: "Write a 32-bit value to the given bus address",
                    params: ADDRESS_VALUE,
                    result: ValueKind::Unit,
                    func: |receiver, args| {
                        let this = receiver_mut::<MachineObject>(receiver, "write32")?;
                        this.machine.borrow_mut().bus_write32(
                            arg_u32(args, 0, "write32")?,
                            arg_u32(args, 1, "write32")?,
                        );
                        Ok(ScriptValue::Null)
                    },
                },
                MethodDef {
                    name: "readRegister",
                    doc: "Read the value of the register with the given name",
                    params: &[ParamSpec {
                        name: "regName",
                        kind: ValueKind::Str,
                        default: DefaultArg::Required,
                    }],
                    result: ValueKind::I32,
                    func: |receiver, args| {
                        let this = receiver_mut::<MachineObject>(receiver, "readRegister")?;
                        let name = arg_str(args, 0, "readRegister")?;
                        match this.machine.borrow_mut().read_register(name) {
                            Some(value) => Ok(ScriptValue::I32(value)),
                            None => Ok(ScriptValue::Null),
                        }
                    },
                },
                MethodDef {
                    name: "writeRegister",
                    doc: "Write the value of the register with the given name",
                    params: &[
                        ParamSpec {
                            name: "regName",
                            kind: ValueKind::Str,
                            default: DefaultArg::Required,
                        },
                        ParamSpec {
                            name: "value",
                            kind: ValueKind::I32,
                            default: DefaultArg::Required,
                        },
                    ],
                    result: ValueKind::Unit,
                    func: |receiver, args| {
                        let this = receiver_mut::<MachineObject>(receiver, "writeRegister")?;
                        let name = arg_str(args, 0, "writeRegister")?;
                        let value = arg_i32(args, 1, "writeRegister")?;
                        this.machine.borrow_mut().write_register(name, value);
                        Ok(ScriptValue::Null)
                    },
                },
                MethodDef {
                    name: "saveStateSlot",
                    doc: "Save state to the slot number",
                    params: SAVE_SLOT,
                    result: ValueKind::Bool,
                    func: |receiver, args| {
                        let this = receiver_mut::<MachineObject>(receiver, "saveStateSlot")?;
                        let slot = arg_i32(args, 0, "saveStateSlot")?;
                        let flags = StateFlags::from_bits_truncate(arg_u32(args, 1, "saveStateSlot")?);
                        let saved = this.machine.borrow_mut().save_state_slot(slot, flags);
                        Ok(ScriptValue::Bool(saved))
                    },
                },
                MethodDef {
                    name: "loadStateSlot",
                    doc: "Load state from the slot number",
                    params: LOAD_SLOT,
                    result: ValueKind::Bool,
                    func: |receiver, args| {
                        let this = receiver_mut::<MachineObject>(receiver, "loadStateSlot")?;
                        let slot = arg_i32(args, 0, "loadStateSlot")?;
                        let flags = StateFlags::from_bits_truncate(arg_u32(args, 1, "loadStateSlot")?);
                        let loaded = this.machine.borrow_mut().load_state_slot(slot, flags);
                        Ok(ScriptValue::Bool(loaded))
                    },
                },
                MethodDef {
                    name: "screenshot",
                    doc: "Save a screenshot",
                    params: &[],
                    result: ValueKind::Unit,
                    func: |receiver, _args| {
                        let this = receiver_mut::<MachineObject>(receiver, "screenshot")?;
                        this.machine.borrow_mut().screenshot();
                        Ok(ScriptValue::Null)
                    },
                },
            ],
        )
    })
}

impl ScriptObject for MachineObject {
    fn type_name(&self) -> &'static str {
        "Machine"
    }

    fn method_table(&self) -> &'static MethodTable {
        machine_method_table()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Exposes the reflected method table of the machine surface, for
/// host-side introspection (the CLI `describe` command).
pub fn machine_surface() -> &'static MethodTable {
    machine_method_table()
}

/// The `emu` object: one attached machine plus its memory map.
///
/// The map stores weak references only, so a handle a script kept across a
/// program reload goes inert instead of pointing at the previous program's
/// banks. Dropping the adapter releases the map without re-severing
/// references that detach already invalidated.
pub struct CoreAdapter {
    machine: MachineRef,
    machine_object: ObjectRef,
    memory: BTreeMap<String, WeakRef>,
}

impl CoreAdapter {
    pub fn new(machine: MachineRef) -> Self {
        let machine_object = new_object(MachineObject {
            machine: Rc::clone(&machine),
        });
        Self {
            machine,
            machine_object,
            memory: BTreeMap::new(),
        }
    }

    pub fn machine(&self) -> &MachineRef {
        &self.machine
    }

    pub fn region_names(&self) -> Vec<String> {
        self.memory.keys().cloned().collect()
    }

    pub fn region(&self, name: &str) -> Option<WeakRef> {
        self.memory.get(name).copied()
    }

    /// Tears the current map down (invalidating every weak reference) and
    /// rebuilds it from the machine's current block list.
    pub fn rebuild_memory_map(&mut self, context: &ScriptContextRef) {
        self.clear_memory_map(context);
        let blocks = self.machine.borrow().list_memory_blocks();
        for block in blocks {
            let name = block.name.clone();
            let region = MemoryRegionAdapter::new(Rc::clone(&self.machine), block);
            let weak = context
                .borrow_mut()
                .make_weakref(ScriptValue::Object(new_object(region)));
            self.memory.insert(name, weak);
        }
    }

    /// Severs every map entry's weak reference, then releases the table.
    pub fn clear_memory_map(&mut self, context: &ScriptContextRef) {
        let mut inner = context.borrow_mut();
        for weak in self.memory.values() {
            inner.clear_weakref(*weak);
        }
        drop(inner);
        self.memory.clear();
    }

    fn memory_table(&self) -> ScriptValue {
        ScriptValue::Table(
            self.memory
                .iter()
                .map(|(name, weak)| (name.clone(), ScriptValue::Weak(*weak)))
                .collect(),
        )
    }
}

fn core_adapter_method_table() -> &'static MethodTable {
    static TABLE: OnceLock<MethodTable> = OnceLock::new();
    TABLE.get_or_init(|| MethodTable::new("CoreAdapter", Vec::new()))
}

impl ScriptObject for CoreAdapter {
    fn type_name(&self) -> &'static str {
        "CoreAdapter"
    }

    fn method_table(&self) -> &'static MethodTable {
        core_adapter_method_table()
    }

    fn get_member(&self, name: &str) -> Option<ScriptValue> {
        (name == "memory").then(|| self.memory_table())
    }

    fn delegate(&self) -> Option<ObjectRef> {
        Some(Rc::clone(&self.machine_object))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Attaches a machine: builds the memory map and publishes the adapter as
/// the `emu` global.
pub fn attach_core(context: &ScriptContextRef, machine: MachineRef) {
    let mut adapter = CoreAdapter::new(machine);
    adapter.rebuild_memory_map(context);
    let object = new_object(adapter);
    context
        .borrow_mut()
        .set_global(EMU_GLOBAL, ScriptValue::Object(object));
}

/// Detaches the published machine, if any: invalidates the memory map and
/// removes the `emu` global.
pub fn detach_core(context: &ScriptContextRef) {
    let value = context.borrow().global(EMU_GLOBAL);
    let Some(value) = value else {
        return;
    };
    if let Some(object) = value.as_object() {
        let mut inner = object.borrow_mut();
        if let Some(adapter) = inner.as_any_mut().downcast_mut::<CoreAdapter>() {
            adapter.clear_memory_map(context);
        }
    }
    context.borrow_mut().remove_global(EMU_GLOBAL);
}

/// Rebuilds the attached adapter's memory map. The host calls this whenever
/// the machine's loaded program changes; scripts must never observe a map
/// pointing at the previous program's banks.
pub fn refresh_memory_map(context: &ScriptContextRef) {
    let value = context.borrow().global(EMU_GLOBAL);
    let Some(value) = value else {
        return;
    };
    let Some(object) = value.as_object() else {
        return;
    };
    let mut inner = object.borrow_mut();
    if let Some(adapter) = inner.as_any_mut().downcast_mut::<CoreAdapter>() {
        adapter.rebuild_memory_map(context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use sb_core::{invoke, resolve_member, ScriptContext};
    use sb_machine::sample::CART_SEGMENT_START;
    use sb_machine::SampleMachine;

    fn attach_sample() -> (ScriptContextRef, Rc<RefCell<SampleMachine>>, ObjectRef) {
        let context = ScriptContext::shared();
        let concrete = Rc::new(RefCell::new(SampleMachine::new()));
        let machine: MachineRef = concrete.clone();
        attach_core(&context, machine);
        let emu = context
            .borrow()
            .global(EMU_GLOBAL)
            .and_then(|value| value.as_object().cloned())
            .expect("emu should be bound");
        (context, concrete, emu)
    }

    fn memory_table(emu: &ObjectRef) -> BTreeMap<String, ScriptValue> {
        match resolve_member(emu, "memory") {
            Some(ScriptValue::Table(entries)) => entries,
            other => panic!("memory member should be a table, got {other:?}"),
        }
    }

    fn region_object(
        context: &ScriptContextRef,
        emu: &ObjectRef,
        name: &str,
    ) -> Option<ObjectRef> {
        let entries = memory_table(emu);
        let weak = entries.get(name)?.as_weak()?;
        let value = context.borrow().access_weakref(weak)?;
        value.as_object().cloned()
    }

    #[test]
    fn attach_publishes_emu_with_the_machine_memory_map() {
        let (_context, _machine, emu) = attach_sample();
        let entries = memory_table(&emu);
        assert_eq!(
            entries.keys().cloned().collect::<Vec<_>>(),
            vec!["bios", "cart", "sram", "wram"]
        );
    }

    #[test]
    fn unresolved_members_fall_through_to_the_machine_surface() {
        let (_context, _machine, emu) = attach_sample();

        assert_eq!(
            invoke(&emu, "currentFrame", &[]).expect("currentFrame should pass"),
            ScriptValue::U32(0)
        );
        invoke(&emu, "runFrame", &[]).expect("runFrame should pass");
        assert_eq!(
            invoke(&emu, "currentFrame", &[]).expect("currentFrame should pass"),
            ScriptValue::U32(1)
        );

        assert_eq!(
            invoke(&emu, "platform", &[]).expect("platform should pass"),
            ScriptValue::String("sb1".to_string())
        );
        assert!(resolve_member(&emu, "noSuchMember").is_none());
    }

    #[test]
    fn key_state_operations_compose() {
        let (_context, _machine, emu) = attach_sample();
        invoke(&emu, "setKeys", &[ScriptValue::U32(0b0011)]).expect("setKeys should pass");
        invoke(&emu, "addKeys", &[ScriptValue::U32(0b0100)]).expect("addKeys should pass");
        invoke(&emu, "clearKeys", &[ScriptValue::U32(0b0001)]).expect("clearKeys should pass");
        assert_eq!(
            invoke(&emu, "getKeys", &[]).expect("getKeys should pass"),
            ScriptValue::U32(0b0110)
        );
    }

    #[test]
    fn header_fields_truncate_and_stop_at_nul() {
        let (_context, machine, emu) = attach_sample();
        machine.borrow_mut().set_header(
            "A VERY LONG TITLE THAT OVERFLOWS THE HEADER FIELD",
            "CODE\0TRAILING",
        );

        assert_eq!(
            invoke(&emu, "getGameTitle", &[]).expect("title should pass"),
            ScriptValue::String("A VERY LONG TITLE THAT OVERFLOWS".to_string())
        );
        assert_eq!(
            invoke(&emu, "getGameCode", &[]).expect("code should pass"),
            ScriptValue::String("CODE".to_string())
        );
    }

    #[test]
    fn register_reads_return_absent_for_unknown_names() {
        let (_context, _machine, emu) = attach_sample();

        assert_eq!(
            invoke(
                &emu,
                "readRegister",
                &[ScriptValue::String("zz".to_string())]
            )
            .expect("readRegister should pass"),
            ScriptValue::Null
        );

        invoke(
            &emu,
            "writeRegister",
            &[ScriptValue::String("r3".to_string()), ScriptValue::I32(41)],
        )
        .expect("writeRegister should pass");
        assert_eq!(
            invoke(
                &emu,
                "readRegister",
                &[ScriptValue::String("r3".to_string())]
            )
            .expect("readRegister should pass"),
            ScriptValue::I32(41)
        );

        // A write to an unknown register is a no-op, and the read still
        // resolves to absent afterwards.
        invoke(
            &emu,
            "writeRegister",
            &[ScriptValue::String("zz".to_string()), ScriptValue::I32(1)],
        )
        .expect("writeRegister should pass");
        assert_eq!(
            invoke(
                &emu,
                "readRegister",
                &[ScriptValue::String("zz".to_string())]
            )
            .expect("readRegister should pass"),
            ScriptValue::Null
        );
    }

    #[test]
    fn save_and_load_state_defaults_round_trip_machine_state() {
        let (_context, _machine, emu) = attach_sample();

        invoke(&emu, "runFrame", &[]).expect("runFrame should pass");
        invoke(
            &emu,
            "writeRegister",
            &[ScriptValue::String("r0".to_string()), ScriptValue::I32(7)],
        )
        .expect("writeRegister should pass");

        assert_eq!(
            invoke(&emu, "saveStateSlot", &[ScriptValue::I32(1)]).expect("save should pass"),
            ScriptValue::Bool(true)
        );

        invoke(&emu, "runFrame", &[]).expect("runFrame should pass");
        invoke(
            &emu,
            "writeRegister",
            &[ScriptValue::String("r0".to_string()), ScriptValue::I32(0)],
        )
        .expect("writeRegister should pass");

        assert_eq!(
            invoke(&emu, "loadStateSlot", &[ScriptValue::I32(1)]).expect("load should pass"),
            ScriptValue::Bool(true)
        );
        assert_eq!(
            invoke(&emu, "currentFrame", &[]).expect("currentFrame should pass"),
            ScriptValue::U32(1)
        );
        assert_eq!(
            invoke(
                &emu,
                "readRegister",
                &[ScriptValue::String("r0".to_string())]
            )
            .expect("readRegister should pass"),
            ScriptValue::I32(7)
        );

        assert_eq!(
            invoke(&emu, "loadStateSlot", &[ScriptValue::I32(9)]).expect("load should pass"),
            ScriptValue::Bool(false)
        );
    }

    #[test]
    fn screenshot_is_fire_and_forget() {
        let (_context, machine, emu) = attach_sample();
        assert_eq!(
            invoke(&emu, "screenshot", &[]).expect("screenshot should pass"),
            ScriptValue::Null
        );
        assert_eq!(machine.borrow().screenshot_count(), 1);
    }

    #[test]
    fn region_reads_match_the_bus_view_of_the_mapped_bank() {
        let (context, _machine, emu) = attach_sample();
        let cart = region_object(&context, &emu, "cart").expect("cart region should resolve");

        let via_region = invoke(&cart, "read8", &[ScriptValue::U32(0x2000)])
            .expect("region read should pass");
        let via_bus = invoke(&emu, "read8", &[ScriptValue::U32(CART_SEGMENT_START)])
            .expect("bus read should pass");
        assert_eq!(via_region, via_bus);
        assert_eq!(
            via_region,
            ScriptValue::U32(u32::from(SampleMachine::rom_byte(1, 0)))
        );
    }

    #[test]
    fn program_reload_invalidates_previously_issued_region_handles() {
        let (context, machine, emu) = attach_sample();
        let entries = memory_table(&emu);
        let stale = entries
            .get("cart")
            .and_then(ScriptValue::as_weak)
            .expect("cart weakref should exist");
        assert!(context.borrow().access_weakref(stale).is_some());

        machine
            .borrow_mut()
            .load_cartridge(vec![0x5A; 0x4000], "NEW GAME", "NEWG-0001");
        refresh_memory_map(&context);

        // The old handle is inert even though the name key still exists.
        assert!(context.borrow().access_weakref(stale).is_none());
        let fresh = memory_table(&emu)
            .get("cart")
            .and_then(ScriptValue::as_weak)
            .expect("cart weakref should exist after rebuild");
        assert_ne!(stale, fresh);

        let cart = region_object(&context, &emu, "cart").expect("fresh cart should resolve");
        assert_eq!(
            invoke(&cart, "read8", &[ScriptValue::U32(0)]).expect("read should pass"),
            ScriptValue::U32(0x5A)
        );
    }

    #[test]
    fn detach_invalidates_the_map_and_removes_the_global() {
        let (context, _machine, emu) = attach_sample();
        let weak = memory_table(&emu)
            .get("wram")
            .and_then(ScriptValue::as_weak)
            .expect("wram weakref should exist");

        detach_core(&context);
        assert!(context.borrow().global(EMU_GLOBAL).is_none());
        assert!(context.borrow().access_weakref(weak).is_none());

        // Detaching twice is harmless.
        detach_core(&context);
    }
}
