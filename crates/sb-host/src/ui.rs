use std::any::Any;
use std::sync::OnceLock;

use sb_core::{
    arg_i32, arg_opt_str, arg_str, arg_u32, new_object, receiver_mut, DefaultArg, MethodDef,
    MethodTable, ParamSpec, ScriptContextRef, ScriptObject, ScriptValue, ValueKind,
};

/// Global binding under which the UI library is published.
pub const UI_GLOBAL: &str = "ui";

/// A named text output surface allocated by the host.
pub trait TextBuffer: 'static {
    fn init(&mut self, name: &str);
    fn x(&self) -> u32;
    fn y(&self) -> u32;
    fn cols(&self) -> u32;
    fn rows(&self) -> u32;
    fn print(&mut self, text: &str);
    fn clear(&mut self);
    fn set_size(&mut self, cols: u32, rows: u32);
    fn move_cursor(&mut self, x: u32, y: u32);
    fn advance(&mut self, adv: i32);
    fn set_name(&mut self, name: &str);
}

/// Host-supplied allocator for new text buffers.
pub type TextBufferFactory = Box<dyn FnMut() -> Box<dyn TextBuffer>>;

/// Script handle owning one allocated buffer.
struct TextBufferHandle {
    buffer: Box<dyn TextBuffer>,
}

fn buffer_method_table() -> &'static MethodTable {
    static TABLE: OnceLock<MethodTable> = OnceLock::new();
    const TEXT: &[ParamSpec] = &[ParamSpec {
        name: "text",
        kind: ValueKind::Str,
        default: DefaultArg::Required,
    }];
    const COLS_ROWS: &[ParamSpec] = &[
        ParamSpec {
            name: "cols",
            kind: ValueKind::U32,
            default: DefaultArg::Required,
        },
        ParamSpec {
            name: "rows",
            kind: ValueKind::U32,
            default: DefaultArg::Required,
        },
    ];
    const X_Y: &[ParamSpec] = &[
        ParamSpec {
            name: "x",
            kind: ValueKind::U32,
            default: DefaultArg::Required,
        },
        ParamSpec {
            name: "y",
            kind: ValueKind::U32,
            default: DefaultArg::Required,
        },
    ];
    TABLE.get_or_init(|| {
        MethodTable::new(
            "TextBuffer",
            vec![
                MethodDef {
                    name: "getX",
                    doc: "Get the current x position of the cursor",
                    params: &[],
                    result: ValueKind::U32,
                    func: |receiver, _args| {
                        let handle = receiver_mut::<TextBufferHandle>(receiver, "getX")?;
                        Ok(ScriptValue::U32(handle.buffer.x()))
                    },
                },
                MethodDef {
                    name: "getY",
                    doc: "Get the current y position of the cursor",
                    params: &[],
                    result: ValueKind::U32,
                    func: |receiver, _args| {
                        let handle = receiver_mut::<TextBufferHandle>(receiver, "getY")?;
                        Ok(ScriptValue::U32(handle.buffer.y()))
                    },
                },
                MethodDef {
                    name: "cols",
                    doc: "Get number of columns in the buffer",
                    params: &[],
                    result: ValueKind::U32,
                    func: |receiver, _args| {
                        let handle = receiver_mut::<TextBufferHandle>(receiver, "cols")?;
                        Ok(ScriptValue::U32(handle.buffer.cols()))
                    },
                },
                MethodDef {
                    name: "rows",
                    doc: "Get number of rows in the buffer",
                    params: &[],
                    result: ValueKind::U32,
                    func: |receiver, _args| {
                        let handle = receiver_mut::<TextBufferHandle>(receiver, "rows")?;
                        Ok(ScriptValue::U32(handle.buffer.rows()))
                    },
                },
                MethodDef {
                    name: "print",
                    doc: "Print text to the buffer at the cursor position",
                    params: TEXT,
                    result: ValueKind::Unit,
                    func: |receiver, args| {
                        let handle = receiver_mut::<TextBufferHandle>(receiver, "print")?;
                        handle.buffer.print(arg_str(args, 0, "print")?);
                        Ok(ScriptValue::Null)
                    },
                },
                MethodDef {
                    name: "clear",
                    doc: "Clear the buffer contents",
                    params: &[],
                    result: ValueKind::Unit,
                    func: |receiver, _args| {
                        let handle = receiver_mut::<TextBufferHandle>(receiver, "clear")?;
                        handle.buffer.clear();
                        Ok(ScriptValue::Null)
                    },
                },
                MethodDef {
                    name: "setSize",
                    doc: "Resize the buffer",
                    params: COLS_ROWS,
                    result: ValueKind::Unit,
                    func: |receiver, args| {
                        let handle = receiver_mut::<TextBufferHandle>(receiver, "setSize")?;
                        handle
                            .buffer
                            .set_size(arg_u32(args, 0, "setSize")?, arg_u32(args, 1, "setSize")?);
                        Ok(ScriptValue::Null)
                    },
                },
                MethodDef {
                    name: "moveCursor",
                    doc: "Move the cursor to the given position",
                    params: X_Y,
                    result: ValueKind::Unit,
                    func: |receiver, args| {
                        let handle = receiver_mut::<TextBufferHandle>(receiver, "moveCursor")?;
                        handle.buffer.move_cursor(
                            arg_u32(args, 0, "moveCursor")?,
                            arg_u32(args, 1, "moveCursor")?,
                        );
                        Ok(ScriptValue::Null)
                    },
                },
                MethodDef {
                    name: "advance",
                    doc: "Advance the cursor by the given number of columns",
                    params: &[ParamSpec {
                        name: "adv",
                        kind: ValueKind::I32,
                        default: DefaultArg::Required,
                    }],
                    result: ValueKind::Unit,
                    func: |receiver, args| {
                        let handle = receiver_mut::<TextBufferHandle>(receiver, "advance")?;
                        handle.buffer.advance(arg_i32(args, 0, "advance")?);
                        Ok(ScriptValue::Null)
                    },
                },
                MethodDef {
                    name: "setName",
                    doc: "Set the user-visible name of this buffer",
                    params: &[ParamSpec {
                        name: "name",
                        kind: ValueKind::Str,
                        default: DefaultArg::Required,
                    }],
                    result: ValueKind::Unit,
                    func: |receiver, args| {
                        let handle = receiver_mut::<TextBufferHandle>(receiver, "setName")?;
                        handle.buffer.set_name(arg_str(args, 0, "setName")?);
                        Ok(ScriptValue::Null)
                    },
                },
            ],
        )
    })
}

impl ScriptObject for TextBufferHandle {
    fn type_name(&self) -> &'static str {
        "TextBuffer"
    }

    fn method_table(&self) -> &'static MethodTable {
        buffer_method_table()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Script-facing UI library. Holds the host factory and nothing else.
pub struct UiLibrary {
    factory: Option<TextBufferFactory>,
    allocated: u32,
}

impl UiLibrary {
    fn create_buffer(&mut self, name: Option<&str>) -> Option<ScriptValue> {
        let factory = self.factory.as_mut()?;
        let mut buffer = factory();
        self.allocated += 1;
        match name {
            Some(name) => buffer.init(name),
            None => buffer.init(&format!("buffer-{}", self.allocated)),
        }
        Some(ScriptValue::Object(new_object(TextBufferHandle { buffer })))
    }
}

fn ui_method_table() -> &'static MethodTable {
    static TABLE: OnceLock<MethodTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        MethodTable::new(
            "UiLibrary",
            vec![MethodDef {
                name: "createBuffer",
                doc: "Create a new text buffer with the given name",
                params: &[ParamSpec {
                    name: "name",
                    kind: ValueKind::Str,
                    default: DefaultArg::Absent,
                }],
                result: ValueKind::Object,
                func: |receiver, args| {
                    let library = receiver_mut::<UiLibrary>(receiver, "createBuffer")?;
                    let name = arg_opt_str(args, 0, "createBuffer")?;
                    Ok(library.create_buffer(name).unwrap_or(ScriptValue::Null))
                },
            }],
        )
    })
}

impl ScriptObject for UiLibrary {
    fn type_name(&self) -> &'static str {
        "UiLibrary"
    }

    fn method_table(&self) -> &'static MethodTable {
        ui_method_table()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Installs the host's buffer factory, creating the `ui` global lazily on
/// first use.
pub fn set_text_buffer_factory(context: &ScriptContextRef, factory: TextBufferFactory) {
    let existing = context.borrow().global(UI_GLOBAL);
    if let Some(ScriptValue::Object(object)) = existing {
        let mut inner = object.borrow_mut();
        if let Some(library) = inner.as_any_mut().downcast_mut::<UiLibrary>() {
            library.factory = Some(factory);
            return;
        }
    }
    let library = new_object(UiLibrary {
        factory: Some(factory),
        allocated: 0,
    });
    context
        .borrow_mut()
        .set_global(UI_GLOBAL, ScriptValue::Object(library));
}
