use rhai::{Array, Dynamic, EvalAltResult, ImmutableString, Map, Position, INT};
use sb_core::ScriptValue;

/// rhai-side wrapper for host values that have no native rhai shape
/// (objects, weak references, bound methods).
#[derive(Clone)]
pub struct HostHandle {
    pub(crate) value: ScriptValue,
}

pub(crate) fn runtime_error(message: impl Into<String>) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(message.into()),
        Position::NONE,
    ))
}

pub(crate) fn to_dynamic(value: &ScriptValue) -> Dynamic {
    match value {
        ScriptValue::Null => Dynamic::UNIT,
        ScriptValue::Bool(value) => Dynamic::from_bool(*value),
        ScriptValue::I32(value) => Dynamic::from_int(INT::from(*value)),
        ScriptValue::U32(value) => Dynamic::from_int(INT::from(*value)),
        ScriptValue::String(value) => Dynamic::from(value.clone()),
        ScriptValue::List(values) => {
            let array: Array = values.iter().map(to_dynamic).collect();
            Dynamic::from_array(array)
        }
        ScriptValue::Table(values) => {
            let mut map = Map::new();
            for (key, value) in values {
                map.insert(key.as_str().into(), to_dynamic(value));
            }
            Dynamic::from_map(map)
        }
        ScriptValue::Object(_) | ScriptValue::Weak(_) | ScriptValue::Method(_) => {
            Dynamic::from(HostHandle {
                value: value.clone(),
            })
        }
    }
}

pub(crate) fn from_dynamic(value: Dynamic) -> Result<ScriptValue, Box<EvalAltResult>> {
    if value.is_unit() {
        return Ok(ScriptValue::Null);
    }
    if value.is::<bool>() {
        return Ok(ScriptValue::Bool(value.cast::<bool>()));
    }
    if value.is::<INT>() {
        let value = value.cast::<INT>();
        if let Ok(signed) = i32::try_from(value) {
            return Ok(ScriptValue::I32(signed));
        }
        if let Ok(unsigned) = u32::try_from(value) {
            return Ok(ScriptValue::U32(unsigned));
        }
        return Err(runtime_error(format!(
            "integer {value} does not fit a 32-bit host value"
        )));
    }
    if value.is::<ImmutableString>() {
        return Ok(ScriptValue::String(
            value.cast::<ImmutableString>().to_string(),
        ));
    }
    if value.is::<Array>() {
        let array = value.cast::<Array>();
        let mut out = Vec::with_capacity(array.len());
        for item in array {
            out.push(from_dynamic(item)?);
        }
        return Ok(ScriptValue::List(out));
    }
    if value.is::<Map>() {
        let map = value.cast::<Map>();
        let mut out = std::collections::BTreeMap::new();
        for (key, item) in map {
            out.insert(key.to_string(), from_dynamic(item)?);
        }
        return Ok(ScriptValue::Table(out));
    }
    if value.is::<HostHandle>() {
        return Ok(value.cast::<HostHandle>().value);
    }

    Err(runtime_error(format!(
        "unsupported rhai value of type {}",
        value.type_name()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_round_trip_through_dynamics() {
        let signed = from_dynamic(to_dynamic(&ScriptValue::I32(-5))).expect("i32 round trip");
        assert_eq!(signed, ScriptValue::I32(-5));

        let large = from_dynamic(to_dynamic(&ScriptValue::U32(0xF000_0000)))
            .expect("u32 round trip");
        assert_eq!(large, ScriptValue::U32(0xF000_0000));

        let out_of_range = from_dynamic(Dynamic::from_int(1_i64 << 40));
        assert!(out_of_range.is_err());
    }

    #[test]
    fn collections_convert_recursively() {
        let list = ScriptValue::List(vec![ScriptValue::U32(1), ScriptValue::Bool(true)]);
        assert_eq!(from_dynamic(to_dynamic(&list)).expect("list"),
            ScriptValue::List(vec![ScriptValue::I32(1), ScriptValue::Bool(true)]));

        let mut table = std::collections::BTreeMap::new();
        table.insert("k".to_string(), ScriptValue::String("v".to_string()));
        let table = ScriptValue::Table(table);
        let round = from_dynamic(to_dynamic(&table)).expect("table");
        assert_eq!(round, {
            let mut expected = std::collections::BTreeMap::new();
            expected.insert("k".to_string(), ScriptValue::String("v".to_string()));
            ScriptValue::Table(expected)
        });
    }

    #[test]
    fn floats_are_rejected() {
        assert!(from_dynamic(Dynamic::from_float(1.5)).is_err());
    }
}
