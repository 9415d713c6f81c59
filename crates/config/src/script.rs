//! Executable config files.
//!
//! A `shortest.config.lua` file is a Lua 5.4 chunk; the table it returns is
//! the exported configuration. Each evaluation gets its own interpreter, so
//! nothing survives between loads.

use std::{collections::HashSet, ffi::c_void};

use {
    mlua::prelude::*,
    serde_json::{Map, Number, Value},
};

use crate::error::LoadError;

/// Evaluate `source` and convert its return value into a raw config value.
///
/// `name` identifies the chunk in Lua error messages.
pub(crate) fn evaluate(source: &str, name: &str) -> Result<Value, LoadError> {
    let lua = Lua::new();
    apply_sandbox(&lua)?;
    // Lets scripts spell out an explicit JSON null.
    lua.globals().set("null", LuaValue::NULL)?;

    let exported: LuaValue = lua.load(source).set_name(name).eval()?;
    match exported {
        LuaValue::Nil => Err(LoadError::NoExport),
        LuaValue::Table(table) => Converter::default().table(table, ""),
        other => Err(LoadError::NotATable {
            found: other.type_name(),
        }),
    }
}

/// Block C module loading. Config scripts are trusted user code, so the
/// pure-Lua standard library (including `os.getenv`) stays available.
fn apply_sandbox(lua: &Lua) -> LuaResult<()> {
    lua.load(
        r#"
        package.loadlib = nil
        package.cpath = ''
    "#,
    )
    .exec()
}

/// Deepest table nesting accepted in an exported config.
const MAX_DEPTH: usize = 64;

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Tracks the tables on the current conversion path so cycles are rejected
/// instead of recursing forever.
#[derive(Default)]
struct Converter {
    ancestors: HashSet<*const c_void>,
}

impl Converter {
    fn table(&mut self, table: LuaTable, path: &str) -> Result<Value, LoadError> {
        let ptr = table.to_pointer();
        if self.ancestors.contains(&ptr) {
            return Err(LoadError::Unrepresentable {
                path: path.to_string(),
                type_name: "cyclic table",
            });
        }
        if self.ancestors.len() >= MAX_DEPTH {
            return Err(LoadError::Unrepresentable {
                path: path.to_string(),
                type_name: "too deeply nested table",
            });
        }

        self.ancestors.insert(ptr);
        let converted = self.table_entries(table, path);
        self.ancestors.remove(&ptr);
        converted
    }

    fn table_entries(&mut self, table: LuaTable, path: &str) -> Result<Value, LoadError> {
        let len = table.raw_len();
        let mut entries = Vec::new();
        for pair in table.pairs::<LuaValue, LuaValue>() {
            entries.push(pair?);
        }

        // A non-empty table whose keys are exactly 1..=len is a sequence.
        let is_sequence = len > 0
            && entries.len() == len
            && entries
                .iter()
                .all(|(k, _)| matches!(k, LuaValue::Integer(i) if *i >= 1 && (*i as usize) <= len));

        if is_sequence {
            let mut items = vec![Value::Null; len];
            for (key, value) in entries {
                if let LuaValue::Integer(i) = key {
                    let index = (i - 1) as usize;
                    items[index] = self.value(value, &format!("{path}[{index}]"))?;
                }
            }
            return Ok(Value::Array(items));
        }

        // Anything else must be a record keyed only by strings.
        let mut map = Map::new();
        for (key, value) in entries {
            let key = match key {
                LuaValue::String(s) => s.to_str()?.to_string(),
                LuaValue::Integer(_) | LuaValue::Number(_) => {
                    return Err(LoadError::Unrepresentable {
                        path: path.to_string(),
                        type_name: "mixed or sparse table",
                    });
                },
                other => {
                    return Err(LoadError::Unrepresentable {
                        path: child_path(path, "<key>"),
                        type_name: other.type_name(),
                    });
                },
            };
            let converted = self.value(value, &child_path(path, &key))?;
            map.insert(key, converted);
        }
        Ok(Value::Object(map))
    }

    fn value(&mut self, value: LuaValue, path: &str) -> Result<Value, LoadError> {
        match value {
            LuaValue::Boolean(b) => Ok(Value::Bool(b)),
            LuaValue::Integer(i) => Ok(Value::from(i)),
            LuaValue::Number(n) => {
                Number::from_f64(n)
                    .map(Value::Number)
                    .ok_or_else(|| LoadError::Unrepresentable {
                        path: path.to_string(),
                        type_name: "non-finite number",
                    })
            },
            LuaValue::String(s) => Ok(Value::String(s.to_str()?.to_string())),
            LuaValue::Table(t) => self.table(t, path),
            LuaValue::LightUserData(ud) if ud.0.is_null() => Ok(Value::Null),
            other => Err(LoadError::Unrepresentable {
                path: path.to_string(),
                type_name: other.type_name(),
            }),
        }
    }
}
