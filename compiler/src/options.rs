//! Option extractor.
//!
//! Projects the custom extensions set on `EnumValueOptions`, `FieldOptions`
//! and `MessageOptions` into read-only [OptionBag]s, and records which enum
//! value options exist in the run so the generated metadata class can declare
//! every key up front.

use prost_reflect::{DescriptorPool, DynamicMessage, Kind, MapKey, ReflectMessage, Value};
use protoc_gen_pydantic_schema::{OptionBag, OptionValue};

use std::collections::BTreeMap;

pub const ENUM_VALUE_OPTIONS: &str = "google.protobuf.EnumValueOptions";

/// Validation rules are translated separately and never surface as options.
const VALIDATION_PACKAGE: &str = "buf.validate";

/// A custom option declared somewhere in the descriptor set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomOptionField {
    /// Fully-qualified extension name; the key in every [OptionBag].
    pub full_name: String,
    /// Attribute name in generated code.
    pub name:      String,
    /// Python annotation for the option's value, without the `None` union.
    pub py_type:   String,
}

/// Custom `EnumValueOptions` extensions known to the run. Generated
/// `_EnumValueOptions` classes declare one attribute per entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionRegistry {
    pub enum_value: Vec<CustomOptionField>,
}

impl OptionRegistry {
    /// Scans the pool's extensions, sorted by attribute name so the generated
    /// dataclass layout does not depend on file order.
    pub fn from_pool(pool: &DescriptorPool) -> Self {
        let mut by_full_name = BTreeMap::new();
        for ext in pool.all_extensions() {
            if ext.parent_file().package_name() == VALIDATION_PACKAGE
                || ext.containing_message().full_name() != ENUM_VALUE_OPTIONS
            {
                continue;
            }
            by_full_name.insert(ext.full_name().to_string(), python_type(&ext.kind(), ext.is_list()));
        }

        let keys: Vec<&str> = by_full_name.keys().map(String::as_str).collect();
        let mut enum_value: Vec<CustomOptionField> = by_full_name
            .iter()
            .map(|(full_name, py_type)| CustomOptionField {
                full_name: full_name.clone(),
                name:      display_key(full_name, &keys).replace('.', "_"),
                py_type:   py_type.clone(),
            })
            .collect();
        enum_value.sort_by(|a, b| a.name.cmp(&b.name));
        OptionRegistry { enum_value }
    }
}

/// Short name of an option extension, or its full name when another key in
/// `keys` shares the short name.
pub fn display_key<'a>(full_name: &'a str, keys: &[&str]) -> &'a str {
    let short = short_name(full_name);
    if keys.iter().filter(|k| short_name(k) == short).count() > 1 {
        full_name
    } else {
        short
    }
}

fn short_name(full_name: &str) -> &str {
    full_name.rsplit('.').next().unwrap_or(full_name)
}

fn python_type(kind: &Kind, is_list: bool) -> String {
    let base = match kind {
        Kind::Bool => "bool",
        Kind::Double | Kind::Float => "float",
        Kind::String => "str",
        Kind::Bytes => "bytes",
        Kind::Message(_) => "_Any",
        _ => "int",
    };
    if is_list {
        format!("tuple[{}, ...]", base)
    } else {
        base.to_string()
    }
}

/// Collects the custom extensions set on an options message, keyed by the
/// extension's full name.
pub fn extract_bag(options: &DynamicMessage) -> OptionBag {
    OptionBag::from_entries(
        options
            .extensions()
            .filter(|(ext, _)| ext.parent_file().package_name() != VALIDATION_PACKAGE)
            .map(|(ext, value)| (ext.full_name().to_string(), to_option_value(value))),
    )
}

/// Reads a built-in boolean option such as `deprecated`; absent means false.
pub fn bool_option(options: &DynamicMessage, name: &str) -> bool {
    options
        .get_field_by_name(name)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

fn to_option_value(value: &Value) -> OptionValue {
    match value {
        Value::Bool(b) => OptionValue::Bool(*b),
        Value::I32(i) => OptionValue::Int(*i as i64),
        Value::I64(i) => OptionValue::Int(*i),
        Value::U32(u) => OptionValue::UInt(*u as u64),
        Value::U64(u) => OptionValue::UInt(*u),
        Value::F32(f) => OptionValue::Float(widen_f32(*f)),
        Value::F64(f) => OptionValue::Float(*f),
        Value::String(s) => OptionValue::Str(s.clone()),
        Value::Bytes(b) => OptionValue::Bytes(b.to_vec()),
        Value::EnumNumber(n) => OptionValue::Int(*n as i64),
        Value::List(items) => OptionValue::List(items.iter().map(to_option_value).collect()),
        Value::Map(entries) => OptionValue::Map(
            entries
                .iter()
                .map(|(k, v)| (map_key(k), to_option_value(v)))
                .collect(),
        ),
        Value::Message(msg) => message_value(msg),
    }
}

/// Widens through the shortest decimal form so `0.1f32` stays `0.1`.
pub(crate) fn widen_f32(f: f32) -> f64 {
    f.to_string().parse().unwrap_or(f as f64)
}

fn map_key(key: &MapKey) -> String {
    match key {
        MapKey::Bool(b) => b.to_string(),
        MapKey::I32(i) => i.to_string(),
        MapKey::I64(i) => i.to_string(),
        MapKey::U32(u) => u.to_string(),
        MapKey::U64(u) => u.to_string(),
        MapKey::String(s) => s.clone(),
    }
}

/// Message-typed options become nested maps. `google.protobuf.Struct` and
/// friends unwrap to their JSON shape so a catch-all map keeps only the
/// user's keys.
fn message_value(msg: &DynamicMessage) -> OptionValue {
    let descriptor = msg.descriptor();
    match descriptor.full_name() {
        "google.protobuf.Struct" => match msg.get_field_by_name("fields").as_deref() {
            Some(Value::Map(entries)) => OptionValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| (map_key(k), to_option_value(v)))
                    .collect(),
            ),
            _ => OptionValue::Map(BTreeMap::new()),
        },
        "google.protobuf.Value" => match msg.fields().next() {
            Some((field, _)) if field.name() == "null_value" => OptionValue::Unset,
            Some((_, value)) => to_option_value(value),
            None => OptionValue::Unset,
        },
        "google.protobuf.ListValue" => match msg.get_field_by_name("values").as_deref() {
            Some(Value::List(items)) => OptionValue::List(items.iter().map(to_option_value).collect()),
            _ => OptionValue::List(Vec::new()),
        },
        _ => OptionValue::Map(
            msg.fields()
                .map(|(field, value)| (field.name().to_string(), to_option_value(value)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_are_qualified_only_on_a_clash() {
        let keys = ["acme.label", "beta.label", "beta.weight"];
        assert_eq!(display_key("acme.label", &keys), "acme.label");
        assert_eq!(display_key("beta.weight", &keys), "weight");
        assert_eq!(display_key("unit", &["unit"]), "unit");
    }
}
