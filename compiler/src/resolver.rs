//! Name resolver.
//!
//! Computes the Python identifier of every type, field and enum value before
//! any file is rendered. Identifiers that would shadow a keyword, a builtin
//! used in annotations or a member of the generated base classes get a
//! trailing underscore, and fields keep their schema name as an alias.

use protoc_gen_pydantic_schema::{
    EnumType, FieldCasing, FileId, Ir, MessageType, NameTable, PluginOptions, ResolvedName, TypeRef,
};

use std::collections::HashMap;

use crate::casing::{enum_value_prefix, flatten_type_name, to_snake_case};
use crate::error::CompileError;

const PYTHON_KEYWORDS: [&str; 35] = [
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue", "def",
    "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is",
    "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

/// Builtins that would shadow annotations, plus every attribute pydantic or
/// the generated `_ProtoModel` base defines.
const FIELD_DENYLIST: [&str; 52] = [
    "int", "float", "bool", "str", "bytes", "list", "dict", "set", "tuple", "type", "object", "range", "map",
    "filter", "id", "hash", "len", "max", "min", "sum", "abs", "round", "complex", "frozenset", "memoryview",
    "bytearray", "property", "classmethod", "staticmethod", "super", "model_config", "model_fields",
    "model_computed_fields", "model_extra", "model_fields_set", "model_construct", "model_copy", "model_dump",
    "model_dump_json", "model_json_schema", "model_parametrized_name", "model_post_init", "model_rebuild",
    "model_validate", "model_validate_json", "model_validate_strings", "to_proto_dict", "to_proto_json",
    "from_proto_dict", "from_proto_json", "schema", "copy",
];

/// Names a generated class must not take over in module scope.
const TYPE_DENYLIST: [&str; 16] = [
    "int", "float", "bool", "str", "bytes", "list", "dict", "tuple", "frozenset", "ProtoInt64", "ProtoUInt64",
    "ProtoTimestamp", "ProtoDuration", "_ProtoModel", "_ProtoEnum", "_EnumValueOptions",
];

/// Attributes `enum.Enum` reserves on its members.
const ENUM_MEMBER_DENYLIST: [&str; 4] = ["mro", "name", "value", "options"];

/// Resolves every declaration in `ir`. Collisions are only fatal inside files
/// that are being generated; dependency files are resolved so their names can
/// be imported.
#[tracing::instrument(level = "debug", skip_all, fields(files = ir.files.len()))]
pub fn resolve_names(ir: &Ir, options: &PluginOptions) -> Result<NameTable, CompileError> {
    let mut table = NameTable::new();

    // 1) types and enum values of every file, so imports can find them
    for (index, file) in ir.files.iter().enumerate() {
        let file_id = FileId(index);
        let strict = file.generate;

        let mut seen: HashMap<String, String> = HashMap::new();
        let types = ir
            .enums_in_file(file_id)
            .into_iter()
            .map(|id| ir.enum_type(id).full_name.as_str())
            .chain(ir.messages_in_file(file_id).into_iter().map(|id| ir.message(id).full_name.as_str()));
        for full_name in types {
            let ident = type_ident(full_name, &file.package);
            if strict {
                check_unique(&mut seen, &ident, full_name)?;
            }
            insert(&mut table, full_name, ResolvedName::plain(ident))?;
        }

        // enum defaults need member names even in dependency files
        for id in ir.enums_in_file(file_id) {
            resolve_enum_values(&mut table, ir.enum_type(id), options, strict)?;
        }
    }

    // 2) fields, only where a model is rendered
    for (file_id, _) in ir.files_to_generate() {
        for id in ir.messages_in_file(file_id) {
            resolve_fields(&mut table, ir.message(id), options)?;
        }
        check_imports(ir, &table, file_id)?;
    }

    tracing::debug!(names = table.len(), "resolved names");
    Ok(table)
}

fn insert(table: &mut NameTable, path: &str, name: ResolvedName) -> Result<(), CompileError> {
    let ident = name.ident.clone();
    table.insert(path, name).map_err(|dup| CompileError::NameCollision {
        first:  dup.0.clone(),
        second: dup.0,
        ident,
    })
}

fn check_unique(seen: &mut HashMap<String, String>, ident: &str, path: &str) -> Result<(), CompileError> {
    if let Some(first) = seen.get(ident) {
        return Err(CompileError::NameCollision {
            first:  first.clone(),
            second: path.to_string(),
            ident:  ident.to_string(),
        });
    }
    seen.insert(ident.to_string(), path.to_string());
    Ok(())
}

pub fn type_ident(full_name: &str, package: &str) -> String {
    let flat = flatten_type_name(full_name, package);
    if PYTHON_KEYWORDS.contains(&flat.as_str()) || TYPE_DENYLIST.contains(&flat.as_str()) {
        format!("{}_", flat)
    } else {
        flat
    }
}

/// Identifier for a field. Pydantic treats leading underscores as private
/// attributes, so those are moved to the end.
pub fn field_ident(name: &str, json_name: &str, casing: FieldCasing) -> ResolvedName {
    let wire = match casing {
        FieldCasing::LowerCamel => json_name,
        FieldCasing::Preserve | FieldCasing::SnakeCase => name,
    };
    let cased = match casing {
        FieldCasing::Preserve => name.to_string(),
        FieldCasing::SnakeCase => to_snake_case(name),
        FieldCasing::LowerCamel => json_name.to_string(),
    };

    let ident = if PYTHON_KEYWORDS.contains(&cased.as_str()) || FIELD_DENYLIST.contains(&cased.as_str()) {
        format!("{}_", cased)
    } else {
        strip_leading_underscores(&cased, "field_")
    };

    ResolvedName {
        alias: (ident != wire).then(|| wire.to_string()),
        ident,
    }
}

fn strip_leading_underscores(ident: &str, fallback: &str) -> String {
    if !ident.starts_with('_') {
        return ident.to_string();
    }
    match ident.trim_start_matches('_') {
        "" => fallback.to_string(),
        rest => format!("{}_", rest),
    }
}

fn resolve_fields(table: &mut NameTable, message: &MessageType, options: &PluginOptions) -> Result<(), CompileError> {
    let mut seen = HashMap::new();
    for field in &message.fields {
        let path = format!("{}.{}", message.full_name, field.name);
        let name = field_ident(&field.name, &field.json_name, options.field_casing);
        check_unique(&mut seen, &name.ident, &path)?;
        insert(table, &path, name)?;
    }
    Ok(())
}

fn enum_member_ident(ident: &str) -> String {
    if PYTHON_KEYWORDS.contains(&ident) || ENUM_MEMBER_DENYLIST.contains(&ident) {
        format!("{}_", ident)
    } else {
        strip_leading_underscores(ident, "value_")
    }
}

/// Trims the `ENUM_NAME_` prefix from each value where that leaves a valid,
/// unique identifier. Values whose trimmed form clashes keep their full name.
pub fn enum_value_idents(enum_type: &EnumType, trim_prefix: bool) -> Vec<String> {
    let originals: Vec<&str> = enum_type.values.iter().map(|v| v.name.as_str()).collect();
    let mut idents: Vec<String> = originals.iter().map(|s| s.to_string()).collect();

    if trim_prefix {
        let prefix = enum_value_prefix(&enum_type.name);
        for ident in idents.iter_mut() {
            if let Some(rest) = ident.strip_prefix(prefix.as_str()) {
                let valid = rest.chars().next().map(|c| !c.is_ascii_digit()).unwrap_or(false);
                if valid {
                    *ident = rest.to_string();
                }
            }
        }

        // Reverting one value can create a new clash with another trimmed
        // value, so repeat until nothing changes.
        loop {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for ident in &idents {
                *counts.entry(ident.as_str()).or_default() += 1;
            }
            let clashing: Vec<usize> = (0..idents.len())
                .filter(|&i| counts[idents[i].as_str()] > 1 && idents[i] != originals[i])
                .collect();
            if clashing.is_empty() {
                break;
            }
            for i in clashing {
                idents[i] = originals[i].to_string();
            }
        }
    }

    idents.iter().map(|ident| enum_member_ident(ident)).collect()
}

fn resolve_enum_values(
    table: &mut NameTable,
    enum_type: &EnumType,
    options: &PluginOptions,
    strict: bool,
) -> Result<(), CompileError> {
    let idents = enum_value_idents(enum_type, options.auto_trim_enum_prefix);
    let mut seen = HashMap::new();
    for (value, ident) in enum_type.values.iter().zip(idents) {
        let path = format!("{}.{}", enum_type.full_name, value.name);
        if strict {
            check_unique(&mut seen, &ident, &path)?;
        }
        insert(table, &path, ResolvedName::plain(ident))?;
    }
    Ok(())
}

/// Types referenced from another file are imported under their flattened
/// name, which must not shadow a local declaration or a different import.
fn check_imports(ir: &Ir, table: &NameTable, file_id: FileId) -> Result<(), CompileError> {
    let mut seen: HashMap<String, String> = HashMap::new();
    for id in ir.enums_in_file(file_id) {
        let full_name = &ir.enum_type(id).full_name;
        seen.insert(ident_of(table, full_name), full_name.clone());
    }
    for id in ir.messages_in_file(file_id) {
        let full_name = &ir.message(id).full_name;
        seen.insert(ident_of(table, full_name), full_name.clone());
    }

    for id in ir.messages_in_file(file_id) {
        for field in &ir.message(id).fields {
            let (target_file, full_name) = match field.ty {
                TypeRef::Message(m) => (ir.message(m).file, &ir.message(m).full_name),
                TypeRef::Enum(e) => (ir.enum_type(e).file, &ir.enum_type(e).full_name),
                _ => continue,
            };
            if target_file == file_id {
                continue;
            }
            let ident = ident_of(table, full_name);
            match seen.get(&ident) {
                Some(existing) if existing != full_name => {
                    return Err(CompileError::NameCollision {
                        first:  existing.clone(),
                        second: full_name.clone(),
                        ident,
                    });
                }
                Some(_) => {}
                None => {
                    seen.insert(ident, full_name.clone());
                }
            }
        }
    }
    Ok(())
}

fn ident_of(table: &NameTable, full_name: &str) -> String {
    table
        .get(full_name)
        .map(|n| n.ident.clone())
        .unwrap_or_else(|| full_name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use protoc_gen_pydantic_schema::{Docs, EnumValue, OptionBag};

    fn enum_type(name: &str, values: &[&str]) -> EnumType {
        EnumType {
            name:      name.to_string(),
            full_name: format!("pkg.{}", name),
            file:      FileId(0),
            parent:    None,
            docs:      Docs::default(),
            values:    values
                .iter()
                .enumerate()
                .map(|(i, v)| EnumValue {
                    name:         v.to_string(),
                    number:       i as i32,
                    docs:         Docs::default(),
                    deprecated:   false,
                    debug_redact: false,
                    options:      OptionBag::default(),
                })
                .collect(),
        }
    }

    #[test]
    fn reserved_field_names_get_an_alias() {
        assert_eq!(
            field_ident("from", "from", FieldCasing::Preserve),
            ResolvedName { ident: "from_".into(), alias: Some("from".into()) }
        );
        assert_eq!(
            field_ident("model_config", "modelConfig", FieldCasing::Preserve),
            ResolvedName { ident: "model_config_".into(), alias: Some("model_config".into()) }
        );
        assert_eq!(field_ident("name", "name", FieldCasing::Preserve), ResolvedName::plain("name"));
    }

    #[test]
    fn casing_controls_the_identifier_and_alias() {
        assert_eq!(field_ident("first_name", "firstName", FieldCasing::LowerCamel), ResolvedName::plain("firstName"));
        assert_eq!(
            field_ident("userID", "userID", FieldCasing::SnakeCase),
            ResolvedName { ident: "user_id".into(), alias: Some("userID".into()) }
        );
        assert_eq!(
            field_ident("_hidden", "Hidden", FieldCasing::Preserve),
            ResolvedName { ident: "hidden_".into(), alias: Some("_hidden".into()) }
        );
    }

    #[test]
    fn enum_prefixes_are_trimmed() {
        let status = enum_type("Status", &["STATUS_UNSPECIFIED", "STATUS_ACTIVE", "OTHER"]);
        assert_eq!(enum_value_idents(&status, true), vec!["UNSPECIFIED", "ACTIVE", "OTHER"]);
        assert_eq!(
            enum_value_idents(&status, false),
            vec!["STATUS_UNSPECIFIED", "STATUS_ACTIVE", "OTHER"]
        );
    }

    #[test]
    fn trimming_backs_off_per_value() {
        // `STATUS_OTHER` would clash with `OTHER`, `STATUS_1X` would start
        // with a digit and `STATUS_` would be empty.
        let status = enum_type("Status", &["STATUS_", "STATUS_OTHER", "OTHER", "STATUS_1X", "STATUS_NAME"]);
        assert_eq!(
            enum_value_idents(&status, true),
            vec!["STATUS_", "STATUS_OTHER", "OTHER", "STATUS_1X", "NAME"]
        );
    }

    #[test]
    fn reserved_type_names() {
        assert_eq!(type_ident("pkg.None", "pkg"), "None_");
        assert_eq!(type_ident("pkg.ProtoInt64", "pkg"), "ProtoInt64_");
        assert_eq!(type_ident("pkg.Outer.Inner", "pkg"), "Outer_Inner");
    }
}
