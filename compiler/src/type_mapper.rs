//! Type mapper.
//!
//! Maps a field's [TypeRef] and [FieldShape] to a Python annotation and a
//! default expression, recording every name the annotation pulls in.

use protoc_gen_pydantic_schema::{
    FieldDescriptor, FieldShape, FileId, Ir, NameTable, PluginOptions, ScalarKind, TypeRef, WellKnownType,
};

use std::collections::{BTreeMap, BTreeSet};

use crate::error::CompileError;
use crate::runtime::RuntimeSymbol;

/// Annotation and default for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyType {
    pub annotation: String,
    /// First argument of `_Field(...)`.
    pub default:    String,
    /// Whether `None` is part of the annotation.
    pub nullable:   bool,
}

/// Names referenced by mapped annotations.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TypeUses {
    pub any:      bool,
    pub optional: bool,
    pub runtime:  BTreeSet<RuntimeSymbol>,
    /// Identifiers to import from other generated files.
    pub imports:  BTreeMap<FileId, BTreeSet<String>>,
}

pub struct TypeMapper<'a> {
    pub ir:      &'a Ir,
    pub names:   &'a NameTable,
    pub options: &'a PluginOptions,
    /// File being rendered; references elsewhere become imports.
    pub file:    FileId,
}

impl<'a> TypeMapper<'a> {
    pub fn map_field(&self, field: &FieldDescriptor, uses: &mut TypeUses) -> Result<PyType, CompileError> {
        let base = self.base_type(&field.ty, uses)?;

        let mapped = match field.shape {
            FieldShape::Repeated => PyType {
                annotation: format!("list[{}]", base),
                default:    "default_factory=list".to_string(),
                nullable:   false,
            },
            FieldShape::Map { key } => PyType {
                annotation: format!("dict[{}, {}]", self.scalar(key, uses), base),
                default:    "default_factory=dict".to_string(),
                nullable:   false,
            },
            _ if field.is_present_tracked() => PyType {
                annotation: self.wrap_optional(base, uses),
                default:    "None".to_string(),
                nullable:   true,
            },
            _ => PyType {
                default:    self.zero_value(field)?,
                annotation: base,
                nullable:   false,
            },
        };
        Ok(mapped)
    }

    fn base_type(&self, ty: &TypeRef, uses: &mut TypeUses) -> Result<String, CompileError> {
        Ok(match ty {
            TypeRef::Scalar(kind) => self.scalar(*kind, uses),
            TypeRef::WellKnown(wkt) => self.well_known(*wkt, uses),
            TypeRef::Enum(id) => {
                let enum_type = self.ir.enum_type(*id);
                self.declared(&enum_type.full_name, enum_type.file, uses)?
            }
            TypeRef::Message(id) => {
                let message = self.ir.message(*id);
                self.declared(&message.full_name, message.file, uses)?
            }
        })
    }

    fn declared(&self, full_name: &str, file: FileId, uses: &mut TypeUses) -> Result<String, CompileError> {
        let ident = self
            .names
            .get(full_name)
            .map(|n| n.ident.clone())
            .ok_or_else(|| CompileError::MissingType {
                type_name:     full_name.to_string(),
                referenced_by: self.ir.file(self.file).name.clone(),
            })?;
        if file != self.file {
            uses.imports.entry(file).or_default().insert(ident.clone());
        }
        Ok(ident)
    }

    fn scalar(&self, kind: ScalarKind, uses: &mut TypeUses) -> String {
        let name = match kind {
            ScalarKind::Int64 | ScalarKind::Sint64 | ScalarKind::Sfixed64 => {
                uses.runtime.insert(RuntimeSymbol::ProtoInt64);
                "ProtoInt64"
            }
            ScalarKind::Uint64 | ScalarKind::Fixed64 => {
                uses.runtime.insert(RuntimeSymbol::ProtoUInt64);
                "ProtoUInt64"
            }
            ScalarKind::Double | ScalarKind::Float => "float",
            ScalarKind::Bool => "bool",
            ScalarKind::String => "str",
            ScalarKind::Bytes => "bytes",
            _ => "int",
        };
        name.to_string()
    }

    fn well_known(&self, wkt: WellKnownType, uses: &mut TypeUses) -> String {
        let name = match wkt {
            WellKnownType::Timestamp => {
                uses.runtime.insert(RuntimeSymbol::ProtoTimestamp);
                "ProtoTimestamp"
            }
            WellKnownType::Duration => {
                uses.runtime.insert(RuntimeSymbol::ProtoDuration);
                "ProtoDuration"
            }
            WellKnownType::Struct => {
                uses.any = true;
                "dict[str, _Any]"
            }
            WellKnownType::Value | WellKnownType::Any => {
                uses.any = true;
                "_Any"
            }
            WellKnownType::ListValue => {
                uses.any = true;
                "list[_Any]"
            }
            WellKnownType::Empty => "None",
            WellKnownType::FieldMask => "list[str]",
            WellKnownType::BoolValue => "bool",
            WellKnownType::Int32Value | WellKnownType::UInt32Value => "int",
            WellKnownType::Int64Value => return self.scalar(ScalarKind::Int64, uses),
            WellKnownType::UInt64Value => return self.scalar(ScalarKind::Uint64, uses),
            WellKnownType::FloatValue | WellKnownType::DoubleValue => "float",
            WellKnownType::StringValue => "str",
            WellKnownType::BytesValue => "bytes",
        };
        name.to_string()
    }

    /// `T | None` or `_Optional[T]`. `None` itself is already nullable.
    pub fn wrap_optional(&self, ty: String, uses: &mut TypeUses) -> String {
        if ty == "None" {
            return ty;
        }
        if self.options.use_none_union_syntax {
            format!("{} | None", ty)
        } else {
            uses.optional = true;
            format!("_Optional[{}]", ty)
        }
    }

    fn zero_value(&self, field: &FieldDescriptor) -> Result<String, CompileError> {
        let value = match field.ty {
            TypeRef::Scalar(kind) => scalar_default(kind),
            TypeRef::Enum(id) => {
                let enum_type = self.ir.enum_type(id);
                // Dependencies may be proto2 enums whose first value is the default.
                let zero = enum_type
                    .zero_value()
                    .or_else(|| enum_type.values.first())
                    .ok_or_else(|| CompileError::MissingZeroValue(enum_type.full_name.clone()))?;
                let type_name = self.names.get(&enum_type.full_name);
                let member = self.names.get(&format!("{}.{}", enum_type.full_name, zero.name));
                return match (type_name, member) {
                    (Some(t), Some(m)) => Ok(format!("{}.{}", t.ident, m.ident)),
                    _ => Err(CompileError::MissingType {
                        type_name:     enum_type.full_name.clone(),
                        referenced_by: field.name.clone(),
                    }),
                };
            }
            TypeRef::Message(_) | TypeRef::WellKnown(_) => "None",
        };
        Ok(value.to_string())
    }
}

pub fn scalar_default(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Bool => "False",
        ScalarKind::Double | ScalarKind::Float => "0.0",
        ScalarKind::String => "\"\"",
        ScalarKind::Bytes => "b\"\"",
        _ => "0",
    }
}

/// Wraps `ty` in `_Annotated[..., validators]`, keeping any `| None` or
/// `_Optional[...]` wrapper outermost.
pub fn wrap_with_annotated(ty: &str, validators: &[String]) -> String {
    let joined = validators.join(", ");
    if let Some(inner) = ty.strip_suffix(" | None") {
        return format!("_Annotated[{}, {}] | None", inner, joined);
    }
    if let Some(inner) = ty.strip_prefix("_Optional[").and_then(|t| t.strip_suffix(']')) {
        return format!("_Optional[_Annotated[{}, {}]]", inner, joined);
    }
    format!("_Annotated[{}, {}]", ty, joined)
}

/// Replaces the base of `ty` with `_Literal[value]`, keeping nullability.
pub fn literal_type(ty: &str, literal: &str) -> String {
    let lit = format!("_Literal[{}]", literal);
    if ty.ends_with(" | None") {
        format!("{} | None", lit)
    } else if ty.starts_with("_Optional[") {
        format!("_Optional[{}]", lit)
    } else {
        lit
    }
}
