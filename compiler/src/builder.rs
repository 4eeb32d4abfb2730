//! Descriptor model builder.
//!
//! Turns a decoded [DescriptorPool] into the [Ir] arena. Declarations are
//! allocated for every file first so that a field in one file can point at a
//! message in any other, then fields are filled in a second pass.

use prost_reflect::{
    DescriptorPool, EnumDescriptor, ExtensionDescriptor, FieldDescriptor as ReflectField, FileDescriptor, Kind,
    MessageDescriptor, OneofDescriptor,
};
use protoc_gen_pydantic_schema::{
    Docs, EnumId, EnumType, EnumValue, FieldDescriptor, FieldShape, FileId, FileUnit, Ir, MessageId, MessageType,
    OneofGroup, Package, ScalarKind, TypeRef, WellKnownType,
};

use std::collections::{HashMap, HashSet};

use crate::constraints::read_rules;
use crate::error::CompileError;
use crate::options::{bool_option, extract_bag};

// Field numbers inside descriptor.proto, used to address source comments.
const FILE_MESSAGE_TYPE: i32 = 4;
const FILE_ENUM_TYPE:    i32 = 5;
const FILE_SYNTAX:       i32 = 12;
const MESSAGE_FIELD:     i32 = 2;
const MESSAGE_NESTED:    i32 = 3;
const MESSAGE_ENUM:      i32 = 4;
const ENUM_VALUE:        i32 = 2;

type CommentTable = HashMap<Vec<i32>, Docs>;

struct Builder<'a> {
    ir:          Ir,
    rules_ext:   Option<&'a ExtensionDescriptor>,
    comments:    Vec<CommentTable>,
    message_ids: HashMap<String, MessageId>,
    enum_ids:    HashMap<String, EnumId>,
    pending:     Vec<(MessageId, MessageDescriptor, Vec<i32>)>,
}

/// Builds the IR for every file in `pool`, marking the requested ones for
/// generation.
#[tracing::instrument(level = "debug", skip_all, fields(requested = file_to_generate.len()))]
pub fn build_ir(
    pool: &DescriptorPool,
    file_to_generate: &[String],
    rules_ext: Option<&ExtensionDescriptor>,
) -> Result<Ir, CompileError> {
    let requested: HashSet<&str> = file_to_generate.iter().map(String::as_str).collect();
    for name in file_to_generate {
        if pool.get_file_by_name(name).is_none() {
            return Err(CompileError::MissingFile(name.clone()));
        }
    }

    let mut builder = Builder {
        ir:          Ir::default(),
        rules_ext,
        comments:    Vec::new(),
        message_ids: HashMap::new(),
        enum_ids:    HashMap::new(),
        pending:     Vec::new(),
    };

    // 1) declare every file, message and enum
    for file in pool.files() {
        builder.declare_file(&file, requested.contains(file.name()));
    }

    // 2) fill in fields now that every type has an id
    let pending = std::mem::take(&mut builder.pending);
    for (id, desc, path) in pending {
        let (fields, oneofs) = builder.define_fields(id, &desc, &path)?;
        let message = &mut builder.ir.messages[id.0];
        message.fields = fields;
        message.oneofs = oneofs;
    }

    // 3) generated enums must have a zero value to default to
    let ir = builder.ir;
    for (file_id, _) in ir.files_to_generate() {
        for enum_id in ir.enums_in_file(file_id) {
            let enum_type = ir.enum_type(enum_id);
            if enum_type.zero_value().is_none() {
                return Err(CompileError::MissingZeroValue(enum_type.full_name.clone()));
            }
        }
    }

    tracing::debug!(
        files = ir.files.len(),
        messages = ir.messages.len(),
        enums = ir.enums.len(),
        "built descriptor model"
    );
    Ok(ir)
}

impl<'a> Builder<'a> {
    fn declare_file(&mut self, file: &FileDescriptor, generate: bool) {
        let id = FileId(self.ir.files.len());
        self.comments.push(comment_table(file));

        let package = file.package_name().to_string();
        match self.ir.packages.iter_mut().find(|p| p.name == package) {
            Some(existing) => existing.files.push(id),
            None => self.ir.packages.push(Package {
                name:  package.clone(),
                files: vec![id],
            }),
        }

        let docs = self.docs(id, &[FILE_SYNTAX]);
        self.ir.files.push(FileUnit {
            name:     file.name().to_string(),
            package,
            generate,
            docs,
            messages: Vec::new(),
            enums:    Vec::new(),
        });

        let enums = file
            .enums()
            .enumerate()
            .map(|(i, desc)| self.declare_enum(id, None, &desc, vec![FILE_ENUM_TYPE, i as i32]))
            .collect();
        let mut messages = Vec::new();
        for (i, desc) in file.messages().enumerate() {
            messages.push(self.declare_message(id, None, desc, vec![FILE_MESSAGE_TYPE, i as i32]));
        }

        let unit = &mut self.ir.files[id.0];
        unit.enums = enums;
        unit.messages = messages;
    }

    fn declare_message(
        &mut self,
        file: FileId,
        parent: Option<MessageId>,
        desc: MessageDescriptor,
        path: Vec<i32>,
    ) -> MessageId {
        let id = MessageId(self.ir.messages.len());
        self.message_ids.insert(desc.full_name().to_string(), id);
        let docs = self.docs(file, &path);
        self.ir.messages.push(MessageType {
            name:      desc.name().to_string(),
            full_name: desc.full_name().to_string(),
            file,
            parent,
            docs,
            fields:    Vec::new(),
            oneofs:    Vec::new(),
            messages:  Vec::new(),
            enums:     Vec::new(),
            options:   extract_bag(&desc.options()),
        });

        let enums = desc
            .child_enums()
            .enumerate()
            .map(|(i, child)| self.declare_enum(file, Some(id), &child, child_path(&path, MESSAGE_ENUM, i)))
            .collect();
        let mut messages = Vec::new();
        for (i, child) in desc.child_messages().enumerate() {
            // Map entries are synthesized by protoc and never emitted.
            if child.is_map_entry() {
                continue;
            }
            messages.push(self.declare_message(file, Some(id), child, child_path(&path, MESSAGE_NESTED, i)));
        }

        let message = &mut self.ir.messages[id.0];
        message.enums = enums;
        message.messages = messages;
        self.pending.push((id, desc, path));
        id
    }

    fn declare_enum(&mut self, file: FileId, parent: Option<MessageId>, desc: &EnumDescriptor, path: Vec<i32>) -> EnumId {
        let id = EnumId(self.ir.enums.len());
        self.enum_ids.insert(desc.full_name().to_string(), id);

        let values = desc
            .values()
            .enumerate()
            .map(|(i, value)| {
                let options = value.options();
                EnumValue {
                    name:         value.name().to_string(),
                    number:       value.number(),
                    docs:         self.docs(file, &child_path(&path, ENUM_VALUE, i)),
                    deprecated:   bool_option(&options, "deprecated"),
                    debug_redact: bool_option(&options, "debug_redact"),
                    options:      extract_bag(&options),
                }
            })
            .collect();

        let docs = self.docs(file, &path);
        self.ir.enums.push(EnumType {
            name:      desc.name().to_string(),
            full_name: desc.full_name().to_string(),
            file,
            parent,
            docs,
            values,
        });
        id
    }

    fn define_fields(
        &self,
        id: MessageId,
        desc: &MessageDescriptor,
        path: &[i32],
    ) -> Result<(Vec<FieldDescriptor>, Vec<OneofGroup>), CompileError> {
        let file = self.ir.message(id).file;

        let real_oneofs: Vec<_> = desc.oneofs().filter(|o| !is_synthetic_oneof(o)).collect();
        let oneofs = real_oneofs
            .iter()
            .map(|o| OneofGroup {
                name:   o.name().to_string(),
                fields: o.fields().map(|f| f.name().to_string()).collect(),
            })
            .collect();

        let mut fields = Vec::new();
        for (i, field) in desc.fields().enumerate() {
            let oneof = field
                .containing_oneof()
                .filter(|o| !is_synthetic_oneof(o))
                .and_then(|o| real_oneofs.iter().position(|r| r.name() == o.name()));
            let (ty, shape) = self.field_type(&field, oneof.is_some())?;
            let options = field.options();

            fields.push(FieldDescriptor {
                name:       field.name().to_string(),
                json_name:  field.json_name().to_string(),
                number:     field.number() as i32,
                ty,
                shape,
                oneof,
                docs:       self.docs(file, &child_path(path, MESSAGE_FIELD, i)),
                deprecated: bool_option(&options, "deprecated"),
                rules:      read_rules(self.rules_ext, &options),
                options:    extract_bag(&options),
            });
        }
        Ok((fields, oneofs))
    }

    fn field_type(&self, field: &ReflectField, in_oneof: bool) -> Result<(TypeRef, FieldShape), CompileError> {
        if field.is_group() {
            return Err(CompileError::UnsupportedType {
                field: field.full_name().to_string(),
                kind:  "group".to_string(),
            });
        }

        if field.is_map() {
            let Kind::Message(entry) = field.kind() else {
                return Err(CompileError::UnsupportedType {
                    field: field.full_name().to_string(),
                    kind:  format!("{:?}", field.kind()),
                });
            };
            let key = scalar_kind(&entry.map_entry_key_field().kind()).ok_or_else(|| {
                CompileError::UnsupportedType {
                    field: field.full_name().to_string(),
                    kind:  "map key".to_string(),
                }
            })?;
            let value = entry.map_entry_value_field();
            let ty = self.type_ref(&value.kind(), field)?;
            return Ok((ty, FieldShape::Map { key }));
        }

        let kind = field.kind();
        let ty = self.type_ref(&kind, field)?;
        let shape = if field.is_list() {
            FieldShape::Repeated
        } else if field.field_descriptor_proto().proto3_optional() {
            FieldShape::Optional
        } else if field.supports_presence() && !in_oneof && !matches!(kind, Kind::Message(_)) {
            // proto2 `optional` scalars track presence too.
            FieldShape::Optional
        } else {
            FieldShape::Singular
        };
        Ok((ty, shape))
    }

    fn type_ref(&self, kind: &Kind, referenced_by: &ReflectField) -> Result<TypeRef, CompileError> {
        let missing = |type_name: &str| CompileError::MissingType {
            type_name:     type_name.to_string(),
            referenced_by: referenced_by.full_name().to_string(),
        };
        match kind {
            Kind::Message(msg) => {
                if let Some(wkt) = WellKnownType::from_full_name(msg.full_name()) {
                    return Ok(TypeRef::WellKnown(wkt));
                }
                self.message_ids
                    .get(msg.full_name())
                    .map(|id| TypeRef::Message(*id))
                    .ok_or_else(|| missing(msg.full_name()))
            }
            Kind::Enum(e) => self
                .enum_ids
                .get(e.full_name())
                .map(|id| TypeRef::Enum(*id))
                .ok_or_else(|| missing(e.full_name())),
            scalar => scalar_kind(scalar)
                .map(TypeRef::Scalar)
                .ok_or_else(|| missing(&format!("{:?}", scalar))),
        }
    }

    fn docs(&self, file: FileId, path: &[i32]) -> Docs {
        self.comments[file.0].get(path).cloned().unwrap_or_default()
    }
}

/// Synthetic oneofs only exist to carry proto3 `optional` presence: protoc
/// wraps the single optional field in a oneof of its own.
fn is_synthetic_oneof(oneof: &OneofDescriptor) -> bool {
    let mut fields = oneof.fields();
    match (fields.next(), fields.next()) {
        (Some(only), None) => only.field_descriptor_proto().proto3_optional(),
        _ => false,
    }
}

fn scalar_kind(kind: &Kind) -> Option<ScalarKind> {
    Some(match kind {
        Kind::Double => ScalarKind::Double,
        Kind::Float => ScalarKind::Float,
        Kind::Int32 => ScalarKind::Int32,
        Kind::Int64 => ScalarKind::Int64,
        Kind::Uint32 => ScalarKind::Uint32,
        Kind::Uint64 => ScalarKind::Uint64,
        Kind::Sint32 => ScalarKind::Sint32,
        Kind::Sint64 => ScalarKind::Sint64,
        Kind::Fixed32 => ScalarKind::Fixed32,
        Kind::Fixed64 => ScalarKind::Fixed64,
        Kind::Sfixed32 => ScalarKind::Sfixed32,
        Kind::Sfixed64 => ScalarKind::Sfixed64,
        Kind::Bool => ScalarKind::Bool,
        Kind::String => ScalarKind::String,
        Kind::Bytes => ScalarKind::Bytes,
        Kind::Message(_) | Kind::Enum(_) => return None,
    })
}

fn child_path(parent: &[i32], field: i32, index: usize) -> Vec<i32> {
    let mut path = Vec::with_capacity(parent.len() + 2);
    path.extend_from_slice(parent);
    path.push(field);
    path.push(index as i32);
    path
}

fn comment_table(file: &FileDescriptor) -> CommentTable {
    let mut table = CommentTable::new();
    let Some(info) = &file.file_descriptor_proto().source_code_info else {
        return table;
    };
    for location in &info.location {
        let docs = Docs {
            leading:  comment_lines(location.leading_comments()),
            trailing: comment_lines(location.trailing_comments()),
        };
        if !docs.is_empty() {
            table.entry(location.path.clone()).or_insert(docs);
        }
    }
    table
}

/// Splits a source comment into trimmed lines.
fn comment_lines(comment: &str) -> Vec<String> {
    let comment = comment.trim();
    if comment.is_empty() {
        return Vec::new();
    }
    comment.lines().map(|line| line.trim().to_string()).collect()
}
